//! MQTT notification transport

use chrono::{DateTime, Utc};
use dms::{NotificationKind, NotificationRequest};
use rumqttc::{AsyncClient, Event, MqttOptions, Outgoing, Packet, QoS};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::channel::NotificationChannel;
use crate::NotifyError;

/// MQTT broker settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// MQTT broker host
    pub broker_url: String,
    /// MQTT port
    pub broker_port: u16,
    /// Vehicle ID, used in the client id and payload
    pub vehicle_id: String,
    /// Messages go to `<topic_prefix>/<recipient>`
    pub topic_prefix: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub keep_alive_secs: u64,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker_url: "localhost".to_string(),
            broker_port: 1883,
            vehicle_id: "unknown".to_string(),
            topic_prefix: "fatigue/notifications".to_string(),
            username: None,
            password: None,
            keep_alive_secs: 30,
        }
    }
}

/// JSON payload published for each notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationEnvelope {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub vehicle_id: String,
    pub kind: NotificationKind,
    pub recipient: String,
    pub body: String,
}

impl NotificationEnvelope {
    pub fn new(vehicle_id: &str, request: &NotificationRequest) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            vehicle_id: vehicle_id.to_string(),
            kind: request.kind,
            recipient: request.recipient.clone(),
            body: request.message.clone(),
        }
    }
}

/// Publishes notifications to an MQTT broker; a gateway on the other side
/// turns them into SMS or push messages.
pub struct MqttChannel {
    config: MqttConfig,
    client: Option<AsyncClient>,
    event_loop: Mutex<Option<JoinHandle<()>>>,
}

impl MqttChannel {
    pub fn new(config: MqttConfig) -> Self {
        Self {
            config,
            client: None,
            event_loop: Mutex::new(None),
        }
    }

    /// Create the client and start its event loop; the broker connection
    /// itself is made lazily by the event loop
    pub async fn connect(&mut self) -> Result<(), NotifyError> {
        if self.config.broker_url.is_empty() {
            return Err(NotifyError::Connection("broker_url is empty".into()));
        }

        let mut options = MqttOptions::new(
            format!("fatigue-{}", self.config.vehicle_id),
            &self.config.broker_url,
            self.config.broker_port,
        );
        options.set_keep_alive(Duration::from_secs(self.config.keep_alive_secs.max(5)));
        if let (Some(username), Some(password)) = (&self.config.username, &self.config.password) {
            options.set_credentials(username, password);
        }

        let (client, mut eventloop) = AsyncClient::new(options, 10);

        // Spawn event loop handler; exits once our disconnect goes out
        let broker = self.config.broker_url.clone();
        let handle = tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        info!("Connected to MQTT broker: {}", broker);
                    }
                    Ok(Event::Incoming(incoming)) => {
                        debug!("MQTT incoming: {:?}", incoming);
                    }
                    Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                        debug!("MQTT disconnect sent");
                        break;
                    }
                    Err(e) => {
                        error!("MQTT error: {}", e);
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                    _ => {}
                }
            }
        });

        self.client = Some(client);
        if let Ok(event_loop) = self.event_loop.get_mut() {
            *event_loop = Some(handle);
        }
        info!(
            broker = %self.config.broker_url,
            port = self.config.broker_port,
            "MQTT client configured"
        );
        Ok(())
    }

    pub fn topic_for(&self, recipient: &str) -> String {
        format!("{}/{}", self.config.topic_prefix.trim_end_matches('/'), recipient)
    }
}

impl NotificationChannel for MqttChannel {
    fn name(&self) -> &'static str {
        "mqtt"
    }

    async fn deliver(&self, request: &NotificationRequest) -> Result<String, NotifyError> {
        let client = self.client.as_ref().ok_or(NotifyError::NotConnected)?;

        let envelope = NotificationEnvelope::new(&self.config.vehicle_id, request);
        let payload = serde_json::to_vec(&envelope)?;
        let topic = self.topic_for(&request.recipient);

        client
            .publish(topic.as_str(), QoS::AtLeastOnce, false, payload)
            .await
            .map_err(|e| NotifyError::Publish(e.to_string()))?;

        debug!(topic = %topic, id = %envelope.id, "Notification queued for publish");
        Ok(envelope.id.to_string())
    }

    /// Queue a disconnect behind pending publishes and wait for the event
    /// loop to send them
    async fn close(&self) {
        let Some(client) = &self.client else {
            return;
        };
        if let Err(e) = client.disconnect().await {
            warn!("MQTT disconnect failed: {}", e);
            return;
        }

        let handle = self.event_loop.lock().ok().and_then(|mut h| h.take());
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!("MQTT event loop ended abnormally: {}", e);
            }
        }
    }
}
