//! Notification channel abstraction

use dms::NotificationRequest;
use serde::{Deserialize, Serialize};
use std::future::Future;
use tracing::info;
use uuid::Uuid;

use crate::mqtt::MqttConfig;
use crate::NotifyError;

/// Transport that delivers notification requests (SMS gateway, push, MQTT...)
pub trait NotificationChannel: Send + Sync + 'static {
    /// Short transport name for logs
    fn name(&self) -> &'static str;

    /// Deliver one request, returning the transport's delivery identifier
    fn deliver(
        &self,
        request: &NotificationRequest,
    ) -> impl Future<Output = Result<String, NotifyError>> + Send;

    /// Flush anything the transport still holds; called once after the last delivery
    fn close(&self) -> impl Future<Output = ()> + Send {
        async {}
    }
}

/// Transport kinds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transport {
    /// Write notifications to the log only
    #[default]
    Log,
    Mqtt,
}

/// Which transport the monitor should use, plus its settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    pub transport: Transport,
    /// Used when `transport = "mqtt"`
    pub mqtt: MqttConfig,
}

/// Channel that only logs; used when no transport is configured
#[derive(Debug, Clone, Default)]
pub struct LogChannel;

impl NotificationChannel for LogChannel {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn deliver(&self, request: &NotificationRequest) -> Result<String, NotifyError> {
        let id = Uuid::new_v4().to_string();
        info!(
            id = %id,
            kind = request.kind.label(),
            recipient = %request.recipient,
            "Notification: {}",
            request.message
        );
        Ok(id)
    }
}
