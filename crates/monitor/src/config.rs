//! Monitor configuration loading
//!
//! Sources, lowest priority first:
//! - Built-in defaults
//! - TOML file (optional)
//! - `FATIGUE__`-prefixed environment variables, `__` between sections
//!   (e.g. `FATIGUE__DMS__EAR_THRESHOLD=0.22`)
//!
//! Environment values stay strings until deserialized, so a recipient such
//! as `+15550100` is never read as a number. Recipient lists are
//! comma-separated.

use alerting::{ChannelConfig, DispatchConfig};
use config::{Config, Environment, File, FileFormat};
use dms::DmsConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tracing::debug;

use crate::MonitorError;

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Prometheus exporter settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Scrape endpoint address; no exporter when unset
    pub listen: Option<SocketAddr>,
}

/// Top-level configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub dms: DmsConfig,
    pub channel: ChannelConfig,
    pub dispatch: DispatchConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
}

fn environment() -> Environment {
    Environment::with_prefix("FATIGUE")
        .prefix_separator("__")
        .separator("__")
}

/// Load configuration from an optional file plus the environment
pub fn load_config(path: Option<&str>) -> Result<MonitorConfig, MonitorError> {
    load_with_environment(path, environment())
}

fn load_with_environment(
    path: Option<&str>,
    environment: Environment,
) -> Result<MonitorConfig, MonitorError> {
    let mut builder = Config::builder();
    if let Some(path) = path {
        debug!("Loading config file {}", path);
        builder = builder.add_source(File::with_name(path).required(true));
    }
    let config = builder
        .add_source(environment)
        .build()?
        .try_deserialize::<MonitorConfig>()?;

    config.dms.validate()?;
    Ok(config)
}

/// Parse configuration from TOML text (no environment overlay)
pub fn parse_config(toml: &str) -> Result<MonitorConfig, MonitorError> {
    let config = Config::builder()
        .add_source(File::from_str(toml, FileFormat::Toml))
        .build()?
        .try_deserialize::<MonitorConfig>()?;

    config.dms.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alerting::{MqttConfig, Transport};
    use dms::FaceLossPolicy;
    use std::collections::HashMap;

    fn env_config(vars: &[(&str, &str)]) -> Result<MonitorConfig, MonitorError> {
        let source: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        load_with_environment(None, environment().source(Some(source)))
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config, MonitorConfig::default());
    }

    #[test]
    fn test_full_config() {
        let config = parse_config(
            r#"
            [dispatch]
            queue_capacity = 8
            delivery_timeout_ms = 2000

            [logging]
            level = "debug"
            json = true

            [dms]
            ear_threshold = 0.22
            eye_closed_frames = 25
            yawn_recovery = true

            [dms.face_loss]
            mode = "hold"
            frames = 10

            [dms.notifications]
            alert_recipients = ["+15550100", "+15550101"]
            reminder_recipients = ["+15550199"]

            [dms.notifications.messages]
            yawn_onset = "Driver is yawning"

            [metrics]
            listen = "127.0.0.1:9100"

            [channel]
            transport = "mqtt"

            [channel.mqtt]
            broker_url = "broker.local"
            vehicle_id = "van-12"
            "#,
        )
        .unwrap();

        assert_eq!(config.dispatch.queue_capacity, 8);
        assert_eq!(config.dispatch.delivery_timeout_ms, 2000);
        assert_eq!(config.dispatch.drain_timeout_ms, 30_000);
        assert_eq!(config.metrics.listen, Some("127.0.0.1:9100".parse().unwrap()));
        assert!(config.logging.json);
        assert!((config.dms.ear_threshold - 0.22).abs() < 1e-6);
        assert_eq!(config.dms.eye_closed_frames, 25);
        assert_eq!(config.dms.yawn_frames, 15);
        assert!(config.dms.yawn_recovery);
        assert_eq!(config.dms.face_loss, FaceLossPolicy::Hold { frames: 10 });
        assert_eq!(config.dms.notifications.alert_recipients.len(), 2);
        assert_eq!(config.dms.notifications.messages.yawn_onset, "Driver is yawning");
        assert_eq!(
            config.dms.notifications.messages.drowsiness_onset,
            "ALERT! Drowsiness detected!"
        );
        assert_eq!(
            config.channel,
            ChannelConfig {
                transport: Transport::Mqtt,
                mqtt: MqttConfig {
                    broker_url: "broker.local".into(),
                    vehicle_id: "van-12".into(),
                    ..Default::default()
                },
            }
        );
    }

    #[test]
    fn test_environment_recipients_stay_text() {
        let config = env_config(&[
            ("FATIGUE__DMS__NOTIFICATIONS__ALERT_RECIPIENTS", "+15550100"),
            (
                "FATIGUE__DMS__NOTIFICATIONS__REMINDER_RECIPIENTS",
                "+15550101,+15550102",
            ),
        ])
        .unwrap();
        assert_eq!(config.dms.notifications.alert_recipients, vec!["+15550100"]);
        assert_eq!(
            config.dms.notifications.reminder_recipients,
            vec!["+15550101", "+15550102"]
        );
    }

    #[test]
    fn test_environment_numbers_and_transport() {
        let config = env_config(&[
            ("FATIGUE__DMS__EAR_THRESHOLD", "0.22"),
            ("FATIGUE__DMS__YAWN_RECOVERY", "true"),
            ("FATIGUE__DISPATCH__QUEUE_CAPACITY", "16"),
            ("FATIGUE__CHANNEL__TRANSPORT", "mqtt"),
            ("FATIGUE__CHANNEL__MQTT__BROKER_PORT", "8883"),
        ])
        .unwrap();
        assert!((config.dms.ear_threshold - 0.22).abs() < 1e-6);
        assert!(config.dms.yawn_recovery);
        assert_eq!(config.dispatch.queue_capacity, 16);
        assert_eq!(config.channel.transport, Transport::Mqtt);
        assert_eq!(config.channel.mqtt.broker_port, 8883);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let result = parse_config(
            r#"
            [dms]
            yawn_frames = 0
            "#,
        );
        assert!(matches!(result, Err(MonitorError::Engine(_))));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = load_config(Some("/nonexistent/fatigue-monitor.toml"));
        assert!(matches!(result, Err(MonitorError::Config(_))));
    }
}
