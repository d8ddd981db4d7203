//! Driver Fatigue Monitor
//!
//! Reads per-frame facial landmarks as JSON lines, runs the fatigue engine,
//! and forwards its decisions to the alarm and notification sinks.

mod config;
mod session;

pub use config::{load_config, parse_config, LoggingConfig, MetricsConfig, MonitorConfig};
pub use session::{LandmarkFrame, Monitor, SessionSummary};

use alerting::{
    ChannelConfig, DispatchConfig, LogChannel, MqttChannel, NotificationDispatcher, NotifyError,
    Transport,
};
use dms::DmsError;
use metrics_exporter_prometheus::PrometheusBuilder;
use thiserror::Error;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Monitor error types
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error(transparent)]
    Engine(#[from] DmsError),

    #[error("Malformed frame: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Frame at {timestamp_ms}ms arrived after {last_ms}ms")]
    OutOfOrder { timestamp_ms: u64, last_ms: u64 },

    #[error("Notification channel: {0}")]
    Notify(#[from] NotifyError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Metrics exporter: {0}")]
    Metrics(String),
}

/// Initialize logging; `RUST_LOG` overrides the configured level
pub fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let result = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if let Err(e) = result {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Install the Prometheus recorder and scrape endpoint, if configured
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MonitorError> {
    let Some(addr) = config.listen else {
        debug!("Prometheus exporter disabled");
        return Ok(());
    };

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| MonitorError::Metrics(e.to_string()))?;
    info!(%addr, "Prometheus exporter listening");
    Ok(())
}

/// Start the notification dispatcher for the configured transport
pub async fn start_dispatcher(
    channel: &ChannelConfig,
    dispatch: &DispatchConfig,
) -> Result<NotificationDispatcher, MonitorError> {
    match channel.transport {
        Transport::Log => {
            info!("No notification transport configured; logging notifications");
            Ok(NotificationDispatcher::spawn(LogChannel, dispatch))
        }
        Transport::Mqtt => {
            let mut mqtt = MqttChannel::new(channel.mqtt.clone());
            mqtt.connect().await?;
            Ok(NotificationDispatcher::spawn(mqtt, dispatch))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_metrics_disabled_by_default() {
        assert!(init_metrics(&MetricsConfig::default()).is_ok());
    }

    #[tokio::test]
    async fn test_metrics_exporter_installs() {
        let config = MetricsConfig {
            listen: Some("127.0.0.1:0".parse().unwrap()),
        };
        assert!(init_metrics(&config).is_ok());
    }

    #[tokio::test]
    async fn test_start_log_dispatcher() {
        let dispatcher = start_dispatcher(&ChannelConfig::default(), &DispatchConfig::default())
            .await
            .unwrap();
        assert_eq!(dispatcher.shutdown().await.delivered, 0);
    }
}
