//! Alerting System
//!
//! Delivers the fatigue engine's decisions to the outside world:
//! - Notification channels (MQTT, log)
//! - Fire-and-forget notification dispatch
//! - Edge-triggered alarm audio

mod audio;
mod channel;
mod dispatcher;
mod mqtt;

pub use audio::{AlarmLatch, AudioSink, LogAudioSink};
pub use channel::{ChannelConfig, LogChannel, NotificationChannel, Transport};
pub use dispatcher::{DeliveryStats, DispatchConfig, NotificationDispatcher};
pub use mqtt::{MqttChannel, MqttConfig, NotificationEnvelope};

use std::time::Duration;
use thiserror::Error;

/// Notification delivery error types
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Publish failed: {0}")]
    Publish(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Channel not connected")]
    NotConnected,

    #[error("Delivery timed out after {0:?}")]
    Timeout(Duration),
}
