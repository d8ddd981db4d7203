//! DMS configuration

use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;

use crate::state::AlertKind;
use crate::DmsError;

/// What happens to a face slot's counters when no face fills it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum FaceLossPolicy {
    /// Clear the slot on the first absent frame
    #[default]
    Reset,
    /// Keep the slot's state for up to `frames` consecutive absent frames
    Hold { frames: u32 },
}

/// Notification message bodies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageConfig {
    pub drowsiness_onset: String,
    pub drowsiness_recovery: String,
    pub yawn_onset: String,
    pub yawn_recovery: String,
    /// Overrides the generated driving-duration reminder
    pub duration_reminder: Option<String>,
}

impl Default for MessageConfig {
    fn default() -> Self {
        Self {
            drowsiness_onset: "ALERT! Drowsiness detected!".to_string(),
            drowsiness_recovery: "Relax, Driver is now awake.".to_string(),
            yawn_onset: "ALERT! Yawn detected!".to_string(),
            yawn_recovery: "Driver is no longer yawning.".to_string(),
            duration_reminder: None,
        }
    }
}

/// Who receives which notifications
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Recipients of drowsiness and yawn onset/recovery messages
    #[serde(deserialize_with = "recipient_list")]
    pub alert_recipients: Vec<String>,
    /// Recipients of the driving-duration reminder
    #[serde(deserialize_with = "recipient_list")]
    pub reminder_recipients: Vec<String>,
    pub messages: MessageConfig,
}

/// Accepts a list or a comma-separated string (environment overrides).
/// Entries stay text so `+15550100` keeps its plus sign.
fn recipient_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Recipients {
        List(Vec<String>),
        Joined(String),
    }

    Ok(match Recipients::deserialize(deserializer)? {
        Recipients::List(list) => list,
        Recipients::Joined(joined) => joined
            .split(',')
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string)
            .collect(),
    })
}

/// DMS configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DmsConfig {
    /// Eyes count as closed below this eye aspect ratio
    pub ear_threshold: f32,

    /// Mouth counts as yawning above this mouth aspect ratio
    pub mar_threshold: f32,

    /// Consecutive closed-eye frames before a drowsiness alert
    pub eye_closed_frames: u32,

    /// Consecutive open-mouth frames before a yawn alert
    pub yawn_frames: u32,

    /// Continuous monitoring time between break reminders (seconds)
    pub max_driving_duration_secs: u64,

    /// Send "all clear" when a drowsiness episode ends
    pub drowsiness_recovery: bool,

    /// Send "all clear" when a yawn episode ends
    pub yawn_recovery: bool,

    pub face_loss: FaceLossPolicy,

    pub notifications: NotificationConfig,
}

impl Default for DmsConfig {
    fn default() -> Self {
        Self {
            ear_threshold: 0.25,
            mar_threshold: 0.7,
            eye_closed_frames: 20,
            yawn_frames: 15,
            max_driving_duration_secs: 2 * 60 * 60,
            drowsiness_recovery: true,
            yawn_recovery: false,
            face_loss: FaceLossPolicy::Reset,
            notifications: NotificationConfig::default(),
        }
    }
}

impl DmsConfig {
    /// Create strict config (fewer frames, shorter driving stints)
    pub fn strict() -> Self {
        Self {
            eye_closed_frames: 12,
            yawn_frames: 10,
            max_driving_duration_secs: 90 * 60,
            ..Default::default()
        }
    }

    /// Create lenient config (more frames, longer driving stints)
    pub fn lenient() -> Self {
        Self {
            eye_closed_frames: 30,
            yawn_frames: 25,
            max_driving_duration_secs: 3 * 60 * 60,
            face_loss: FaceLossPolicy::Hold { frames: 15 },
            ..Default::default()
        }
    }

    pub fn max_driving_duration(&self) -> Duration {
        Duration::from_secs(self.max_driving_duration_secs)
    }

    pub fn recovery_enabled(&self, kind: AlertKind) -> bool {
        match kind {
            AlertKind::Drowsiness => self.drowsiness_recovery,
            AlertKind::Yawn => self.yawn_recovery,
        }
    }

    pub fn debounce_frames(&self, kind: AlertKind) -> u32 {
        match kind {
            AlertKind::Drowsiness => self.eye_closed_frames,
            AlertKind::Yawn => self.yawn_frames,
        }
    }

    pub fn onset_message(&self, kind: AlertKind) -> &str {
        let messages = &self.notifications.messages;
        match kind {
            AlertKind::Drowsiness => &messages.drowsiness_onset,
            AlertKind::Yawn => &messages.yawn_onset,
        }
    }

    pub fn recovery_message(&self, kind: AlertKind) -> &str {
        let messages = &self.notifications.messages;
        match kind {
            AlertKind::Drowsiness => &messages.drowsiness_recovery,
            AlertKind::Yawn => &messages.yawn_recovery,
        }
    }

    /// Break reminder text, generated from the interval unless overridden
    pub fn reminder_message(&self) -> String {
        if let Some(message) = &self.notifications.messages.duration_reminder {
            return message.clone();
        }

        let secs = self.max_driving_duration_secs;
        let span = match (secs / 3600, secs % 3600) {
            (1, 0) => "1 hour".to_string(),
            (hours, 0) => format!("{} hours", hours),
            _ if secs >= 60 && secs % 60 == 0 => format!("{} minutes", secs / 60),
            _ => format!("{} seconds", secs),
        };
        format!("ALERT! You have been driving for over {}. Please take a break.", span)
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<(), DmsError> {
        if !self.ear_threshold.is_finite() || self.ear_threshold <= 0.0 {
            return Err(DmsError::Config(format!(
                "ear_threshold must be a positive number, got {}",
                self.ear_threshold
            )));
        }
        if !self.mar_threshold.is_finite() || self.mar_threshold <= 0.0 {
            return Err(DmsError::Config(format!(
                "mar_threshold must be a positive number, got {}",
                self.mar_threshold
            )));
        }
        if self.eye_closed_frames == 0 {
            return Err(DmsError::Config("eye_closed_frames must be at least 1".into()));
        }
        if self.yawn_frames == 0 {
            return Err(DmsError::Config("yawn_frames must be at least 1".into()));
        }
        if self.max_driving_duration_secs == 0 {
            return Err(DmsError::Config("max_driving_duration_secs must be at least 1".into()));
        }
        Ok(())
    }
}
