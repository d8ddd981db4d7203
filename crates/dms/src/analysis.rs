//! Per-frame decisions handed to the render, audio, and notification sinks

use serde::{Deserialize, Serialize};

use crate::landmarks::Point;
use crate::metrics::AspectMetrics;
use crate::state::AlertKind;

/// Why a notification is being requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "alert", rename_all = "snake_case")]
pub enum NotificationKind {
    /// An alert episode started
    Onset(AlertKind),
    /// An alert episode ended
    Recovery(AlertKind),
    /// Continuous driving duration exceeded
    DurationReminder,
}

impl NotificationKind {
    pub fn label(&self) -> &'static str {
        match self {
            NotificationKind::Onset(AlertKind::Drowsiness) => "drowsiness_onset",
            NotificationKind::Onset(AlertKind::Yawn) => "yawn_onset",
            NotificationKind::Recovery(AlertKind::Drowsiness) => "drowsiness_recovery",
            NotificationKind::Recovery(AlertKind::Yawn) => "yawn_recovery",
            NotificationKind::DurationReminder => "duration_reminder",
        }
    }
}

/// Outbound message request; delivery belongs to the notification channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub kind: NotificationKind,
    pub message: String,
    pub recipient: String,
}

/// Alert banner to draw on the frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertText {
    pub kind: AlertKind,
    pub text: String,
    /// Top-left anchor in image pixels
    pub position: (i32, i32),
}

/// What to draw for one face
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayHint {
    /// Detection-order index of the face in this frame
    pub face_index: usize,
    pub left_eye: Vec<Point>,
    pub right_eye: Vec<Point>,
    pub mouth: Vec<Point>,
    /// Missing when the geometry was degenerate this frame
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<AspectMetrics>,
    pub alerts: Vec<AlertText>,
}

/// Everything the engine decided for one frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameActions {
    pub overlay_hints: Vec<OverlayHint>,
    /// Alarm sound should be playing
    pub audio_should_play: bool,
    pub notifications: Vec<NotificationRequest>,
}

impl FrameActions {
    /// Check if any face has an alert showing
    pub fn has_alerts(&self) -> bool {
        self.overlay_hints.iter().any(|hint| !hint.alerts.is_empty())
    }

    /// Alert kinds showing on any face, drowsiness first
    pub fn active_alerts(&self) -> Vec<AlertKind> {
        AlertKind::ALL
            .into_iter()
            .filter(|kind| {
                self.overlay_hints
                    .iter()
                    .any(|hint| hint.alerts.iter().any(|alert| alert.kind == *kind))
            })
            .collect()
    }
}

/// Running counters for a monitoring session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    pub frames_processed: u64,
    pub frames_rejected: u64,
    pub drowsiness_episodes: u64,
    pub yawn_episodes: u64,
    pub reminders: u64,
}

impl SessionStats {
    pub(crate) fn record_onset(&mut self, kind: AlertKind) {
        match kind {
            AlertKind::Drowsiness => self.drowsiness_episodes += 1,
            AlertKind::Yawn => self.yawn_episodes += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hint(alerts: Vec<AlertKind>) -> OverlayHint {
        OverlayHint {
            face_index: 0,
            left_eye: vec![],
            right_eye: vec![],
            mouth: vec![],
            metrics: None,
            alerts: alerts
                .into_iter()
                .map(|kind| AlertText {
                    kind,
                    text: String::new(),
                    position: (0, 0),
                })
                .collect(),
        }
    }

    #[test]
    fn test_active_alerts_ordering() {
        let actions = FrameActions {
            overlay_hints: vec![hint(vec![AlertKind::Yawn]), hint(vec![AlertKind::Drowsiness])],
            ..Default::default()
        };
        assert!(actions.has_alerts());
        assert_eq!(actions.active_alerts(), vec![AlertKind::Drowsiness, AlertKind::Yawn]);

        assert!(!FrameActions::default().has_alerts());
    }

    #[test]
    fn test_notification_serialization() {
        let request = NotificationRequest {
            kind: NotificationKind::Onset(AlertKind::Yawn),
            message: "ALERT! Yawn detected!".into(),
            recipient: "family".into(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["kind"]["type"], "onset");
        assert_eq!(json["kind"]["alert"], "yawn");

        let reminder = serde_json::to_value(NotificationKind::DurationReminder).unwrap();
        assert_eq!(reminder["type"], "duration_reminder");
    }
}
