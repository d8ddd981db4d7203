//! Per-kind alert state and onset/recovery policy

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::debounce::DebounceUpdate;

/// Fatigue alert kinds driven by facial geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// Eyes closed for too many consecutive frames
    Drowsiness,
    /// Mouth open wide for too many consecutive frames
    Yawn,
}

impl AlertKind {
    pub const ALL: [AlertKind; 2] = [AlertKind::Drowsiness, AlertKind::Yawn];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::Drowsiness => "drowsiness",
            AlertKind::Yawn => "yawn",
        }
    }
}

/// Alert state for one kind on one face
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertState {
    /// An episode is in progress
    pub active: bool,
    /// Onset notification went out for the current episode
    pub notified_onset: bool,
}

/// Transition produced by [`AlertPolicy::observe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertTransition {
    /// Idle -> Active; onset notification should be sent
    Onset,
    /// Active -> Idle; `notify` says whether a recovery message is due
    Recovery { notify: bool },
}

/// Idle -> Active(notified) -> Idle state machine for one alert kind
#[derive(Debug, Clone)]
pub struct AlertPolicy {
    kind: AlertKind,
    recovery_enabled: bool,
    state: AlertState,
}

impl AlertPolicy {
    pub fn new(kind: AlertKind, recovery_enabled: bool) -> Self {
        Self {
            kind,
            recovery_enabled,
            state: AlertState::default(),
        }
    }

    /// Advance the state machine with this frame's debounce result
    pub fn observe(&mut self, update: DebounceUpdate) -> Option<AlertTransition> {
        if !self.state.active {
            if update.crossed {
                self.state = AlertState {
                    active: true,
                    notified_onset: true,
                };
                info!(kind = self.kind.as_str(), frames = update.count, "Alert onset");
                return Some(AlertTransition::Onset);
            }
            return None;
        }

        if update.count == 0 {
            let notify = self.recovery_enabled && self.state.notified_onset;
            self.state = AlertState::default();
            info!(kind = self.kind.as_str(), notify, "Alert recovered");
            return Some(AlertTransition::Recovery { notify });
        }

        None
    }

    /// Drop any episode without emitting a recovery (face lost, session reset)
    pub fn clear(&mut self) {
        if self.state.active {
            debug!(kind = self.kind.as_str(), "Alert episode cleared without recovery");
        }
        self.state = AlertState::default();
    }

    pub fn kind(&self) -> AlertKind {
        self.kind
    }

    pub fn state(&self) -> AlertState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state.active
    }

    pub fn recovery_enabled(&self) -> bool {
        self.recovery_enabled
    }
}
