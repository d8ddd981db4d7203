//! Continuous driving duration reminder

use std::time::Duration;
use tracing::info;

/// Fires once every `max_duration` of monitored time, restarting its clock
/// from the firing frame.
#[derive(Debug, Clone)]
pub struct DurationWatchdog {
    session_start_ms: Option<u64>,
    max_duration_ms: u64,
}

impl DurationWatchdog {
    pub fn new(max_duration: Duration) -> Self {
        Self {
            session_start_ms: None,
            max_duration_ms: u64::try_from(max_duration.as_millis()).unwrap_or(u64::MAX).max(1),
        }
    }

    /// Start (or restart) the session clock
    pub fn start(&mut self, now_ms: u64) {
        self.session_start_ms = Some(now_ms);
    }

    /// Check the clock; the first call starts it if `start` was never called
    pub fn check(&mut self, now_ms: u64) -> bool {
        let start = *self.session_start_ms.get_or_insert(now_ms);
        if now_ms.saturating_sub(start) < self.max_duration_ms {
            return false;
        }

        info!(
            elapsed_ms = now_ms - start,
            max_duration_ms = self.max_duration_ms,
            "Continuous driving duration exceeded"
        );
        self.session_start_ms = Some(now_ms);
        true
    }

    pub fn session_start_ms(&self) -> Option<u64> {
        self.session_start_ms
    }

    /// Time since the clock last started
    pub fn elapsed(&self, now_ms: u64) -> Duration {
        let start = self.session_start_ms.unwrap_or(now_ms);
        Duration::from_millis(now_ms.saturating_sub(start))
    }

    pub fn max_duration(&self) -> Duration {
        Duration::from_millis(self.max_duration_ms)
    }
}
