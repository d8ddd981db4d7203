//! Consecutive-frame debounce counter

use serde::{Deserialize, Serialize};

/// Result of feeding one frame into a [`DebounceCounter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebounceUpdate {
    /// Consecutive frames the condition has held, 0 after a release
    pub count: u32,
    /// True only on the frame where `count` first reached the threshold
    pub crossed: bool,
}

/// Counts consecutive frames a condition holds and edge-triggers once
/// when the count reaches the threshold.
#[derive(Debug, Clone)]
pub struct DebounceCounter {
    count: u32,
    threshold: u32,
}

impl DebounceCounter {
    /// `threshold` of 0 is treated as 1; configuration rejects it earlier
    pub fn new(threshold: u32) -> Self {
        Self {
            count: 0,
            threshold: threshold.max(1),
        }
    }

    pub fn update(&mut self, condition_held: bool) -> DebounceUpdate {
        if !condition_held {
            self.count = 0;
            return DebounceUpdate {
                count: 0,
                crossed: false,
            };
        }

        self.count = self.count.saturating_add(1);
        DebounceUpdate {
            count: self.count,
            crossed: self.count == self.threshold,
        }
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Whether the current run has reached the threshold
    pub fn is_satisfied(&self) -> bool {
        self.count >= self.threshold
    }

    pub fn reset(&mut self) {
        self.count = 0;
    }
}
