//! Frame loop: landmark lines in, engine decisions out to the sinks

use alerting::{AlarmLatch, AudioSink, DeliveryStats, NotificationDispatcher};
use dms::{FatigueEngine, FrameActions, Point, SessionStats};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, warn, Level};

use crate::MonitorError;

/// One line of landmark input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkFrame {
    /// Monotonic capture time (milliseconds)
    pub timestamp_ms: u64,
    /// One 68-point `[x, y]` list per detected face
    #[serde(default)]
    pub faces: Vec<Vec<Point>>,
}

/// Totals reported when the input ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub lines_read: u64,
    pub lines_skipped: u64,
    pub engine: SessionStats,
    pub delivery: DeliveryStats,
}

/// Drives one engine from a stream of landmark frames
pub struct Monitor<S: AudioSink> {
    engine: FatigueEngine,
    dispatcher: NotificationDispatcher,
    alarm: AlarmLatch<S>,
    last_timestamp_ms: Option<u64>,
    lines_read: u64,
    lines_skipped: u64,
}

impl<S: AudioSink> Monitor<S> {
    pub fn new(engine: FatigueEngine, dispatcher: NotificationDispatcher, audio: S) -> Self {
        Self {
            engine,
            dispatcher,
            alarm: AlarmLatch::new(audio),
            last_timestamp_ms: None,
            lines_read: 0,
            lines_skipped: 0,
        }
    }

    /// Process one input line; errors mean the line was skipped
    pub fn handle_line(&mut self, line: &str) -> Result<Option<FrameActions>, MonitorError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let frame: LandmarkFrame = serde_json::from_str(line)?;
        if let Some(last) = self.last_timestamp_ms {
            if frame.timestamp_ms < last {
                return Err(MonitorError::OutOfOrder {
                    timestamp_ms: frame.timestamp_ms,
                    last_ms: last,
                });
            }
        }

        let actions = self.engine.process_points(frame.faces, frame.timestamp_ms)?;
        self.last_timestamp_ms = Some(frame.timestamp_ms);

        if tracing::enabled!(Level::DEBUG) && !actions.overlay_hints.is_empty() {
            match serde_json::to_string(&actions.overlay_hints) {
                Ok(hints) => debug!(timestamp_ms = frame.timestamp_ms, "Overlay: {}", hints),
                Err(e) => debug!("Overlay not serializable: {}", e),
            }
        }

        self.alarm.update(actions.audio_should_play);
        self.dispatcher.submit_all(actions.notifications.iter().cloned());
        Ok(Some(actions))
    }

    /// Read frames until the input ends, then drain pending notifications
    pub async fn run<R>(mut self, input: R) -> Result<SessionSummary, MonitorError>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();
        while let Some(line) = lines.next_line().await? {
            self.lines_read += 1;
            if let Err(e) = self.handle_line(&line) {
                self.lines_skipped += 1;
                warn!(line = self.lines_read, "Skipping frame: {}", e);
            }
        }

        self.alarm.update(false);
        let engine = self.engine.stats();
        let delivery = self.dispatcher.shutdown().await;
        let summary = SessionSummary {
            lines_read: self.lines_read,
            lines_skipped: self.lines_skipped,
            engine,
            delivery,
        };

        info!(
            lines = summary.lines_read,
            skipped = summary.lines_skipped,
            frames = engine.frames_processed,
            drowsiness_episodes = engine.drowsiness_episodes,
            yawn_episodes = engine.yawn_episodes,
            reminders = engine.reminders,
            delivered = delivery.delivered,
            failed = delivery.failed,
            "Monitoring session ended"
        );
        Ok(summary)
    }
}
