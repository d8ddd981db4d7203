//! Driver Monitoring System (DMS)
//!
//! Fatigue decision engine fed by per-frame facial landmarks:
//! - Eye aspect ratio (prolonged eye closure / drowsiness)
//! - Mouth aspect ratio (yawning)
//! - Debounced, edge-triggered onset and recovery notifications
//! - Continuous driving duration reminders
//!
//! The engine performs no I/O. Each frame yields [`FrameActions`] that the
//! caller forwards to its render, audio, and notification sinks.

pub mod analysis;
pub mod config;
pub mod debounce;
pub mod landmarks;
pub mod metrics;
pub mod state;
pub mod watchdog;

pub use analysis::{
    AlertText, FrameActions, NotificationKind, NotificationRequest, OverlayHint, SessionStats,
};
pub use config::{DmsConfig, FaceLossPolicy, MessageConfig, NotificationConfig};
pub use debounce::{DebounceCounter, DebounceUpdate};
pub use landmarks::{FaceRegion, LandmarkSet, Point};
pub use metrics::AspectMetrics;
pub use state::{AlertKind, AlertPolicy, AlertState, AlertTransition};
pub use watchdog::DurationWatchdog;

use thiserror::Error;
use tracing::{debug, info, warn};

/// DMS error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DmsError {
    #[error("Invalid {region} landmarks: expected {expected} points, got {actual}")]
    InvalidInput {
        region: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Alert banner anchors (pixels)
const DROWSINESS_TEXT_POSITION: (i32, i32) = (10, 30);
const YAWN_TEXT_POSITION: (i32, i32) = (10, 60);

fn alert_text(kind: AlertKind) -> AlertText {
    let (text, position) = match kind {
        AlertKind::Drowsiness => ("ALERT! DROWSINESS DETECTED", DROWSINESS_TEXT_POSITION),
        AlertKind::Yawn => ("ALERT! YAWN DETECTED", YAWN_TEXT_POSITION),
    };
    AlertText {
        kind,
        text: text.to_string(),
        position,
    }
}

/// Debounce counter and alert policy for one kind
#[derive(Debug, Clone)]
struct AlertTracker {
    counter: DebounceCounter,
    policy: AlertPolicy,
}

impl AlertTracker {
    fn new(kind: AlertKind, config: &DmsConfig) -> Self {
        Self {
            counter: DebounceCounter::new(config.debounce_frames(kind)),
            policy: AlertPolicy::new(kind, config.recovery_enabled(kind)),
        }
    }

    fn step(&mut self, condition_held: bool) -> Option<AlertTransition> {
        let update = self.counter.update(condition_held);
        self.policy.observe(update)
    }

    fn clear(&mut self) {
        self.counter.reset();
        self.policy.clear();
    }
}

/// Alert state for one detection-order face index
#[derive(Debug, Clone)]
struct FaceSlot {
    drowsiness: AlertTracker,
    yawn: AlertTracker,
    absent_frames: u32,
}

impl FaceSlot {
    fn new(config: &DmsConfig) -> Self {
        Self {
            drowsiness: AlertTracker::new(AlertKind::Drowsiness, config),
            yawn: AlertTracker::new(AlertKind::Yawn, config),
            absent_frames: 0,
        }
    }

    fn tracker(&self, kind: AlertKind) -> &AlertTracker {
        match kind {
            AlertKind::Drowsiness => &self.drowsiness,
            AlertKind::Yawn => &self.yawn,
        }
    }

    fn tracker_mut(&mut self, kind: AlertKind) -> &mut AlertTracker {
        match kind {
            AlertKind::Drowsiness => &mut self.drowsiness,
            AlertKind::Yawn => &mut self.yawn,
        }
    }

    fn any_active(&self) -> bool {
        AlertKind::ALL.iter().any(|&kind| self.tracker(kind).policy.is_active())
    }

    fn clear(&mut self) {
        self.drowsiness.clear();
        self.yawn.clear();
    }
}

/// Contours and ratios measured for one face before any state changes
struct FaceMeasurement<'a> {
    left_eye: &'a [Point],
    right_eye: &'a [Point],
    mouth: &'a [Point],
    ear: Option<f32>,
    mar: Option<f32>,
}

impl<'a> FaceMeasurement<'a> {
    fn measure(face: &'a LandmarkSet) -> Result<Self, DmsError> {
        let left_eye = face.region(FaceRegion::LeftEye)?;
        let right_eye = face.region(FaceRegion::RightEye)?;
        let mouth = face.region(FaceRegion::Mouth)?;
        Ok(Self {
            left_eye,
            right_eye,
            mouth,
            ear: metrics::combined_eye_ratio(left_eye, right_eye)?,
            mar: metrics::mouth_aspect_ratio(mouth)?,
        })
    }

    fn metrics(&self) -> Option<AspectMetrics> {
        Some(AspectMetrics {
            ear: self.ear?,
            mar: self.mar?,
        })
    }
}

/// Fatigue decision engine for one monitoring session.
///
/// Frames must be fed in order from a single caller.
pub struct FatigueEngine {
    config: DmsConfig,
    slots: Vec<FaceSlot>,
    watchdog: DurationWatchdog,
    stats: SessionStats,
}

impl FatigueEngine {
    /// Create a new engine with configuration
    pub fn new(config: DmsConfig) -> Result<Self, DmsError> {
        config.validate()?;
        if config.notifications.alert_recipients.is_empty() {
            warn!("No alert recipients configured; onset and recovery messages will not be sent");
        }
        if config.notifications.reminder_recipients.is_empty() {
            warn!("No reminder recipients configured; break reminders will not be sent");
        }
        info!(
            ear_threshold = config.ear_threshold,
            mar_threshold = config.mar_threshold,
            eye_closed_frames = config.eye_closed_frames,
            yawn_frames = config.yawn_frames,
            max_driving_duration_secs = config.max_driving_duration_secs,
            "Creating fatigue engine"
        );

        Ok(Self {
            watchdog: DurationWatchdog::new(config.max_driving_duration()),
            slots: Vec::new(),
            stats: SessionStats::default(),
            config,
        })
    }

    /// Start the driving-duration clock explicitly
    pub fn start_session(&mut self, now_ms: u64) {
        self.watchdog.start(now_ms);
    }

    /// Reset driver state and restart the duration clock (on driver change)
    pub fn reset_session(&mut self, now_ms: u64) {
        info!(now_ms, "Resetting monitoring session");
        self.slots.clear();
        self.watchdog.start(now_ms);
    }

    /// Validate raw landmark points into sets, then process the frame.
    ///
    /// A face with the wrong number of points rejects the whole frame.
    pub fn process_points(
        &mut self,
        faces: Vec<Vec<Point>>,
        now_ms: u64,
    ) -> Result<FrameActions, DmsError> {
        match faces
            .into_iter()
            .map(LandmarkSet::new)
            .collect::<Result<Vec<_>, _>>()
        {
            Ok(faces) => self.process_frame(&faces, now_ms),
            Err(e) => Err(self.reject(e, now_ms)),
        }
    }

    /// Decide what should happen for one frame.
    ///
    /// An `InvalidInput` error rejects the whole frame and leaves the
    /// detection state untouched.
    pub fn process_frame(
        &mut self,
        faces: &[LandmarkSet],
        now_ms: u64,
    ) -> Result<FrameActions, DmsError> {
        let measurements = match faces
            .iter()
            .map(FaceMeasurement::measure)
            .collect::<Result<Vec<_>, _>>()
        {
            Ok(m) => m,
            Err(e) => return Err(self.reject(e, now_ms)),
        };

        while self.slots.len() < measurements.len() {
            self.slots.push(FaceSlot::new(&self.config));
        }

        let mut actions = FrameActions::default();

        for (index, measurement) in measurements.iter().enumerate() {
            let eyes_closed = measurement
                .ear
                .map_or(false, |ear| ear < self.config.ear_threshold);
            let yawning = measurement
                .mar
                .map_or(false, |mar| mar > self.config.mar_threshold);
            debug!(
                face = index,
                ear = ?measurement.ear,
                mar = ?measurement.mar,
                eyes_closed,
                yawning,
                "Face measured"
            );

            let slot = &mut self.slots[index];
            slot.absent_frames = 0;

            let mut alerts = Vec::new();
            for (kind, held) in [(AlertKind::Drowsiness, eyes_closed), (AlertKind::Yawn, yawning)] {
                let tracker = slot.tracker_mut(kind);
                match tracker.step(held) {
                    Some(AlertTransition::Onset) => {
                        self.stats.record_onset(kind);
                        push_requests(
                            &mut actions.notifications,
                            NotificationKind::Onset(kind),
                            self.config.onset_message(kind),
                            &self.config.notifications.alert_recipients,
                        );
                    }
                    Some(AlertTransition::Recovery { notify: true }) => {
                        push_requests(
                            &mut actions.notifications,
                            NotificationKind::Recovery(kind),
                            self.config.recovery_message(kind),
                            &self.config.notifications.alert_recipients,
                        );
                    }
                    Some(AlertTransition::Recovery { notify: false }) | None => {}
                }
                if tracker.policy.is_active() {
                    alerts.push(alert_text(kind));
                }
            }

            actions.overlay_hints.push(OverlayHint {
                face_index: index,
                left_eye: measurement.left_eye.to_vec(),
                right_eye: measurement.right_eye.to_vec(),
                mouth: measurement.mouth.to_vec(),
                metrics: measurement.metrics(),
                alerts,
            });
        }

        self.apply_face_loss(measurements.len());

        actions.audio_should_play = self.slots.iter().any(FaceSlot::any_active);

        if self.watchdog.check(now_ms) {
            self.stats.reminders += 1;
            let message = self.config.reminder_message();
            push_requests(
                &mut actions.notifications,
                NotificationKind::DurationReminder,
                &message,
                &self.config.notifications.reminder_recipients,
            );
        }

        self.stats.frames_processed += 1;
        Ok(actions)
    }

    fn reject(&mut self, error: DmsError, now_ms: u64) -> DmsError {
        self.stats.frames_rejected += 1;
        warn!(error = %error, now_ms, "Rejecting frame");
        error
    }

    /// Age face slots that had no detection this frame
    fn apply_face_loss(&mut self, present: usize) {
        let policy = self.config.face_loss;
        for (index, slot) in self.slots.iter_mut().enumerate().skip(present) {
            slot.absent_frames = slot.absent_frames.saturating_add(1);
            let expired = match policy {
                FaceLossPolicy::Reset => true,
                FaceLossPolicy::Hold { frames } => slot.absent_frames > frames,
            };
            if expired {
                if slot.any_active() {
                    warn!(face = index, "Face lost during active alert; clearing episode");
                }
                slot.clear();
            }
        }
    }

    /// Consecutive-frame count for a face slot, if the slot exists
    pub fn debounce_count(&self, face_index: usize, kind: AlertKind) -> Option<u32> {
        self.slots
            .get(face_index)
            .map(|slot| slot.tracker(kind).counter.count())
    }

    /// Alert state for a face slot, if the slot exists
    pub fn alert_state(&self, face_index: usize, kind: AlertKind) -> Option<AlertState> {
        self.slots
            .get(face_index)
            .map(|slot| slot.tracker(kind).policy.state())
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn config(&self) -> &DmsConfig {
        &self.config
    }

    pub fn watchdog(&self) -> &DurationWatchdog {
        &self.watchdog
    }
}

fn push_requests(
    out: &mut Vec<NotificationRequest>,
    kind: NotificationKind,
    message: &str,
    recipients: &[String],
) {
    for recipient in recipients {
        out.push(NotificationRequest {
            kind,
            message: message.to_string(),
            recipient: recipient.clone(),
        });
    }
}
