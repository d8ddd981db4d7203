//! Alarm audio control

use tracing::{debug, info};

/// Something that can play and stop the alarm sound
pub trait AudioSink {
    fn start(&mut self);
    fn stop(&mut self);
}

/// Turns the per-frame "should be playing" flag into start/stop edges, so
/// the sink never restarts audio that is already playing.
#[derive(Debug)]
pub struct AlarmLatch<S> {
    sink: S,
    playing: bool,
}

impl<S: AudioSink> AlarmLatch<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            playing: false,
        }
    }

    /// Apply this frame's flag; returns true if the sink was started or stopped
    pub fn update(&mut self, should_play: bool) -> bool {
        if should_play == self.playing {
            return false;
        }

        if should_play {
            self.sink.start();
        } else {
            self.sink.stop();
        }
        self.playing = should_play;
        true
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn into_inner(self) -> S {
        self.sink
    }
}

/// Sink that records alarm edges in the log
#[derive(Debug, Default)]
pub struct LogAudioSink {
    started: u64,
}

impl AudioSink for LogAudioSink {
    fn start(&mut self) {
        self.started += 1;
        info!(count = self.started, "Alarm started");
    }

    fn stop(&mut self) {
        debug!("Alarm stopped");
    }
}
