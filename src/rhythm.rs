//! Look-ahead rhythm scheduler.
//!
//! Not a per-sample renderer: a coarse tick (≈25ms) schedules every hit
//! whose start falls inside the next ≈100ms window, so timing stays
//! sample-accurate even when the driving timer jitters. The scheduler is a
//! plain state machine — the caller owns the timer and the audio clock, and
//! cancellation is immediate and deterministic.

use tracing::debug;

use crate::config::{RhythmPattern, Waveform};
use crate::error::{EngineError, invalid};

/// Recommended driving-timer period in seconds.
pub const TICK_INTERVAL: f64 = 0.025;

/// Default scheduling window in seconds.
pub const LOOKAHEAD_WINDOW: f64 = 0.100;

/// Accented hits (velocity ≥ 1.0) sound an octave above the base click.
pub const ACCENT_FREQUENCY: f64 = 880.0;
pub const BASE_FREQUENCY: f64 = 440.0;

/// One scheduled percussive click.
#[derive(Debug, Clone, PartialEq)]
pub struct RhythmHit {
    /// Absolute start time on the caller's audio clock, in seconds.
    pub start_time: f64,
    pub frequency: f64,
    /// Peak gain [0, 1].
    pub amplitude: f64,
    /// Hit length: a quarter of one beat.
    pub duration: f64,
    pub waveform: Waveform,
}

#[derive(Debug, Clone)]
pub struct RhythmScheduler {
    pattern: Vec<f64>,
    waveform: Waveform,
    volume: f64,
    seconds_per_beat: f64,
    looping: bool,
    lookahead: f64,

    next_hit: f64,
    index: usize,
    running: bool,
    /// Seconds from the pause instant to the next hit, while paused.
    pause_offset: Option<f64>,
}

impl RhythmScheduler {
    /// Start a pattern at `now` with the default look-ahead window.
    pub fn start(
        pattern: &RhythmPattern,
        bpm: u32,
        looping: bool,
        now: f64,
    ) -> Result<Self, EngineError> {
        Self::with_lookahead(pattern, bpm, looping, now, LOOKAHEAD_WINDOW)
    }

    /// Start with an explicit look-ahead window (tests shrink it).
    pub fn with_lookahead(
        pattern: &RhythmPattern,
        bpm: u32,
        looping: bool,
        now: f64,
        lookahead: f64,
    ) -> Result<Self, EngineError> {
        pattern.validate()?;
        if bpm == 0 {
            return Err(invalid("rhythm bpm must be positive"));
        }
        debug!(bpm, looping, steps = pattern.pattern.len(), "rhythm scheduler started");
        Ok(RhythmScheduler {
            pattern: pattern.pattern.clone(),
            waveform: pattern.sound_waveform,
            volume: pattern.volume,
            seconds_per_beat: 60.0 / bpm as f64,
            looping,
            lookahead,
            next_hit: now,
            index: 0,
            running: true,
            pause_offset: None,
        })
    }

    /// Schedule every hit due inside the look-ahead window. Call once per
    /// timer tick with the current audio-clock time.
    pub fn tick(&mut self, now: f64) -> Vec<RhythmHit> {
        if !self.running || self.pause_offset.is_some() {
            return Vec::new();
        }

        let mut hits = Vec::new();
        while self.next_hit < now + self.lookahead {
            let velocity = self.pattern[self.index];
            if velocity > 0.0 {
                let frequency = if velocity >= 1.0 {
                    ACCENT_FREQUENCY
                } else {
                    BASE_FREQUENCY
                };
                hits.push(RhythmHit {
                    start_time: self.next_hit,
                    frequency,
                    amplitude: (velocity * self.volume).clamp(0.0, 1.0),
                    duration: self.seconds_per_beat / 4.0,
                    waveform: self.waveform,
                });
            }

            self.next_hit += self.seconds_per_beat;
            self.index = (self.index + 1) % self.pattern.len();
            if self.index == 0 && !self.looping {
                // One full pass emitted; final hits are already out.
                self.running = false;
                break;
            }
        }
        hits
    }

    /// Halt immediately. No hit is emitted after this returns.
    pub fn stop(&mut self) {
        if self.running {
            debug!("rhythm scheduler stopped");
        }
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Freeze the distance to the next hit.
    pub fn pause(&mut self, now: f64) {
        if self.running && self.pause_offset.is_none() {
            self.pause_offset = Some((self.next_hit - now).max(0.0));
        }
    }

    /// Continue with the frozen offset re-anchored at `now`.
    pub fn resume(&mut self, now: f64) {
        if let Some(offset) = self.pause_offset.take() {
            self.next_hit = now + offset;
        }
    }

    pub fn is_paused(&self) -> bool {
        self.pause_offset.is_some()
    }
}
