//! Waveform oscillator — stateless, one closed form per shape.

use std::f64::consts::PI;

use crate::config::Waveform;

/// Instantaneous amplitude of `waveform` at `sample_index`, in [-1, 1].
///
/// `t = sample_index / sample_rate`. All four shapes are pure functions of
/// `t`, so overlapping voices can share nothing and still stay phase-exact.
pub fn sample(waveform: Waveform, frequency: f64, sample_index: u64, sample_rate: f64) -> f64 {
    let t = sample_index as f64 / sample_rate;
    let cycles = t * frequency;
    match waveform {
        Waveform::Sine => (2.0 * PI * cycles).sin(),
        Waveform::Square => (2.0 * PI * cycles).sin().signum(),
        Waveform::Sawtooth => 2.0 * (cycles - (cycles + 0.5).floor()),
        Waveform::Triangle => 2.0 * (2.0 * (cycles - (cycles + 0.5).floor())).abs() - 1.0,
    }
}

/// A sample cursor over the stateless waveform function. Live voices use
/// this so each call site does not have to track its own index.
#[derive(Debug, Clone)]
pub struct Oscillator {
    pub waveform: Waveform,
    pub frequency: f64,
    sample_rate: f64,
    index: u64,
}

impl Oscillator {
    pub fn new(waveform: Waveform, frequency: f64, sample_rate: f64) -> Self {
        Oscillator { waveform, frequency, sample_rate, index: 0 }
    }

    /// Generate the next sample and advance the cursor.
    pub fn next_sample(&mut self) -> f64 {
        let s = sample(self.waveform, self.frequency, self.index, self.sample_rate);
        self.index += 1;
        s
    }

    /// Rewind to the start of the waveform.
    pub fn reset(&mut self) {
        self.index = 0;
    }
}
