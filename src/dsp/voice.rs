//! A single synthesized voice: oscillator × envelope × effect chain,
//! with a stereo position.

use std::f64::consts::FRAC_PI_4;

use crate::config::VoiceParams;
use crate::error::EngineError;

use super::buffer::RenderedBuffer;
use super::chain::EffectChain;
use super::envelope::Envelope;
use super::oscillator::Oscillator;

/// One sound instance. Created per trigger, discarded when finished.
#[derive(Debug, Clone)]
pub struct ToneVoice {
    oscillator: Oscillator,
    envelope: Envelope,
    effects: EffectChain,
    gain_l: f64,
    gain_r: f64,
    total_samples: u64,
    position: u64,
}

impl ToneVoice {
    /// Build a centered voice. Parameters are validated before any state is
    /// allocated; no partial work happens on rejection.
    pub fn new(params: &VoiceParams, sample_rate: f64) -> Result<Self, EngineError> {
        Self::with_pan(params, 0.0, sample_rate)
    }

    /// Build a voice at an equal-power stereo position, `pan` in [-1, 1]
    /// (-1 hard left, 0 center, 1 hard right).
    pub fn with_pan(params: &VoiceParams, pan: f64, sample_rate: f64) -> Result<Self, EngineError> {
        let angle = (pan.clamp(-1.0, 1.0) + 1.0) * FRAC_PI_4;
        Self::with_channel_gains(params, angle.cos(), angle.sin(), sample_rate)
    }

    /// Build a voice with explicit per-channel weights (e.g. a bassline
    /// leaning 60/40 left).
    pub fn with_channel_gains(
        params: &VoiceParams,
        gain_l: f64,
        gain_r: f64,
        sample_rate: f64,
    ) -> Result<Self, EngineError> {
        params.validate()?;

        let envelope_spec = params.effects.as_ref().and_then(|e| e.envelope);
        Ok(ToneVoice {
            oscillator: Oscillator::new(params.waveform, params.frequency, sample_rate),
            envelope: Envelope::from_spec(
                envelope_spec,
                params.volume,
                params.duration_seconds,
                sample_rate,
            ),
            effects: EffectChain::from_spec(params.effects.as_ref(), sample_rate),
            gain_l,
            gain_r,
            total_samples: (params.duration_seconds * sample_rate) as u64,
            position: 0,
        })
    }

    /// Samples this voice spans.
    pub fn total_samples(&self) -> u64 {
        self.total_samples
    }

    pub fn is_finished(&self) -> bool {
        self.position >= self.total_samples
    }

    /// Next stereo frame; (0, 0) once finished.
    #[inline]
    pub fn next_frame(&mut self) -> (f64, f64) {
        if self.is_finished() {
            return (0.0, 0.0);
        }
        let raw = self.oscillator.next_sample() * self.envelope.amplitude(self.position);
        let shaped = self.effects.process(raw);
        self.position += 1;
        (shaped * self.gain_l, shaped * self.gain_r)
    }

    /// Render the whole voice into `buffer` starting at `offset` frames,
    /// summing additively so overlapping voices coexist. Writes past the
    /// buffer end are dropped.
    pub fn mix_into(&mut self, buffer: &mut RenderedBuffer, offset: usize) {
        let frames = buffer.frames();
        let stereo = buffer.channel_count() >= 2;
        while !self.is_finished() {
            let index = offset + self.position as usize;
            let (l, r) = self.next_frame();
            if index >= frames {
                // next_frame advanced the position; keep draining
                continue;
            }
            buffer.channels[0][index] += l as f32;
            if stereo {
                buffer.channels[1][index] += r as f32;
            }
        }
    }
}
