//! Amplitude envelopes over a voice's declared lifetime.

use crate::config::EnvelopeSpec;

/// Fade-in length of the default envelope, in seconds.
const DEFAULT_FADE_IN: f64 = 0.010;

/// The default shape decays to `volume * DECAY_FLOOR` at the voice end.
/// Not exactly zero: a true zero target makes the exponential degenerate.
const DECAY_FLOOR: f64 = 1e-3;

/// Amplitude curve applied to a voice over its lifetime. Values always lie
/// in [0, volume] and hit zero (or the decay floor) at the declared end, so
/// consecutive voices join without clicks.
#[derive(Debug, Clone)]
pub struct Envelope {
    shape: Shape,
    volume: f64,
    duration: f64,
    sample_rate: f64,
}

#[derive(Debug, Clone)]
enum Shape {
    /// Linear attack/decay/sustain/release.
    Adsr(EnvelopeSpec),
    /// 10ms linear fade-in, then exponential decay to the floor.
    Decay,
}

impl Envelope {
    /// Build from an optional explicit spec; `None` selects the default
    /// exponential-decay shape.
    pub fn from_spec(
        spec: Option<EnvelopeSpec>,
        volume: f64,
        duration: f64,
        sample_rate: f64,
    ) -> Self {
        let shape = match spec {
            Some(adsr) => Shape::Adsr(adsr),
            None => Shape::Decay,
        };
        Envelope { shape, volume, duration, sample_rate }
    }

    /// Envelope value at a sample index, in [0, volume].
    pub fn amplitude(&self, sample_index: u64) -> f64 {
        let t = sample_index as f64 / self.sample_rate;
        if t >= self.duration || self.volume <= 0.0 {
            return 0.0;
        }
        let level = match &self.shape {
            Shape::Adsr(spec) => self.adsr_at(spec, t),
            Shape::Decay => self.decay_at(t),
        };
        level.clamp(0.0, self.volume)
    }

    fn adsr_at(&self, spec: &EnvelopeSpec, t: f64) -> f64 {
        let release_start = (self.duration - spec.release.max(0.0)).max(0.0);

        // Pre-release segment value at time `u` (attack, decay, sustain).
        let pre_release = |u: f64| -> f64 {
            if spec.attack > 0.0 && u < spec.attack.min(release_start) {
                return self.volume * (u / spec.attack);
            }
            let decay_start = spec.attack.min(release_start);
            if spec.decay > 0.0 && u < (decay_start + spec.decay).min(release_start) {
                let frac = (u - decay_start) / spec.decay;
                return self.volume * (1.0 - (1.0 - spec.sustain) * frac);
            }
            self.volume * spec.sustain
        };

        if t < release_start {
            pre_release(t)
        } else if spec.release > 0.0 {
            let frac = (t - release_start) / (self.duration - release_start);
            pre_release(release_start) * (1.0 - frac)
        } else {
            pre_release(release_start)
        }
    }

    fn decay_at(&self, t: f64) -> f64 {
        let fade = DEFAULT_FADE_IN.min(self.duration / 2.0);
        if t < fade {
            return self.volume * (t / fade);
        }
        let frac = (t - fade) / (self.duration - fade);
        self.volume * DECAY_FLOOR.powf(frac)
    }
}
