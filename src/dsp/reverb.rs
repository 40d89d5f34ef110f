//! Convolution reverb against a generated impulse response.
//!
//! The impulse response is exponentially decaying white noise,
//! `rand(-1, 1) * (1 - i/len)^2`, regenerated on every construction and
//! normalized to unit energy so the wet level is independent of room size.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::config::ReverbSpec;

/// A mono convolution reverb.
///
/// Keeps a ring buffer of recent input and convolves it with the impulse
/// response sample by sample. Room sizes stay short in this engine (voice
/// effects, not hall simulation), so direct convolution is adequate.
#[derive(Debug, Clone)]
pub struct Reverb {
    impulse: Vec<f64>,
    history: Vec<f64>,
    write_pos: usize,
}

impl Reverb {
    pub fn new(room_size_seconds: f64, sample_rate: f64) -> Self {
        let len = ((room_size_seconds * sample_rate) as usize).max(1);
        let impulse = generate_impulse(len);
        Reverb {
            history: vec![0.0; impulse.len()],
            impulse,
            write_pos: 0,
        }
    }

    pub fn from_spec(spec: &ReverbSpec, sample_rate: f64) -> Self {
        Reverb::new(spec.room_size_seconds, sample_rate)
    }

    /// Process one sample: convolve the input history with the impulse.
    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        let len = self.history.len();
        self.history[self.write_pos] = input;

        let mut acc = 0.0;
        for (k, &h) in self.impulse.iter().enumerate() {
            // x(t - k), walking backwards from the newest sample
            let idx = (self.write_pos + len - k) % len;
            acc += h * self.history[idx];
        }

        self.write_pos = (self.write_pos + 1) % len;
        acc
    }

    /// Clear the input history.
    pub fn clear(&mut self) {
        self.history.fill(0.0);
        self.write_pos = 0;
    }

    #[cfg(test)]
    fn impulse(&self) -> &[f64] {
        &self.impulse
    }
}

/// Decaying-noise impulse response, unit energy.
///
/// The RNG is seeded from the length: equal room sizes always yield the same
/// response, keeping renders deterministic for a fixed configuration.
fn generate_impulse(len: usize) -> Vec<f64> {
    let mut rng = SmallRng::seed_from_u64(len as u64);
    let mut impulse: Vec<f64> = (0..len)
        .map(|i| {
            let fade = 1.0 - i as f64 / len as f64;
            rng.gen_range(-1.0..1.0) * fade * fade
        })
        .collect();

    let energy: f64 = impulse.iter().map(|s| s * s).sum();
    if energy > 0.0 {
        let scale = 1.0 / energy.sqrt();
        for s in impulse.iter_mut() {
            *s *= scale;
        }
    }
    impulse
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn impulse_length_matches_room_size() {
        let r = Reverb::new(0.05, 1000.0);
        assert_eq!(r.impulse().len(), 50);
    }

    #[test]
    fn impulse_has_unit_energy() {
        let r = Reverb::new(0.1, 44100.0);
        let energy: f64 = r.impulse().iter().map(|s| s * s).sum();
        assert!((energy - 1.0).abs() < 1e-9, "IR energy should be 1, got {energy}");
    }

    #[test]
    fn impulse_envelope_decays() {
        let r = Reverb::new(0.5, 44100.0);
        let ir = r.impulse();
        let head: f64 = ir[..ir.len() / 4].iter().map(|s| s.abs()).sum();
        let tail: f64 = ir[3 * ir.len() / 4..].iter().map(|s| s.abs()).sum();
        assert!(head > tail * 4.0, "IR head should outweigh the tail: {head} vs {tail}");
    }

    #[test]
    fn same_room_size_same_impulse() {
        let a = Reverb::new(0.2, 44100.0);
        let b = Reverb::new(0.2, 44100.0);
        assert_eq!(a.impulse(), b.impulse());
    }

    #[test]
    fn convolving_unit_impulse_replays_response() {
        let mut r = Reverb::new(0.02, 1000.0); // 20 taps
        let ir: Vec<f64> = r.impulse().to_vec();

        let mut out = Vec::new();
        out.push(r.process(1.0));
        for _ in 1..20 {
            out.push(r.process(0.0));
        }
        for (k, (&o, &h)) in out.iter().zip(ir.iter()).enumerate() {
            assert!((o - h).abs() < 1e-12, "tap {k}: {o} vs {h}");
        }
    }

    #[test]
    fn tail_rings_after_input_stops() {
        let mut r = Reverb::new(0.05, 44100.0);
        for _ in 0..100 {
            r.process(0.5);
        }
        let mut found = false;
        for _ in 0..1000 {
            if r.process(0.0).abs() > 1e-6 {
                found = true;
                break;
            }
        }
        assert!(found, "reverb should ring after the input stops");
    }
}
