//! Dynamics compressor — feed-forward, soft knee, peak envelope follower.

/// A stereo dynamics compressor. The mixing graph runs one instance with
/// fixed parameters on the output bus; the knobs exist for tests.
#[derive(Debug, Clone)]
pub struct Compressor {
    sample_rate: f64,

    /// Threshold in dB.
    pub threshold: f64,
    /// Compression ratio (e.g. 12.0 = 12:1).
    pub ratio: f64,
    /// Knee width in dB (0 = hard knee).
    pub knee: f64,
    /// Attack time in seconds.
    pub attack: f64,
    /// Release time in seconds.
    pub release: f64,

    envelope: f64,
}

impl Compressor {
    /// The graph's fixed output-bus compressor: −24 dB threshold, 30 dB
    /// knee, 12:1 ratio, 3 ms attack, 250 ms release.
    pub fn output_bus(sample_rate: f64) -> Self {
        Compressor::with_params(sample_rate, -24.0, 30.0, 12.0, 0.003, 0.25)
    }

    pub fn with_params(
        sample_rate: f64,
        threshold: f64,
        knee: f64,
        ratio: f64,
        attack: f64,
        release: f64,
    ) -> Self {
        Compressor {
            sample_rate,
            threshold: threshold.clamp(-60.0, 0.0),
            knee: knee.max(0.0),
            ratio: ratio.clamp(1.0, 20.0),
            attack: attack.clamp(0.0001, 1.0),
            release: release.clamp(0.001, 5.0),
            envelope: 0.0,
        }
    }

    #[inline]
    fn linear_to_db(linear: f64) -> f64 {
        if linear <= 0.0 {
            -120.0
        } else {
            20.0 * linear.log10()
        }
    }

    #[inline]
    fn db_to_linear(db: f64) -> f64 {
        10.0_f64.powf(db / 20.0)
    }

    /// Gain reduction in dB for a given input level (in dB). Zero or
    /// negative.
    #[inline]
    fn compute_gain(&self, input_db: f64) -> f64 {
        if self.knee <= 0.0 {
            if input_db <= self.threshold {
                0.0
            } else {
                (self.threshold - input_db) * (1.0 - 1.0 / self.ratio)
            }
        } else {
            let half_knee = self.knee / 2.0;
            let knee_start = self.threshold - half_knee;
            let knee_end = self.threshold + half_knee;

            if input_db <= knee_start {
                0.0
            } else if input_db >= knee_end {
                (self.threshold - input_db) * (1.0 - 1.0 / self.ratio)
            } else {
                // Quadratic interpolation across the knee
                let x = input_db - knee_start;
                let knee_factor = x / self.knee;
                -knee_factor * knee_factor * (1.0 - 1.0 / self.ratio) * half_knee
            }
        }
    }

    /// Process a stereo frame.
    #[inline]
    pub fn process(&mut self, left: f64, right: f64) -> (f64, f64) {
        let input_level = left.abs().max(right.abs());

        // Peak follower with separate attack/release smoothing
        let attack_coef = (-1.0 / (self.attack * self.sample_rate)).exp();
        let release_coef = (-1.0 / (self.release * self.sample_rate)).exp();

        if input_level > self.envelope {
            self.envelope = attack_coef * self.envelope + (1.0 - attack_coef) * input_level;
        } else {
            self.envelope = release_coef * self.envelope + (1.0 - release_coef) * input_level;
        }

        let gain = Self::db_to_linear(self.compute_gain(Self::linear_to_db(self.envelope)));
        (left * gain, right * gain)
    }

    /// Reset the follower state.
    pub fn reset(&mut self) {
        self.envelope = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_below_threshold() {
        let mut comp = Compressor::with_params(44100.0, -20.0, 0.0, 4.0, 0.001, 0.1);
        for _ in 0..1000 {
            comp.process(0.05, 0.05); // -26 dB, below threshold
        }
        let (out_l, out_r) = comp.process(0.05, 0.05);
        assert!(
            (out_l - 0.05).abs() < 0.01,
            "below threshold, output should track input: got {out_l}"
        );
        assert!((out_r - 0.05).abs() < 0.01);
    }

    #[test]
    fn reduces_loud_signals() {
        let mut comp = Compressor::with_params(44100.0, -12.0, 0.0, 4.0, 0.001, 0.1);
        for _ in 0..5000 {
            comp.process(1.0, 1.0); // 0 dB, well above threshold
        }
        let (out_l, _) = comp.process(1.0, 1.0);
        assert!(out_l < 0.5, "compressor should reduce loud signals: got {out_l}");
        assert!(out_l > 0.1, "compressor should not over-compress: got {out_l}");
    }

    #[test]
    fn attack_lets_first_samples_through() {
        let mut comp = Compressor::with_params(44100.0, -20.0, 0.0, 10.0, 0.01, 0.5);
        let (first, _) = comp.process(1.0, 1.0);
        for _ in 0..500 {
            comp.process(1.0, 1.0);
        }
        let (later, _) = comp.process(1.0, 1.0);
        assert!(
            first > later,
            "gain should fall over the attack: first={first}, later={later}"
        );
    }

    #[test]
    fn release_recovers_gain() {
        let mut comp = Compressor::with_params(44100.0, -20.0, 0.0, 10.0, 0.001, 0.05);
        for _ in 0..1000 {
            comp.process(1.0, 1.0);
        }
        let (compressed, _) = comp.process(0.1, 0.1);
        for _ in 0..5000 {
            comp.process(0.1, 0.1);
        }
        let (released, _) = comp.process(0.1, 0.1);
        assert!(
            released > compressed,
            "gain should recover after release: {compressed} -> {released}"
        );
    }

    #[test]
    fn output_bus_constants() {
        let comp = Compressor::output_bus(44100.0);
        assert_eq!(comp.threshold, -24.0);
        assert_eq!(comp.knee, 30.0);
        assert_eq!(comp.ratio, 12.0);
        assert!((comp.attack - 0.003).abs() < 1e-12);
        assert!((comp.release - 0.25).abs() < 1e-12);
    }

    #[test]
    fn soft_knee_is_gentler_than_hard_knee_near_threshold() {
        let mut hard = Compressor::with_params(44100.0, -20.0, 0.0, 12.0, 0.001, 0.1);
        let mut soft = Compressor::with_params(44100.0, -20.0, 30.0, 12.0, 0.001, 0.1);
        // Signal right at the threshold: -20 dB = 0.1 linear
        let mut hard_out = 0.0;
        let mut soft_out = 0.0;
        for _ in 0..5000 {
            hard_out = hard.process(0.1, 0.1).0;
            soft_out = soft.process(0.1, 0.1).0;
        }
        // The soft knee starts reducing before the threshold, so its output
        // is lower at the threshold itself.
        assert!(
            soft_out < hard_out,
            "soft knee should bite earlier: soft={soft_out}, hard={hard_out}"
        );
    }
}
