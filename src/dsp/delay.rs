//! Feedback delay line: `y(t) = x(t) + feedback * y(t - delay)`.

use crate::config::DelaySpec;

/// Feedback ceiling. Below 1.0 the echo train is guaranteed to decay.
const MAX_FEEDBACK: f64 = 0.95;

/// A mono recursive delay line. The buffer stores past *outputs*, so the
/// feedback term folds every earlier echo back in.
#[derive(Debug, Clone)]
pub struct DelayLine {
    buffer: Vec<f64>,
    write_pos: usize,
    feedback: f64,
}

impl DelayLine {
    pub fn new(delay_seconds: f64, feedback: f64, sample_rate: f64) -> Self {
        let delay_samples = ((delay_seconds * sample_rate) as usize).max(1);
        DelayLine {
            buffer: vec![0.0; delay_samples],
            write_pos: 0,
            feedback: feedback.clamp(0.0, MAX_FEEDBACK),
        }
    }

    pub fn from_spec(spec: &DelaySpec, sample_rate: f64) -> Self {
        DelayLine::new(spec.seconds, spec.feedback, sample_rate)
    }

    /// Process one sample.
    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        // write_pos currently holds y(t - delay)
        let delayed = self.buffer[self.write_pos];
        let output = input + self.feedback * delayed;
        self.buffer[self.write_pos] = output;
        self.write_pos = (self.write_pos + 1) % self.buffer.len();
        output
    }

    /// Clear the delay history.
    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echoes_appear_at_delay_spacing() {
        let sample_rate = 1000.0;
        let mut delay = DelayLine::new(0.01, 0.5, sample_rate); // 10 samples

        let first = delay.process(1.0);
        assert!((first - 1.0).abs() < 1e-9, "dry sample passes through");

        // 9 silent samples, then the first echo at sample 10.
        for _ in 1..10 {
            let out = delay.process(0.0);
            assert!(out.abs() < 1e-9, "no output before the delay time");
        }
        let echo1 = delay.process(0.0);
        assert!((echo1 - 0.5).abs() < 1e-9, "first echo at feedback gain, got {echo1}");

        for _ in 1..10 {
            delay.process(0.0);
        }
        let echo2 = delay.process(0.0);
        assert!((echo2 - 0.25).abs() < 1e-9, "second echo decays again, got {echo2}");
    }

    #[test]
    fn feedback_is_clamped_for_stability() {
        let mut delay = DelayLine::new(0.001, 2.0, 1000.0);
        delay.process(1.0);
        // 2000 samples through a 1-sample delay; clamped feedback must decay.
        let mut last = 1.0_f64;
        for _ in 0..2000 {
            last = delay.process(0.0);
        }
        assert!(last.abs() < 1e-9, "clamped feedback should decay, got {last}");
    }

    #[test]
    fn zero_feedback_is_single_echo_free() {
        let mut delay = DelayLine::new(0.005, 0.0, 1000.0);
        delay.process(1.0);
        for _ in 0..50 {
            let out = delay.process(0.0);
            assert!(out.abs() < 1e-9, "no feedback means no echoes");
        }
    }
}
