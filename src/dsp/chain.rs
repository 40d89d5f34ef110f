//! Per-voice effect chain: Filter → Delay → Reverb, each stage optional.

use crate::config::EffectsSpec;

use super::delay::DelayLine;
use super::filter::Biquad;
use super::reverb::Reverb;

/// The fixed-order effect pipeline built from an `EffectsSpec`. A missing
/// spec field leaves that stage out entirely (passthrough).
#[derive(Debug, Clone)]
pub struct EffectChain {
    filter: Option<Biquad>,
    delay: Option<DelayLine>,
    reverb: Option<Reverb>,
}

impl EffectChain {
    /// An empty chain: every stage passes through.
    pub fn passthrough() -> Self {
        EffectChain { filter: None, delay: None, reverb: None }
    }

    pub fn from_spec(spec: Option<&EffectsSpec>, sample_rate: f64) -> Self {
        let Some(spec) = spec else {
            return EffectChain::passthrough();
        };
        EffectChain {
            filter: spec.filter.as_ref().map(|f| Biquad::from_spec(f, sample_rate)),
            delay: spec.delay.as_ref().map(|d| DelayLine::from_spec(d, sample_rate)),
            reverb: spec.reverb.as_ref().map(|r| Reverb::from_spec(r, sample_rate)),
        }
    }

    /// True when no stage is configured.
    pub fn is_passthrough(&self) -> bool {
        self.filter.is_none() && self.delay.is_none() && self.reverb.is_none()
    }

    /// Run one sample through every configured stage in order.
    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        let mut s = input;
        if let Some(filter) = &mut self.filter {
            s = filter.process(s);
        }
        if let Some(delay) = &mut self.delay {
            s = delay.process(s);
        }
        if let Some(reverb) = &mut self.reverb {
            s = reverb.process(s);
        }
        s
    }

    /// Reset all stage state.
    pub fn reset(&mut self) {
        if let Some(filter) = &mut self.filter {
            filter.reset();
        }
        if let Some(delay) = &mut self.delay {
            delay.clear();
        }
        if let Some(reverb) = &mut self.reverb {
            reverb.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DelaySpec, FilterKind, FilterSpec};

    #[test]
    fn passthrough_is_identity() {
        let mut chain = EffectChain::from_spec(None, 44100.0);
        assert!(chain.is_passthrough());
        for i in 0..100 {
            let x = (i as f64 * 0.01).sin();
            assert_eq!(chain.process(x), x);
        }
    }

    #[test]
    fn empty_spec_is_identity() {
        let spec = EffectsSpec::default();
        let mut chain = EffectChain::from_spec(Some(&spec), 44100.0);
        assert!(chain.is_passthrough());
        assert_eq!(chain.process(0.25), 0.25);
    }

    #[test]
    fn delay_only_chain_echoes() {
        let spec = EffectsSpec {
            delay: Some(DelaySpec { seconds: 0.01, feedback: 0.5 }),
            ..Default::default()
        };
        let mut chain = EffectChain::from_spec(Some(&spec), 1000.0);
        assert!(!chain.is_passthrough());

        chain.process(1.0);
        for _ in 1..10 {
            chain.process(0.0);
        }
        let echo = chain.process(0.0);
        assert!((echo - 0.5).abs() < 1e-9, "delay stage should echo, got {echo}");
    }

    #[test]
    fn filter_stage_applies_before_delay() {
        // A highpass in front of the delay removes DC before it echoes.
        let spec = EffectsSpec {
            filter: Some(FilterSpec {
                kind: FilterKind::Highpass,
                frequency: 2000.0,
                resonance: 0.707,
            }),
            delay: Some(DelaySpec { seconds: 0.05, feedback: 0.3 }),
            ..Default::default()
        };
        let mut chain = EffectChain::from_spec(Some(&spec), 44100.0);

        let mut out = 0.0;
        for _ in 0..20000 {
            out = chain.process(1.0);
        }
        assert!(out.abs() < 0.01, "DC should be filtered before echoing, got {out}");
    }
}
