//! Plain-data configuration records exchanged with the surrounding
//! application. Validation happens here, at the engine boundary, before any
//! rendering or scheduling work begins.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, invalid};

// ── Waveforms ───────────────────────────────────────────────

/// Supported waveform shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

impl Default for Waveform {
    fn default() -> Self {
        Waveform::Sine
    }
}

// ── Voice parameters ────────────────────────────────────────

/// Parameters for a single synthesized voice. Ephemeral: created per sound
/// trigger and discarded once playback or rendering completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceParams {
    pub waveform: Waveform,
    /// Frequency in Hz. Must be positive.
    pub frequency: f64,
    /// Voice length in seconds. Must be positive.
    pub duration_seconds: f64,
    /// Peak gain [0, 1].
    pub volume: f64,
    /// Optional signal processors, applied in fixed order.
    #[serde(default)]
    pub effects: Option<EffectsSpec>,
}

impl VoiceParams {
    /// Reject invalid values before any rendering side effect.
    pub fn validate(&self) -> Result<(), EngineError> {
        if !(self.frequency > 0.0) || !self.frequency.is_finite() {
            return Err(invalid(format!(
                "frequency must be positive, got {}",
                self.frequency
            )));
        }
        if !(self.duration_seconds > 0.0) || !self.duration_seconds.is_finite() {
            return Err(invalid(format!(
                "duration must be positive, got {}",
                self.duration_seconds
            )));
        }
        if !(0.0..=1.0).contains(&self.volume) {
            return Err(invalid(format!(
                "volume must be within [0, 1], got {}",
                self.volume
            )));
        }
        Ok(())
    }
}

// ── Effects ─────────────────────────────────────────────────

/// Optional per-voice signal processors. Absence of a field means that stage
/// is a passthrough. Immutable once attached to a voice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EffectsSpec {
    #[serde(default)]
    pub filter: Option<FilterSpec>,
    #[serde(default)]
    pub delay: Option<DelaySpec>,
    #[serde(default)]
    pub reverb: Option<ReverbSpec>,
    #[serde(default)]
    pub envelope: Option<EnvelopeSpec>,
}

/// Biquad filter kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    Lowpass,
    Highpass,
    Bandpass,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub kind: FilterKind,
    /// Cutoff/center frequency in Hz.
    pub frequency: f64,
    /// Resonance (Q).
    pub resonance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DelaySpec {
    /// Delay time in seconds.
    pub seconds: f64,
    /// Feedback amount. Clamped to [0, 0.95] by the delay line so the echo
    /// train always decays.
    pub feedback: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReverbSpec {
    /// Impulse response length in seconds.
    pub room_size_seconds: f64,
}

/// Explicit ADSR envelope. When absent, voices use the default
/// fade-in/exponential-decay shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeSpec {
    pub attack: f64,
    pub decay: f64,
    /// Sustain level as a fraction of the voice volume [0, 1].
    pub sustain: f64,
    pub release: f64,
}

// ── Time signature and progressions ─────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSignature {
    pub numerator: u32,
    pub denominator: u32,
}

impl Default for TimeSignature {
    fn default() -> Self {
        TimeSignature { numerator: 4, denominator: 4 }
    }
}

impl TimeSignature {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.numerator == 0 || self.denominator == 0 {
            return Err(invalid("time signature parts must be positive"));
        }
        Ok(())
    }
}

/// An ordered sequence of chords cycled over measures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChordProgression {
    pub name: String,
    /// Each chord is an ordered set of simultaneously sounding frequencies.
    pub chords: Vec<Vec<f64>>,
    pub tempo_bpm: u32,
    pub time_signature: TimeSignature,
}

impl ChordProgression {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.tempo_bpm == 0 {
            return Err(invalid("tempo must be positive"));
        }
        self.time_signature.validate()?;
        if self.chords.is_empty() {
            return Err(invalid("progression must contain at least one chord"));
        }
        for (i, chord) in self.chords.iter().enumerate() {
            if chord.is_empty() {
                return Err(invalid(format!("chord {i} is empty")));
            }
            if let Some(&f) = chord.iter().find(|f| !(**f > 0.0)) {
                return Err(invalid(format!("chord {i} contains frequency {f}")));
            }
        }
        Ok(())
    }
}

/// Built-in progression flavors, plus `Custom` for caller-supplied chords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressionKind {
    Happy,
    Sad,
    Energetic,
    Peaceful,
    Custom,
}

// ── Music generation ────────────────────────────────────────

/// Drives one chord/progression render. Fully determines the output buffer:
/// the same config always produces the same samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MusicGenerationConfig {
    pub bpm: u32,
    pub progression: ProgressionKind,
    /// Required when `progression` is `Custom`.
    #[serde(default)]
    pub custom_chords: Option<Vec<Vec<f64>>>,
    #[serde(default)]
    pub time_signature: TimeSignature,
    pub duration_seconds: f64,
    pub volume: f64,
    #[serde(default)]
    pub waveform: Waveform,
    /// When false, only each chord's root note is rendered.
    pub enable_harmony: bool,
    /// Adds a sine voice at half the chord root frequency, weighted left.
    pub bassline: bool,
}

impl MusicGenerationConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.bpm == 0 {
            return Err(invalid("bpm must be positive"));
        }
        self.time_signature.validate()?;
        if !(self.duration_seconds > 0.0) || !self.duration_seconds.is_finite() {
            return Err(invalid(format!(
                "duration must be positive, got {}",
                self.duration_seconds
            )));
        }
        if !(0.0..=1.0).contains(&self.volume) {
            return Err(invalid(format!(
                "volume must be within [0, 1], got {}",
                self.volume
            )));
        }
        if self.progression == ProgressionKind::Custom {
            match &self.custom_chords {
                None => return Err(invalid("custom progression requires custom_chords")),
                Some(chords) if chords.is_empty() => {
                    return Err(invalid("custom_chords must not be empty"));
                }
                Some(chords) => {
                    if chords.iter().any(|c| c.is_empty()) {
                        return Err(invalid("custom_chords contains an empty chord"));
                    }
                }
            }
        }
        Ok(())
    }
}

// ── Rhythm ──────────────────────────────────────────────────

/// A cyclic pattern of percussive hits. Velocity 0 is a rest, fractional
/// values are normal hits, 1.0 and above carry the accent frequency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RhythmPattern {
    pub enabled: bool,
    pub pattern: Vec<f64>,
    #[serde(default)]
    pub sound_waveform: Waveform,
    pub volume: f64,
}

impl Default for RhythmPattern {
    fn default() -> Self {
        RhythmPattern {
            enabled: false,
            pattern: vec![1.0, 0.5, 0.5, 0.5],
            sound_waveform: Waveform::Sine,
            volume: 0.5,
        }
    }
}

impl RhythmPattern {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.pattern.is_empty() {
            return Err(invalid("rhythm pattern must not be empty"));
        }
        if !(0.0..=1.0).contains(&self.volume) {
            return Err(invalid(format!(
                "rhythm volume must be within [0, 1], got {}",
                self.volume
            )));
        }
        Ok(())
    }
}

// ── Background tracks ───────────────────────────────────────

/// Where a track's audio came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileOrigin {
    Uploaded,
    Generated,
}

/// A persisted background track. The engine renders, decodes and encodes
/// these; identity and default-flag semantics belong to the storage
/// collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackgroundTrack {
    pub id: String,
    pub name: String,
    /// Base64-encoded PCM WAV bytes, no data-URL prefix.
    pub audio_data: String,
    pub file_origin: FileOrigin,
    pub volume: f64,
    #[serde(rename = "loop")]
    pub looping: bool,
    pub bpm: u32,
    pub is_default: bool,
    #[serde(default)]
    pub rhythm_pattern: RhythmPattern,
    #[serde(default)]
    pub generation_config: Option<MusicGenerationConfig>,
}
