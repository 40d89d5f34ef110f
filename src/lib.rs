//! Tonewheel — a procedural audio engine.
//!
//! Synthesizes tones and chord progressions sample by sample, schedules
//! repeating rhythm patterns with look-ahead timing, mixes live sources
//! through a gain graph with a shared compressor, and round-trips rendered
//! audio through a base64-encoded PCM WAV container.
//!
//! The engine consumes plain configuration values from the surrounding
//! application and returns rendered buffers or playback handles. It never
//! touches storage, the network, or audio hardware directly — the platform
//! output is a [`graph::OutputDevice`] provided by the host.

pub mod codec;
pub mod config;
pub mod dsp;
pub mod error;
pub mod graph;
pub mod music;
pub mod rhythm;
pub mod theory;

pub use config::{
    BackgroundTrack, ChordProgression, DelaySpec, EffectsSpec, EnvelopeSpec, FileOrigin,
    FilterKind, FilterSpec, MusicGenerationConfig, ProgressionKind, ReverbSpec, RhythmPattern,
    TimeSignature, VoiceParams, Waveform,
};
pub use dsp::buffer::RenderedBuffer;
pub use error::EngineError;
pub use graph::{AudioGraph, PlaybackState, PlaybackStatus};
pub use music::{SAMPLE_RATE, render_music};

use dsp::voice::ToneVoice;

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Render a single voice offline into a fresh stereo buffer at the engine
/// sample rate. Parameters are validated before any work happens.
pub fn render_tone(params: &VoiceParams) -> Result<RenderedBuffer, EngineError> {
    let sr = SAMPLE_RATE as f64;
    let mut voice = ToneVoice::new(params, sr)?;
    let frames = voice.total_samples() as usize;
    let mut buffer = RenderedBuffer::stereo(frames, SAMPLE_RATE);
    voice.mix_into(&mut buffer, 0);
    Ok(buffer)
}

/// Render a generation config and encode it straight into the storage
/// representation (base64 PCM WAV).
pub fn generate_music_base64(config: &MusicGenerationConfig) -> Result<String, EngineError> {
    let buffer = render_music(config)?;
    codec::buffer_to_base64_wav(&buffer)
}
