//! Chord/progression renderer — drives many tone voices into one offline
//! stereo buffer, measure by measure.

use tracing::debug;

use crate::config::{
    EffectsSpec, EnvelopeSpec, MusicGenerationConfig, ChordProgression, VoiceParams, Waveform,
};
use crate::dsp::buffer::RenderedBuffer;
use crate::dsp::mixer::StereoMixer;
use crate::dsp::voice::ToneVoice;
use crate::error::EngineError;
use crate::theory;

/// Sample rate for offline music rendering.
pub const SAMPLE_RATE: u32 = 44_100;

/// Chord-boundary fade length in seconds, both in and out.
const CHORD_FADE: f64 = 0.050;

/// How far the outermost chord notes are panned.
const PAN_SPREAD: f64 = 0.8;

/// Left/right weights for the bassline voice.
const BASS_GAIN_L: f64 = 0.6;
const BASS_GAIN_R: f64 = 0.4;

/// Render a full generation config to a stereo buffer. Deterministic: the
/// same config always produces the same samples.
pub fn render_music(config: &MusicGenerationConfig) -> Result<RenderedBuffer, EngineError> {
    config.validate()?;
    let progression = theory::progression_for(config)?;
    render_progression(&progression, config, SAMPLE_RATE)
}

/// Render a progression at an explicit sample rate.
///
/// The output always spans a whole number of measures: the requested
/// duration is rounded up to the next measure boundary.
pub fn render_progression(
    progression: &ChordProgression,
    config: &MusicGenerationConfig,
    sample_rate: u32,
) -> Result<RenderedBuffer, EngineError> {
    config.validate()?;
    progression.validate()?;

    let sr = sample_rate as f64;
    let seconds_per_beat = 60.0 / progression.tempo_bpm as f64;
    let beats_per_measure = progression.time_signature.numerator as usize;
    let measure_seconds = seconds_per_beat * beats_per_measure as f64;
    let measures = ((config.duration_seconds / measure_seconds).ceil() as usize).max(1);
    let total_frames = (measures as f64 * measure_seconds * sr).round() as usize;

    let chords_per_measure = progression.chords.len().min(beats_per_measure).max(1);
    let chord_seconds = measure_seconds / chords_per_measure as f64;

    debug!(
        measures,
        chords_per_measure,
        total_frames,
        "rendering progression '{}'",
        progression.name
    );

    // Schedule every voice up front, ordered by start frame.
    let mut scheduled: Vec<(usize, ToneVoice)> = Vec::new();
    let mut chord_cursor = 0usize;
    for m in 0..measures {
        for slot in 0..chords_per_measure {
            let chord = &progression.chords[chord_cursor % progression.chords.len()];
            chord_cursor += 1;

            let start_seconds = m as f64 * measure_seconds + slot as f64 * chord_seconds;
            let offset = (start_seconds * sr).round() as usize;

            let notes: &[f64] = if config.enable_harmony {
                chord.as_slice()
            } else {
                &chord[..1]
            };

            for (i, &frequency) in notes.iter().enumerate() {
                let voice = chord_note_voice(
                    frequency,
                    i,
                    notes.len(),
                    chord_seconds,
                    config,
                    sr,
                )?;
                scheduled.push((offset, voice));
            }

            if config.bassline {
                let voice = bassline_voice(chord[0] / 2.0, chord_seconds, config, sr)?;
                scheduled.push((offset, voice));
            }
        }
    }
    scheduled.sort_by_key(|(offset, _)| *offset);

    // Block render: activate voices as their start frame arrives, sum into
    // the mixer, retain the unfinished.
    let block_size = 128;
    let mut mixer = StereoMixer::new();
    let mut active: Vec<(usize, ToneVoice)> = Vec::new();
    let mut buffer = RenderedBuffer::stereo(total_frames, sample_rate);
    let mut next_idx = 0;

    let mut block_start = 0;
    while block_start < total_frames {
        let block_end = (block_start + block_size).min(total_frames);
        let this_block = block_end - block_start;

        while next_idx < scheduled.len() && scheduled[next_idx].0 < block_end {
            let (offset, voice) = scheduled[next_idx].clone();
            active.push((offset, voice));
            next_idx += 1;
        }

        mixer.clear(this_block);
        for (offset, voice) in active.iter_mut() {
            let begin = offset.saturating_sub(block_start);
            for i in begin..this_block {
                if voice.is_finished() {
                    break;
                }
                let (l, r) = voice.next_frame();
                mixer.add(i, l, r);
            }
        }

        let (left, right) = mixer.output();
        for i in 0..this_block {
            buffer.channels[0][block_start + i] = left[i] as f32;
            buffer.channels[1][block_start + i] = right[i] as f32;
        }

        active.retain(|(_, v)| !v.is_finished());
        block_start = block_end;
    }

    Ok(buffer)
}

/// One chord note, panned by its index so the chord spreads left-to-right.
fn chord_note_voice(
    frequency: f64,
    index: usize,
    chord_size: usize,
    duration: f64,
    config: &MusicGenerationConfig,
    sample_rate: f64,
) -> Result<ToneVoice, EngineError> {
    let pan = if chord_size <= 1 {
        0.0
    } else {
        (index as f64 / (chord_size - 1) as f64 * 2.0 - 1.0) * PAN_SPREAD
    };
    let params = VoiceParams {
        waveform: config.waveform,
        frequency,
        duration_seconds: duration,
        volume: config.volume / chord_size as f64,
        effects: Some(boundary_fade()),
    };
    ToneVoice::with_pan(&params, pan, sample_rate)
}

/// The bassline voice: a sine an octave under the chord root, leaning left.
fn bassline_voice(
    frequency: f64,
    duration: f64,
    config: &MusicGenerationConfig,
    sample_rate: f64,
) -> Result<ToneVoice, EngineError> {
    let params = VoiceParams {
        waveform: Waveform::Sine,
        frequency,
        duration_seconds: duration,
        volume: config.volume * 0.5,
        effects: Some(boundary_fade()),
    };
    ToneVoice::with_channel_gains(&params, BASS_GAIN_L, BASS_GAIN_R, sample_rate)
}

/// 50ms fades at both chord edges so adjacent chords join without clicks.
fn boundary_fade() -> EffectsSpec {
    EffectsSpec {
        envelope: Some(EnvelopeSpec {
            attack: CHORD_FADE,
            decay: 0.0,
            sustain: 1.0,
            release: CHORD_FADE,
        }),
        ..Default::default()
    }
}
