//! Note names, frequencies, and the built-in chord progressions.

use crate::config::{ChordProgression, MusicGenerationConfig, ProgressionKind, TimeSignature};
use crate::error::{EngineError, invalid};

/// Parse a note name (e.g. "C4", "F#3", "Bb5") into a MIDI note number.
pub fn note_to_midi(note: &str) -> Option<i32> {
    let bytes = note.as_bytes();
    if bytes.is_empty() {
        return None;
    }

    let name = bytes[0] as char;
    let base_semitone = match name {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };

    let mut idx = 1;
    let mut semitone = base_semitone;

    if idx < bytes.len() {
        match bytes[idx] as char {
            '#' => {
                semitone += 1;
                idx += 1;
            }
            'b' => {
                semitone -= 1;
                idx += 1;
            }
            _ => {}
        }
    }

    let octave: i32 = note[idx..].parse().ok()?;

    // MIDI note number: C4 = 60
    Some((octave + 1) * 12 + semitone)
}

/// Convert a MIDI note number to frequency in 12-TET, A4 = 440 Hz.
pub fn midi_to_frequency(midi: i32) -> f64 {
    440.0 * (2.0_f64).powf((midi as f64 - 69.0) / 12.0)
}

/// Note-name to frequency shorthand.
pub fn note_to_frequency(note: &str) -> Option<f64> {
    Some(midi_to_frequency(note_to_midi(note)?))
}

/// A chord spelled as note names, converted at build time.
fn chord(notes: &[&str]) -> Vec<f64> {
    notes
        .iter()
        .filter_map(|n| note_to_frequency(n))
        .collect()
}

/// Build the progression for a generation config, resolving built-in kinds
/// or the caller's custom chords. The config must already be validated.
pub fn progression_for(config: &MusicGenerationConfig) -> Result<ChordProgression, EngineError> {
    let (name, chords) = match config.progression {
        // I–V–vi–IV in C major
        ProgressionKind::Happy => (
            "happy",
            vec![
                chord(&["C4", "E4", "G4"]),
                chord(&["G3", "B3", "D4"]),
                chord(&["A3", "C4", "E4"]),
                chord(&["F3", "A3", "C4"]),
            ],
        ),
        // i–VI–III–VII in A minor
        ProgressionKind::Sad => (
            "sad",
            vec![
                chord(&["A3", "C4", "E4"]),
                chord(&["F3", "A3", "C4"]),
                chord(&["C4", "E4", "G4"]),
                chord(&["G3", "B3", "D4"]),
            ],
        ),
        // i–VII–VI–VII in E minor
        ProgressionKind::Energetic => (
            "energetic",
            vec![
                chord(&["E3", "G3", "B3"]),
                chord(&["D4", "F#4", "A4"]),
                chord(&["C4", "E4", "G4"]),
                chord(&["D4", "F#4", "A4"]),
            ],
        ),
        // I–iii–IV–I in C major, open voicings
        ProgressionKind::Peaceful => (
            "peaceful",
            vec![
                chord(&["C4", "G4", "E5"]),
                chord(&["E4", "B4", "G5"]),
                chord(&["F4", "C5", "A5"]),
                chord(&["C4", "G4", "E5"]),
            ],
        ),
        ProgressionKind::Custom => {
            let chords = config
                .custom_chords
                .clone()
                .ok_or_else(|| invalid("custom progression requires custom_chords"))?;
            ("custom", chords)
        }
    };

    let progression = ChordProgression {
        name: name.to_string(),
        chords,
        tempo_bpm: config.bpm,
        time_signature: TimeSignature {
            numerator: config.time_signature.numerator,
            denominator: config.time_signature.denominator,
        },
    };
    progression.validate()?;
    Ok(progression)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Waveform;

    #[test]
    fn note_to_freq_a4() {
        let f = note_to_frequency("A4").unwrap();
        assert!((f - 440.0).abs() < 0.01, "A4 should be 440Hz, got {f}");
    }

    #[test]
    fn note_to_freq_c4() {
        let f = note_to_frequency("C4").unwrap();
        assert!((f - 261.63).abs() < 0.1, "C4 should be ~261.63Hz, got {f}");
    }

    #[test]
    fn note_to_freq_accidentals() {
        let sharp = note_to_frequency("F#4").unwrap();
        let flat = note_to_frequency("Gb4").unwrap();
        assert!(
            (sharp - flat).abs() < 0.01,
            "F#4 and Gb4 should be the same frequency"
        );
    }

    #[test]
    fn note_to_midi_basic() {
        assert_eq!(note_to_midi("A4"), Some(69));
        assert_eq!(note_to_midi("C4"), Some(60));
        assert_eq!(note_to_midi("C0"), Some(12));
        assert_eq!(note_to_midi("C-1"), Some(0));
    }

    #[test]
    fn note_to_midi_rejects_garbage() {
        assert_eq!(note_to_midi(""), None);
        assert_eq!(note_to_midi("H4"), None);
        assert_eq!(note_to_midi("C"), None);
    }

    #[test]
    fn all_builtin_progressions_are_valid() {
        for kind in [
            ProgressionKind::Happy,
            ProgressionKind::Sad,
            ProgressionKind::Energetic,
            ProgressionKind::Peaceful,
        ] {
            let config = MusicGenerationConfig {
                bpm: 120,
                progression: kind,
                custom_chords: None,
                time_signature: TimeSignature::default(),
                duration_seconds: 4.0,
                volume: 0.5,
                waveform: Waveform::Sine,
                enable_harmony: true,
                bassline: false,
            };
            let prog = progression_for(&config).unwrap();
            assert_eq!(prog.chords.len(), 4);
            assert!(prog.chords.iter().all(|c| c.len() >= 3));
            assert_eq!(prog.tempo_bpm, 120);
        }
    }

    #[test]
    fn custom_progression_uses_caller_chords() {
        let config = MusicGenerationConfig {
            bpm: 90,
            progression: ProgressionKind::Custom,
            custom_chords: Some(vec![vec![220.0, 277.18], vec![246.94]]),
            time_signature: TimeSignature::default(),
            duration_seconds: 4.0,
            volume: 0.5,
            waveform: Waveform::Square,
            enable_harmony: true,
            bassline: false,
        };
        let prog = progression_for(&config).unwrap();
        assert_eq!(prog.name, "custom");
        assert_eq!(prog.chords.len(), 2);
        assert_eq!(prog.tempo_bpm, 90);
    }
}
