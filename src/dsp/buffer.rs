//! The rendered-audio intermediate passed between renderers and the codec.

/// A multi-channel float sample matrix plus its sample rate. Owned
/// exclusively by the call that produced it until handed to the codec or a
/// playback sink.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedBuffer {
    /// One `Vec<f32>` per channel, all the same length.
    pub channels: Vec<Vec<f32>>,
    pub sample_rate: u32,
}

impl RenderedBuffer {
    /// An all-zero stereo buffer of `frames` samples per channel.
    pub fn stereo(frames: usize, sample_rate: u32) -> Self {
        RenderedBuffer {
            channels: vec![vec![0.0; frames]; 2],
            sample_rate,
        }
    }

    /// An all-zero mono buffer.
    pub fn mono(frames: usize, sample_rate: u32) -> Self {
        RenderedBuffer {
            channels: vec![vec![0.0; frames]],
            sample_rate,
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Samples per channel.
    pub fn frames(&self) -> usize {
        self.channels.first().map_or(0, |c| c.len())
    }

    pub fn duration_seconds(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Largest absolute sample value across all channels.
    pub fn peak(&self) -> f32 {
        self.channels
            .iter()
            .flat_map(|c| c.iter())
            .fold(0.0_f32, |m, &s| m.max(s.abs()))
    }
}
