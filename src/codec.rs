//! Container codec — PCM WAV encode/decode and base64 text encoding.
//!
//! The engine stores rendered audio as base64-encoded 16-bit PCM WAV
//! strings. Encoding clamps each sample to [-1, 1] and scales negatives by
//! 32768 and positives by 32767, matching the asymmetric signed 16-bit
//! range exactly; decoding is the inverse.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::dsp::buffer::RenderedBuffer;
use crate::error::{DecodeError, EngineError};

/// Default ceiling for an encoded WAV, including the 44-byte header.
pub const MAX_ENCODED_BYTES: usize = 25 * 1024 * 1024;

const HEADER_BYTES: usize = 44;

// ── Encoding ────────────────────────────────────────────────

/// Encode a rendered buffer as a 16-bit PCM WAV byte stream.
pub fn encode_wav(buffer: &RenderedBuffer) -> Result<Vec<u8>, EngineError> {
    encode_wav_with_limit(buffer, MAX_ENCODED_BYTES)
}

/// Encode with an explicit size ceiling. The size check happens before any
/// bytes are produced, and the computed size is reported on rejection.
pub fn encode_wav_with_limit(
    buffer: &RenderedBuffer,
    limit: usize,
) -> Result<Vec<u8>, EngineError> {
    let channels = buffer.channel_count().max(1) as u16;
    let frames = buffer.frames();
    let data_size = frames * channels as usize * 2;
    let total = HEADER_BYTES + data_size;
    if total > limit {
        return Err(EngineError::ResourceExhaustion { needed: total, limit });
    }

    let sample_rate = buffer.sample_rate;
    let bits_per_sample: u16 = 16;
    let byte_rate = sample_rate * channels as u32 * (bits_per_sample as u32 / 8);
    let block_align = channels * (bits_per_sample / 8);

    let mut buf = Vec::with_capacity(total);

    // RIFF header
    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&((36 + data_size) as u32).to_le_bytes());
    buf.extend_from_slice(b"WAVE");

    // fmt chunk
    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes());
    buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
    buf.extend_from_slice(&channels.to_le_bytes());
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&byte_rate.to_le_bytes());
    buf.extend_from_slice(&block_align.to_le_bytes());
    buf.extend_from_slice(&bits_per_sample.to_le_bytes());

    // data chunk, interleaved
    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&(data_size as u32).to_le_bytes());
    for i in 0..frames {
        for channel in &buffer.channels {
            buf.extend_from_slice(&quantize(channel[i]).to_le_bytes());
        }
    }

    Ok(buf)
}

/// Clamp to [-1, 1], then scale into the asymmetric i16 range.
#[inline]
fn quantize(sample: f32) -> i16 {
    let s = sample.clamp(-1.0, 1.0) as f64;
    let scaled = if s < 0.0 { s * 32768.0 } else { s * 32767.0 };
    scaled.round() as i16
}

/// Inverse of `quantize`.
#[inline]
fn dequantize(sample: i16) -> f32 {
    if sample < 0 {
        (sample as f64 / 32768.0) as f32
    } else {
        (sample as f64 / 32767.0) as f32
    }
}

// ── Decoding ────────────────────────────────────────────────

/// Decode a 16-bit PCM WAV byte stream. Rejects anything that does not
/// begin with a RIFF/WAVE signature; skips unrecognized chunks.
pub fn decode_wav(bytes: &[u8]) -> Result<RenderedBuffer, EngineError> {
    if bytes.len() < 12 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return Err(DecodeError::MissingRiffHeader.into());
    }

    let mut channels: Option<u16> = None;
    let mut sample_rate: Option<u32> = None;
    let mut data: Option<&[u8]> = None;

    let mut pos = 12;
    while pos + 8 <= bytes.len() {
        let id = &bytes[pos..pos + 4];
        let size = u32::from_le_bytes([
            bytes[pos + 4],
            bytes[pos + 5],
            bytes[pos + 6],
            bytes[pos + 7],
        ]) as usize;
        let body_start = pos + 8;
        let body_end = body_start + size;
        if body_end > bytes.len() {
            let chunk = if id == b"data" { "data" } else { "fmt " };
            return Err(DecodeError::MalformedChunk { chunk }.into());
        }
        let body = &bytes[body_start..body_end];

        match id {
            b"fmt " => {
                if size < 16 {
                    return Err(DecodeError::MalformedChunk { chunk: "fmt " }.into());
                }
                let format = u16::from_le_bytes([body[0], body[1]]);
                let bits = u16::from_le_bytes([body[14], body[15]]);
                if format != 1 || bits != 16 {
                    return Err(DecodeError::UnsupportedFormat { format, bits }.into());
                }
                channels = Some(u16::from_le_bytes([body[2], body[3]]));
                sample_rate = Some(u32::from_le_bytes([body[4], body[5], body[6], body[7]]));
            }
            b"data" => {
                data = Some(body);
            }
            _ => {}
        }

        // Chunk bodies are word-aligned
        pos = body_end + (size & 1);
    }

    let channels = channels.ok_or(DecodeError::MalformedChunk { chunk: "fmt " })?;
    let sample_rate = sample_rate.ok_or(DecodeError::MalformedChunk { chunk: "fmt " })?;
    let data = data.ok_or(DecodeError::MalformedChunk { chunk: "data" })?;
    if channels == 0 {
        return Err(DecodeError::MalformedChunk { chunk: "fmt " }.into());
    }

    let frame_bytes = channels as usize * 2;
    let frames = data.len() / frame_bytes;
    let mut out: Vec<Vec<f32>> = vec![Vec::with_capacity(frames); channels as usize];
    for frame in 0..frames {
        for (c, channel) in out.iter_mut().enumerate() {
            let o = frame * frame_bytes + c * 2;
            let sample = i16::from_le_bytes([data[o], data[o + 1]]);
            channel.push(dequantize(sample));
        }
    }

    Ok(RenderedBuffer { channels: out, sample_rate })
}

// ── Base64 ──────────────────────────────────────────────────

/// Encode bytes as standard base64 text. No data-URL prefix; that belongs
/// to the playback boundary, not storage.
pub fn to_base64(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

/// Decode standard base64 text.
pub fn from_base64(text: &str) -> Result<Vec<u8>, EngineError> {
    BASE64
        .decode(text)
        .map_err(|e| DecodeError::InvalidBase64(e.to_string()).into())
}

/// Fast decoded-size estimate without decoding: `floor(len * 3 / 4)`.
pub fn estimate_byte_size(base64_text: &str) -> usize {
    base64_text.len() * 3 / 4
}

// ── Storage-string composites ───────────────────────────────

/// Encode a rendered buffer straight into the storage representation.
pub fn buffer_to_base64_wav(buffer: &RenderedBuffer) -> Result<String, EngineError> {
    Ok(to_base64(&encode_wav(buffer)?))
}

/// Decode a stored track's audio string back into a buffer.
pub fn base64_wav_to_buffer(text: &str) -> Result<RenderedBuffer, EngineError> {
    decode_wav(&from_base64(text)?)
}
