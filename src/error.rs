use std::fmt;

/// Errors surfaced by the audio engine.
///
/// Every error is raised synchronously, before any rendering or scheduling
/// side effect begins. Nothing is swallowed in the engine core.
#[derive(Debug)]
pub enum EngineError {
    /// A configuration value failed validation at the API boundary.
    InvalidParameter(String),
    /// Bytes or text could not be decoded as WAV/base64.
    Decode(DecodeError),
    /// The platform audio output is unavailable after one resume attempt.
    PlaybackDevice(String),
    /// An encoded buffer would exceed the configured size limit.
    ResourceExhaustion {
        /// Bytes the encoded output would need.
        needed: usize,
        /// The configured maximum.
        limit: usize,
    },
}

#[derive(Debug)]
pub enum DecodeError {
    /// Input does not begin with a RIFF/WAVE signature.
    MissingRiffHeader,
    /// The container is RIFF/WAVE but a required chunk is absent or short.
    MalformedChunk { chunk: &'static str },
    /// Only 16-bit integer PCM is supported.
    UnsupportedFormat { format: u16, bits: u16 },
    /// Base64 text is not valid base64.
    InvalidBase64(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::InvalidParameter(msg) => write!(f, "invalid parameter: {msg}"),
            EngineError::Decode(e) => write!(f, "decode error: {e}"),
            EngineError::PlaybackDevice(msg) => write!(f, "playback device error: {msg}"),
            EngineError::ResourceExhaustion { needed, limit } => {
                write!(f, "encoded size {needed} bytes exceeds limit of {limit} bytes")
            }
        }
    }
}

impl std::error::Error for EngineError {}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::MissingRiffHeader => write!(f, "missing RIFF/WAVE signature"),
            DecodeError::MalformedChunk { chunk } => write!(f, "malformed '{chunk}' chunk"),
            DecodeError::UnsupportedFormat { format, bits } => {
                write!(f, "unsupported WAV format {format} at {bits} bits (need PCM 16)")
            }
            DecodeError::InvalidBase64(msg) => write!(f, "invalid base64: {msg}"),
        }
    }
}

impl std::error::Error for DecodeError {}

impl From<DecodeError> for EngineError {
    fn from(e: DecodeError) -> Self {
        EngineError::Decode(e)
    }
}

/// Shorthand for a validation failure.
pub(crate) fn invalid(msg: impl Into<String>) -> EngineError {
    EngineError::InvalidParameter(msg.into())
}
