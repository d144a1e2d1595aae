//! Error types for the voice cloning pipeline

/// Errors from clip extraction
#[derive(thiserror::Error, Debug)]
pub enum ExtractError {
    #[error("invalid clip range: end {end}s must be after start {start}s")]
    InvalidRange { start: f64, end: f64 },

    #[error("audio decode failed: {0}")]
    Decode(String),
}

/// Errors from WAV encoding
#[derive(thiserror::Error, Debug)]
pub enum EncodeError {
    #[error("unsupported channel count {0}: only mono and stereo are encodable")]
    UnsupportedChannelCount(usize),
}

/// Errors from voice registration and synthesis
#[derive(thiserror::Error, Debug)]
pub enum VoiceError {
    #[error("voice registration failed: {0}")]
    Registration(String),

    #[error("speech synthesis failed: {0}")]
    Synthesis(String),

    #[error("no voice registered for speaker '{0}'")]
    UnknownSpeaker(String),

    #[error("voice for speaker '{speaker_id}' is not ready (status: {status})")]
    VoiceUnavailable { speaker_id: String, status: String },

    #[error("clip extraction failed: {0}")]
    Extraction(#[from] ExtractError),

    #[error("clip encoding failed: {0}")]
    Encoding(#[from] EncodeError),
}
