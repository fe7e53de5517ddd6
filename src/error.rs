// Error types for decoding and playback
use thiserror::Error;

/// Errors produced while turning an encoded payload into samples
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("audio payload is empty")]
    Empty,

    #[error("audio payload is not valid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    /// The payload decoded to fewer bytes than a single 16-bit sample needs
    #[error("audio payload holds {0} byte(s), not enough for one 16-bit sample")]
    NoSamples(usize),

    #[error("decode task failed: {0}")]
    Task(String),
}

/// Errors reported by the audio output
#[derive(Debug, Error)]
pub enum SinkError {
    /// Output device missing, or the stream could not be built or resumed
    #[error("audio output unavailable: {0}")]
    Unavailable(String),

    #[error("failed to open audio connection: {0}")]
    Connection(String),
}

/// Errors returned by play/toggle commands
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("no audio loaded")]
    NotLoaded,

    #[error(transparent)]
    Sink(#[from] SinkError),
}
