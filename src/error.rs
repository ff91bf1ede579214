use thiserror::Error;

/// All possible errors that can occur while cutting samples
#[derive(Debug, Error)]
pub enum CutterError {
    /// Failed to open or read the audio file from disk
    #[error("Failed to open audio file '{path}': {source}")]
    FileOpen {
        path: String,
        source: std::io::Error,
    },

    /// The audio format can't be turned into integer frames
    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    /// Error occurred while decoding the audio data
    #[error("Audio decoding failed: {0}")]
    DecodeFailed(String),

    /// Error occurred while writing a sample file
    #[error("WAV encoding failed: {0}")]
    EncodeFailed(String),

    /// Invalid cutter configuration (thresholds, channel index, ...)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from hound WAV reader/writer
    #[error("Hound WAV error: {0}")]
    Hound(#[from] hound::Error),

    /// Config file or report (de)serialization
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenient Result type that uses our CutterError
pub type Result<T> = std::result::Result<T, CutterError>;
