//! Error handling for Multifx
//!
//! Only configuration paths report errors. The audio path (`process`,
//! `reset`, parameter get/set) degrades by clamping or bypassing instead.

use thiserror::Error;

/// Result type alias for Multifx operations
pub type Result<T> = std::result::Result<T, FxError>;

/// Main error type for Multifx operations
#[derive(Error, Debug)]
pub enum FxError {
    // Configuration Errors
    #[error("Invalid sample rate: {sample_rate} Hz")]
    InvalidSampleRate { sample_rate: f32 },

    #[error("Invalid block size: {block_size} samples")]
    InvalidBlockSize { block_size: usize },

    #[error("Invalid channel count: {channels}")]
    InvalidChannelCount { channels: usize },

    #[error("Invalid maximum delay: {max_delay_ms} ms")]
    InvalidMaxDelay { max_delay_ms: f32 },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    // Parameter Errors
    #[error("Unknown parameter: {name}")]
    UnknownParameter { name: String },

    #[error("Invalid value for parameter {name}: {value}")]
    InvalidParameterValue { name: String, value: String },

    // Audio File Errors
    #[error("Failed to read audio file: {path}")]
    AudioRead {
        path: String,
        #[source]
        source: hound::Error,
    },

    #[error("Failed to write audio file: {path}")]
    AudioWrite {
        path: String,
        #[source]
        source: hound::Error,
    },

    #[error("Unsupported audio format: {format}")]
    UnsupportedFormat { format: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FxError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            FxError::InvalidSampleRate { .. } => "INVALID_SAMPLE_RATE",
            FxError::InvalidBlockSize { .. } => "INVALID_BLOCK_SIZE",
            FxError::InvalidChannelCount { .. } => "INVALID_CHANNEL_COUNT",
            FxError::InvalidMaxDelay { .. } => "INVALID_MAX_DELAY",
            FxError::InvalidConfig { .. } => "INVALID_CONFIG",
            FxError::UnknownParameter { .. } => "UNKNOWN_PARAMETER",
            FxError::InvalidParameterValue { .. } => "INVALID_PARAMETER_VALUE",
            FxError::AudioRead { .. } => "AUDIO_READ",
            FxError::AudioWrite { .. } => "AUDIO_WRITE",
            FxError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            FxError::Io(_) => "IO_ERROR",
            FxError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Returns a suggested recovery action for this error
    pub fn recovery_hint(&self) -> &'static str {
        match self {
            Self::InvalidSampleRate { .. } => "Use a positive, finite sample rate such as 44100 or 48000",
            Self::InvalidBlockSize { .. } => "Use a block size of at least one sample",
            Self::InvalidChannelCount { .. } => "Prepare the chain with 1 to 8 channels",
            Self::InvalidMaxDelay { .. } => "Choose a maximum delay between 1 and 10000 ms",
            Self::InvalidConfig { .. } => "Fix the listed configuration field and reload",
            Self::UnknownParameter { .. } => "Run with --list-params to see valid parameter names",
            Self::InvalidParameterValue { .. } => "Pass parameters as name=value with a numeric value",
            Self::AudioRead { .. } => "Check that the file exists and is a valid WAV file",
            Self::UnsupportedFormat { .. } => "Convert to 16, 24 or 32-bit WAV",
            _ => "Check the error details and try again",
        }
    }
}
