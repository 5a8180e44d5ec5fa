//! Error handling for blockcheck
//!
//! Helpers that have preconditions (a boundary inside the block, matching
//! shapes, enough channels) report violations through `BlockCheckError`
//! instead of panicking, so a matcher can turn them into a readable failure.

use thiserror::Error;

/// Result type alias for blockcheck operations
pub type Result<T> = std::result::Result<T, BlockCheckError>;

/// Main error type for blockcheck operations
#[derive(Error, Debug)]
pub enum BlockCheckError {
    // Shape Errors
    #[error("Block contains no samples")]
    EmptyBlock,

    #[error("Sample {index} is out of range for a block of {len} samples")]
    OutOfRange { index: usize, len: usize },

    #[error("Channel {channel} is out of range for a block of {num_channels} channels")]
    ChannelOutOfRange { channel: usize, num_channels: usize },

    #[error("Invalid sample range: start {start} must be before end {end}")]
    InvalidRange { start: usize, end: usize },

    #[error("Channel count mismatch: expected {expected}, got {actual}")]
    ChannelMismatch { expected: usize, actual: usize },

    #[error("Length mismatch: expected {expected} samples, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Operation needs at least {required} channels, block has {actual}")]
    NotEnoughChannels { required: usize, actual: usize },

    #[error("Interleaved data length {len} is not divisible by channel count {channels}")]
    NotInterleaved { len: usize, channels: usize },

    // Analysis Errors
    #[error("Block of {len} samples holds less than one cycle of {frequency} Hz")]
    TooShortForFrequency { frequency: f32, len: usize },

    #[error("Frequency bin {bin} is beyond the {num_bins} positive-frequency bins")]
    BinOutOfRange { bin: usize, num_bins: usize },

    #[error("Invalid FFT size {size}: must be a power of two of at least 2")]
    InvalidFftSize { size: usize },

    #[error("Invalid audio: {reason}")]
    InvalidAudio { reason: String },

    // Parameter Errors
    #[error("Unknown parameter: {id}")]
    UnknownParameter { id: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    // Configuration Errors
    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),
}

impl BlockCheckError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            BlockCheckError::EmptyBlock => "EMPTY_BLOCK",
            BlockCheckError::OutOfRange { .. } => "OUT_OF_RANGE",
            BlockCheckError::ChannelOutOfRange { .. } => "CHANNEL_OUT_OF_RANGE",
            BlockCheckError::InvalidRange { .. } => "INVALID_RANGE",
            BlockCheckError::ChannelMismatch { .. } => "CHANNEL_MISMATCH",
            BlockCheckError::LengthMismatch { .. } => "LENGTH_MISMATCH",
            BlockCheckError::NotEnoughChannels { .. } => "NOT_ENOUGH_CHANNELS",
            BlockCheckError::NotInterleaved { .. } => "NOT_INTERLEAVED",
            BlockCheckError::TooShortForFrequency { .. } => "TOO_SHORT_FOR_FREQUENCY",
            BlockCheckError::BinOutOfRange { .. } => "BIN_OUT_OF_RANGE",
            BlockCheckError::InvalidFftSize { .. } => "INVALID_FFT_SIZE",
            BlockCheckError::InvalidAudio { .. } => "INVALID_AUDIO",
            BlockCheckError::UnknownParameter { .. } => "UNKNOWN_PARAMETER",
            BlockCheckError::Io(_) => "IO_ERROR",
            BlockCheckError::Wav(_) => "WAV_ERROR",
            BlockCheckError::Config(_) => "CONFIG_ERROR",
        }
    }

    /// Returns a suggested fix for the test that hit this error
    pub fn recovery_hint(&self) -> &'static str {
        match self {
            BlockCheckError::EmptyBlock => "Fill the block before analysing it",
            BlockCheckError::OutOfRange { .. } | BlockCheckError::InvalidRange { .. } => {
                "Keep sample boundaries within the block length"
            }
            BlockCheckError::ChannelMismatch { .. } | BlockCheckError::LengthMismatch { .. } => {
                "Write the expectation with the exact shape of the block under test"
            }
            BlockCheckError::NotEnoughChannels { .. } => "Use a multi-channel block",
            BlockCheckError::TooShortForFrequency { .. } => {
                "Use a longer block or a higher test frequency"
            }
            BlockCheckError::BinOutOfRange { .. } => "Query frequencies below Nyquist",
            BlockCheckError::UnknownParameter { .. } => "Register the parameter before setting it",
            _ => "Check the error details and try again",
        }
    }
}
