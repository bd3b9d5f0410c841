use thiserror::Error;

#[derive(Error, Debug)]
pub enum MergeError {
    #[error("Empty frame sequence")]
    EmptySequence,

    #[error("Invalid image dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Frame {index} is {actual_width}x{actual_height}, expected {expected_width}x{expected_height}")]
    DimensionMismatch {
        index: usize,
        expected_width: usize,
        expected_height: usize,
        actual_width: usize,
        actual_height: usize,
    },

    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Failed to allocate accumulator of {bytes} bytes")]
    AllocationFailed { bytes: usize },

    #[error("Merge cancelled")]
    Cancelled,

    #[error("Averaging session already finished")]
    SessionClosed,
}

/// Broad classification of a [`MergeError`].
///
/// Callers reject the request outright on `InvalidInput` and may retry with
/// fewer frames (or fall back to a single capture) on `ProcessingFailed`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    ProcessingFailed,
}

impl MergeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptySequence
            | Self::InvalidDimensions { .. }
            | Self::DimensionMismatch { .. }
            | Self::InvalidParameter { .. }
            | Self::SessionClosed => ErrorKind::InvalidInput,
            Self::AllocationFailed { .. } | Self::Cancelled => ErrorKind::ProcessingFailed,
        }
    }

    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MergeError>;
