//! Error types for media operations.

use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while decoding, detecting or rendering.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("sink unavailable: {0}")]
    SinkUnavailable(String),

    #[error("model not found: {0}")]
    ModelNotFound(String),

    #[error("detection failed: {0}")]
    DetectionFailed(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create a source unavailability error.
    pub fn source_unavailable(message: impl Into<String>) -> Self {
        Self::SourceUnavailable(message.into())
    }

    /// Create a sink unavailability error.
    pub fn sink_unavailable(message: impl Into<String>) -> Self {
        Self::SinkUnavailable(message.into())
    }

    /// Create a detection failure error.
    pub fn detection_failed(message: impl Into<String>) -> Self {
        Self::DetectionFailed(message.into())
    }

    /// Create a model not found error.
    pub fn model_not_found(path: impl Into<String>) -> Self {
        Self::ModelNotFound(path.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}
