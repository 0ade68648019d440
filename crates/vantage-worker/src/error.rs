//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("unsupported video format: {0:?}")]
    UnsupportedFormat(String),

    #[error("invalid region of interest: {0}")]
    InvalidRoi(String),

    #[error("media error: {0}")]
    Media(#[from] vantage_media::MediaError),

    #[error("store error: {0}")]
    Store(#[from] vantage_store::StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn invalid_roi(msg: impl Into<String>) -> Self {
        Self::InvalidRoi(msg.into())
    }
}
