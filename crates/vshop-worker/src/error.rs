//! Worker error types.

use thiserror::Error;
use vshop_models::VideoId;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Video not found: {0}")]
    VideoNotFound(VideoId),

    #[error("Processing failed: {0}")]
    ProcessingFailed(String),

    #[error("Search failed: {0}")]
    SearchFailed(String),

    #[error("Video {0} is already being processed")]
    AlreadyClaimed(VideoId),

    #[error("Storage error: {0}")]
    Storage(#[from] vshop_storage::StorageError),

    #[error("Media error: {0}")]
    Media(#[from] vshop_media::MediaError),

    #[error("ML service error: {0}")]
    Ml(#[from] vshop_ml_client::MlError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn processing_failed(msg: impl Into<String>) -> Self {
        Self::ProcessingFailed(msg.into())
    }

    pub fn search_failed(msg: impl Into<String>) -> Self {
        Self::SearchFailed(msg.into())
    }

    /// Whether the error means the requested video does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, WorkerError::VideoNotFound(_))
    }

    /// Whether another processor owns the video.
    pub fn is_already_claimed(&self) -> bool {
        matches!(self, WorkerError::AlreadyClaimed(_))
    }
}
