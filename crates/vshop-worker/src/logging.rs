//! Structured job logging utilities.

use tracing::{error, info, warn, Span};
use vshop_models::VideoId;

/// Job logger for structured logging with consistent formatting.
///
/// Every event carries the video ID and the operation name so a single
/// job can be followed through interleaved logs.
#[derive(Debug, Clone)]
pub struct JobLogger {
    video_id: String,
    operation: String,
}

impl JobLogger {
    /// Create a new job logger for a specific video and operation.
    pub fn new(video_id: &VideoId, operation: &str) -> Self {
        Self {
            video_id: video_id.to_string(),
            operation: operation.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            video_id = %self.video_id,
            operation = %self.operation,
            "Job started: {}", message
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(
            video_id = %self.video_id,
            operation = %self.operation,
            "Job progress: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            video_id = %self.video_id,
            operation = %self.operation,
            "Job warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            video_id = %self.video_id,
            operation = %self.operation,
            "Job error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            video_id = %self.video_id,
            operation = %self.operation,
            "Job completed: {}", message
        );
    }

    pub fn video_id(&self) -> &str {
        &self.video_id
    }

    /// Create a tracing span for this job.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "job",
            video_id = %self.video_id,
            operation = %self.operation
        )
    }
}
