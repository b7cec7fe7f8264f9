//! Video job models.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::result::RESULTS_FILE_NAME;

/// Unique identifier for an uploaded video.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(pub String);

impl VideoId {
    /// Generate a new random video ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for VideoId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for VideoId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for VideoId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Processing status of a video job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Frames are being analyzed
    #[default]
    Processing,
    /// Results were persisted
    Completed,
    /// Processing aborted; see the job's error message
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One uploaded video and where its outputs live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoJob {
    pub id: VideoId,
    /// Original upload file name
    pub filename: String,
    #[serde(default)]
    pub status: JobStatus,
    /// Location of the video file
    pub file_path: PathBuf,
    /// Directory holding the result file and frame artifacts
    pub results_dir: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
}

impl VideoJob {
    /// Create a new job in the processing state.
    pub fn new(
        id: VideoId,
        filename: impl Into<String>,
        file_path: impl Into<PathBuf>,
        results_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            id,
            filename: filename.into(),
            status: JobStatus::Processing,
            file_path: file_path.into(),
            results_dir: results_dir.into(),
            error_message: None,
            video_url: None,
        }
    }

    /// Path of the persisted job result.
    pub fn results_file(&self) -> PathBuf {
        results_file_in(&self.results_dir)
    }

    pub fn is_completed(&self) -> bool {
        self.status == JobStatus::Completed
    }

    /// Mark job as completed.
    pub fn complete(&mut self) {
        self.status = JobStatus::Completed;
        self.error_message = None;
    }

    /// Mark job as failed with an error message.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = JobStatus::Failed;
        self.error_message = Some(error.into());
    }
}

/// Result file location for a results directory.
pub fn results_file_in(results_dir: &Path) -> PathBuf {
    results_dir.join(RESULTS_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_id_is_uuid() {
        let id = VideoId::new();
        assert!(Uuid::parse_str(id.as_str()).is_ok());
    }

    #[test]
    fn test_job_transitions() {
        let mut job = VideoJob::new(VideoId::from("v1"), "clip.mp4", "/u/v1/clip.mp4", "/u/v1/results");
        assert_eq!(job.status, JobStatus::Processing);

        job.fail("cannot open video");
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error_message.as_deref(), Some("cannot open video"));

        job.complete();
        assert!(job.is_completed());
        assert!(job.error_message.is_none());
    }

    #[test]
    fn test_results_file_location() {
        let job = VideoJob::new(VideoId::from("v1"), "clip.mp4", "/u/v1/clip.mp4", "/u/v1/results");
        assert_eq!(job.results_file(), PathBuf::from("/u/v1/results/detection_results.json"));
    }

    #[test]
    fn test_status_serde() {
        assert_eq!(serde_json::to_string(&JobStatus::Completed).unwrap(), "\"completed\"");
    }
}
