//! In-memory registry of video jobs.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use vshop_models::{JobStatus, VideoId, VideoJob};

use crate::error::{WorkerError, WorkerResult};

/// File extensions recognised as uploaded videos.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv", "webm", "m4v"];

/// Name of the per-job results directory inside the upload directory.
pub const RESULTS_DIR_NAME: &str = "results";

/// Name of the file holding a failed job's error message, inside the
/// results directory.
pub const FAILURE_FILE_NAME: &str = "error.txt";

/// Job registry shared between the API and the processor.
///
/// Every uploaded video lives in `<uploads_dir>/<id>/` with its results in
/// `<uploads_dir>/<id>/results/`. A job may be processed by another process
/// sharing the uploads directory, so reads pick up outcomes recorded on disk.
#[derive(Debug)]
pub struct JobRegistry {
    uploads_dir: PathBuf,
    jobs: RwLock<HashMap<VideoId, VideoJob>>,
}

impl JobRegistry {
    pub fn new(uploads_dir: impl Into<PathBuf>) -> Self {
        Self {
            uploads_dir: uploads_dir.into(),
            jobs: RwLock::new(HashMap::new()),
        }
    }

    /// Directory holding an upload and its results.
    pub fn upload_dir(&self, id: &VideoId) -> PathBuf {
        self.uploads_dir.join(id.as_str())
    }

    /// Build a job record for a new upload without registering it.
    pub fn new_job(&self, id: VideoId, filename: &str) -> VideoJob {
        let upload_dir = self.upload_dir(&id);
        VideoJob::new(
            id,
            filename,
            upload_dir.join(filename),
            upload_dir.join(RESULTS_DIR_NAME),
        )
    }

    /// Register a job, replacing any job with the same id.
    pub async fn add(&self, job: VideoJob) {
        debug!(video_id = %job.id, status = %job.status, "Registering job");
        self.jobs.write().await.insert(job.id.clone(), job);
    }

    pub async fn get(&self, id: &VideoId) -> WorkerResult<VideoJob> {
        let job = self
            .jobs
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| WorkerError::VideoNotFound(id.clone()))?;
        Ok(self.sync_with_disk(job).await)
    }

    /// All jobs, ordered by id.
    pub async fn list(&self) -> Vec<VideoJob> {
        let snapshot: Vec<VideoJob> = self.jobs.read().await.values().cloned().collect();
        let mut jobs = Vec::with_capacity(snapshot.len());
        for job in snapshot {
            jobs.push(self.sync_with_disk(job).await);
        }
        jobs.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        jobs
    }

    /// Apply an outcome another processor recorded on disk.
    ///
    /// A results file always means completed. A failure file only settles a
    /// job that is still processing.
    async fn sync_with_disk(&self, mut job: VideoJob) -> VideoJob {
        if job.status != JobStatus::Completed && job.results_file().exists() {
            job.complete();
        } else if job.status == JobStatus::Processing {
            match read_failure(&job.results_dir).await {
                Some(message) => job.fail(message),
                None => return job,
            }
        } else {
            return job;
        }

        debug!(video_id = %job.id, status = %job.status, "Job status changed on disk");
        if let Some(stored) = self.jobs.write().await.get_mut(&job.id) {
            stored.status = job.status;
            stored.error_message = job.error_message.clone();
        }
        job
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }

    /// Ids of jobs still in the processing state.
    pub async fn pending(&self) -> Vec<VideoId> {
        let mut ids: Vec<VideoId> = self
            .jobs
            .read()
            .await
            .values()
            .filter(|job| job.status == JobStatus::Processing)
            .map(|job| job.id.clone())
            .collect();
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        ids
    }

    pub async fn set_status(&self, id: &VideoId, status: JobStatus) -> WorkerResult<()> {
        self.update(id, |job| {
            job.status = status;
            if status != JobStatus::Failed {
                job.error_message = None;
            }
        })
        .await
    }

    pub async fn mark_completed(&self, id: &VideoId) -> WorkerResult<()> {
        self.update(id, VideoJob::complete).await
    }

    pub async fn mark_failed(&self, id: &VideoId, message: impl Into<String>) -> WorkerResult<()> {
        let message = message.into();
        self.update(id, move |job| job.fail(message)).await
    }

    async fn update<F>(&self, id: &VideoId, f: F) -> WorkerResult<()>
    where
        F: FnOnce(&mut VideoJob),
    {
        let mut jobs = self.jobs.write().await;
        let job = jobs
            .get_mut(id)
            .ok_or_else(|| WorkerError::VideoNotFound(id.clone()))?;
        f(job);
        debug!(video_id = %id, status = %job.status, "Updated job");
        Ok(())
    }

    /// Rebuild the registry from the uploads directory.
    ///
    /// Each sub-directory containing a video file becomes a job. Its status
    /// is completed when a results file exists, failed when a failure file or
    /// only the results directory exists, and processing otherwise. Returns
    /// the number of jobs loaded.
    pub async fn load_existing(&self) -> WorkerResult<usize> {
        tokio::fs::create_dir_all(&self.uploads_dir).await?;

        let mut entries = tokio::fs::read_dir(&self.uploads_dir).await?;
        let mut loaded = 0;

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let Some(id) = entry.file_name().to_str().map(VideoId::from) else {
                warn!(path = %entry.path().display(), "Skipping non UTF-8 upload directory");
                continue;
            };

            let Some(filename) = first_video_file(&entry.path()).await? else {
                debug!(video_id = %id, "Upload directory has no video file");
                continue;
            };

            let mut job = self.new_job(id, &filename);
            if job.results_file().exists() {
                job.complete();
            } else if let Some(message) = read_failure(&job.results_dir).await {
                job.fail(message);
            } else if job.results_dir.exists() {
                job.fail("Processing did not finish");
            }

            self.add(job).await;
            loaded += 1;
        }

        info!(
            uploads_dir = %self.uploads_dir.display(),
            jobs = loaded,
            "Loaded existing jobs"
        );
        Ok(loaded)
    }
}

/// Whether a file name has one of the video extensions.
pub fn is_video_file(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            VIDEO_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

/// Failure file location for a results directory.
pub fn failure_file_in(results_dir: &Path) -> PathBuf {
    results_dir.join(FAILURE_FILE_NAME)
}

async fn read_failure(results_dir: &Path) -> Option<String> {
    let message = tokio::fs::read_to_string(failure_file_in(results_dir))
        .await
        .ok()?;
    Some(message.trim().to_string())
}

/// First video file in `dir` by name.
async fn first_video_file(dir: &Path) -> WorkerResult<Option<String>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut videos = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if is_video_file(name) {
                videos.push(name.to_string());
            }
        }
    }
    videos.sort();
    Ok(videos.into_iter().next())
}
