//! Video processing orchestration.
//!
//! Runs one video through the frame pipeline and records the outcome in the
//! job registry. Each video is processed in its own task; nothing but the
//! registry is shared between them.
//!
//! A processor claims a video by creating its results directory. Only the
//! claimant writes the results, so the API and a standalone worker can share
//! one uploads directory.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::{info, warn, Instrument};
use vshop_media::{generate_thumbnail, inspect_video, FrameSourceOpener};
use vshop_models::{JobStatus, VideoId, VideoJob};
use vshop_storage::{FrameArtifacts, ResultStore};

use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::metrics;
use crate::pipeline::{FramePipeline, PipelineStats};
use crate::registry::{failure_file_in, JobRegistry};

/// File name of the per-video thumbnail inside the upload directory.
pub const THUMBNAIL_FILE_NAME: &str = "thumbnail.jpg";

/// Outcome of a thumbnail regeneration pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ThumbnailSummary {
    pub generated: usize,
    pub failed: usize,
    pub total_videos: usize,
}

/// Video processing coordinator.
pub struct VideoProcessor {
    registry: Arc<JobRegistry>,
    pipeline: Arc<FramePipeline>,
    store: ResultStore,
    opener: Arc<dyn FrameSourceOpener>,
    generate_thumbnails: bool,
}

impl VideoProcessor {
    pub fn new(
        registry: Arc<JobRegistry>,
        pipeline: Arc<FramePipeline>,
        store: ResultStore,
        opener: Arc<dyn FrameSourceOpener>,
    ) -> Self {
        Self {
            registry,
            pipeline,
            store,
            opener,
            generate_thumbnails: true,
        }
    }

    /// Enable or disable thumbnail generation after processing.
    pub fn with_thumbnails(mut self, enabled: bool) -> Self {
        self.generate_thumbnails = enabled;
        self
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    /// Process a registered video to completion.
    ///
    /// Returns [`WorkerError::AlreadyClaimed`] without touching the job when
    /// another processor owns it. On any other error the job is marked failed
    /// with the error message and no results file is written.
    pub async fn process_video(&self, id: &VideoId) -> WorkerResult<PipelineStats> {
        let job = self.registry.get(id).await?;
        claim(&job).await?;

        let job_logger = JobLogger::new(id, "video_processing");
        let started = Instant::now();

        job_logger.log_start("Starting video processing");
        self.registry.set_status(id, JobStatus::Processing).await?;

        match self.run(&job, &job_logger).await {
            Ok(stats) => {
                self.registry.mark_completed(id).await?;
                metrics::record_job_finished(true, started.elapsed().as_secs_f64());
                job_logger.log_completion(&format!(
                    "{} sampling points, {} with products, {} unreadable, {} without a person",
                    stats.sampled,
                    stats.processed,
                    stats.skipped_unreadable,
                    stats.skipped_no_person
                ));
                Ok(stats)
            }
            Err(e) => {
                job_logger.log_error(&e.to_string());
                metrics::record_job_finished(false, started.elapsed().as_secs_f64());
                let failure_file = failure_file_in(&job.results_dir);
                if let Err(write_err) = tokio::fs::write(&failure_file, e.to_string()).await {
                    job_logger.log_warning(&format!(
                        "Could not record failure in {}: {}",
                        failure_file.display(),
                        write_err
                    ));
                }
                self.registry.mark_failed(id, e.to_string()).await?;
                Err(e)
            }
        }
    }

    async fn run(&self, job: &VideoJob, job_logger: &JobLogger) -> WorkerResult<PipelineStats> {
        let source = self.opener.open(&job.file_path).await?;
        let artifacts = FrameArtifacts::create(&job.results_dir).await?;

        let outcome = self
            .pipeline
            .run(source.as_ref(), &artifacts, job_logger)
            .await?;

        if self.generate_thumbnails {
            if let Err(e) = write_thumbnail(&job.file_path).await {
                job_logger.log_warning(&format!("Thumbnail generation failed: {}", e));
            }
        }

        self.store.save(&job.results_dir, &outcome.result).await?;
        Ok(outcome.stats)
    }

    /// Process a video in a background task.
    ///
    /// The outcome is only visible through the registry.
    pub fn spawn(self: &Arc<Self>, id: VideoId) -> JoinHandle<()> {
        let processor = Arc::clone(self);
        let span = JobLogger::new(&id, "video_processing").create_span();
        tokio::spawn(
            async move {
                // Failures are already recorded on the job.
                let _ = processor.process_video(&id).await;
            }
            .instrument(span),
        )
    }

    /// Generate the thumbnail of every registered video that lacks one.
    pub async fn regenerate_thumbnails(&self) -> ThumbnailSummary {
        let jobs = self.registry.list().await;
        let mut summary = ThumbnailSummary {
            total_videos: jobs.len(),
            ..Default::default()
        };

        for job in jobs {
            if thumbnail_path(&job.file_path).exists() {
                continue;
            }
            match write_thumbnail(&job.file_path).await {
                Ok(path) => {
                    summary.generated += 1;
                    tracing::debug!(video_id = %job.id, path = %path.display(), "Regenerated thumbnail");
                }
                Err(e) => {
                    summary.failed += 1;
                    warn!(video_id = %job.id, error = %e, "Thumbnail regeneration failed");
                }
            }
        }

        info!(
            generated = summary.generated,
            failed = summary.failed,
            total = summary.total_videos,
            "Thumbnail regeneration complete"
        );
        summary
    }
}

/// Take ownership of a job by creating its results directory.
async fn claim(job: &VideoJob) -> WorkerResult<()> {
    if let Some(upload_dir) = job.results_dir.parent() {
        tokio::fs::create_dir_all(upload_dir).await?;
    }
    match tokio::fs::create_dir(&job.results_dir).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            info!(video_id = %job.id, "Video already claimed by another processor");
            Err(WorkerError::AlreadyClaimed(job.id.clone()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Thumbnail location for a video file.
pub fn thumbnail_path(video_path: &Path) -> PathBuf {
    video_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(THUMBNAIL_FILE_NAME)
}

async fn write_thumbnail(video_path: &Path) -> WorkerResult<PathBuf> {
    if !video_path.exists() {
        return Err(WorkerError::processing_failed(format!(
            "video file missing: {}",
            video_path.display()
        )));
    }
    let info = inspect_video(video_path).await?;
    let output = thumbnail_path(video_path);
    generate_thumbnail(video_path, &output, info.duration).await?;
    Ok(output)
}
