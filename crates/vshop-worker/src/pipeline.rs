//! Per-video frame pipeline.
//!
//! Samples the video at a fixed interval and, for each sampling point,
//! selects the best nearby frame, gates it on person presence, fuses the
//! category detections and resolves them to products.

use serde::Serialize;
use vshop_media::{
    DetectionFusion, FrameSelector, FrameSource, PersonGate, SelectedFrame, SelectorConfig,
};
use vshop_models::JobResult;
use vshop_storage::FrameArtifacts;

use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::metrics::{self, SkipReason};
use crate::resolver::ProductResolver;

/// Sampling points between progress log lines.
const PROGRESS_LOG_EVERY: u64 = 10;

/// Frame pipeline settings.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Seconds between sampling points
    pub interval_secs: f64,
    /// Best-frame search window
    pub selector: SelectorConfig,
    /// Keep a JPEG of every analyzed frame under `frames/`
    pub save_frames: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            interval_secs: 5.0,
            selector: SelectorConfig::default(),
            save_frames: true,
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            interval_secs: std::env::var("VIDEO_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5.0),
            selector: SelectorConfig::from_env(),
            save_frames: std::env::var("SAVE_FRAMES")
                .ok()
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(true),
        }
    }
}

/// Counters for one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    /// Sampling points visited
    pub sampled: u64,
    /// Frames that produced at least one product
    pub processed: u64,
    /// Sampling points with no readable frame in the search window
    pub skipped_unreadable: u64,
    /// Frames rejected by the person gate
    pub skipped_no_person: u64,
    /// Analyzed frames that resolved to no products
    pub without_products: u64,
}

/// Result map and counters of a finished run.
#[derive(Debug, Clone, Default)]
pub struct PipelineOutcome {
    pub result: JobResult,
    pub stats: PipelineStats,
}

/// The sequential analysis pipeline for one video.
///
/// Components are built once and shared between jobs; a run owns nothing
/// but its frame source and artifact directories.
#[derive(Clone)]
pub struct FramePipeline {
    selector: FrameSelector,
    gate: PersonGate,
    fusion: DetectionFusion,
    resolver: ProductResolver,
    config: PipelineConfig,
}

impl FramePipeline {
    pub fn new(
        selector: FrameSelector,
        gate: PersonGate,
        fusion: DetectionFusion,
        resolver: ProductResolver,
        config: PipelineConfig,
    ) -> Self {
        Self {
            selector,
            gate,
            fusion,
            resolver,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Frames between sampling points for a given frame rate.
    pub fn frame_interval(&self, fps: f64) -> WorkerResult<u64> {
        if !fps.is_finite() || fps <= 0.0 {
            return Err(WorkerError::processing_failed(format!(
                "invalid frame rate: {fps}"
            )));
        }
        let interval = (fps * self.config.interval_secs).floor();
        if !interval.is_finite() || interval < 1.0 {
            return Err(WorkerError::processing_failed(format!(
                "sampling interval of {}s is shorter than one frame at {fps} fps",
                self.config.interval_secs
            )));
        }
        Ok(interval as u64)
    }

    /// Analyze every sampling point of `source`.
    ///
    /// Sampling points without a readable frame, without a person, or
    /// without products are skipped and counted; only frames with products
    /// enter the result map.
    pub async fn run(
        &self,
        source: &dyn FrameSource,
        artifacts: &FrameArtifacts,
        logger: &JobLogger,
    ) -> WorkerResult<PipelineOutcome> {
        let fps = source.fps();
        let frame_count = source.frame_count();
        let frame_interval = self.frame_interval(fps)?;
        let total_points = frame_count.div_ceil(frame_interval);

        logger.log_progress(&format!(
            "Sampling {} points ({} frames at {:.2} fps, every {} frames)",
            total_points, frame_count, fps, frame_interval
        ));

        let mut outcome = PipelineOutcome::default();

        for interval_index in (0..frame_count).step_by(frame_interval as usize) {
            outcome.stats.sampled += 1;
            metrics::record_frame_sampled();

            let Some(selected) = self
                .selector
                .select_best(
                    source,
                    interval_index,
                    fps,
                    self.config.selector.search_radius_secs,
                )
                .await
            else {
                tracing::debug!(
                    video_id = logger.video_id(),
                    interval_index,
                    "No readable frame near sampling point"
                );
                outcome.stats.skipped_unreadable += 1;
                metrics::record_frame_skipped(SkipReason::Unreadable);
                continue;
            };

            self.analyze(selected, fps, artifacts, logger, &mut outcome)
                .await;

            if outcome.stats.sampled % PROGRESS_LOG_EVERY == 0 {
                logger.log_progress(&format!(
                    "{}/{} sampling points, {} with products",
                    outcome.stats.sampled, total_points, outcome.stats.processed
                ));
            }
        }

        Ok(outcome)
    }

    async fn analyze(
        &self,
        selected: SelectedFrame,
        fps: f64,
        artifacts: &FrameArtifacts,
        logger: &JobLogger,
        outcome: &mut PipelineOutcome,
    ) {
        let timestamp = selected.index as f64 / fps;
        let frame = &selected.image;

        let verdict = self.gate.evaluate(frame).await;
        if !verdict.has_person {
            tracing::debug!(
                video_id = logger.video_id(),
                timestamp,
                "No person in frame, skipping"
            );
            outcome.stats.skipped_no_person += 1;
            metrics::record_frame_skipped(SkipReason::NoPerson);
            return;
        }

        if self.config.save_frames {
            if let Err(e) = artifacts.save_frame(frame, timestamp).await {
                logger.log_warning(&format!("Failed to save frame at {:.1}s: {}", timestamp, e));
            }
        }

        let primary = verdict.primary_box();
        let detections = self.fusion.detect(frame, primary.as_ref()).await;
        let products = self
            .resolver
            .resolve(&detections, frame, artifacts, timestamp)
            .await;

        tracing::debug!(
            video_id = logger.video_id(),
            timestamp,
            frame_index = selected.index,
            quality = selected.verdict.score,
            detections = detections.len(),
            products = products.len(),
            "Analyzed frame"
        );

        if products.is_empty() {
            outcome.stats.without_products += 1;
            return;
        }

        metrics::record_frame_processed(products.len());
        outcome.stats.processed += 1;
        outcome.result.put(timestamp, products);
    }
}
