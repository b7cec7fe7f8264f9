//! Video product discovery worker.
//!
//! This crate provides:
//! - The per-video frame pipeline and product resolution
//! - The job registry and background video processing
//! - Remote detector and similarity-index adapters

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod processor;
pub mod providers;
pub mod registry;
pub mod resolver;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use logging::JobLogger;
pub use pipeline::{FramePipeline, PipelineConfig, PipelineOutcome, PipelineStats};
pub use processor::{ThumbnailSummary, VideoProcessor};
pub use providers::Capabilities;
pub use registry::JobRegistry;
pub use resolver::{ProductResolver, ResolverConfig, SimilarityIndex};

use std::sync::Arc;
use vshop_media::{
    DetectionFusion, FfmpegSourceOpener, FrameSelector, PersonGate, QualityAssessor,
};
use vshop_storage::ResultStore;

/// Wire the pipeline and processor from configuration and capabilities.
pub fn build_processor(
    config: &WorkerConfig,
    capabilities: Capabilities,
    registry: Arc<JobRegistry>,
) -> VideoProcessor {
    let selector = FrameSelector::new(QualityAssessor::new(config.quality.clone()));
    let gate = PersonGate::new(capabilities.person, config.person_gate.clone());
    let fusion = DetectionFusion::new(
        capabilities.clothing,
        capabilities.jewelry,
        config.fusion.clone(),
    );
    let resolver = capabilities
        .indices
        .into_iter()
        .fold(ProductResolver::new(config.resolver.clone()), |resolver, (category, index)| {
            resolver.with_index(category, index)
        });

    let pipeline = FramePipeline::new(selector, gate, fusion, resolver, config.pipeline.clone());

    VideoProcessor::new(
        registry,
        Arc::new(pipeline),
        ResultStore::new(config.pipeline.interval_secs),
        Arc::new(FfmpegSourceOpener),
    )
    .with_thumbnails(config.generate_thumbnails)
}
