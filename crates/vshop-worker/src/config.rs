//! Worker configuration.

use std::path::PathBuf;

use vshop_media::{FusionConfig, PersonGateConfig, QualityConfig};

use crate::pipeline::PipelineConfig;
use crate::resolver::ResolverConfig;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Directory holding one sub-directory per uploaded video
    pub uploads_dir: PathBuf,
    /// Write a thumbnail next to each processed video
    pub generate_thumbnails: bool,
    pub pipeline: PipelineConfig,
    pub quality: QualityConfig,
    pub person_gate: PersonGateConfig,
    pub fusion: FusionConfig,
    pub resolver: ResolverConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            uploads_dir: PathBuf::from("data/uploads"),
            generate_thumbnails: true,
            pipeline: PipelineConfig::default(),
            quality: QualityConfig::default(),
            person_gate: PersonGateConfig::default(),
            fusion: FusionConfig::default(),
            resolver: ResolverConfig::default(),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            uploads_dir: std::env::var("UPLOADS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data/uploads")),
            generate_thumbnails: std::env::var("GENERATE_THUMBNAILS")
                .ok()
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(true),
            pipeline: PipelineConfig::from_env(),
            quality: QualityConfig::from_env(),
            person_gate: PersonGateConfig::from_env(),
            fusion: FusionConfig::from_env(),
            resolver: ResolverConfig::from_env(),
        }
    }
}
