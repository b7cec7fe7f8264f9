//! Application state.

use std::sync::Arc;

use vshop_storage::ResultStore;
use vshop_worker::{JobRegistry, VideoProcessor};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub registry: Arc<JobRegistry>,
    pub processor: Arc<VideoProcessor>,
}

impl AppState {
    pub fn new(config: ApiConfig, processor: Arc<VideoProcessor>) -> Self {
        Self {
            config,
            registry: Arc::clone(processor.registry()),
            processor,
        }
    }

    pub fn store(&self) -> &ResultStore {
        self.processor.store()
    }
}
