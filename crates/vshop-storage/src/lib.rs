//! Local persistence for job results and frame artifacts.
//!
//! This crate provides:
//! - Atomic, once-per-job persistence of the timestamp-indexed job result
//! - Tolerant playback-time lookup over persisted results
//! - Per-job frame and crop image artifacts

pub mod artifacts;
pub mod error;
pub mod results;

pub use artifacts::{CropSink, FrameArtifacts};
pub use error::{StorageError, StorageResult};
pub use results::ResultStore;
