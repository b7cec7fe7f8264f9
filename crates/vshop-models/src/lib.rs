//! Shared data models for the VShop backend.
//!
//! This crate provides Serde-serializable types for:
//! - Detection categories, bounding boxes and detections
//! - Catalog products resolved from detections, and bundles of them
//! - Frame quality metrics and verdicts
//! - Per-video job records and the timestamp-indexed job result

pub mod bundle;
pub mod category;
pub mod detection;
pub mod geometry;
pub mod product;
pub mod quality;
pub mod result;
pub mod video;

// Re-export common types
pub use bundle::{build_bundles, Bundle, BundleKind, MAX_BUNDLES};
pub use category::{Category, ParseCategoryError};
pub use detection::Detection;
pub use geometry::{BoundingBox, PixelRect};
pub use product::{title_case, Product, ProductResult, StockStatus};
pub use quality::{FrameQualityMetrics, QualityVerdict};
pub use result::{format_timestamp_key, JobResult, RESULTS_FILE_NAME};
pub use video::{results_file_in, JobStatus, VideoId, VideoJob};
