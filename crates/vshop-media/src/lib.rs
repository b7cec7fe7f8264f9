//! Frame access, quality scoring and detection for video product discovery.
//!
//! This crate provides:
//! - Random-access frame sources over FFmpeg or in-memory images
//! - Frame quality assessment and best-frame selection
//! - Capability traits for the external person and category detectors
//! - Person gating and clothing/jewelry detection fusion
//! - Thumbnail extraction

pub mod command;
pub mod crop;
pub mod detection;
pub mod error;
pub mod frames;
pub mod info;
pub mod quality;
pub mod selector;
pub mod thumbnail;

pub use command::{FfmpegCommand, FfmpegRunner};
pub use crop::{crop, encode_jpeg};
pub use detection::{
    DetectionFusion, DetectorLabel, FusionConfig, ObjectDetector, PersonDetections,
    PersonDetector, PersonGate, PersonGateConfig, PersonVerdict, RawBox, RawDetections,
};
pub use error::{MediaError, MediaResult};
pub use frames::{
    FfmpegFrameSource, FfmpegSourceOpener, FrameSource, FrameSourceOpener, InMemoryFrameSource,
};
pub use info::{inspect_video, VideoInfo};
pub use quality::{QualityAssessor, QualityConfig};
pub use selector::{FrameSelector, SelectedFrame, SelectorConfig};
pub use thumbnail::generate_thumbnail;
