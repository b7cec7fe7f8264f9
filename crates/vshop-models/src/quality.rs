//! Frame quality measurements.

use serde::{Deserialize, Serialize};

/// Raw image statistics used to judge a frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameQualityMetrics {
    /// Variance of the Laplacian response (higher = sharper)
    pub sharpness: f64,
    /// Mean gray intensity in [0, 255]
    pub brightness: f64,
    /// Standard deviation of gray intensity
    pub contrast: f64,
}

/// Result of assessing one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityVerdict {
    /// Whether the frame meets the configured thresholds
    pub passes: bool,
    /// Composite score in [0, 1]
    pub score: f64,
    /// Measurements, absent when quality checking is disabled
    pub metrics: Option<FrameQualityMetrics>,
}

impl QualityVerdict {
    /// Verdict used when quality checking is turned off.
    pub fn unchecked() -> Self {
        Self {
            passes: true,
            score: 1.0,
            metrics: None,
        }
    }
}
