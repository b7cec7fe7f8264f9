//! Frame quality assessment.
//!
//! A frame is judged on three grayscale statistics: sharpness (variance of
//! the Laplacian), brightness (mean intensity) and contrast (intensity
//! standard deviation). The verdict carries both a pass/fail decision
//! against configured thresholds and a composite score in [0, 1] used to
//! rank nearby frames against each other.

use image::{GrayImage, Luma, RgbImage};
use vshop_models::{FrameQualityMetrics, QualityVerdict};

/// Sharpness at which the sharpness term saturates.
const SHARPNESS_NORM: f64 = 1000.0;
/// Contrast at which the contrast term saturates.
const CONTRAST_NORM: f64 = 80.0;

const SHARPNESS_WEIGHT: f64 = 0.5;
const BRIGHTNESS_WEIGHT: f64 = 0.3;
const CONTRAST_WEIGHT: f64 = 0.2;

/// Quality thresholds.
#[derive(Debug, Clone)]
pub struct QualityConfig {
    /// When false every frame passes with score 1.0
    pub enabled: bool,
    /// Minimum Laplacian variance for a frame to count as sharp
    pub blur_threshold: f64,
    /// Minimum acceptable mean brightness
    pub min_brightness: f64,
    /// Maximum acceptable mean brightness
    pub max_brightness: f64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            blur_threshold: 100.0,
            min_brightness: 40.0,
            max_brightness: 220.0,
        }
    }
}

impl QualityConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            enabled: std::env::var("QUALITY_CHECK_ENABLED")
                .ok()
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(defaults.enabled),
            blur_threshold: std::env::var("QUALITY_BLUR_THRESHOLD")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.blur_threshold),
            min_brightness: std::env::var("QUALITY_MIN_BRIGHTNESS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.min_brightness),
            max_brightness: std::env::var("QUALITY_MAX_BRIGHTNESS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_brightness),
        }
    }
}

/// Scores frames for sharpness and exposure. Pure and stateless.
#[derive(Debug, Clone, Default)]
pub struct QualityAssessor {
    config: QualityConfig,
}

impl QualityAssessor {
    pub fn new(config: QualityConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &QualityConfig {
        &self.config
    }

    /// Assess one frame.
    pub fn assess(&self, frame: &RgbImage) -> QualityVerdict {
        if !self.config.enabled {
            return QualityVerdict::unchecked();
        }

        let gray = to_gray(frame);
        let metrics = measure(&gray);

        let passes = metrics.sharpness >= self.config.blur_threshold
            && metrics.brightness >= self.config.min_brightness
            && metrics.brightness <= self.config.max_brightness;

        QualityVerdict {
            passes,
            score: self.score(&metrics),
            metrics: Some(metrics),
        }
    }

    /// Composite score in [0, 1].
    pub fn score(&self, metrics: &FrameQualityMetrics) -> f64 {
        let sharpness_term = (metrics.sharpness / SHARPNESS_NORM).min(1.0);

        let mid = (self.config.min_brightness + self.config.max_brightness) / 2.0;
        let half_range = (self.config.max_brightness - self.config.min_brightness) / 2.0;
        let brightness_term = if half_range > 0.0 {
            (1.0 - (metrics.brightness - mid).abs() / half_range).max(0.0)
        } else if metrics.brightness == mid {
            1.0
        } else {
            0.0
        };

        let contrast_term = (metrics.contrast / CONTRAST_NORM).min(1.0);

        (SHARPNESS_WEIGHT * sharpness_term.max(0.0)
            + BRIGHTNESS_WEIGHT * brightness_term
            + CONTRAST_WEIGHT * contrast_term.max(0.0))
        .clamp(0.0, 1.0)
    }
}

/// ITU-R BT.601 luma conversion.
pub fn to_gray(frame: &RgbImage) -> GrayImage {
    let (w, h) = frame.dimensions();
    let mut gray = GrayImage::new(w, h);
    for (x, y, px) in frame.enumerate_pixels() {
        let [r, g, b] = px.0;
        let luma = 0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64;
        gray.put_pixel(x, y, Luma([luma.round().clamp(0.0, 255.0) as u8]));
    }
    gray
}

fn measure(gray: &GrayImage) -> FrameQualityMetrics {
    let n = (gray.width() as f64) * (gray.height() as f64);
    if n == 0.0 {
        return FrameQualityMetrics {
            sharpness: 0.0,
            brightness: 0.0,
            contrast: 0.0,
        };
    }

    let mean = gray.pixels().map(|p| p[0] as f64).sum::<f64>() / n;
    let variance = gray
        .pixels()
        .map(|p| (p[0] as f64 - mean).powi(2))
        .sum::<f64>()
        / n;

    FrameQualityMetrics {
        sharpness: laplacian_variance(gray),
        brightness: mean,
        contrast: variance.sqrt(),
    }
}

/// Mirror an out-of-range index back inside `0..n` without repeating the edge.
#[inline]
fn reflect101(i: i64, n: i64) -> u32 {
    if n == 1 {
        return 0;
    }
    let r = if i < 0 {
        -i
    } else if i >= n {
        2 * n - 2 - i
    } else {
        i
    };
    r.clamp(0, n - 1) as u32
}

/// Variance of the 3x3 Laplacian response over every pixel.
fn laplacian_variance(gray: &GrayImage) -> f64 {
    let (w, h) = (gray.width() as i64, gray.height() as i64);
    let at = |x: i64, y: i64| gray.get_pixel(reflect101(x, w), reflect101(y, h))[0] as f64;

    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    for y in 0..h {
        for x in 0..w {
            let lap = at(x, y - 1) + at(x, y + 1) + at(x - 1, y) + at(x + 1, y) - 4.0 * at(x, y);
            sum += lap;
            sum_sq += lap * lap;
        }
    }

    let n = (w * h) as f64;
    let mean = sum / n;
    (sum_sq / n - mean * mean).max(0.0)
}
