//! Runs the clothing and jewelry detectors on a frame and merges their
//! output into one list of [`Detection`]s in full-frame coordinates.

use image::RgbImage;
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{debug, warn};
use vshop_models::{BoundingBox, Category, Detection};

use super::providers::ObjectDetector;
use crate::crop::crop;

/// Fusion settings.
#[derive(Debug, Clone)]
pub struct FusionConfig {
    /// Padding added around the person box, as a fraction of its size
    pub person_padding_ratio: f64,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            person_padding_ratio: 0.05,
        }
    }
}

impl FusionConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            person_padding_ratio: std::env::var("PERSON_CROP_PADDING")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0.05),
        }
    }
}

/// Detection fusion over the two category detectors.
#[derive(Clone)]
pub struct DetectionFusion {
    clothing: Arc<dyn ObjectDetector>,
    jewelry: Arc<dyn ObjectDetector>,
    config: FusionConfig,
}

impl DetectionFusion {
    pub fn new(
        clothing: Arc<dyn ObjectDetector>,
        jewelry: Arc<dyn ObjectDetector>,
        config: FusionConfig,
    ) -> Self {
        Self {
            clothing,
            jewelry,
            config,
        }
    }

    /// Detect clothing and jewelry in a frame.
    ///
    /// With a person box the detectors only see the padded person region;
    /// returned boxes are mapped back to the full frame either way. Clothing
    /// detections come first. A failing detector contributes nothing.
    pub async fn detect(&self, frame: &RgbImage, person_box: Option<&BoundingBox>) -> Vec<Detection> {
        let region = person_box.and_then(|b| {
            b.padded_pixel_rect(frame.width(), frame.height(), self.config.person_padding_ratio)
        });

        let (image, offset_x, offset_y) = match region {
            Some(rect) => (Cow::Owned(crop(frame, rect)), rect.x as f64, rect.y as f64),
            None => (Cow::Borrowed(frame), 0.0, 0.0),
        };

        let mut detections = self
            .run_detector(&self.clothing, Category::Clothing, &image, offset_x, offset_y)
            .await;
        detections.extend(
            self.run_detector(&self.jewelry, Category::Jewelry, &image, offset_x, offset_y)
                .await,
        );

        debug!(
            detections = detections.len(),
            cropped = region.is_some(),
            "Detection fusion complete"
        );

        detections
    }

    async fn run_detector(
        &self,
        detector: &Arc<dyn ObjectDetector>,
        category: Category,
        image: &RgbImage,
        offset_x: f64,
        offset_y: f64,
    ) -> Vec<Detection> {
        let raw = match detector.detect(image).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(
                    detector = detector.name(),
                    category = %category,
                    error = %e,
                    "Detector failed, skipping category for this frame"
                );
                metrics::counter!("vshop_detector_failures_total", "detector" => category.as_str())
                    .increment(1);
                return Vec::new();
            }
        };

        let threshold = detector.confidence_threshold();
        raw.iter()
            .filter(|(_, _, score)| *score >= threshold)
            .map(|(raw_box, label, score)| {
                Detection::new(
                    detector.label_name(label),
                    score,
                    raw_box.to_corners().translate(offset_x, offset_y),
                    category,
                )
            })
            .collect()
    }
}
