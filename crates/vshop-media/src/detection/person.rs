//! Person-presence gating.

use image::RgbImage;
use std::sync::Arc;
use tracing::{debug, warn};
use vshop_models::BoundingBox;

use super::providers::PersonDetector;

/// Person gate settings.
#[derive(Debug, Clone)]
pub struct PersonGateConfig {
    /// When false every frame is let through without a detector call
    pub enabled: bool,
    /// Minimum person box area as a fraction of the frame area
    pub min_person_area: f64,
}

impl Default for PersonGateConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_person_area: 0.05,
        }
    }
}

impl PersonGateConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            enabled: std::env::var("PERSON_GATE_ENABLED")
                .ok()
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(true),
            min_person_area: std::env::var("PERSON_MIN_AREA")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0.05),
        }
    }
}

/// Outcome of gating one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersonVerdict {
    pub has_person: bool,
    /// Person boxes that survived the area filter
    pub boxes: Vec<BoundingBox>,
    pub confidences: Vec<f64>,
}

impl PersonVerdict {
    /// Verdict that lets the frame through without any person boxes.
    pub fn pass_through() -> Self {
        Self {
            has_person: true,
            boxes: Vec::new(),
            confidences: Vec::new(),
        }
    }

    /// Highest-confidence person box (first one on ties).
    pub fn primary_box(&self) -> Option<BoundingBox> {
        let mut best: Option<(BoundingBox, f64)> = None;
        for (b, &c) in self.boxes.iter().zip(self.confidences.iter()) {
            if best.map_or(true, |(_, bc)| c > bc) {
                best = Some((*b, c));
            }
        }
        best.map(|(b, _)| b)
    }
}

/// Decides whether a frame shows a sufficiently large person.
#[derive(Clone)]
pub struct PersonGate {
    detector: Arc<dyn PersonDetector>,
    config: PersonGateConfig,
}

impl PersonGate {
    pub fn new(detector: Arc<dyn PersonDetector>, config: PersonGateConfig) -> Self {
        Self { detector, config }
    }

    pub fn config(&self) -> &PersonGateConfig {
        &self.config
    }

    /// Gate a frame.
    ///
    /// Detector failures let the frame through with no boxes rather than
    /// dropping it.
    pub async fn evaluate(&self, frame: &RgbImage) -> PersonVerdict {
        if !self.config.enabled {
            return PersonVerdict::pass_through();
        }

        let detections = match self.detector.detect_people(frame).await {
            Ok(d) => d,
            Err(e) => {
                warn!(
                    detector = self.detector.name(),
                    error = %e,
                    "Person detection failed, letting frame through"
                );
                metrics::counter!("vshop_detector_failures_total", "detector" => "person")
                    .increment(1);
                return PersonVerdict::pass_through();
            }
        };

        let frame_area = frame.width() as f64 * frame.height() as f64;
        let mut verdict = PersonVerdict::default();
        for (bbox, &confidence) in detections.boxes.iter().zip(detections.confidences.iter()) {
            if frame_area <= 0.0 {
                break;
            }
            let area_ratio = bbox.area() / frame_area;
            if area_ratio > self.config.min_person_area {
                verdict.boxes.push(*bbox);
                verdict.confidences.push(confidence);
            }
        }
        verdict.has_person = !verdict.boxes.is_empty();

        debug!(
            detector = self.detector.name(),
            candidates = detections.boxes.len(),
            kept = verdict.boxes.len(),
            "Person gate evaluated"
        );

        verdict
    }
}
