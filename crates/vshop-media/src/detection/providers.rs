//! Capability traits for the external detectors.
//!
//! Detectors are black boxes reached over these traits. Implementations are
//! constructed once and injected into [`PersonGate`](super::PersonGate) and
//! [`DetectionFusion`](super::DetectionFusion); the gate and the fusion
//! never load models themselves.

use async_trait::async_trait;
use image::RgbImage;
use std::fmt;
use vshop_models::BoundingBox;

use crate::error::MediaResult;

/// A raw box as reported by a detector, in the coordinates of the image it
/// was given.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawBox {
    /// `(x1, y1, x2, y2)` corners
    Corners { x1: f64, y1: f64, x2: f64, y2: f64 },
    /// `(cx, cy, width, height)` center form
    Center {
        cx: f64,
        cy: f64,
        width: f64,
        height: f64,
    },
}

impl RawBox {
    /// Normalize to corner form.
    pub fn to_corners(self) -> BoundingBox {
        match self {
            RawBox::Corners { x1, y1, x2, y2 } => BoundingBox::new(x1, y1, x2, y2),
            RawBox::Center {
                cx,
                cy,
                width,
                height,
            } => BoundingBox::from_center(cx, cy, width, height),
        }
    }
}

/// Detector class label: numeric ids need the detector's own mapping,
/// string labels are used as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DetectorLabel {
    Id(u32),
    Name(String),
}

impl fmt::Display for DetectorLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectorLabel::Id(id) => write!(f, "{id}"),
            DetectorLabel::Name(name) => f.write_str(name),
        }
    }
}

/// Parallel arrays returned by an object detector.
///
/// Entry `i` of each array describes the same detection. If the arrays
/// disagree in length only the common prefix is meaningful.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawDetections {
    pub boxes: Vec<RawBox>,
    pub labels: Vec<DetectorLabel>,
    pub scores: Vec<f64>,
}

impl RawDetections {
    pub fn len(&self) -> usize {
        self.boxes
            .len()
            .min(self.labels.len())
            .min(self.scores.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate aligned `(box, label, score)` triples.
    pub fn iter(&self) -> impl Iterator<Item = (&RawBox, &DetectorLabel, f64)> + '_ {
        self.boxes
            .iter()
            .zip(self.labels.iter())
            .zip(self.scores.iter())
            .map(|((b, l), s)| (b, l, *s))
    }
}

/// Category object detector (clothing, jewelry).
#[async_trait]
pub trait ObjectDetector: Send + Sync {
    /// Run detection on an image.
    async fn detect(&self, image: &RgbImage) -> MediaResult<RawDetections>;

    /// Minimum score for a detection to be kept.
    fn confidence_threshold(&self) -> f64;

    /// Human-readable name for a label.
    fn label_name(&self, label: &DetectorLabel) -> String;

    /// Provider name for logging.
    fn name(&self) -> &'static str;
}

/// Person boxes and their confidences, person class only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersonDetections {
    pub boxes: Vec<BoundingBox>,
    pub confidences: Vec<f64>,
}

/// Person detector restricted to the person class.
#[async_trait]
pub trait PersonDetector: Send + Sync {
    async fn detect_people(&self, image: &RgbImage) -> MediaResult<PersonDetections>;

    /// Provider name for logging.
    fn name(&self) -> &'static str;
}
