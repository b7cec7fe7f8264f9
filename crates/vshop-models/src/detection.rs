//! Detector output after fusion.

use serde::{Deserialize, Serialize};

use crate::category::Category;
use crate::geometry::BoundingBox;

/// A labelled box produced by one of the category detectors.
///
/// Box coordinates always refer to the full, uncropped frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Human-readable class label (e.g. "shirt", "necklace")
    pub label: String,
    /// Detector confidence in [0, 1]
    pub confidence: f64,
    /// Box in full-frame pixel coordinates
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
    /// Category of the detector that produced it
    pub category: Category,
}

impl Detection {
    pub fn new(
        label: impl Into<String>,
        confidence: f64,
        bbox: BoundingBox,
        category: Category,
    ) -> Self {
        Self {
            label: label.into(),
            confidence,
            bbox,
            category,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detection_serializes_box_field() {
        let det = Detection::new(
            "shirt",
            0.9,
            BoundingBox::new(1.0, 2.0, 3.0, 4.0),
            Category::Clothing,
        );
        let json = serde_json::to_value(&det).unwrap();
        assert_eq!(json["box"]["x2"], 3.0);
        assert_eq!(json["category"], "clothing");
    }
}
