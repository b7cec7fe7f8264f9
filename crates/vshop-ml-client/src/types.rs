//! Request and response bodies for the detection and search services.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Detection request sent to the inference service.
#[derive(Debug, Clone, Serialize)]
pub struct DetectRequest {
    /// Base64-encoded JPEG
    pub image_b64: String,
    /// Post-processing score threshold
    pub threshold: f64,
}

/// Parallel arrays returned by the inference service.
///
/// Boxes are `[x1, y1, x2, y2]` in the pixel coordinates of the submitted
/// image; labels are class ids of the model's own taxonomy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectResponse {
    #[serde(default)]
    pub boxes: Vec<[f64; 4]>,
    #[serde(default)]
    pub labels: Vec<u32>,
    #[serde(default)]
    pub scores: Vec<f64>,
}

/// Class id to name mapping of a detection model.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LabelMapResponse {
    pub id2label: HashMap<String, String>,
}

impl LabelMapResponse {
    /// Convert string keys to numeric ids, dropping malformed entries.
    pub fn into_id_map(self) -> HashMap<u32, String> {
        self.id2label
            .into_iter()
            .filter_map(|(k, v)| k.parse().ok().map(|id| (id, v)))
            .collect()
    }
}

/// A single person box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PersonBox {
    pub bbox: [f64; 4],
    pub score: f64,
}

/// Similarity search request.
#[derive(Debug, Clone, Serialize)]
pub struct SearchRequest {
    /// Path of the query image, readable by the search service
    pub query_path: String,
    pub top_k: usize,
}

/// Ranked catalog image paths, best match first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<String>,
}

/// Health check response.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// One prediction from the hosted jewelry detector (center-based box).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JewelryPrediction {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub class: String,
    pub confidence: f64,
}

/// Hosted jewelry detector response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JewelryResponse {
    #[serde(default)]
    pub predictions: Vec<JewelryPrediction>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_map_conversion() {
        let map: LabelMapResponse = serde_json::from_str(
            r#"{"id2label": {"0": "shirt", "1": "pants", "x": "bogus"}}"#,
        )
        .unwrap();
        let ids = map.into_id_map();
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[&1], "pants");
    }

    #[test]
    fn test_jewelry_response_without_predictions() {
        let resp: JewelryResponse = serde_json::from_str(r#"{"time": 0.1}"#).unwrap();
        assert!(resp.predictions.is_empty());
    }
}
