//! Inference service HTTP client.
//!
//! The inference service hosts the clothing detector, the person detector
//! and the per-category similarity indices.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::Client;
use tracing::{debug, warn};
use vshop_models::Category;

use crate::error::{MlError, MlResult};
use crate::types::{
    DetectRequest, DetectResponse, HealthResponse, LabelMapResponse, PersonBox, SearchRequest,
    SearchResponse,
};

/// COCO class id of "person" in the person detector's taxonomy.
pub const PERSON_LABEL_ID: u32 = 1;

/// Configuration for the inference client.
#[derive(Debug, Clone)]
pub struct MlClientConfig {
    /// Base URL of the inference service
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for MlClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8001".to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

impl MlClientConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("ML_SERVICE_URL")
                .unwrap_or_else(|_| "http://localhost:8001".to_string()),
            timeout: Duration::from_secs(
                std::env::var("ML_SERVICE_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
            ),
        }
    }
}

/// Client for the inference service.
#[derive(Clone)]
pub struct MlClient {
    http: Client,
    config: MlClientConfig,
}

impl MlClient {
    /// Create a new client.
    pub fn new(config: MlClientConfig) -> MlResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(MlError::Network)?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> MlResult<Self> {
        Self::new(MlClientConfig::from_env())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Check if the service is healthy.
    pub async fn health_check(&self) -> MlResult<bool> {
        let url = self.url("/health");

        match self.http.get(&url).send().await {
            Ok(response) if response.status().is_success() => {
                let health: HealthResponse = response.json().await?;
                Ok(health.status == "healthy" || health.status == "ok")
            }
            Ok(response) => {
                warn!("Inference service health check failed: {}", response.status());
                Ok(false)
            }
            Err(e) => {
                warn!("Inference service health check error: {}", e);
                Ok(false)
            }
        }
    }

    /// Fetch the clothing detector's class id mapping.
    pub async fn clothing_labels(&self) -> MlResult<LabelMapResponse> {
        let url = self.url("/labels/clothing");
        let response = self.http.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(MlError::from_response("clothing label service", response).await);
        }
        Ok(response.json().await?)
    }

    /// Run the clothing detector on a JPEG image.
    pub async fn detect_clothing(&self, jpeg: &[u8], threshold: f64) -> MlResult<DetectResponse> {
        self.detect("/detect/clothing", jpeg, threshold).await
    }

    /// Run the person detector on a JPEG image, keeping only person boxes.
    pub async fn detect_person(&self, jpeg: &[u8], threshold: f64) -> MlResult<Vec<PersonBox>> {
        let response = self.detect("/detect/person", jpeg, threshold).await?;
        Ok(response
            .boxes
            .iter()
            .zip(response.labels.iter())
            .zip(response.scores.iter())
            .filter(|((_, label), score)| **label == PERSON_LABEL_ID && **score >= threshold)
            .map(|((bbox, _), score)| PersonBox {
                bbox: *bbox,
                score: *score,
            })
            .collect())
    }

    async fn detect(&self, path: &str, jpeg: &[u8], threshold: f64) -> MlResult<DetectResponse> {
        let url = self.url(path);
        let request = DetectRequest {
            image_b64: BASE64.encode(jpeg),
            threshold,
        };

        debug!(url = %url, bytes = jpeg.len(), "Sending detection request");

        let response = self.http.post(&url).json(&request).send().await?;
        if !response.status().is_success() {
            return Err(MlError::from_response("detection service", response).await);
        }

        let body: DetectResponse = response.json().await?;
        if body.boxes.len() != body.labels.len() || body.labels.len() != body.scores.len() {
            warn!(
                boxes = body.boxes.len(),
                labels = body.labels.len(),
                scores = body.scores.len(),
                "Detection arrays differ in length"
            );
        }
        Ok(body)
    }

    /// Query a category's similarity index with an image path.
    pub async fn search(
        &self,
        category: Category,
        query_path: &str,
        top_k: usize,
    ) -> MlResult<Vec<String>> {
        let url = self.url(&format!("/search/{}", category.as_str()));
        let request = SearchRequest {
            query_path: query_path.to_string(),
            top_k,
        };

        let response = self.http.post(&url).json(&request).send().await?;
        if !response.status().is_success() {
            return Err(MlError::from_response("search service", response).await);
        }

        let body: SearchResponse = response.json().await?;
        Ok(body.results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> MlClient {
        MlClient::new(MlClientConfig {
            base_url: server.uri(),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[test]
    fn test_config_defaults() {
        let config = MlClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:8001");
        assert_eq!(config.timeout, Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_detect_clothing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/detect/clothing"))
            .and(body_partial_json(json!({"threshold": 0.4})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "boxes": [[1.0, 2.0, 30.0, 40.0]],
                "labels": [3],
                "scores": [0.87]
            })))
            .mount(&server)
            .await;

        let resp = client_for(&server)
            .await
            .detect_clothing(&[0xFF, 0xD8], 0.4)
            .await
            .unwrap();
        assert_eq!(resp.labels, vec![3]);
        assert_eq!(resp.boxes[0], [1.0, 2.0, 30.0, 40.0]);
    }

    #[tokio::test]
    async fn test_detect_person_filters_other_classes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/detect/person"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "boxes": [[0.0, 0.0, 10.0, 10.0], [5.0, 5.0, 50.0, 90.0], [1.0, 1.0, 2.0, 2.0]],
                "labels": [3, 1, 1],
                "scores": [0.99, 0.91, 0.3]
            })))
            .mount(&server)
            .await;

        let people = client_for(&server)
            .await
            .detect_person(&[0xFF, 0xD8], 0.7)
            .await
            .unwrap();
        assert_eq!(people.len(), 1);
        assert_eq!(people[0].bbox, [5.0, 5.0, 50.0, 90.0]);
    }

    #[tokio::test]
    async fn test_search_routes_by_category() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search/jewelry"))
            .and(body_partial_json(json!({"top_k": 1})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": ["catalog/jewelry/ring_12.jpg"]
            })))
            .mount(&server)
            .await;

        let results = client_for(&server)
            .await
            .search(Category::Jewelry, "/tmp/crop.jpg", 1)
            .await
            .unwrap();
        assert_eq!(results, vec!["catalog/jewelry/ring_12.jpg".to_string()]);
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search/clothing"))
            .respond_with(ResponseTemplate::new(503).set_body_string("index not loaded"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .await
            .search(Category::Clothing, "/tmp/crop.jpg", 1)
            .await
            .unwrap_err();
        assert!(matches!(err, MlError::RequestFailed(msg) if msg.contains("503")));
    }

    #[tokio::test]
    async fn test_health_check() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
            .mount(&server)
            .await;

        assert!(client_for(&server).await.health_check().await.unwrap());
    }

    #[tokio::test]
    async fn test_clothing_labels() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/labels/clothing"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id2label": {"0": "shirt", "1": "dress"}
            })))
            .mount(&server)
            .await;

        let labels = client_for(&server).await.clothing_labels().await.unwrap();
        assert_eq!(labels.into_id_map()[&1], "dress");
    }
}
