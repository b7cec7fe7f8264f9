//! Client for the hosted jewelry detection API.
//!
//! The API takes a base64 JPEG as a form body and answers with center-based
//! boxes and string class names.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::debug;

use crate::error::{MlError, MlResult};
use crate::types::{JewelryPrediction, JewelryResponse};

/// Hosted jewelry detector settings.
#[derive(Debug, Clone)]
pub struct JewelryApiConfig {
    /// Base URL of the hosted inference API
    pub api_url: String,
    /// API key; the client cannot be built without one
    pub api_key: Option<String>,
    /// Model identifier, e.g. `jewelry-detection/1`
    pub model_id: String,
    /// Minimum prediction confidence in [0, 1]
    pub confidence: f64,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for JewelryApiConfig {
    fn default() -> Self {
        Self {
            api_url: "https://detect.roboflow.com".to_string(),
            api_key: None,
            model_id: "jewelry-detection/1".to_string(),
            confidence: 0.4,
            timeout: Duration::from_secs(30),
        }
    }
}

impl JewelryApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_url: std::env::var("JEWELRY_API_URL").unwrap_or(defaults.api_url),
            api_key: std::env::var("JEWELRY_API_KEY").ok().filter(|k| !k.is_empty()),
            model_id: std::env::var("JEWELRY_MODEL_ID").unwrap_or(defaults.model_id),
            confidence: std::env::var("JEWELRY_CONFIDENCE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.confidence),
            timeout: Duration::from_secs(
                std::env::var("JEWELRY_API_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        }
    }
}

/// Client for the hosted jewelry detector.
#[derive(Clone)]
pub struct JewelryApiClient {
    http: Client,
    config: JewelryApiConfig,
    api_key: String,
}

impl JewelryApiClient {
    pub fn new(config: JewelryApiConfig) -> MlResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| MlError::NotConfigured("JEWELRY_API_KEY is not set".to_string()))?;

        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(MlError::Network)?;

        Ok(Self {
            http,
            config,
            api_key,
        })
    }

    pub fn config(&self) -> &JewelryApiConfig {
        &self.config
    }

    /// Detect jewelry in a JPEG image.
    pub async fn detect(&self, jpeg: &[u8]) -> MlResult<Vec<JewelryPrediction>> {
        let url = format!(
            "{}/{}",
            self.config.api_url.trim_end_matches('/'),
            self.config.model_id
        );
        let confidence_pct = (self.config.confidence * 100.0).round().to_string();

        debug!(url = %url, bytes = jpeg.len(), "Sending jewelry detection request");

        let response = self
            .http
            .post(&url)
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("confidence", confidence_pct.as_str()),
            ])
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(BASE64.encode(jpeg))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(MlError::from_response("jewelry detection API", response).await);
        }

        let body: JewelryResponse = response.json().await?;
        Ok(body.predictions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> JewelryApiConfig {
        JewelryApiConfig {
            api_url: server.uri(),
            api_key: Some("secret".to_string()),
            model_id: "jewelry/2".to_string(),
            confidence: 0.4,
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_missing_key_is_rejected() {
        let result = JewelryApiClient::new(JewelryApiConfig::default());
        assert!(matches!(result, Err(MlError::NotConfigured(_))));
    }

    #[tokio::test]
    async fn test_detect_parses_predictions() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/jewelry/2"))
            .and(query_param("api_key", "secret"))
            .and(query_param("confidence", "40"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "predictions": [
                    {"x": 50.0, "y": 60.0, "width": 10.0, "height": 8.0,
                     "class": "necklace", "confidence": 0.81, "class_id": 2}
                ]
            })))
            .mount(&server)
            .await;

        let client = JewelryApiClient::new(config_for(&server)).unwrap();
        let preds = client.detect(&[0xFF, 0xD8]).await.unwrap();
        assert_eq!(preds.len(), 1);
        assert_eq!(preds[0].class, "necklace");
        assert_eq!(preds[0].x, 50.0);
    }

    #[tokio::test]
    async fn test_detect_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = JewelryApiClient::new(config_for(&server)).unwrap();
        assert!(client.detect(&[0xFF]).await.is_err());
    }
}
