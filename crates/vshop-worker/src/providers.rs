//! Detector and similarity-index implementations backed by the remote
//! inference services.

use async_trait::async_trait;
use image::RgbImage;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{info, warn};
use vshop_media::{
    encode_jpeg, DetectorLabel, MediaError, MediaResult, ObjectDetector, PersonDetections,
    PersonDetector, RawBox, RawDetections,
};
use vshop_ml_client::{
    DetectResponse, JewelryApiClient, JewelryApiConfig, JewelryPrediction, MlClient, MlError,
};
use vshop_models::{BoundingBox, Category};

use crate::error::{WorkerError, WorkerResult};
use crate::resolver::SimilarityIndex;

/// Default clothing detector score threshold.
pub const CLOTHING_CONFIDENCE: f64 = 0.4;

/// Default person detector score threshold.
pub const PERSON_CONFIDENCE: f64 = 0.7;

fn detector_error(e: MlError) -> MediaError {
    MediaError::detection_failed(e.to_string())
}

/// Clothing detector on the inference service.
///
/// The class id map is fetched from the service on first use and cached.
/// Until it loads, detection fails and the clothing category contributes
/// nothing for that frame.
pub struct RemoteClothingDetector {
    client: MlClient,
    id2label: OnceCell<HashMap<u32, String>>,
    threshold: f64,
}

impl RemoteClothingDetector {
    pub fn new(client: MlClient, threshold: f64) -> Self {
        Self {
            client,
            id2label: OnceCell::new(),
            threshold,
        }
    }

    /// Build the detector and try to load the label map right away.
    ///
    /// An unreachable label endpoint is logged; loading is retried on the
    /// next detection.
    pub async fn connect(client: MlClient, threshold: f64) -> Self {
        let detector = Self::new(client, threshold);
        match detector.labels().await {
            Ok(labels) => info!(labels = labels.len(), "Loaded clothing label map"),
            Err(e) => warn!(error = %e, "Clothing label map unavailable, will retry on first detection"),
        }
        detector
    }

    pub fn with_labels(client: MlClient, id2label: HashMap<u32, String>, threshold: f64) -> Self {
        Self {
            client,
            id2label: OnceCell::new_with(Some(id2label)),
            threshold,
        }
    }

    async fn labels(&self) -> Result<&HashMap<u32, String>, MlError> {
        self.id2label
            .get_or_try_init(|| async {
                Ok::<_, MlError>(self.client.clothing_labels().await?.into_id_map())
            })
            .await
    }
}

/// Convert the service's corner-box arrays.
fn raw_from_response(response: DetectResponse) -> RawDetections {
    RawDetections {
        boxes: response
            .boxes
            .into_iter()
            .map(|[x1, y1, x2, y2]| RawBox::Corners { x1, y1, x2, y2 })
            .collect(),
        labels: response.labels.into_iter().map(DetectorLabel::Id).collect(),
        scores: response.scores,
    }
}

#[async_trait]
impl ObjectDetector for RemoteClothingDetector {
    async fn detect(&self, image: &RgbImage) -> MediaResult<RawDetections> {
        self.labels().await.map_err(detector_error)?;
        let jpeg = encode_jpeg(image)?;
        let response = self
            .client
            .detect_clothing(&jpeg, self.threshold)
            .await
            .map_err(detector_error)?;
        Ok(raw_from_response(response))
    }

    fn confidence_threshold(&self) -> f64 {
        self.threshold
    }

    fn label_name(&self, label: &DetectorLabel) -> String {
        match label {
            DetectorLabel::Id(id) => self
                .id2label
                .get()
                .and_then(|labels| labels.get(id))
                .cloned()
                .unwrap_or_else(|| id.to_string()),
            DetectorLabel::Name(name) => name.clone(),
        }
    }

    fn name(&self) -> &'static str {
        "remote-clothing"
    }
}

/// Person detector on the inference service.
pub struct RemotePersonDetector {
    client: MlClient,
    threshold: f64,
}

impl RemotePersonDetector {
    pub fn new(client: MlClient, threshold: f64) -> Self {
        Self { client, threshold }
    }
}

#[async_trait]
impl PersonDetector for RemotePersonDetector {
    async fn detect_people(&self, image: &RgbImage) -> MediaResult<PersonDetections> {
        let jpeg = encode_jpeg(image)?;
        let people = self
            .client
            .detect_person(&jpeg, self.threshold)
            .await
            .map_err(detector_error)?;

        let mut detections = PersonDetections::default();
        for person in people {
            let [x1, y1, x2, y2] = person.bbox;
            detections.boxes.push(BoundingBox::new(x1, y1, x2, y2));
            detections.confidences.push(person.score);
        }
        Ok(detections)
    }

    fn name(&self) -> &'static str {
        "remote-person"
    }
}

/// Jewelry detector on the hosted inference API.
pub struct HostedJewelryDetector {
    client: JewelryApiClient,
}

impl HostedJewelryDetector {
    pub fn new(client: JewelryApiClient) -> Self {
        Self { client }
    }
}

/// Convert center-based predictions.
fn raw_from_predictions(predictions: Vec<JewelryPrediction>) -> RawDetections {
    let mut raw = RawDetections::default();
    for p in predictions {
        raw.boxes.push(RawBox::Center {
            cx: p.x,
            cy: p.y,
            width: p.width,
            height: p.height,
        });
        raw.labels.push(DetectorLabel::Name(p.class));
        raw.scores.push(p.confidence);
    }
    raw
}

#[async_trait]
impl ObjectDetector for HostedJewelryDetector {
    async fn detect(&self, image: &RgbImage) -> MediaResult<RawDetections> {
        let jpeg = encode_jpeg(image)?;
        let predictions = self.client.detect(&jpeg).await.map_err(detector_error)?;
        Ok(raw_from_predictions(predictions))
    }

    fn confidence_threshold(&self) -> f64 {
        self.client.config().confidence
    }

    fn label_name(&self, label: &DetectorLabel) -> String {
        label.to_string()
    }

    fn name(&self) -> &'static str {
        "hosted-jewelry"
    }
}

/// Detector that never finds anything; stands in for an unconfigured one.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDetector;

#[async_trait]
impl ObjectDetector for NullDetector {
    async fn detect(&self, _image: &RgbImage) -> MediaResult<RawDetections> {
        Ok(RawDetections::default())
    }

    fn confidence_threshold(&self) -> f64 {
        1.0
    }

    fn label_name(&self, label: &DetectorLabel) -> String {
        label.to_string()
    }

    fn name(&self) -> &'static str {
        "null"
    }
}

/// One category's similarity index on the inference service.
pub struct RemoteSimilarityIndex {
    client: MlClient,
    category: Category,
}

impl RemoteSimilarityIndex {
    pub fn new(client: MlClient, category: Category) -> Self {
        Self { client, category }
    }
}

#[async_trait]
impl SimilarityIndex for RemoteSimilarityIndex {
    async fn search(&self, query_path: &Path, top_k: usize) -> WorkerResult<Vec<String>> {
        let query = query_path.to_str().ok_or_else(|| {
            WorkerError::search_failed(format!("non UTF-8 path: {}", query_path.display()))
        })?;
        Ok(self.client.search(self.category, query, top_k).await?)
    }

    fn name(&self) -> &'static str {
        "remote-index"
    }
}

/// Detection and search capabilities, built once at startup.
#[derive(Clone)]
pub struct Capabilities {
    pub person: Arc<dyn PersonDetector>,
    pub clothing: Arc<dyn ObjectDetector>,
    pub jewelry: Arc<dyn ObjectDetector>,
    pub indices: Vec<(Category, Arc<dyn SimilarityIndex>)>,
}

impl Capabilities {
    /// Connect to the inference services configured in the environment.
    ///
    /// Without a jewelry API key the jewelry detector is disabled. An
    /// unreachable inference service does not prevent startup.
    pub async fn from_env() -> WorkerResult<Self> {
        let client = MlClient::from_env()?;
        if !client.health_check().await? {
            warn!("Inference service is not healthy yet");
        }

        let person_threshold = std::env::var("PERSON_CONFIDENCE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(PERSON_CONFIDENCE);
        let clothing_threshold = std::env::var("CLOTHING_CONFIDENCE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(CLOTHING_CONFIDENCE);

        let jewelry_client = JewelryApiClient::new(JewelryApiConfig::from_env());
        let jewelry: Arc<dyn ObjectDetector> = match jewelry_client {
            Ok(jewelry_client) => Arc::new(HostedJewelryDetector::new(jewelry_client)),
            Err(MlError::NotConfigured(reason)) => {
                warn!(reason = %reason, "Jewelry detection disabled");
                Arc::new(NullDetector)
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            person: Arc::new(RemotePersonDetector::new(client.clone(), person_threshold)),
            clothing: Arc::new(
                RemoteClothingDetector::connect(client.clone(), clothing_threshold).await,
            ),
            jewelry,
            indices: Category::ALL
                .iter()
                .map(|&category| {
                    let index: Arc<dyn SimilarityIndex> =
                        Arc::new(RemoteSimilarityIndex::new(client.clone(), category));
                    (category, index)
                })
                .collect(),
        })
    }
}
