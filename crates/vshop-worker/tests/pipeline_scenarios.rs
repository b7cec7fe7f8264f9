//! End-to-end pipeline scenarios over synthetic videos and fake capabilities.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use image::{Rgb, RgbImage};
use vshop_media::{
    DetectionFusion, DetectorLabel, FrameSelector, FrameSource, FrameSourceOpener, FusionConfig,
    InMemoryFrameSource, MediaError, MediaResult, ObjectDetector, PersonDetections,
    PersonDetector, PersonGate, PersonGateConfig, RawBox, RawDetections, SelectorConfig,
};
use vshop_models::{BoundingBox, Category, JobResult, JobStatus, Product, StockStatus, VideoId};
use vshop_storage::{FrameArtifacts, ResultStore};
use vshop_worker::providers::NullDetector;
use vshop_worker::{
    FramePipeline, JobLogger, JobRegistry, PipelineConfig, ProductResolver, ResolverConfig,
    SimilarityIndex, VideoProcessor, WorkerResult,
};

const WIDTH: u32 = 64;
const HEIGHT: u32 = 48;

fn sharp_frame() -> RgbImage {
    RgbImage::from_fn(WIDTH, HEIGHT, |x, y| {
        if (x + y) % 2 == 0 {
            Rgb([20, 20, 20])
        } else {
            Rgb([235, 235, 235])
        }
    })
}

struct People(Vec<BoundingBox>);

#[async_trait]
impl PersonDetector for People {
    async fn detect_people(&self, _image: &RgbImage) -> MediaResult<PersonDetections> {
        Ok(PersonDetections {
            boxes: self.0.clone(),
            confidences: vec![0.9; self.0.len()],
        })
    }

    fn name(&self) -> &'static str {
        "people"
    }
}

/// Clothing detector answering every image with the same detections.
struct Clothing(Vec<(RawBox, f64)>);

#[async_trait]
impl ObjectDetector for Clothing {
    async fn detect(&self, _image: &RgbImage) -> MediaResult<RawDetections> {
        let mut raw = RawDetections::default();
        for (raw_box, score) in &self.0 {
            raw.boxes.push(*raw_box);
            raw.labels.push(DetectorLabel::Name("t-shirt".to_string()));
            raw.scores.push(*score);
        }
        Ok(raw)
    }

    fn confidence_threshold(&self) -> f64 {
        0.4
    }

    fn label_name(&self, label: &DetectorLabel) -> String {
        label.to_string()
    }

    fn name(&self) -> &'static str {
        "clothing"
    }
}

/// Index that matches every query to one catalog image.
struct OneMatch(&'static str);

#[async_trait]
impl SimilarityIndex for OneMatch {
    async fn search(&self, query_path: &Path, _top_k: usize) -> WorkerResult<Vec<String>> {
        assert!(query_path.exists(), "crop must be on disk while searched");
        Ok(vec![self.0.to_string()])
    }

    fn name(&self) -> &'static str {
        "one-match"
    }
}

fn whole_frame_person() -> Vec<BoundingBox> {
    vec![BoundingBox::new(0.0, 0.0, WIDTH as f64, HEIGHT as f64)]
}

fn shirt(score: f64) -> (RawBox, f64) {
    (
        RawBox::Corners {
            x1: 10.0,
            y1: 10.0,
            x2: 30.0,
            y2: 40.0,
        },
        score,
    )
}

fn pipeline(people: Vec<BoundingBox>, clothing: Vec<(RawBox, f64)>) -> FramePipeline {
    FramePipeline::new(
        FrameSelector::default(),
        PersonGate::new(Arc::new(People(people)), PersonGateConfig::default()),
        DetectionFusion::new(
            Arc::new(Clothing(clothing)),
            Arc::new(NullDetector),
            FusionConfig::default(),
        ),
        ProductResolver::new(ResolverConfig::default())
            .with_index(Category::Clothing, Arc::new(OneMatch("catalog/clothing/tee_7.jpg"))),
        PipelineConfig {
            interval_secs: 5.0,
            selector: SelectorConfig {
                search_radius_secs: 1.0,
            },
            save_frames: true,
        },
    )
}

/// 10 fps video of 60 frames where only frame 50 decodes.
fn only_frame_fifty() -> InMemoryFrameSource {
    let mut frames: Vec<Option<RgbImage>> = vec![None; 60];
    frames[50] = Some(sharp_frame());
    InMemoryFrameSource::new(10.0, frames)
}

#[tokio::test]
async fn scenario_single_product_at_five_seconds() {
    let dir = tempfile::tempdir().unwrap();
    let artifacts = FrameArtifacts::create(dir.path()).await.unwrap();
    let logger = JobLogger::new(&VideoId::from("a"), "test");

    let outcome = pipeline(whole_frame_person(), vec![shirt(0.8)])
        .run(&only_frame_fifty(), &artifacts, &logger)
        .await
        .unwrap();

    assert_eq!(outcome.stats.sampled, 2);
    assert_eq!(outcome.stats.skipped_unreadable, 1);
    assert_eq!(outcome.stats.processed, 1);
    assert_eq!(outcome.result.len(), 1);

    let products = outcome.result.get(5.0).unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].category, Category::Clothing);
    assert_eq!(products[0].object_type, "t-shirt");
    assert_eq!(products[0].title, "T-Shirt");
    assert_eq!(products[0].image_url, "catalog/clothing/tee_7.jpg");
    assert!(dir.path().join("frames/frame_5.0s.jpg").exists());
}

#[tokio::test]
async fn scenario_frame_without_person_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let artifacts = FrameArtifacts::create(dir.path()).await.unwrap();
    let logger = JobLogger::new(&VideoId::from("b"), "test");
    let source = InMemoryFrameSource::from_frames(10.0, vec![sharp_frame(); 10]);

    let outcome = pipeline(Vec::new(), vec![shirt(0.8)])
        .run(&source, &artifacts, &logger)
        .await
        .unwrap();

    assert_eq!(outcome.stats.sampled, 1);
    assert_eq!(outcome.stats.skipped_no_person, 1);
    assert!(outcome.result.is_empty());
    assert!(!dir.path().join("frames/frame_0.0s.jpg").exists());
}

#[tokio::test]
async fn scenario_same_match_keeps_highest_confidence() {
    let dir = tempfile::tempdir().unwrap();
    let artifacts = FrameArtifacts::create(dir.path()).await.unwrap();
    let logger = JobLogger::new(&VideoId::from("c"), "test");
    let source = InMemoryFrameSource::from_frames(10.0, vec![sharp_frame(); 10]);

    let outcome = pipeline(whole_frame_person(), vec![shirt(0.6), shirt(0.9)])
        .run(&source, &artifacts, &logger)
        .await
        .unwrap();

    let products = outcome.result.get(0.0).unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].confidence, 0.9);
}

fn product(url: &str) -> Product {
    Product {
        object_type: "ring".to_string(),
        category: Category::Jewelry,
        image_url: url.to_string(),
        title: "Ring".to_string(),
        stock: StockStatus::InStock,
        direct_url: "https://example.com/product/1".to_string(),
        confidence: 0.7,
    }
}

#[tokio::test]
async fn scenario_lookup_snaps_to_nearest_timestamp() {
    let dir = tempfile::tempdir().unwrap();
    let registry = JobRegistry::new(dir.path());
    let mut job = registry.new_job(VideoId::from("d"), "clip.mp4");
    job.complete();

    let mut result = JobResult::new();
    result.put(5.0, vec![product("five.jpg")]);
    result.put(10.0, vec![product("ten.jpg")]);

    let store = ResultStore::new(5.0);
    store.save(&job.results_dir, &result).await.unwrap();

    let products = store.get(&job, 12.0).await;
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].image_url, "ten.jpg");
}

/// Opener serving one prepared source, or failing when there is none.
struct FixedOpener(Option<InMemoryFrameSource>);

#[async_trait]
impl FrameSourceOpener for FixedOpener {
    async fn open(&self, path: &Path) -> MediaResult<Box<dyn FrameSource>> {
        match &self.0 {
            Some(source) => Ok(Box::new(source.clone())),
            None => Err(MediaError::FileNotFound(path.to_path_buf())),
        }
    }
}

async fn processor_with(
    uploads: &Path,
    opener: FixedOpener,
) -> (Arc<JobRegistry>, VideoProcessor, VideoId) {
    let registry = Arc::new(JobRegistry::new(uploads));
    let id = VideoId::from("job-1");
    registry.add(registry.new_job(id.clone(), "clip.mp4")).await;

    let processor = VideoProcessor::new(
        Arc::clone(&registry),
        Arc::new(pipeline(whole_frame_person(), vec![shirt(0.8)])),
        ResultStore::new(5.0),
        Arc::new(opener),
    )
    .with_thumbnails(false);

    (registry, processor, id)
}

#[tokio::test]
async fn processing_completes_and_persists_results() {
    let dir = tempfile::tempdir().unwrap();
    let (registry, processor, id) =
        processor_with(dir.path(), FixedOpener(Some(only_frame_fifty()))).await;

    let stats = processor.process_video(&id).await.unwrap();
    assert_eq!(stats.processed, 1);

    let job = registry.get(&id).await.unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert!(job.results_file().exists());

    let products = processor.store().get(&job, 6.0).await;
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].image_url, "catalog/clothing/tee_7.jpg");
}

#[tokio::test]
async fn unopenable_video_fails_without_results() {
    let dir = tempfile::tempdir().unwrap();
    let (registry, processor, id) = processor_with(dir.path(), FixedOpener(None)).await;

    assert!(processor.process_video(&id).await.is_err());

    let job = registry.get(&id).await.unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error_message.is_some());
    assert!(!job.results_file().exists());
    let recorded = std::fs::read_to_string(job.results_dir.join("error.txt")).unwrap();
    assert_eq!(Some(recorded), job.error_message);
}

#[tokio::test]
async fn processors_sharing_uploads_do_not_both_process() {
    let dir = tempfile::tempdir().unwrap();
    let (api_registry, api_processor, id) =
        processor_with(dir.path(), FixedOpener(Some(only_frame_fifty()))).await;
    let (_, worker_processor, _) =
        processor_with(dir.path(), FixedOpener(Some(only_frame_fifty()))).await;

    worker_processor.process_video(&id).await.unwrap();

    let err = api_processor.process_video(&id).await.unwrap_err();
    assert!(err.is_already_claimed());

    let job = api_registry.get(&id).await.unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    let products = api_processor.store().get(&job, 5.0).await;
    assert_eq!(products[0].image_url, "catalog/clothing/tee_7.jpg");
}

#[tokio::test]
async fn spawned_processing_updates_registry() {
    let dir = tempfile::tempdir().unwrap();
    let (registry, processor, id) =
        processor_with(dir.path(), FixedOpener(Some(only_frame_fifty()))).await;

    let processor = Arc::new(processor);
    processor.spawn(id.clone()).await.unwrap();

    assert!(registry.get(&id).await.unwrap().is_completed());
}
