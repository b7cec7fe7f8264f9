//! Turns detections into deduplicated catalog products.

use async_trait::async_trait;
use image::RgbImage;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;
use vshop_media::crop;
use vshop_models::{title_case, Category, Detection, Product, StockStatus};
use vshop_storage::CropSink;

use crate::error::WorkerResult;

/// Nearest-neighbour search over one category's catalog images.
#[async_trait]
pub trait SimilarityIndex: Send + Sync {
    /// Catalog image paths ranked by similarity to the query image.
    async fn search(&self, query_path: &Path, top_k: usize) -> WorkerResult<Vec<String>>;

    /// Provider name for logging.
    fn name(&self) -> &'static str;
}

/// Product resolution settings.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Prefix of generated product links
    pub product_url_base: String,
    /// Number of matches requested per detection; only the best is used
    pub top_k: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            product_url_base: "https://example.com/product".to_string(),
            top_k: 1,
        }
    }
}

impl ResolverConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            product_url_base: std::env::var("PRODUCT_URL_BASE")
                .unwrap_or_else(|_| "https://example.com/product".to_string()),
            top_k: 1,
        }
    }
}

/// Resolves detections to products through per-category similarity indices.
#[derive(Clone, Default)]
pub struct ProductResolver {
    indices: HashMap<Category, Arc<dyn SimilarityIndex>>,
    config: ResolverConfig,
}

impl ProductResolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self {
            indices: HashMap::new(),
            config,
        }
    }

    /// Register the index that serves a category.
    pub fn with_index(mut self, category: Category, index: Arc<dyn SimilarityIndex>) -> Self {
        self.indices.insert(category, index);
        self
    }

    /// Resolve one frame's detections.
    ///
    /// Each detection is cropped from the full frame, saved through `sink`,
    /// and matched against its own category's index only. Matches sharing an
    /// `image_url` collapse into one product carrying the highest confidence.
    /// The result is sorted by confidence, highest first. Detections that
    /// cannot be cropped, saved or searched are skipped.
    pub async fn resolve(
        &self,
        detections: &[Detection],
        frame: &RgbImage,
        sink: &dyn CropSink,
        timestamp: f64,
    ) -> Vec<Product> {
        let mut products: Vec<Product> = Vec::new();
        let mut by_url: HashMap<String, usize> = HashMap::new();

        for (idx, detection) in detections.iter().enumerate() {
            let Some(product) = self.resolve_one(idx, detection, frame, sink, timestamp).await
            else {
                continue;
            };

            match by_url.get(&product.image_url) {
                Some(&existing) => {
                    if product.confidence > products[existing].confidence {
                        products[existing] = product;
                    }
                }
                None => {
                    by_url.insert(product.image_url.clone(), products.len());
                    products.push(product);
                }
            }
        }

        products.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        products
    }

    async fn resolve_one(
        &self,
        idx: usize,
        detection: &Detection,
        frame: &RgbImage,
        sink: &dyn CropSink,
        timestamp: f64,
    ) -> Option<Product> {
        let Some(index) = self.indices.get(&detection.category) else {
            debug!(category = %detection.category, "No similarity index for category");
            return None;
        };

        let Some(rect) = detection.bbox.to_pixel_rect(frame.width(), frame.height()) else {
            debug!(label = %detection.label, "Detection box has no pixels inside the frame");
            return None;
        };

        let crop_path = match sink
            .save_crop(&crop(frame, rect), detection.category, timestamp, idx)
            .await
        {
            Ok(path) => path,
            Err(e) => {
                warn!(label = %detection.label, error = %e, "Failed to save crop");
                return None;
            }
        };

        let matches = match index.search(&crop_path, self.config.top_k).await {
            Ok(matches) => matches,
            Err(e) => {
                warn!(
                    index = index.name(),
                    category = %detection.category,
                    error = %e,
                    "Similarity search failed"
                );
                return None;
            }
        };

        let image_url = matches.into_iter().next()?;
        Some(self.build_product(detection, image_url))
    }

    fn build_product(&self, detection: &Detection, image_url: String) -> Product {
        Product {
            object_type: detection.label.clone(),
            category: detection.category,
            image_url,
            title: title_case(&detection.label),
            stock: StockStatus::InStock,
            direct_url: format!(
                "{}/{}",
                self.config.product_url_base.trim_end_matches('/'),
                Uuid::new_v4()
            ),
            confidence: detection.confidence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WorkerError;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use vshop_models::BoundingBox;
    use vshop_storage::{StorageError, StorageResult};

    /// Answers queries in order from a fixed script.
    struct ScriptedIndex {
        name: &'static str,
        answers: Mutex<Vec<WorkerResult<Vec<String>>>>,
        queries: Mutex<Vec<PathBuf>>,
    }

    impl ScriptedIndex {
        fn new(name: &'static str, answers: Vec<WorkerResult<Vec<String>>>) -> Arc<Self> {
            Arc::new(Self {
                name,
                answers: Mutex::new(answers),
                queries: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl SimilarityIndex for ScriptedIndex {
        async fn search(&self, query_path: &Path, _top_k: usize) -> WorkerResult<Vec<String>> {
            self.queries.lock().unwrap().push(query_path.to_path_buf());
            let mut answers = self.answers.lock().unwrap();
            if answers.is_empty() {
                Ok(Vec::new())
            } else {
                answers.remove(0)
            }
        }

        fn name(&self) -> &'static str {
            self.name
        }
    }

    struct MemorySink {
        fail: bool,
    }

    #[async_trait]
    impl CropSink for MemorySink {
        async fn save_crop(
            &self,
            _crop: &RgbImage,
            category: Category,
            timestamp: f64,
            index: usize,
        ) -> StorageResult<PathBuf> {
            if self.fail {
                return Err(StorageError::write_failed("/crops", "disk full"));
            }
            Ok(PathBuf::from(format!("/crops/crop_{}_{:.1}s_{}.jpg", category, timestamp, index)))
        }
    }

    fn det(label: &str, confidence: f64, category: Category) -> Detection {
        Detection::new(label, confidence, BoundingBox::new(10.0, 10.0, 50.0, 50.0), category)
    }

    fn frame() -> RgbImage {
        RgbImage::new(100, 100)
    }

    #[tokio::test]
    async fn test_builds_product_fields() {
        let index = ScriptedIndex::new("clothing", vec![Ok(vec!["cat/shirt_1.jpg".into()])]);
        let resolver = ProductResolver::new(ResolverConfig::default())
            .with_index(Category::Clothing, index);

        let products = resolver
            .resolve(
                &[det("long sleeve", 0.8, Category::Clothing)],
                &frame(),
                &MemorySink { fail: false },
                5.0,
            )
            .await;

        assert_eq!(products.len(), 1);
        let p = &products[0];
        assert_eq!(p.object_type, "long sleeve");
        assert_eq!(p.title, "Long Sleeve");
        assert_eq!(p.image_url, "cat/shirt_1.jpg");
        assert_eq!(p.stock, StockStatus::InStock);
        assert!(p.direct_url.starts_with("https://example.com/product/"));
        assert_eq!(p.confidence, 0.8);
    }

    #[tokio::test]
    async fn test_duplicate_matches_keep_highest_confidence() {
        // Two detections resolve to the same catalog image
        let index = ScriptedIndex::new(
            "clothing",
            vec![Ok(vec!["X".into()]), Ok(vec!["X".into()])],
        );
        let resolver = ProductResolver::new(ResolverConfig::default())
            .with_index(Category::Clothing, index);

        let products = resolver
            .resolve(
                &[
                    det("shirt", 0.6, Category::Clothing),
                    det("top", 0.9, Category::Clothing),
                ],
                &frame(),
                &MemorySink { fail: false },
                0.0,
            )
            .await;

        assert_eq!(products.len(), 1);
        assert_eq!(products[0].confidence, 0.9);
        assert_eq!(products[0].object_type, "top");
    }

    #[tokio::test]
    async fn test_equal_confidence_keeps_first() {
        let index = ScriptedIndex::new(
            "clothing",
            vec![Ok(vec!["X".into()]), Ok(vec!["X".into()])],
        );
        let resolver = ProductResolver::new(ResolverConfig::default())
            .with_index(Category::Clothing, index);

        let products = resolver
            .resolve(
                &[
                    det("shirt", 0.7, Category::Clothing),
                    det("top", 0.7, Category::Clothing),
                ],
                &frame(),
                &MemorySink { fail: false },
                0.0,
            )
            .await;
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].object_type, "shirt");
    }

    #[tokio::test]
    async fn test_sorted_by_confidence() {
        let index = ScriptedIndex::new(
            "clothing",
            vec![
                Ok(vec!["A".into()]),
                Ok(vec!["B".into()]),
                Ok(vec!["C".into()]),
            ],
        );
        let resolver = ProductResolver::new(ResolverConfig::default())
            .with_index(Category::Clothing, index);

        let products = resolver
            .resolve(
                &[
                    det("a", 0.5, Category::Clothing),
                    det("b", 0.9, Category::Clothing),
                    det("c", 0.7, Category::Clothing),
                ],
                &frame(),
                &MemorySink { fail: false },
                0.0,
            )
            .await;
        let urls: Vec<&str> = products.iter().map(|p| p.image_url.as_str()).collect();
        assert_eq!(urls, vec!["B", "C", "A"]);
    }

    #[tokio::test]
    async fn test_categories_use_their_own_index() {
        let clothing = ScriptedIndex::new("clothing", vec![Ok(vec!["shirt.jpg".into()])]);
        let jewelry = ScriptedIndex::new("jewelry", vec![Ok(vec!["ring.jpg".into()])]);
        let resolver = ProductResolver::new(ResolverConfig::default())
            .with_index(Category::Clothing, clothing.clone())
            .with_index(Category::Jewelry, jewelry.clone());

        let products = resolver
            .resolve(
                &[
                    det("ring", 0.8, Category::Jewelry),
                    det("shirt", 0.6, Category::Clothing),
                ],
                &frame(),
                &MemorySink { fail: false },
                5.0,
            )
            .await;

        assert_eq!(products.len(), 2);
        let jewelry_queries = jewelry.queries.lock().unwrap();
        assert_eq!(jewelry_queries.len(), 1);
        assert!(jewelry_queries[0].to_string_lossy().contains("crop_jewelry_5.0s_0"));
        let clothing_queries = clothing.queries.lock().unwrap();
        assert_eq!(clothing_queries.len(), 1);
        assert!(clothing_queries[0].to_string_lossy().contains("crop_clothing_5.0s_1"));
    }

    #[tokio::test]
    async fn test_failures_skip_only_that_detection() {
        let index = ScriptedIndex::new(
            "clothing",
            vec![
                Err(WorkerError::search_failed("timeout")),
                Ok(vec![]),
                Ok(vec!["ok.jpg".into()]),
            ],
        );
        let resolver = ProductResolver::new(ResolverConfig::default())
            .with_index(Category::Clothing, index);

        let products = resolver
            .resolve(
                &[
                    det("a", 0.9, Category::Clothing),
                    det("b", 0.8, Category::Clothing),
                    det("c", 0.7, Category::Clothing),
                    det("ring", 0.9, Category::Jewelry),
                ],
                &frame(),
                &MemorySink { fail: false },
                0.0,
            )
            .await;
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].image_url, "ok.jpg");
    }

    #[tokio::test]
    async fn test_crop_outside_frame_and_sink_failure() {
        let index = ScriptedIndex::new("clothing", vec![Ok(vec!["x.jpg".into()])]);
        let resolver = ProductResolver::new(ResolverConfig::default())
            .with_index(Category::Clothing, index.clone());

        let outside = Detection::new(
            "shirt",
            0.9,
            BoundingBox::new(500.0, 500.0, 600.0, 600.0),
            Category::Clothing,
        );
        let products = resolver
            .resolve(&[outside], &frame(), &MemorySink { fail: false }, 0.0)
            .await;
        assert!(products.is_empty());

        let products = resolver
            .resolve(
                &[det("shirt", 0.9, Category::Clothing)],
                &frame(),
                &MemorySink { fail: true },
                0.0,
            )
            .await;
        assert!(products.is_empty());
        assert!(index.queries.lock().unwrap().is_empty());
    }
}
