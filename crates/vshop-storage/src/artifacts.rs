//! Frame and crop images written while a job runs.

use async_trait::async_trait;
use image::RgbImage;
use std::path::{Path, PathBuf};
use tracing::debug;
use vshop_media::encode_jpeg;
use vshop_models::Category;

use crate::error::{StorageError, StorageResult};

/// Destination for detection crops.
///
/// The returned path must stay readable by the similarity index for as
/// long as the query runs.
#[async_trait]
pub trait CropSink: Send + Sync {
    async fn save_crop(
        &self,
        crop: &RgbImage,
        category: Category,
        timestamp: f64,
        index: usize,
    ) -> StorageResult<PathBuf>;
}

/// Per-job artifact directories under the job's results directory:
/// `frames/` for analyzed frames and `frames/crops/` for detection crops.
#[derive(Debug, Clone)]
pub struct FrameArtifacts {
    frames_dir: PathBuf,
    crops_dir: PathBuf,
}

impl FrameArtifacts {
    /// Create the artifact directories.
    pub async fn create(results_dir: &Path) -> StorageResult<Self> {
        let frames_dir = results_dir.join("frames");
        let crops_dir = frames_dir.join("crops");
        tokio::fs::create_dir_all(&crops_dir).await?;
        Ok(Self {
            frames_dir,
            crops_dir,
        })
    }

    pub fn frames_dir(&self) -> &Path {
        &self.frames_dir
    }

    pub fn crops_dir(&self) -> &Path {
        &self.crops_dir
    }

    /// Save an analyzed frame as `frame_{t}s.jpg`.
    pub async fn save_frame(&self, frame: &RgbImage, timestamp: f64) -> StorageResult<PathBuf> {
        let path = self.frames_dir.join(frame_file_name(timestamp));
        write_jpeg(&path, frame).await?;
        Ok(path)
    }
}

#[async_trait]
impl CropSink for FrameArtifacts {
    async fn save_crop(
        &self,
        crop: &RgbImage,
        category: Category,
        timestamp: f64,
        index: usize,
    ) -> StorageResult<PathBuf> {
        let path = self
            .crops_dir
            .join(crop_file_name(category, timestamp, index));
        write_jpeg(&path, crop).await?;
        Ok(path)
    }
}

fn frame_file_name(timestamp: f64) -> String {
    format!("frame_{:.1}s.jpg", timestamp)
}

fn crop_file_name(category: Category, timestamp: f64, index: usize) -> String {
    format!("crop_{}_{:.1}s_{}.jpg", category, timestamp, index)
}

async fn write_jpeg(path: &Path, image: &RgbImage) -> StorageResult<()> {
    let bytes = encode_jpeg(image)?;
    tokio::fs::write(path, &bytes)
        .await
        .map_err(|e| StorageError::write_failed(path, e.to_string()))?;
    debug!(path = %path.display(), bytes = bytes.len(), "Wrote image artifact");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_names() {
        assert_eq!(frame_file_name(5.0), "frame_5.0s.jpg");
        assert_eq!(frame_file_name(3.3333), "frame_3.3s.jpg");
        assert_eq!(
            crop_file_name(Category::Clothing, 12.5, 2),
            "crop_clothing_12.5s_2.jpg"
        );
    }

    #[tokio::test]
    async fn test_artifacts_written() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = FrameArtifacts::create(dir.path()).await.unwrap();

        let frame = RgbImage::new(16, 16);
        let frame_path = artifacts.save_frame(&frame, 5.0).await.unwrap();
        assert!(frame_path.exists());
        assert!(frame_path.starts_with(dir.path().join("frames")));

        let crop_path = artifacts
            .save_crop(&frame, Category::Jewelry, 5.0, 0)
            .await
            .unwrap();
        assert!(crop_path.ends_with("frames/crops/crop_jewelry_5.0s_0.jpg"));
        assert!(crop_path.exists());
    }
}
