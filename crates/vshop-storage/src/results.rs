//! Persisted job results.

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use vshop_models::{results_file_in, JobResult, Product, VideoJob};

use crate::error::{StorageError, StorageResult};

/// Reads and writes `detection_results.json` for a job.
///
/// A job's results are written exactly once, when processing finishes.
/// Lookups snap the playback time to the sampling interval, so the store
/// must be configured with the same interval the pipeline sampled at.
#[derive(Debug, Clone)]
pub struct ResultStore {
    interval_secs: f64,
}

impl Default for ResultStore {
    fn default() -> Self {
        Self::new(5.0)
    }
}

impl ResultStore {
    pub fn new(interval_secs: f64) -> Self {
        Self { interval_secs }
    }

    /// Write the whole result map, replacing any existing file.
    ///
    /// The file is written next to its final location and renamed into
    /// place, so readers never observe a partial file.
    pub async fn save(&self, results_dir: &Path, result: &JobResult) -> StorageResult<PathBuf> {
        tokio::fs::create_dir_all(results_dir).await?;

        let path = results_file_in(results_dir);
        let tmp_path = path.with_extension("json.tmp");
        let body = serde_json::to_vec_pretty(result)?;

        tokio::fs::write(&tmp_path, &body)
            .await
            .map_err(|e| StorageError::write_failed(&tmp_path, e.to_string()))?;
        if let Err(e) = tokio::fs::rename(&tmp_path, &path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(StorageError::write_failed(&path, e.to_string()));
        }

        info!(
            path = %path.display(),
            timestamps = result.len(),
            "Saved detection results"
        );
        Ok(path)
    }

    /// Load a persisted result; `None` if the file does not exist.
    pub async fn load(&self, results_dir: &Path) -> StorageResult<Option<JobResult>> {
        let path = results_file_in(results_dir);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    /// Products visible near `query_time` for a job.
    ///
    /// Empty when the job has not completed, its results are missing or
    /// unreadable, or no stored timestamp lies within two intervals of the
    /// snapped query.
    pub async fn get(&self, job: &VideoJob, query_time: f64) -> Vec<Product> {
        if !job.is_completed() {
            return Vec::new();
        }

        let result = match self.load(&job.results_dir).await {
            Ok(Some(result)) => result,
            Ok(None) => {
                debug!(video_id = %job.id, "No results file for completed job");
                return Vec::new();
            }
            Err(e) => {
                warn!(video_id = %job.id, error = %e, "Failed to read results");
                return Vec::new();
            }
        };

        match result.nearest(query_time, self.interval_secs) {
            Some((timestamp, products)) => {
                debug!(
                    video_id = %job.id,
                    query_time,
                    timestamp,
                    products = products.len(),
                    "Resolved results lookup"
                );
                products.to_vec()
            }
            None => Vec::new(),
        }
    }
}
