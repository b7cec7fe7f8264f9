//! Video upload and listing handlers.

use std::path::Path as FsPath;

use axum::extract::{Multipart, Path, State};
use axum::Json;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};
use vshop_models::{JobStatus, VideoId, VideoJob};
use vshop_worker::ThumbnailSummary;

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// Multipart field carrying the video.
const FILE_FIELD: &str = "file";

/// Upload confirmation.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub video_id: VideoId,
    pub filename: String,
    pub status: JobStatus,
}

/// Thumbnail regeneration summary.
#[derive(Debug, Serialize)]
pub struct RegenerateThumbnailsResponse {
    pub status: &'static str,
    #[serde(flatten)]
    pub summary: ThumbnailSummary,
}

/// Accept a video upload and start processing it in the background.
pub async fn upload_video(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    while let Some(mut field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let is_video = field
            .content_type()
            .map(|ct| ct.starts_with("video/"))
            .unwrap_or(false);
        if !is_video {
            return Err(ApiError::bad_request("File must be a video"));
        }

        let filename = field
            .file_name()
            .and_then(safe_file_name)
            .ok_or_else(|| ApiError::bad_request("Missing or invalid file name"))?;

        let id = VideoId::new();
        let job = state.registry.new_job(id.clone(), &filename);
        let upload_dir = state.registry.upload_dir(&id);
        tokio::fs::create_dir_all(&upload_dir).await?;

        let mut written: u64 = 0;
        let copy = async {
            let mut file = tokio::fs::File::create(&job.file_path).await?;
            while let Some(chunk) = field.chunk().await.map_err(ApiError::from)? {
                file.write_all(&chunk).await?;
                written += chunk.len() as u64;
            }
            file.flush().await?;
            Ok::<(), ApiError>(())
        };
        if let Err(e) = copy.await {
            warn!(video_id = %id, error = %e, "Upload failed, removing partial file");
            let _ = tokio::fs::remove_dir_all(&upload_dir).await;
            return Err(match e {
                ApiError::BadRequest(msg) => ApiError::Upload(msg),
                other => other,
            });
        }

        info!(video_id = %id, filename = %filename, bytes = written, "Video uploaded");
        metrics::record_upload(written);

        let response = UploadResponse {
            video_id: id.clone(),
            filename,
            status: job.status,
        };
        state.registry.add(job).await;
        state.processor.spawn(id);

        return Ok(Json(response));
    }

    Err(ApiError::bad_request("Missing 'file' field"))
}

/// List all videos.
pub async fn list_videos(State(state): State<AppState>) -> Json<Vec<VideoJob>> {
    Json(state.registry.list().await)
}

/// Get a single video with its playback URL.
pub async fn get_video(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> ApiResult<Json<VideoJob>> {
    let mut job = state.registry.get(&VideoId::from(video_id)).await?;
    job.video_url = Some(format!("/static_videos/{}/{}", job.id, job.filename));
    Ok(Json(job))
}

/// Generate thumbnails for videos that lack one.
pub async fn regenerate_thumbnails(
    State(state): State<AppState>,
) -> Json<RegenerateThumbnailsResponse> {
    let summary = state.processor.regenerate_thumbnails().await;
    Json(RegenerateThumbnailsResponse {
        status: "completed",
        summary,
    })
}

/// Final path component of an uploaded file name, if it is usable.
fn safe_file_name(name: &str) -> Option<String> {
    let base = FsPath::new(name).file_name()?.to_str()?;
    if base.is_empty() || base == "." || base == ".." {
        return None;
    }
    Some(base.to_string())
}
