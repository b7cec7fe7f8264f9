//! Thumbnail generation.

use std::path::Path;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;

/// Thumbnail width in pixels; height keeps the aspect ratio.
pub const THUMBNAIL_SCALE_WIDTH: u32 = 480;

/// Fraction of the video duration at which the thumbnail is taken.
pub const THUMBNAIL_POSITION: f64 = 0.1;

/// Generate a thumbnail from a video file.
pub async fn generate_thumbnail(
    video_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    duration_secs: f64,
) -> MediaResult<()> {
    let cmd = FfmpegCommand::new(video_path.as_ref(), output_path.as_ref())
        .seek(thumbnail_time(duration_secs))
        .single_frame()
        .video_filter(thumbnail_filter())
        .log_level("error");

    FfmpegRunner::new().with_timeout(60).run(&cmd).await
}

fn thumbnail_time(duration_secs: f64) -> f64 {
    (duration_secs * THUMBNAIL_POSITION).max(0.0)
}

fn thumbnail_filter() -> String {
    format!("scale={}:-2", THUMBNAIL_SCALE_WIDTH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thumbnail_filter() {
        assert!(thumbnail_filter().contains("480"));
    }

    #[test]
    fn test_thumbnail_time() {
        assert!((thumbnail_time(60.0) - 6.0).abs() < 1e-9);
        assert_eq!(thumbnail_time(0.0), 0.0);
    }
}
