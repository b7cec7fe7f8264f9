//! Random-access frame sources.

use async_trait::async_trait;
use image::RgbImage;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::info::{inspect_video, VideoInfo};

/// Decoded frames of one video, addressed by frame index.
#[async_trait]
pub trait FrameSource: Send + Sync {
    /// Frames per second.
    fn fps(&self) -> f64;

    /// Total number of frames.
    fn frame_count(&self) -> u64;

    /// Frame size in pixels as `(width, height)`.
    fn dimensions(&self) -> (u32, u32);

    /// Decode the frame at `index`.
    async fn read_frame(&self, index: u64) -> MediaResult<RgbImage>;
}

/// Opens a [`FrameSource`] for a video file.
#[async_trait]
pub trait FrameSourceOpener: Send + Sync {
    async fn open(&self, path: &Path) -> MediaResult<Box<dyn FrameSource>>;
}

/// Frame source backed by ffprobe metadata and per-frame ffmpeg seeks.
pub struct FfmpegFrameSource {
    path: PathBuf,
    info: VideoInfo,
    runner: FfmpegRunner,
}

impl FfmpegFrameSource {
    /// Read metadata for `path` and prepare for frame reads.
    pub async fn open(path: impl AsRef<Path>) -> MediaResult<Self> {
        let path = path.as_ref().to_path_buf();
        let info = inspect_video(&path).await?;
        if info.frame_count == 0 {
            return Err(MediaError::InvalidVideo(format!(
                "{} has no frames",
                path.display()
            )));
        }
        debug!(
            path = %path.display(),
            fps = info.fps,
            frames = info.frame_count,
            width = info.width,
            height = info.height,
            "Opened video"
        );
        Ok(Self {
            path,
            info,
            runner: FfmpegRunner::new().with_timeout(60),
        })
    }
}

#[async_trait]
impl FrameSource for FfmpegFrameSource {
    fn fps(&self) -> f64 {
        self.info.fps
    }

    fn frame_count(&self) -> u64 {
        self.info.frame_count
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.info.width, self.info.height)
    }

    async fn read_frame(&self, index: u64) -> MediaResult<RgbImage> {
        if index >= self.info.frame_count {
            return Err(MediaError::frame_unavailable(index, "past end of stream"));
        }

        let cmd = frame_grab_command(&self.path, index, self.info.fps);
        let mut bytes = self.runner.run_capture(&cmd).await?;

        let expected = self.info.width as usize * self.info.height as usize * 3;
        if bytes.len() < expected {
            return Err(MediaError::frame_unavailable(
                index,
                format!("decoder returned {} of {} bytes", bytes.len(), expected),
            ));
        }
        bytes.truncate(expected);

        RgbImage::from_raw(self.info.width, self.info.height, bytes)
            .ok_or_else(|| MediaError::frame_unavailable(index, "buffer size mismatch"))
    }
}

/// Command decoding exactly frame `index` as raw RGB.
///
/// Accurate seeking yields the first frame at or after the seek time, and the
/// seek time is printed with millisecond precision. Seeking half a frame early
/// keeps a rounded-up time from skipping to the next frame.
fn frame_grab_command(path: &Path, index: u64, fps: f64) -> FfmpegCommand {
    let seek = ((index as f64 - 0.5) / fps).max(0.0);
    FfmpegCommand::to_stdout(path)
        .seek(seek)
        .single_frame()
        .raw_rgb()
}

/// Opens videos with [`FfmpegFrameSource`].
#[derive(Debug, Clone, Default)]
pub struct FfmpegSourceOpener;

#[async_trait]
impl FrameSourceOpener for FfmpegSourceOpener {
    async fn open(&self, path: &Path) -> MediaResult<Box<dyn FrameSource>> {
        Ok(Box::new(FfmpegFrameSource::open(path).await?))
    }
}

/// Frame source over pre-decoded images. `None` slots are unreadable.
#[derive(Debug, Clone)]
pub struct InMemoryFrameSource {
    fps: f64,
    frames: Vec<Option<RgbImage>>,
}

impl InMemoryFrameSource {
    pub fn new(fps: f64, frames: Vec<Option<RgbImage>>) -> Self {
        Self { fps, frames }
    }

    /// Source where every frame is readable.
    pub fn from_frames(fps: f64, frames: Vec<RgbImage>) -> Self {
        Self::new(fps, frames.into_iter().map(Some).collect())
    }
}

#[async_trait]
impl FrameSource for InMemoryFrameSource {
    fn fps(&self) -> f64 {
        self.fps
    }

    fn frame_count(&self) -> u64 {
        self.frames.len() as u64
    }

    fn dimensions(&self) -> (u32, u32) {
        self.frames
            .iter()
            .flatten()
            .next()
            .map_or((0, 0), |f| f.dimensions())
    }

    async fn read_frame(&self, index: u64) -> MediaResult<RgbImage> {
        self.frames
            .get(index as usize)
            .and_then(|f| f.clone())
            .ok_or_else(|| MediaError::frame_unavailable(index, "no frame at index"))
    }
}
