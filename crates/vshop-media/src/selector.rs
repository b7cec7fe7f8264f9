//! Best-frame selection around a sampling point.

use image::RgbImage;
use tracing::debug;
use vshop_models::QualityVerdict;

use crate::frames::FrameSource;
use crate::quality::QualityAssessor;

/// Frame selection settings.
#[derive(Debug, Clone)]
pub struct SelectorConfig {
    /// Half-width of the search window around each sampling point, in seconds
    pub search_radius_secs: f64,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            search_radius_secs: 1.0,
        }
    }
}

impl SelectorConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            search_radius_secs: std::env::var("FRAME_SEARCH_RADIUS_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1.0),
        }
    }
}

/// A decoded frame chosen for analysis.
#[derive(Debug, Clone)]
pub struct SelectedFrame {
    /// Frame index in the video
    pub index: u64,
    pub image: RgbImage,
    pub verdict: QualityVerdict,
}

/// Picks the best-quality readable frame near a target index.
#[derive(Debug, Clone, Default)]
pub struct FrameSelector {
    assessor: QualityAssessor,
}

impl FrameSelector {
    pub fn new(assessor: QualityAssessor) -> Self {
        Self { assessor }
    }

    pub fn assessor(&self) -> &QualityAssessor {
        &self.assessor
    }

    /// Score frames around `center_index` nearest-first and return the best.
    ///
    /// Offsets are visited as `0, +1, -1, +2, -2, ...` up to
    /// `floor(fps * radius_seconds)`. Probing stops at the first frame that
    /// passes the quality thresholds. The returned frame is the highest
    /// scoring one seen (earliest visit on ties), passing or not. `None`
    /// means no frame in the window could be read.
    pub async fn select_best(
        &self,
        source: &dyn FrameSource,
        center_index: u64,
        fps: f64,
        radius_seconds: f64,
    ) -> Option<SelectedFrame> {
        let radius = (fps * radius_seconds).floor().max(0.0) as i64;
        let frame_count = source.frame_count();
        let mut best: Option<SelectedFrame> = None;

        for offset in search_offsets(radius) {
            let index = center_index as i64 + offset;
            if index < 0 || (frame_count > 0 && index as u64 >= frame_count) {
                continue;
            }
            let index = index as u64;

            let image = match source.read_frame(index).await {
                Ok(image) => image,
                Err(e) => {
                    debug!(index, error = %e, "Skipping unreadable frame");
                    continue;
                }
            };

            let verdict = self.assessor.assess(&image);
            let passes = verdict.passes;

            let improves = best
                .as_ref()
                .map_or(true, |b| verdict.score > b.verdict.score);
            if improves {
                best = Some(SelectedFrame {
                    index,
                    image,
                    verdict,
                });
            }

            if passes {
                break;
            }
        }

        best
    }
}

/// Nearest-first visit order: `0, +1, -1, ..., +radius, -radius`.
fn search_offsets(radius: i64) -> impl Iterator<Item = i64> {
    std::iter::once(0).chain((1..=radius).flat_map(|k| [k, -k]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frames::InMemoryFrameSource;
    use image::Rgb;

    fn sharp() -> RgbImage {
        RgbImage::from_fn(16, 16, |x, y| {
            if (x + y) % 2 == 0 {
                Rgb([0, 0, 0])
            } else {
                Rgb([255, 255, 255])
            }
        })
    }

    /// Blurry frame whose score grows with `level` (brightness moves toward mid-range).
    fn blurry(level: u8) -> RgbImage {
        RgbImage::from_pixel(16, 16, Rgb([level, level, level]))
    }

    #[test]
    fn test_search_order() {
        let offsets: Vec<i64> = search_offsets(2).collect();
        assert_eq!(offsets, vec![0, 1, -1, 2, -2]);
        assert_eq!(search_offsets(0).collect::<Vec<_>>(), vec![0]);
    }

    #[tokio::test]
    async fn test_center_passing_frame_is_returned() {
        let frames = (0..20).map(|_| sharp()).collect();
        let source = InMemoryFrameSource::from_frames(10.0, frames);
        let selected = FrameSelector::default()
            .select_best(&source, 10, 10.0, 1.0)
            .await
            .unwrap();
        assert_eq!(selected.index, 10);
        assert!(selected.verdict.passes);
    }

    #[tokio::test]
    async fn test_selection_stays_in_window() {
        // Only frames far outside the window pass
        let frames: Vec<RgbImage> = (0..100)
            .map(|i| if i < 5 || i > 90 { sharp() } else { blurry(60) })
            .collect();
        let source = InMemoryFrameSource::from_frames(10.0, frames);
        let selected = FrameSelector::default()
            .select_best(&source, 50, 10.0, 1.0)
            .await
            .unwrap();
        assert!(selected.index >= 40 && selected.index <= 60);
        assert!(!selected.verdict.passes);
    }

    #[tokio::test]
    async fn test_fallback_returns_highest_score() {
        // Nothing passes; frame 52 is closest to mid brightness
        let frames: Vec<RgbImage> = (0..100)
            .map(|i| if i == 52 { blurry(130) } else { blurry(60) })
            .collect();
        let source = InMemoryFrameSource::from_frames(10.0, frames);
        let selected = FrameSelector::default()
            .select_best(&source, 50, 10.0, 1.0)
            .await
            .unwrap();
        assert_eq!(selected.index, 52);
        assert!(!selected.verdict.passes);
    }

    #[tokio::test]
    async fn test_ties_keep_earliest_visit() {
        let frames = (0..100).map(|_| blurry(60)).collect();
        let source = InMemoryFrameSource::from_frames(10.0, frames);
        let selected = FrameSelector::default()
            .select_best(&source, 50, 10.0, 1.0)
            .await
            .unwrap();
        assert_eq!(selected.index, 50);
    }

    #[tokio::test]
    async fn test_stops_at_first_passing_frame() {
        // +1 passes, -1 would also pass; +1 is visited first
        let frames: Vec<RgbImage> = (0..10)
            .map(|i| if i == 4 || i == 6 { sharp() } else { blurry(60) })
            .collect();
        let source = InMemoryFrameSource::from_frames(10.0, frames);
        let selected = FrameSelector::default()
            .select_best(&source, 5, 10.0, 1.0)
            .await
            .unwrap();
        assert_eq!(selected.index, 6);
    }

    #[tokio::test]
    async fn test_unreadable_window_returns_none() {
        let mut frames: Vec<Option<RgbImage>> = vec![None; 30];
        frames[0] = Some(sharp());
        let source = InMemoryFrameSource::new(10.0, frames);
        let selected = FrameSelector::default()
            .select_best(&source, 20, 10.0, 0.5)
            .await;
        assert!(selected.is_none());
    }

    #[tokio::test]
    async fn test_unreadable_center_uses_neighbour() {
        let mut frames: Vec<Option<RgbImage>> = (0..30).map(|_| Some(sharp())).collect();
        frames[20] = None;
        let source = InMemoryFrameSource::new(10.0, frames);
        let selected = FrameSelector::default()
            .select_best(&source, 20, 10.0, 1.0)
            .await
            .unwrap();
        assert_eq!(selected.index, 21);
    }

    #[tokio::test]
    async fn test_window_clipped_at_start() {
        let frames: Vec<RgbImage> = (0..30)
            .map(|i| if i == 3 { sharp() } else { blurry(60) })
            .collect();
        let source = InMemoryFrameSource::from_frames(10.0, frames);
        let selected = FrameSelector::default()
            .select_best(&source, 0, 10.0, 1.0)
            .await
            .unwrap();
        assert_eq!(selected.index, 3);
    }
}
