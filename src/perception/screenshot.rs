// Screen capture of the primary monitor through xcap.
use async_trait::async_trait;

use crate::errors::{AutoQuizError, AutoQuizResult};
use crate::perception::traits::ScreenSource;
use crate::perception::types::{Point, Region, ScreenImage};

/// Captures the primary monitor. The primary monitor's top-left corner is the
/// screen origin used by the input device.
#[derive(Debug, Default)]
pub struct XcapScreen;

impl XcapScreen {
    pub fn new() -> Self {
        Self
    }
}

fn capture_primary_blocking() -> AutoQuizResult<image::RgbImage> {
    let monitors = xcap::Monitor::all()
        .map_err(|e| AutoQuizError::CaptureUnavailable(format!("list monitors: {e}")))?;
    let monitor = monitors
        .into_iter()
        .find(|m| m.is_primary())
        .ok_or_else(|| AutoQuizError::CaptureUnavailable("no primary monitor".into()))?;

    let capture = monitor
        .capture_image()
        .map_err(|e| AutoQuizError::CaptureUnavailable(format!("capture: {e}")))?;
    let (width, height) = (capture.width(), capture.height());

    // Rebuild through raw bytes so xcap's image version never leaks into ours.
    let rgba = image::RgbaImage::from_raw(width, height, capture.into_raw())
        .ok_or_else(|| AutoQuizError::CaptureUnavailable("capture buffer size mismatch".into()))?;
    Ok(image::DynamicImage::ImageRgba8(rgba).to_rgb8())
}

#[async_trait]
impl ScreenSource for XcapScreen {
    async fn capture(&self, region: Option<Region>) -> AutoQuizResult<ScreenImage> {
        let pixels = tokio::task::spawn_blocking(capture_primary_blocking)
            .await
            .map_err(|e| AutoQuizError::CaptureUnavailable(format!("capture task: {e}")))??;
        let full = ScreenImage::new(pixels, Point::new(0, 0));
        tracing::debug!(width = full.width(), height = full.height(), region = ?region, "screen captured");

        match region {
            None => Ok(full),
            Some(r) => full.crop(r).ok_or_else(|| {
                AutoQuizError::CaptureUnavailable(format!("region {r:?} is outside the monitor"))
            }),
        }
    }
}
