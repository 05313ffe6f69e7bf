use async_trait::async_trait;

use crate::errors::AutoQuizResult;
use crate::perception::types::{ExtractMode, RecognizedToken, Region, ScreenImage};

/// Source of display pixels.
/// `XcapScreen` is the desktop implementation; tests use a static image.
#[async_trait]
pub trait ScreenSource: Send + Sync {
    /// Capture the whole display, or only `region` when given.
    /// An unavailable device surfaces as `AutoQuizError::CaptureUnavailable`.
    async fn capture(&self, region: Option<Region>) -> AutoQuizResult<ScreenImage>;
}

/// OCR boundary.
///
/// Extraction never fails past this trait: implementations log the problem and
/// return empty text or no tokens, so classification still runs on the
/// text-absent signal.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract_text(&self, image: &ScreenImage, mode: ExtractMode) -> String;

    /// Words with screen-space boxes, in the extractor's scan order.
    async fn extract_tokens(&self, image: &ScreenImage) -> Vec<RecognizedToken>;
}
