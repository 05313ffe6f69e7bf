//! In-memory collaborators for unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::agent_engine::loop_control::Pacer;
use crate::auth::Authorization;
use crate::errors::{AutoQuizError, AutoQuizResult};
use crate::executor::input::InputDevice;
use crate::perception::traits::{ScreenSource, TextExtractor};
use crate::perception::types::{ExtractMode, Point, RecognizedToken, Region, ScreenImage};

// ── Screen ──────────────────────────────────────────────────────────────────

/// Always returns (a crop of) the same image.
pub struct StaticScreen {
    image: Option<ScreenImage>,
    captures: AtomicUsize,
}

impl StaticScreen {
    pub fn new(image: ScreenImage) -> Self {
        Self {
            image: Some(image),
            captures: AtomicUsize::new(0),
        }
    }

    /// White 1920x1080 display.
    pub fn blank() -> Self {
        Self::new(ScreenImage::blank(1920, 1080, [255, 255, 255]))
    }

    /// A display that cannot be captured.
    pub fn unavailable() -> Self {
        Self {
            image: None,
            captures: AtomicUsize::new(0),
        }
    }

    pub fn captures(&self) -> usize {
        self.captures.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ScreenSource for StaticScreen {
    async fn capture(&self, region: Option<Region>) -> AutoQuizResult<ScreenImage> {
        self.captures.fetch_add(1, Ordering::SeqCst);
        let image = self
            .image
            .as_ref()
            .ok_or_else(|| AutoQuizError::CaptureUnavailable("no display".into()))?;
        match region {
            None => Ok(image.clone()),
            Some(r) => image
                .crop(r)
                .ok_or_else(|| AutoQuizError::CaptureUnavailable("region off screen".into())),
        }
    }
}

// ── Text ────────────────────────────────────────────────────────────────────

/// Fixed text for every region; token lists handed out in script order, the
/// last one repeating once the script runs out.
pub struct ScriptedExtractor {
    text: String,
    tokens: Mutex<VecDeque<Vec<RecognizedToken>>>,
    last: Mutex<Vec<RecognizedToken>>,
    token_calls: AtomicUsize,
}

impl ScriptedExtractor {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tokens: Mutex::new(VecDeque::new()),
            last: Mutex::new(Vec::new()),
            token_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_tokens(self, script: Vec<Vec<RecognizedToken>>) -> Self {
        *self.tokens.lock().unwrap() = script.into();
        self
    }

    pub fn token_calls(&self) -> usize {
        self.token_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextExtractor for ScriptedExtractor {
    async fn extract_text(&self, _image: &ScreenImage, _mode: ExtractMode) -> String {
        self.text.clone()
    }

    async fn extract_tokens(&self, _image: &ScreenImage) -> Vec<RecognizedToken> {
        self.token_calls.fetch_add(1, Ordering::SeqCst);
        let mut last = self.last.lock().unwrap();
        if let Some(next) = self.tokens.lock().unwrap().pop_front() {
            *last = next;
        }
        last.clone()
    }
}

/// Token at `(x, y)` with an empty box, as produced by sparse OCR output.
pub fn token(text: &str, x: i32, y: i32) -> RecognizedToken {
    RecognizedToken::new(text, 95, Region::new(x, y, 0, 0))
}

// ── Input ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Move(Point),
    Click(Point),
    Press(Point),
    Release(Point),
    SelectAll,
    Type(String),
}

/// Shared view on what a `RecordingInput` did after it was boxed away.
#[derive(Debug, Clone, Default)]
pub struct InputLog(Arc<Mutex<Vec<InputEvent>>>);

impl InputLog {
    pub fn events(&self) -> Vec<InputEvent> {
        self.0.lock().unwrap().clone()
    }

    pub fn clicks(&self) -> Vec<Point> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                InputEvent::Click(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: InputEvent) {
        self.0.lock().unwrap().push(event);
    }
}

/// Records every action; clicks at `failing` points raise a platform error
/// and are not recorded.
#[derive(Debug, Default)]
pub struct RecordingInput {
    position: Point,
    failing: Vec<Point>,
    cancel_after: Option<(usize, Pacer)>,
    log: InputLog,
}

impl RecordingInput {
    pub fn failing_at(failing: Vec<Point>) -> Self {
        Self {
            failing,
            ..Self::default()
        }
    }

    /// Cancels the run right after the `clicks`-th recorded click, as a user
    /// pressing Ctrl+C mid-question would.
    pub fn cancelling_after(clicks: usize, pacer: Pacer) -> Self {
        Self {
            cancel_after: Some((clicks, pacer)),
            ..Self::default()
        }
    }

    pub fn log(&self) -> InputLog {
        self.log.clone()
    }
}

impl InputDevice for RecordingInput {
    fn move_to(&mut self, point: Point) -> AutoQuizResult<()> {
        self.position = point;
        self.log.push(InputEvent::Move(point));
        Ok(())
    }

    fn position(&self) -> AutoQuizResult<Point> {
        Ok(self.position)
    }

    fn click(&mut self) -> AutoQuizResult<()> {
        if self.failing.contains(&self.position) {
            return Err(AutoQuizError::InteractionFailed(format!(
                "simulated failure at {}",
                self.position
            )));
        }
        self.log.push(InputEvent::Click(self.position));
        if let Some((clicks, pacer)) = &self.cancel_after {
            if self.log.clicks().len() >= *clicks {
                pacer.cancel();
            }
        }
        Ok(())
    }

    fn press(&mut self) -> AutoQuizResult<()> {
        self.log.push(InputEvent::Press(self.position));
        Ok(())
    }

    fn release(&mut self) -> AutoQuizResult<()> {
        self.log.push(InputEvent::Release(self.position));
        Ok(())
    }

    fn select_all(&mut self) -> AutoQuizResult<()> {
        self.log.push(InputEvent::SelectAll);
        Ok(())
    }

    fn type_text(&mut self, text: &str) -> AutoQuizResult<()> {
        self.log.push(InputEvent::Type(text.to_string()));
        Ok(())
    }
}

// ── Authorization ───────────────────────────────────────────────────────────

pub struct NeverAuthorized;

#[async_trait]
impl Authorization for NeverAuthorized {
    async fn is_authorized(&self) -> bool {
        false
    }
}
