use std::sync::Arc;

use serde::Serialize;

use crate::agent_engine::loop_control::Pacer;
use crate::config::TimingConfig;
use crate::errors::{AutoQuizError, AutoQuizResult};
use crate::executor::input::InputDevice;
use crate::executor::targets::{ClickTarget, DragTarget};
use crate::perception::traits::ScreenSource;
use crate::perception::types::{Point, Region, ScreenImage};

/// Fraction of changed pixels above which a window counts as changed.
const CHANGE_THRESHOLD: f64 = 0.01;
const PIXEL_TOLERANCE: u8 = 10;

/// What the before/after windows showed. Informational only: every variant
/// counts as a successful interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Validation {
    Changed,
    Unchanged,
    /// A capture was skipped or failed.
    Unverified,
}

#[derive(Debug, Clone, Copy)]
pub enum Action<'a> {
    Click,
    Type(&'a str),
}

/// Pointer and keyboard actions with animated moves, settle delays and
/// candidate fallback. Owns the input device.
pub struct InteractionDriver {
    input: Box<dyn InputDevice>,
    screen: Arc<dyn ScreenSource>,
    timing: TimingConfig,
    pacer: Pacer,
}

impl InteractionDriver {
    pub fn new(
        input: Box<dyn InputDevice>,
        screen: Arc<dyn ScreenSource>,
        timing: TimingConfig,
        pacer: Pacer,
    ) -> Self {
        Self {
            input,
            screen,
            timing,
            pacer,
        }
    }

    // ── Single actions ──────────────────────────────────────────────────────

    pub async fn click(&mut self, target: &ClickTarget) -> AutoQuizResult<Validation> {
        self.move_animated(target.point, self.timing.move_ms).await?;
        self.pacer.sleep_ms(self.timing.pre_click_ms).await?;
        let before = self.capture_window(target.point).await;
        self.input.click()?;
        self.pacer.sleep_ms(self.timing.click_settle_ms).await?;
        let after = self.capture_window(target.point).await;
        Ok(compare(before, after))
    }

    /// Focus the target, replace its content with `text`.
    pub async fn type_text(&mut self, target: &ClickTarget, text: &str) -> AutoQuizResult<Validation> {
        self.move_animated(target.point, self.timing.move_ms).await?;
        self.pacer.sleep_ms(self.timing.pre_click_ms).await?;
        let before = self.capture_window(target.point).await;
        self.input.click()?;
        self.pacer.sleep_ms(self.timing.select_all_ms).await?;
        self.input.select_all()?;
        self.pacer.sleep_ms(self.timing.select_all_ms).await?;
        self.input.type_text(text)?;
        self.pacer.sleep_ms(self.timing.after_type_ms).await?;
        let after = self.capture_window(target.point).await;
        Ok(compare(before, after))
    }

    pub async fn drag(&mut self, target: &DragTarget) -> AutoQuizResult<Validation> {
        self.move_animated(target.from, self.timing.move_ms).await?;
        self.pacer.sleep_ms(self.timing.pre_click_ms).await?;
        let before = self.capture_window(target.from).await;
        self.input.press()?;
        let moved = self.move_animated(target.to, self.timing.drag_ms).await;
        // The button must come back up even when the move failed.
        let released = self.input.release();
        moved?;
        released?;
        self.pacer.sleep_ms(self.timing.click_settle_ms).await?;
        let after = self.capture_window(target.from).await;
        Ok(compare(before, after))
    }

    // ── Fallback ────────────────────────────────────────────────────────────

    /// Walk candidates by priority until one action completes. Only a platform
    /// error moves on to the next candidate; cancellation aborts the walk.
    pub async fn try_all(&mut self, candidates: &[ClickTarget], action: Action<'_>) -> AutoQuizResult<bool> {
        let mut ordered: Vec<&ClickTarget> = candidates.iter().collect();
        ordered.sort_by_key(|c| c.priority);

        for candidate in ordered {
            let outcome = match action {
                Action::Click => self.click(candidate).await,
                Action::Type(text) => self.type_text(candidate, text).await,
            };
            match outcome {
                Ok(validation) => {
                    tracing::debug!(
                        point = %candidate.point,
                        system = %candidate.origin_system,
                        validation = ?validation,
                        "candidate accepted"
                    );
                    return Ok(true);
                }
                Err(AutoQuizError::Cancelled) => return Err(AutoQuizError::Cancelled),
                Err(e) => {
                    tracing::warn!(
                        point = %candidate.point,
                        system = %candidate.origin_system,
                        error = %e,
                        "candidate failed, trying next"
                    );
                }
            }
        }
        tracing::warn!(candidates = candidates.len(), "all candidates exhausted");
        Ok(false)
    }

    /// Perform every drag in order. True when at least one completed.
    pub async fn drag_all(&mut self, drags: &[DragTarget]) -> AutoQuizResult<bool> {
        let mut any = false;
        for drag in drags {
            match self.drag(drag).await {
                Ok(_) => any = true,
                Err(AutoQuizError::Cancelled) => return Err(AutoQuizError::Cancelled),
                Err(e) => {
                    tracing::warn!(from = %drag.from, to = %drag.to, error = %e, "drag failed")
                }
            }
        }
        Ok(any)
    }

    // ── Internals ───────────────────────────────────────────────────────────

    async fn move_animated(&mut self, to: Point, duration_ms: u64) -> AutoQuizResult<()> {
        let from = self.input.position().unwrap_or(to);
        let steps = self.timing.move_steps.max(1);
        let pause = duration_ms / steps as u64;
        for i in 1..=steps {
            let t = i as f64 / steps as f64;
            let p = Point::new(
                from.x + ((to.x - from.x) as f64 * t).round() as i32,
                from.y + ((to.y - from.y) as f64 * t).round() as i32,
            );
            self.input.move_to(p)?;
            self.pacer.sleep_ms(pause).await?;
        }
        Ok(())
    }

    async fn capture_window(&self, center: Point) -> Option<ScreenImage> {
        if !self.timing.validate {
            return None;
        }
        let region = Region::around(center, self.timing.validation_window);
        match self.screen.capture(Some(region)).await {
            Ok(img) => Some(img),
            Err(e) => {
                tracing::debug!(error = %e, "validation capture skipped");
                None
            }
        }
    }
}

fn compare(before: Option<ScreenImage>, after: Option<ScreenImage>) -> Validation {
    match (before, after) {
        (Some(b), Some(a)) if b.difference(&a, PIXEL_TOLERANCE) > CHANGE_THRESHOLD => Validation::Changed,
        (Some(_), Some(_)) => Validation::Unchanged,
        _ => Validation::Unverified,
    }
}
