use crate::analysis::types::AnswerValue;
use crate::errors::{AutoQuizError, AutoQuizResult};
use crate::executor::targets::{ClickTarget, DragTarget, Layouts};
use crate::perception::types::{RecognizedToken, Region};

/// Turns a decided answer into ordered screen targets. Pure ordered fallback,
/// no scoring.
#[derive(Debug, Clone)]
pub struct TargetResolver {
    layouts: Layouts,
}

impl TargetResolver {
    pub fn new(layouts: Layouts) -> Self {
        Self { layouts }
    }

    /// True/false and letter answers: each table's point for the key, in
    /// table declaration order.
    pub fn resolve_fixed(&self, value: &AnswerValue) -> AutoQuizResult<Vec<ClickTarget>> {
        let points = self.layouts.tables.iter().filter_map(|table| {
            let point = match value {
                AnswerValue::Bool(b) => table.true_false_point(*b),
                AnswerValue::Letter(l) => table.letter_point(*l),
                _ => None,
            }?;
            Some((point, table.name().to_string()))
        });
        let targets: Vec<ClickTarget> = points
            .enumerate()
            .map(|(i, (point, name))| ClickTarget::new(point, name, i as u32))
            .collect();
        if targets.is_empty() {
            return Err(AutoQuizError::NoTargetFound(format!(
                "no coordinate table answers {value}"
            )));
        }
        tracing::debug!(answer = %value, candidates = targets.len(), "fixed targets resolved");
        Ok(targets)
    }

    /// Detected input fields first, then the guessed fallback points.
    pub fn resolve_fill_blank(&self, fields: &[Region]) -> AutoQuizResult<Vec<ClickTarget>> {
        let detected = fields.iter().map(|r| (r.center(), "detected_field"));
        let fallback = self
            .layouts
            .fill_blank_fallback
            .iter()
            .map(|p| (*p, "fill_blank_fallback"));
        let targets: Vec<ClickTarget> = detected
            .chain(fallback)
            .enumerate()
            .map(|(i, (point, origin))| ClickTarget::new(point, origin, i as u32))
            .collect();
        if targets.is_empty() {
            return Err(AutoQuizError::NoTargetFound(
                "no input field detected and no fallback configured".into(),
            ));
        }
        Ok(targets)
    }

    /// First token, in scan order, whose text contains `word` ignoring case.
    pub fn locate_word(&self, word: &str, tokens: &[RecognizedToken]) -> AutoQuizResult<ClickTarget> {
        let needle = word.to_lowercase();
        tokens
            .iter()
            .find(|t| t.text.to_lowercase().contains(&needle))
            .map(|t| ClickTarget::new(t.bbox.center(), "ocr_token", 0))
            .ok_or_else(|| AutoQuizError::NoTargetFound(format!("word '{word}' not on screen")))
    }

    /// 1-based `(left, right)` pairs onto the configured drag rows.
    pub fn resolve_matching(&self, pairs: &[(u32, u32)]) -> AutoQuizResult<Vec<DragTarget>> {
        let rows = &self.layouts.matching_pairs;
        let row = |i: u32| i.checked_sub(1).and_then(|i| rows.get(i as usize));
        let targets: Vec<DragTarget> = pairs
            .iter()
            .filter_map(|&(l, r)| Some((row(l)?.from, row(r)?.to)))
            .enumerate()
            .map(|(i, (from, to))| DragTarget {
                from,
                to,
                origin_system: "matching_rows".into(),
                priority: i as u32,
            })
            .collect();
        if targets.is_empty() {
            return Err(AutoQuizError::NoTargetFound("no drag pair configured".into()));
        }
        Ok(targets)
    }

    pub fn resolve_submit(&self) -> AutoQuizResult<Vec<ClickTarget>> {
        let targets: Vec<ClickTarget> = self
            .layouts
            .submit
            .iter()
            .enumerate()
            .map(|(i, p)| ClickTarget::new(*p, "submit", i as u32))
            .collect();
        if targets.is_empty() {
            return Err(AutoQuizError::NoTargetFound("no submit position configured".into()));
        }
        Ok(targets)
    }
}
