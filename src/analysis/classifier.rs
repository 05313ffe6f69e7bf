use regex::Regex;

use crate::analysis::types::{ClassificationResult, QuestionType, Source};
use crate::config::ClassifierConfig;
use crate::perception::layout::{LayoutAnalyzer, LayoutSummary};
use crate::perception::types::ScreenImage;

const TEXT_PATTERN_CONFIDENCE: f64 = 0.9;

/// Probe groups in evaluation order. The first group with a hit decides.
const PROBES: &[(QuestionType, &[&str])] = &[
    (
        QuestionType::TrueFalse,
        &[r"true.*false", r"vrai.*faux", r"correct.*incorrect", r"right.*wrong"],
    ),
    (
        QuestionType::MultipleChoice,
        &[r"[a-d]\)", r"choose", r"select", r"which of the following"],
    ),
    (
        QuestionType::RemakePhrase,
        &[r"remake.*phrase", r"rearrange", r"put.*order", r"organi[sz]e.*sentence"],
    ),
    (QuestionType::Matching, &[r"match", r"drag", r"pair", r"connect"]),
    (
        QuestionType::FillBlank,
        &[r"_{3,}", r"fill", r"complete", r"type.*answer"],
    ),
];

/// Text probes first, visual layout second. Holds no state besides the
/// compiled probes, so the same inputs always give the same result.
pub struct QuestionClassifier {
    groups: Vec<(QuestionType, Vec<Regex>)>,
    layout: LayoutAnalyzer,
}

impl QuestionClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        let groups = PROBES
            .iter()
            .map(|(kind, patterns)| {
                let compiled = patterns
                    .iter()
                    .filter_map(|p| match Regex::new(p) {
                        Ok(re) => Some(re),
                        Err(e) => {
                            tracing::error!(pattern = %p, error = %e, "invalid probe skipped");
                            None
                        }
                    })
                    .collect();
                (*kind, compiled)
            })
            .collect();
        Self {
            groups,
            layout: LayoutAnalyzer::new(config),
        }
    }

    pub fn layout(&self) -> &LayoutAnalyzer {
        &self.layout
    }

    pub fn classify(&self, image: Option<&ScreenImage>, text: &str) -> ClassificationResult {
        if let Some(result) = self.classify_text(text) {
            return result;
        }
        match image {
            Some(img) => self.classify_layout(&self.layout.analyze(img)),
            None => ClassificationResult::new(QuestionType::Unknown, 0.0, Source::VisualLayout),
        }
    }

    /// `None` when no probe matches.
    pub fn classify_text(&self, text: &str) -> Option<ClassificationResult> {
        if text.trim().is_empty() {
            return None;
        }
        let lowered = text.to_lowercase();
        for (kind, probes) in &self.groups {
            if let Some(hit) = probes.iter().find(|re| re.is_match(&lowered)) {
                tracing::debug!(kind = ?kind, probe = %hit.as_str(), "text probe matched");
                return Some(ClassificationResult::new(
                    *kind,
                    TEXT_PATTERN_CONFIDENCE,
                    Source::TextPattern,
                ));
            }
        }
        None
    }

    /// Input fields take priority over buttons.
    pub fn classify_layout(&self, summary: &LayoutSummary) -> ClassificationResult {
        let (kind, confidence) = if !summary.inputs.is_empty() {
            (QuestionType::FillBlank, 0.8)
        } else {
            match summary.buttons.len() {
                0 => (QuestionType::Unknown, 0.0),
                1 => (QuestionType::Unknown, 0.3),
                2 if summary.buttons_aligned(self.layout.config().align_tolerance) => {
                    (QuestionType::TrueFalse, 0.9)
                }
                2 => (QuestionType::MultipleChoice, 0.7),
                3..=5 => (QuestionType::MultipleChoice, 0.8),
                _ => (QuestionType::Matching, 0.6),
            }
        };
        tracing::debug!(
            kind = ?kind,
            confidence,
            buttons = summary.buttons.len(),
            inputs = summary.inputs.len(),
            "visual classification"
        );
        ClassificationResult::new(kind, confidence, Source::VisualLayout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::perception::types::Region;

    fn classifier() -> QuestionClassifier {
        QuestionClassifier::new(ClassifierConfig::default())
    }

    fn buttons(rows: &[(i32, i32)]) -> LayoutSummary {
        LayoutSummary {
            buttons: rows.iter().map(|&(x, y)| Region::new(x, y, 80, 40)).collect(),
            inputs: Vec::new(),
        }
    }

    #[test]
    fn probe_groups_follow_fixed_order() {
        let c = classifier();
        // Matches both TrueFalse and MultipleChoice probes: group order decides.
        let r = c.classify(None, "Select: True or False?");
        assert_eq!(r.question_type, QuestionType::TrueFalse);
        assert_eq!(r.source, Source::TextPattern);
        assert_eq!(r.confidence, 0.9);

        let r = c.classify(None, "Which of the following is a cost? a) x b) y");
        assert_eq!(r.question_type, QuestionType::MultipleChoice);
        let r = c.classify(None, "Rearrange the words");
        assert_eq!(r.question_type, QuestionType::RemakePhrase);
        let r = c.classify(None, "Connect each term with its definition");
        assert_eq!(r.question_type, QuestionType::Matching);
        let r = c.classify(None, "The site ____ was late");
        assert_eq!(r.question_type, QuestionType::FillBlank);
    }

    #[test]
    fn visual_rules_apply_without_text() {
        let c = classifier();
        let aligned = c.classify_layout(&buttons(&[(100, 300), (400, 310)]));
        assert_eq!((aligned.question_type, aligned.confidence), (QuestionType::TrueFalse, 0.9));

        let stacked = c.classify_layout(&buttons(&[(100, 300), (100, 400)]));
        assert_eq!(
            (stacked.question_type, stacked.confidence),
            (QuestionType::MultipleChoice, 0.7)
        );

        let four = c.classify_layout(&buttons(&[(0, 0), (0, 60), (0, 120), (0, 180)]));
        assert_eq!((four.question_type, four.confidence), (QuestionType::MultipleChoice, 0.8));

        let many = c.classify_layout(&buttons(&[(0, 0), (0, 60), (0, 120), (0, 180), (0, 240), (0, 300)]));
        assert_eq!((many.question_type, many.confidence), (QuestionType::Matching, 0.6));

        let one = c.classify_layout(&buttons(&[(0, 0)]));
        assert_eq!((one.question_type, one.confidence), (QuestionType::Unknown, 0.3));
    }

    #[test]
    fn input_field_outranks_buttons() {
        let c = classifier();
        let mut summary = buttons(&[(100, 300), (400, 300)]);
        summary.inputs.push(Region::new(100, 100, 300, 40));
        let r = c.classify_layout(&summary);
        assert_eq!((r.question_type, r.confidence), (QuestionType::FillBlank, 0.8));
    }

    #[test]
    fn no_text_and_no_regions_is_unknown() {
        let c = classifier();
        let blank = ScreenImage::blank(640, 480, [255, 255, 255]);
        let r = c.classify(Some(&blank), "");
        assert_eq!(r.question_type, QuestionType::Unknown);
        assert!(r.confidence <= 0.3);

        let r = c.classify(None, "");
        assert_eq!(r.question_type, QuestionType::Unknown);
        assert_eq!(r.confidence, 0.0);
    }

    #[test]
    fn classification_is_idempotent() {
        let c = classifier();
        let img = ScreenImage::blank(320, 240, [200, 200, 200]);
        for text in ["", "Vrai ou faux ?", "complete the sentence", "nothing to see"] {
            let first = c.classify(Some(&img), text);
            let second = c.classify(Some(&img), text);
            assert_eq!(
                serde_json::to_string(&first).unwrap(),
                serde_json::to_string(&second).unwrap()
            );
        }
    }
}
