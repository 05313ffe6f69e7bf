use serde::{Deserialize, Serialize};

use crate::analysis::types::{
    AnswerCandidate, AnswerValue, ClassificationResult, Letter, QuestionType,
};

const STRONG_CANDIDATE: f64 = 0.7;
const STRONG_CLASSIFICATION: f64 = 0.8;
const WEAK_CANDIDATE: f64 = 0.4;
const FALLBACK_CONFIDENCE: f64 = 0.4;

/// Which precedence rule produced the decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombineRule {
    StrongCandidate,
    StrongClassification,
    WeakCandidate,
    StatisticalFallback,
}

/// Final answer for one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerDecision {
    pub question_type: QuestionType,
    pub value: AnswerValue,
    pub confidence: f64,
    pub reasoning: String,
    pub rule: CombineRule,
}

impl AnswerDecision {
    fn from_candidate(candidate: &AnswerCandidate, rule: CombineRule) -> Self {
        Self {
            question_type: candidate.question_type(),
            value: candidate.value.clone(),
            confidence: candidate.confidence,
            reasoning: candidate.reasoning.clone(),
            rule,
        }
    }
}

/// Type-specific answer used when only the classification is trusted.
/// Types without one answer with letter `a` while keeping their own type,
/// except matching which keeps the systematic pairing.
fn default_answer(kind: QuestionType) -> AnswerValue {
    match kind {
        QuestionType::TrueFalse => AnswerValue::Bool(true),
        QuestionType::MultipleChoice => AnswerValue::Letter(Letter::C),
        QuestionType::FillBlank => AnswerValue::FreeText("notice".into()),
        QuestionType::Matching => AnswerValue::Pairs((1..=4).map(|i| (i, i)).collect()),
        QuestionType::RemakePhrase | QuestionType::Unknown => AnswerValue::Letter(Letter::A),
    }
}

/// First matching rule wins:
/// 1. candidate above 0.7,
/// 2. classification above 0.8 with that type's default answer,
/// 3. candidate above 0.4,
/// 4. multiple choice `c` at 0.4.
pub fn combine(
    classification: &ClassificationResult,
    candidate: Option<&AnswerCandidate>,
) -> AnswerDecision {
    if let Some(c) = candidate.filter(|c| c.confidence > STRONG_CANDIDATE) {
        return AnswerDecision::from_candidate(c, CombineRule::StrongCandidate);
    }

    if classification.confidence > STRONG_CLASSIFICATION {
        let value = default_answer(classification.question_type);
        return AnswerDecision {
            question_type: classification.question_type,
            reasoning: format!(
                "{} detected at {:.2}, default answer {value}",
                classification.question_type, classification.confidence
            ),
            value,
            confidence: classification.confidence,
            rule: CombineRule::StrongClassification,
        };
    }

    if let Some(c) = candidate.filter(|c| c.confidence > WEAK_CANDIDATE) {
        return AnswerDecision::from_candidate(c, CombineRule::WeakCandidate);
    }

    AnswerDecision {
        question_type: QuestionType::MultipleChoice,
        value: AnswerValue::Letter(Letter::C),
        confidence: FALLBACK_CONFIDENCE,
        reasoning: "statistical fallback".into(),
        rule: CombineRule::StatisticalFallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::types::Source;

    fn candidate(value: AnswerValue, confidence: f64) -> AnswerCandidate {
        AnswerCandidate {
            value,
            confidence,
            reasoning: "test".into(),
            rule: "test".into(),
        }
    }

    #[test]
    fn strong_candidate_wins_deterministically() {
        let classification = ClassificationResult::new(QuestionType::TrueFalse, 0.9, Source::TextPattern);
        let c = candidate(AnswerValue::Letter(Letter::B), 0.75);
        let first = combine(&classification, Some(&c));
        for _ in 0..10 {
            assert_eq!(combine(&classification, Some(&c)), first);
        }
        assert_eq!(first.rule, CombineRule::StrongCandidate);
        assert_eq!(first.question_type, QuestionType::MultipleChoice);
        assert_eq!(first.value, AnswerValue::Letter(Letter::B));
    }

    #[test]
    fn strong_classification_uses_type_default() {
        let classification = ClassificationResult::new(QuestionType::FillBlank, 0.9, Source::TextPattern);
        let weak = candidate(AnswerValue::FreeText("information".into()), 0.5);
        let d = combine(&classification, Some(&weak));
        assert_eq!(d.rule, CombineRule::StrongClassification);
        assert_eq!(d.value, AnswerValue::FreeText("notice".into()));

        let tf = ClassificationResult::new(QuestionType::TrueFalse, 0.9, Source::VisualLayout);
        assert_eq!(combine(&tf, None).value, AnswerValue::Bool(true));
        let mc = ClassificationResult::new(QuestionType::MultipleChoice, 0.85, Source::TextPattern);
        assert_eq!(combine(&mc, None).value, AnswerValue::Letter(Letter::C));
        let remake = ClassificationResult::new(QuestionType::RemakePhrase, 0.9, Source::TextPattern);
        assert_eq!(combine(&remake, None).value, AnswerValue::Letter(Letter::A));
    }

    #[test]
    fn strong_classification_keeps_its_type() {
        let remake = ClassificationResult::new(QuestionType::RemakePhrase, 0.9, Source::TextPattern);
        let d = combine(&remake, None);
        assert_eq!(d.rule, CombineRule::StrongClassification);
        assert_eq!(d.question_type, QuestionType::RemakePhrase);
        assert_eq!(d.value, AnswerValue::Letter(Letter::A));
        assert_eq!(d.confidence, 0.9);

        let unknown = ClassificationResult::new(QuestionType::Unknown, 0.85, Source::VisualLayout);
        assert_eq!(combine(&unknown, None).question_type, QuestionType::Unknown);
    }

    #[test]
    fn weak_candidate_beats_fallback() {
        let classification = ClassificationResult::new(QuestionType::MultipleChoice, 0.7, Source::VisualLayout);
        let c = candidate(AnswerValue::Letter(Letter::C), 0.6);
        let d = combine(&classification, Some(&c));
        assert_eq!(d.rule, CombineRule::WeakCandidate);
        assert_eq!(d.confidence, 0.6);
    }

    #[test]
    fn unknown_without_candidate_falls_through() {
        let classification = ClassificationResult::new(QuestionType::Unknown, 0.0, Source::VisualLayout);
        let d = combine(&classification, None);
        assert_eq!(d.rule, CombineRule::StatisticalFallback);
        assert_eq!(d.question_type, QuestionType::MultipleChoice);
        assert_eq!(d.value, AnswerValue::Letter(Letter::C));
        assert_eq!(d.confidence, 0.4);
        assert_eq!(d.reasoning, "statistical fallback");

        // Exactly 0.4 is not above the weak threshold.
        let c = candidate(AnswerValue::Pairs(vec![(1, 1)]), 0.4);
        assert_eq!(combine(&classification, Some(&c)).rule, CombineRule::StatisticalFallback);
    }
}
