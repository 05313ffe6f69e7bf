use regex::Regex;

use crate::analysis::knowledge::{KnowledgeBase, RuleAnswer};
use crate::analysis::types::{
    parse_bool_answer, AnswerCandidate, AnswerValue, ClassificationResult, Letter, QuestionType,
};
use crate::config::PlannerConfig;
use crate::errors::{AutoQuizError, AutoQuizResult};

const NEGATIVE_WORDS: &str = r"\b(not|never|no|false|incorrect|wrong|cannot)\b";
const MATCHING_PAIRS: u32 = 4;
const EXPECTED_PHRASE_CONFIDENCE: f64 = 0.8;
const EXPECTED_ANSWER_CONFIDENCE: f64 = 0.9;
const FILL_FALLBACK_WORD: &str = "information";
const FILL_FALLBACK_CONFIDENCE: f64 = 0.5;

/// Extra per-question knowledge the text alone does not carry.
#[derive(Debug, Clone, Default)]
pub struct PlanHints {
    pub expected_phrase: Option<String>,
    pub expected_answer: Option<String>,
}

pub struct AnswerPlanner {
    config: PlannerConfig,
    negative: Option<Regex>,
}

impl AnswerPlanner {
    pub fn new(config: PlannerConfig) -> Self {
        let negative = match Regex::new(NEGATIVE_WORDS) {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::error!(error = %e, "negative word pattern rejected");
                None
            }
        };
        Self { config, negative }
    }

    pub fn plan(
        &self,
        classification: &ClassificationResult,
        text: &str,
        knowledge: &KnowledgeBase,
        hints: &PlanHints,
    ) -> AutoQuizResult<AnswerCandidate> {
        let lowered = text.to_lowercase();
        let kind = classification.question_type;
        let candidate = match plan_expected_answer(kind, hints) {
            Some(candidate) => candidate,
            None => match kind {
                QuestionType::TrueFalse => self.plan_true_false(&lowered),
                QuestionType::MultipleChoice => self.plan_multiple_choice(&lowered, knowledge),
                QuestionType::FillBlank => plan_fill_blank(&lowered, knowledge),
                QuestionType::RemakePhrase => plan_remake_phrase(hints)?,
                QuestionType::Matching => self.plan_matching(),
                QuestionType::Unknown => {
                    return Err(AutoQuizError::NoAnswerAvailable(
                        "question type is unknown".into(),
                    ))
                }
            },
        };
        tracing::debug!(
            value = %candidate.value,
            confidence = candidate.confidence,
            rule = %candidate.rule,
            "answer planned"
        );
        Ok(candidate)
    }

    fn plan_true_false(&self, lowered: &str) -> AnswerCandidate {
        let negative = self
            .negative
            .as_ref()
            .and_then(|re| re.find(lowered))
            .map(|m| m.as_str().to_string());
        match negative {
            Some(word) => AnswerCandidate {
                value: AnswerValue::Bool(false),
                confidence: self.config.false_confidence,
                reasoning: format!("negative indicator '{word}' present"),
                rule: "negative_indicator".into(),
            },
            None => AnswerCandidate {
                value: AnswerValue::Bool(true),
                confidence: self.config.true_prior,
                reasoning: "no negative indicator, statements are usually true".into(),
                rule: "true_prior".into(),
            },
        }
    }

    fn plan_multiple_choice(&self, lowered: &str, knowledge: &KnowledgeBase) -> AnswerCandidate {
        let topic = knowledge.topic_of(lowered);
        if let Some(rule) = knowledge.first_match(QuestionType::MultipleChoice, topic, lowered) {
            if let RuleAnswer::Letter(letter) = rule.answer {
                return AnswerCandidate {
                    value: AnswerValue::Letter(letter),
                    confidence: rule.confidence,
                    reasoning: rule.reasoning.to_string(),
                    rule: rule.name.to_string(),
                };
            }
        }
        let prior = self.config.letter_prior;
        let letter = prior.argmax();
        AnswerCandidate {
            value: AnswerValue::Letter(letter),
            confidence: self.config.letter_fallback_confidence,
            reasoning: format!(
                "{topic} topic, most frequent answer position '{letter}' ({:.2})",
                prior.weight(letter)
            ),
            rule: "letter_prior".into(),
        }
    }

    fn plan_matching(&self) -> AnswerCandidate {
        AnswerCandidate {
            value: AnswerValue::Pairs((1..=MATCHING_PAIRS).map(|i| (i, i)).collect()),
            confidence: self.config.matching_confidence,
            reasoning: "systematic pairing 1-1, 2-2, ...".into(),
            rule: "systematic_pairs".into(),
        }
    }
}

fn plan_fill_blank(lowered: &str, knowledge: &KnowledgeBase) -> AnswerCandidate {
    let topic = knowledge.topic_of(lowered);
    match knowledge.first_match(QuestionType::FillBlank, topic, lowered) {
        Some(rule) => {
            let word = match rule.answer {
                RuleAnswer::Text(w) => w.to_string(),
                RuleAnswer::Letter(l) => l.to_string(),
            };
            AnswerCandidate {
                value: AnswerValue::FreeText(word),
                confidence: rule.confidence,
                reasoning: rule.reasoning.to_string(),
                rule: rule.name.to_string(),
            }
        }
        None => AnswerCandidate {
            value: AnswerValue::FreeText(FILL_FALLBACK_WORD.into()),
            confidence: FILL_FALLBACK_CONFIDENCE,
            reasoning: format!("no curated word for {topic} topic, generic answer"),
            rule: "fill_generic".into(),
        },
    }
}

/// A configured answer, normalized for the classified type. `None` when there
/// is none or it cannot be read as an answer of that type.
fn plan_expected_answer(kind: QuestionType, hints: &PlanHints) -> Option<AnswerCandidate> {
    let raw = hints.expected_answer.as_deref()?.trim();
    if raw.is_empty() {
        return None;
    }
    let value = match kind {
        QuestionType::TrueFalse => parse_bool_answer(raw).map(AnswerValue::Bool),
        QuestionType::MultipleChoice => Letter::parse(raw).map(AnswerValue::Letter),
        QuestionType::FillBlank => Some(AnswerValue::FreeText(raw.to_string())),
        QuestionType::RemakePhrase | QuestionType::Matching | QuestionType::Unknown => None,
    };
    let Some(value) = value else {
        tracing::debug!(answer = raw, kind = %kind, "configured answer does not fit the question");
        return None;
    };
    Some(AnswerCandidate {
        value,
        confidence: EXPECTED_ANSWER_CONFIDENCE,
        reasoning: format!("configured answer '{raw}'"),
        rule: "expected_answer".into(),
    })
}

fn plan_remake_phrase(hints: &PlanHints) -> AutoQuizResult<AnswerCandidate> {
    let words: Vec<String> = hints
        .expected_phrase
        .as_deref()
        .unwrap_or_default()
        .split_whitespace()
        .map(str::to_string)
        .collect();
    if words.is_empty() {
        return Err(AutoQuizError::NoAnswerAvailable(
            "no expected phrase to rebuild".into(),
        ));
    }
    Ok(AnswerCandidate {
        value: AnswerValue::WordSequence(words),
        confidence: EXPECTED_PHRASE_CONFIDENCE,
        reasoning: "known expected phrase".into(),
        rule: "expected_phrase".into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::types::Source;

    fn planner() -> AnswerPlanner {
        AnswerPlanner::new(PlannerConfig::default())
    }

    fn classified(kind: QuestionType) -> ClassificationResult {
        ClassificationResult::new(kind, 0.9, Source::TextPattern)
    }

    fn plan(kind: QuestionType, text: &str) -> AutoQuizResult<AnswerCandidate> {
        planner().plan(&classified(kind), text, &KnowledgeBase::default(), &PlanHints::default())
    }

    #[test]
    fn true_false_without_negative_word_is_true_at_prior() {
        for text in [
            "Vrai ou faux : le béton est un matériau",
            "VRAI / FAUX - steel is heavier than wood",
            "vrai faux",
        ] {
            let c = plan(QuestionType::TrueFalse, text).unwrap();
            assert_eq!(c.value, AnswerValue::Bool(true), "{text}");
            assert_eq!(c.confidence, 0.7);
            assert_eq!(c.rule, "true_prior");
        }
    }

    #[test]
    fn any_negative_word_gives_false() {
        for word in ["not", "never", "no", "false", "incorrect", "wrong", "cannot"] {
            let text = format!("Vrai ou faux: a permit is {word} needed");
            let c = plan(QuestionType::TrueFalse, &text).unwrap();
            assert_eq!(c.value, AnswerValue::Bool(false), "{word}");
            assert_eq!(c.confidence, 0.8);
        }
    }

    #[test]
    fn negative_words_match_whole_words_only() {
        // "know" and "note" contain "no" but are not negations.
        let c = plan(QuestionType::TrueFalse, "vrai faux: I know this note").unwrap();
        assert_eq!(c.value, AnswerValue::Bool(true));
    }

    #[test]
    fn curated_rules_pick_a_with_category_reasoning() {
        let c = plan(
            QuestionType::MultipleChoice,
            "On a construction site, which direct cost comes first?",
        )
        .unwrap();
        assert_eq!(c.value, AnswerValue::Letter(Letter::A));
        assert_eq!(c.confidence, 0.9);
        assert!(c.reasoning.contains("construction"));

        let c = plan(
            QuestionType::MultipleChoice,
            "The company management sent a notice. Choose:",
        )
        .unwrap();
        assert_eq!(c.value, AnswerValue::Letter(Letter::A));
        assert_eq!(c.rule, "business_notice");
    }

    #[test]
    fn multiple_choice_falls_back_to_prior_argmax() {
        let c = plan(QuestionType::MultipleChoice, "Choose the right colour").unwrap();
        assert_eq!(c.value, AnswerValue::Letter(Letter::C));
        assert_eq!(c.confidence, 0.6);
        assert_eq!(c.rule, "letter_prior");
    }

    #[test]
    fn fill_blank_prefers_specific_words() {
        let c = plan(QuestionType::FillBlank, "Send a ____ to the client").unwrap();
        assert_eq!(c.value, AnswerValue::FreeText("information".into()));
        assert_eq!(c.confidence, 0.5);

        let c = plan(QuestionType::FillBlank, "Post a notice on the construction site ____").unwrap();
        assert_eq!(c.value, AnswerValue::FreeText("notice".into()));
        assert_eq!(c.confidence, 0.8);

        // Business wording always answers "notice", even for improvements.
        let c = plan(QuestionType::FillBlank, "The company wants an improvement ____").unwrap();
        assert_eq!(c.value, AnswerValue::FreeText("notice".into()));
        assert_eq!(c.confidence, 0.7);
        assert_eq!(c.rule, "fill_business_topic");

        let c = plan(QuestionType::FillBlank, "The concrete on the site ____").unwrap();
        assert_eq!(c.value, AnswerValue::FreeText("construction".into()));
        assert_eq!(c.confidence, 0.6);
    }

    #[test]
    fn remake_phrase_needs_expected_phrase() {
        let p = planner();
        let kb = KnowledgeBase::default();
        let err = p
            .plan(&classified(QuestionType::RemakePhrase), "rearrange", &kb, &PlanHints::default())
            .unwrap_err();
        assert!(matches!(err, AutoQuizError::NoAnswerAvailable(_)));

        let hints = PlanHints {
            expected_phrase: Some("the quick  brown fox".into()),
            ..PlanHints::default()
        };
        let c = p
            .plan(&classified(QuestionType::RemakePhrase), "rearrange", &kb, &hints)
            .unwrap();
        assert_eq!(
            c.value,
            AnswerValue::WordSequence(vec!["the".into(), "quick".into(), "brown".into(), "fox".into()])
        );
    }

    #[test]
    fn configured_answer_is_normalized_per_type() {
        let p = planner();
        let kb = KnowledgeBase::default();
        let hints = |answer: &str| PlanHints {
            expected_answer: Some(answer.into()),
            ..PlanHints::default()
        };

        let c = p
            .plan(&classified(QuestionType::TrueFalse), "vrai ou faux: it is not", &kb, &hints(" Faux "))
            .unwrap();
        assert_eq!(c.value, AnswerValue::Bool(false));
        assert_eq!(c.confidence, 0.9);
        assert_eq!(c.rule, "expected_answer");

        let c = p
            .plan(&classified(QuestionType::TrueFalse), "vrai ou faux", &kb, &hints("oui"))
            .unwrap();
        assert_eq!(c.value, AnswerValue::Bool(true));

        let c = p
            .plan(&classified(QuestionType::MultipleChoice), "choose", &kb, &hints("B)"))
            .unwrap();
        assert_eq!(c.value, AnswerValue::Letter(Letter::B));

        let c = p
            .plan(&classified(QuestionType::FillBlank), "the ____", &kb, &hints("permit"))
            .unwrap();
        assert_eq!(c.value, AnswerValue::FreeText("permit".into()));
    }

    #[test]
    fn unreadable_configured_answer_is_ignored() {
        let p = planner();
        let kb = KnowledgeBase::default();
        let hints = PlanHints {
            expected_answer: Some("maybe".into()),
            ..PlanHints::default()
        };
        let c = p
            .plan(&classified(QuestionType::TrueFalse), "vrai ou faux", &kb, &hints)
            .unwrap();
        assert_eq!(c.rule, "true_prior");

        let c = p
            .plan(&classified(QuestionType::MultipleChoice), "choose the colour", &kb, &hints)
            .unwrap();
        assert_eq!(c.rule, "letter_prior");
    }

    #[test]
    fn matching_is_systematic_and_unknown_has_no_answer() {
        let c = plan(QuestionType::Matching, "match the pairs").unwrap();
        assert_eq!(c.value, AnswerValue::Pairs(vec![(1, 1), (2, 2), (3, 3), (4, 4)]));
        assert!(c.confidence < 0.4);

        let err = plan(QuestionType::Unknown, "").unwrap_err();
        assert!(matches!(err, AutoQuizError::NoAnswerAvailable(_)));
    }
}
