//! Keyword knowledge base: topic vocabularies and curated answer rules.

use serde::{Deserialize, Serialize};

use crate::analysis::types::{Letter, QuestionType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    Construction,
    Business,
    General,
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Topic::Construction => "construction",
            Topic::Business => "business",
            Topic::General => "general",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RuleAnswer {
    Letter(Letter),
    Text(&'static str),
}

/// One curated rule. Fires when the question type matches, the topic (if
/// any) matches, and the text contains at least one of `any_of` (an empty
/// list always matches).
#[derive(Debug, Clone)]
pub struct KnowledgeRule {
    pub name: &'static str,
    pub question_type: QuestionType,
    pub topic: Option<Topic>,
    pub any_of: &'static [&'static str],
    pub answer: RuleAnswer,
    pub confidence: f64,
    pub reasoning: &'static str,
}

impl KnowledgeRule {
    fn matches(&self, kind: QuestionType, topic: Topic, lowered: &str) -> bool {
        self.question_type == kind
            && self.topic.map_or(true, |t| t == topic)
            && (self.any_of.is_empty() || self.any_of.iter().any(|k| lowered.contains(k)))
    }
}

const CONSTRUCTION_WORDS: &[&str] = &[
    "construction", "building", "site", "materials", "labor", "equipment", "safety", "permit",
    "concrete", "steel",
];

const BUSINESS_WORDS: &[&str] = &[
    "business", "office", "company", "management", "notice", "improvement", "communication",
    "authorization", "document",
];

#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    construction: Vec<&'static str>,
    business: Vec<&'static str>,
    rules: Vec<KnowledgeRule>,
}

impl Default for KnowledgeBase {
    fn default() -> Self {
        Self {
            construction: CONSTRUCTION_WORDS.to_vec(),
            business: BUSINESS_WORDS.to_vec(),
            rules: default_rules(),
        }
    }
}

impl KnowledgeBase {
    /// Highest keyword count wins; a tie (including zero) is `General`.
    pub fn topic_of(&self, lowered: &str) -> Topic {
        let count = |words: &[&str]| words.iter().filter(|w| lowered.contains(*w)).count();
        let construction = count(&self.construction);
        let business = count(&self.business);
        match construction.cmp(&business) {
            std::cmp::Ordering::Greater => Topic::Construction,
            std::cmp::Ordering::Less => Topic::Business,
            std::cmp::Ordering::Equal => Topic::General,
        }
    }

    /// First rule, in declaration order, that fires for this question.
    pub fn first_match(&self, kind: QuestionType, topic: Topic, lowered: &str) -> Option<&KnowledgeRule> {
        self.rules.iter().find(|r| r.matches(kind, topic, lowered))
    }
}

fn default_rules() -> Vec<KnowledgeRule> {
    use QuestionType::{FillBlank, MultipleChoice};
    use Topic::{Business, Construction};

    vec![
        // ── Multiple choice ──────────────────────────────────────────────
        KnowledgeRule {
            name: "construction_costs",
            question_type: MultipleChoice,
            topic: Some(Construction),
            any_of: &["direct", "cost"],
            answer: RuleAnswer::Letter(Letter::A),
            confidence: 0.9,
            reasoning: "construction: direct costs are usually listed first",
        },
        KnowledgeRule {
            name: "construction_safety",
            question_type: MultipleChoice,
            topic: Some(Construction),
            any_of: &["safety", "protection"],
            answer: RuleAnswer::Letter(Letter::A),
            confidence: 0.8,
            reasoning: "construction: safety measures come first",
        },
        KnowledgeRule {
            name: "construction_permit",
            question_type: MultipleChoice,
            topic: Some(Construction),
            any_of: &["permit", "authorization"],
            answer: RuleAnswer::Letter(Letter::A),
            confidence: 0.8,
            reasoning: "construction: permit is required before work starts",
        },
        KnowledgeRule {
            name: "business_notice",
            question_type: MultipleChoice,
            topic: Some(Business),
            any_of: &["notice", "communication"],
            answer: RuleAnswer::Letter(Letter::A),
            confidence: 0.8,
            reasoning: "business: formal notice is the expected communication",
        },
        KnowledgeRule {
            name: "business_improvement",
            question_type: MultipleChoice,
            topic: Some(Business),
            any_of: &["improvement", "better"],
            answer: RuleAnswer::Letter(Letter::A),
            confidence: 0.8,
            reasoning: "business: improvement option listed first",
        },
        // ── Fill in the blank ────────────────────────────────────────────
        KnowledgeRule {
            name: "fill_notice",
            question_type: FillBlank,
            topic: Some(Construction),
            any_of: &["notice", "communication"],
            answer: RuleAnswer::Text("notice"),
            confidence: 0.8,
            reasoning: "construction: communication wording suggests a notice",
        },
        KnowledgeRule {
            name: "fill_improvement",
            question_type: FillBlank,
            topic: Some(Construction),
            any_of: &["improvement", "better"],
            answer: RuleAnswer::Text("improvement"),
            confidence: 0.8,
            reasoning: "construction: enhancement wording suggests an improvement",
        },
        KnowledgeRule {
            name: "fill_construction_topic",
            question_type: FillBlank,
            topic: Some(Construction),
            any_of: &[],
            answer: RuleAnswer::Text("construction"),
            confidence: 0.6,
            reasoning: "construction topic default word",
        },
        KnowledgeRule {
            name: "fill_business_topic",
            question_type: FillBlank,
            topic: Some(Business),
            any_of: &[],
            answer: RuleAnswer::Text("notice"),
            confidence: 0.7,
            reasoning: "business topic default word",
        },
    ]
}
