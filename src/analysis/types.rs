use serde::{Deserialize, Serialize};

/// Structural category of an on-screen question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    TrueFalse,
    MultipleChoice,
    FillBlank,
    RemakePhrase,
    Matching,
    Unknown,
}

impl std::fmt::Display for QuestionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            QuestionType::TrueFalse => "true/false",
            QuestionType::MultipleChoice => "multiple choice",
            QuestionType::FillBlank => "fill in the blank",
            QuestionType::RemakePhrase => "remake phrase",
            QuestionType::Matching => "matching",
            QuestionType::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    TextPattern,
    VisualLayout,
    Combined,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub question_type: QuestionType,
    pub confidence: f64,
    pub source: Source,
}

impl ClassificationResult {
    pub fn new(question_type: QuestionType, confidence: f64, source: Source) -> Self {
        Self {
            question_type,
            confidence: confidence.clamp(0.0, 1.0),
            source,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Letter {
    A,
    B,
    C,
    D,
}

impl Letter {
    pub const ALL: [Letter; 4] = [Letter::A, Letter::B, Letter::C, Letter::D];

    /// Accepts `a`, `B`, `c)` and `D)` forms.
    pub fn parse(raw: &str) -> Option<Letter> {
        let trimmed = raw.trim();
        let trimmed = trimmed.strip_suffix(')').unwrap_or(trimmed).trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "a" => Some(Letter::A),
            "b" => Some(Letter::B),
            "c" => Some(Letter::C),
            "d" => Some(Letter::D),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Letter::A => 'a',
            Letter::B => 'b',
            Letter::C => 'c',
            Letter::D => 'd',
        }
    }
}

impl std::fmt::Display for Letter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Normalize a textual true/false answer.
pub fn parse_bool_answer(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "vrai" | "yes" | "oui" | "correct" | "1" => Some(true),
        "false" | "faux" | "no" | "non" | "incorrect" | "0" => Some(false),
        _ => None,
    }
}

/// Prior frequency of each answer letter, used when nothing better is known.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LetterPrior {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
}

impl Default for LetterPrior {
    fn default() -> Self {
        Self {
            a: 0.30,
            b: 0.20,
            c: 0.35,
            d: 0.15,
        }
    }
}

impl LetterPrior {
    pub fn weight(&self, letter: Letter) -> f64 {
        match letter {
            Letter::A => self.a,
            Letter::B => self.b,
            Letter::C => self.c,
            Letter::D => self.d,
        }
    }

    /// Most likely letter; the earliest letter wins a tie.
    pub fn argmax(&self) -> Letter {
        Letter::ALL
            .into_iter()
            .fold(Letter::A, |best, l| if self.weight(l) > self.weight(best) { l } else { best })
    }
}

/// A planned answer. The variant determines the question type it answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AnswerValue {
    Letter(Letter),
    Bool(bool),
    FreeText(String),
    WordSequence(Vec<String>),
    /// 1-based (left, right) item indices.
    Pairs(Vec<(u32, u32)>),
}

impl AnswerValue {
    pub fn question_type(&self) -> QuestionType {
        match self {
            AnswerValue::Letter(_) => QuestionType::MultipleChoice,
            AnswerValue::Bool(_) => QuestionType::TrueFalse,
            AnswerValue::FreeText(_) => QuestionType::FillBlank,
            AnswerValue::WordSequence(_) => QuestionType::RemakePhrase,
            AnswerValue::Pairs(_) => QuestionType::Matching,
        }
    }
}

impl std::fmt::Display for AnswerValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnswerValue::Letter(l) => write!(f, "{l}"),
            AnswerValue::Bool(b) => write!(f, "{}", if *b { "true" } else { "false" }),
            AnswerValue::FreeText(t) => write!(f, "\"{t}\""),
            AnswerValue::WordSequence(words) => write!(f, "[{}]", words.join(" ")),
            AnswerValue::Pairs(pairs) => {
                let parts: Vec<String> = pairs.iter().map(|(l, r)| format!("{l}-{r}")).collect();
                write!(f, "{}", parts.join(", "))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerCandidate {
    pub value: AnswerValue,
    pub confidence: f64,
    pub reasoning: String,
    /// Name of the rule that produced this candidate.
    pub rule: String,
}

impl AnswerCandidate {
    pub fn question_type(&self) -> QuestionType {
        self.value.question_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_accept_parenthesized_and_upper_case() {
        assert_eq!(Letter::parse("A)"), Some(Letter::A));
        assert_eq!(Letter::parse(" c "), Some(Letter::C));
        assert_eq!(Letter::parse("e"), None);
    }

    #[test]
    fn bool_answers_normalize_french_and_digits() {
        assert_eq!(parse_bool_answer("Vrai"), Some(true));
        assert_eq!(parse_bool_answer("0"), Some(false));
        assert_eq!(parse_bool_answer("non"), Some(false));
        assert_eq!(parse_bool_answer("maybe"), None);
    }

    #[test]
    fn default_prior_prefers_c() {
        assert_eq!(LetterPrior::default().argmax(), Letter::C);
        let flat = LetterPrior { a: 0.25, b: 0.25, c: 0.25, d: 0.25 };
        assert_eq!(flat.argmax(), Letter::A);
    }

    #[test]
    fn value_variant_decides_question_type() {
        assert_eq!(AnswerValue::Bool(true).question_type(), QuestionType::TrueFalse);
        assert_eq!(
            AnswerValue::WordSequence(vec!["a".into()]).question_type(),
            QuestionType::RemakePhrase
        );
        assert_eq!(AnswerValue::Pairs(vec![(1, 1)]).question_type(), QuestionType::Matching);
    }
}
