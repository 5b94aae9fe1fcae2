use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identifier and ordering key of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(pub u32);

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier wrapper for in-flight quiz sessions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque identity issued by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

/// A single quiz item, immutable for the duration of a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Question {
    pub id: QuestionId,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(flatten)]
    pub kind: QuestionKind,
    pub weight: u32,
    #[serde(skip)]
    pub branching: Option<BranchTable>,
}

/// Answer shape of a question, with its type-specific payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "question_type", rename_all = "snake_case")]
pub enum QuestionKind {
    Boolean { choices: Vec<String> },
    Range { min: f64, max: f64, step: f64 },
    Select { options: Vec<String> },
}

impl QuestionKind {
    pub fn label(&self) -> &'static str {
        match self {
            QuestionKind::Boolean { .. } => "boolean",
            QuestionKind::Range { .. } => "range",
            QuestionKind::Select { .. } => "select",
        }
    }

    /// Finite answer set, if the kind has one.
    pub fn choices(&self) -> Option<&[String]> {
        match self {
            QuestionKind::Boolean { choices } => Some(choices),
            QuestionKind::Select { options } => Some(options),
            QuestionKind::Range { .. } => None,
        }
    }
}

impl Question {
    /// Checks that `value` is something this question could have been answered with.
    pub fn validate_answer(&self, value: &AnswerValue) -> Result<(), AnswerError> {
        match &self.kind {
            QuestionKind::Range { min, max, step } => {
                let number = match value {
                    AnswerValue::Number(number) => *number,
                    AnswerValue::Text(_) => {
                        return Err(AnswerError::ExpectedNumber {
                            question_id: self.id,
                        })
                    }
                };
                if !number.is_finite() || number < *min || number > *max {
                    return Err(AnswerError::OutOfRange {
                        question_id: self.id,
                        value: number,
                        min: *min,
                        max: *max,
                    });
                }
                let steps = (number - min) / step;
                if (steps - steps.round()).abs() > 1e-9 {
                    return Err(AnswerError::OffStep {
                        question_id: self.id,
                        value: number,
                        step: *step,
                    });
                }
                Ok(())
            }
            QuestionKind::Boolean { choices } | QuestionKind::Select { options: choices } => {
                let text = value.as_text().ok_or_else(|| AnswerError::ExpectedText {
                    question_id: self.id,
                })?;
                if choices.iter().any(|choice| choice == text) {
                    Ok(())
                } else {
                    Err(AnswerError::UnknownChoice {
                        question_id: self.id,
                        value: text.to_string(),
                    })
                }
            }
        }
    }
}

/// Explicit answer → target routing with an optional fallback target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchTable {
    routes: BTreeMap<String, QuestionId>,
    default: Option<QuestionId>,
}

impl BranchTable {
    pub fn new(routes: BTreeMap<String, QuestionId>, default: Option<QuestionId>) -> Self {
        Self { routes, default }
    }

    pub fn route(&self, answer: &str) -> Option<QuestionId> {
        self.routes.get(answer).copied()
    }

    pub fn default_target(&self) -> Option<QuestionId> {
        self.default
    }

    /// The explicit entry for `answer`, else the default entry.
    pub fn target_for(&self, answer: &str) -> Option<QuestionId> {
        self.route(answer).or(self.default)
    }

    pub fn routes(&self) -> impl Iterator<Item = (&str, QuestionId)> + '_ {
        self.routes.iter().map(|(key, id)| (key.as_str(), *id))
    }

    pub fn targets(&self) -> impl Iterator<Item = QuestionId> + '_ {
        self.routes.values().copied().chain(self.default)
    }
}

/// A recorded answer: text for boolean/select questions, a number for range questions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Number(f64),
    Text(String),
}

impl AnswerValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            AnswerValue::Text(text) => Some(text),
            AnswerValue::Number(_) => None,
        }
    }

    /// Numbers, or text that parses as one.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            AnswerValue::Number(number) => Some(*number),
            AnswerValue::Text(text) => text.trim().parse().ok(),
        }
    }
}

impl fmt::Display for AnswerValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnswerValue::Number(number) => write!(f, "{number}"),
            AnswerValue::Text(text) => f.write_str(text),
        }
    }
}

impl From<&str> for AnswerValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<f64> for AnswerValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

/// Answers recorded during one session, keyed by question.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Responses(BTreeMap<QuestionId, AnswerValue>);

impl Responses {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, question_id: QuestionId, value: AnswerValue) {
        self.0.insert(question_id, value);
    }

    pub fn get(&self, question_id: QuestionId) -> Option<&AnswerValue> {
        self.0.get(&question_id)
    }

    pub fn contains(&self, question_id: QuestionId) -> bool {
        self.0.contains_key(&question_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (QuestionId, &AnswerValue)> + '_ {
        self.0.iter().map(|(id, value)| (*id, value))
    }
}

impl FromIterator<(QuestionId, AnswerValue)> for Responses {
    fn from_iter<I: IntoIterator<Item = (QuestionId, AnswerValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Score band mapped to a qualitative risk level and dietary advice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    pub risk_level: String,
    pub min_score: u32,
    pub max_score: u32,
    pub advice: String,
    #[serde(default)]
    pub foods_to_eat: Vec<String>,
    #[serde(default)]
    pub foods_to_avoid: Vec<String>,
}

impl RiskAssessment {
    /// Inclusive on both bounds.
    pub fn contains(&self, score: u32) -> bool {
        self.min_score <= score && score <= self.max_score
    }

    pub fn tone(&self) -> RiskTone {
        match self.risk_level.trim().to_ascii_lowercase().as_str() {
            "low" => RiskTone::Low,
            "moderate" => RiskTone::Moderate,
            "high" => RiskTone::High,
            _ => RiskTone::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTone {
    Low,
    Moderate,
    High,
    Other,
}

/// Reasons an answer is refused before it is recorded.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnswerError {
    #[error("question {question_id} expects a numeric answer")]
    ExpectedNumber { question_id: QuestionId },
    #[error("question {question_id} expects one of its listed choices")]
    ExpectedText { question_id: QuestionId },
    #[error("answer {value} to question {question_id} is outside [{min}, {max}]")]
    OutOfRange {
        question_id: QuestionId,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("answer {value} to question {question_id} is not a multiple of step {step}")]
    OffStep {
        question_id: QuestionId,
        value: f64,
        step: f64,
    },
    #[error("'{value}' is not a choice of question {question_id}")]
    UnknownChoice { question_id: QuestionId, value: String },
}
