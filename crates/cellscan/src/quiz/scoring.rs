use serde::{Deserialize, Serialize};
use tracing::warn;

use super::domain::{AnswerValue, Question, QuestionId, QuestionKind, Responses};

const AFFIRMATIVE: &str = "Yes";

/// Discrete contribution of one answered question, kept for transparent audits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub question_id: QuestionId,
    pub contribution: u32,
    pub notes: String,
}

/// Answer that could not be normalized; it contributes 0.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScoreWarning {
    DegenerateRange {
        question_id: QuestionId,
        min: f64,
        max: f64,
    },
    DegenerateSelect {
        question_id: QuestionId,
        option_count: usize,
    },
    UnknownOption {
        question_id: QuestionId,
        value: String,
    },
    MismatchedValue {
        question_id: QuestionId,
        expected: &'static str,
    },
}

/// Total plus the per-question trail that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreCard {
    pub total: u32,
    pub components: Vec<ScoreComponent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ScoreWarning>,
}

/// Sums the rounded contribution of every answered question; unanswered ones add nothing.
pub fn compute_score(questions: &[Question], responses: &Responses) -> ScoreCard {
    let mut total: u32 = 0;
    let mut components = Vec::new();
    let mut warnings = Vec::new();

    for question in questions {
        let Some(value) = responses.get(question.id) else {
            continue;
        };

        let (contribution, notes) = match contribution(question, value) {
            Ok(scored) => scored,
            Err(warning) => {
                warn!(question_id = %question.id, ?warning, "answer scored as 0");
                let notes = format!("not scored: {}", describe(&warning));
                warnings.push(warning);
                (0, notes)
            }
        };

        total = total.saturating_add(contribution);
        components.push(ScoreComponent {
            question_id: question.id,
            contribution,
            notes,
        });
    }

    ScoreCard {
        total,
        components,
        warnings,
    }
}

fn contribution(question: &Question, value: &AnswerValue) -> Result<(u32, String), ScoreWarning> {
    let weight = question.weight;
    match &question.kind {
        QuestionKind::Boolean { .. } => {
            let answer = value.as_text().ok_or(ScoreWarning::MismatchedValue {
                question_id: question.id,
                expected: "text",
            })?;
            if answer == AFFIRMATIVE {
                Ok((weight, format!("answered '{answer}', full weight {weight}")))
            } else {
                Ok((0, format!("answered '{answer}'")))
            }
        }
        QuestionKind::Range { min, max, .. } => {
            if max <= min {
                return Err(ScoreWarning::DegenerateRange {
                    question_id: question.id,
                    min: *min,
                    max: *max,
                });
            }
            let number = value.as_number().ok_or(ScoreWarning::MismatchedValue {
                question_id: question.id,
                expected: "number",
            })?;
            let normalized = ((number - min) / (max - min)).clamp(0.0, 1.0);
            let scored = round_half_up(normalized * f64::from(weight));
            Ok((
                scored,
                format!("{number} on [{min}, {max}] normalized to {normalized:.3}"),
            ))
        }
        QuestionKind::Select { options } => {
            if options.len() < 2 {
                return Err(ScoreWarning::DegenerateSelect {
                    question_id: question.id,
                    option_count: options.len(),
                });
            }
            let answer = value.as_text().ok_or(ScoreWarning::MismatchedValue {
                question_id: question.id,
                expected: "text",
            })?;
            let index = options
                .iter()
                .position(|option| option == answer)
                .ok_or_else(|| ScoreWarning::UnknownOption {
                    question_id: question.id,
                    value: answer.to_string(),
                })?;
            let fraction = index as f64 / (options.len() - 1) as f64;
            let scored = round_half_up(fraction * f64::from(weight));
            Ok((
                scored,
                format!("'{answer}' is option {} of {}", index + 1, options.len()),
            ))
        }
    }
}

/// Half-up rounding of a non-negative product.
fn round_half_up(value: f64) -> u32 {
    (value + 0.5).floor() as u32
}

fn describe(warning: &ScoreWarning) -> String {
    match warning {
        ScoreWarning::DegenerateRange { min, max, .. } => {
            format!("range [{min}, {max}] has no width")
        }
        ScoreWarning::DegenerateSelect { option_count, .. } => {
            format!("select lists {option_count} option(s)")
        }
        ScoreWarning::UnknownOption { value, .. } => format!("'{value}' is not an option"),
        ScoreWarning::MismatchedValue { expected, .. } => format!("expected a {expected} answer"),
    }
}
