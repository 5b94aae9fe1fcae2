use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::domain::{BranchTable, Question, QuestionId, QuestionKind};
use super::navigation::{plan_next, plan_unmatched};

const DEFAULT_BRANCH_KEY: &str = "default";
const DEFAULT_RANGE: (f64, f64, f64) = (1.0, 10.0, 1.0);

/// Question row as delivered by the question store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub id: u32,
    pub question_text: String,
    pub question_type: String,
    #[serde(default)]
    pub options: Option<Value>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub next_question_logic: Option<Value>,
    #[serde(default)]
    pub category: Option<String>,
}

impl TryFrom<QuestionRecord> for Question {
    type Error = CatalogError;

    fn try_from(record: QuestionRecord) -> Result<Self, Self::Error> {
        let id = QuestionId(record.id);
        let kind = parse_kind(id, &record.question_type, record.options.as_ref())?;
        let weight = parse_weight(id, record.weight)?;
        let branching = record
            .next_question_logic
            .as_ref()
            .map(|logic| parse_branching(id, logic))
            .transpose()?;

        Ok(Question {
            id,
            text: record.question_text,
            category: record.category,
            kind,
            weight,
            branching,
        })
    }
}

fn parse_kind(
    question_id: QuestionId,
    question_type: &str,
    options: Option<&Value>,
) -> Result<QuestionKind, CatalogError> {
    match question_type.trim().to_ascii_lowercase().as_str() {
        "boolean" => {
            let choices = string_list(question_id, options)?
                .unwrap_or_else(|| vec!["Yes".to_string(), "No".to_string()]);
            if choices.is_empty() {
                return Err(CatalogError::InvalidOptions {
                    question_id,
                    detail: "boolean question lists no choices".to_string(),
                });
            }
            Ok(QuestionKind::Boolean { choices })
        }
        "select" => {
            let options = string_list(question_id, options)?.unwrap_or_default();
            if options.is_empty() {
                return Err(CatalogError::InvalidOptions {
                    question_id,
                    detail: "select question lists no options".to_string(),
                });
            }
            if options.len() == 1 {
                warn!(%question_id, "select question has a single option and will always score 0");
            }
            Ok(QuestionKind::Select { options })
        }
        "range" => {
            let (default_min, default_max, default_step) = DEFAULT_RANGE;
            let min = range_bound(question_id, options, "min")?.unwrap_or(default_min);
            let max = range_bound(question_id, options, "max")?.unwrap_or(default_max);
            let step = range_bound(question_id, options, "step")?.unwrap_or(default_step);
            if max < min {
                return Err(CatalogError::InvalidOptions {
                    question_id,
                    detail: format!("range max {max} is below min {min}"),
                });
            }
            if step <= 0.0 {
                return Err(CatalogError::InvalidOptions {
                    question_id,
                    detail: format!("range step {step} must be positive"),
                });
            }
            if max == min {
                warn!(%question_id, "range question has zero width and will always score 0");
            }
            Ok(QuestionKind::Range { min, max, step })
        }
        other => Err(CatalogError::UnsupportedType {
            question_id,
            question_type: other.to_string(),
        }),
    }
}

fn string_list(
    question_id: QuestionId,
    options: Option<&Value>,
) -> Result<Option<Vec<String>>, CatalogError> {
    let Some(list) = options.and_then(|value| value.get("options")) else {
        return Ok(None);
    };
    let Value::Array(items) = list else {
        return Err(CatalogError::InvalidOptions {
            question_id,
            detail: "options.options must be an array of strings".to_string(),
        });
    };

    items
        .iter()
        .map(|item| match item {
            Value::String(text) => Ok(text.clone()),
            other => Err(CatalogError::InvalidOptions {
                question_id,
                detail: format!("option {other} is not a string"),
            }),
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

fn range_bound(
    question_id: QuestionId,
    options: Option<&Value>,
    key: &str,
) -> Result<Option<f64>, CatalogError> {
    match options.and_then(|value| value.get(key)) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_f64()
            .filter(|bound| bound.is_finite())
            .map(Some)
            .ok_or_else(|| CatalogError::InvalidOptions {
                question_id,
                detail: format!("range {key} must be a number"),
            }),
    }
}

fn parse_weight(question_id: QuestionId, weight: Option<f64>) -> Result<u32, CatalogError> {
    let Some(weight) = weight else {
        return Ok(0);
    };
    if weight < 0.0 || weight.fract() != 0.0 || weight > f64::from(u32::MAX) {
        return Err(CatalogError::InvalidWeight {
            question_id,
            weight,
        });
    }
    Ok(weight as u32)
}

fn parse_branching(question_id: QuestionId, logic: &Value) -> Result<BranchTable, CatalogError> {
    let Value::Object(entries) = logic else {
        return Err(CatalogError::InvalidBranching {
            question_id,
            detail: "next_question_logic must be an object".to_string(),
        });
    };

    let mut routes = BTreeMap::new();
    let mut default = None;
    for (key, target) in entries {
        let target = match target {
            Value::Number(number) => number.as_u64().and_then(|id| u32::try_from(id).ok()),
            Value::String(text) => text.trim().parse::<u32>().ok(),
            _ => None,
        }
        .map(QuestionId)
        .ok_or_else(|| CatalogError::InvalidBranching {
            question_id,
            detail: format!("branch '{key}' does not name a question id"),
        })?;

        if key == DEFAULT_BRANCH_KEY {
            default = Some(target);
        } else {
            routes.insert(key.clone(), target);
        }
    }

    Ok(BranchTable::new(routes, default))
}

/// Validated, id-ordered question set for one session.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionCatalog {
    questions: Vec<Question>,
}

impl QuestionCatalog {
    pub fn from_records(records: Vec<QuestionRecord>) -> Result<Self, CatalogError> {
        let questions = records
            .into_iter()
            .map(Question::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(questions)
    }

    /// Orders by id and rejects empty sets, duplicate ids, and branching cycles.
    pub fn new(mut questions: Vec<Question>) -> Result<Self, CatalogError> {
        if questions.is_empty() {
            return Err(CatalogError::Empty);
        }

        questions.sort_by_key(|question| question.id);
        if let Some(pair) = questions.windows(2).find(|pair| pair[0].id == pair[1].id) {
            return Err(CatalogError::DuplicateId(pair[0].id));
        }

        let known: HashSet<QuestionId> = questions.iter().map(|question| question.id).collect();
        for question in &questions {
            if let Some(table) = &question.branching {
                for target in table.targets().filter(|target| !known.contains(target)) {
                    warn!(
                        question_id = %question.id,
                        %target,
                        "branch target missing from question set; sequential order will be used"
                    );
                }
            }
        }

        if let Some(path) = find_cycle(&questions) {
            return Err(CatalogError::BranchCycle { path });
        }

        Ok(Self { questions })
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    pub fn index_of(&self, id: QuestionId) -> Option<usize> {
        self.questions
            .binary_search_by_key(&id, |question| question.id)
            .ok()
    }

    pub fn question(&self, id: QuestionId) -> Option<&Question> {
        self.index_of(id).map(|index| &self.questions[index])
    }

    /// Highest attainable total, reached when every question scores its full weight.
    pub fn max_score(&self) -> u32 {
        self.questions
            .iter()
            .map(|question| question.weight)
            .fold(0u32, u32::saturating_add)
    }
}

/// Indices reachable in one step from `index`.
fn successors(questions: &[Question], index: usize) -> Vec<usize> {
    let question = &questions[index];
    let mut next: Vec<usize> = match (&question.kind, &question.branching) {
        (_, None) => plan_unmatched(questions, index).next_index.into_iter().collect(),
        (kind, Some(table)) => match kind.choices() {
            Some(choices) => choices
                .iter()
                .filter_map(|choice| plan_next(questions, index, choice).next_index)
                .collect(),
            None => table
                .routes()
                .filter_map(|(key, _)| plan_next(questions, index, key).next_index)
                .chain(plan_unmatched(questions, index).next_index)
                .collect(),
        },
    };
    next.sort_unstable();
    next.dedup();
    next
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    Unseen,
    OnPath,
    Done,
}

fn find_cycle(questions: &[Question]) -> Option<Vec<QuestionId>> {
    let mut marks = vec![Visit::Unseen; questions.len()];
    let mut path = Vec::new();
    (0..questions.len()).find_map(|start| {
        if marks[start] == Visit::Unseen {
            visit(questions, start, &mut marks, &mut path)
        } else {
            None
        }
    })
}

fn visit(
    questions: &[Question],
    index: usize,
    marks: &mut [Visit],
    path: &mut Vec<usize>,
) -> Option<Vec<QuestionId>> {
    marks[index] = Visit::OnPath;
    path.push(index);

    for next in successors(questions, index) {
        match marks[next] {
            Visit::OnPath => {
                let start = path.iter().position(|&entry| entry == next).unwrap_or(0);
                let mut cycle: Vec<QuestionId> =
                    path[start..].iter().map(|&entry| questions[entry].id).collect();
                cycle.push(questions[next].id);
                return Some(cycle);
            }
            Visit::Unseen => {
                if let Some(cycle) = visit(questions, next, marks, path) {
                    return Some(cycle);
                }
            }
            Visit::Done => {}
        }
    }

    path.pop();
    marks[index] = Visit::Done;
    None
}

/// Reasons a question set cannot back a quiz session.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CatalogError {
    #[error("question set is empty")]
    Empty,
    #[error("duplicate question id {0}")]
    DuplicateId(QuestionId),
    #[error("question {question_id}: unsupported question type '{question_type}'")]
    UnsupportedType {
        question_id: QuestionId,
        question_type: String,
    },
    #[error("question {question_id}: {detail}")]
    InvalidOptions {
        question_id: QuestionId,
        detail: String,
    },
    #[error("question {question_id}: weight must be a non-negative integer (got {weight})")]
    InvalidWeight { question_id: QuestionId, weight: f64 },
    #[error("question {question_id}: {detail}")]
    InvalidBranching {
        question_id: QuestionId,
        detail: String,
    },
    #[error("branching logic forms a cycle: {}", join_path(.path))]
    BranchCycle { path: Vec<QuestionId> },
}

fn join_path(path: &[QuestionId]) -> String {
    path.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}
