//! Next-question routing.
//!
//! A question without branching logic advances to the next question in id order. With
//! branching logic, the answer's own entry wins, then the `default` entry, then sequential
//! order. A target id missing from the question set is reported and treated as sequential
//! order. Running past the last question completes the quiz.

use serde::Serialize;
use tracing::warn;

use super::domain::{AnswerValue, Question, QuestionId};

/// Data-integrity problem found while routing, recovered by sequential advance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NavigationWarning {
    TargetNotFound {
        question_id: QuestionId,
        target: QuestionId,
    },
}

/// Routing decision for one answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    /// `None` once the quiz is complete.
    pub next_index: Option<usize>,
    pub warning: Option<NavigationWarning>,
}

/// Index of the question that follows `questions[current_index]` answered with `answer`.
pub fn resolve_next(
    questions: &[Question],
    current_index: usize,
    answer: &AnswerValue,
) -> Option<usize> {
    let navigation = plan_next(questions, current_index, &answer.to_string());
    if let Some(NavigationWarning::TargetNotFound {
        question_id,
        target,
    }) = &navigation.warning
    {
        warn!(
            %question_id,
            %target,
            "branch target missing from question set; advancing sequentially"
        );
    }
    navigation.next_index
}

pub(crate) fn plan_next(
    questions: &[Question],
    current_index: usize,
    answer_key: &str,
) -> Navigation {
    let target = questions
        .get(current_index)
        .and_then(|question| question.branching.as_ref())
        .and_then(|table| table.target_for(answer_key));
    plan_towards(questions, current_index, target)
}

/// Routing for an answer that matches no explicit branch entry.
pub(crate) fn plan_unmatched(questions: &[Question], current_index: usize) -> Navigation {
    let target = questions
        .get(current_index)
        .and_then(|question| question.branching.as_ref())
        .and_then(|table| table.default_target());
    plan_towards(questions, current_index, target)
}

fn plan_towards(
    questions: &[Question],
    current_index: usize,
    target: Option<QuestionId>,
) -> Navigation {
    let Some(question) = questions.get(current_index) else {
        return Navigation {
            next_index: None,
            warning: None,
        };
    };

    let sequential = current_index + 1;
    let (candidate, warning) = match target {
        None => (sequential, None),
        Some(target) => match questions.iter().position(|candidate| candidate.id == target) {
            Some(index) => (index, None),
            None => (
                sequential,
                Some(NavigationWarning::TargetNotFound {
                    question_id: question.id,
                    target,
                }),
            ),
        },
    };

    Navigation {
        next_index: (candidate < questions.len()).then_some(candidate),
        warning,
    }
}
