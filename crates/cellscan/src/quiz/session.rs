use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use super::catalog::QuestionCatalog;
use super::domain::{
    AnswerError, AnswerValue, Question, QuestionId, Responses, RiskAssessment, RiskTone,
    SessionId, UserId,
};
use super::navigation::{plan_next, NavigationWarning};
use super::scoring::{compute_score, ScoreCard, ScoreComponent, ScoreWarning};

/// Lifecycle of a session: answering, then scoring and band lookup, then done.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    InProgress { current_index: usize },
    PendingCompletion,
    Completed(QuizOutcome),
}

impl SessionState {
    pub fn label(&self) -> &'static str {
        match self {
            SessionState::InProgress { .. } => "in_progress",
            SessionState::PendingCompletion => "pending_completion",
            SessionState::Completed(_) => "completed",
        }
    }
}

/// Outcome of the risk-band lookup for a final score.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RiskResolution {
    Assessed {
        assessment: RiskAssessment,
        tone: RiskTone,
    },
    Unavailable {
        reason: String,
    },
}

impl RiskResolution {
    pub fn assessed(assessment: RiskAssessment) -> Self {
        let tone = assessment.tone();
        Self::Assessed { assessment, tone }
    }

    pub fn assessment(&self) -> Option<&RiskAssessment> {
        match self {
            RiskResolution::Assessed { assessment, .. } => Some(assessment),
            RiskResolution::Unavailable { .. } => None,
        }
    }
}

/// Non-fatal problem surfaced alongside a completed session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "source", content = "detail", rename_all = "snake_case")]
pub enum SessionWarning {
    Navigation(NavigationWarning),
    Scoring(ScoreWarning),
    Persistence { reason: String },
}

/// Final score and assessment handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizOutcome {
    pub score: u32,
    pub breakdown: Vec<ScoreComponent>,
    pub risk: RiskResolution,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<SessionWarning>,
    pub completed_at: DateTime<Utc>,
}

/// "Question `position` of `total`", plus how many answers are on record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub position: usize,
    pub total: usize,
    pub answered: usize,
}

/// Result of recording one answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Next { index: usize, question_id: QuestionId },
    Finished,
}

/// One user's pass through the quiz.
#[derive(Debug, Clone)]
pub struct QuizSession {
    id: SessionId,
    user_id: UserId,
    catalog: Arc<QuestionCatalog>,
    responses: Responses,
    warnings: Vec<SessionWarning>,
    state: SessionState,
    started_at: DateTime<Utc>,
}

impl QuizSession {
    pub fn new(id: SessionId, user_id: UserId, catalog: Arc<QuestionCatalog>) -> Self {
        Self {
            id,
            user_id,
            catalog,
            responses: Responses::new(),
            warnings: Vec::new(),
            state: SessionState::InProgress { current_index: 0 },
            started_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn catalog(&self) -> &QuestionCatalog {
        &self.catalog
    }

    pub fn responses(&self) -> &Responses {
        &self.responses
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn current_question(&self) -> Option<&Question> {
        match self.state {
            SessionState::InProgress { current_index } => self.catalog.get(current_index),
            _ => None,
        }
    }

    pub fn outcome(&self) -> Option<&QuizOutcome> {
        match &self.state {
            SessionState::Completed(outcome) => Some(outcome),
            _ => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.state, SessionState::Completed(_))
    }

    pub fn progress(&self) -> Progress {
        let total = self.catalog.len();
        let position = match self.state {
            SessionState::InProgress { current_index } => current_index + 1,
            _ => total,
        };
        Progress {
            position,
            total,
            answered: self.responses.len(),
        }
    }

    /// Records the answer to the current question and routes to the next one.
    pub fn answer(
        &mut self,
        question_id: QuestionId,
        value: AnswerValue,
    ) -> Result<Step, SessionError> {
        let current_index = match self.state {
            SessionState::InProgress { current_index } => current_index,
            SessionState::PendingCompletion => return Err(SessionError::AwaitingCompletion),
            SessionState::Completed(_) => return Err(SessionError::AlreadyCompleted),
        };
        let question = self
            .catalog
            .get(current_index)
            .ok_or(SessionError::AwaitingCompletion)?;

        if question.id != question_id {
            return Err(SessionError::UnexpectedQuestion {
                expected: question.id,
                received: question_id,
            });
        }
        if self.responses.contains(question_id) {
            return Err(SessionError::AlreadyAnswered(question_id));
        }
        question.validate_answer(&value)?;

        let navigation = plan_next(self.catalog.questions(), current_index, &value.to_string());
        if let Some(warning) = navigation.warning {
            let NavigationWarning::TargetNotFound {
                question_id,
                target,
            } = &warning;
            warn!(
                session_id = %self.id,
                %question_id,
                %target,
                "branch target missing from question set; advancing sequentially"
            );
            self.warnings.push(SessionWarning::Navigation(warning));
        }

        self.responses.record(question_id, value);

        match navigation.next_index {
            Some(index) => {
                self.state = SessionState::InProgress {
                    current_index: index,
                };
                let next_id = self.catalog.questions()[index].id;
                debug!(session_id = %self.id, from = %question_id, to = %next_id, "advanced");
                Ok(Step::Next {
                    index,
                    question_id: next_id,
                })
            }
            None => {
                self.state = SessionState::PendingCompletion;
                debug!(session_id = %self.id, answered = self.responses.len(), "no next question");
                Ok(Step::Finished)
            }
        }
    }

    /// Score of the recorded answers; available once answering is over.
    pub fn score(&self) -> Result<ScoreCard, SessionError> {
        match self.state {
            SessionState::InProgress { .. } => Err(SessionError::NotFinished),
            _ => Ok(compute_score(self.catalog.questions(), &self.responses)),
        }
    }

    /// Moves a pending session to `Completed`.
    pub fn complete(
        &mut self,
        card: ScoreCard,
        risk: RiskResolution,
        extra_warnings: Vec<SessionWarning>,
        completed_at: DateTime<Utc>,
    ) -> Result<&QuizOutcome, SessionError> {
        match self.state {
            SessionState::PendingCompletion => {}
            SessionState::InProgress { .. } => return Err(SessionError::NotFinished),
            SessionState::Completed(_) => return Err(SessionError::AlreadyCompleted),
        }

        let mut warnings = std::mem::take(&mut self.warnings);
        warnings.extend(extra_warnings);

        self.state = SessionState::Completed(QuizOutcome {
            score: card.total,
            breakdown: card.components,
            risk,
            warnings,
            completed_at,
        });

        match &self.state {
            SessionState::Completed(outcome) => Ok(outcome),
            _ => Err(SessionError::NotFinished),
        }
    }

    /// Back to the first question with nothing recorded; allowed from any state.
    pub fn reset(&mut self) {
        self.responses = Responses::new();
        self.warnings.clear();
        self.state = SessionState::InProgress { current_index: 0 };
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            session_id: self.id.clone(),
            user_id: self.user_id.clone(),
            status: self.state.label(),
            progress: self.progress(),
            current_question: self.current_question().cloned(),
            outcome: self.outcome().cloned(),
        }
    }
}

/// Serializable snapshot of a session for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub status: &'static str,
    pub progress: Progress,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_question: Option<Question>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<QuizOutcome>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error("quiz session is already completed")]
    AlreadyCompleted,
    #[error("quiz session is waiting for its score to be finalized")]
    AwaitingCompletion,
    #[error("quiz session still has unanswered questions")]
    NotFinished,
    #[error("expected an answer to question {expected}, got question {received}")]
    UnexpectedQuestion {
        expected: QuestionId,
        received: QuestionId,
    },
    #[error("question {0} has already been answered in this session")]
    AlreadyAnswered(QuestionId),
    #[error(transparent)]
    InvalidAnswer(#[from] AnswerError),
}
