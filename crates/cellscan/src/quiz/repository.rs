use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::catalog::QuestionRecord;
use super::domain::{QuestionId, Responses, RiskAssessment, SessionId, UserId};

/// Read-only source of question records, fetched once per session start.
pub trait QuestionStore: Send + Sync {
    fn load_questions(&self) -> Result<Vec<QuestionRecord>, QuestionLoadError>;
}

/// Read-only source of risk bands, fetched after the score is known.
pub trait RiskBandStore: Send + Sync {
    fn load_bands(&self) -> Result<Vec<RiskAssessment>, RiskBandLoadError>;
}

/// Durable destination for a finished session's raw answers.
pub trait ResponseSink: Send + Sync {
    fn store(&self, batch: &ResponseBatch) -> Result<(), PersistenceError>;
}

/// One persisted answer; every value is stored as a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredResponse {
    pub question_id: QuestionId,
    pub response: String,
}

/// All answers of a completed session, written once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseBatch {
    pub user_id: UserId,
    pub session_id: SessionId,
    pub submitted_at: DateTime<Utc>,
    pub responses: Vec<StoredResponse>,
}

impl ResponseBatch {
    pub fn new(
        user_id: UserId,
        session_id: SessionId,
        responses: &Responses,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        let responses = responses
            .iter()
            .map(|(question_id, value)| StoredResponse {
                question_id,
                response: value.to_string(),
            })
            .collect();

        Self {
            user_id,
            session_id,
            submitted_at,
            responses,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum QuestionLoadError {
    #[error("question store unavailable: {0}")]
    Unavailable(String),
    #[error("question store returned malformed data: {0}")]
    Malformed(String),
}

#[derive(Debug, thiserror::Error)]
pub enum RiskBandLoadError {
    #[error("risk band store unavailable: {0}")]
    Unavailable(String),
    #[error("risk band store returned malformed data: {0}")]
    Malformed(String),
}

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("response store unavailable: {0}")]
    Unavailable(String),
    #[error("response store rejected the batch: {0}")]
    Rejected(String),
}
