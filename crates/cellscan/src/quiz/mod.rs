//! Branching risk-assessment questionnaire.
//!
//! Questions come from a [`QuestionStore`] and are validated into a [`QuestionCatalog`]
//! before a session may start. Each answer is checked against its question, recorded, and
//! routed to the next question; once routing runs off the end, the answers are scored,
//! written to the [`ResponseSink`], and the score is matched against the bands from the
//! [`RiskBandStore`].

pub mod catalog;
pub mod domain;
pub mod navigation;
pub mod repository;
pub mod risk;
pub mod router;
pub mod scoring;
pub mod service;
pub mod session;

#[cfg(test)]
mod tests;

pub use catalog::{CatalogError, QuestionCatalog, QuestionRecord};
pub use domain::{
    AnswerError, AnswerValue, BranchTable, Question, QuestionId, QuestionKind, Responses,
    RiskAssessment, RiskTone, SessionId, UserId,
};
pub use navigation::{resolve_next, NavigationWarning};
pub use repository::{
    PersistenceError, QuestionLoadError, QuestionStore, ResponseBatch, ResponseSink,
    RiskBandLoadError, RiskBandStore, StoredResponse,
};
pub use risk::{resolve_risk, BandPolicy, RiskBandTable, RiskResolutionError, RiskTableError};
pub use router::quiz_router;
pub use scoring::{compute_score, ScoreCard, ScoreComponent, ScoreWarning};
pub use service::{QuizService, QuizServiceError};
pub use session::{
    Progress, QuizOutcome, QuizSession, RiskResolution, SessionError, SessionState, SessionView,
    SessionWarning, Step,
};
