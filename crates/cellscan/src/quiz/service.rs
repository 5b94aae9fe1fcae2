use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error, info, warn};

use super::catalog::{CatalogError, QuestionCatalog};
use super::domain::{AnswerValue, QuestionId, RiskAssessment, SessionId, UserId};
use super::repository::{
    QuestionLoadError, QuestionStore, ResponseBatch, ResponseSink, RiskBandLoadError,
    RiskBandStore,
};
use super::risk::{BandPolicy, RiskResolutionError, RiskTableError};
use super::session::{QuizSession, RiskResolution, SessionError, SessionView, SessionWarning, Step};

/// Service composing the question store, band store, response sink, and live sessions.
pub struct QuizService<Q, B, S> {
    questions: Arc<Q>,
    bands: Arc<B>,
    sink: Arc<S>,
    band_policy: BandPolicy,
    completed_ttl: Option<Duration>,
    sessions: Mutex<HashMap<SessionId, Arc<Mutex<QuizSession>>>>,
}

static SESSION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_session_id() -> SessionId {
    let id = SESSION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    SessionId(format!("quiz-{id:06}"))
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<Q, B, S> QuizService<Q, B, S>
where
    Q: QuestionStore + 'static,
    B: RiskBandStore + 'static,
    S: ResponseSink + 'static,
{
    pub fn new(questions: Arc<Q>, bands: Arc<B>, sink: Arc<S>) -> Self {
        Self {
            questions,
            bands,
            sink,
            band_policy: BandPolicy::Strict,
            completed_ttl: None,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_band_policy(mut self, band_policy: BandPolicy) -> Self {
        self.band_policy = band_policy;
        self
    }

    /// Completed sessions older than `ttl` are dropped whenever a new session starts.
    pub fn with_completed_ttl(mut self, ttl: Duration) -> Self {
        self.completed_ttl = Some(ttl);
        self
    }

    /// Loads the question set and opens a session at the first question.
    pub fn start(&self, user_id: UserId) -> Result<SessionView, QuizServiceError> {
        self.evict_expired();
        let records = self.questions.load_questions()?;
        let catalog = QuestionCatalog::from_records(records)?;

        let session = QuizSession::new(next_session_id(), user_id, Arc::new(catalog));
        info!(
            session_id = %session.id(),
            questions = session.catalog().len(),
            "quiz session started"
        );

        let view = session.view();
        lock(&self.sessions).insert(session.id().clone(), Arc::new(Mutex::new(session)));
        Ok(view)
    }

    /// Records an answer; the final answer also scores, persists, and assesses the session.
    pub fn answer(
        &self,
        session_id: &SessionId,
        question_id: QuestionId,
        value: AnswerValue,
    ) -> Result<SessionView, QuizServiceError> {
        let handle = self.handle(session_id)?;
        let mut session = lock(&handle);

        if let Step::Finished = session.answer(question_id, value)? {
            self.finish(&mut session)?;
        }

        Ok(session.view())
    }

    pub fn reset(&self, session_id: &SessionId) -> Result<SessionView, QuizServiceError> {
        let handle = self.handle(session_id)?;
        let mut session = lock(&handle);
        session.reset();
        info!(%session_id, "quiz session reset");
        Ok(session.view())
    }

    pub fn get(&self, session_id: &SessionId) -> Result<SessionView, QuizServiceError> {
        let handle = self.handle(session_id)?;
        let session = lock(&handle);
        Ok(session.view())
    }

    /// Drops an in-memory session; nothing external needs undoing.
    pub fn abandon(&self, session_id: &SessionId) -> Result<(), QuizServiceError> {
        lock(&self.sessions)
            .remove(session_id)
            .map(|_| ())
            .ok_or_else(|| QuizServiceError::SessionNotFound(session_id.clone()))
    }

    /// Removes completed sessions past the configured TTL and returns how many went.
    /// Sessions busy with an answer are left for the next sweep.
    pub fn evict_expired(&self) -> usize {
        let Some(ttl) = self.completed_ttl else {
            return 0;
        };
        let now = Utc::now();

        let mut sessions = lock(&self.sessions);
        let before = sessions.len();
        sessions.retain(|_, handle| match handle.try_lock() {
            Ok(session) => !expired(&session, now, ttl),
            Err(TryLockError::Poisoned(poisoned)) => !expired(&poisoned.into_inner(), now, ttl),
            Err(TryLockError::WouldBlock) => true,
        });
        let evicted = before - sessions.len();
        if evicted > 0 {
            debug!(evicted, remaining = sessions.len(), "expired quiz sessions evicted");
        }
        evicted
    }

    fn handle(&self, session_id: &SessionId) -> Result<Arc<Mutex<QuizSession>>, QuizServiceError> {
        lock(&self.sessions)
            .get(session_id)
            .cloned()
            .ok_or_else(|| QuizServiceError::SessionNotFound(session_id.clone()))
    }

    fn finish(&self, session: &mut QuizSession) -> Result<(), SessionError> {
        let card = session.score()?;
        let mut warnings: Vec<SessionWarning> = card
            .warnings
            .iter()
            .cloned()
            .map(SessionWarning::Scoring)
            .collect();

        let batch = ResponseBatch::new(
            session.user_id().clone(),
            session.id().clone(),
            session.responses(),
            Utc::now(),
        );
        if let Err(err) = self.sink.store(&batch) {
            warn!(session_id = %session.id(), error = %err, "quiz responses were not persisted");
            warnings.push(SessionWarning::Persistence {
                reason: err.to_string(),
            });
        }

        let risk = match self.assess(card.total, session.catalog().max_score()) {
            Ok(assessment) => RiskResolution::assessed(assessment),
            Err(err) => {
                let session_id = session.id();
                match &err {
                    RiskLookupError::Resolve(_) => warn!(
                        %session_id,
                        score = card.total,
                        error = %err,
                        "assessment unavailable"
                    ),
                    _ => error!(
                        %session_id,
                        score = card.total,
                        error = %err,
                        "risk band lookup failed"
                    ),
                }
                RiskResolution::Unavailable {
                    reason: err.to_string(),
                }
            }
        };

        let outcome = session.complete(card, risk, warnings, Utc::now())?;
        info!(
            score = outcome.score,
            risk_level = outcome.risk.assessment().map(|band| band.risk_level.as_str()),
            warnings = outcome.warnings.len(),
            "quiz session completed"
        );
        Ok(())
    }

    /// Under the strict policy the table must also cover every attainable score.
    fn assess(&self, score: u32, max_score: u32) -> Result<RiskAssessment, RiskLookupError> {
        let bands = self.bands.load_bands()?;
        let table = self.band_policy.build(bands)?;
        if self.band_policy == BandPolicy::Strict {
            table.ensure_covers(0, max_score)?;
        }
        Ok(table.resolve(score)?.clone())
    }
}

fn expired(session: &QuizSession, now: DateTime<Utc>, ttl: Duration) -> bool {
    session
        .outcome()
        .is_some_and(|outcome| outcome.completed_at + ttl <= now)
}

#[derive(Debug, thiserror::Error)]
enum RiskLookupError {
    #[error(transparent)]
    Load(#[from] RiskBandLoadError),
    #[error("risk band table rejected: {0}")]
    Table(#[from] RiskTableError),
    #[error(transparent)]
    Resolve(#[from] RiskResolutionError),
}

/// Error raised by the quiz service.
#[derive(Debug, thiserror::Error)]
pub enum QuizServiceError {
    #[error(transparent)]
    QuestionLoad(#[from] QuestionLoadError),
    #[error("question set rejected: {0}")]
    Catalog(#[from] CatalogError),
    #[error("quiz session {0} not found")]
    SessionNotFound(SessionId),
    #[error(transparent)]
    Session(#[from] SessionError),
}
