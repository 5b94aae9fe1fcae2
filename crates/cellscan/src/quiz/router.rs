use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{AnswerValue, QuestionId, SessionId, UserId};
use super::repository::{QuestionStore, ResponseSink, RiskBandStore};
use super::service::{QuizService, QuizServiceError};
use super::session::SessionError;

#[derive(Debug, Deserialize)]
pub(crate) struct StartRequest {
    pub(crate) user_id: UserId,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AnswerRequest {
    pub(crate) question_id: QuestionId,
    pub(crate) value: AnswerValue,
}

/// Router builder exposing the quiz session endpoints.
pub fn quiz_router<Q, B, S>(service: Arc<QuizService<Q, B, S>>) -> Router
where
    Q: QuestionStore + 'static,
    B: RiskBandStore + 'static,
    S: ResponseSink + 'static,
{
    Router::new()
        .route("/api/v1/quiz/sessions", post(start_handler::<Q, B, S>))
        .route(
            "/api/v1/quiz/sessions/:session_id",
            get(session_handler::<Q, B, S>).delete(abandon_handler::<Q, B, S>),
        )
        .route(
            "/api/v1/quiz/sessions/:session_id/answers",
            post(answer_handler::<Q, B, S>),
        )
        .route(
            "/api/v1/quiz/sessions/:session_id/reset",
            post(reset_handler::<Q, B, S>),
        )
        .with_state(service)
}

pub(crate) async fn start_handler<Q, B, S>(
    State(service): State<Arc<QuizService<Q, B, S>>>,
    axum::Json(request): axum::Json<StartRequest>,
) -> Response
where
    Q: QuestionStore + 'static,
    B: RiskBandStore + 'static,
    S: ResponseSink + 'static,
{
    match service.start(request.user_id) {
        Ok(view) => (StatusCode::CREATED, axum::Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn session_handler<Q, B, S>(
    State(service): State<Arc<QuizService<Q, B, S>>>,
    Path(session_id): Path<String>,
) -> Response
where
    Q: QuestionStore + 'static,
    B: RiskBandStore + 'static,
    S: ResponseSink + 'static,
{
    match service.get(&SessionId(session_id)) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn answer_handler<Q, B, S>(
    State(service): State<Arc<QuizService<Q, B, S>>>,
    Path(session_id): Path<String>,
    axum::Json(request): axum::Json<AnswerRequest>,
) -> Response
where
    Q: QuestionStore + 'static,
    B: RiskBandStore + 'static,
    S: ResponseSink + 'static,
{
    match service.answer(&SessionId(session_id), request.question_id, request.value) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn reset_handler<Q, B, S>(
    State(service): State<Arc<QuizService<Q, B, S>>>,
    Path(session_id): Path<String>,
) -> Response
where
    Q: QuestionStore + 'static,
    B: RiskBandStore + 'static,
    S: ResponseSink + 'static,
{
    match service.reset(&SessionId(session_id)) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn abandon_handler<Q, B, S>(
    State(service): State<Arc<QuizService<Q, B, S>>>,
    Path(session_id): Path<String>,
) -> Response
where
    Q: QuestionStore + 'static,
    B: RiskBandStore + 'static,
    S: ResponseSink + 'static,
{
    match service.abandon(&SessionId(session_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

fn error_response(err: QuizServiceError) -> Response {
    let status = match &err {
        QuizServiceError::QuestionLoad(_) => StatusCode::SERVICE_UNAVAILABLE,
        QuizServiceError::Catalog(_) => StatusCode::INTERNAL_SERVER_ERROR,
        QuizServiceError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        QuizServiceError::Session(
            SessionError::AlreadyCompleted
            | SessionError::AwaitingCompletion
            | SessionError::NotFinished,
        ) => StatusCode::CONFLICT,
        QuizServiceError::Session(
            SessionError::UnexpectedQuestion { .. }
            | SessionError::AlreadyAnswered(_)
            | SessionError::InvalidAnswer(_),
        ) => StatusCode::UNPROCESSABLE_ENTITY,
    };

    let payload = json!({
        "error": err.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}
