use crate::config::ConfigError;
use crate::quiz::{
    CatalogError, QuestionLoadError, QuizServiceError, RiskBandLoadError, RiskTableError,
};
use crate::telemetry::TelemetryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Json(serde_json::Error),
    QuestionStore(QuestionLoadError),
    RiskBandStore(RiskBandLoadError),
    Catalog(CatalogError),
    RiskTable(RiskTableError),
    Quiz(QuizServiceError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Json(err) => write!(f, "invalid json: {}", err),
            AppError::QuestionStore(err) => write!(f, "question set error: {}", err),
            AppError::RiskBandStore(err) => write!(f, "risk band error: {}", err),
            AppError::Catalog(err) => write!(f, "question set error: {}", err),
            AppError::RiskTable(err) => write!(f, "risk band error: {}", err),
            AppError::Quiz(err) => write!(f, "quiz error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Json(err) => Some(err),
            AppError::QuestionStore(err) => Some(err),
            AppError::RiskBandStore(err) => Some(err),
            AppError::Catalog(err) => Some(err),
            AppError::RiskTable(err) => Some(err),
            AppError::Quiz(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::Json(_) | AppError::Quiz(QuizServiceError::Session(_)) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Quiz(QuizServiceError::SessionNotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::QuestionStore(_)
            | AppError::RiskBandStore(_)
            | AppError::Catalog(_)
            | AppError::RiskTable(_)
            | AppError::Quiz(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<QuestionLoadError> for AppError {
    fn from(value: QuestionLoadError) -> Self {
        Self::QuestionStore(value)
    }
}

impl From<RiskBandLoadError> for AppError {
    fn from(value: RiskBandLoadError) -> Self {
        Self::RiskBandStore(value)
    }
}

impl From<CatalogError> for AppError {
    fn from(value: CatalogError) -> Self {
        Self::Catalog(value)
    }
}

impl From<RiskTableError> for AppError {
    fn from(value: RiskTableError) -> Self {
        Self::RiskTable(value)
    }
}

impl From<QuizServiceError> for AppError {
    fn from(value: QuizServiceError) -> Self {
        Self::Quiz(value)
    }
}
