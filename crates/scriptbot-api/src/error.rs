//! Scriptbot: API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use scriptbot_core::error::DomainError;
use serde::Serialize;
use thiserror::Error;

/// Startup and runtime errors for the API server.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Database connection or pool error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration failed at startup.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Tracing exporter could not be built.
    #[error("telemetry error: {0}")]
    Telemetry(String),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

/// JSON body returned for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
}

/// HTTP-layer wrapper around `DomainError` that implements `IntoResponse`.
#[derive(Debug)]
pub struct ApiError(pub DomainError);

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match &self.0 {
            DomainError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "invalid_input"),
            DomainError::BlockNotFound(_) => (StatusCode::UNPROCESSABLE_ENTITY, "block_not_found"),
            DomainError::BlockDuplicated(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "block_duplicated")
            }
            DomainError::EntryDuplicated(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "entry_duplicated")
            }
            DomainError::UnusedBlock(_) => (StatusCode::UNPROCESSABLE_ENTITY, "unused_block"),
            DomainError::CycleDetected(_) => (StatusCode::UNPROCESSABLE_ENTITY, "cycle_detected"),
            DomainError::RunawayScript(_) => (StatusCode::UNPROCESSABLE_ENTITY, "runaway_script"),
            DomainError::EntryNotFound(_) => (StatusCode::NOT_FOUND, "entry_not_found"),
            DomainError::MailingNotFound(_) => (StatusCode::NOT_FOUND, "mailing_not_found"),
            DomainError::BotNotFound(_) => (StatusCode::NOT_FOUND, "bot_not_found"),
            DomainError::ParticipantNotFound { .. } => {
                (StatusCode::NOT_FOUND, "participant_not_found")
            }
            DomainError::MailingDuplicated(_) => (StatusCode::CONFLICT, "mailing_duplicated"),
            DomainError::BotAlreadyExists(_) => (StatusCode::CONFLICT, "bot_already_exists"),
            DomainError::PermissionDenied(_) => (StatusCode::FORBIDDEN, "permission_denied"),
            DomainError::Infrastructure(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "infrastructure_error")
            }
            DomainError::Publish(_) => (StatusCode::SERVICE_UNAVAILABLE, "publish_error"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }

        let body = ErrorBody {
            error: error_code,
            message: self.0.to_string(),
        };

        (status, Json(body)).into_response()
    }
}
