use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::models::DealerStatus;

/// RepositoryError
///
/// Failures surfaced by the persistence layer. Unique-constraint violations are
/// separated out so handlers can answer 409 instead of 500.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("unique constraint violated: {0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return RepositoryError::Conflict(
                    db_err.constraint().unwrap_or("unknown").to_string(),
                );
            }
        }
        RepositoryError::Database(err)
    }
}

pub type RepoResult<T> = Result<T, RepositoryError>;

/// AppError
///
/// Every failure a handler can answer with. The JSON body is always
/// `{ "error": <message> }`, extended with the dealer `status` or the
/// `remainingAttempts` login budget where the UI needs them.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{message}")]
    InvalidCredentials { message: String, remaining_attempts: u32 },

    #[error("{message}")]
    Forbidden {
        message: String,
        status: Option<DealerStatus>,
    },

    #[error("{0}")]
    NotFound(String),

    #[error("{message}")]
    Conflict {
        message: String,
        status: Option<DealerStatus>,
    },

    #[error("{0}")]
    Gone(String),

    #[error("{0}")]
    TooManyRequests(String),

    #[error("{0}")]
    Internal(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        AppError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        AppError::Forbidden {
            message: message.into(),
            status: None,
        }
    }

    pub fn forbidden_with_status(message: impl Into<String>, status: DealerStatus) -> Self {
        AppError::Forbidden {
            message: message.into(),
            status: Some(status),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFound(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        AppError::Internal(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) | AppError::InvalidCredentials { .. } => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Forbidden { .. } => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict { .. } | AppError::Repository(RepositoryError::Conflict(_)) => {
                StatusCode::CONFLICT
            }
            AppError::Gone(_) => StatusCode::GONE,
            AppError::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Internal(_) | AppError::Repository(RepositoryError::Database(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// body
    ///
    /// Builds the JSON payload. Server-side failures never echo internal detail.
    pub fn body(&self) -> Value {
        let mut body = Map::new();
        let message = match self {
            AppError::Internal(_) | AppError::Repository(RepositoryError::Database(_)) => {
                "An unexpected error occurred".to_string()
            }
            AppError::Repository(RepositoryError::Conflict(_)) => {
                "A record with these details already exists".to_string()
            }
            other => other.to_string(),
        };
        body.insert("error".into(), json!(message));

        match self {
            AppError::Forbidden {
                status: Some(status),
                ..
            }
            | AppError::Conflict {
                status: Some(status),
                ..
            } => {
                body.insert("status".into(), json!(status));
            }
            AppError::InvalidCredentials {
                remaining_attempts, ..
            } => {
                body.insert("remainingAttempts".into(), json!(remaining_attempts));
            }
            _ => {}
        }

        Value::Object(body)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        }
        (status, Json(self.body())).into_response()
    }
}
