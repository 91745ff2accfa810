//! Error handling module for the roster backend.
//!
//! Provides centralized error types with mapping to HTTP status codes and response envelopes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::calendar::CalendarError;
use crate::roster::Conflict;

/// Error codes as constants to avoid stringly-typed errors.
pub mod codes {
    pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const DUPLICATE: &str = "DUPLICATE";
    pub const CONFLICT: &str = "CONFLICT";
    pub const CONSENT_REQUIRED: &str = "CONSENT_REQUIRED";
    pub const CALENDAR_ERROR: &str = "CALENDAR_ERROR";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
    pub const DATABASE_ERROR: &str = "DATABASE_ERROR";
    pub const BAD_REQUEST: &str = "BAD_REQUEST";
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    /// Authentication required
    Unauthorized(String),
    /// Resource not found
    NotFound(String),
    /// Validation error
    Validation(String),
    /// A member with the same (case-insensitive) name already exists
    Duplicate(String),
    /// The submitted schedule double-books a member
    Conflict {
        message: String,
        conflicts: Vec<Conflict>,
    },
    /// The calendar needs (renewed) OAuth consent
    ConsentRequired {
        message: String,
        authorization_url: Option<String>,
    },
    /// External calendar failure
    Calendar(String),
    /// Database error
    Database(String),
    /// Internal server error
    Internal(String),
    /// Bad request
    BadRequest(String),
}

impl AppError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Duplicate(_) => StatusCode::CONFLICT,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::ConsentRequired { .. } => StatusCode::UNAUTHORIZED,
            AppError::Calendar(_) => StatusCode::BAD_GATEWAY,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Unauthorized(_) => codes::UNAUTHORIZED,
            AppError::NotFound(_) => codes::NOT_FOUND,
            AppError::Validation(_) => codes::VALIDATION_ERROR,
            AppError::Duplicate(_) => codes::DUPLICATE,
            AppError::Conflict { .. } => codes::CONFLICT,
            AppError::ConsentRequired { .. } => codes::CONSENT_REQUIRED,
            AppError::Calendar(_) => codes::CALENDAR_ERROR,
            AppError::Database(_) => codes::DATABASE_ERROR,
            AppError::Internal(_) => codes::INTERNAL_ERROR,
            AppError::BadRequest(_) => codes::BAD_REQUEST,
        }
    }

    /// Get the error message.
    pub fn message(&self) -> String {
        match self {
            AppError::Unauthorized(msg) => msg.clone(),
            AppError::NotFound(msg) => msg.clone(),
            AppError::Validation(msg) => msg.clone(),
            AppError::Duplicate(msg) => msg.clone(),
            AppError::Conflict { message, .. } => message.clone(),
            AppError::ConsentRequired { message, .. } => message.clone(),
            AppError::Calendar(msg) => msg.clone(),
            AppError::Database(msg) => msg.clone(),
            AppError::Internal(msg) => msg.clone(),
            AppError::BadRequest(msg) => msg.clone(),
        }
    }

    /// Structured details attached to the error envelope, if any.
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            AppError::Conflict { conflicts, .. } => {
                Some(serde_json::json!({ "conflicts": conflicts }))
            }
            AppError::ConsentRequired {
                authorization_url: Some(url),
                ..
            } => Some(serde_json::json!({ "authorizationUrl": url })),
            _ => None,
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_code(), self.message())
    }
}

impl std::error::Error for AppError {}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {:?}", err);
        AppError::Database(format!("Database error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        // Request bodies are decoded by the extractors; anything reaching here is stored data.
        tracing::error!("JSON error: {:?}", err);
        AppError::Internal(format!("Stored data could not be decoded: {}", err))
    }
}

impl From<CalendarError> for AppError {
    fn from(err: CalendarError) -> Self {
        tracing::error!("Calendar error: {:?}", err);
        let message = err.user_message();
        match err {
            CalendarError::ConsentRequired { authorization_url } => AppError::ConsentRequired {
                message,
                authorization_url,
            },
            CalendarError::NotConfigured(_) | CalendarError::StateMismatch => {
                AppError::BadRequest(message)
            }
            _ => AppError::Calendar(message),
        }
    }
}

/// Error details in the response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Error response envelope.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetails,
    pub revision_id: i64,
}

impl ErrorResponse {
    pub fn new(error: &AppError, revision_id: i64) -> Self {
        Self {
            success: false,
            error: ErrorDetails {
                code: error.error_code().to_string(),
                message: error.message(),
                details: error.details(),
            },
            revision_id,
        }
    }
}

/// Wrapper type for errors that carry revision_id context.
pub struct AppErrorWithRevision {
    pub error: AppError,
    pub revision_id: i64,
}

impl IntoResponse for AppErrorWithRevision {
    fn into_response(self) -> Response {
        let status = self.error.status_code();
        let body = ErrorResponse::new(&self.error, self.revision_id);
        (status, Json(body)).into_response()
    }
}
