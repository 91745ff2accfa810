//! REST API module.
//!
//! Contains all API routes and handlers. Every response uses the same envelope.

mod calendar;
mod members;
mod quarters;
mod schedules;

pub use calendar::*;
pub use members::*;
pub use quarters::*;
pub use schedules::*;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::errors::{AppError, AppErrorWithRevision};
use crate::AppState;

/// Success response envelope.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
    pub revision_id: i64,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T, revision_id: i64) -> Self {
        Self {
            success: true,
            data,
            revision_id,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<ApiResponse<T>, AppErrorWithRevision>;

/// Create a successful API response.
pub fn success<T: Serialize>(data: T, revision_id: i64) -> ApiResult<T> {
    Ok(ApiResponse::new(data, revision_id))
}

/// Create an error API response.
pub fn error<T: Serialize>(err: AppError, revision_id: i64) -> ApiResult<T> {
    Err(AppErrorWithRevision {
        error: err,
        revision_id,
    })
}

/// Current revision, or 0 if it cannot be read.
async fn current_revision(state: &AppState) -> i64 {
    state.repo.get_revision_id().await.unwrap_or(0)
}

/// Wrap a handler outcome, reporting the revision after a successful write.
async fn respond<T: Serialize>(
    state: &AppState,
    revision_id: i64,
    result: Result<T, AppError>,
) -> ApiResult<T> {
    match result {
        Ok(data) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(data, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}
