//! Calendar consent and export endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};

use super::{current_revision, error, success, ApiResult};
use crate::calendar::{CalendarExporter, ExportReport};
use crate::errors::AppError;
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationResponse {
    pub authorization_url: String,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ConsentResult {
    pub granted: bool,
}

#[derive(Debug, Serialize)]
pub struct CalendarStatus {
    pub initialized: bool,
    pub authorized: bool,
}

#[derive(Debug, Deserialize)]
pub struct ExportRequest {
    #[serde(default)]
    pub member: String,
    /// Year used to date slot-label keys; defaults to the current year
    pub year: Option<i32>,
}

/// GET /api/calendar/status - Whether the client is set up and holds a token.
pub async fn calendar_status(State(state): State<AppState>) -> ApiResult<CalendarStatus> {
    let revision_id = current_revision(&state).await;
    success(
        CalendarStatus {
            initialized: state.calendar.is_initialized(),
            authorized: state.calendar.has_token().await,
        },
        revision_id,
    )
}

/// GET /api/calendar/authorize - Start a consent round.
pub async fn authorize_calendar(State(state): State<AppState>) -> ApiResult<AuthorizationResponse> {
    let revision_id = current_revision(&state).await;

    match state.calendar.begin_consent().await {
        Ok(authorization_url) => success(AuthorizationResponse { authorization_url }, revision_id),
        Err(e) => error(e.into(), revision_id),
    }
}

/// GET /api/calendar/callback - OAuth redirect target.
pub async fn calendar_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> ApiResult<ConsentResult> {
    let revision_id = current_revision(&state).await;

    if let Some(reason) = query.error {
        tracing::warn!("Calendar consent declined: {}", reason);
        return error(
            AppError::BadRequest(format!("Calendar access was not granted: {}", reason)),
            revision_id,
        );
    }

    let (Some(code), Some(csrf)) = (query.code, query.state) else {
        return error(
            AppError::BadRequest("Missing code or state parameter".to_string()),
            revision_id,
        );
    };

    match state.calendar.complete_consent(&code, &csrf).await {
        Ok(()) => success(ConsentResult { granted: true }, revision_id),
        Err(e) => error(e.into(), revision_id),
    }
}

/// POST /api/organizations/{org}/teams/{team}/calendar-export - Add one member's
/// assignments to their calendar.
pub async fn export_calendar(
    State(state): State<AppState>,
    Path((org, team)): Path<(String, String)>,
    Json(request): Json<ExportRequest>,
) -> ApiResult<ExportReport> {
    let revision_id = current_revision(&state).await;

    match run_export(&state, &org, &team, request).await {
        Ok(report) => success(report, revision_id),
        Err(e) => error(e, revision_id),
    }
}

async fn run_export(
    state: &AppState,
    org: &str,
    team: &str,
    request: ExportRequest,
) -> Result<ExportReport, AppError> {
    let member = request.member.trim();
    if member.is_empty() {
        return Err(AppError::Validation("Please select a member first".to_string()));
    }

    let year = request.year.unwrap_or_else(|| {
        Utc::now()
            .with_timezone(&state.config.timezone)
            .date_naive()
            .year()
    });

    let schedules = state.repo.list_schedules(org, team).await?;
    let exporter = CalendarExporter::new(&state.calendar, state.config.timezone);
    let report = exporter.export(&schedules, member, year).await?;

    tracing::info!(
        "Calendar export for {} in {}/{}: {} event(s)",
        member,
        org,
        team,
        report.inserted
    );
    Ok(report)
}
