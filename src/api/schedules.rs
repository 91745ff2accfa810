//! Schedule API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use super::{current_revision, error, respond, success, ApiResult};
use crate::errors::AppError;
use crate::models::{Assignment, Schedule, ScheduleEditRequest, UpsertScheduleRequest};
use crate::roster::{double_bookings, duplicate_role, Conflict, EditSession};
use crate::AppState;

/// Outcome of one edit-session step.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEditResult {
    pub date: String,
    pub assignments: Vec<Assignment>,
    pub conflicts: Vec<Conflict>,
    pub can_save: bool,
}

/// GET /api/organizations/{org}/teams/{team}/schedules - List a team's schedules.
pub async fn list_schedules(
    State(state): State<AppState>,
    Path((org, team)): Path<(String, String)>,
) -> ApiResult<Vec<Schedule>> {
    let revision_id = current_revision(&state).await;

    match state.repo.list_schedules(&org, &team).await {
        Ok(schedules) => success(schedules, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/organizations/{org}/teams/{team}/schedules/{date} - Get one schedule.
pub async fn get_schedule(
    State(state): State<AppState>,
    Path((org, team, date)): Path<(String, String, String)>,
) -> ApiResult<Schedule> {
    let revision_id = current_revision(&state).await;

    match state.repo.get_schedule(&org, &team, &date).await {
        Ok(Some(schedule)) => success(schedule, revision_id),
        Ok(None) => error(
            AppError::NotFound(format!("Schedule for '{}' not found", date)),
            revision_id,
        ),
        Err(e) => error(e, revision_id),
    }
}

/// PUT /api/organizations/{org}/teams/{team}/schedules/{date} - Save a schedule.
///
/// Rejected with `CONFLICT` while anyone holds two roles on the date.
pub async fn upsert_schedule(
    State(state): State<AppState>,
    Path((org, team, date)): Path<(String, String, String)>,
    Json(request): Json<UpsertScheduleRequest>,
) -> ApiResult<Schedule> {
    let revision_id = current_revision(&state).await;

    if let Some(role) = duplicate_role(&request.members) {
        return error(
            AppError::Validation(format!("Role '{}' is listed more than once", role)),
            revision_id,
        );
    }

    let conflicts = double_bookings(&request.members);
    if !conflicts.is_empty() {
        tracing::warn!(
            "Rejected schedule {} for {}/{} with {} conflict(s)",
            date,
            org,
            team,
            conflicts.len()
        );
        return error(
            AppError::Conflict {
                message: conflicts[0].message.clone(),
                conflicts,
            },
            revision_id,
        );
    }

    let schedule = Schedule {
        date,
        members: request.members,
        updated_at: String::new(),
    };
    let result = state.repo.upsert_schedule(&org, &team, &schedule).await;
    respond(&state, revision_id, result).await
}

/// POST /api/organizations/{org}/teams/{team}/schedules/{date}/edits - Apply one selection.
///
/// Nothing is persisted; the caller saves with PUT once `canSave` is true.
pub async fn edit_schedule(
    State(state): State<AppState>,
    Path((org, team, date)): Path<(String, String, String)>,
    Json(request): Json<ScheduleEditRequest>,
) -> ApiResult<ScheduleEditResult> {
    let revision_id = current_revision(&state).await;

    match apply_edit(&state, &org, &team, date, request).await {
        Ok(result) => success(result, revision_id),
        Err(e) => error(e, revision_id),
    }
}

async fn apply_edit(
    state: &AppState,
    org: &str,
    team: &str,
    date: String,
    request: ScheduleEditRequest,
) -> Result<ScheduleEditResult, AppError> {
    let role = request.role.trim();
    if role.is_empty() {
        return Err(AppError::Validation("Role is required".to_string()));
    }

    let seed = match request.assignments {
        Some(assignments) => assignments,
        None => state
            .repo
            .get_schedule(org, team, &date)
            .await?
            .map(|schedule| schedule.members)
            .unwrap_or_default(),
    };

    let mut session = EditSession::from_assignments(seed);
    if request.name.trim().is_empty() {
        session.clear(role);
    } else {
        session.assign(role, &request.name);
    }

    Ok(ScheduleEditResult {
        date,
        assignments: session.assignments().to_vec(),
        conflicts: session.conflicts().to_vec(),
        can_save: session.can_save(),
    })
}
