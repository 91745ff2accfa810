//! Service calendar and role catalog endpoints.

use axum::extract::{Path, Query, State};
use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};

use super::{current_revision, error, success, ApiResult};
use crate::errors::AppError;
use crate::roster::{current_quarter, quarter_slots, MonthSlots, TeamRoles};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct QuarterQuery {
    pub year: Option<i32>,
}

/// Sunday grid of one quarter.
#[derive(Debug, Serialize)]
pub struct QuarterView {
    pub year: i32,
    pub index: usize,
    pub months: Vec<MonthSlots>,
}

fn quarter_view(year: i32, index: usize) -> Result<QuarterView, AppError> {
    let months = quarter_slots(year, index).ok_or_else(|| {
        AppError::Validation(format!("Quarter index must be 0-3, got {}", index))
    })?;
    Ok(QuarterView {
        year,
        index,
        months,
    })
}

/// GET /api/quarters/current - Quarter containing today in the configured timezone.
pub async fn get_current_quarter(State(state): State<AppState>) -> ApiResult<QuarterView> {
    let revision_id = current_revision(&state).await;
    let today = Utc::now().with_timezone(&state.config.timezone).date_naive();

    match quarter_view(today.year(), current_quarter(today)) {
        Ok(view) => success(view, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/quarters/{index}?year= - Sunday grid of a quarter (defaults to this year).
pub async fn get_quarter(
    State(state): State<AppState>,
    Path(index): Path<usize>,
    Query(query): Query<QuarterQuery>,
) -> ApiResult<QuarterView> {
    let revision_id = current_revision(&state).await;
    let year = query.year.unwrap_or_else(|| {
        Utc::now()
            .with_timezone(&state.config.timezone)
            .date_naive()
            .year()
    });

    match quarter_view(year, index) {
        Ok(view) => success(view, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/organizations/{org}/teams/{team}/roles - Roles shown for a team.
pub async fn get_team_roles(
    State(state): State<AppState>,
    Path((_org, team)): Path<(String, String)>,
) -> ApiResult<TeamRoles> {
    let revision_id = current_revision(&state).await;
    success(TeamRoles::for_team(&team), revision_id)
}
