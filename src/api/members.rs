//! Member API endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use super::{current_revision, error, respond, success, ApiResult};
use crate::errors::AppError;
use crate::models::{CreateMemberRequest, Member, MemberExists};
use crate::roster::organization_for_group;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ExistsQuery {
    pub name: String,
}

/// GET /api/organizations/{org}/members - List all members.
pub async fn list_members(
    State(state): State<AppState>,
    Path(org): Path<String>,
) -> ApiResult<Vec<Member>> {
    let revision_id = current_revision(&state).await;

    match state.repo.list_members(&org).await {
        Ok(members) => success(members, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/organizations/{org}/members - Add a member.
pub async fn create_member(
    State(state): State<AppState>,
    Path(org): Path<String>,
    Json(request): Json<CreateMemberRequest>,
) -> ApiResult<Member> {
    let revision_id = current_revision(&state).await;

    let member = match request.into_member() {
        Ok(member) => member,
        Err(msg) => return error(AppError::Validation(msg), revision_id),
    };

    let result = state.repo.add_member(&org, &member).await;
    respond(&state, revision_id, result).await
}

/// POST /api/members - Add a member to the organization of each of its service groups.
pub async fn create_member_in_groups(
    State(state): State<AppState>,
    Json(request): Json<CreateMemberRequest>,
) -> ApiResult<Vec<Member>> {
    let revision_id = current_revision(&state).await;

    let member = match request.into_member() {
        Ok(member) => member,
        Err(msg) => return error(AppError::Validation(msg), revision_id),
    };

    let result = add_to_groups(&state, &member).await;
    respond(&state, revision_id, result).await
}

async fn add_to_groups(state: &AppState, member: &Member) -> Result<Vec<Member>, AppError> {
    if member.groups.is_empty() {
        return Err(AppError::Validation(
            "At least one service group is required".to_string(),
        ));
    }

    let mut orgs = Vec::new();
    for group in &member.groups {
        let org = organization_for_group(group)
            .ok_or_else(|| AppError::Validation(format!("Unknown service group '{}'", group)))?;
        if !orgs.contains(&org) {
            orgs.push(org);
        }
    }

    // Check every organization first so a duplicate leaves nothing half-written.
    for org in &orgs {
        if state.repo.member_exists(org, &member.name).await? {
            return Err(AppError::Duplicate(format!(
                "Member '{}' already exists in {}",
                member.name, org
            )));
        }
    }

    let mut added = Vec::with_capacity(orgs.len());
    for org in orgs {
        added.push(state.repo.add_member(org, member).await?);
    }
    Ok(added)
}

/// GET /api/organizations/{org}/members/exists?name= - Case-insensitive name check.
pub async fn member_exists(
    State(state): State<AppState>,
    Path(org): Path<String>,
    Query(query): Query<ExistsQuery>,
) -> ApiResult<MemberExists> {
    let revision_id = current_revision(&state).await;

    if query.name.trim().is_empty() {
        return success(
            MemberExists {
                name: query.name,
                exists: false,
            },
            revision_id,
        );
    }

    match state.repo.member_exists(&org, &query.name).await {
        Ok(exists) => success(
            MemberExists {
                name: query.name,
                exists,
            },
            revision_id,
        ),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/organizations/{org}/roles/{role}/members - Members eligible for a role.
pub async fn members_for_role(
    State(state): State<AppState>,
    Path((org, role)): Path<(String, String)>,
) -> ApiResult<Vec<Member>> {
    let revision_id = current_revision(&state).await;

    match state.repo.members_for_role(&org, &role).await {
        Ok(members) => success(members, revision_id),
        Err(e) => error(e, revision_id),
    }
}
