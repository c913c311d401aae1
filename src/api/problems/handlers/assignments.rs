use std::collections::BTreeSet;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentManager;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::problem::{AssignRequest, AssignResponse, AssignedUserResponse};
use crate::schemas::submission::SubmissionListItem;

use super::super::helpers;

/// Every id must name an existing candidate; duplicates collapse.
pub(in crate::api::problems) async fn assign_users(
    Path(problem_id): Path<String>,
    CurrentManager(actor): CurrentManager,
    State(state): State<AppState>,
    Json(payload): Json<AssignRequest>,
) -> Result<Json<AssignResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    helpers::ensure_problem_exists(&state, &problem_id).await?;

    let requested: Vec<String> =
        payload.user_ids.into_iter().collect::<BTreeSet<_>>().into_iter().collect();
    let candidates = repositories::users::filter_candidate_ids(state.db(), &requested)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check users"))?;

    if candidates.len() != requested.len() {
        let known: BTreeSet<&String> = candidates.iter().collect();
        let unknown: Vec<&str> = requested
            .iter()
            .filter(|id| !known.contains(id))
            .map(String::as_str)
            .collect();
        return Err(ApiError::BadRequest(format!(
            "Not candidate user ids: {}",
            unknown.join(", ")
        )));
    }

    let assigned = repositories::assignments::assign_many(
        state.db(),
        &problem_id,
        &candidates,
        &actor.id,
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to assign problem"))?;

    tracing::info!(
        actor_id = %actor.id,
        problem_id = %problem_id,
        requested = requested.len(),
        assigned,
        "Problem assigned"
    );

    Ok(Json(AssignResponse { assigned, requested: requested.len() }))
}

pub(in crate::api::problems) async fn list_assigned_users(
    Path(problem_id): Path<String>,
    CurrentManager(_actor): CurrentManager,
    State(state): State<AppState>,
) -> Result<Json<Vec<AssignedUserResponse>>, ApiError> {
    helpers::ensure_problem_exists(&state, &problem_id).await?;

    let users = repositories::assignments::list_users(state.db(), &problem_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list assigned users"))?;

    Ok(Json(users.into_iter().map(AssignedUserResponse::from_db).collect()))
}

pub(in crate::api::problems) async fn unassign_user(
    Path((problem_id, user_id)): Path<(String, String)>,
    CurrentManager(actor): CurrentManager,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let removed = repositories::assignments::unassign(state.db(), &problem_id, &user_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to unassign problem"))?;
    if !removed {
        return Err(ApiError::NotFound("Assignment not found".to_string()));
    }

    tracing::info!(
        actor_id = %actor.id,
        problem_id = %problem_id,
        user_id = %user_id,
        "Problem unassigned"
    );

    Ok(StatusCode::NO_CONTENT)
}

pub(in crate::api::problems) async fn list_problem_submissions(
    Path(problem_id): Path<String>,
    CurrentManager(_actor): CurrentManager,
    State(state): State<AppState>,
) -> Result<Json<Vec<SubmissionListItem>>, ApiError> {
    helpers::ensure_problem_exists(&state, &problem_id).await?;

    let rows = repositories::submissions::list_for_problem(state.db(), &problem_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list submissions"))?;

    Ok(Json(rows.into_iter().map(SubmissionListItem::from_db).collect()))
}
