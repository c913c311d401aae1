use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentCandidate, CurrentManager, CurrentUser};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::problem::{
    normalize_constraints, AssignedProblemResponse, ProblemCreate, ProblemDetailResponse,
    ProblemResponse, ProblemSummaryResponse, ProblemUpdate, VisibleTestcase,
};

use super::super::helpers;

pub(in crate::api::problems) async fn list_problems(
    CurrentManager(_actor): CurrentManager,
    State(state): State<AppState>,
) -> Result<Json<Vec<ProblemSummaryResponse>>, ApiError> {
    let summaries = repositories::problems::list_summaries(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list problems"))?;

    Ok(Json(summaries.into_iter().map(ProblemSummaryResponse::from_db).collect()))
}

pub(in crate::api::problems) async fn list_assigned_problems(
    CurrentCandidate(candidate): CurrentCandidate,
    State(state): State<AppState>,
) -> Result<Json<Vec<AssignedProblemResponse>>, ApiError> {
    let rows = repositories::problems::list_assigned(state.db(), &candidate.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list assigned problems"))?;

    Ok(Json(rows.into_iter().map(AssignedProblemResponse::from_db).collect()))
}

pub(in crate::api::problems) async fn create_problem(
    CurrentManager(actor): CurrentManager,
    State(state): State<AppState>,
    Json(payload): Json<ProblemCreate>,
) -> Result<(StatusCode, Json<ProblemResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let language = helpers::reference_language(&payload.reference_language)?;

    let title = payload.title.trim();
    helpers::ensure_title_free(&state, title, None).await?;

    let problem = repositories::problems::create(
        state.db(),
        repositories::problems::CreateProblem {
            id: &Uuid::new_v4().to_string(),
            title,
            statement: &payload.statement,
            constraints: normalize_constraints(payload.constraints),
            reference_solution: &payload.reference_solution,
            reference_language: language,
            time_limit_minutes: payload.time_limit_minutes,
            created_by: &actor.id,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| helpers::title_conflict_or_internal(e, "Failed to create problem"))?;

    tracing::info!(
        actor_id = %actor.id,
        problem_id = %problem.id,
        language,
        "Problem created"
    );

    Ok((StatusCode::CREATED, Json(ProblemResponse::from_db(problem, true))))
}

/// Candidates only see problems assigned to them, and only the visible testcases.
pub(in crate::api::problems) async fn get_problem(
    Path(problem_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<ProblemDetailResponse>, ApiError> {
    let problem = helpers::fetch_problem(&state, &problem_id).await?;

    let is_staff = user.role.can_manage();
    if !is_staff {
        let assigned = repositories::assignments::exists(state.db(), &problem_id, &user.id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to check assignment"))?;
        if !assigned {
            return Err(ApiError::Forbidden("Problem is not assigned to you"));
        }
    }

    let visible = repositories::testcases::list_visible_for_problem(state.db(), &problem_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load testcases"))?;

    Ok(Json(ProblemDetailResponse {
        problem: ProblemResponse::from_db(problem, is_staff),
        visible_testcases: visible.into_iter().map(VisibleTestcase::from_db).collect(),
    }))
}

pub(in crate::api::problems) async fn update_problem(
    Path(problem_id): Path<String>,
    CurrentManager(actor): CurrentManager,
    State(state): State<AppState>,
    Json(payload): Json<ProblemUpdate>,
) -> Result<Json<ProblemResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let reference_language = match payload.reference_language.as_deref() {
        Some(key) => Some(helpers::reference_language(key)?.to_string()),
        None => None,
    };
    let title = payload.title.map(|title| title.trim().to_string());
    if let Some(title) = title.as_deref() {
        helpers::ensure_title_free(&state, title, Some(&problem_id)).await?;
    }

    let problem = repositories::problems::update(
        state.db(),
        &problem_id,
        repositories::problems::UpdateProblem {
            title,
            statement: payload.statement,
            constraints: payload.constraints.map(normalize_constraints),
            reference_solution: payload.reference_solution,
            reference_language,
            time_limit_minutes: payload.time_limit_minutes,
        },
        primitive_now_utc(),
    )
    .await
    .map_err(|e| helpers::title_conflict_or_internal(e, "Failed to update problem"))?
    .ok_or_else(|| ApiError::NotFound("Problem not found".to_string()))?;

    tracing::info!(actor_id = %actor.id, problem_id = %problem.id, "Problem updated");

    Ok(Json(ProblemResponse::from_db(problem, true)))
}

pub(in crate::api::problems) async fn delete_problem(
    Path(problem_id): Path<String>,
    CurrentManager(actor): CurrentManager,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let deleted = repositories::problems::delete(state.db(), &problem_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete problem"))?;
    if !deleted {
        return Err(ApiError::NotFound("Problem not found".to_string()));
    }

    tracing::info!(actor_id = %actor.id, problem_id = %problem_id, "Problem deleted");

    Ok(StatusCode::NO_CONTENT)
}
