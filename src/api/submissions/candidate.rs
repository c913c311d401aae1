use axum::{
    extract::{Path, State},
    Json,
};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentCandidate;
use crate::core::state::AppState;
use crate::db::types::TestcaseStatus;
use crate::repositories;
use crate::schemas::submission::{
    CodeRequest, DraftRequest, RunResponse, RunResultItem, SubmissionListItem,
    SubmissionResponse, SubmitResponse,
};
use crate::services::submission_lifecycle::{self, CodeUpdate};

pub(super) async fn save_draft(
    CurrentCandidate(candidate): CurrentCandidate,
    State(state): State<AppState>,
    Json(payload): Json<DraftRequest>,
) -> Result<Json<SubmissionResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let submission = submission_lifecycle::save_draft(
        &state,
        &candidate,
        &payload.problem_id,
        &payload.code,
        &payload.language,
    )
    .await?;

    Ok(Json(SubmissionResponse::from_db(submission)))
}

pub(super) async fn list_mine(
    CurrentCandidate(candidate): CurrentCandidate,
    State(state): State<AppState>,
) -> Result<Json<Vec<SubmissionListItem>>, ApiError> {
    let rows = repositories::submissions::list_for_candidate(state.db(), &candidate.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list submissions"))?;

    Ok(Json(rows.into_iter().map(SubmissionListItem::from_db).collect()))
}

fn code_request(payload: Option<Json<CodeRequest>>) -> Result<CodeRequest, ApiError> {
    let payload = payload.map(|Json(payload)| payload).unwrap_or_default();
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    Ok(payload)
}

pub(super) async fn run(
    Path(submission_id): Path<String>,
    CurrentCandidate(candidate): CurrentCandidate,
    State(state): State<AppState>,
    payload: Option<Json<CodeRequest>>,
) -> Result<Json<RunResponse>, ApiError> {
    let payload = code_request(payload)?;
    let update = CodeUpdate { code: payload.code.as_deref(), language: payload.language.as_deref() };

    let outcome = submission_lifecycle::run(&state, &candidate, &submission_id, update).await?;

    let total = outcome.cases.len();
    let passed = outcome
        .cases
        .iter()
        .filter(|(_, case)| case.status == TestcaseStatus::Passed)
        .count();

    Ok(Json(RunResponse {
        submission_id: outcome.submission.id,
        passed,
        total,
        results: outcome
            .cases
            .into_iter()
            .map(|(testcase, case)| RunResultItem::new(testcase, case))
            .collect(),
    }))
}

pub(super) async fn submit(
    Path(submission_id): Path<String>,
    CurrentCandidate(candidate): CurrentCandidate,
    State(state): State<AppState>,
    payload: Option<Json<CodeRequest>>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let payload = code_request(payload)?;
    let update = CodeUpdate { code: payload.code.as_deref(), language: payload.language.as_deref() };

    let outcome = submission_lifecycle::submit(&state, &candidate, &submission_id, update).await?;

    Ok(Json(SubmitResponse::new(outcome.submission, outcome.outcomes)))
}
