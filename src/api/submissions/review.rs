use axum::{
    extract::{Path, State},
    Json,
};

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentManager, CurrentUser};
use crate::core::state::AppState;
use crate::schemas::submission::{EvaluateRequest, SubmissionDetailResponse, SubmissionResponse};
use crate::services::{evaluation, submission_lifecycle};

pub(super) async fn get_submission(
    Path(submission_id): Path<String>,
    CurrentUser(viewer): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<SubmissionDetailResponse>, ApiError> {
    let view = submission_lifecycle::view(&state, &viewer, &submission_id).await?;

    Ok(Json(SubmissionDetailResponse::from_view(view)))
}

pub(super) async fn evaluate(
    Path(submission_id): Path<String>,
    CurrentManager(reviewer): CurrentManager,
    State(state): State<AppState>,
    Json(payload): Json<EvaluateRequest>,
) -> Result<Json<SubmissionResponse>, ApiError> {
    let submission =
        evaluation::evaluate(state.db(), &submission_id, &payload.score, &reviewer.id).await?;

    Ok(Json(SubmissionResponse::from_db(submission)))
}
