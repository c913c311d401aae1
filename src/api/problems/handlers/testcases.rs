use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentManager;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::types::TestcaseOrigin;
use crate::repositories;
use crate::repositories::testcases::GuardedWrite;
use crate::schemas::problem::{TestcaseCreate, TestcaseResponse, TestcaseUpdate};

use super::super::helpers;

const LOCKED: &str = "Testcase is referenced by graded submissions and cannot be changed";

pub(in crate::api::problems) async fn list_testcases(
    Path(problem_id): Path<String>,
    CurrentManager(_actor): CurrentManager,
    State(state): State<AppState>,
) -> Result<Json<Vec<TestcaseResponse>>, ApiError> {
    helpers::ensure_problem_exists(&state, &problem_id).await?;

    let testcases = repositories::testcases::list_for_problem(state.db(), &problem_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list testcases"))?;

    Ok(Json(testcases.into_iter().map(TestcaseResponse::from_db).collect()))
}

pub(in crate::api::problems) async fn add_testcase(
    Path(problem_id): Path<String>,
    CurrentManager(actor): CurrentManager,
    State(state): State<AppState>,
    Json(payload): Json<TestcaseCreate>,
) -> Result<(StatusCode, Json<TestcaseResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    helpers::ensure_problem_exists(&state, &problem_id).await?;

    let testcase = repositories::testcases::create(
        state.db(),
        repositories::testcases::NewTestcase {
            id: &Uuid::new_v4().to_string(),
            problem_id: &problem_id,
            input: &payload.input,
            expected_output: &payload.expected_output,
            is_hidden: payload.is_hidden,
            category: payload.category,
            origin: TestcaseOrigin::Manual,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create testcase"))?;

    tracing::info!(
        actor_id = %actor.id,
        problem_id = %problem_id,
        testcase_id = %testcase.id,
        hidden = testcase.is_hidden,
        "Testcase added"
    );

    Ok((StatusCode::CREATED, Json(TestcaseResponse::from_db(testcase))))
}

pub(in crate::api::problems) async fn update_testcase(
    Path(testcase_id): Path<String>,
    CurrentManager(actor): CurrentManager,
    State(state): State<AppState>,
    Json(payload): Json<TestcaseUpdate>,
) -> Result<Json<TestcaseResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let outcome = repositories::testcases::update_unreferenced(
        state.db(),
        &testcase_id,
        repositories::testcases::UpdateTestcase {
            input: payload.input,
            expected_output: payload.expected_output,
            is_hidden: payload.is_hidden,
            category: payload.category,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update testcase"))?;

    match outcome {
        GuardedWrite::Done(testcase) => {
            tracing::info!(actor_id = %actor.id, testcase_id = %testcase.id, "Testcase updated");
            Ok(Json(TestcaseResponse::from_db(testcase)))
        }
        GuardedWrite::Missing => Err(ApiError::NotFound("Testcase not found".to_string())),
        GuardedWrite::Locked => Err(ApiError::Conflict(LOCKED.to_string())),
    }
}

pub(in crate::api::problems) async fn delete_testcase(
    Path(testcase_id): Path<String>,
    CurrentManager(actor): CurrentManager,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let outcome = repositories::testcases::delete_unreferenced(state.db(), &testcase_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete testcase"))?;

    match outcome {
        GuardedWrite::Done(()) => {
            tracing::info!(actor_id = %actor.id, testcase_id = %testcase_id, "Testcase deleted");
            Ok(StatusCode::NO_CONTENT)
        }
        GuardedWrite::Missing => Err(ApiError::NotFound("Testcase not found".to_string())),
        GuardedWrite::Locked => Err(ApiError::Conflict(LOCKED.to_string())),
    }
}
