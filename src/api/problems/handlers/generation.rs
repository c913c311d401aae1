use std::time::Duration;

use axum::{
    extract::{Path, State},
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
use crate::schemas::problem::{
    GenerateTestcasesRequest, GenerateTestcasesResponse, GenerationCounts, TestcaseResponse,
};
use crate::services::testcase_generation::{
    BucketCounts, GenerationError, GenerationPipeline, GenerationRequest,
};

use super::super::helpers;

const REGENERATION_LOCKED: &str =
    "Testcases are referenced by graded submissions and cannot be regenerated";

/// Replaces the problem's testcases with generated ones whose expected outputs
/// come from the reference solution.
pub(in crate::api::problems) async fn generate_testcases(
    Path(problem_id): Path<String>,
    CurrentManager(actor): CurrentManager,
    State(state): State<AppState>,
    payload: Option<Json<GenerateTestcasesRequest>>,
) -> Result<Json<GenerateTestcasesResponse>, ApiError> {
    let payload = payload.map(|Json(payload)| payload).unwrap_or_default();
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let problem = helpers::fetch_problem(&state, &problem_id).await?;
    // Repeated under the row lock before anything is replaced.
    ensure_regenerable(&state, &problem_id).await?;

    let generator = state.generator().ok_or(GenerationError::NotConfigured)?;
    let settings = state.settings().generation();
    let counts = BucketCounts {
        normal: payload.normal_count.unwrap_or(settings.default_normal_count),
        edge: payload.edge_count.unwrap_or(settings.default_edge_count),
        random: payload.random_count.unwrap_or(settings.default_random_count),
    };

    let pipeline = GenerationPipeline {
        generator,
        execution: state.execution(),
        run_delay: Duration::from_millis(settings.run_delay_ms),
        visible_quota: settings.visible_quota,
    };
    let request = GenerationRequest {
        statement: &problem.statement,
        constraints: &problem.constraints.0,
        counts,
    };
    let cases = pipeline
        .run(&request, &problem.reference_language, &problem.reference_solution)
        .await?;

    let ids: Vec<String> = cases.iter().map(|_| Uuid::new_v4().to_string()).collect();
    let now = primitive_now_utc();
    let replacement = ids
        .iter()
        .zip(&cases)
        .map(|(id, case)| repositories::testcases::NewTestcase {
            id,
            problem_id: &problem_id,
            input: &case.input,
            expected_output: &case.expected_output,
            is_hidden: case.is_hidden,
            category: case.category,
            origin: TestcaseOrigin::Ai,
            created_at: now,
        })
        .collect();

    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    let locked = repositories::problems::lock_for_update(&mut tx, &problem_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to lock problem"))?;
    if !locked {
        return Err(ApiError::NotFound("Problem not found".to_string()));
    }
    let has_results = repositories::testcases::problem_has_results(&mut tx, &problem_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check testcase results"))?;
    if has_results {
        return Err(ApiError::Conflict(REGENERATION_LOCKED.to_string()));
    }

    let testcases = repositories::testcases::replace_for_problem(&mut tx, &problem_id, replacement)
        .await
        .map_err(|e| {
            if repositories::is_foreign_key_violation(&e) {
                ApiError::Conflict(REGENERATION_LOCKED.to_string())
            } else {
                ApiError::internal(e, "Failed to store generated testcases")
            }
        })?;

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit testcases"))?;

    let visible = testcases.iter().filter(|testcase| !testcase.is_hidden).count();
    let hidden = testcases.len() - visible;

    tracing::info!(
        actor_id = %actor.id,
        problem_id = %problem_id,
        visible,
        hidden,
        "Testcases regenerated"
    );

    Ok(Json(GenerateTestcasesResponse {
        ok: true,
        counts: GenerationCounts { visible, hidden },
        testcases: testcases.into_iter().map(TestcaseResponse::from_db).collect(),
    }))
}

async fn ensure_regenerable(state: &AppState, problem_id: &str) -> Result<(), ApiError> {
    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;
    let has_results = repositories::testcases::problem_has_results(&mut tx, problem_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check testcase results"))?;
    tx.rollback().await.map_err(|e| ApiError::internal(e, "Failed to end transaction"))?;

    if has_results {
        Err(ApiError::Conflict(REGENERATION_LOCKED.to_string()))
    } else {
        Ok(())
    }
}
