use axum::{extract::State, routing::get, Json, Router};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentManager;
use crate::core::state::AppState;
use crate::repositories;
use crate::schemas::PlatformStatsResponse;

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/stats", get(stats))
}

/// Rounded percentage, half away from zero; 0 when nothing was submitted.
fn pass_rate(passed: i64, total: i64) -> i64 {
    if total <= 0 {
        return 0;
    }
    (200 * passed + total) / (2 * total)
}

async fn stats(
    CurrentManager(_actor): CurrentManager,
    State(state): State<AppState>,
) -> Result<Json<PlatformStatsResponse>, ApiError> {
    let counts = repositories::stats::platform_counts(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load platform stats"))?;

    Ok(Json(PlatformStatsResponse {
        problems: counts.problems,
        candidates: counts.candidates,
        assignments: counts.assignments,
        submissions: counts.submissions,
        passed_submissions: counts.passed_submissions,
        pass_rate: pass_rate(counts.passed_submissions, counts.submissions),
    }))
}
