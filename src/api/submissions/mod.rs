mod candidate;
mod review;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::core::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        // Candidate endpoints
        .route("/draft", post(candidate::save_draft))
        .route("/mine", get(candidate::list_mine))
        .route("/:submission_id/run", post(candidate::run))
        .route("/:submission_id/submit", post(candidate::submit))
        // Review endpoints; candidates may only read their own
        .route("/:submission_id", get(review::get_submission))
        .route("/:submission_id/evaluate", put(review::evaluate))
}

#[cfg(test)]
mod tests;
