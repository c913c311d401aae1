mod handlers;
mod helpers;

use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::core::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_problems).post(handlers::create_problem))
        .route("/assigned", get(handlers::list_assigned_problems))
        .route(
            "/testcases/:testcase_id",
            put(handlers::update_testcase).delete(handlers::delete_testcase),
        )
        .route(
            "/:problem_id",
            get(handlers::get_problem).put(handlers::update_problem).delete(handlers::delete_problem),
        )
        .route(
            "/:problem_id/testcases",
            get(handlers::list_testcases).post(handlers::add_testcase),
        )
        .route("/:problem_id/generate-testcases", post(handlers::generate_testcases))
        .route("/:problem_id/assign", post(handlers::assign_users))
        .route("/:problem_id/assign/:user_id", delete(handlers::unassign_user))
        .route("/:problem_id/assigned-users", get(handlers::list_assigned_users))
        .route("/:problem_id/submissions", get(handlers::list_problem_submissions))
}
