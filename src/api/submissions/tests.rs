
use axum::http::{Method, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::db::models::Problem;
use crate::db::types::UserRole;
use crate::test_support::{self, TestContext};

/// A recruiter-authored problem assigned to one candidate.
struct Scenario {
    problem: Problem,
    candidate_id: String,
    candidate_token: String,
    recruiter_token: String,
}

async fn scenario(ctx: &TestContext) -> Scenario {
    let db = ctx.state.db();
    let recruiter =
        test_support::insert_user(db, "rec@example.com", "Rec", UserRole::Recruiter).await;
    let candidate =
        test_support::insert_user(db, "cand@example.com", "Cand", UserRole::Candidate).await;
    let problem = test_support::insert_problem(db, "Echo", &recruiter.id).await;
    test_support::assign(db, &problem.id, &candidate.id, &recruiter.id).await;

    Scenario {
        candidate_token: test_support::bearer_token(&candidate.id, ctx.state.settings()),
        recruiter_token: test_support::bearer_token(&recruiter.id, ctx.state.settings()),
        candidate_id: candidate.id,
        problem,
    }
}

async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    token: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(test_support::json_request(method, uri, Some(token), body))
        .await
        .expect("response");
    let status = response.status();
    let body = test_support::read_json(response).await;
    (status, body)
}

async fn save_draft(app: &Router, token: &str, problem_id: &str, code: &str) -> (StatusCode, Value) {
    call(
        app,
        Method::POST,
        "/api/v1/submissions/draft",
        token,
        Some(json!({"problem_id": problem_id, "code": code, "language": "python"})),
    )
    .await
}
