use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::redis::RateLimitScope;
use crate::core::security;
use crate::core::state::AppState;
use crate::repositories;
use crate::schemas::auth::{LoginRequest, TokenResponse};
use crate::schemas::user::UserResponse;

/// Max login attempts per email and window.
const LOGIN_RATE_LIMIT: u64 = 10;
const LOGIN_RATE_WINDOW_SECONDS: u64 = 60;

const BAD_CREDENTIALS: &str = "Incorrect email or password";

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/login", post(login)).route("/me", get(me))
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let allowed = state
        .redis()
        .allow(RateLimitScope::Login(&payload.email), LOGIN_RATE_LIMIT, LOGIN_RATE_WINDOW_SECONDS)
        .await;
    if !allowed {
        return Err(ApiError::TooManyRequests("Too many login attempts, try again later"));
    }

    let user = repositories::users::find_by_email(state.db(), &payload.email)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load user"))?
        .ok_or(ApiError::Unauthorized(BAD_CREDENTIALS))?;

    let verified = security::verify_password(&payload.password, &user.hashed_password)
        .map_err(|_| ApiError::Unauthorized(BAD_CREDENTIALS))?;

    if !verified {
        return Err(ApiError::Unauthorized(BAD_CREDENTIALS));
    }

    if !user.is_active {
        return Err(ApiError::BadRequest("Inactive user".to_string()));
    }

    let token = security::create_access_token(&user.id, state.settings(), None)
        .map_err(|e| ApiError::internal(e, "Failed to create access token"))?;

    tracing::info!(user_id = %user.id, role = user.role.as_str(), "User logged in");

    Ok(Json(TokenResponse {
        access_token: token,
        token_type: "bearer".to_string(),
        user: UserResponse::from_db(user),
    }))
}

async fn me(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(UserResponse::from_db(user))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    use crate::db::types::UserRole;
    use crate::test_support::{self, TEST_PASSWORD};

    #[tokio::test]
    async fn login_returns_token_usable_for_me() {
        let ctx = test_support::setup_test_context().await;
        test_support::insert_user(ctx.state.db(), "rec@example.com", "Rec", UserRole::Recruiter)
            .await;

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/auth/login",
                None,
                Some(json!({"email": "REC@example.com", "password": TEST_PASSWORD})),
            ))
            .await
            .expect("login");

        let status = response.status();
        let body = test_support::read_json(response).await;
        assert_eq!(status, StatusCode::OK, "response: {body}");
        assert_eq!(body["token_type"], "bearer");
        assert_eq!(body["user"]["role"], "recruiter");
        let token = body["access_token"].as_str().expect("token").to_string();

        let response = ctx
            .app
            .oneshot(test_support::json_request(Method::GET, "/api/v1/auth/me", Some(&token), None))
            .await
            .expect("me");

        let status = response.status();
        let me = test_support::read_json(response).await;
        assert_eq!(status, StatusCode::OK, "response: {me}");
        assert_eq!(me["email"], "rec@example.com");
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let ctx = test_support::setup_test_context().await;
        test_support::insert_user(ctx.state.db(), "cand@example.com", "Cand", UserRole::Candidate)
            .await;

        let response = ctx
            .app
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/auth/login",
                None,
                Some(json!({"email": "cand@example.com", "password": "wrong password"})),
            ))
            .await
            .expect("login");

        let status = response.status();
        let body = test_support::read_json(response).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "response: {body}");
        assert_eq!(body["detail"], "Incorrect email or password");
    }
}
