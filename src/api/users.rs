use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentManager;
use crate::api::pagination::{default_limit, PaginatedResponse};
use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::User;
use crate::db::types::UserRole;
use crate::repositories;
use crate::schemas::user::{UserCreate, UserResponse, UserUpdate};

#[derive(Debug, Deserialize)]
pub(crate) struct UserListQuery {
    #[serde(default)]
    skip: i64,
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    role: Option<UserRole>,
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/:user_id", put(update_user).delete(delete_user))
}

/// Recruiters only manage candidate accounts and may not hand out staff roles.
fn check_role_scope(
    actor: &User,
    target_role: UserRole,
    new_role: Option<UserRole>,
) -> Result<(), ApiError> {
    if actor.role == UserRole::Admin {
        return Ok(());
    }
    if target_role != UserRole::Candidate {
        return Err(ApiError::Forbidden("Recruiters can only manage candidates"));
    }
    if new_role.is_some_and(|role| role != UserRole::Candidate) {
        return Err(ApiError::Forbidden("Recruiters cannot assign staff roles"));
    }
    Ok(())
}

async fn list_users(
    Query(params): Query<UserListQuery>,
    CurrentManager(actor): CurrentManager,
    State(state): State<AppState>,
) -> Result<Json<PaginatedResponse<UserResponse>>, ApiError> {
    let role = if actor.role == UserRole::Admin { params.role } else { Some(UserRole::Candidate) };
    let skip = params.skip.max(0);
    let limit = params.limit.clamp(1, 1000);

    let users = repositories::users::list(state.db(), role, skip, limit)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list users"))?;
    let total_count = repositories::users::count(state.db(), role)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count users"))?;

    Ok(Json(PaginatedResponse {
        items: users.into_iter().map(UserResponse::from_db).collect(),
        total_count,
        skip,
        limit,
    }))
}

async fn create_user(
    CurrentManager(actor): CurrentManager,
    State(state): State<AppState>,
    Json(payload): Json<UserCreate>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    check_role_scope(&actor, payload.role, None)?;

    let email = payload.email.trim().to_lowercase();
    let taken = repositories::users::exists_by_email(state.db(), &email, None)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check existing user"))?;
    if taken {
        return Err(ApiError::Conflict("User with this email already exists".to_string()));
    }

    let hashed_password = security::hash_password(&payload.password)
        .map_err(|e| ApiError::internal(e, "Failed to hash password"))?;

    let user = repositories::users::create(
        state.db(),
        repositories::users::CreateUser {
            id: &Uuid::new_v4().to_string(),
            email: &email,
            hashed_password,
            full_name: payload.full_name.trim(),
            role: payload.role,
            is_active: payload.is_active,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| {
        if repositories::is_unique_violation(&e) {
            ApiError::Conflict("User with this email already exists".to_string())
        } else {
            ApiError::internal(e, "Failed to create user")
        }
    })?;

    tracing::info!(
        actor_id = %actor.id,
        user_id = %user.id,
        role = user.role.as_str(),
        action = "user_create",
        "Created user"
    );

    Ok((StatusCode::CREATED, Json(UserResponse::from_db(user))))
}

async fn update_user(
    Path(user_id): Path<String>,
    CurrentManager(actor): CurrentManager,
    State(state): State<AppState>,
    Json(payload): Json<UserUpdate>,
) -> Result<Json<UserResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let target = repositories::users::find_by_id(state.db(), &user_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch user"))?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    check_role_scope(&actor, target.role, payload.role)?;

    let email = payload.email.map(|email| email.trim().to_lowercase());
    if let Some(email) = email.as_deref() {
        let taken = repositories::users::exists_by_email(state.db(), email, Some(&user_id))
            .await
            .map_err(|e| ApiError::internal(e, "Failed to check existing user"))?;
        if taken {
            return Err(ApiError::Conflict("User with this email already exists".to_string()));
        }
    }

    let hashed_password = match payload.password.as_deref() {
        Some(password) => Some(
            security::hash_password(password)
                .map_err(|e| ApiError::internal(e, "Failed to hash password"))?,
        ),
        None => None,
    };

    let updated = repositories::users::update(
        state.db(),
        &user_id,
        repositories::users::UpdateUser {
            email,
            full_name: payload.full_name.map(|name| name.trim().to_string()),
            role: payload.role,
            is_active: payload.is_active,
            hashed_password,
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| {
        if repositories::is_unique_violation(&e) {
            ApiError::Conflict("User with this email already exists".to_string())
        } else {
            ApiError::internal(e, "Failed to update user")
        }
    })?
    .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    tracing::info!(
        actor_id = %actor.id,
        user_id = %updated.id,
        action = "user_update",
        "Updated user"
    );

    Ok(Json(UserResponse::from_db(updated)))
}

async fn delete_user(
    Path(user_id): Path<String>,
    CurrentManager(actor): CurrentManager,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    if actor.id == user_id {
        return Err(ApiError::BadRequest("You cannot delete your own account".to_string()));
    }

    let target = repositories::users::find_by_id(state.db(), &user_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch user"))?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    check_role_scope(&actor, target.role, None)?;

    // Submissions outlive their author; the foreign key refuses the delete.
    let deleted = repositories::users::delete(state.db(), &user_id).await.map_err(|e| {
        if repositories::is_foreign_key_violation(&e) {
            ApiError::Conflict(
                "User has submissions and cannot be deleted; deactivate the account instead"
                    .to_string(),
            )
        } else {
            ApiError::internal(e, "Failed to delete user")
        }
    })?;
    if !deleted {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    tracing::info!(actor_id = %actor.id, user_id = %user_id, action = "user_delete", "Deleted user");

    Ok(StatusCode::NO_CONTENT)
}
