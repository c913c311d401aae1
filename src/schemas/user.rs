use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::User;
use crate::db::types::UserRole;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct UserCreate {
    #[validate(email(message = "Invalid email address"))]
    pub(crate) email: String,
    #[serde(alias = "fullName", alias = "name")]
    #[validate(length(min = 1, max = 200, message = "full_name must not be empty"))]
    pub(crate) full_name: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters long"))]
    pub(crate) password: String,
    #[serde(default = "default_user_role")]
    pub(crate) role: UserRole,
    #[serde(default = "default_true")]
    #[serde(alias = "isActive")]
    pub(crate) is_active: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct UserUpdate {
    #[serde(default)]
    #[validate(email(message = "Invalid email address"))]
    pub(crate) email: Option<String>,
    #[serde(default)]
    #[serde(alias = "fullName", alias = "name")]
    #[validate(length(min = 1, max = 200, message = "full_name must not be empty"))]
    pub(crate) full_name: Option<String>,
    #[serde(default)]
    #[validate(length(min = 8, message = "Password must be at least 8 characters long"))]
    pub(crate) password: Option<String>,
    #[serde(default)]
    pub(crate) role: Option<UserRole>,
    #[serde(default)]
    #[serde(alias = "isActive")]
    pub(crate) is_active: Option<bool>,
}

#[derive(Debug, Serialize)]
pub(crate) struct UserResponse {
    pub(crate) id: String,
    pub(crate) email: String,
    pub(crate) full_name: String,
    pub(crate) role: UserRole,
    pub(crate) is_active: bool,
    pub(crate) created_at: String,
}

impl UserResponse {
    pub(crate) fn from_db(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            role: user.role,
            is_active: user.is_active,
            created_at: format_primitive(user.created_at),
        }
    }
}

fn default_user_role() -> UserRole {
    UserRole::Candidate
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use validator::Validate;

    use super::*;

    #[test]
    fn create_defaults_to_active_candidate() {
        let payload: UserCreate = serde_json::from_value(json!({
            "email": "cand@example.com",
            "name": "Candidate",
            "password": "long-enough"
        }))
        .expect("payload");

        assert_eq!(payload.role, UserRole::Candidate);
        assert!(payload.is_active);
        assert_eq!(payload.full_name, "Candidate");
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn short_password_and_bad_email_fail_validation() {
        let payload: UserCreate = serde_json::from_value(json!({
            "email": "not-an-email",
            "full_name": "X",
            "password": "short"
        }))
        .expect("payload");

        let errors = payload.validate().expect_err("invalid").to_string();
        assert!(errors.contains("Password must be at least"));
        assert!(errors.contains("Invalid email address"));
    }
}
