use uuid::Uuid;

use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::types::UserRole;
use crate::repositories;
use crate::repositories::users::{CreateUser, UpdateUser};

/// Creates the bootstrap admin, or repairs its password, role and active flag.
pub(crate) async fn ensure_superuser(state: &AppState) -> anyhow::Result<()> {
    let admin = state.settings().admin();
    if admin.first_superuser_password.is_empty() {
        tracing::warn!("FIRST_SUPERUSER_PASSWORD not configured; skipping superuser creation");
        return Ok(());
    }

    let email = admin.first_superuser_email.trim().to_lowercase();
    let now = primitive_now_utc();

    if let Some(user) = repositories::users::find_by_email(state.db(), &email).await? {
        let verified =
            security::verify_password(&admin.first_superuser_password, &user.hashed_password)
                .unwrap_or(false);

        let hashed_password = if verified {
            None
        } else {
            Some(security::hash_password(&admin.first_superuser_password)?)
        };
        let role = (user.role != UserRole::Admin).then_some(UserRole::Admin);
        let is_active = (!user.is_active).then_some(true);

        if hashed_password.is_none() && role.is_none() && is_active.is_none() {
            tracing::info!("Default superuser already up to date");
            return Ok(());
        }

        repositories::users::update(
            state.db(),
            &user.id,
            UpdateUser {
                email: None,
                full_name: None,
                role,
                is_active,
                hashed_password,
                updated_at: now,
            },
        )
        .await?;

        tracing::info!(%email, "Updated default superuser");
        return Ok(());
    }

    let hashed_password = security::hash_password(&admin.first_superuser_password)?;
    repositories::users::create(
        state.db(),
        CreateUser {
            id: &Uuid::new_v4().to_string(),
            email: &email,
            hashed_password,
            full_name: &admin.first_superuser_name,
            role: UserRole::Admin,
            is_active: true,
            created_at: now,
        },
    )
    .await?;

    tracing::info!(%email, "Created default superuser");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::ensure_superuser;
    use crate::core::security;
    use crate::db::types::UserRole;
    use crate::repositories;
    use crate::test_support;

    #[tokio::test]
    async fn creates_then_repairs_superuser() {
        let ctx = test_support::setup_test_context().await;
        let admin = ctx.state.settings().admin().clone();

        ensure_superuser(&ctx.state).await.expect("create");
        let created = repositories::users::find_by_email(ctx.state.db(), &admin.first_superuser_email)
            .await
            .expect("lookup")
            .expect("superuser");
        assert_eq!(created.role, UserRole::Admin);

        sqlx::query("UPDATE users SET role = 'candidate', is_active = FALSE WHERE id = $1")
            .bind(&created.id)
            .execute(ctx.state.db())
            .await
            .expect("demote");

        ensure_superuser(&ctx.state).await.expect("repair");
        let repaired = repositories::users::find_by_id(ctx.state.db(), &created.id)
            .await
            .expect("lookup")
            .expect("superuser");
        assert_eq!(repaired.role, UserRole::Admin);
        assert!(repaired.is_active);
        assert!(security::verify_password(&admin.first_superuser_password, &repaired.hashed_password)
            .expect("verify"));
    }
}
