use sqlx::PgPool;
use time::PrimitiveDateTime;
use uuid::Uuid;

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct AssignedUser {
    pub(crate) id: String,
    pub(crate) email: String,
    pub(crate) full_name: String,
    pub(crate) assigned_at: PrimitiveDateTime,
}

pub(crate) async fn exists(
    pool: &PgPool,
    problem_id: &str,
    user_id: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM assignments WHERE problem_id = $1 AND user_id = $2)",
    )
    .bind(problem_id)
    .bind(user_id)
    .fetch_one(pool)
    .await
}

/// Idempotent per (problem, user). Returns how many new assignments were created.
pub(crate) async fn assign_many(
    pool: &PgPool,
    problem_id: &str,
    user_ids: &[String],
    assigned_by: &str,
    now: PrimitiveDateTime,
) -> Result<u64, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let mut created = 0;

    for user_id in user_ids {
        let result = sqlx::query(
            "INSERT INTO assignments (id, problem_id, user_id, assigned_by, assigned_at)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (problem_id, user_id) DO NOTHING",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(problem_id)
        .bind(user_id)
        .bind(assigned_by)
        .bind(now)
        .execute(&mut *tx)
        .await?;
        created += result.rows_affected();
    }

    tx.commit().await?;
    Ok(created)
}

pub(crate) async fn list_users(
    pool: &PgPool,
    problem_id: &str,
) -> Result<Vec<AssignedUser>, sqlx::Error> {
    sqlx::query_as::<_, AssignedUser>(
        "SELECT u.id, u.email, u.full_name, a.assigned_at
         FROM assignments a
         JOIN users u ON u.id = a.user_id
         WHERE a.problem_id = $1
         ORDER BY a.assigned_at, u.full_name",
    )
    .bind(problem_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn unassign(
    pool: &PgPool,
    problem_id: &str,
    user_id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM assignments WHERE problem_id = $1 AND user_id = $2")
        .bind(problem_id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
