use serde_json::Value;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use time::PrimitiveDateTime;

use crate::db::models::Problem;
use crate::db::types::{GradeStatus, TestcaseOrigin};

const COLUMNS: &str = "\
    id, title, statement, constraints, reference_solution, reference_language, \
    time_limit_minutes, created_by, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ProblemSummary {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) reference_language: String,
    pub(crate) time_limit_minutes: i32,
    pub(crate) created_by: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) testcase_count: i64,
    pub(crate) ai_testcase_count: i64,
    pub(crate) assigned_count: i64,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct AssignedProblem {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) statement: String,
    pub(crate) time_limit_minutes: i32,
    pub(crate) assigned_at: PrimitiveDateTime,
    pub(crate) draft_submission_id: Option<String>,
    pub(crate) submitted_submission_id: Option<String>,
    pub(crate) submitted_score: Option<i32>,
    pub(crate) submitted_status: Option<GradeStatus>,
}

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Problem>, sqlx::Error> {
    sqlx::query_as::<_, Problem>(&format!("SELECT {COLUMNS} FROM problems WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn exists(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM problems WHERE id = $1)")
        .bind(id)
        .fetch_one(pool)
        .await
}

pub(crate) async fn title_taken(
    pool: &PgPool,
    title: &str,
    except_id: Option<&str>,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(
            SELECT 1 FROM problems WHERE title = $1 AND ($2::text IS NULL OR id <> $2)
        )",
    )
    .bind(title)
    .bind(except_id)
    .fetch_one(pool)
    .await
}

pub(crate) async fn list_summaries(pool: &PgPool) -> Result<Vec<ProblemSummary>, sqlx::Error> {
    sqlx::query_as::<_, ProblemSummary>(
        "SELECT p.id, p.title, p.reference_language, p.time_limit_minutes, p.created_by,
                p.created_at,
                (SELECT COUNT(*) FROM testcases t WHERE t.problem_id = p.id) AS testcase_count,
                (SELECT COUNT(*) FROM testcases t
                  WHERE t.problem_id = p.id AND t.origin = $1) AS ai_testcase_count,
                (SELECT COUNT(*) FROM assignments a WHERE a.problem_id = p.id) AS assigned_count
         FROM problems p
         ORDER BY p.created_at DESC, p.id",
    )
    .bind(TestcaseOrigin::Ai)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_assigned(
    pool: &PgPool,
    user_id: &str,
) -> Result<Vec<AssignedProblem>, sqlx::Error> {
    sqlx::query_as::<_, AssignedProblem>(
        "SELECT p.id, p.title, p.statement, p.time_limit_minutes, a.assigned_at,
                d.id AS draft_submission_id,
                s.id AS submitted_submission_id,
                s.score AS submitted_score,
                s.status AS submitted_status
         FROM assignments a
         JOIN problems p ON p.id = a.problem_id
         LEFT JOIN submissions d
                ON d.problem_id = p.id AND d.candidate_id = a.user_id
               AND d.submission_status = 'draft'
         LEFT JOIN LATERAL (
                SELECT id, score, status FROM submissions
                WHERE problem_id = p.id AND candidate_id = a.user_id
                  AND submission_status = 'submitted'
                ORDER BY submitted_at DESC
                LIMIT 1
         ) s ON TRUE
         WHERE a.user_id = $1
         ORDER BY a.assigned_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub(crate) struct CreateProblem<'a> {
    pub(crate) id: &'a str,
    pub(crate) title: &'a str,
    pub(crate) statement: &'a str,
    pub(crate) constraints: Value,
    pub(crate) reference_solution: &'a str,
    pub(crate) reference_language: &'a str,
    pub(crate) time_limit_minutes: i32,
    pub(crate) created_by: &'a str,
    pub(crate) created_at: PrimitiveDateTime,
}

pub(crate) async fn create(pool: &PgPool, params: CreateProblem<'_>) -> Result<Problem, sqlx::Error> {
    sqlx::query_as::<_, Problem>(&format!(
        "INSERT INTO problems (
            id, title, statement, constraints, reference_solution, reference_language,
            time_limit_minutes, created_by, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$9)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.title)
    .bind(params.statement)
    .bind(Json(params.constraints))
    .bind(params.reference_solution)
    .bind(params.reference_language)
    .bind(params.time_limit_minutes)
    .bind(params.created_by)
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}

#[derive(Default)]
pub(crate) struct UpdateProblem {
    pub(crate) title: Option<String>,
    pub(crate) statement: Option<String>,
    pub(crate) constraints: Option<Value>,
    pub(crate) reference_solution: Option<String>,
    pub(crate) reference_language: Option<String>,
    pub(crate) time_limit_minutes: Option<i32>,
}

pub(crate) async fn update(
    pool: &PgPool,
    id: &str,
    params: UpdateProblem,
    now: PrimitiveDateTime,
) -> Result<Option<Problem>, sqlx::Error> {
    sqlx::query_as::<_, Problem>(&format!(
        "UPDATE problems SET
            title = COALESCE($1, title),
            statement = COALESCE($2, statement),
            constraints = COALESCE($3, constraints),
            reference_solution = COALESCE($4, reference_solution),
            reference_language = COALESCE($5, reference_language),
            time_limit_minutes = COALESCE($6, time_limit_minutes),
            updated_at = $7
         WHERE id = $8
         RETURNING {COLUMNS}",
    ))
    .bind(params.title)
    .bind(params.statement)
    .bind(params.constraints.map(Json))
    .bind(params.reference_solution)
    .bind(params.reference_language)
    .bind(params.time_limit_minutes)
    .bind(now)
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Testcases, assignments, submissions and their results go with it (FK cascade).
pub(crate) async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM problems WHERE id = $1").bind(id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}

/// Row lock that serialises testcase regeneration for one problem.
pub(crate) async fn lock_for_update(
    tx: &mut Transaction<'_, Postgres>,
    id: &str,
) -> Result<bool, sqlx::Error> {
    let locked = sqlx::query_scalar::<_, String>("SELECT id FROM problems WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(locked.is_some())
}
