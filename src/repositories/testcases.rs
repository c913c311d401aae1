use sqlx::{PgPool, Postgres, Transaction};
use time::PrimitiveDateTime;

use crate::db::models::Testcase;
use crate::db::types::{TestcaseCategory, TestcaseOrigin};

const COLUMNS: &str =
    "id, seq, problem_id, input, expected_output, is_hidden, category, origin, created_at";

/// All testcases of a problem in creation order.
pub(crate) async fn list_for_problem(
    pool: &PgPool,
    problem_id: &str,
) -> Result<Vec<Testcase>, sqlx::Error> {
    sqlx::query_as::<_, Testcase>(&format!(
        "SELECT {COLUMNS} FROM testcases WHERE problem_id = $1 ORDER BY seq"
    ))
    .bind(problem_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_visible_for_problem(
    pool: &PgPool,
    problem_id: &str,
) -> Result<Vec<Testcase>, sqlx::Error> {
    sqlx::query_as::<_, Testcase>(&format!(
        "SELECT {COLUMNS} FROM testcases
         WHERE problem_id = $1 AND is_hidden = FALSE
         ORDER BY seq"
    ))
    .bind(problem_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn problem_has_results(
    tx: &mut Transaction<'_, Postgres>,
    problem_id: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(
            SELECT 1 FROM submission_results r
            JOIN testcases t ON t.id = r.testcase_id
            WHERE t.problem_id = $1
        )",
    )
    .bind(problem_id)
    .fetch_one(&mut **tx)
    .await
}

pub(crate) struct NewTestcase<'a> {
    pub(crate) id: &'a str,
    pub(crate) problem_id: &'a str,
    pub(crate) input: &'a str,
    pub(crate) expected_output: &'a str,
    pub(crate) is_hidden: bool,
    pub(crate) category: TestcaseCategory,
    pub(crate) origin: TestcaseOrigin,
    pub(crate) created_at: PrimitiveDateTime,
}

pub(crate) async fn create(pool: &PgPool, params: NewTestcase<'_>) -> Result<Testcase, sqlx::Error> {
    let mut conn = pool.acquire().await?;
    insert(&mut *conn, params).await
}

async fn insert(
    conn: &mut sqlx::PgConnection,
    params: NewTestcase<'_>,
) -> Result<Testcase, sqlx::Error> {
    sqlx::query_as::<_, Testcase>(&format!(
        "INSERT INTO testcases (
            id, problem_id, input, expected_output, is_hidden, category, origin, created_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.problem_id)
    .bind(params.input)
    .bind(params.expected_output)
    .bind(params.is_hidden)
    .bind(params.category)
    .bind(params.origin)
    .bind(params.created_at)
    .fetch_one(conn)
    .await
}

/// Deletes every testcase of the problem and inserts `testcases` in order.
pub(crate) async fn replace_for_problem(
    tx: &mut Transaction<'_, Postgres>,
    problem_id: &str,
    testcases: Vec<NewTestcase<'_>>,
) -> Result<Vec<Testcase>, sqlx::Error> {
    sqlx::query("DELETE FROM testcases WHERE problem_id = $1")
        .bind(problem_id)
        .execute(&mut **tx)
        .await?;

    let mut inserted = Vec::with_capacity(testcases.len());
    for params in testcases {
        inserted.push(insert(&mut **tx, params).await?);
    }
    Ok(inserted)
}

#[derive(Default)]
pub(crate) struct UpdateTestcase {
    pub(crate) input: Option<String>,
    pub(crate) expected_output: Option<String>,
    pub(crate) is_hidden: Option<bool>,
    pub(crate) category: Option<TestcaseCategory>,
}

/// Outcome of a write guarded by "no submission results reference this testcase".
#[derive(Debug)]
pub(crate) enum GuardedWrite<T> {
    Done(T),
    Missing,
    Locked,
}

/// Takes the row lock, then checks for results with a fresh snapshot. A
/// finalize holding `FOR SHARE` on the testcase commits before the check runs.
async fn lock_unreferenced(
    tx: &mut Transaction<'_, Postgres>,
    id: &str,
) -> Result<GuardedWrite<()>, sqlx::Error> {
    let locked = sqlx::query_scalar::<_, String>("SELECT id FROM testcases WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;
    if locked.is_none() {
        return Ok(GuardedWrite::Missing);
    }

    let referenced = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM submission_results WHERE testcase_id = $1)",
    )
    .bind(id)
    .fetch_one(&mut **tx)
    .await?;

    Ok(if referenced { GuardedWrite::Locked } else { GuardedWrite::Done(()) })
}

/// Applies only while no submission result references the testcase.
pub(crate) async fn update_unreferenced(
    pool: &PgPool,
    id: &str,
    params: UpdateTestcase,
) -> Result<GuardedWrite<Testcase>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    match lock_unreferenced(&mut tx, id).await? {
        GuardedWrite::Done(()) => {}
        GuardedWrite::Missing => return Ok(GuardedWrite::Missing),
        GuardedWrite::Locked => return Ok(GuardedWrite::Locked),
    }

    let updated = sqlx::query_as::<_, Testcase>(&format!(
        "UPDATE testcases SET
            input = COALESCE($1, input),
            expected_output = COALESCE($2, expected_output),
            is_hidden = COALESCE($3, is_hidden),
            category = COALESCE($4, category)
         WHERE id = $5
         RETURNING {COLUMNS}",
    ))
    .bind(params.input)
    .bind(params.expected_output)
    .bind(params.is_hidden)
    .bind(params.category)
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(GuardedWrite::Done(updated))
}

pub(crate) async fn delete_unreferenced(
    pool: &PgPool,
    id: &str,
) -> Result<GuardedWrite<()>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    match lock_unreferenced(&mut tx, id).await? {
        GuardedWrite::Done(()) => {}
        other => return Ok(other),
    }

    let deleted = sqlx::query("DELETE FROM testcases WHERE id = $1").bind(id).execute(&mut *tx).await;
    match deleted {
        Ok(_) => {}
        // A result that slipped past the check still pins the row.
        Err(err) if super::is_foreign_key_violation(&err) => return Ok(GuardedWrite::Locked),
        Err(err) => return Err(err),
    }

    tx.commit().await?;
    Ok(GuardedWrite::Done(()))
}
