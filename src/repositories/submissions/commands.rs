use std::collections::HashMap;

use sqlx::PgPool;
use uuid::Uuid;

use crate::db::models::Submission;
use crate::db::types::SubmissionState;

use super::types::{DraftUpsert, EvaluationUpdate, FinalizeSubmission, Finalized, COLUMNS};

/// Creates the pair's draft or updates it in place. The partial unique index
/// `submissions_one_draft_per_pair` is the conflict target, so concurrent
/// autosaves converge on one row.
pub(crate) async fn upsert_draft(
    pool: &PgPool,
    params: DraftUpsert<'_>,
) -> Result<Submission, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "INSERT INTO submissions (
            id, candidate_id, problem_id, last_saved_code, language, submission_status,
            created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, 'draft', $6, $6)
        ON CONFLICT (candidate_id, problem_id) WHERE submission_status = 'draft'
        DO UPDATE SET last_saved_code = EXCLUDED.last_saved_code,
                      language = EXCLUDED.language,
                      updated_at = EXCLUDED.updated_at
        RETURNING {COLUMNS}",
    ))
    .bind(Uuid::new_v4().to_string())
    .bind(params.candidate_id)
    .bind(params.problem_id)
    .bind(params.code)
    .bind(params.language)
    .bind(params.now)
    .fetch_one(pool)
    .await
}

/// Updates a draft's editor contents; `None` once the submission is no longer a draft.
pub(crate) async fn save_code(
    pool: &PgPool,
    submission_id: &str,
    code: &str,
    language: &str,
    now: time::PrimitiveDateTime,
) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "UPDATE submissions
         SET last_saved_code = $1, language = $2, updated_at = $3
         WHERE id = $4 AND submission_status = $5
         RETURNING {COLUMNS}"
    ))
    .bind(code)
    .bind(language)
    .bind(now)
    .bind(submission_id)
    .bind(SubmissionState::Draft)
    .fetch_optional(pool)
    .await
}

/// Seals the submission and writes one result per graded testcase, all in one
/// transaction. The state change is a compare-and-swap on `draft`.
///
/// The graded testcases are share-locked and compared with the grading
/// snapshot first, so a concurrent edit or delete either waits for this
/// commit or makes the submit fail with nothing written.
pub(crate) async fn finalize(
    pool: &PgPool,
    params: FinalizeSubmission<'_>,
) -> Result<Finalized, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let ids: Vec<String> = params.graded.iter().map(|testcase| testcase.id.clone()).collect();
    let current: HashMap<String, (String, String)> = sqlx::query_as::<_, (String, String, String)>(
        "SELECT id, input, expected_output FROM testcases WHERE id = ANY($1) FOR SHARE",
    )
    .bind(ids)
    .fetch_all(&mut *tx)
    .await?
    .into_iter()
    .map(|(id, input, expected_output)| (id, (input, expected_output)))
    .collect();

    let unchanged = params.graded.iter().all(|testcase| {
        current.get(&testcase.id).is_some_and(|(input, expected_output)| {
            *input == testcase.input && *expected_output == testcase.expected_output
        })
    });
    if !unchanged {
        tx.rollback().await?;
        return Ok(Finalized::TestcasesChanged);
    }

    let sealed = sqlx::query_as::<_, Submission>(&format!(
        "UPDATE submissions
         SET submission_status = $1,
             code = $2,
             status = $3,
             passed_count = $4,
             total_count = $5,
             score = $6,
             submitted_at = $7,
             updated_at = $7
         WHERE id = $8 AND submission_status = $9
         RETURNING {COLUMNS}"
    ))
    .bind(SubmissionState::Submitted)
    .bind(params.code)
    .bind(params.aggregate.status)
    .bind(params.aggregate.passed)
    .bind(params.aggregate.total)
    .bind(params.aggregate.score)
    .bind(params.now)
    .bind(params.submission_id)
    .bind(SubmissionState::Draft)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(sealed) = sealed else {
        tx.rollback().await?;
        return Ok(Finalized::AlreadySubmitted);
    };

    for outcome in params.outcomes {
        sqlx::query(
            "INSERT INTO submission_results (
                id, submission_id, testcase_id, actual_output, status, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(params.submission_id)
        .bind(&outcome.testcase_id)
        .bind(&outcome.stdout)
        .bind(outcome.status)
        .bind(params.now)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(Finalized::Sealed(sealed))
}

/// Touches only the evaluation columns; graded fields stay as they are.
pub(crate) async fn set_evaluation(
    pool: &PgPool,
    params: EvaluationUpdate<'_>,
) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "UPDATE submissions
         SET is_evaluated = TRUE,
             evaluation_score = $1,
             evaluated_by = $2,
             evaluated_at = $3
         WHERE id = $4
         RETURNING {COLUMNS}"
    ))
    .bind(params.score)
    .bind(params.evaluated_by)
    .bind(params.now)
    .bind(params.submission_id)
    .fetch_optional(pool)
    .await
}
