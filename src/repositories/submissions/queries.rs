use sqlx::PgPool;

use crate::db::models::Submission;
use crate::db::types::SubmissionState;

use super::types::{ResultDetail, SubmissionListing, COLUMNS};

const LISTING_SELECT: &str = "\
    SELECT s.id, s.candidate_id, u.full_name AS candidate_name, u.email AS candidate_email,
           s.problem_id, p.title AS problem_title, s.language, s.submission_status, s.status,
           s.passed_count, s.total_count, s.score, s.is_evaluated, s.evaluation_score,
           s.updated_at, s.submitted_at
    FROM submissions s
    JOIN users u ON u.id = s.candidate_id
    JOIN problems p ON p.id = s.problem_id";

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!("SELECT {COLUMNS} FROM submissions WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn has_submitted(
    pool: &PgPool,
    candidate_id: &str,
    problem_id: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(
            SELECT 1 FROM submissions
            WHERE candidate_id = $1 AND problem_id = $2 AND submission_status = $3
        )",
    )
    .bind(candidate_id)
    .bind(problem_id)
    .bind(SubmissionState::Submitted)
    .fetch_one(pool)
    .await
}

pub(crate) async fn list_for_problem(
    pool: &PgPool,
    problem_id: &str,
) -> Result<Vec<SubmissionListing>, sqlx::Error> {
    sqlx::query_as::<_, SubmissionListing>(&format!(
        "{LISTING_SELECT}
         WHERE s.problem_id = $1
         ORDER BY s.submitted_at DESC NULLS LAST, s.updated_at DESC"
    ))
    .bind(problem_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_for_candidate(
    pool: &PgPool,
    candidate_id: &str,
) -> Result<Vec<SubmissionListing>, sqlx::Error> {
    sqlx::query_as::<_, SubmissionListing>(&format!(
        "{LISTING_SELECT}
         WHERE s.candidate_id = $1
         ORDER BY s.updated_at DESC"
    ))
    .bind(candidate_id)
    .fetch_all(pool)
    .await
}

/// Results in testcase creation order.
pub(crate) async fn list_results(
    pool: &PgPool,
    submission_id: &str,
) -> Result<Vec<ResultDetail>, sqlx::Error> {
    sqlx::query_as::<_, ResultDetail>(
        "SELECT r.testcase_id, t.input, t.expected_output, t.is_hidden, r.actual_output, r.status
         FROM submission_results r
         JOIN testcases t ON t.id = r.testcase_id
         WHERE r.submission_id = $1
         ORDER BY t.seq",
    )
    .bind(submission_id)
    .fetch_all(pool)
    .await
}
