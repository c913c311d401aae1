use sqlx::PgPool;

use crate::db::types::{GradeStatus, SubmissionState, UserRole};

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct PlatformCounts {
    pub(crate) problems: i64,
    pub(crate) candidates: i64,
    pub(crate) assignments: i64,
    pub(crate) submissions: i64,
    pub(crate) passed_submissions: i64,
}

/// Submissions here are finalised attempts only; drafts are not counted.
pub(crate) async fn platform_counts(pool: &PgPool) -> Result<PlatformCounts, sqlx::Error> {
    sqlx::query_as::<_, PlatformCounts>(
        "SELECT
            (SELECT COUNT(*) FROM problems) AS problems,
            (SELECT COUNT(*) FROM users WHERE role = $1) AS candidates,
            (SELECT COUNT(*) FROM assignments) AS assignments,
            (SELECT COUNT(*) FROM submissions WHERE submission_status = $2) AS submissions,
            (SELECT COUNT(*) FROM submissions
              WHERE submission_status = $2 AND status = $3) AS passed_submissions",
    )
    .bind(UserRole::Candidate)
    .bind(SubmissionState::Submitted)
    .bind(GradeStatus::Passed)
    .fetch_one(pool)
    .await
}
