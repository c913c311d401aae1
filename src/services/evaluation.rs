//! Human-assigned score layered over automated grading.

use serde_json::Value;
use sqlx::PgPool;
use thiserror::Error;

use crate::core::time::primitive_now_utc;
use crate::db::models::Submission;
use crate::repositories;
use crate::repositories::submissions::EvaluationUpdate;

pub(crate) const MAX_SCORE: i32 = 100;

#[derive(Debug, Error)]
pub(crate) enum EvaluationError {
    #[error("score must be an integer between 0 and {MAX_SCORE}")]
    InvalidScore,
    #[error("submission not found")]
    NotFound,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Accepts a JSON integer or a string holding one. Floats, booleans and
/// out-of-range values are rejected.
pub(crate) fn parse_score(value: &Value) -> Result<i32, EvaluationError> {
    let parsed = match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    };

    parsed
        .filter(|score| (0..=i64::from(MAX_SCORE)).contains(score))
        .and_then(|score| i32::try_from(score).ok())
        .ok_or(EvaluationError::InvalidScore)
}

/// Upserts the evaluation. Leaves automated grading untouched.
pub(crate) async fn evaluate(
    pool: &PgPool,
    submission_id: &str,
    raw_score: &Value,
    evaluated_by: &str,
) -> Result<Submission, EvaluationError> {
    let score = parse_score(raw_score)?;

    let submission = repositories::submissions::set_evaluation(
        pool,
        EvaluationUpdate { submission_id, score, evaluated_by, now: primitive_now_utc() },
    )
    .await?
    .ok_or(EvaluationError::NotFound)?;

    tracing::info!(submission_id, score, evaluated_by, "Submission evaluated");
    Ok(submission)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{parse_score, EvaluationError};

    #[test]
    fn accepts_integers_and_integer_strings() {
        assert_eq!(parse_score(&json!(0)).unwrap(), 0);
        assert_eq!(parse_score(&json!(100)).unwrap(), 100);
        assert_eq!(parse_score(&json!(" 85 ")).unwrap(), 85);
    }

    #[test]
    fn rejects_out_of_range_and_non_integers() {
        for value in [json!(-1), json!(101), json!(72.5), json!("7a"), json!(null), json!(true)] {
            assert!(
                matches!(parse_score(&value), Err(EvaluationError::InvalidScore)),
                "accepted {value}"
            );
        }
    }
}
