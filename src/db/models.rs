use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::{GradeStatus, SubmissionState, TestcaseCategory, TestcaseOrigin, UserRole};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct User {
    pub(crate) id: String,
    pub(crate) email: String,
    pub(crate) hashed_password: String,
    pub(crate) full_name: String,
    pub(crate) role: UserRole,
    pub(crate) is_active: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Problem {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) statement: String,
    pub(crate) constraints: Json<serde_json::Value>,
    pub(crate) reference_solution: String,
    pub(crate) reference_language: String,
    pub(crate) time_limit_minutes: i32,
    pub(crate) created_by: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

/// `seq` is the stable creation order used by every grading pass.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Testcase {
    pub(crate) id: String,
    pub(crate) seq: i64,
    pub(crate) problem_id: String,
    pub(crate) input: String,
    pub(crate) expected_output: String,
    pub(crate) is_hidden: bool,
    pub(crate) category: TestcaseCategory,
    pub(crate) origin: TestcaseOrigin,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Assignment {
    pub(crate) id: String,
    pub(crate) problem_id: String,
    pub(crate) user_id: String,
    pub(crate) assigned_by: Option<String>,
    pub(crate) assigned_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Submission {
    pub(crate) id: String,
    pub(crate) candidate_id: String,
    pub(crate) problem_id: String,
    pub(crate) last_saved_code: String,
    pub(crate) code: Option<String>,
    pub(crate) language: String,
    pub(crate) submission_status: SubmissionState,
    pub(crate) status: Option<GradeStatus>,
    pub(crate) passed_count: Option<i32>,
    pub(crate) total_count: Option<i32>,
    pub(crate) score: Option<i32>,
    pub(crate) is_evaluated: bool,
    pub(crate) evaluation_score: Option<i32>,
    pub(crate) evaluated_by: Option<String>,
    pub(crate) evaluated_at: Option<PrimitiveDateTime>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
    pub(crate) submitted_at: Option<PrimitiveDateTime>,
}

impl Submission {
    pub(crate) fn is_draft(&self) -> bool {
        self.submission_status == SubmissionState::Draft
    }
}
