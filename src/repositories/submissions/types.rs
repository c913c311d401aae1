use time::PrimitiveDateTime;

use crate::db::models::{Submission, Testcase};
use crate::db::types::{GradeStatus, SubmissionState, TestcaseStatus};
use crate::services::grading::{Aggregate, CaseOutcome};

pub(crate) const COLUMNS: &str = "\
    id, candidate_id, problem_id, last_saved_code, code, language, submission_status, \
    status, passed_count, total_count, score, is_evaluated, evaluation_score, evaluated_by, \
    evaluated_at, created_at, updated_at, submitted_at";

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct SubmissionListing {
    pub(crate) id: String,
    pub(crate) candidate_id: String,
    pub(crate) candidate_name: String,
    pub(crate) candidate_email: String,
    pub(crate) problem_id: String,
    pub(crate) problem_title: String,
    pub(crate) language: String,
    pub(crate) submission_status: SubmissionState,
    pub(crate) status: Option<GradeStatus>,
    pub(crate) passed_count: Option<i32>,
    pub(crate) total_count: Option<i32>,
    pub(crate) score: Option<i32>,
    pub(crate) is_evaluated: bool,
    pub(crate) evaluation_score: Option<i32>,
    pub(crate) updated_at: PrimitiveDateTime,
    pub(crate) submitted_at: Option<PrimitiveDateTime>,
}

/// A persisted result joined with its testcase.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct ResultDetail {
    pub(crate) testcase_id: String,
    pub(crate) input: String,
    pub(crate) expected_output: String,
    pub(crate) is_hidden: bool,
    pub(crate) actual_output: String,
    pub(crate) status: TestcaseStatus,
}

pub(crate) struct DraftUpsert<'a> {
    pub(crate) candidate_id: &'a str,
    pub(crate) problem_id: &'a str,
    pub(crate) code: &'a str,
    pub(crate) language: &'a str,
    pub(crate) now: PrimitiveDateTime,
}

pub(crate) struct FinalizeSubmission<'a> {
    pub(crate) submission_id: &'a str,
    /// The exact source that was graded.
    pub(crate) code: &'a str,
    pub(crate) aggregate: Aggregate,
    pub(crate) outcomes: &'a [CaseOutcome],
    /// Testcases as they were when graded.
    pub(crate) graded: &'a [Testcase],
    pub(crate) now: PrimitiveDateTime,
}

#[derive(Debug)]
pub(crate) enum Finalized {
    Sealed(Submission),
    /// Another request finalised the submission first.
    AlreadySubmitted,
    /// A graded testcase was edited or removed while grading ran.
    TestcasesChanged,
}

pub(crate) struct EvaluationUpdate<'a> {
    pub(crate) submission_id: &'a str,
    pub(crate) score: i32,
    pub(crate) evaluated_by: &'a str,
    pub(crate) now: PrimitiveDateTime,
}
