use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::core::time::{format_optional, format_primitive};
use crate::db::models::{Submission, Testcase};
use crate::db::types::{GradeStatus, SubmissionState, TestcaseStatus};
use crate::repositories::submissions::{ResultDetail, SubmissionListing};
use crate::services::grading::CaseOutcome;
use crate::services::submission_lifecycle::SubmissionView;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct DraftRequest {
    #[serde(alias = "problemId")]
    #[validate(length(min = 1, message = "problem_id must not be empty"))]
    pub(crate) problem_id: String,
    #[serde(default)]
    #[validate(length(max = 200000, message = "code is too long"))]
    pub(crate) code: String,
    #[validate(length(min = 1, message = "language must not be empty"))]
    pub(crate) language: String,
}

/// Optional editor contents saved before a run or submit.
#[derive(Debug, Default, Deserialize, Validate)]
pub(crate) struct CodeRequest {
    #[serde(default)]
    #[validate(length(max = 200000, message = "code is too long"))]
    pub(crate) code: Option<String>,
    #[serde(default)]
    pub(crate) language: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EvaluateRequest {
    /// Integer or integer string; range checked by the evaluation service.
    pub(crate) score: Value,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmissionResponse {
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
    pub(crate) evaluated_at: Option<String>,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
    pub(crate) submitted_at: Option<String>,
}

impl SubmissionResponse {
    pub(crate) fn from_db(submission: Submission) -> Self {
        Self {
            id: submission.id,
            candidate_id: submission.candidate_id,
            problem_id: submission.problem_id,
            last_saved_code: submission.last_saved_code,
            code: submission.code,
            language: submission.language,
            submission_status: submission.submission_status,
            status: submission.status,
            passed_count: submission.passed_count,
            total_count: submission.total_count,
            score: submission.score,
            is_evaluated: submission.is_evaluated,
            evaluation_score: submission.evaluation_score,
            evaluated_by: submission.evaluated_by,
            evaluated_at: format_optional(submission.evaluated_at),
            created_at: format_primitive(submission.created_at),
            updated_at: format_primitive(submission.updated_at),
            submitted_at: format_optional(submission.submitted_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct RunResultItem {
    pub(crate) testcase_id: String,
    pub(crate) input: String,
    pub(crate) expected_output: String,
    pub(crate) stdout: String,
    pub(crate) stderr: String,
    pub(crate) compile_output: String,
    pub(crate) status: TestcaseStatus,
    pub(crate) passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) error: Option<String>,
    pub(crate) indeterminate: bool,
}

impl RunResultItem {
    pub(crate) fn new(testcase: Testcase, outcome: CaseOutcome) -> Self {
        Self {
            testcase_id: outcome.testcase_id,
            input: testcase.input,
            expected_output: testcase.expected_output,
            stdout: outcome.stdout,
            stderr: outcome.stderr,
            compile_output: outcome.compile_output,
            passed: outcome.status == TestcaseStatus::Passed,
            status: outcome.status,
            error: outcome.error,
            indeterminate: outcome.indeterminate,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct RunResponse {
    pub(crate) submission_id: String,
    pub(crate) passed: usize,
    pub(crate) total: usize,
    pub(crate) results: Vec<RunResultItem>,
}

#[derive(Debug, Serialize)]
pub(crate) struct GradedCase {
    pub(crate) testcase_id: String,
    pub(crate) status: TestcaseStatus,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmitResponse {
    pub(crate) submission: SubmissionResponse,
    pub(crate) results: Vec<GradedCase>,
}

impl SubmitResponse {
    pub(crate) fn new(submission: Submission, outcomes: Vec<CaseOutcome>) -> Self {
        Self {
            submission: SubmissionResponse::from_db(submission),
            results: outcomes
                .into_iter()
                .map(|outcome| GradedCase { testcase_id: outcome.testcase_id, status: outcome.status })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ResultItem {
    pub(crate) testcase_id: String,
    pub(crate) is_hidden: bool,
    pub(crate) input: Option<String>,
    pub(crate) expected_output: Option<String>,
    pub(crate) actual_output: Option<String>,
    pub(crate) status: TestcaseStatus,
}

impl ResultItem {
    fn from_detail(detail: ResultDetail, redact: bool) -> Self {
        let show = !(redact && detail.is_hidden);
        Self {
            testcase_id: detail.testcase_id,
            is_hidden: detail.is_hidden,
            input: show.then_some(detail.input),
            expected_output: show.then_some(detail.expected_output),
            actual_output: show.then_some(detail.actual_output),
            status: detail.status,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmissionDetailResponse {
    pub(crate) submission: SubmissionResponse,
    pub(crate) results: Vec<ResultItem>,
}

impl SubmissionDetailResponse {
    pub(crate) fn from_view(view: SubmissionView) -> Self {
        let redact = view.redact_hidden;
        Self {
            submission: SubmissionResponse::from_db(view.submission),
            results: view
                .results
                .into_iter()
                .map(|detail| ResultItem::from_detail(detail, redact))
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmissionListItem {
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
    pub(crate) updated_at: String,
    pub(crate) submitted_at: Option<String>,
}

impl SubmissionListItem {
    pub(crate) fn from_db(row: SubmissionListing) -> Self {
        Self {
            id: row.id,
            candidate_id: row.candidate_id,
            candidate_name: row.candidate_name,
            candidate_email: row.candidate_email,
            problem_id: row.problem_id,
            problem_title: row.problem_title,
            language: row.language,
            submission_status: row.submission_status,
            status: row.status,
            passed_count: row.passed_count,
            total_count: row.total_count,
            score: row.score,
            is_evaluated: row.is_evaluated,
            evaluation_score: row.evaluation_score,
            updated_at: format_primitive(row.updated_at),
            submitted_at: format_optional(row.submitted_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detail(is_hidden: bool) -> ResultDetail {
        ResultDetail {
            testcase_id: "tc-1".to_string(),
            input: "1 2".to_string(),
            expected_output: "3".to_string(),
            is_hidden,
            actual_output: "3\n".to_string(),
            status: TestcaseStatus::Passed,
        }
    }

    #[test]
    fn hidden_results_are_redacted_for_candidates() {
        let item = ResultItem::from_detail(detail(true), true);

        assert!(item.input.is_none());
        assert!(item.expected_output.is_none());
        assert!(item.actual_output.is_none());
        assert_eq!(item.status, TestcaseStatus::Passed);
    }

    #[test]
    fn visible_results_and_staff_views_keep_data() {
        let visible = ResultItem::from_detail(detail(false), true);
        assert_eq!(visible.input.as_deref(), Some("1 2"));

        let staff = ResultItem::from_detail(detail(true), false);
        assert_eq!(staff.expected_output.as_deref(), Some("3"));
    }

    #[test]
    fn code_request_is_optional_fields_only() {
        let payload: CodeRequest = serde_json::from_str("{}").expect("payload");
        assert!(payload.code.is_none());
        assert!(payload.language.is_none());
    }
}
