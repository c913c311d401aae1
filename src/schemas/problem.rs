use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{Problem, Testcase};
use crate::db::types::{GradeStatus, TestcaseCategory, TestcaseOrigin};
use crate::repositories::assignments::AssignedUser;
use crate::repositories::problems::{AssignedProblem, ProblemSummary};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ProblemCreate {
    #[validate(length(min = 1, max = 200, message = "title must be 1-200 characters"))]
    pub(crate) title: String,
    #[validate(length(min = 1, message = "statement must not be empty"))]
    pub(crate) statement: String,
    #[serde(default)]
    pub(crate) constraints: Value,
    #[serde(alias = "referenceSolution")]
    #[validate(length(min = 1, message = "reference_solution must not be empty"))]
    pub(crate) reference_solution: String,
    #[serde(alias = "referenceLanguage")]
    pub(crate) reference_language: String,
    #[serde(alias = "timeLimitMinutes")]
    #[validate(range(min = 1, message = "time_limit_minutes must be positive"))]
    pub(crate) time_limit_minutes: i32,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub(crate) struct ProblemUpdate {
    #[serde(default)]
    #[validate(length(min = 1, max = 200, message = "title must be 1-200 characters"))]
    pub(crate) title: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1, message = "statement must not be empty"))]
    pub(crate) statement: Option<String>,
    #[serde(default)]
    pub(crate) constraints: Option<Value>,
    #[serde(default, alias = "referenceSolution")]
    #[validate(length(min = 1, message = "reference_solution must not be empty"))]
    pub(crate) reference_solution: Option<String>,
    #[serde(default, alias = "referenceLanguage")]
    pub(crate) reference_language: Option<String>,
    #[serde(default, alias = "timeLimitMinutes")]
    #[validate(range(min = 1, message = "time_limit_minutes must be positive"))]
    pub(crate) time_limit_minutes: Option<i32>,
}

/// Strings holding JSON are stored parsed, other strings as `{"text": ...}`.
/// A missing value becomes an empty object.
pub(crate) fn normalize_constraints(value: Value) -> Value {
    match value {
        Value::Null => json!({}),
        Value::String(text) => {
            serde_json::from_str(&text).unwrap_or_else(|_| json!({ "text": text }))
        }
        other => other,
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ProblemResponse {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) statement: String,
    pub(crate) constraints: Value,
    /// Only sent to staff.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) reference_solution: Option<String>,
    pub(crate) reference_language: String,
    pub(crate) time_limit_minutes: i32,
    pub(crate) created_by: Option<String>,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl ProblemResponse {
    pub(crate) fn from_db(problem: Problem, include_solution: bool) -> Self {
        Self {
            id: problem.id,
            title: problem.title,
            statement: problem.statement,
            constraints: problem.constraints.0,
            reference_solution: include_solution.then_some(problem.reference_solution),
            reference_language: problem.reference_language,
            time_limit_minutes: problem.time_limit_minutes,
            created_by: problem.created_by,
            created_at: format_primitive(problem.created_at),
            updated_at: format_primitive(problem.updated_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ProblemDetailResponse {
    pub(crate) problem: ProblemResponse,
    pub(crate) visible_testcases: Vec<VisibleTestcase>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ProblemSummaryResponse {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) reference_language: String,
    pub(crate) time_limit_minutes: i32,
    pub(crate) created_by: Option<String>,
    pub(crate) created_at: String,
    pub(crate) testcase_count: i64,
    pub(crate) ai_generated_testcases_count: i64,
    pub(crate) assigned_count: i64,
}

impl ProblemSummaryResponse {
    pub(crate) fn from_db(summary: ProblemSummary) -> Self {
        Self {
            id: summary.id,
            title: summary.title,
            reference_language: summary.reference_language,
            time_limit_minutes: summary.time_limit_minutes,
            created_by: summary.created_by,
            created_at: format_primitive(summary.created_at),
            testcase_count: summary.testcase_count,
            ai_generated_testcases_count: summary.ai_testcase_count,
            assigned_count: summary.assigned_count,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AssignedProblemResponse {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) statement: String,
    pub(crate) time_limit_minutes: i32,
    pub(crate) assigned_at: String,
    pub(crate) draft_submission_id: Option<String>,
    pub(crate) submitted: bool,
    pub(crate) latest_submission_id: Option<String>,
    pub(crate) latest_submission_score: Option<i32>,
    pub(crate) latest_submission_status: Option<GradeStatus>,
}

impl AssignedProblemResponse {
    pub(crate) fn from_db(row: AssignedProblem) -> Self {
        Self {
            id: row.id,
            title: row.title,
            statement: row.statement,
            time_limit_minutes: row.time_limit_minutes,
            assigned_at: format_primitive(row.assigned_at),
            draft_submission_id: row.draft_submission_id,
            submitted: row.submitted_submission_id.is_some(),
            latest_submission_id: row.submitted_submission_id,
            latest_submission_score: row.submitted_score,
            latest_submission_status: row.submitted_status,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct TestcaseCreate {
    #[validate(length(min = 1, message = "input must not be empty"))]
    pub(crate) input: String,
    #[serde(alias = "output", alias = "expectedOutput")]
    pub(crate) expected_output: String,
    #[serde(default, alias = "isHidden")]
    pub(crate) is_hidden: bool,
    #[serde(default = "default_category")]
    pub(crate) category: TestcaseCategory,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct TestcaseUpdate {
    #[serde(default)]
    #[validate(length(min = 1, message = "input must not be empty"))]
    pub(crate) input: Option<String>,
    #[serde(default, alias = "output", alias = "expectedOutput")]
    pub(crate) expected_output: Option<String>,
    #[serde(default, alias = "isHidden")]
    pub(crate) is_hidden: Option<bool>,
    #[serde(default)]
    pub(crate) category: Option<TestcaseCategory>,
}

fn default_category() -> TestcaseCategory {
    TestcaseCategory::Normal
}

#[derive(Debug, Serialize)]
pub(crate) struct TestcaseResponse {
    pub(crate) id: String,
    pub(crate) problem_id: String,
    pub(crate) input: String,
    pub(crate) expected_output: String,
    pub(crate) is_hidden: bool,
    pub(crate) category: TestcaseCategory,
    pub(crate) origin: TestcaseOrigin,
    pub(crate) created_at: String,
}

impl TestcaseResponse {
    pub(crate) fn from_db(testcase: Testcase) -> Self {
        Self {
            id: testcase.id,
            problem_id: testcase.problem_id,
            input: testcase.input,
            expected_output: testcase.expected_output,
            is_hidden: testcase.is_hidden,
            category: testcase.category,
            origin: testcase.origin,
            created_at: format_primitive(testcase.created_at),
        }
    }
}

/// What a candidate may see of a visible testcase.
#[derive(Debug, Serialize)]
pub(crate) struct VisibleTestcase {
    pub(crate) id: String,
    pub(crate) input: String,
    pub(crate) expected_output: String,
}

impl VisibleTestcase {
    pub(crate) fn from_db(testcase: Testcase) -> Self {
        Self { id: testcase.id, input: testcase.input, expected_output: testcase.expected_output }
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub(crate) struct GenerateTestcasesRequest {
    #[serde(default, alias = "normalCount")]
    #[validate(range(max = 20, message = "normal_count must be at most 20"))]
    pub(crate) normal_count: Option<usize>,
    #[serde(default, alias = "edgeCount")]
    #[validate(range(max = 20, message = "edge_count must be at most 20"))]
    pub(crate) edge_count: Option<usize>,
    #[serde(default, alias = "randomCount")]
    #[validate(range(max = 20, message = "random_count must be at most 20"))]
    pub(crate) random_count: Option<usize>,
}

#[derive(Debug, Serialize)]
pub(crate) struct GenerationCounts {
    pub(crate) visible: usize,
    pub(crate) hidden: usize,
}

#[derive(Debug, Serialize)]
pub(crate) struct GenerateTestcasesResponse {
    pub(crate) ok: bool,
    pub(crate) counts: GenerationCounts,
    pub(crate) testcases: Vec<TestcaseResponse>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct AssignRequest {
    #[serde(alias = "userIds")]
    #[validate(length(min = 1, message = "user_ids must not be empty"))]
    pub(crate) user_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct AssignResponse {
    pub(crate) assigned: u64,
    pub(crate) requested: usize,
}

#[derive(Debug, Serialize)]
pub(crate) struct AssignedUserResponse {
    pub(crate) id: String,
    pub(crate) email: String,
    pub(crate) full_name: String,
    pub(crate) assigned_at: String,
}

impl AssignedUserResponse {
    pub(crate) fn from_db(row: AssignedUser) -> Self {
        Self {
            id: row.id,
            email: row.email,
            full_name: row.full_name,
            assigned_at: format_primitive(row.assigned_at),
        }
    }
}
