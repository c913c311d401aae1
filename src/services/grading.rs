//! Per-testcase comparison and score aggregation.
//!
//! Testcases are executed one at a time in the order they are given (callers
//! pass them in creation order), so outcomes line up with testcase identity.

use serde::Serialize;
use thiserror::Error;

use crate::core::metrics;
use crate::db::models::Testcase;
use crate::db::types::{GradeStatus, TestcaseStatus};
use crate::services::execution::{ExecutionClient, ExecutionError, Language, RunReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GradingMode {
    Run,
    Submit,
}

impl GradingMode {
    fn as_str(self) -> &'static str {
        match self {
            Self::Run => "run",
            Self::Submit => "submit",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct CaseOutcome {
    pub(crate) testcase_id: String,
    pub(crate) status: TestcaseStatus,
    pub(crate) stdout: String,
    pub(crate) stderr: String,
    pub(crate) compile_output: String,
    /// Set when the execution service failed for this case (run mode only).
    pub(crate) error: Option<String>,
    /// The remote run timed out and may still complete; the outcome is unknown.
    pub(crate) indeterminate: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Aggregate {
    pub(crate) passed: i32,
    pub(crate) total: i32,
    pub(crate) status: GradeStatus,
    pub(crate) score: i32,
}

#[derive(Debug)]
pub(crate) struct Graded {
    pub(crate) outcomes: Vec<CaseOutcome>,
    pub(crate) aggregate: Aggregate,
}

#[derive(Debug, Error)]
pub(crate) enum GradingError {
    #[error("problem has no testcases")]
    NoTestcases,
    #[error("execution failed for testcase {testcase_id}: {source}")]
    Execution {
        testcase_id: String,
        #[source]
        source: ExecutionError,
    },
}

/// Trimmed, case-sensitive equality. Nothing else is normalised.
pub(crate) fn outcome_for(expected: &str, actual: &str) -> TestcaseStatus {
    if expected.trim() == actual.trim() {
        TestcaseStatus::Passed
    } else {
        TestcaseStatus::Failed
    }
}

/// `None` for an empty set; the caller decides what zero testcases means.
pub(crate) fn aggregate(statuses: &[TestcaseStatus]) -> Option<Aggregate> {
    if statuses.is_empty() {
        return None;
    }

    let total = statuses.len() as i64;
    let passed = statuses.iter().filter(|status| **status == TestcaseStatus::Passed).count() as i64;

    let status = if passed == total {
        GradeStatus::Passed
    } else if passed > 0 {
        GradeStatus::PartiallyPassed
    } else {
        GradeStatus::Failed
    };

    // round(100 * passed / total), halves away from zero
    let score = (200 * passed + total) / (2 * total);

    Some(Aggregate { passed: passed as i32, total: total as i32, status, score: score as i32 })
}

fn outcome_from_report(testcase: &Testcase, report: RunReport) -> CaseOutcome {
    let status = outcome_for(&testcase.expected_output, report.stdout());
    CaseOutcome {
        testcase_id: testcase.id.clone(),
        status,
        stdout: report.stdout.unwrap_or_default(),
        stderr: report.stderr.unwrap_or_default(),
        compile_output: report.compile_output.unwrap_or_default(),
        error: None,
        indeterminate: false,
    }
}

/// Run mode: every case is attempted; upstream failures become `Failed` outcomes.
pub(crate) async fn run_visible(
    client: &ExecutionClient,
    language: Language,
    code: &str,
    testcases: &[Testcase],
) -> Vec<CaseOutcome> {
    let mut outcomes = Vec::with_capacity(testcases.len());

    for testcase in testcases {
        let outcome = match client.execute_language(language, code, &testcase.input).await {
            Ok(report) => outcome_from_report(testcase, report),
            Err(err) => {
                tracing::warn!(
                    testcase_id = %testcase.id,
                    %language,
                    error = %err,
                    "Run-mode execution failed"
                );
                CaseOutcome {
                    testcase_id: testcase.id.clone(),
                    status: TestcaseStatus::Failed,
                    stdout: String::new(),
                    stderr: String::new(),
                    compile_output: String::new(),
                    indeterminate: err.is_indeterminate(),
                    error: Some(err.to_string()),
                }
            }
        };

        metrics::record_grading_testcase(GradingMode::Run.as_str(), outcome.status.as_str());
        outcomes.push(outcome);
    }

    outcomes
}

/// Submit mode: any execution failure aborts the whole pass.
pub(crate) async fn grade_all(
    client: &ExecutionClient,
    language: Language,
    code: &str,
    testcases: &[Testcase],
) -> Result<Graded, GradingError> {
    if testcases.is_empty() {
        return Err(GradingError::NoTestcases);
    }

    let mut outcomes = Vec::with_capacity(testcases.len());

    for testcase in testcases {
        let report = client
            .execute_language(language, code, &testcase.input)
            .await
            .map_err(|source| GradingError::Execution { testcase_id: testcase.id.clone(), source })?;

        let outcome = outcome_from_report(testcase, report);
        tracing::debug!(
            testcase_id = %testcase.id,
            status = outcome.status.as_str(),
            "Testcase graded"
        );
        metrics::record_grading_testcase(GradingMode::Submit.as_str(), outcome.status.as_str());
        outcomes.push(outcome);
    }

    let statuses: Vec<TestcaseStatus> = outcomes.iter().map(|outcome| outcome.status).collect();
    let aggregate = aggregate(&statuses).ok_or(GradingError::NoTestcases)?;

    Ok(Graded { outcomes, aggregate })
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::core::time::primitive_now_utc;
    use crate::db::models::Testcase;
    use crate::db::types::{TestcaseCategory, TestcaseOrigin};

    pub(crate) fn testcase(seq: i64, input: &str, expected: &str, is_hidden: bool) -> Testcase {
        Testcase {
            id: format!("tc-{seq}"),
            seq,
            problem_id: "problem-1".to_string(),
            input: input.to_string(),
            expected_output: expected.to_string(),
            is_hidden,
            category: TestcaseCategory::Normal,
            origin: TestcaseOrigin::Manual,
            created_at: primitive_now_utc(),
        }
    }
}
