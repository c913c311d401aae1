//! Candidate attempt lifecycle: draft-save, run against visible testcases,
//! and the one-way `draft -> submitted` transition.
//!
//! Mutating calls hide foreign submissions behind `NotFound`; the general
//! lookup reveals existence but answers `Forbidden`.

use thiserror::Error;

use crate::core::metrics;
use crate::core::redis::RateLimitScope;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::{Submission, Testcase, User};
use crate::db::types::{TestcaseStatus, UserRole};
use crate::repositories;
use crate::repositories::submissions::{DraftUpsert, FinalizeSubmission, Finalized, ResultDetail};
use crate::services::execution::{ExecutionError, Language};
use crate::services::grading::{self, CaseOutcome, GradingError};

#[derive(Debug, Error)]
pub(crate) enum LifecycleError {
    #[error("problem not found")]
    ProblemNotFound,
    #[error("submission not found")]
    NotFound,
    #[error("not allowed to view this submission")]
    Forbidden,
    #[error("problem is not assigned to this candidate")]
    NotAssigned,
    #[error("submission already submitted")]
    AlreadySubmitted,
    #[error("testcases changed while the submission was graded")]
    TestcasesChanged,
    #[error("problem has no testcases")]
    NoTestcases,
    #[error("problem has no visible testcases to run")]
    NoVisibleTestcases,
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),
    #[error("too many run requests for this submission; try again shortly")]
    RateLimited,
    #[error("execution failed for testcase {testcase_id}: {source}")]
    Upstream {
        testcase_id: String,
        #[source]
        source: ExecutionError,
    },
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Optional editor contents sent along with run/submit.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct CodeUpdate<'a> {
    pub(crate) code: Option<&'a str>,
    pub(crate) language: Option<&'a str>,
}

impl CodeUpdate<'_> {
    fn is_empty(&self) -> bool {
        self.code.is_none() && self.language.is_none()
    }
}

#[derive(Debug)]
pub(crate) struct RunOutcome {
    pub(crate) submission: Submission,
    pub(crate) cases: Vec<(Testcase, CaseOutcome)>,
}

#[derive(Debug)]
pub(crate) struct SubmitOutcome {
    pub(crate) submission: Submission,
    pub(crate) outcomes: Vec<CaseOutcome>,
}

#[derive(Debug)]
pub(crate) struct SubmissionView {
    pub(crate) submission: Submission,
    pub(crate) results: Vec<ResultDetail>,
    /// Hidden testcases' input and expected output must not be shown.
    pub(crate) redact_hidden: bool,
}

fn parse_language(key: &str) -> Result<Language, LifecycleError> {
    Language::from_key(key).map_err(|_| LifecycleError::UnsupportedLanguage(key.to_string()))
}

/// Owner-only access for mutations; anything else looks like a missing row.
fn owned_by(submission: Option<Submission>, candidate_id: &str) -> Result<Submission, LifecycleError> {
    match submission {
        Some(submission) if submission.candidate_id == candidate_id => Ok(submission),
        _ => Err(LifecycleError::NotFound),
    }
}

fn ensure_draft(submission: &Submission) -> Result<(), LifecycleError> {
    if submission.is_draft() {
        Ok(())
    } else {
        Err(LifecycleError::AlreadySubmitted)
    }
}

/// Candidates may read only their own submissions, and never hidden testcase data.
fn view_access(viewer: &User, submission: &Submission) -> Result<bool, LifecycleError> {
    match viewer.role {
        UserRole::Admin | UserRole::Recruiter => Ok(false),
        UserRole::Candidate if submission.candidate_id == viewer.id => Ok(true),
        UserRole::Candidate => Err(LifecycleError::Forbidden),
    }
}

/// Creates the candidate's draft for the problem or updates it in place.
pub(crate) async fn save_draft(
    state: &AppState,
    candidate: &User,
    problem_id: &str,
    code: &str,
    language: &str,
) -> Result<Submission, LifecycleError> {
    let language = parse_language(language)?;
    let db = state.db();

    if !repositories::problems::exists(db, problem_id).await? {
        return Err(LifecycleError::ProblemNotFound);
    }
    if !repositories::assignments::exists(db, problem_id, &candidate.id).await? {
        return Err(LifecycleError::NotAssigned);
    }
    if repositories::submissions::has_submitted(db, &candidate.id, problem_id).await? {
        return Err(LifecycleError::AlreadySubmitted);
    }

    let submission = repositories::submissions::upsert_draft(
        db,
        DraftUpsert {
            candidate_id: &candidate.id,
            problem_id,
            code,
            language: language.as_str(),
            now: primitive_now_utc(),
        },
    )
    .await?;

    tracing::debug!(
        submission_id = %submission.id,
        problem_id,
        candidate_id = %candidate.id,
        %language,
        "Draft saved"
    );
    Ok(submission)
}

/// The candidate's own submission, still in `draft`.
async fn load_draft(
    state: &AppState,
    candidate: &User,
    submission_id: &str,
) -> Result<Submission, LifecycleError> {
    let found = repositories::submissions::find_by_id(state.db(), submission_id).await?;
    let submission = owned_by(found, &candidate.id)?;
    ensure_draft(&submission)?;
    Ok(submission)
}

/// Persists editor contents sent with run/submit; the language is validated first.
async fn apply_update(
    state: &AppState,
    submission: Submission,
    update: CodeUpdate<'_>,
) -> Result<(Submission, Language), LifecycleError> {
    let language = parse_language(update.language.unwrap_or(&submission.language))?;
    if update.is_empty() {
        return Ok((submission, language));
    }

    let saved = repositories::submissions::save_code(
        state.db(),
        &submission.id,
        update.code.unwrap_or(&submission.last_saved_code),
        language.as_str(),
        primitive_now_utc(),
    )
    .await?
    .ok_or(LifecycleError::AlreadySubmitted)?;

    Ok((saved, language))
}

/// Run mode: visible testcases only, nothing graded is persisted. A rate-limited
/// call leaves the draft as it was.
pub(crate) async fn run(
    state: &AppState,
    candidate: &User,
    submission_id: &str,
    update: CodeUpdate<'_>,
) -> Result<RunOutcome, LifecycleError> {
    let submission = load_draft(state, candidate, submission_id).await?;
    if let Some(language) = update.language {
        parse_language(language)?;
    }

    let testcases =
        repositories::testcases::list_visible_for_problem(state.db(), &submission.problem_id)
            .await?;
    if testcases.is_empty() {
        return Err(LifecycleError::NoVisibleTestcases);
    }

    let limits = state.settings().submission();
    let allowed = state
        .redis()
        .allow(
            RateLimitScope::Run(&submission.id),
            limits.run_rate_limit,
            limits.run_rate_window_seconds,
        )
        .await;
    if !allowed {
        return Err(LifecycleError::RateLimited);
    }

    let (submission, language) = apply_update(state, submission, update).await?;

    let outcomes = grading::run_visible(
        state.execution(),
        language,
        &submission.last_saved_code,
        &testcases,
    )
    .await;

    let passed = outcomes.iter().filter(|outcome| outcome.status == TestcaseStatus::Passed).count();
    tracing::info!(
        submission_id = %submission.id,
        problem_id = %submission.problem_id,
        %language,
        passed,
        total = outcomes.len(),
        "Run finished"
    );

    Ok(RunOutcome { cases: testcases.into_iter().zip(outcomes).collect(), submission })
}

/// Submit mode: grades every testcase, then seals the submission and writes
/// all results atomically. Any execution failure leaves the draft untouched.
pub(crate) async fn submit(
    state: &AppState,
    candidate: &User,
    submission_id: &str,
    update: CodeUpdate<'_>,
) -> Result<SubmitOutcome, LifecycleError> {
    let submission = load_draft(state, candidate, submission_id).await?;
    let (submission, language) = apply_update(state, submission, update).await?;

    let testcases =
        repositories::testcases::list_for_problem(state.db(), &submission.problem_id).await?;
    if testcases.is_empty() {
        return Err(LifecycleError::NoTestcases);
    }

    let code = submission.last_saved_code.as_str();
    let graded = grading::grade_all(state.execution(), language, code, &testcases)
        .await
        .map_err(|err| match err {
            GradingError::NoTestcases => LifecycleError::NoTestcases,
            GradingError::Execution { testcase_id, source } => {
                tracing::warn!(
                    submission_id = %submission.id,
                    %testcase_id,
                    error = %source,
                    "Submit aborted by execution failure"
                );
                LifecycleError::Upstream { testcase_id, source }
            }
        })?;

    let finalized = repositories::submissions::finalize(
        state.db(),
        FinalizeSubmission {
            submission_id: &submission.id,
            code,
            aggregate: graded.aggregate,
            outcomes: &graded.outcomes,
            graded: &testcases,
            now: primitive_now_utc(),
        },
    )
    .await?;
    let sealed = match finalized {
        Finalized::Sealed(sealed) => sealed,
        Finalized::AlreadySubmitted => return Err(LifecycleError::AlreadySubmitted),
        Finalized::TestcasesChanged => {
            tracing::warn!(
                submission_id = %submission.id,
                problem_id = %submission.problem_id,
                "Testcases changed during grading; submission left in draft"
            );
            return Err(LifecycleError::TestcasesChanged);
        }
    };

    metrics::record_submission_finalized(graded.aggregate.status.as_str());
    tracing::info!(
        submission_id = %sealed.id,
        problem_id = %sealed.problem_id,
        candidate_id = %candidate.id,
        %language,
        passed = graded.aggregate.passed,
        total = graded.aggregate.total,
        score = graded.aggregate.score,
        status = graded.aggregate.status.as_str(),
        "Submission finalized"
    );

    Ok(SubmitOutcome { submission: sealed, outcomes: graded.outcomes })
}

pub(crate) async fn view(
    state: &AppState,
    viewer: &User,
    submission_id: &str,
) -> Result<SubmissionView, LifecycleError> {
    let submission = repositories::submissions::find_by_id(state.db(), submission_id)
        .await?
        .ok_or(LifecycleError::NotFound)?;
    let redact_hidden = view_access(viewer, &submission)?;
    let results = repositories::submissions::list_results(state.db(), submission_id).await?;

    Ok(SubmissionView { submission, results, redact_hidden })
}
