mod commands;
mod queries;
mod types;

#[cfg(test)]
mod tests;

pub(crate) use commands::{finalize, save_code, set_evaluation, upsert_draft};
pub(crate) use queries::{
    find_by_id, has_submitted, list_for_candidate, list_for_problem, list_results,
};
pub(crate) use types::{
    DraftUpsert, EvaluationUpdate, FinalizeSubmission, Finalized, ResultDetail, SubmissionListing,
};
