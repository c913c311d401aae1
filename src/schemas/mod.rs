use std::collections::HashMap;

use serde::Serialize;

pub(crate) mod auth;
pub(crate) mod problem;
pub(crate) mod submission;
pub(crate) mod user;

#[derive(Debug, Serialize)]
pub(crate) struct HealthResponse {
    pub(crate) service: String,
    pub(crate) status: String,
    pub(crate) components: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RootResponse {
    pub(crate) message: String,
    pub(crate) version: String,
    pub(crate) docs_url: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct PlatformStatsResponse {
    pub(crate) problems: i64,
    pub(crate) candidates: i64,
    pub(crate) assignments: i64,
    pub(crate) submissions: i64,
    pub(crate) passed_submissions: i64,
    /// Percent of finalised submissions that passed every testcase.
    pub(crate) pass_rate: i64,
}
