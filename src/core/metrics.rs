use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled || PROM_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}

/// `outcome` is one of `accepted`, `finished`, `timeout`, `rejected`, `transport`.
pub(crate) fn record_execution_run(outcome: &'static str) {
    metrics::counter!("execution_runs_total", "outcome" => outcome).increment(1);
}

pub(crate) fn record_grading_testcase(mode: &'static str, status: &'static str) {
    metrics::counter!("grading_testcases_total", "mode" => mode, "status" => status).increment(1);
}

pub(crate) fn record_submission_finalized(status: &'static str) {
    metrics::counter!("submissions_finalized_total", "status" => status).increment(1);
}
