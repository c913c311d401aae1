use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use super::{ExecutionError, ExecutionService, Language, RunReport};
use crate::core::config::Settings;
use crate::core::metrics;

/// Drives one run to a terminal status. No retries: a failed create or poll
/// is returned to the caller as is.
#[derive(Clone)]
pub(crate) struct ExecutionClient {
    service: Arc<dyn ExecutionService>,
    poll_interval: Duration,
    poll_timeout: Duration,
}

impl ExecutionClient {
    pub(crate) fn new(
        service: Arc<dyn ExecutionService>,
        poll_interval: Duration,
        poll_timeout: Duration,
    ) -> Self {
        Self { service, poll_interval, poll_timeout }
    }

    pub(crate) fn from_settings(settings: &Settings, service: Arc<dyn ExecutionService>) -> Self {
        let execution = settings.execution();
        Self::new(
            service,
            Duration::from_millis(execution.poll_interval_ms),
            Duration::from_secs(execution.poll_timeout_seconds),
        )
    }

    /// Resolves `language_key` first so unsupported languages never reach the service.
    pub(crate) async fn execute(
        &self,
        language_key: &str,
        source: &str,
        stdin: &str,
    ) -> Result<RunReport, ExecutionError> {
        let language = Language::from_key(language_key)?;
        self.execute_language(language, source, stdin).await
    }

    pub(crate) async fn execute_language(
        &self,
        language: Language,
        source: &str,
        stdin: &str,
    ) -> Result<RunReport, ExecutionError> {
        let result = self.create_and_poll(language, source, stdin).await;

        match &result {
            Ok(report) if report.is_accepted() => metrics::record_execution_run("accepted"),
            Ok(_) => metrics::record_execution_run("finished"),
            Err(err) => metrics::record_execution_run(err.metric_label()),
        }

        result
    }

    async fn create_and_poll(
        &self,
        language: Language,
        source: &str,
        stdin: &str,
    ) -> Result<RunReport, ExecutionError> {
        let token = self.service.create_run(language, source, stdin).await?;
        tracing::debug!(%language, %token, "Execution run created");

        let started = Instant::now();
        let deadline = started + self.poll_timeout;

        loop {
            let report = self.service.get_run(&token).await?;
            if report.is_terminal() {
                tracing::debug!(
                    %language,
                    %token,
                    status_id = report.status.id,
                    status = %report.status.description,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Execution run finished"
                );
                return Ok(report);
            }

            if Instant::now() + self.poll_interval > deadline {
                tracing::warn!(%language, %token, "Execution run timed out");
                return Err(ExecutionError::Timeout { token, waited: started.elapsed() });
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::ExecutionClient;
    use crate::services::execution::fake::{report, FakeExecution, Scripted};
    use crate::services::execution::{ExecutionError, Language};

    fn client(fake: Arc<FakeExecution>) -> ExecutionClient {
        ExecutionClient::new(fake, Duration::from_millis(5), Duration::from_millis(60))
    }

    #[tokio::test]
    async fn returns_terminal_report() {
        let fake = Arc::new(FakeExecution::with_stdout(["42\n"]));
        let client = client(fake.clone());

        let report = client.execute("python", "print(42)", "").await.expect("report");

        assert!(report.is_accepted());
        assert_eq!(report.stdout(), "42\n");
        let runs = fake.recorded();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].language, Language::Python);
        assert_eq!(runs[0].source, "print(42)");
    }

    #[tokio::test]
    async fn unsupported_language_makes_no_call() {
        let fake = Arc::new(FakeExecution::default());
        let client = client(fake.clone());

        let err = client.execute("brainfuck", "+", "").await.expect_err("unsupported");

        assert!(matches!(err, ExecutionError::UnsupportedLanguage(_)));
        assert_eq!(fake.create_calls(), 0);
        assert_eq!(fake.poll_calls(), 0);
    }

    #[tokio::test]
    async fn pending_run_times_out() {
        let fake = Arc::new(FakeExecution::scripted([Scripted::Pending]));
        let client = client(fake.clone());

        let err = client.execute("cpp", "int main(){}", "").await.expect_err("timeout");

        assert!(err.is_indeterminate());
        assert!(matches!(err, ExecutionError::Timeout { ref token, .. } if token == "token-0"));
        assert!(fake.poll_calls() > 1);
    }

    #[tokio::test]
    async fn rejected_submission_is_not_polled() {
        let fake = Arc::new(FakeExecution::scripted([Scripted::Reject]));
        let client = client(fake.clone());

        let err = client.execute("java", "class Main {}", "").await.expect_err("rejected");

        assert!(matches!(err, ExecutionError::SubmissionRejected(_)));
        assert_eq!(fake.poll_calls(), 0);
    }

    #[tokio::test]
    async fn runtime_errors_are_terminal_reports() {
        let fake = Arc::new(FakeExecution::scripted([Scripted::Report(report(
            11,
            None,
            Some("Traceback"),
        ))]));
        let client = client(fake);

        let report = client.execute("python", "raise", "").await.expect("report");

        assert!(!report.is_accepted());
        assert_eq!(report.stderr(), "Traceback");
    }
}
