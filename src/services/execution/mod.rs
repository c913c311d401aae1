//! Remote code execution through a Judge0-compatible service.
//!
//! [`ExecutionService`] is the two-call wire contract (create a run, read a
//! run). [`ExecutionClient`] owns the polling loop on top of it and is what
//! grading and testcase generation call.

mod client;
mod judge0;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

pub(crate) use client::ExecutionClient;
pub(crate) use judge0::Judge0Service;

/// Judge0 status id for a program that ran to completion.
pub(crate) const STATUS_ACCEPTED: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Language {
    Python,
    JavaScript,
    Java,
    Cpp,
}

impl Language {
    pub(crate) fn from_key(key: &str) -> Result<Self, ExecutionError> {
        match key.trim().to_ascii_lowercase().as_str() {
            "python" => Ok(Self::Python),
            "javascript" => Ok(Self::JavaScript),
            "java" => Ok(Self::Java),
            "cpp" => Ok(Self::Cpp),
            _ => Err(ExecutionError::UnsupportedLanguage(key.to_string())),
        }
    }

    pub(crate) fn judge0_id(self) -> u32 {
        match self {
            Self::Python => 71,
            Self::JavaScript => 63,
            Self::Java => 62,
            Self::Cpp => 54,
        }
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::JavaScript => "javascript",
            Self::Java => "java",
            Self::Cpp => "cpp",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub(crate) enum ExecutionError {
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),
    #[error("execution service did not return a run token: {0}")]
    SubmissionRejected(String),
    #[error("run {token} did not finish within {waited:?}")]
    Timeout { token: String, waited: Duration },
    #[error("execution service request to {path} failed{}: {message}", status_suffix(.status))]
    Transport { path: String, status: Option<u16>, message: String },
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|code| format!(" with status {code}")).unwrap_or_default()
}

impl ExecutionError {
    /// A timed-out run may still finish remotely; its outcome is unknown.
    pub(crate) fn is_indeterminate(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    pub(crate) fn metric_label(&self) -> &'static str {
        match self {
            Self::UnsupportedLanguage(_) => "unsupported",
            Self::SubmissionRejected(_) => "rejected",
            Self::Timeout { .. } => "timeout",
            Self::Transport { .. } => "transport",
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub(crate) struct RunStatus {
    pub(crate) id: u32,
    #[serde(default)]
    pub(crate) description: String,
}

/// One execution as reported by the service.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RunReport {
    pub(crate) status: RunStatus,
    #[serde(default)]
    pub(crate) stdout: Option<String>,
    #[serde(default)]
    pub(crate) stderr: Option<String>,
    #[serde(default)]
    pub(crate) compile_output: Option<String>,
}

impl RunReport {
    pub(crate) fn is_terminal(&self) -> bool {
        self.status.id >= STATUS_ACCEPTED
    }

    pub(crate) fn is_accepted(&self) -> bool {
        self.status.id == STATUS_ACCEPTED
    }

    pub(crate) fn stdout(&self) -> &str {
        self.stdout.as_deref().unwrap_or_default()
    }

    pub(crate) fn stderr(&self) -> &str {
        self.stderr.as_deref().unwrap_or_default()
    }

    pub(crate) fn compile_output(&self) -> &str {
        self.compile_output.as_deref().unwrap_or_default()
    }

    /// Accepted, silent on stderr and the compiler, and printed something.
    pub(crate) fn is_clean_output(&self) -> bool {
        self.is_accepted()
            && self.stderr().is_empty()
            && self.compile_output().is_empty()
            && !self.stdout().trim().is_empty()
    }
}

#[async_trait]
pub(crate) trait ExecutionService: Send + Sync {
    /// Queues one program execution and returns its run token.
    async fn create_run(
        &self,
        language: Language,
        source: &str,
        stdin: &str,
    ) -> Result<String, ExecutionError>;

    async fn get_run(&self, token: &str) -> Result<RunReport, ExecutionError>;
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_keys_map_to_judge0_ids() {
        assert_eq!(Language::from_key("python").unwrap().judge0_id(), 71);
        assert_eq!(Language::from_key("JavaScript").unwrap().judge0_id(), 63);
        assert_eq!(Language::from_key("java").unwrap().judge0_id(), 62);
        assert_eq!(Language::from_key(" cpp ").unwrap().judge0_id(), 54);
    }

    #[test]
    fn unknown_language_is_rejected() {
        assert!(matches!(
            Language::from_key("cobol"),
            Err(ExecutionError::UnsupportedLanguage(key)) if key == "cobol"
        ));
    }

    #[test]
    fn report_parses_judge0_payload() {
        let report: RunReport = serde_json::from_value(serde_json::json!({
            "stdout": "3\n",
            "stderr": null,
            "compile_output": null,
            "time": "0.01",
            "status": {"id": 3, "description": "Accepted"}
        }))
        .expect("report");

        assert!(report.is_terminal());
        assert!(report.is_clean_output());
        assert_eq!(report.stdout(), "3\n");
    }

    #[test]
    fn queued_and_processing_are_not_terminal() {
        assert!(!fake::report(1, None, None).is_terminal());
        assert!(!fake::report(2, None, None).is_terminal());
        assert!(fake::report(6, None, None).is_terminal());
    }

    #[test]
    fn clean_output_requires_silence_on_stderr() {
        assert!(!fake::report(3, Some("1"), Some("warning")).is_clean_output());
        assert!(!fake::report(3, Some("  \n"), None).is_clean_output());
        assert!(!fake::report(3, Some("1"), Some(" \n")).is_clean_output());
        assert!(!fake::report(11, Some("1"), None).is_clean_output());
    }

    #[test]
    fn transport_error_mentions_status() {
        let err = ExecutionError::Transport {
            path: "/submissions".to_string(),
            status: Some(502),
            message: "bad gateway".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "execution service request to /submissions failed with status 502: bad gateway"
        );
        assert!(!err.is_indeterminate());
    }
}
