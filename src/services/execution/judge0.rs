use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};

use super::{ExecutionError, ExecutionService, Language, RunReport};
use crate::core::config::Settings;

const MAX_ERROR_BODY: usize = 512;

/// HTTP adapter for the Judge0 submissions API (plain-text, non base64 mode).
#[derive(Debug, Clone)]
pub(crate) struct Judge0Service {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
    auth_host: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreateRunRequest<'a> {
    language_id: u32,
    source_code: &'a str,
    stdin: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreateRunResponse {
    #[serde(default)]
    token: Option<String>,
}

impl Judge0Service {
    pub(crate) fn new(
        base_url: &str,
        auth_token: Option<String>,
        auth_host: Option<String>,
        request_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(request_timeout)
            .build()
            .context("Failed to build Judge0 HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token: auth_token.filter(|value| !value.is_empty()),
            auth_host: auth_host.filter(|value| !value.is_empty()),
        })
    }

    pub(crate) fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let execution = settings.execution();
        Self::new(
            &execution.judge0_url,
            Some(execution.judge0_key.clone()),
            Some(execution.judge0_host.clone()),
            Duration::from_secs(execution.request_timeout_seconds),
        )
    }

    fn with_auth(&self, request: RequestBuilder) -> RequestBuilder {
        let request = match &self.auth_token {
            Some(token) => request.header("X-Auth-Token", token),
            None => request,
        };
        match &self.auth_host {
            Some(host) => request.header("X-Auth-Host", host),
            None => request,
        }
    }

    async fn send(&self, path: &str, request: RequestBuilder) -> Result<String, ExecutionError> {
        let response = self
            .with_auth(request)
            .send()
            .await
            .map_err(|err| transport(path, None, err.to_string()))?;

        read_success_body(path, response).await
    }
}

#[async_trait]
impl ExecutionService for Judge0Service {
    async fn create_run(
        &self,
        language: Language,
        source: &str,
        stdin: &str,
    ) -> Result<String, ExecutionError> {
        let path = "/submissions";
        let url = format!("{}{path}?base64_encoded=false", self.base_url);
        let payload =
            CreateRunRequest { language_id: language.judge0_id(), source_code: source, stdin };

        let body = self.send(path, self.client.post(url).json(&payload)).await?;
        let parsed: CreateRunResponse = serde_json::from_str(&body)
            .map_err(|err| transport(path, None, format!("invalid JSON response: {err}")))?;

        parsed
            .token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| ExecutionError::SubmissionRejected(truncate(&body)))
    }

    async fn get_run(&self, token: &str) -> Result<RunReport, ExecutionError> {
        let path = format!("/submissions/{token}");
        let url = format!("{}{path}?base64_encoded=false", self.base_url);

        let body = self.send(&path, self.client.get(url)).await?;
        serde_json::from_str(&body)
            .map_err(|err| transport(&path, None, format!("invalid JSON response: {err}")))
    }
}

async fn read_success_body(path: &str, response: Response) -> Result<String, ExecutionError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|err| transport(path, Some(status.as_u16()), err.to_string()))?;

    if !status.is_success() {
        return Err(transport(path, Some(status.as_u16()), truncate(&body)));
    }

    Ok(body)
}

fn transport(path: &str, status: Option<u16>, message: String) -> ExecutionError {
    ExecutionError::Transport { path: path.to_string(), status, message }
}

fn truncate(body: &str) -> String {
    match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((index, _)) => format!("{}...", &body[..index]),
        None => body.to_string(),
    }
}
