//! AI-assisted testcase authoring.
//!
//! A generator proposes raw inputs in three buckets; every input is run
//! through the problem's reference solution and only clean runs are kept,
//! with their trimmed stdout as the expected output.

use std::time::{Duration, Instant};

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::core::config::Settings;
use crate::db::types::TestcaseCategory;
use crate::services::execution::{ExecutionClient, Language};

const SYSTEM_PROMPT: &str = "You are an expert at generating test case inputs for coding \
problems. You answer with a single JSON object and nothing else.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BucketCounts {
    pub(crate) normal: usize,
    pub(crate) edge: usize,
    pub(crate) random: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct GeneratedInputs {
    pub(crate) normal: Vec<String>,
    pub(crate) edge: Vec<String>,
    pub(crate) random: Vec<String>,
}

pub(crate) struct GenerationRequest<'a> {
    pub(crate) statement: &'a str,
    pub(crate) constraints: &'a Value,
    pub(crate) counts: BucketCounts,
}

/// A generated input whose expected output came from the reference solution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DerivedCase {
    pub(crate) input: String,
    pub(crate) expected_output: String,
    pub(crate) category: TestcaseCategory,
    pub(crate) is_hidden: bool,
}

#[derive(Debug, Error)]
pub(crate) enum GenerationError {
    #[error("testcase generator is not configured")]
    NotConfigured,
    #[error("testcase generator request failed: {0}")]
    Upstream(String),
    #[error("testcase generator returned an invalid response: {0}")]
    InvalidResponse(String),
    #[error("unsupported reference language: {0}")]
    UnsupportedLanguage(String),
    #[error(
        "no visible testcases generated; check that the reference solution prints output \
         for the generated inputs"
    )]
    NoVisibleTestcases,
}

#[async_trait]
pub(crate) trait TestcaseGenerator: Send + Sync {
    async fn generate(
        &self,
        request: &GenerationRequest<'_>,
    ) -> Result<GeneratedInputs, GenerationError>;
}

/// Chat-completions client for any OpenAI-compatible endpoint.
#[derive(Debug, Clone)]
pub(crate) struct OpenAiTestcaseGenerator {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
}

impl OpenAiTestcaseGenerator {
    /// `Ok(None)` when no endpoint or key is configured.
    pub(crate) fn from_settings(settings: &Settings) -> anyhow::Result<Option<Self>> {
        let ai = settings.ai();
        if !ai.is_configured() {
            return Ok(None);
        }

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .timeout(Duration::from_secs(ai.ai_request_timeout))
            .build()
            .context("Failed to build testcase generator HTTP client")?;

        Ok(Some(Self {
            client,
            api_key: ai.openai_api_key.clone(),
            base_url: ai.openai_base_url.trim_end_matches('/').to_string(),
            model: ai.ai_model.clone(),
            max_tokens: ai.ai_max_tokens,
        }))
    }
}

#[async_trait]
impl TestcaseGenerator for OpenAiTestcaseGenerator {
    async fn generate(
        &self,
        request: &GenerationRequest<'_>,
    ) -> Result<GeneratedInputs, GenerationError> {
        let payload = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": build_prompt(request)}
            ],
            "max_completion_tokens": self.max_tokens,
            "response_format": {"type": "json_object"}
        });

        let timer = Instant::now();
        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|err| GenerationError::Upstream(err.to_string()))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|err| GenerationError::InvalidResponse(err.to_string()))?;
        if !status.is_success() {
            return Err(GenerationError::Upstream(format!("status {status}: {body}")));
        }

        let content = body
            .get("choices")
            .and_then(|choices| choices.get(0))
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(Value::as_str)
            .ok_or_else(|| GenerationError::InvalidResponse("missing message content".into()))?;

        let inputs = parse_buckets(content)?.truncated(request.counts);
        tracing::info!(
            model = %self.model,
            duration_seconds = timer.elapsed().as_secs_f64(),
            tokens_used = body.pointer("/usage/total_tokens").and_then(serde_json::Value::as_u64),
            normal = inputs.normal.len(),
            edge = inputs.edge.len(),
            random = inputs.random.len(),
            "Testcase inputs generated"
        );
        Ok(inputs)
    }
}

fn build_prompt(request: &GenerationRequest<'_>) -> String {
    let constraints = match request.constraints {
        Value::String(text) => text.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_default(),
    };

    format!(
        "Problem statement:\n{statement}\n\nConstraints:\n{constraints}\n\n\
         Generate test case inputs:\n\
         - normal: {normal} typical inputs that exercise the main functionality\n\
         - edge: {edge} boundary inputs (minimum/maximum values, empty inputs, ...)\n\
         - random: {random} random but valid inputs\n\n\
         Return ONLY a JSON object of the form \
         {{\"normal\": [\"...\"], \"edge\": [\"...\"], \"random\": [\"...\"]}}. \
         Each input is a single string written exactly as the program reads it from stdin.",
        statement = request.statement,
        normal = request.counts.normal,
        edge = request.counts.edge,
        random = request.counts.random,
    )
}

impl GeneratedInputs {
    pub(crate) fn truncated(mut self, counts: BucketCounts) -> Self {
        self.normal.truncate(counts.normal);
        self.edge.truncate(counts.edge);
        self.random.truncate(counts.random);
        self
    }
}

#[derive(Deserialize)]
struct RawBuckets {
    normal: Vec<Value>,
    edge: Vec<Value>,
    random: Vec<Value>,
}

/// Accepts the bare JSON object or one wrapped in a ```json fence. Non-string
/// entries (numbers, arrays) are kept as their JSON text.
pub(crate) fn parse_buckets(content: &str) -> Result<GeneratedInputs, GenerationError> {
    let trimmed = content.trim();
    let json_text = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed);

    let raw: RawBuckets = serde_json::from_str(json_text.trim())
        .map_err(|err| GenerationError::InvalidResponse(err.to_string()))?;

    let to_strings = |values: Vec<Value>| -> Vec<String> {
        values
            .into_iter()
            .map(|value| match value {
                Value::String(text) => text,
                other => other.to_string(),
            })
            .collect()
    };

    Ok(GeneratedInputs {
        normal: to_strings(raw.normal),
        edge: to_strings(raw.edge),
        random: to_strings(raw.random),
    })
}

/// Trims and drops one surrounding quote character on either side.
pub(crate) fn sanitize_input(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_leading = trimmed.strip_prefix(['"', '\'']).unwrap_or(trimmed);
    without_leading.strip_suffix(['"', '\'']).unwrap_or(without_leading).to_string()
}

/// Sanitised, non-empty inputs tagged with their bucket, normal first.
pub(crate) fn candidate_inputs(inputs: &GeneratedInputs) -> Vec<(String, TestcaseCategory)> {
    let buckets = [
        (&inputs.normal, TestcaseCategory::Normal),
        (&inputs.edge, TestcaseCategory::Edge),
        (&inputs.random, TestcaseCategory::Random),
    ];

    buckets
        .into_iter()
        .flat_map(|(values, category)| {
            values.iter().map(move |value| (sanitize_input(value), category))
        })
        .filter(|(input, _)| !input.is_empty())
        .collect()
}

/// Runs each input through the reference solution, one at a time with
/// `delay` after every run, keeping only clean runs. Failed executions are
/// skipped, never fatal.
pub(crate) async fn derive_expected_outputs(
    client: &ExecutionClient,
    language: Language,
    reference_solution: &str,
    candidates: Vec<(String, TestcaseCategory)>,
    delay: Duration,
) -> Vec<DerivedCase> {
    let mut derived = Vec::with_capacity(candidates.len());

    for (input, category) in candidates {
        match client.execute_language(language, reference_solution, &input).await {
            Ok(report) if report.is_clean_output() => derived.push(DerivedCase {
                expected_output: report.stdout().trim().to_string(),
                input,
                category,
                is_hidden: true,
            }),
            Ok(report) => tracing::debug!(
                %language,
                status_id = report.status.id,
                "Discarding generated input: reference run was not clean"
            ),
            Err(err) => tracing::warn!(
                %language,
                error = %err,
                "Discarding generated input: reference run failed"
            ),
        }

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    derived
}

/// Makes up to `quota` cases visible, preferring normal, then edge, then random.
pub(crate) fn select_visible(cases: &mut [DerivedCase], quota: usize) {
    let mut remaining = quota;
    for category in [TestcaseCategory::Normal, TestcaseCategory::Edge, TestcaseCategory::Random] {
        for case in cases.iter_mut().filter(|case| case.category == category) {
            if remaining == 0 {
                return;
            }
            case.is_hidden = false;
            remaining -= 1;
        }
    }
}

pub(crate) struct GenerationPipeline<'a> {
    pub(crate) generator: &'a dyn TestcaseGenerator,
    pub(crate) execution: &'a ExecutionClient,
    pub(crate) run_delay: Duration,
    pub(crate) visible_quota: usize,
}

impl GenerationPipeline<'_> {
    /// Produces the replacement testcase set. Nothing is persisted here.
    pub(crate) async fn run(
        &self,
        request: &GenerationRequest<'_>,
        reference_language: &str,
        reference_solution: &str,
    ) -> Result<Vec<DerivedCase>, GenerationError> {
        let language = Language::from_key(reference_language)
            .map_err(|_| GenerationError::UnsupportedLanguage(reference_language.to_string()))?;

        let inputs = self.generator.generate(request).await?.truncated(request.counts);
        let candidates = candidate_inputs(&inputs);
        let proposed = candidates.len();

        let mut cases = derive_expected_outputs(
            self.execution,
            language,
            reference_solution,
            candidates,
            self.run_delay,
        )
        .await;
        select_visible(&mut cases, self.visible_quota);

        tracing::info!(proposed, kept = cases.len(), "Reference outputs derived");

        if cases.iter().all(|case| case.is_hidden) {
            return Err(GenerationError::NoVisibleTestcases);
        }
        Ok(cases)
    }
}


#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::fake::FakeGenerator;
    use super::*;
    use crate::services::execution::fake::{report, FakeExecution, Scripted};

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    fn case(category: TestcaseCategory) -> DerivedCase {
        DerivedCase {
            input: "1".to_string(),
            expected_output: "1".to_string(),
            category,
            is_hidden: true,
        }
    }

    fn execution(fake: Arc<FakeExecution>) -> ExecutionClient {
        ExecutionClient::new(fake, Duration::from_millis(2), Duration::from_millis(40))
    }

    #[test]
    fn parses_fenced_json() {
        let content = "```json\n{\"normal\": [\"1 2\", 3], \"edge\": [\"0 0\"], \"random\": []}\n```";

        let parsed = parse_buckets(content).expect("parsed");

        assert_eq!(parsed.normal, strings(&["1 2", "3"]));
        assert_eq!(parsed.edge, strings(&["0 0"]));
        assert!(parsed.random.is_empty());
    }

    #[test]
    fn missing_bucket_is_invalid() {
        let err = parse_buckets("{\"normal\": [\"1\"], \"edge\": []}").expect_err("invalid");
        assert!(matches!(err, GenerationError::InvalidResponse(_)));
    }

    #[test]
    fn sanitize_strips_one_quote_each_side() {
        assert_eq!(sanitize_input("  \"1 2\"  "), "1 2");
        assert_eq!(sanitize_input("'abc'"), "abc");
        assert_eq!(sanitize_input("\"\"x\"\""), "\"x\"");
        assert_eq!(sanitize_input("plain"), "plain");
        assert_eq!(sanitize_input("\"\""), "");
    }

    #[test]
    fn candidates_drop_empty_inputs_and_keep_bucket_order() {
        let inputs = GeneratedInputs {
            normal: strings(&["1", "  "]),
            edge: strings(&["\"\"", "0"]),
            random: strings(&["42"]),
        };

        let candidates = candidate_inputs(&inputs);

        assert_eq!(
            candidates,
            vec![
                ("1".to_string(), TestcaseCategory::Normal),
                ("0".to_string(), TestcaseCategory::Edge),
                ("42".to_string(), TestcaseCategory::Random),
            ]
        );
    }

    #[test]
    fn truncation_respects_requested_counts() {
        let inputs = GeneratedInputs {
            normal: strings(&["1", "2", "3", "4"]),
            edge: strings(&["5", "6", "7"]),
            random: strings(&["8", "9", "10"]),
        };

        let truncated = inputs.truncated(BucketCounts { normal: 3, edge: 2, random: 1 });

        assert_eq!(truncated.normal.len(), 3);
        assert_eq!(truncated.edge.len(), 2);
        assert_eq!(truncated.random, strings(&["8"]));
    }

    #[test]
    fn visibility_prefers_normal_then_edge_then_random() {
        let mut cases = vec![
            case(TestcaseCategory::Random),
            case(TestcaseCategory::Edge),
            case(TestcaseCategory::Normal),
            case(TestcaseCategory::Edge),
            case(TestcaseCategory::Random),
        ];

        select_visible(&mut cases, 3);

        let visible: Vec<_> = cases.iter().map(|case| !case.is_hidden).collect();
        assert_eq!(visible, vec![false, true, true, true, false]);
    }

    #[test]
    fn visibility_uses_random_when_others_run_out() {
        let mut cases = vec![case(TestcaseCategory::Random), case(TestcaseCategory::Random)];
        select_visible(&mut cases, 3);
        assert!(cases.iter().all(|case| !case.is_hidden));
    }

    #[tokio::test]
    async fn only_clean_reference_runs_survive() {
        let fake = Arc::new(FakeExecution::scripted([
            Scripted::Stdout("3\n".to_string()),
            Scripted::Report(report(11, None, Some("ZeroDivisionError"))),
            Scripted::Report(report(3, Some("7"), Some("warning"))),
            Scripted::Stdout("   ".to_string()),
            Scripted::Transport,
            Scripted::Stdout(" 0 ".to_string()),
        ]));
        let candidates = vec![
            ("1 2".to_string(), TestcaseCategory::Normal),
            ("1 0".to_string(), TestcaseCategory::Normal),
            ("3 4".to_string(), TestcaseCategory::Edge),
            ("".to_string(), TestcaseCategory::Edge),
            ("5 6".to_string(), TestcaseCategory::Random),
            ("0 0".to_string(), TestcaseCategory::Random),
        ];

        let derived = derive_expected_outputs(
            &execution(fake.clone()),
            Language::Python,
            "print(sum(map(int, input().split())))",
            candidates,
            Duration::ZERO,
        )
        .await;

        assert_eq!(
            derived,
            vec![
                DerivedCase {
                    input: "1 2".to_string(),
                    expected_output: "3".to_string(),
                    category: TestcaseCategory::Normal,
                    is_hidden: true,
                },
                DerivedCase {
                    input: "0 0".to_string(),
                    expected_output: "0".to_string(),
                    category: TestcaseCategory::Random,
                    is_hidden: true,
                },
            ]
        );
        assert!(fake.recorded().iter().all(|run| run.source.starts_with("print(sum")));
    }

    #[tokio::test]
    async fn pipeline_marks_visible_cases() {
        let generator = FakeGenerator::returning(GeneratedInputs {
            normal: strings(&["1", "2", "3", "4"]),
            edge: strings(&["0"]),
            random: strings(&["9"]),
        });
        let fake = Arc::new(FakeExecution::default());
        let execution = execution(fake);
        let pipeline = GenerationPipeline {
            generator: &generator,
            execution: &execution,
            run_delay: Duration::ZERO,
            visible_quota: 3,
        };
        let constraints = json!({"text": "1 <= n <= 10"});
        let request = GenerationRequest {
            statement: "Echo n",
            constraints: &constraints,
            counts: BucketCounts { normal: 3, edge: 2, random: 2 },
        };

        let cases = pipeline.run(&request, "python", "print(input())").await.expect("cases");

        let summary: Vec<_> = cases.iter().map(|c| (c.input.as_str(), c.is_hidden)).collect();
        assert_eq!(summary, vec![("1", false), ("2", false), ("3", false), ("0", true), ("9", true)]);
        assert_eq!(
            generator.requested.lock().unwrap().as_slice(),
            &[BucketCounts { normal: 3, edge: 2, random: 2 }]
        );
    }

    #[tokio::test]
    async fn pipeline_fails_without_visible_survivors() {
        let generator = FakeGenerator::returning(GeneratedInputs {
            normal: strings(&["1"]),
            edge: Vec::new(),
            random: Vec::new(),
        });
        let fake = Arc::new(FakeExecution::scripted([Scripted::Report(report(6, None, None))]));
        let execution = execution(fake);
        let pipeline = GenerationPipeline {
            generator: &generator,
            execution: &execution,
            run_delay: Duration::ZERO,
            visible_quota: 3,
        };
        let constraints = Value::Null;
        let request = GenerationRequest {
            statement: "x",
            constraints: &constraints,
            counts: BucketCounts { normal: 1, edge: 0, random: 0 },
        };

        let err = pipeline.run(&request, "cpp", "int main(){}").await.expect_err("no visible");

        assert!(matches!(err, GenerationError::NoVisibleTestcases));
    }

    #[tokio::test]
    async fn pipeline_rejects_unknown_reference_language_before_generating() {
        let generator = FakeGenerator::failing("should not be called");
        let execution = execution(Arc::new(FakeExecution::default()));
        let pipeline = GenerationPipeline {
            generator: &generator,
            execution: &execution,
            run_delay: Duration::ZERO,
            visible_quota: 3,
        };
        let constraints = Value::Null;
        let request = GenerationRequest {
            statement: "x",
            constraints: &constraints,
            counts: BucketCounts { normal: 1, edge: 0, random: 0 },
        };

        let err = pipeline.run(&request, "rust", "fn main(){}").await.expect_err("unsupported");

        assert!(matches!(err, GenerationError::UnsupportedLanguage(lang) if lang == "rust"));
        assert!(generator.requested.lock().unwrap().is_empty());
    }

    #[test]
    fn prompt_embeds_counts_and_constraints() {
        let constraints = json!("1 <= n <= 100");
        let request = GenerationRequest {
            statement: "Sum two numbers",
            constraints: &constraints,
            counts: BucketCounts { normal: 3, edge: 2, random: 2 },
        };

        let prompt = build_prompt(&request);

        assert!(prompt.contains("Sum two numbers"));
        assert!(prompt.contains("1 <= n <= 100"));
        assert!(prompt.contains("normal: 3"));
        assert!(prompt.contains("edge: 2"));
    }
}
