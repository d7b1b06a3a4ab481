//! LLM classifier (third cascade tier)
//!
//! Sends exactly one chat-completions request per attempt to an
//! OpenAI-compatible endpoint with a deterministic prompt enumerating the
//! closed label set, and validates the response text against that set.
//! Out-of-set completions map to `Unclassified` rather than passing free
//! text through as a label.
//!
//! Every transport, status, quota, timeout, or malformed-response failure is
//! a typed `Error::ServiceUnavailable`. Retries are off unless configured:
//! the upstream contract has none.

use async_trait::async_trait;
use logsift_core::{Category, ClassificationResult, Classifier, Producer, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::{Duration, Instant};

/// The closed label set offered to the model
const LLM_LABELS: [Category; 2] = [Category::WorkflowError, Category::DeprecationWarning];

/// Configuration for the LLM classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL of the OpenAI-compatible API
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// API key. Falls back to the `OPENAI_API_KEY` environment variable.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model identifier
    #[serde(default = "default_model")]
    pub model: String,

    /// Request timeout in seconds. Expiry maps to `ServiceUnavailable`.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Bounded retries for `ServiceUnavailable` failures. Default 0.
    #[serde(default)]
    pub max_retries: u32,

    /// Initial backoff between retries, doubled per attempt
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            api_key: None,
            model: default_model(),
            timeout_secs: default_timeout_secs(),
            max_retries: 0,
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl LlmConfig {
    /// Resolve the API key from config or environment
    pub fn resolve_api_key(&self) -> Result<String> {
        if let Some(key) = &self.api_key {
            return Ok(key.clone());
        }
        env::var("OPENAI_API_KEY")
            .map_err(|_| logsift_core::Error::config("OPENAI_API_KEY not set"))
    }
}

fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_retry_backoff_ms() -> u64 {
    250
}

/// Build the deterministic classification prompt for a message
pub fn build_prompt(message: &str) -> String {
    format!(
        "Classify the log message into one of these categories: {}.\n\
         If you can't figure out a category, return \"Unclassified\".\n\
         Only return the category name. No preamble.\n\
         Log message: {}",
        LLM_LABELS
            .iter()
            .map(|c| c.label())
            .collect::<Vec<_>>()
            .join(", "),
        message
    )
}

/// Validate a raw completion against the closed label set.
///
/// Anything outside {Workflow Error, Deprecation Warning, Unclassified} —
/// including valid categories the prompt did not offer — becomes
/// `Unclassified`.
pub fn parse_label(raw: &str) -> Category {
    match Category::parse(raw) {
        Some(category)
            if category == Category::Unclassified || LLM_LABELS.contains(&category) =>
        {
            category
        }
        _ => Category::Unclassified,
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Chat-completions-backed classifier
pub struct LlmClassifier {
    name: String,
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
    max_retries: u32,
    retry_backoff: Duration,
}

impl LlmClassifier {
    /// Create a classifier from configuration.
    ///
    /// Builds the HTTP client with the explicit request timeout up front;
    /// no network traffic happens until the first `classify` call.
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = config.resolve_api_key()?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                logsift_core::Error::config(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            name: "llm".to_string(),
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            max_retries: config.max_retries,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
        })
    }

    async fn send_once(&self, message: &str) -> Result<Category> {
        let prompt = build_prompt(message);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: &prompt,
            }],
            temperature: 0.0,
            max_tokens: 16,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    logsift_core::Error::service_unavailable("LLM request timed out")
                } else {
                    logsift_core::Error::service_unavailable(format!("LLM request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(logsift_core::Error::service_unavailable(format!(
                "LLM API error {}: {}",
                status, body
            )));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            logsift_core::Error::service_unavailable(format!("malformed LLM response: {}", e))
        })?;

        let content = parsed
            .choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
            .ok_or_else(|| {
                logsift_core::Error::service_unavailable("LLM response contained no completion")
            })?;

        Ok(parse_label(content))
    }
}

#[async_trait]
impl Classifier for LlmClassifier {
    async fn classify(&self, message: &str) -> Result<ClassificationResult> {
        let start = Instant::now();
        let mut backoff = self.retry_backoff;

        for attempt in 0..=self.max_retries {
            match self.send_once(message).await {
                Ok(category) => {
                    tracing::debug!(category = category.label(), "llm classification");
                    return Ok(ClassificationResult::new(category, Producer::Llm)
                        .with_latency_us(start.elapsed().as_micros() as u64));
                }
                Err(e @ logsift_core::Error::ServiceUnavailable(_))
                    if attempt < self.max_retries =>
                {
                    tracing::warn!(attempt, "LLM attempt failed, retrying: {}", e);
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
                Err(e) => return Err(e),
            }
        }

        // Unreachable: the loop either returns a result or propagates the
        // final error above.
        Err(logsift_core::Error::service_unavailable(
            "LLM retries exhausted",
        ))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn producer(&self) -> Producer {
        Producer::Llm
    }
}
