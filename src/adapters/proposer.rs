use crate::core::prompt::{render_prompt, SYSTEM_PROMPT};
use crate::domain::plan::{ProposalContext, ProposedPlan};
use crate::domain::ports::PlanProposer;
use crate::utils::error::{PlannerError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4o";

#[derive(Debug, Clone, PartialEq)]
pub struct ProposerSettings {
    /// Full chat-completions URL.
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Extra tries after an HTTP 429 within one `propose` call.
    pub rate_limit_retries: u32,
    /// First backoff delay; doubles on every 429.
    pub retry_delay: Duration,
}

impl Default for ProposerSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.3,
            max_tokens: 4000,
            rate_limit_retries: 2,
            retry_delay: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatContent,
}

#[derive(Debug, Deserialize)]
struct ChatContent {
    #[serde(default)]
    content: Option<String>,
}

/// Plan proposer backed by an OpenAI-compatible chat-completions API.
///
/// Every call renders the advisor prompt, asks for a JSON object and parses
/// it as a [`ProposedPlan`]. Rate limiting is retried here with exponential
/// backoff; anything else is returned to the orchestrator as a
/// `ProposerError`.
pub struct HttpPlanProposer {
    client: Client,
    settings: ProposerSettings,
}

impl HttpPlanProposer {
    pub fn new(settings: ProposerSettings) -> Self {
        Self {
            client: Client::new(),
            settings,
        }
    }

    pub fn settings(&self) -> &ProposerSettings {
        &self.settings
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = ChatRequest {
            model: &self.settings.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
            response_format: ResponseFormat { kind: "json_object" },
        };

        let mut delay = self.settings.retry_delay;
        let mut attempt = 0;
        loop {
            let mut request = self.client.post(&self.settings.endpoint).json(&body);
            if let Some(key) = &self.settings.api_key {
                request = request.bearer_auth(key);
            }

            tracing::debug!("Calling plan proposer at {}", self.settings.endpoint);
            let response = request.send().await?;
            let status = response.status();
            tracing::debug!("Proposer response status: {}", status);

            if status == StatusCode::TOO_MANY_REQUESTS {
                if attempt >= self.settings.rate_limit_retries {
                    return Err(PlannerError::proposer(format!(
                        "rate limit exceeded after {} retries",
                        attempt
                    )));
                }
                attempt += 1;
                tracing::warn!(
                    "Rate limited, retrying in {:?} ({}/{})",
                    delay,
                    attempt,
                    self.settings.rate_limit_retries
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
                continue;
            }

            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                return Err(PlannerError::proposer(format!(
                    "proposer returned HTTP {}: {}",
                    status,
                    text.chars().take(200).collect::<String>()
                )));
            }

            let chat: ChatResponse = response.json().await?;
            return chat
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content)
                .filter(|content| !content.trim().is_empty())
                .ok_or_else(|| PlannerError::proposer("empty response from proposer"));
        }
    }
}

#[async_trait]
impl PlanProposer for HttpPlanProposer {
    async fn propose(&self, context: &ProposalContext, prior_errors: &[String]) -> Result<ProposedPlan> {
        let prompt = render_prompt(context, prior_errors);
        let content = self.complete(&prompt).await?;
        serde_json::from_str(&content)
            .map_err(|e| PlannerError::proposer(format!("response is not a valid plan: {}", e)))
    }
}
