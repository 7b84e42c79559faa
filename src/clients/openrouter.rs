use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::InsightsConfig;
use crate::services::insights::{self, AiInsights, InsightGenerator, WeatherInsights};

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Serialize, Clone)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    total_tokens: u64,
}

/// Client for an OpenRouter compatible chat completions endpoint.
#[derive(Clone)]
pub struct OpenRouterClient {
    client: Client,
    config: InsightsConfig,
}

impl OpenRouterClient {
    #[must_use]
    pub const fn new(client: Client, config: InsightsConfig) -> Self {
        Self { client, config }
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.config
            .api_key
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty())
    }

    /// Sends one completion request and returns the first choice's content.
    pub async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .context("OpenRouter API key is not configured")?;

        let body = CompletionRequest {
            model: &self.config.model,
            messages,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        debug!(model = %self.config.model, "Sending completion request");

        let response: CompletionResponse = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(api_key)
            .header("HTTP-Referer", &self.config.site_url)
            .header("X-Title", &self.config.site_name)
            .json(&body)
            .send()
            .await
            .context("Completion request failed")?
            .error_for_status()
            .context("Completion API returned an error status")?
            .json()
            .await
            .context("Failed to decode completion response")?;

        if let Some(usage) = &response.usage {
            debug!(total_tokens = usage.total_tokens, "Completion received");
        }

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .context("No content in completion response")
    }
}

#[async_trait]
impl InsightGenerator for OpenRouterClient {
    async fn generate(&self, stats: &WeatherInsights) -> Result<AiInsights> {
        let messages = [
            ChatMessage::system(insights::SYSTEM_PROMPT),
            ChatMessage::user(insights::user_prompt(stats)?),
        ];

        let content = self.complete(&messages).await?;
        insights::parse_ai_insights(&content)
    }
}
