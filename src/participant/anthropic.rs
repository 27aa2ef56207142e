use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{Completion, CompletionRequest};
use crate::conversation::Message;

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const MAX_TEMPERATURE: f32 = 1.0;

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: &'a [Message],
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

pub struct AnthropicClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl AnthropicClient {
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_owned(),
            api_key: api_key.into(),
        }
    }
}

fn build_request<'a>(request: &CompletionRequest<'a>) -> AnthropicRequest<'a> {
    // The Messages API takes the system prompt as a separate field and caps
    // temperature at 1.0.
    let temperature = request.sampling.temperature;
    if temperature > MAX_TEMPERATURE {
        log::warn!(
            "Temperature {temperature} is above Anthropic's limit, sending {MAX_TEMPERATURE}"
        );
    }

    AnthropicRequest {
        model: request.model,
        max_tokens: request.sampling.max_tokens,
        temperature: temperature.min(MAX_TEMPERATURE),
        system: request.system_prompt,
        messages: request.history,
    }
}

#[async_trait]
impl Completion for AnthropicClient {
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String> {
        let body = build_request(&request);

        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .context("Failed to send request to Anthropic API")?
            .error_for_status()
            .context("Anthropic API error")?;

        let api_response: AnthropicResponse = response
            .json()
            .await
            .context("Failed to parse Anthropic API response")?;

        first_text(api_response)
    }
}

/// Replies may open with non-text blocks such as `thinking`; the answer is
/// the first `text` block.
fn first_text(response: AnthropicResponse) -> Result<String> {
    response
        .content
        .into_iter()
        .find(|content| content.kind == "text")
        .and_then(|content| content.text)
        .context("No text content in Anthropic response")
}
