pub(crate) mod anthropic;
pub(crate) mod echo;
pub(crate) mod openai;

use anyhow::Result;
use async_trait::async_trait;
use log::{debug, warn};
use serde::Deserialize;
use strum::{Display, EnumString};

use crate::conversation::Message;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Provider {
    OpenAi,
    Anthropic,
    Echo,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sampling {
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Everything a provider needs for one exchange.
pub struct CompletionRequest<'a> {
    pub model: &'a str,
    pub system_prompt: &'a str,
    pub history: &'a [Message],
    pub sampling: Sampling,
}

#[async_trait]
pub trait Completion: Send + Sync {
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String>;
}

/// A named debater bound to one completion endpoint.
pub struct Participant {
    pub name: String,
    pub model: String,
    pub system_prompt: String,
    pub sampling: Sampling,
    client: Option<Box<dyn Completion>>,
}

impl Participant {
    pub fn new(
        name: impl Into<String>,
        model: impl Into<String>,
        system_prompt: impl Into<String>,
        sampling: Sampling,
        client: Option<Box<dyn Completion>>,
    ) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            system_prompt: system_prompt.into(),
            sampling,
            client,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    /// Produces this participant's next reply. Failures come back as
    /// readable text so the debate keeps going.
    pub async fn respond(&self, history: &[Message]) -> String {
        let Some(client) = &self.client else {
            warn!("{} has no client configured", self.name);
            return format!(
                "Error: {} is not configured. Provide an API key for it and try again.",
                self.name
            );
        };

        debug!(
            "Requesting reply from {} ({}, {} messages)",
            self.name,
            self.model,
            history.len()
        );

        let request = CompletionRequest {
            model: &self.model,
            system_prompt: &self.system_prompt,
            history,
            sampling: self.sampling,
        };

        match client.complete(request).await {
            Ok(text) => text.trim().to_owned(),
            Err(error) => {
                warn!("Call to {} failed: {error:#}", self.name);
                format!("Error calling {}: {error:#}", self.name)
            }
        }
    }
}
