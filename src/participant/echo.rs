use anyhow::Result;
use async_trait::async_trait;

use super::{Completion, CompletionRequest};

/// Offline stand-in that answers `@<name>: <last input>` without any network
/// call. Handy for dry runs of a configuration.
pub struct EchoClient {
    name: String,
}

impl EchoClient {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Completion for EchoClient {
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String> {
        let last = request
            .history
            .last()
            .map(|message| message.content.as_str())
            .unwrap_or_default();
        Ok(format!("@{}: {}", self.name, last))
    }
}
