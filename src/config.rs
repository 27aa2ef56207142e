use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::participant::anthropic::{self, AnthropicClient};
use crate::participant::echo::EchoClient;
use crate::participant::openai::{self, OpenAiClient};
use crate::participant::{Completion, Participant, Provider, Sampling};

pub const DEFAULT_MAX_HISTORY_MESSAGES: usize = 40;
const GEMINI_OPENAI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai/";

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Messages sent per request, counted from the end of the history.
    /// Zero sends the whole history.
    #[serde(default = "default_max_history_messages")]
    pub max_history_messages: usize,
    #[serde(default = "ParticipantConfig::default_first")]
    pub first: ParticipantConfig,
    #[serde(default = "ParticipantConfig::default_second")]
    pub second: ParticipantConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct ParticipantConfig {
    pub name: String,
    pub provider: Provider,
    pub model: String,
    pub base_url: Option<String>,
    pub system_prompt: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_max_history_messages() -> usize {
    DEFAULT_MAX_HISTORY_MESSAGES
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    500
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_history_messages: DEFAULT_MAX_HISTORY_MESSAGES,
            first: ParticipantConfig::default_first(),
            second: ParticipantConfig::default_second(),
        }
    }
}

impl Config {
    /// Loads the file at `path`, or the per-user default config if it
    /// exists, or the built-in defaults.
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_owned(),
            None => match default_config_path() {
                Some(path) if path.is_file() => path,
                _ => {
                    log::debug!("No config file found, using built-in participants");
                    return Ok(Self::default());
                }
            },
        };

        log::debug!("Loading config from {}", path.display());
        let config: Config = toml::from_str(
            &tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read config file {}", path.display()))?,
        )
        .context("Failed to parse config TOML")?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.first.validate()?;
        self.second.validate()
    }
}

impl ParticipantConfig {
    fn default_first() -> Self {
        Self {
            name: "GPT".to_owned(),
            provider: Provider::OpenAi,
            model: "gpt-4o-mini".to_owned(),
            base_url: None,
            system_prompt: "You are GPT, an argumentative assistant.".to_owned(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }

    fn default_second() -> Self {
        Self {
            name: "Gemini".to_owned(),
            provider: Provider::OpenAi,
            model: "gemini-1.5-flash".to_owned(),
            base_url: Some(GEMINI_OPENAI_BASE_URL.to_owned()),
            system_prompt: "You are Gemini, a polite and courteous assistant.".to_owned(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(!self.name.trim().is_empty(), "Participant name must not be empty");
        ensure!(
            (0.0..=2.0).contains(&self.temperature),
            "Temperature for {} must be between 0.0 and 2.0, got {}",
            self.name,
            self.temperature
        );
        ensure!(
            self.max_tokens > 0,
            "Max tokens for {} must be at least 1",
            self.name
        );
        Ok(())
    }

    /// Builds the participant. Without an API key a keyed provider yields an
    /// unconfigured participant whose turns report the missing key.
    pub fn build(&self, api_key: Option<&str>) -> Participant {
        let client: Option<Box<dyn Completion>> = match (self.provider, api_key) {
            (Provider::Echo, _) => Some(Box::new(EchoClient::new(&self.name))),
            (Provider::OpenAi, Some(key)) => Some(Box::new(OpenAiClient::new(
                self.base_url.as_deref().unwrap_or(openai::DEFAULT_BASE_URL),
                key,
            ))),
            (Provider::Anthropic, Some(key)) => Some(Box::new(AnthropicClient::new(
                self.base_url.as_deref().unwrap_or(anthropic::DEFAULT_BASE_URL),
                key,
            ))),
            (_, None) => None,
        };

        Participant::new(
            &self.name,
            &self.model,
            &self.system_prompt,
            Sampling {
                temperature: self.temperature,
                max_tokens: self.max_tokens,
            },
            client,
        )
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(env!("CARGO_PKG_NAME")).join("config.toml"))
}
