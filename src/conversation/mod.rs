pub(crate) mod orchestrator;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use strum::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// One participant's side of the conversation. The system prompt is never
/// stored here; it is prepended when a request is built.
#[derive(Debug, Clone, Default)]
pub struct History {
    messages: Vec<Message>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// The trailing slice sent with a request: at most `limit` messages,
    /// always starting on a user message. A limit of zero means no limit.
    pub fn window(&self, limit: usize) -> &[Message] {
        let messages = self.messages();
        if limit == 0 || messages.len() <= limit {
            return messages;
        }

        let mut start = messages.len() - limit;
        while messages
            .get(start)
            .is_some_and(|message| message.role != Role::User)
        {
            start += 1;
        }
        &messages[start..]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Seat {
    First,
    Second,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utterance {
    pub seat: Seat,
    pub speaker: String,
    pub words: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    pub seed: String,
    pub utterances: Vec<Utterance>,
}

impl Transcript {
    pub fn new(seed: impl Into<String>) -> Self {
        Self {
            seed: seed.into(),
            utterances: Vec::new(),
        }
    }

    /// Renders the transcript as `Speaker: words` lines, seed first.
    pub fn to_text(&self) -> String {
        std::iter::once(format_line("User", &self.seed))
            .chain(
                self.utterances
                    .iter()
                    .map(|utterance| format_line(&utterance.speaker, &utterance.words)),
            )
            .join("\n")
    }
}

pub fn format_line(speaker: &str, words: &str) -> String {
    format!("{speaker}: {words}")
}
