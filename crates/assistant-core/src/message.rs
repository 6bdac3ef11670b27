//! Conversation Messages
//!
//! Message format used between the chat widget, the assistant and providers.

use serde::{Deserialize, Serialize};

/// Maximum number of history entries forwarded to the provider
pub const MAX_HISTORY: usize = 20;

/// Role of a message sender
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System prompt/instructions
    System,
    /// User input
    User,
    /// Assistant (LLM) response
    Assistant,
}

impl Role {
    /// Parse a role as chat clients send it. `model` is the completion
    /// API's name for the assistant.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "user" => Some(Self::User),
            "model" | "assistant" | "bot" => Some(Self::Assistant),
            "system" => Some(Self::System),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// A single message in a conversation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// One text part of a history entry
#[derive(Clone, Debug, Default, Deserialize)]
pub struct HistoryPart {
    #[serde(default)]
    pub text: String,
}

/// A history entry as the chat widget sends it. Both
/// `{role, parts: [{text}]}` and `{role, content}` are accepted.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct HistoryEntry {
    #[serde(default)]
    pub role: String,

    #[serde(default)]
    pub parts: Vec<HistoryPart>,

    #[serde(default)]
    pub content: Option<String>,
}

impl HistoryEntry {
    /// Convert to a message. System entries and empty text are dropped:
    /// the system prompt is not the client's to set.
    pub fn to_message(&self) -> Option<Message> {
        let role = Role::parse(&self.role).filter(|r| *r != Role::System)?;

        let text = match &self.content {
            Some(content) => content.trim().to_string(),
            None => self
                .parts
                .iter()
                .map(|p| p.text.trim())
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join("\n"),
        };

        (!text.is_empty()).then(|| Message::new(role, text))
    }
}

/// Conversation history with utility methods
#[derive(Clone, Debug, Default)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from client history, keeping the most recent turns
    pub fn from_history(history: &[HistoryEntry]) -> Self {
        let mut messages: Vec<Message> = history.iter().filter_map(HistoryEntry::to_message).collect();
        if messages.len() > MAX_HISTORY {
            messages.drain(..messages.len() - MAX_HISTORY);
        }
        Self { messages }
    }

    /// Add a message
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Get all messages
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Messages with the system prompt in front
    pub fn with_system_prompt(&self, prompt: &str) -> Vec<Message> {
        std::iter::once(Message::system(prompt))
            .chain(self.messages.iter().cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
