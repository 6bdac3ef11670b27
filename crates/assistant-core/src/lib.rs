//! # assistant-core
//!
//! The chat assistant shown next to the checkout: a fixed system prompt in
//! front of a provider-agnostic completion API.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                       Assistant                           │
//! │  ┌──────────────┐  ┌──────────────┐  ┌────────────────┐  │
//! │  │ System prompt│  │ Conversation │──│  LlmProvider   │  │
//! │  │ + model list │──│  (history)   │  │  (Strategy)    │  │
//! │  └──────────────┘  └──────────────┘  └────────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Errors leaving the assistant are rewritten by
//! [`AssistantError::user_message`] so the client only ever sees branded
//! text, never the upstream provider's.

pub mod assistant;
pub mod error;
pub mod message;
pub mod provider;

pub use assistant::{Assistant, AssistantConfig, DEFAULT_SYSTEM_PROMPT};
pub use error::{AssistantError, Result};
pub use message::{Conversation, HistoryEntry, Message, Role};
pub use provider::{Completion, GenerationOptions, LlmProvider};
