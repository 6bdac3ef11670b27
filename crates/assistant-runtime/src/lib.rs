//! # assistant-runtime
//!
//! Completion API providers for the checkout assistant.
//!
//! ## Providers
//!
//! - **Gemini** (default): Google generative language API over HTTPS
//!
//! ## Usage
//!
//! ```rust,ignore
//! use assistant_runtime::GeminiProvider;
//!
//! let provider = GeminiProvider::from_env()?;
//! let assistant = Assistant::new(Arc::new(provider), AssistantConfig::default());
//! ```

#[cfg(feature = "gemini")]
pub mod gemini;

#[cfg(feature = "gemini")]
pub use gemini::{GeminiConfig, GeminiProvider};

// Re-export core types for convenience
pub use assistant_core::{
    Assistant, AssistantConfig, AssistantError, LlmProvider, Message, Result, Role,
};
