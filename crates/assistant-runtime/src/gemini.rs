//! Gemini LLM Provider
//!
//! Implementation of `LlmProvider` for the Google generative language REST
//! API (`v1beta/models/{model}:generateContent`).

use std::time::Duration;

use assistant_core::{
    error::{AssistantError, Result},
    message::{Message, Role},
    provider::{Completion, GenerationOptions, LlmProvider},
};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Gemini provider configuration
#[derive(Clone, Debug)]
pub struct GeminiConfig {
    /// API key, sent as the `key` query parameter
    pub api_key: String,

    /// API root, without the version segment
    pub base_url: String,

    /// Model override from `GEMINI_MODEL`
    pub model: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.into(),
            model: None,
            timeout_secs: 30,
        }
    }

    /// Read `GEMINI_API_KEY` (required), `GEMINI_BASE_URL` and `GEMINI_MODEL`
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AssistantError::Config("GEMINI_API_KEY not set".into()))?;

        let mut config = Self::new(api_key);
        if let Ok(base_url) = std::env::var("GEMINI_BASE_URL") {
            if !base_url.trim().is_empty() {
                config.base_url = base_url;
            }
        }
        config.model = std::env::var("GEMINI_MODEL")
            .ok()
            .filter(|m| !m.trim().is_empty());

        Ok(config)
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
    top_p: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
    #[serde(default)]
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

/// Gemini LLM provider
pub struct GeminiProvider {
    client: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiProvider {
    /// Create from configuration
    pub fn from_config(config: GeminiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AssistantError::Config(e.to_string()))?;

        Ok(Self {
            client,
            config: GeminiConfig {
                base_url: config.base_url.trim_end_matches('/').to_string(),
                ..config
            },
        })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_config(GeminiConfig::from_env()?)
    }

    /// Model configured through the environment, if any
    pub fn configured_model(&self) -> Option<&str> {
        self.config.model.as_deref()
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{model}:generateContent", self.config.base_url)
    }

    /// Convert messages to a request body. System messages become the
    /// `systemInstruction`; the conversation must open with a user turn.
    fn build_request(messages: &[Message], options: &GenerationOptions) -> GenerateRequest {
        let system = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let contents = messages
            .iter()
            .filter(|m| m.role != Role::System)
            .skip_while(|m| m.role != Role::User)
            .map(|m| Content {
                role: Some(if m.role == Role::User { "user" } else { "model" }.into()),
                parts: vec![Part {
                    text: m.content.clone(),
                }],
            })
            .collect();

        GenerateRequest {
            system_instruction: (!system.is_empty()).then(|| Content {
                role: None,
                parts: vec![Part { text: system }],
            }),
            contents,
            generation_config: GenerationConfig {
                temperature: options.temperature,
                max_output_tokens: options.max_tokens,
                top_p: options.top_p,
            },
        }
    }

    /// Convert a response body to a completion
    fn parse_response(body: &str, model: &str) -> Result<Completion> {
        let response: GenerateResponse = serde_json::from_str(body)?;

        let Some(candidate) = response.candidates.into_iter().next() else {
            let reason = response
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .unwrap_or_else(|| "no candidates".into());
            return Err(AssistantError::Provider(format!("response blocked: {reason}")));
        };

        let content = candidate
            .content
            .unwrap_or_default()
            .parts
            .into_iter()
            .map(|p| p.text)
            .collect::<String>();

        Ok(Completion {
            content,
            model: response.model_version.unwrap_or_else(|| model.to_string()),
            finish_reason: candidate.finish_reason,
        })
    }

    /// Map a non-2xx response to an error
    fn status_error(status: StatusCode, body: &str) -> AssistantError {
        let detail = format!("{}: {}", status.as_u16(), body.trim());
        if status == StatusCode::TOO_MANY_REQUESTS {
            AssistantError::RateLimited(detail)
        } else {
            AssistantError::Provider(detail)
        }
    }

    fn transport_error(e: reqwest::Error) -> AssistantError {
        // The URL carries the API key
        let e = e.without_url();
        if e.is_connect() || e.is_timeout() {
            AssistantError::ProviderUnavailable(e.to_string())
        } else {
            AssistantError::Provider(e.to_string())
        }
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/v1beta/models", self.config.base_url);
        match self
            .client
            .get(&url)
            .query(&[("key", self.config.api_key.as_str())])
            .send()
            .await
        {
            Ok(response) => Ok(response.status().is_success()),
            Err(e) => {
                tracing::warn!("Gemini health check failed: {}", e.without_url());
                Ok(false)
            }
        }
    }

    async fn complete(&self, messages: &[Message], options: &GenerationOptions) -> Result<Completion> {
        let request = Self::build_request(messages, options);
        if request.contents.is_empty() {
            return Err(AssistantError::InvalidRequest("Message is required".into()));
        }

        let response = self
            .client
            .post(self.endpoint(&options.model))
            .query(&[("key", self.config.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(Self::transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(Self::transport_error)?;

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), model = %options.model, "Gemini request failed");
            return Err(Self::status_error(status, &body));
        }

        Self::parse_response(&body, &options.model)
    }
}
