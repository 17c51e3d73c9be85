//! LLM provider abstractions for termscope-runtime.
//!
//! The analysis stages only talk to [`LlmProvider`]; [`build_provider`]
//! picks the backend named in [`ProviderConfig`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::ProviderConfig;

mod gemini;
mod secrets;

pub use gemini::{GeminiProvider, GEMINI_API_KEY_ENV, GEMINI_BASE_URL};
pub use secrets::load_api_key;

/// Errors from LLM providers.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    #[error("Rate limit exceeded, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    ParseError(String),

    #[error("Authentication failed")]
    AuthError,

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Model returned no text: {0}")]
    EmptyResponse(String),
}

impl ProviderError {
    /// Whether a second attempt at the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Timeout(_))
    }
}

/// Configuration for a completion request.
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    /// Model to use
    pub model: String,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,

    /// Request timeout
    pub timeout: Duration,

    /// Let the model retrieve URLs named in the prompt itself
    pub url_context: bool,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".to_string(),
            max_tokens: 2000,
            temperature: 0.1,
            timeout: Duration::from_secs(60),
            url_context: false,
        }
    }
}

/// A chat message for LLM completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role: "system" or "user"
    pub role: String,

    /// Message content
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

}

/// Response from an LLM completion.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// Generated text
    pub content: String,

    pub usage: TokenUsage,

    /// Model that served the request
    pub model: String,

    /// Finish reason reported by the backend
    pub stop_reason: Option<String>,
}

/// Token usage from a completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u32,

    pub completion_tokens: u32,

    /// Prompt tokens served from the backend's context cache
    pub cache_read_tokens: u32,

    /// Tokens spent on tool use (URL retrieval)
    pub tool_tokens: u32,
}

impl TokenUsage {
    /// Total tokens used.
    pub fn total(&self) -> u32 {
        self.prompt_tokens
            .saturating_add(self.completion_tokens)
            .saturating_add(self.tool_tokens)
    }
}

/// Provider abstraction allows swapping LLM backends.
///
/// This is the only place model calls are made. Providers are stateless
/// between calls apart from their HTTP client.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Execute a chat completion.
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError>;

    /// Provider name for logs.
    fn name(&self) -> &str;
}

/// Build the provider named by `config.provider_type`.
pub fn build_provider(config: &ProviderConfig) -> Result<Arc<dyn LlmProvider>, ProviderError> {
    match config.provider_type.as_str() {
        "gemini" => Ok(Arc::new(GeminiProvider::from_config(&config.to_json())?)),
        other => Err(ProviderError::NotConfigured(format!(
            "unknown provider type '{}' (supported: gemini)",
            other
        ))),
    }
}
