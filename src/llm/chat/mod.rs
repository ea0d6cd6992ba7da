pub mod gemini;

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;
use log::warn;

use self::gemini::GeminiChatClient;
use super::LlmConfig;
use crate::conversation::AssembledConversation;

/// Text increments in the order the provider produced them.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, ProviderError>> + Send>>;

/// Substrings that mark a rate-limit or quota failure when no structured signal is present.
const RATE_LIMIT_SIGNALS: [&str; 3] = ["429", "quota", "Too Many Requests"];

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("upstream returned {status}: {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid provider configuration: {0}")]
    Config(String),
    #[error("stream error: {0}")]
    Stream(String),
    #[error("failed to decode upstream payload: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ProviderError {
    /// Structured status and provider codes are checked first. Only text the
    /// provider wrote is searched for signals, never transport errors (their
    /// text carries the request URL).
    pub fn is_rate_limited(&self) -> bool {
        match self {
            ProviderError::Api { status: 429, .. } => true,
            ProviderError::Api { code: Some(code), .. } if code == "RESOURCE_EXHAUSTED" => true,
            ProviderError::Api { message, .. } | ProviderError::Stream(message) => {
                RATE_LIMIT_SIGNALS.iter().any(|signal| message.contains(signal))
            }
            ProviderError::Transport(e) => e.status() == Some(reqwest::StatusCode::TOO_MANY_REQUESTS),
            ProviderError::Config(_) | ProviderError::Decode(_) => false,
        }
    }
}

#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Opens a streaming completion. Setup failures are returned here; the
    /// stream only carries failures that happen after the first byte.
    async fn stream_chat(
        &self,
        conversation: &AssembledConversation
    ) -> Result<TextStream, ProviderError>;

    fn model(&self) -> &str;
}

pub fn new_client(config: &LlmConfig) -> Result<Option<Arc<dyn ChatClient>>, ProviderError> {
    let Some(api_key) = config.api_key.clone() else {
        warn!("GEMINI_API_KEY is not set; /api/chat will answer with an internal error");
        return Ok(None);
    };
    let client = GeminiChatClient::new(
        api_key,
        config.completion_model.clone(),
        config.base_url.clone()
    )?;
    Ok(Some(Arc::new(client)))
}
