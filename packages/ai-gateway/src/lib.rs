//! Chat-completion gateway.
//!
//! The analysis pipeline consumes language models through one narrow
//! boundary: send an ordered list of role-tagged messages with a model
//! configuration, receive free-text content. [`CompletionGateway`] is that
//! boundary; [`OpenAiGateway`] is the production implementation over the
//! OpenAI REST API. No retry or backoff happens at this layer - each
//! pipeline step decides for itself what a failed call means.
//!
//! # Example
//!
//! ```rust,ignore
//! use ai_gateway::{ChatMessage, CompletionGateway, CompletionRequest, OpenAiGateway};
//!
//! let gateway = OpenAiGateway::from_env()?;
//! let answer = gateway
//!     .complete(
//!         CompletionRequest::new("gpt-4o-mini")
//!             .message(ChatMessage::system("You summarize websites"))
//!             .message(ChatMessage::user(page_text)),
//!     )
//!     .await?;
//! ```

pub mod error;
pub mod types;

pub use error::{GatewayError, Result};
pub use types::{
    strip_code_fences, truncate_to_char_boundary, ChatMessage, CompletionRequest,
};

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

/// Capability to turn a message list into a text completion.
#[async_trait]
pub trait CompletionGateway: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<String>;
}

/// OpenAI-backed completion gateway.
#[derive(Clone)]
pub struct OpenAiGateway {
    http_client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiGateway {
    /// Create a gateway with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }

    /// Create from environment variable `OPENAI_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| GatewayError::Config("OPENAI_API_KEY not set".into()))?;
        Ok(Self::new(api_key))
    }

    /// Set a custom base URL (for proxies or test servers).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[async_trait]
impl CompletionGateway for OpenAiGateway {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let start = std::time::Instant::now();

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Completion request failed");
                GatewayError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %error_text, "Completion API error");
            return Err(GatewayError::Api(format!(
                "Completion API error: {}",
                error_text
            )));
        }

        let chat_response: types::ChatResponseRaw = response
            .json()
            .await
            .map_err(|e| GatewayError::Parse(e.to_string()))?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| GatewayError::Api("No completion choices returned".into()))?;

        debug!(
            model = %request.model,
            duration_ms = start.elapsed().as_millis(),
            "Chat completion"
        );

        Ok(content)
    }
}
