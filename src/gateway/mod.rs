//! Model-call gateway: chat completion and embedding backends
//!
//! Both backends speak the OpenAI-compatible HTTP protocol. Callers depend on
//! the [`ChatModel`] and [`Embedder`] traits so pipelines can be driven by
//! scripted implementations in tests.

pub mod embedding_client;
pub mod llm_client;

pub use embedding_client::EmbeddingClient;
pub use llm_client::LlmClient;

use crate::prompts::PromptId;
use async_trait::async_trait;
use std::time::Duration;

/// Gateway error types
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Client initialization failed: {0}")]
    Init(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Upstream returned HTTP {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Model returned an empty completion")]
    EmptyResponse,

    #[error("Reasoning model is not configured (set SCI_LLM_REASONING_MODEL)")]
    MissingReasoningModel,
}

impl GatewayError {
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else {
            Self::Request(err.to_string())
        }
    }

    /// Misconfiguration that no retry or fallback can work around
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Init(_) | Self::MissingReasoningModel)
    }

    pub fn is_retryable(&self) -> bool {
        !self.is_fatal()
    }
}

/// Which configured model a call runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelKind {
    /// Fast model for extraction-style prompts
    #[default]
    Standard,
    /// Reasoning model for generation, critique and evaluation
    Reasoning,
}

/// One chat completion call
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub prompt_id: PromptId,
    pub prompt: String,
    pub model: ModelKind,
    /// `None` uses the configured default temperature
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    pub fn new(prompt_id: PromptId, prompt: impl Into<String>) -> Self {
        Self {
            prompt_id,
            prompt: prompt.into(),
            model: ModelKind::Standard,
            temperature: None,
        }
    }

    pub fn reasoning(mut self) -> Self {
        self.model = ModelKind::Reasoning;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Chat completion backend. Errors are returned once retries are exhausted.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<String, GatewayError>;
}

/// Embedding backend.
///
/// Never fails as a whole: a text whose embedding cannot be obtained maps to
/// a zero vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Vec<Vec<f32>>;
}

/// Normalize an OpenAI-compatible base URL so it ends in `/v1`.
///
/// Accepts URLs with or without a trailing slash and URLs that already name
/// the `/chat/completions` or `/embeddings` resource.
pub fn normalize_base_url(url: &str) -> String {
    let mut base = url.trim().trim_end_matches('/').to_string();
    for suffix in ["/chat/completions", "/embeddings"] {
        if let Some(stripped) = base.strip_suffix(suffix) {
            base = stripped.to_string();
        }
    }
    if !base.ends_with("/v1") {
        base.push_str("/v1");
    }
    base
}

/// Capped exponential backoff: `min(base * 2^attempt, cap)`
pub fn backoff_delay(base: Duration, attempt: u32, cap: Duration) -> Duration {
    let factor = 2u32.saturating_pow(attempt);
    base.checked_mul(factor).map_or(cap, |delay| delay.min(cap))
}
