//! OpenAI-compatible chat completion client with fixed-delay retries

use super::{normalize_base_url, ChatModel, CompletionRequest, GatewayError, ModelKind};
use crate::config::LlmConfig;
use crate::metrics::METRICS;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Chat completion client
pub struct LlmClient {
    http: Client,
    url: String,
    api_key: Option<SecretString>,
    model: String,
    reasoning_model: Option<String>,
    max_retries: usize,
    retry_delay: Duration,
    default_temperature: f32,
}

impl LlmClient {
    pub fn new(config: &LlmConfig) -> Result<Self, GatewayError> {
        if config.endpoint.trim().is_empty() {
            return Err(GatewayError::Init("LLM endpoint is empty".to_string()));
        }

        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| GatewayError::Init(e.to_string()))?;

        Ok(Self {
            http,
            url: format!("{}/chat/completions", normalize_base_url(&config.endpoint)),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            reasoning_model: config.reasoning_model.clone(),
            max_retries: config.max_retries.max(1),
            retry_delay: config.retry_delay(),
            default_temperature: config.default_temperature,
        })
    }

    /// Resolve the model name for a call; the reasoning model is only required here
    fn model_for(&self, kind: ModelKind) -> Result<&str, GatewayError> {
        match kind {
            ModelKind::Standard => Ok(&self.model),
            ModelKind::Reasoning => self
                .reasoning_model
                .as_deref()
                .ok_or(GatewayError::MissingReasoningModel),
        }
    }

    async fn call_once(&self, body: &ChatCompletionRequest<'_>) -> Result<String, GatewayError> {
        let mut req = self.http.post(&self.url).json(body);

        if let Some(api_key) = &self.api_key {
            req = req.bearer_auth(api_key.expose_secret());
        }

        let response = req.send().await.map_err(GatewayError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| GatewayError::InvalidResponse("No choices in response".to_string()))?;

        if content.trim().is_empty() {
            return Err(GatewayError::EmptyResponse);
        }

        Ok(content)
    }
}

#[async_trait]
impl ChatModel for LlmClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, GatewayError> {
        let model = self.model_for(request.model)?;
        let body = ChatCompletionRequest {
            model,
            messages: vec![ChatMessage {
                role: "user",
                content: &request.prompt,
            }],
            temperature: request.temperature.unwrap_or(self.default_temperature),
        };

        let mut attempt = 0;
        loop {
            attempt += 1;
            debug!(prompt = %request.prompt_id, model, attempt, "Calling chat completion");

            match self.call_once(&body).await {
                Ok(content) => {
                    METRICS.record_llm(request.prompt_id.as_str(), true);
                    return Ok(content);
                }
                Err(e) if attempt < self.max_retries && e.is_retryable() => {
                    warn!(
                        "Completion attempt {} for {} failed: {}, retrying in {:?}",
                        attempt, request.prompt_id, e, self.retry_delay
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => {
                    METRICS.record_llm(request.prompt_id.as_str(), false);
                    warn!("Completion for {} failed after {} attempts: {}", request.prompt_id, attempt, e);
                    return Err(e);
                }
            }
        }
    }
}

// OpenAI-compatible API types
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}
