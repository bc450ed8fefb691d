//! OpenAI-compatible embedding client
//!
//! Each text is embedded independently with capped exponential backoff. A
//! text that still fails after the last attempt gets a zero vector.

use super::{backoff_delay, normalize_base_url, Embedder, GatewayError};
use crate::config::{EmbeddingConfig, LlmConfig};
use crate::metrics::METRICS;
use async_trait::async_trait;
use futures::future::join_all;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

pub struct EmbeddingClient {
    http: Client,
    url: String,
    api_key: Option<SecretString>,
    model: String,
    dimension: usize,
    max_retries: usize,
    retry_backoff: Duration,
    max_backoff: Duration,
}

impl EmbeddingClient {
    /// Build a client; endpoint and key fall back to the LLM settings
    pub fn new(config: &EmbeddingConfig, llm: &LlmConfig) -> Result<Self, GatewayError> {
        let endpoint = config
            .endpoint
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .unwrap_or(&llm.endpoint);

        if endpoint.trim().is_empty() {
            return Err(GatewayError::Init("Embedding endpoint is empty".to_string()));
        }

        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| GatewayError::Init(e.to_string()))?;

        debug!("Embedding client using model {} on {}", config.model, config.device);

        Ok(Self {
            http,
            url: format!("{}/embeddings", normalize_base_url(endpoint)),
            api_key: config.api_key.clone().or_else(|| llm.api_key.clone()),
            model: config.model.clone(),
            dimension: config.dimension,
            max_retries: config.max_retries.max(1),
            retry_backoff: config.retry_backoff(),
            max_backoff: config.max_backoff(),
        })
    }

    async fn call_once(&self, text: &str) -> Result<Vec<f32>, GatewayError> {
        let body = EmbeddingRequest {
            model: &self.model,
            input: text,
            encoding_format: "float",
        };

        let mut req = self.http.post(&self.url).json(&body);
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

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

        parsed
            .data
            .into_iter()
            .next()
            .map(|item| item.embedding)
            .filter(|embedding| !embedding.is_empty())
            .ok_or_else(|| GatewayError::InvalidResponse("No embedding in response".to_string()))
    }

    /// Embed one text, `None` once every attempt has failed
    async fn embed_one(&self, text: &str) -> Option<Vec<f32>> {
        if text.trim().is_empty() {
            return None;
        }

        for attempt in 0..self.max_retries {
            match self.call_once(text).await {
                Ok(embedding) => {
                    METRICS.record_embedding(true);
                    return Some(embedding);
                }
                Err(e) if attempt + 1 < self.max_retries => {
                    let delay = backoff_delay(self.retry_backoff, attempt as u32, self.max_backoff);
                    warn!(
                        "Embedding attempt {}/{} failed: {}, retrying in {:?}",
                        attempt + 1,
                        self.max_retries,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    warn!("Embedding failed after {} attempts: {}", self.max_retries, e);
                }
            }
        }

        METRICS.record_embedding(false);
        None
    }
}

#[async_trait]
impl Embedder for EmbeddingClient {
    async fn embed(&self, texts: &[String]) -> Vec<Vec<f32>> {
        join_all(texts.iter().map(|text| self.embed_one(text)))
            .await
            .into_iter()
            .map(|embedding| embedding.unwrap_or_else(|| vec![0.0; self.dimension]))
            .collect()
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
    encoding_format: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configs(endpoint: &str) -> (EmbeddingConfig, LlmConfig) {
        let embedding = EmbeddingConfig {
            dimension: 4,
            max_retries: 3,
            retry_backoff_ms: 1,
            max_backoff_ms: 2,
            ..EmbeddingConfig::default()
        };
        let llm = LlmConfig {
            endpoint: endpoint.to_string(),
            api_key: Some(SecretString::new("shared-key".to_string())),
            ..LlmConfig::default()
        };
        (embedding, llm)
    }

    #[tokio::test]
    async fn test_embed_falls_back_to_llm_endpoint() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/embeddings")
            .match_header("authorization", "Bearer shared-key")
            .with_status(200)
            .with_body(r#"{"data":[{"embedding":[0.1,0.2,0.3,0.4]}]}"#)
            .expect(2)
            .create_async()
            .await;

        let (embedding, llm) = configs(&server.url());
        let client = EmbeddingClient::new(&embedding, &llm).unwrap();

        let vectors = client
            .embed(&["first text".to_string(), "second text".to_string()])
            .await;

        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0], vec![0.1, 0.2, 0.3, 0.4]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_failed_text_becomes_zero_vector() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/embeddings")
            .with_status(500)
            .expect(3)
            .create_async()
            .await;

        let (embedding, llm) = configs(&server.url());
        let client = EmbeddingClient::new(&embedding, &llm).unwrap();

        let vectors = client.embed(&["background".to_string()]).await;

        assert_eq!(vectors, vec![vec![0.0; 4]]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_blank_text_skips_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/embeddings")
            .expect(0)
            .create_async()
            .await;

        let (embedding, llm) = configs(&server.url());
        let client = EmbeddingClient::new(&embedding, &llm).unwrap();

        let vectors = client.embed(&["   ".to_string()]).await;

        assert_eq!(vectors, vec![vec![0.0; 4]]);
        mock.assert_async().await;
    }
}
