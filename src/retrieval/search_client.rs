//! Semantic Scholar graph API client

use super::models::{Paper, SearchStrategy};
use super::{PaperSearch, SearchError};
use crate::config::SearchConfig;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

const FIELDS: &str = "title,abstract,paperId";

/// One HTTP attempt per call; retries belong to the retrieval engine
pub struct SemanticScholarClient {
    http: Client,
    base_url: String,
    api_key: Option<SecretString>,
}

impl SemanticScholarClient {
    pub fn new(config: &SearchConfig) -> Result<Self, SearchError> {
        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| SearchError::Request(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn request_for(&self, query: &str, strategy: SearchStrategy) -> reqwest::RequestBuilder {
        let (path, sort) = match strategy {
            SearchStrategy::Newest => ("/paper/search/bulk", Some("publicationDate:desc")),
            SearchStrategy::HighlyCited => ("/paper/search/bulk", Some("citationCount:desc")),
            SearchStrategy::Relevant => ("/paper/search", None),
        };

        let mut params = vec![("query", query), ("fields", FIELDS)];
        if let Some(sort) = sort {
            params.push(("sort", sort));
        }

        let mut req = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .query(&params);

        if let Some(api_key) = &self.api_key {
            req = req.header("x-api-key", api_key.expose_secret());
        }
        req
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    data: Option<Vec<Paper>>,
}

#[async_trait]
impl PaperSearch for SemanticScholarClient {
    async fn search(
        &self,
        query: &str,
        strategy: SearchStrategy,
        limit: usize,
    ) -> Result<Vec<Paper>, SearchError> {
        debug!(%strategy, query, "Searching papers");

        let response = self
            .request_for(query, strategy)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SearchError::Timeout(e.to_string())
                } else {
                    SearchError::Request(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| SearchError::InvalidResponse(e.to_string()))?;

        let mut papers = parsed
            .data
            .ok_or_else(|| SearchError::InvalidResponse("Missing `data` field".to_string()))?;
        papers.truncate(limit);
        Ok(papers)
    }
}
