//! Hybrid paper retrieval
//!
//! Three ranked searches (newest, most cited, most relevant) run
//! concurrently, are merged without duplicates and reranked by embedding
//! similarity to the expanded research background.

pub mod engine;
pub mod models;
pub mod search_client;

pub use engine::RetrievalEngine;
pub use models::{format_paper_list, Paper, SearchStrategy};
pub use search_client::SemanticScholarClient;

use async_trait::async_trait;

/// Search backend errors
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Upstream returned HTTP {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Keyword paper search backend
#[async_trait]
pub trait PaperSearch: Send + Sync {
    /// Run one search attempt, returning at most `limit` papers
    async fn search(
        &self,
        query: &str,
        strategy: SearchStrategy,
        limit: usize,
    ) -> Result<Vec<Paper>, SearchError>;
}
