//! Hybrid retrieval: concurrent strategies, merge, rerank, truncate

use super::models::{Paper, SearchStrategy};
use super::PaperSearch;
use crate::config::SearchConfig;
use crate::gateway::{backoff_delay, Embedder};
use crate::metrics::METRICS;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct RetrievalEngine {
    search: Arc<dyn PaperSearch>,
    embedder: Option<Arc<dyn Embedder>>,
    config: SearchConfig,
}

impl RetrievalEngine {
    pub fn new(
        search: Arc<dyn PaperSearch>,
        embedder: Option<Arc<dyn Embedder>>,
        config: SearchConfig,
    ) -> Self {
        Self {
            search,
            embedder,
            config,
        }
    }

    /// Retrieve papers for a background and keyword list.
    ///
    /// Never fails: strategies that exhaust their retries contribute nothing,
    /// and an empty result means no strategy found anything.
    pub async fn hybrid_retrieve(&self, background: &str, keywords: &[String]) -> Vec<Paper> {
        let query = build_query(keywords);
        info!("Hybrid retrieval for query {}", query);

        let (newest, cited, relevant) = tokio::join!(
            self.search_with_retry(&query, SearchStrategy::Newest),
            self.search_with_retry(&query, SearchStrategy::HighlyCited),
            self.search_with_retry(&query, SearchStrategy::Relevant),
        );

        let merged = merge_and_deduplicate(&[newest, cited, relevant]);
        if merged.is_empty() {
            warn!("No papers found for query {}", query);
            return merged;
        }

        let mut ranked = match &self.embedder {
            Some(embedder) => rerank_by_similarity(embedder.as_ref(), background, merged).await,
            None => merged,
        };

        ranked.truncate(self.config.max_total_papers);
        info!("Retrieved {} papers", ranked.len());
        ranked
    }

    /// Run one strategy with capped exponential backoff. Empty pages are
    /// retried like failures; exhaustion yields an empty list.
    async fn search_with_retry(&self, query: &str, strategy: SearchStrategy) -> Vec<Paper> {
        let limit = self.config.max_papers_per_query;
        let attempts = self.config.max_retries.max(1);

        for attempt in 0..attempts {
            let outcome = self.search.search(query, strategy, limit).await;
            METRICS.record_search(strategy.as_str(), matches!(&outcome, Ok(p) if !p.is_empty()));

            match outcome {
                Ok(papers) if !papers.is_empty() => {
                    debug!("{} search returned {} papers", strategy, papers.len());
                    return papers;
                }
                Ok(_) => debug!("{} search attempt {} returned no papers", strategy, attempt + 1),
                Err(e) => warn!("{} search attempt {} failed: {}", strategy, attempt + 1, e),
            }

            if attempt + 1 < attempts {
                let delay = backoff_delay(
                    self.config.retry_backoff(),
                    attempt as u32,
                    self.config.max_backoff(),
                );
                tokio::time::sleep(delay).await;
            }
        }

        warn!("{} search gave up after {} attempts", strategy, attempts);
        Vec::new()
    }
}

/// A single keyword is used verbatim; several are quoted and OR-joined
pub fn build_query(keywords: &[String]) -> String {
    match keywords {
        [single] => single.clone(),
        _ => keywords
            .iter()
            .map(|k| format!("\"{}\"", k))
            .collect::<Vec<_>>()
            .join(" | "),
    }
}

/// Merge result lists in order, keeping the first paper seen for each identity
pub fn merge_and_deduplicate(lists: &[Vec<Paper>]) -> Vec<Paper> {
    let mut seen = HashSet::new();
    let mut merged = Vec::new();

    for paper in lists.iter().flatten() {
        let identity = paper.identity();
        if identity.is_empty() {
            continue;
        }
        if seen.insert(identity.to_string()) {
            merged.push(paper.clone());
        }
    }

    merged
}

/// Order papers by cosine similarity to the background, best first.
///
/// Ties keep their incoming order. A zero background vector means the
/// embedding failed and the input order is returned unchanged.
pub async fn rerank_by_similarity(
    embedder: &dyn Embedder,
    background: &str,
    papers: Vec<Paper>,
) -> Vec<Paper> {
    let background_vec = embedder
        .embed(&[background.to_string()])
        .await
        .into_iter()
        .next()
        .unwrap_or_default();

    if background_vec.iter().all(|v| *v == 0.0) {
        warn!("Background embedding unavailable, keeping merge order");
        return papers;
    }

    let texts: Vec<String> = papers.iter().map(Paper::rerank_text).collect();
    let paper_vecs = embedder.embed(&texts).await;

    let mut scored: Vec<(f32, Paper)> = papers
        .into_iter()
        .enumerate()
        .map(|(i, paper)| {
            let score = paper_vecs
                .get(i)
                .map_or(0.0, |v| cosine_similarity(&background_vec, v));
            (score, paper)
        })
        .collect();

    // sort_by is stable
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    scored.into_iter().map(|(_, paper)| paper).collect()
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    dot / (norm_a * norm_b + 1e-8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::SearchError;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn paper(id: &str) -> Paper {
        Paper::new(Some(id), &format!("Title {}", id), Some("abstract"))
    }

    /// Replays a queue of outcomes per strategy, then returns empty pages
    struct ScriptedSearch {
        script: Mutex<HashMap<SearchStrategy, Vec<Result<Vec<Paper>, SearchError>>>>,
        calls: AtomicUsize,
    }

    impl ScriptedSearch {
        fn new(script: Vec<(SearchStrategy, Vec<Result<Vec<Paper>, SearchError>>)>) -> Self {
            Self {
                script: Mutex::new(script.into_iter().collect()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl PaperSearch for ScriptedSearch {
        async fn search(
            &self,
            _query: &str,
            strategy: SearchStrategy,
            _limit: usize,
        ) -> Result<Vec<Paper>, SearchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut script = self.script.lock().unwrap();
            match script.get_mut(&strategy) {
                Some(queue) if !queue.is_empty() => queue.remove(0),
                _ => Ok(Vec::new()),
            }
        }
    }

    /// Embeds by looking the text up in a table, zero vector otherwise
    struct TableEmbedder(HashMap<String, Vec<f32>>);

    #[async_trait]
    impl Embedder for TableEmbedder {
        async fn embed(&self, texts: &[String]) -> Vec<Vec<f32>> {
            texts
                .iter()
                .map(|t| self.0.get(t).cloned().unwrap_or_else(|| vec![0.0; 2]))
                .collect()
        }
    }

    fn config() -> SearchConfig {
        SearchConfig {
            max_retries: 3,
            max_total_papers: 10,
            ..SearchConfig::default()
        }
    }

    #[test]
    fn test_build_query() {
        assert_eq!(build_query(&["transformers".to_string()]), "transformers");
        assert_eq!(
            build_query(&["graph".to_string(), "remote sensing".to_string()]),
            "\"graph\" | \"remote sensing\""
        );
    }

    #[test]
    fn test_merge_preserves_first_seen_order() {
        let merged = merge_and_deduplicate(&[
            vec![paper("a"), paper("b")],
            vec![paper("b"), paper("c")],
            vec![paper("a"), paper("d")],
        ]);
        let ids: Vec<&str> = merged.iter().map(Paper::identity).collect();
        assert_eq!(ids, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_merge_uses_title_without_id() {
        let merged = merge_and_deduplicate(&[
            vec![Paper::new(None, "Same", None)],
            vec![Paper::new(None, "Same", Some("other abstract")), Paper::new(None, "", None)],
        ]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].abstract_text, None);
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn test_rerank_orders_by_similarity_with_stable_ties() {
        let embedder = TableEmbedder(HashMap::from([
            ("bg".to_string(), vec![1.0, 0.0]),
            ("Title a abstract".to_string(), vec![0.0, 1.0]),
            ("Title b abstract".to_string(), vec![1.0, 0.0]),
            ("Title c abstract".to_string(), vec![0.0, 1.0]),
        ]));

        let ranked = rerank_by_similarity(&embedder, "bg", vec![paper("a"), paper("b"), paper("c")]).await;
        let ids: Vec<&str> = ranked.iter().map(Paper::identity).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[tokio::test]
    async fn test_rerank_skipped_without_background_vector() {
        let embedder = TableEmbedder(HashMap::from([("Title b abstract".to_string(), vec![1.0, 0.0])]));
        let ranked = rerank_by_similarity(&embedder, "bg", vec![paper("a"), paper("b")]).await;
        let ids: Vec<&str> = ranked.iter().map(Paper::identity).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_strategy_retries_until_results() {
        let search = Arc::new(ScriptedSearch::new(vec![(
            SearchStrategy::Newest,
            vec![
                Err(SearchError::Timeout("slow".to_string())),
                Ok(Vec::new()),
                Ok(vec![paper("n1")]),
            ],
        )]));

        let engine = RetrievalEngine::new(search.clone(), None, config());
        let papers = engine.hybrid_retrieve("bg", &["k".to_string()]).await;

        assert_eq!(papers.len(), 1);
        assert_eq!(papers[0].identity(), "n1");
        // 3 newest attempts + 3 exhausted attempts each for the other strategies
        assert_eq!(search.calls.load(Ordering::SeqCst), 9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_strategies_empty() {
        let search = Arc::new(ScriptedSearch::new(Vec::new()));
        let engine = RetrievalEngine::new(search, None, config());
        assert!(engine.hybrid_retrieve("bg", &["k".to_string()]).await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_merge_order_and_truncation() {
        let search = Arc::new(ScriptedSearch::new(vec![
            (SearchStrategy::Newest, vec![Ok(vec![paper("a"), paper("b")])]),
            (SearchStrategy::HighlyCited, vec![Ok(vec![paper("b"), paper("c")])]),
            (SearchStrategy::Relevant, vec![Ok(vec![paper("d")])]),
        ]));
        let engine = RetrievalEngine::new(
            search,
            None,
            SearchConfig {
                max_total_papers: 3,
                ..config()
            },
        );

        let papers = engine.hybrid_retrieve("bg", &["k".to_string()]).await;
        let ids: Vec<&str> = papers.iter().map(Paper::identity).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
