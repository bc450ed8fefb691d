//! Paper search data models

use serde::{Deserialize, Serialize};

/// A retrieved paper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    #[serde(rename = "paperId", default)]
    pub id: Option<String>,

    #[serde(default)]
    pub title: String,

    #[serde(rename = "abstract", default)]
    pub abstract_text: Option<String>,
}

impl Paper {
    pub fn new(id: Option<&str>, title: &str, abstract_text: Option<&str>) -> Self {
        Self {
            id: id.map(str::to_string),
            title: title.to_string(),
            abstract_text: abstract_text.map(str::to_string),
        }
    }

    /// Deduplication key: the paper id when present, else the title
    pub fn identity(&self) -> &str {
        match self.id.as_deref() {
            Some(id) if !id.is_empty() => id,
            _ => &self.title,
        }
    }

    pub fn abstract_or_empty(&self) -> &str {
        self.abstract_text.as_deref().unwrap_or("")
    }

    /// Text embedded for similarity ranking
    pub fn rerank_text(&self) -> String {
        format!("{} {}", self.title, self.abstract_or_empty())
            .trim()
            .to_string()
    }
}

/// Numbered `Paper i` blocks with title and abstract, as fed to prompts
pub fn format_paper_list(papers: &[Paper]) -> String {
    papers
        .iter()
        .enumerate()
        .map(|(i, paper)| {
            format!(
                "Paper {}:\nTitle: {}\nAbstract: {}\n\n",
                i + 1,
                paper.title,
                paper.abstract_or_empty()
            )
        })
        .collect()
}

/// Ranking strategy for one search call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchStrategy {
    Newest,
    HighlyCited,
    Relevant,
}

impl SearchStrategy {
    /// Merge order
    pub const ALL: [SearchStrategy; 3] = [Self::Newest, Self::HighlyCited, Self::Relevant];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Newest => "newest",
            Self::HighlyCited => "highly_cited",
            Self::Relevant => "relevant",
        }
    }
}

impl std::fmt::Display for SearchStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
