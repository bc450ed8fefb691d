//! Idea pipeline: keywords through best-idea selection

use super::parser::{extract_ideas, extract_single_idea};
use super::score::Score;
use crate::config::PipelineConfig;
use crate::error::IdeationError;
use crate::gateway::{ChatModel, CompletionRequest, GatewayError, ModelKind};
use crate::language::Language;
use crate::metrics::METRICS;
use crate::prompts::{self, PromptId};
use crate::retrieval::{format_paper_list, Paper};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, info, warn};

/// Ideas requested from the global-inspiration strategy
const GLOBAL_STRATEGY_IDEAS: usize = 3;

/// Abstract prefix length in the idea critique paper summary
const CRITIQUE_ABSTRACT_CHARS: usize = 200;

/// Inspirations synthesized from the retrieved papers
#[derive(Debug, Clone, Default)]
pub struct Inspirations {
    /// One entry per top-ranked paper whose call succeeded, in paper order
    pub paper_inspirations: Vec<String>,
    /// Empty when the global call failed
    pub global_inspiration: String,
}

/// Result of refining one idea
#[derive(Debug, Clone, PartialEq)]
pub enum RefineOutcome {
    Refined(String),
    /// Critique or refinement produced nothing usable; keep the original
    Unchanged,
}

/// Runs the idea stages for one request in one language
#[derive(Clone)]
pub struct IdeaGenerator {
    chat: Arc<dyn ChatModel>,
    language: Language,
    config: Arc<PipelineConfig>,
}

impl IdeaGenerator {
    pub fn new(chat: Arc<dyn ChatModel>, language: Language, config: PipelineConfig) -> Self {
        Self {
            chat,
            language,
            config: Arc::new(config),
        }
    }

    async fn ask(
        &self,
        id: PromptId,
        model: ModelKind,
        vars: &[(&str, &str)],
    ) -> Result<String, GatewayError> {
        let mut request = CompletionRequest::new(id, prompts::render(id, self.language, vars));
        request.model = model;
        self.chat.complete(request).await
    }

    /// `ask` bounded by a timeout
    async fn ask_within(
        &self,
        limit: Duration,
        id: PromptId,
        vars: &[(&str, &str)],
    ) -> Result<String, IdeationError> {
        match timeout(limit, self.ask(id, ModelKind::Reasoning, vars)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(IdeationError::StepTimeout {
                stage: id.as_str(),
                secs: limit.as_secs(),
            }),
        }
    }

    /// Step 1. Falls back to the query itself when the model returns no keywords.
    pub async fn extract_keywords(&self, query: &str) -> Result<Vec<String>, GatewayError> {
        let response = self
            .ask(PromptId::ExtractKeywords, ModelKind::Standard, &[("query", query)])
            .await?;

        let keywords = parse_keywords(&response);
        if keywords.is_empty() {
            warn!("Keyword extraction returned nothing, searching with the raw query");
            return Ok(vec![query.trim().to_string()]);
        }

        info!("Extracted keywords: {:?}", keywords);
        Ok(keywords)
    }

    /// Step 2
    pub async fn expand_background(
        &self,
        query: &str,
        keywords: &[String],
    ) -> Result<String, GatewayError> {
        let keywords = keywords.join(", ");
        self.ask(
            PromptId::ExpandBackground,
            ModelKind::Standard,
            &[("query", query), ("keywords", &keywords)],
        )
        .await
    }

    /// Step 4. `None` when disabled or when the call fails; only a fatal
    /// gateway error is returned.
    pub async fn generate_brainstorm(
        &self,
        background: &str,
    ) -> Result<Option<String>, GatewayError> {
        if !self.config.enable_brainstorm {
            debug!("Brainstorm disabled");
            return Ok(None);
        }

        match self
            .ask(PromptId::Brainstorm, ModelKind::Reasoning, &[("background", background)])
            .await
        {
            Ok(text) if !text.trim().is_empty() => Ok(Some(text)),
            Ok(_) => Ok(None),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!("Brainstorm failed, continuing without it: {}", e);
                METRICS.record_fallback("brainstorm");
                Ok(None)
            }
        }
    }

    /// Step 5: per-paper inspirations for the top-ranked papers, then one
    /// global inspiration over all papers. Failed calls are dropped unless
    /// the error is fatal.
    pub async fn generate_inspirations(
        &self,
        background: &str,
        query: &str,
        papers: &[Paper],
    ) -> Result<Inspirations, GatewayError> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_workers_inspiration.max(1)));
        let background: Arc<str> = Arc::from(background);
        let limit = self.config.inspiration_timeout();

        let handles: Vec<_> = papers
            .iter()
            .take(self.config.inspiration_top_k)
            .cloned()
            .map(|paper| {
                let this = self.clone();
                let semaphore = semaphore.clone();
                let background = background.clone();
                tokio::spawn(async move {
                    let Ok(_permit) = semaphore.acquire_owned().await else {
                        return Ok(None);
                    };
                    match timeout(limit, this.paper_inspiration(&background, &paper)).await {
                        Ok(Ok(text)) if !text.trim().is_empty() => Ok(Some(text)),
                        Ok(Ok(_)) => Ok(None),
                        Ok(Err(e)) if e.is_fatal() => Err(e),
                        Ok(Err(e)) => {
                            warn!("Inspiration for \"{}\" failed: {}", paper.title, e);
                            Ok(None)
                        }
                        Err(_) => {
                            warn!("Inspiration for \"{}\" timed out after {:?}", paper.title, limit);
                            Ok(None)
                        }
                    }
                })
            })
            .collect();

        // Submission order, not completion order
        let mut paper_inspirations = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(Ok(Some(text))) => paper_inspirations.push(text),
                Ok(Ok(None)) => METRICS.record_fallback("paper_inspiration"),
                Ok(Err(e)) => return Err(e),
                Err(e) => warn!("Inspiration task failed: {}", e),
            }
        }

        let paper_list = format_paper_list(papers);
        let global_inspiration = match self
            .ask(
                PromptId::GlobalInspiration,
                ModelKind::Reasoning,
                &[("query", query), ("papers", &paper_list)],
            )
            .await
        {
            Ok(text) => text,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!("Global inspiration failed: {}", e);
                METRICS.record_fallback("global_inspiration");
                String::new()
            }
        };

        info!(
            "Generated {} paper inspirations, global inspiration {}",
            paper_inspirations.len(),
            if global_inspiration.is_empty() { "missing" } else { "present" }
        );

        Ok(Inspirations {
            paper_inspirations,
            global_inspiration,
        })
    }

    async fn paper_inspiration(&self, background: &str, paper: &Paper) -> Result<String, GatewayError> {
        self.ask(
            PromptId::PaperInspiration,
            ModelKind::Reasoning,
            &[
                ("background", background),
                ("title", &paper.title),
                ("abstract", paper.abstract_or_empty()),
            ],
        )
        .await
    }

    /// Step 6: two generation strategies run concurrently, optionally merged
    /// with the brainstorm, capped at `max_ideas_generate`. A failed strategy
    /// contributes nothing unless its error is fatal.
    pub async fn generate_ideas(
        &self,
        background: &str,
        query: &str,
        inspirations: &Inspirations,
        brainstorm: Option<&str>,
    ) -> Result<Vec<String>, IdeationError> {
        let max_ideas = self.config.max_ideas_generate;
        let limit = self.config.generation_timeout();
        let count = max_ideas.to_string();

        let from_papers = async {
            if inspirations.paper_inspirations.is_empty() {
                return Ok(Vec::new());
            }
            let listed = inspirations
                .paper_inspirations
                .iter()
                .enumerate()
                .map(|(i, text)| format!("Inspiration {}:\n{}", i + 1, text))
                .collect::<Vec<_>>()
                .join("\n\n");

            let result = self
                .ask_within(
                    limit,
                    PromptId::IdeasFromInspirations,
                    &[
                        ("query", query),
                        ("background", background),
                        ("inspirations", &listed),
                        ("count", &count),
                    ],
                )
                .await;
            take_ideas(result, max_ideas, "ideas_from_inspirations")
        };

        let from_global = async {
            if inspirations.global_inspiration.trim().is_empty() {
                return Ok(Vec::new());
            }
            let result = self
                .ask_within(
                    limit,
                    PromptId::IdeasFromGlobalInspiration,
                    &[
                        ("query", query),
                        ("background", background),
                        ("inspiration", &inspirations.global_inspiration),
                    ],
                )
                .await;
            take_ideas(result, GLOBAL_STRATEGY_IDEAS, "ideas_from_global_inspiration")
        };

        let (paper_ideas, global_ideas) = tokio::join!(from_papers, from_global);
        let mut ideas = paper_ideas?;
        ideas.extend(global_ideas?);
        debug!("Generation strategies produced {} ideas", ideas.len());

        if let Some(brainstorm) = brainstorm.filter(|b| !b.trim().is_empty()) {
            if self.config.enable_brainstorm {
                ideas = self
                    .integrate_with_brainstorm(background, query, brainstorm, ideas, &count)
                    .await?;
            }
        }

        ideas.truncate(max_ideas);
        Ok(ideas)
    }

    async fn integrate_with_brainstorm(
        &self,
        background: &str,
        query: &str,
        brainstorm: &str,
        ideas: Vec<String>,
        count: &str,
    ) -> Result<Vec<String>, IdeationError> {
        let joined = ideas.join("\n\n");
        let result = self
            .ask_within(
                self.config.generation_timeout(),
                PromptId::IntegrateBrainstorm,
                &[
                    ("query", query),
                    ("background", background),
                    ("brainstorm", brainstorm),
                    ("ideas", &joined),
                    ("count", count),
                ],
            )
            .await;

        match result.map(|text| extract_ideas(&text)) {
            Ok(integrated) if !integrated.is_empty() => Ok(integrated),
            Ok(_) => Ok(ideas),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!("Brainstorm integration failed, keeping generated ideas: {}", e);
                METRICS.record_fallback("integrate_brainstorm");
                Ok(ideas)
            }
        }
    }

    /// Step 7: critique and refine the first `max_ideas_optimize` ideas.
    ///
    /// The output always has the same length as `ideas`. Any idea whose
    /// refinement fails, times out or is cut off by the aggregate deadline
    /// keeps its original text.
    pub async fn iterative_refine(
        &self,
        background: &str,
        papers: &[Paper],
        mut ideas: Vec<String>,
    ) -> Vec<String> {
        let n = ideas.len().min(self.config.max_ideas_optimize);
        if n == 0 {
            return ideas;
        }

        let summary: Arc<str> = Arc::from(critique_summary(papers, self.config.critique_paper_count));
        let background: Arc<str> = Arc::from(background);
        let semaphore = Arc::new(Semaphore::new(self.config.max_workers_optimization.max(1)));
        let per_idea = Duration::from_secs(self.config.optimization_timeout_secs);

        let mut tasks = JoinSet::new();
        for (index, idea) in ideas[..n].iter().cloned().enumerate() {
            let this = self.clone();
            let semaphore = semaphore.clone();
            let background = background.clone();
            let summary = summary.clone();
            tasks.spawn(async move {
                let outcome = match semaphore.acquire_owned().await {
                    Ok(_permit) => {
                        match timeout(per_idea, this.refine_one(&background, &summary, &idea)).await {
                            Ok(outcome) => outcome,
                            Err(_) => {
                                warn!("Refinement of idea {} timed out after {:?}", index + 1, per_idea);
                                RefineOutcome::Unchanged
                            }
                        }
                    }
                    Err(_) => RefineOutcome::Unchanged,
                };
                (index, outcome)
            });
        }

        // Drained in completion order; results land by index
        let deadline = Instant::now() + self.config.refine_timeout(n);
        let mut refined: Vec<Option<String>> = vec![None; n];
        loop {
            match timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(Ok((index, RefineOutcome::Refined(text))))) => refined[index] = Some(text),
                Ok(Some(Ok((index, RefineOutcome::Unchanged)))) => {
                    debug!("Idea {} kept unrefined", index + 1);
                    METRICS.record_fallback("refine_idea");
                }
                Ok(Some(Err(e))) => warn!("Refinement task failed: {}", e),
                Ok(None) => break,
                Err(_) => {
                    warn!(
                        "Refinement exceeded {:?}, abandoning {} unfinished tasks",
                        self.config.refine_timeout(n),
                        tasks.len()
                    );
                    METRICS.record_fallback("refine_deadline");
                    tasks.abort_all();
                    break;
                }
            }
        }

        for (slot, text) in ideas.iter_mut().zip(refined) {
            if let Some(text) = text {
                *slot = text;
            }
        }

        info!("Refined {} of {} ideas", n, ideas.len());
        ideas
    }

    async fn refine_one(&self, background: &str, summary: &str, idea: &str) -> RefineOutcome {
        let criticism = match self
            .ask(
                PromptId::CritiqueIdea,
                ModelKind::Reasoning,
                &[("background", background), ("papers_summary", summary), ("idea", idea)],
            )
            .await
        {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => return RefineOutcome::Unchanged,
            Err(e) => {
                warn!("Idea critique failed: {}", e);
                return RefineOutcome::Unchanged;
            }
        };

        match self
            .ask(
                PromptId::RefineIdea,
                ModelKind::Reasoning,
                &[("background", background), ("idea", idea), ("criticism", &criticism)],
            )
            .await
        {
            Ok(text) if !text.trim().is_empty() => RefineOutcome::Refined(text.trim().to_string()),
            Ok(_) => RefineOutcome::Unchanged,
            Err(e) => {
                warn!("Idea refinement failed: {}", e);
                RefineOutcome::Unchanged
            }
        }
    }

    /// Step 8: score every idea concurrently and keep the highest total.
    ///
    /// Ties go to the earlier idea. Failed or timed-out evaluations score
    /// [`Score::default_fallback`].
    pub async fn evaluate_and_select_best(
        &self,
        background: &str,
        ideas: &[String],
    ) -> Result<(String, Score), IdeationError> {
        if ideas.is_empty() {
            return Err(IdeationError::NoIdeas);
        }

        let background: Arc<str> = Arc::from(background);
        let handles: Vec<_> = ideas
            .iter()
            .map(|idea| {
                let single = extract_single_idea(idea);
                let this = self.clone();
                let background = background.clone();
                let text = single.clone();
                (single, tokio::spawn(async move { this.evaluate_idea(&background, &text).await }))
            })
            .collect();

        let mut best: Option<(String, Score)> = None;
        for (idea, handle) in handles {
            let score = handle.await.unwrap_or_else(|e| {
                warn!("Evaluation task failed: {}", e);
                Score::default_fallback()
            });
            debug!("Scored {:.2}: {}", score.total(), idea);

            let better = best
                .as_ref()
                .map_or(true, |(_, current)| score.total() > current.total());
            if better {
                best = Some((idea, score));
            }
        }

        let (idea, score) = best.ok_or(IdeationError::NoIdeas)?;
        Ok((extract_single_idea(&idea), score))
    }

    async fn evaluate_idea(&self, background: &str, idea: &str) -> Score {
        let result = self
            .ask_within(
                self.config.evaluation_timeout(),
                PromptId::EvaluateIdea,
                &[("background", background), ("idea", idea)],
            )
            .await;

        match result {
            Ok(response) => Score::parse(&response),
            Err(e) => {
                warn!("Evaluation failed, using default score: {}", e);
                METRICS.record_fallback("evaluate_idea");
                Score::default_fallback()
            }
        }
    }
}

/// Comma-separated keywords, trimmed and unquoted
pub fn parse_keywords(response: &str) -> Vec<String> {
    response
        .split(',')
        .map(|k| k.trim().trim_matches(|c| c == '"' || c == '\'').trim())
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

fn take_ideas(
    result: Result<String, IdeationError>,
    max: usize,
    stage: &str,
) -> Result<Vec<String>, IdeationError> {
    match result {
        Ok(text) => {
            let mut ideas = extract_ideas(&text);
            ideas.truncate(max);
            Ok(ideas)
        }
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            warn!("Idea generation strategy {} failed: {}", stage, e);
            METRICS.record_fallback(stage);
            Ok(Vec::new())
        }
    }
}

/// Short paper list for the critique prompt: title plus abstract prefix
fn critique_summary(papers: &[Paper], count: usize) -> String {
    papers
        .iter()
        .take(count)
        .map(|paper| {
            let prefix: String = paper
                .abstract_or_empty()
                .chars()
                .take(CRITIQUE_ABSTRACT_CHARS)
                .collect();
            format!("- {}: {}...", paper.title, prefix)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
