//! Request state machine: validation, client setup, the nine pipeline steps

use super::events::{EventSink, StreamEvent, TOTAL_STEPS};
use super::heartbeat::{supervise, HeartbeatPolicy};
use crate::config::IdeationConfig;
use crate::error::IdeationError;
use crate::gateway::{ChatModel, Embedder, EmbeddingClient, GatewayError, LlmClient};
use crate::ideas::{IdeaGenerator, Score};
use crate::language::Language;
use crate::metrics::METRICS;
use crate::plan::PlanCompiler;
use crate::retrieval::{Paper, PaperSearch, RetrievalEngine, SemanticScholarClient};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Metric name, English label and Chinese label per step
const STEPS: [(&str, &str, &str); TOTAL_STEPS as usize] = [
    ("keywords", "Extracting keywords", "提取关键词"),
    ("background", "Expanding research background", "扩展研究背景"),
    ("retrieval", "Retrieving related papers", "检索相关论文"),
    ("brainstorm", "Brainstorming", "头脑风暴"),
    ("inspirations", "Synthesizing inspirations", "生成研究灵感"),
    ("ideas", "Generating research ideas", "生成研究想法"),
    ("refine", "Refining ideas", "优化研究想法"),
    ("evaluate", "Evaluating and selecting the best idea", "评估并选择最佳想法"),
    ("plan", "Drafting the research plan", "撰写研究计划"),
];

/// Backends used by one request
pub struct Backends {
    pub chat: Arc<dyn ChatModel>,
    /// Without an embedder papers keep their search order
    pub embedder: Option<Arc<dyn Embedder>>,
    pub search: Arc<dyn PaperSearch>,
}

/// Builds the backends for a request once its configuration validated
pub trait BackendFactory: Send + Sync {
    fn connect(&self, config: &IdeationConfig) -> Result<Backends, IdeationError>;
}

/// HTTP backends: OpenAI-compatible chat and embeddings, Semantic Scholar
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpBackendFactory;

impl BackendFactory for HttpBackendFactory {
    fn connect(&self, config: &IdeationConfig) -> Result<Backends, IdeationError> {
        let chat = LlmClient::new(&config.llm)?;

        let embedder: Option<Arc<dyn Embedder>> =
            match EmbeddingClient::new(&config.embedding, &config.llm) {
                Ok(client) => Some(Arc::new(client)),
                Err(e) => {
                    warn!("Embedding client unavailable, skipping rerank: {}", e);
                    None
                }
            };

        let search = SemanticScholarClient::new(&config.search)
            .map_err(|e| GatewayError::Init(e.to_string()))?;

        Ok(Backends {
            chat: Arc::new(chat),
            embedder,
            search: Arc::new(search),
        })
    }
}

struct RequestContext<'a> {
    sink: &'a EventSink,
    deadline: Instant,
    language: Language,
}

impl RequestContext<'_> {
    fn localized(&self, en: String, zh: String) -> String {
        match self.language {
            Language::Zh => zh,
            Language::En => en,
        }
    }
}

/// Drives one ideation request and reports progress through an [`EventSink`]
pub struct Orchestrator {
    config: Arc<IdeationConfig>,
    factory: Arc<dyn BackendFactory>,
    heartbeat: HeartbeatPolicy,
    deadline: Duration,
}

impl Orchestrator {
    pub fn new(config: Arc<IdeationConfig>, factory: Arc<dyn BackendFactory>) -> Self {
        Self {
            heartbeat: HeartbeatPolicy::from_config(&config.server),
            deadline: config.server.request_timeout(),
            config,
            factory,
        }
    }

    pub fn with_heartbeat(mut self, policy: HeartbeatPolicy) -> Self {
        self.heartbeat = policy;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn config(&self) -> &IdeationConfig {
        &self.config
    }

    /// Run the pipeline for `query`.
    ///
    /// Never fails: any error becomes a single error event, after which the
    /// sink is dropped and the stream ends.
    pub async fn run(&self, query: String, sink: EventSink) {
        let request_id = Uuid::new_v4();
        let span = info_span!("ideation", %request_id);

        async {
            let started = Instant::now();
            info!("Ideation request started");
            debug!("Query: {}", query);

            match self.execute(&query, &sink, started).await {
                Ok(()) => {
                    METRICS.record_request("success");
                    info!("Ideation finished in {:?}", started.elapsed());
                }
                Err(IdeationError::ClientDisconnected) => {
                    METRICS.record_request(IdeationError::ClientDisconnected.kind());
                    warn!("Client disconnected after {:?}", started.elapsed());
                }
                Err(e) => {
                    METRICS.record_request(e.kind());
                    if e.is_expected_halt() {
                        info!("Ideation stopped: {}", e);
                    } else {
                        error!("Ideation failed: {:?}", e);
                    }
                    let message = self.describe(&e);
                    if sink.emit(StreamEvent::Error { message }).await.is_err() {
                        debug!("Client gone before the error event");
                    }
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn execute(
        &self,
        query: &str,
        sink: &EventSink,
        started: Instant,
    ) -> Result<(), IdeationError> {
        sink.emit(StreamEvent::Start {
            message: format!("Starting research ideation: {}", query),
        })
        .await?;

        self.config.validate()?;
        let backends = self.factory.connect(&self.config)?;

        let language = Language::detect(query);
        info!("Detected language: {}", language.as_str());
        sink.emit(StreamEvent::Info {
            message: format!("Detected language: {}", language.display_name()),
        })
        .await?;

        let ctx = RequestContext {
            sink,
            deadline: started + self.deadline,
            language,
        };

        let pipeline = self.config.pipeline.clone();
        let generator = IdeaGenerator::new(backends.chat.clone(), language, pipeline.clone());
        let retrieval = RetrievalEngine::new(
            backends.search,
            backends.embedder,
            self.config.search.clone(),
        );
        let compiler = PlanCompiler::new(backends.chat, language, pipeline);

        let keywords = self
            .step(&ctx, 1, async {
                Ok::<_, IdeationError>(generator.extract_keywords(query).await?)
            })
            .await?;
        let joined = keywords.join(", ");
        self.result(
            &ctx,
            1,
            ctx.localized(format!("Keywords: {joined}"), format!("关键词：{joined}")),
        )
        .await?;

        let background = self
            .step(&ctx, 2, async {
                Ok::<_, IdeationError>(generator.expand_background(query, &keywords).await?)
            })
            .await?;
        self.result(
            &ctx,
            2,
            ctx.localized(
                format!("Research background:\n\n{background}"),
                format!("研究背景：\n\n{background}"),
            ),
        )
        .await?;

        let papers = self
            .step(&ctx, 3, async {
                Ok::<_, IdeationError>(retrieval.hybrid_retrieve(&background, &keywords).await)
            })
            .await?;
        if papers.is_empty() {
            return Err(IdeationError::NoPapers);
        }
        self.result(&ctx, 3, paper_summary(&ctx, &papers)).await?;

        let brainstorm = self
            .step(&ctx, 4, async {
                Ok::<_, IdeationError>(generator.generate_brainstorm(&background).await?)
            })
            .await?;
        let message = match brainstorm {
            Some(_) => ctx.localized("Brainstorm complete".into(), "头脑风暴完成".into()),
            None => ctx.localized("Brainstorm skipped".into(), "已跳过头脑风暴".into()),
        };
        self.result(&ctx, 4, message).await?;

        let inspirations = self
            .step(&ctx, 5, async {
                Ok::<_, IdeationError>(
                    generator
                        .generate_inspirations(&background, query, &papers)
                        .await?,
                )
            })
            .await?;
        let count = inspirations.paper_inspirations.len();
        let global = !inspirations.global_inspiration.trim().is_empty();
        self.result(
            &ctx,
            5,
            ctx.localized(
                format!(
                    "Generated {count} paper inspirations{}",
                    if global { " and a global inspiration" } else { "" }
                ),
                format!(
                    "生成了 {count} 条论文灵感{}",
                    if global { "和一条全局灵感" } else { "" }
                ),
            ),
        )
        .await?;

        let ideas = self
            .step(&ctx, 6, async {
                generator
                    .generate_ideas(&background, query, &inspirations, brainstorm.as_deref())
                    .await
            })
            .await?;
        if ideas.is_empty() {
            return Err(IdeationError::NoIdeas);
        }
        let count = ideas.len();
        self.result(
            &ctx,
            6,
            ctx.localized(
                format!("Generated {count} candidate ideas"),
                format!("生成了 {count} 个候选想法"),
            ),
        )
        .await?;

        let refined = self
            .step(&ctx, 7, async {
                supervise(
                    generator.iterative_refine(&background, &papers, ideas),
                    self.heartbeat,
                    sink,
                )
                .await
            })
            .await?;
        let count = refined.len();
        self.result(
            &ctx,
            7,
            ctx.localized(
                format!("{count} ideas after refinement"),
                format!("优化后共有 {count} 个想法"),
            ),
        )
        .await?;

        let (best_idea, score) = self
            .step(&ctx, 8, async {
                supervise(
                    generator.evaluate_and_select_best(&background, &refined),
                    self.heartbeat,
                    sink,
                )
                .await?
            })
            .await?;
        self.result(&ctx, 8, best_idea_summary(&ctx, &best_idea, &score))
            .await?;

        let plan = self
            .step(&ctx, 9, async {
                supervise(
                    compiler.generate_plan(
                        query,
                        &papers,
                        &best_idea,
                        &inspirations.global_inspiration,
                    ),
                    self.heartbeat,
                    sink,
                )
                .await?
            })
            .await?;
        self.result(
            &ctx,
            9,
            ctx.localized(
                format!("Research plan ready: {}", plan.title),
                format!("研究计划已完成：{}", plan.title),
            ),
        )
        .await?;

        sink.emit(StreamEvent::Final {
            message: plan.render(),
        })
        .await
    }

    /// Announce a step, run it under the request deadline and time it
    async fn step<T, F>(
        &self,
        ctx: &RequestContext<'_>,
        step: u8,
        work: F,
    ) -> Result<T, IdeationError>
    where
        F: Future<Output = Result<T, IdeationError>>,
    {
        let (name, en, zh) = STEPS[usize::from(step - 1)];
        info!("Step {}/{}: {}", step, TOTAL_STEPS, en);
        ctx.sink
            .emit(StreamEvent::Step {
                step,
                message: ctx.localized(en.to_string(), zh.to_string()),
            })
            .await?;

        let timer = Instant::now();
        let outcome = timeout_at(ctx.deadline, work).await;
        METRICS.record_step(name, timer.elapsed());

        match outcome {
            Ok(_) if Instant::now() > ctx.deadline => Err(self.deadline_exceeded()),
            Ok(result) => result,
            Err(_) => Err(self.deadline_exceeded()),
        }
    }

    async fn result(
        &self,
        ctx: &RequestContext<'_>,
        step: u8,
        message: String,
    ) -> Result<(), IdeationError> {
        ctx.sink.emit(StreamEvent::StepResult { step, message }).await
    }

    fn deadline_exceeded(&self) -> IdeationError {
        warn!("Request deadline of {:?} exceeded", self.deadline);
        IdeationError::DeadlineExceeded {
            secs: self.deadline.as_secs(),
        }
    }

    /// User-facing error text, with the cause chain in debug mode
    fn describe(&self, err: &IdeationError) -> String {
        use std::error::Error as _;

        let mut message = err.to_string();
        if self.config.server.debug {
            let mut source = err.source();
            while let Some(cause) = source {
                message.push_str(&format!("\n  caused by: {cause}"));
                source = cause.source();
            }
            message.push_str(&format!("\n\n{err:?}"));
        }
        message
    }
}

fn paper_summary(ctx: &RequestContext<'_>, papers: &[Paper]) -> String {
    let mut summary = ctx.localized(
        format!("Retrieved {} related papers:\n", papers.len()),
        format!("检索到 {} 篇相关论文：\n", papers.len()),
    );
    for (i, paper) in papers.iter().enumerate() {
        summary.push_str(&format!("\n{}. {}", i + 1, paper.title));
    }
    summary
}

fn best_idea_summary(ctx: &RequestContext<'_>, idea: &str, score: &Score) -> String {
    let idea = idea.replace("**", "");
    ctx.localized(
        format!(
            "Best idea:\n\n{}\n\nFeasibility: {:.2}, Novelty: {:.2}, Total: {:.2}",
            idea.trim(),
            score.feasibility(),
            score.novelty(),
            score.total()
        ),
        format!(
            "最佳想法：\n\n{}\n\n可行性：{:.2}，新颖性：{:.2}，总分：{:.2}",
            idea.trim(),
            score.feasibility(),
            score.novelty(),
            score.total()
        ),
    )
}
