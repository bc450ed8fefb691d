//! Scripted backends shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use research_ideation::config::IdeationConfig;
use research_ideation::gateway::{ChatModel, CompletionRequest, GatewayError};
use research_ideation::prompts::PromptId;
use research_ideation::retrieval::{Paper, PaperSearch, SearchError, SearchStrategy};
use research_ideation::stream::{BackendFactory, Backends, StreamEvent};
use research_ideation::IdeationError;
use secrecy::SecretString;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::Receiver;

pub enum Reply {
    Text(String),
    Fail,
    Delay(Duration, String),
}

pub fn text(s: &str) -> Reply {
    Reply::Text(s.to_string())
}

type Handler = Box<dyn Fn(&CompletionRequest) -> Reply + Send + Sync>;

pub struct ScriptedChat {
    handler: Handler,
    calls: Mutex<Vec<PromptId>>,
}

impl ScriptedChat {
    pub fn new<F>(handler: F) -> Arc<Self>
    where
        F: Fn(&CompletionRequest) -> Reply + Send + Sync + 'static,
    {
        Arc::new(Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<PromptId> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedChat {
    async fn complete(&self, request: CompletionRequest) -> Result<String, GatewayError> {
        self.calls.lock().unwrap().push(request.prompt_id);
        match (self.handler)(&request) {
            Reply::Text(text) => Ok(text),
            Reply::Fail => Err(GatewayError::Upstream {
                status: 500,
                body: "scripted failure".to_string(),
            }),
            Reply::Delay(delay, text) => {
                tokio::time::sleep(delay).await;
                Ok(text)
            }
        }
    }
}

/// Returns the same papers for every strategy
pub struct StaticSearch {
    papers: Vec<Paper>,
}

impl StaticSearch {
    pub fn new(papers: Vec<Paper>) -> Arc<Self> {
        Arc::new(Self { papers })
    }
}

#[async_trait]
impl PaperSearch for StaticSearch {
    async fn search(
        &self,
        _query: &str,
        _strategy: SearchStrategy,
        limit: usize,
    ) -> Result<Vec<Paper>, SearchError> {
        Ok(self.papers.iter().take(limit).cloned().collect())
    }
}

pub struct ScriptedFactory {
    pub chat: Arc<ScriptedChat>,
    pub search: Arc<StaticSearch>,
}

impl BackendFactory for ScriptedFactory {
    fn connect(&self, _config: &IdeationConfig) -> Result<Backends, IdeationError> {
        Ok(Backends {
            chat: self.chat.clone(),
            embedder: None,
            search: self.search.clone(),
        })
    }
}

/// Valid configuration with fast search retries
pub fn test_config() -> IdeationConfig {
    let mut config = IdeationConfig::default();
    config.llm.endpoint = "http://llm.invalid".to_string();
    config.llm.api_key = Some(SecretString::new("test-key".to_string()));
    config.llm.reasoning_model = Some("reasoner".to_string());
    config.search.max_retries = 1;
    config
}

pub fn sample_papers() -> Vec<Paper> {
    vec![
        Paper::new(Some("p1"), "Sparse Attention Priors", Some("Attention with priors.")),
        Paper::new(Some("p2"), "Graph Scene Models", Some("Scenes as graphs.")),
    ]
}

pub async fn drain(mut rx: Receiver<StreamEvent>) -> Vec<StreamEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

/// Answers every prompt of a successful run.
///
/// Ideas are tagged quokka, wombat and numbat; wombat scores highest.
pub fn happy_reply(req: &CompletionRequest) -> Reply {
    match req.prompt_id {
        PromptId::ExtractKeywords => text("sparse attention, scene graphs"),
        PromptId::ExpandBackground => text("Expanded background."),
        PromptId::Brainstorm => text("Brainstorm notes."),
        PromptId::PaperInspiration => text("A paper inspiration."),
        PromptId::GlobalInspiration => text("A global inspiration."),
        PromptId::IdeasFromInspirations => {
            text("**Idea 1**: quokka method\n\n**Idea 2**: wombat method")
        }
        PromptId::IdeasFromGlobalInspiration => text("**Idea 1**: numbat method"),
        PromptId::IntegrateBrainstorm => text(
            "**Idea 1**: quokka method\n\n**Idea 2**: wombat method\n\n**Idea 3**: numbat method",
        ),
        PromptId::CritiqueIdea => text("Needs a sharper evaluation."),
        PromptId::RefineIdea if req.prompt.contains("quokka") => {
            text("**Idea 1**: quokka method, refined")
        }
        PromptId::RefineIdea => text("**Idea 2**: wombat method, refined"),
        PromptId::EvaluateIdea if req.prompt.contains("wombat") => {
            text(r#"{"feasibility": 4.5, "novelty": 4.0}"#)
        }
        PromptId::EvaluateIdea => text(r#"{"feasibility": 3.0, "novelty": 3.0}"#),
        PromptId::PlanTitle => text("\"Wombat Priors\""),
        PromptId::ResearchPlan => text("Certainly, here it is.\n# Draft\nBody."),
        PromptId::CritiquePlan => text("Tighten the method section."),
        PromptId::RefinePlan => text("# Wombat Plan\nFinal body."),
    }
}

pub fn happy_chat() -> Arc<ScriptedChat> {
    ScriptedChat::new(happy_reply)
}
