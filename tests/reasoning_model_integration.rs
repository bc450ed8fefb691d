//! A deployment without a reasoning model, driven through the real HTTP client

mod common;

use common::*;
use research_ideation::config::IdeationConfig;
use research_ideation::gateway::LlmClient;
use research_ideation::stream::{
    BackendFactory, Backends, EventSink, HeartbeatPolicy, Orchestrator, StreamEvent,
};
use research_ideation::IdeationError;
use std::sync::Arc;

/// Real chat client from the config, canned papers
struct HttpChatFactory;

impl BackendFactory for HttpChatFactory {
    fn connect(&self, config: &IdeationConfig) -> Result<Backends, IdeationError> {
        Ok(Backends {
            chat: Arc::new(LlmClient::new(&config.llm)?),
            embedder: None,
            search: StaticSearch::new(sample_papers()),
        })
    }
}

#[tokio::test]
async fn test_missing_reasoning_model_fails_at_first_reasoning_step() {
    let mut server = mockito::Server::new_async().await;
    let completions = server
        .mock("POST", "/v1/chat/completions")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"choices":[{"message":{"content":"sparse attention"}}]}"#)
        .expect(2)
        .create_async()
        .await;

    let mut config = test_config();
    config.llm.endpoint = server.url();
    config.llm.reasoning_model = None;

    let orchestrator = Orchestrator::new(Arc::new(config), Arc::new(HttpChatFactory))
        .with_heartbeat(HeartbeatPolicy::Disabled);
    let (sink, rx) = EventSink::channel(64);
    orchestrator
        .run("sparse attention for long documents".to_string(), sink)
        .await;
    let events = drain(rx).await;

    let steps: Vec<u8> = events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::Step { step, .. } => Some(*step),
            _ => None,
        })
        .collect();
    assert_eq!(steps, vec![1, 2, 3, 4]);

    match events.last() {
        Some(StreamEvent::Error { message }) => {
            assert!(message.contains("Reasoning model is not configured"), "{message}");
            assert!(!message.contains("No ideas"));
        }
        other => panic!("expected a terminal error, got {other:?}"),
    }
    assert!(!events.iter().any(|e| matches!(e, StreamEvent::Final { .. })));

    // keywords and background only; the reasoning call never leaves the process
    completions.assert_async().await;
}
