//! End-to-end orchestrator runs against scripted backends

mod common;

use common::*;
use research_ideation::prompts::PromptId;
use research_ideation::stream::{EventSink, HeartbeatPolicy, Orchestrator, StreamEvent};
use std::sync::Arc;
use std::time::Duration;

fn orchestrator(chat: Arc<ScriptedChat>, search: Arc<StaticSearch>) -> Orchestrator {
    Orchestrator::new(
        Arc::new(test_config()),
        Arc::new(ScriptedFactory { chat, search }),
    )
    .with_heartbeat(HeartbeatPolicy::Disabled)
}

async fn run(orchestrator: &Orchestrator, query: &str) -> Vec<StreamEvent> {
    let (sink, rx) = EventSink::channel(64);
    orchestrator.run(query.to_string(), sink).await;
    drain(rx).await
}

fn steps_started(events: &[StreamEvent]) -> Vec<u8> {
    events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::Step { step, .. } => Some(*step),
            _ => None,
        })
        .collect()
}

fn step_result(events: &[StreamEvent], wanted: u8) -> String {
    events
        .iter()
        .find_map(|e| match e {
            StreamEvent::StepResult { step, message } if *step == wanted => Some(message.clone()),
            _ => None,
        })
        .unwrap_or_default()
}

#[tokio::test]
async fn test_full_pipeline_streams_every_step() {
    let chat = happy_chat();
    let orchestrator = orchestrator(chat.clone(), StaticSearch::new(sample_papers()));

    let events = run(&orchestrator, "sparse attention for scene classification").await;

    assert!(matches!(events[0], StreamEvent::Start { .. }));
    assert_eq!(
        events[1],
        StreamEvent::Info {
            message: "Detected language: English".to_string()
        }
    );
    assert_eq!(steps_started(&events), (1..=9).collect::<Vec<_>>());
    assert_eq!(events.len(), 2 + 9 * 2 + 1);
    assert!(!events.iter().any(|e| matches!(e, StreamEvent::Error { .. })));

    assert_eq!(step_result(&events, 1), "Keywords: sparse attention, scene graphs");
    assert!(step_result(&events, 3).starts_with("Retrieved 2 related papers"));
    assert_eq!(step_result(&events, 6), "Generated 3 candidate ideas");
    assert_eq!(step_result(&events, 7), "3 ideas after refinement");
    assert_eq!(
        step_result(&events, 8),
        "Best idea:\n\nIdea 2: wombat method, refined\n\nFeasibility: 4.50, Novelty: 4.00, Total: 8.50"
    );

    assert_eq!(
        events.last(),
        Some(&StreamEvent::Final {
            message: "Wombat Priors\n\n# Wombat Plan\nFinal body.".to_string()
        })
    );

    // Two ideas are refined, three are scored
    let calls = chat.calls();
    assert_eq!(calls.iter().filter(|c| **c == PromptId::RefineIdea).count(), 2);
    assert_eq!(calls.iter().filter(|c| **c == PromptId::EvaluateIdea).count(), 3);
}

#[tokio::test]
async fn test_chinese_query_gets_chinese_progress() {
    let orchestrator = orchestrator(happy_chat(), StaticSearch::new(sample_papers()));

    let events = run(&orchestrator, "基于大模型的时空预测方法研究").await;

    assert_eq!(
        events[2],
        StreamEvent::Step {
            step: 1,
            message: "提取关键词".to_string()
        }
    );
    assert!(matches!(events.last(), Some(StreamEvent::Final { .. })));
}

#[tokio::test]
async fn test_no_papers_stops_before_idea_generation() {
    let chat = happy_chat();
    let orchestrator = orchestrator(chat.clone(), StaticSearch::new(Vec::new()));

    let events = run(&orchestrator, "an obscure topic").await;

    assert_eq!(steps_started(&events), vec![1, 2, 3]);
    match events.last() {
        Some(StreamEvent::Error { message }) => {
            assert_eq!(message, "No related papers were retrieved")
        }
        other => panic!("expected an error event, got {:?}", other),
    }
    assert_eq!(
        chat.calls(),
        vec![PromptId::ExtractKeywords, PromptId::ExpandBackground]
    );
}

#[tokio::test]
async fn test_failed_keyword_step_is_fatal() {
    let chat = ScriptedChat::new(|_| Reply::Fail);
    let orchestrator = orchestrator(chat, StaticSearch::new(sample_papers()));

    let events = run(&orchestrator, "anything").await;

    assert_eq!(steps_started(&events), vec![1]);
    match events.last() {
        Some(StreamEvent::Error { message }) => assert!(message.contains("HTTP 500")),
        other => panic!("expected an error event, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_deadline_truncates_the_stream() {
    let chat = ScriptedChat::new(|req| match req.prompt_id {
        PromptId::ExtractKeywords => text("topic"),
        _ => Reply::Delay(Duration::from_secs(30), "late".to_string()),
    });
    let orchestrator = orchestrator(chat.clone(), StaticSearch::new(sample_papers()))
        .with_deadline(Duration::from_secs(10));

    let events = run(&orchestrator, "slow topic").await;

    assert_eq!(steps_started(&events), vec![1, 2]);
    assert_eq!(
        events.last(),
        Some(&StreamEvent::Error {
            message: "Request exceeded the 10s deadline".to_string()
        })
    );
    assert_eq!(chat.calls().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_long_plan_step_emits_heartbeats() {
    let chat = ScriptedChat::new(|req| match req.prompt_id {
        PromptId::ResearchPlan => {
            Reply::Delay(Duration::from_secs(80), "# Slow Plan\nBody.".to_string())
        }
        PromptId::CritiquePlan | PromptId::RefinePlan => Reply::Fail,
        _ => happy_reply(req),
    });
    let orchestrator = orchestrator(chat, StaticSearch::new(sample_papers())).with_heartbeat(
        HeartbeatPolicy::Enabled {
            interval: Duration::from_secs(25),
            poll: Duration::from_secs(1),
        },
    );

    let events = run(&orchestrator, "sparse attention").await;

    let plan_start = events
        .iter()
        .position(|e| matches!(e, StreamEvent::Step { step: 9, .. }))
        .unwrap();
    let plan_done = events
        .iter()
        .position(|e| matches!(e, StreamEvent::StepResult { step: 9, .. }))
        .unwrap();
    let beats: Vec<u64> = events[plan_start..plan_done]
        .iter()
        .filter_map(|e| match e {
            StreamEvent::Heartbeat { elapsed_secs } => Some(*elapsed_secs),
            _ => None,
        })
        .collect();

    assert_eq!(beats, vec![25, 50, 75]);
    assert_eq!(
        events.last(),
        Some(&StreamEvent::Final {
            message: "Wombat Priors\n\n# Slow Plan\nBody.".to_string()
        })
    );
}
