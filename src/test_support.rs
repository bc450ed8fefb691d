//! Scripted model backend shared by unit tests

use crate::gateway::{ChatModel, CompletionRequest, GatewayError};
use crate::prompts::PromptId;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub(crate) enum Reply {
    Text(String),
    Fail,
    Error(GatewayError),
    Hang,
    Delay(Duration, String),
}

pub(crate) fn text(s: &str) -> Reply {
    Reply::Text(s.to_string())
}

type Handler = Box<dyn Fn(&CompletionRequest) -> Reply + Send + Sync>;

/// Answers each completion through a handler and records the prompt ids seen
pub(crate) struct ScriptedChat {
    handler: Handler,
    calls: Mutex<Vec<PromptId>>,
}

impl ScriptedChat {
    pub(crate) fn new<F>(handler: F) -> Arc<Self>
    where
        F: Fn(&CompletionRequest) -> Reply + Send + Sync + 'static,
    {
        Arc::new(Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn calls_for(&self, id: PromptId) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| **c == id).count()
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
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
            Reply::Error(e) => Err(e),
            Reply::Hang => std::future::pending().await,
            Reply::Delay(delay, text) => {
                tokio::time::sleep(delay).await;
                Ok(text)
            }
        }
    }
}
