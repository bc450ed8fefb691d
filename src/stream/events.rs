//! Progress events and their SSE framing

use crate::config::StreamFormat;
use crate::error::IdeationError;
use axum::response::sse::Event;
use serde::Serialize;
use serde_json::json;
use tokio::sync::mpsc::{self, error::TrySendError};

/// Sentinel closing a plain-text stream
pub const DONE_SENTINEL: &str = "[DONE]";

/// Number of pipeline steps after language detection
pub const TOTAL_STEPS: u8 = 9;

/// One progress event emitted by the orchestrator
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Start { message: String },
    Info { message: String },
    Step { step: u8, message: String },
    StepResult { step: u8, message: String },
    Error { message: String },
    Final { message: String },
    Heartbeat { elapsed_secs: u64 },
}

impl StreamEvent {
    pub fn is_heartbeat(&self) -> bool {
        matches!(self, Self::Heartbeat { .. })
    }

    /// Markdown rendering used by the plain-text framing
    pub fn to_text(&self) -> String {
        match self {
            Self::Start { message } | Self::Info { message } => format!("{message}\n\n"),
            Self::Step { step, message } => {
                format!("### Step {step}/{TOTAL_STEPS}: {message}\n\n")
            }
            Self::StepResult { message, .. } => format!("{message}\n\n"),
            Self::Error { message } => format!("**Error:** {message}\n\n"),
            Self::Final { message } => format!("---\n\n{message}\n"),
            Self::Heartbeat { elapsed_secs } => format!("heartbeat {elapsed_secs}s"),
        }
    }
}

/// Wire framing of the event stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventFraming {
    /// OpenAI-style completion chunks terminated by `data: [DONE]`.
    /// Heartbeats travel as SSE comments.
    PlainText,
    /// One JSON object per event; the stream simply closes.
    Structured,
}

impl From<StreamFormat> for EventFraming {
    fn from(format: StreamFormat) -> Self {
        match format {
            StreamFormat::Plain => Self::PlainText,
            StreamFormat::Structured => Self::Structured,
        }
    }
}

impl EventFraming {
    /// The `data:` payload for an event, `None` for plain-text heartbeats
    pub fn payload(&self, event: &StreamEvent) -> Option<String> {
        match self {
            Self::PlainText if event.is_heartbeat() => None,
            Self::PlainText => Some(plain_chunk(&event.to_text())),
            Self::Structured => Some(serde_json::to_string(event).unwrap_or_default()),
        }
    }

    pub fn encode(&self, event: &StreamEvent) -> Event {
        match self.payload(event) {
            Some(data) => Event::default().data(data),
            None => Event::default().comment(event.to_text()),
        }
    }

    /// Closing frame, if the framing has one
    pub fn terminator(&self) -> Option<Event> {
        match self {
            Self::PlainText => Some(Event::default().data(DONE_SENTINEL)),
            Self::Structured => None,
        }
    }
}

/// Wrap text in a chat-completion chunk
pub fn plain_chunk(content: &str) -> String {
    json!({
        "object": "chat.completion.chunk",
        "choices": [{ "index": 0, "delta": { "content": content } }]
    })
    .to_string()
}

/// Sending half of a request's event stream
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::Sender<StreamEvent>,
}

impl EventSink {
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<StreamEvent>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self { tx }, rx)
    }

    /// Fails once the receiving side is gone
    pub async fn emit(&self, event: StreamEvent) -> Result<(), IdeationError> {
        self.tx
            .send(event)
            .await
            .map_err(|_| IdeationError::ClientDisconnected)
    }

    /// Send without waiting. `Ok(false)` means the buffer was full and the
    /// event was dropped.
    pub fn try_emit(&self, event: StreamEvent) -> Result<bool, IdeationError> {
        match self.tx.try_send(event) {
            Ok(()) => Ok(true),
            Err(TrySendError::Full(_)) => Ok(false),
            Err(TrySendError::Closed(_)) => Err(IdeationError::ClientDisconnected),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
