//! Streaming orchestration of ideation requests
//!
//! The [`Orchestrator`] runs the pipeline and pushes [`StreamEvent`]s into an
//! [`EventSink`]. The HTTP layer turns them into SSE frames with an
//! [`EventFraming`] chosen per request.

pub mod events;
pub mod heartbeat;
pub mod orchestrator;

pub use events::{plain_chunk, EventFraming, EventSink, StreamEvent, DONE_SENTINEL, TOTAL_STEPS};
pub use heartbeat::{supervise, HeartbeatPolicy};
pub use orchestrator::{BackendFactory, Backends, HttpBackendFactory, Orchestrator};
