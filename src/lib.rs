//! Research ideation service
//!
//! Turns a short research query into a structured research proposal:
//! keywords, an expanded background, hybrid paper retrieval, inspirations,
//! candidate ideas that are critiqued, refined and scored, and finally a
//! reviewed research plan. Progress is streamed to the client over SSE.

pub mod api;
pub mod config;
pub mod error;
pub mod gateway;
pub mod ideas;
pub mod language;
pub mod metrics;
pub mod plan;
pub mod prompts;
pub mod retrieval;
pub mod stream;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::IdeationConfig;
pub use error::{IdeationError, Result};
pub use language::Language;
pub use stream::{Orchestrator, StreamEvent};
