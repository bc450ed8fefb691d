//! Pipeline-level error type

use crate::config::ConfigError;
use crate::gateway::GatewayError;

/// Errors surfaced by the ideation pipeline and its orchestrator
#[derive(Debug, thiserror::Error)]
pub enum IdeationError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Model gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("No related papers were retrieved")]
    NoPapers,

    #[error("No ideas were generated")]
    NoIdeas,

    #[error("{stage} did not finish within {secs}s")]
    StepTimeout { stage: &'static str, secs: u64 },

    #[error("Request exceeded the {secs}s deadline")]
    DeadlineExceeded { secs: u64 },

    #[error("Client disconnected")]
    ClientDisconnected,
}

impl IdeationError {
    /// Expected terminal conditions that end the stream without being a failure
    pub fn is_expected_halt(&self) -> bool {
        matches!(self, Self::NoPapers | Self::NoIdeas)
    }

    /// Errors that end the request even inside stages that otherwise degrade
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Config(_) => true,
            Self::Gateway(e) => e.is_fatal(),
            _ => false,
        }
    }

    /// Short label used for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Gateway(_) => "gateway",
            Self::NoPapers => "no_papers",
            Self::NoIdeas => "no_ideas",
            Self::StepTimeout { .. } => "step_timeout",
            Self::DeadlineExceeded { .. } => "deadline",
            Self::ClientDisconnected => "disconnected",
        }
    }
}

pub type Result<T> = std::result::Result<T, IdeationError>;
