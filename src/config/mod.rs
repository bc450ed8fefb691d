//! Service configuration
//!
//! Settings are resolved once at startup: serde defaults, then an optional
//! TOML file, then `IDEATION__SECTION__FIELD` environment variables, then the
//! flat variable names used by earlier deployments (`SCI_MODEL_BASE_URL`,
//! `MAX_IDEAS_GENERATE`, ...).

mod env;

use secrecy::SecretString;
use serde::Deserialize;
use std::time::Duration;

pub use env::apply_legacy_env;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("LLM endpoint is not configured (set SCI_MODEL_BASE_URL or LLM_API_ENDPOINT)")]
    MissingLlmEndpoint,

    #[error("LLM API key is not configured (set SCI_MODEL_API_KEY or LLM_API_KEY)")]
    MissingLlmApiKey,

    #[error("Invalid value for {key}: {value}")]
    Invalid { key: String, value: String },
}

/// Top-level service configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct IdeationConfig {
    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl IdeationConfig {
    /// Load configuration from an optional file plus the process environment
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let path = path
            .map(str::to_string)
            .or_else(|| std::env::var("IDEATION_CONFIG").ok())
            .unwrap_or_else(|| "config/ideation".to_string());

        let settings = config::Config::builder()
            .add_source(config::File::with_name(&path).required(false))
            .add_source(
                config::Environment::with_prefix("IDEATION")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.from_env()
    }

    /// Apply the flat environment variable names on top of the loaded values
    pub fn from_env(mut self) -> Result<Self, ConfigError> {
        apply_legacy_env(&mut self)?;
        Ok(self)
    }

    /// Check the settings every request needs before any backend is called
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.llm.endpoint.trim().is_empty() {
            return Err(ConfigError::MissingLlmEndpoint);
        }
        if self.llm.api_key.is_none() {
            return Err(ConfigError::MissingLlmApiKey);
        }
        Ok(())
    }
}

/// Chat completion backend
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    /// OpenAI-compatible base URL
    #[serde(default)]
    pub endpoint: String,

    #[serde(default)]
    pub api_key: Option<SecretString>,

    /// Model for short extraction tasks
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Model for reasoning-heavy tasks; required only when such a call is made
    #[serde(default)]
    pub reasoning_model: Option<String>,

    #[serde(default = "default_llm_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_llm_retries")]
    pub max_retries: usize,

    /// Fixed delay between completion attempts
    #[serde(default = "default_llm_retry_delay")]
    pub retry_delay_ms: u64,

    #[serde(default = "default_temperature")]
    pub default_temperature: f32,
}

fn default_llm_model() -> String { "deepseek-ai/DeepSeek-V3".to_string() }
fn default_llm_timeout() -> u64 { 120 }
fn default_llm_retries() -> usize { 3 }
fn default_llm_retry_delay() -> u64 { 500 }
fn default_temperature() -> f32 { 0.6 }

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: None,
            model: default_llm_model(),
            reasoning_model: None,
            request_timeout_secs: default_llm_timeout(),
            max_retries: default_llm_retries(),
            retry_delay_ms: default_llm_retry_delay(),
            default_temperature: default_temperature(),
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// Paper search backend
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_search_url")]
    pub base_url: String,

    #[serde(default)]
    pub api_key: Option<SecretString>,

    /// Result cap per ranking strategy
    #[serde(default = "default_papers_per_query")]
    pub max_papers_per_query: usize,

    /// Cap on the merged, reranked list
    #[serde(default = "default_total_papers")]
    pub max_total_papers: usize,

    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_search_retries")]
    pub max_retries: usize,

    /// Base backoff, doubled per attempt
    #[serde(default = "default_search_backoff")]
    pub retry_backoff_ms: u64,

    #[serde(default = "default_search_max_backoff")]
    pub max_backoff_ms: u64,
}

fn default_search_url() -> String { "http://api.semanticscholar.org/graph/v1".to_string() }
fn default_papers_per_query() -> usize { 3 }
fn default_total_papers() -> usize { 10 }
fn default_search_timeout() -> u64 { 30 }
fn default_search_retries() -> usize { 10 }
fn default_search_backoff() -> u64 { 1000 }
fn default_search_max_backoff() -> u64 { 5000 }

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: default_search_url(),
            api_key: None,
            max_papers_per_query: default_papers_per_query(),
            max_total_papers: default_total_papers(),
            timeout_secs: default_search_timeout(),
            max_retries: default_search_retries(),
            retry_backoff_ms: default_search_backoff(),
            max_backoff_ms: default_search_max_backoff(),
        }
    }
}

impl SearchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

/// Embedding backend
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingConfig {
    /// Falls back to the LLM endpoint when unset
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Falls back to the LLM key when unset
    #[serde(default)]
    pub api_key: Option<SecretString>,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Informational for API-hosted models
    #[serde(default = "default_embedding_device")]
    pub device: String,

    /// Output dimensionality, used for zero-vector substitution
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    #[serde(default = "default_embedding_retries")]
    pub max_retries: usize,

    #[serde(default = "default_embedding_backoff")]
    pub retry_backoff_ms: u64,

    #[serde(default = "default_embedding_max_backoff")]
    pub max_backoff_ms: u64,

    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
}

fn default_embedding_model() -> String { "jinaai/jina-embeddings-v3".to_string() }
fn default_embedding_device() -> String { "cpu".to_string() }
fn default_embedding_dimension() -> usize { 1024 }
fn default_embedding_retries() -> usize { 3 }
fn default_embedding_backoff() -> u64 { 1000 }
fn default_embedding_max_backoff() -> u64 { 8000 }
fn default_embedding_timeout() -> u64 { 30 }

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            model: default_embedding_model(),
            device: default_embedding_device(),
            dimension: default_embedding_dimension(),
            max_retries: default_embedding_retries(),
            retry_backoff_ms: default_embedding_backoff(),
            max_backoff_ms: default_embedding_max_backoff(),
            timeout_secs: default_embedding_timeout(),
        }
    }
}

impl EmbeddingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

/// Idea pipeline limits, pool sizes and timeouts
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_workers_inspiration")]
    pub max_workers_inspiration: usize,

    #[serde(default = "default_workers_optimization")]
    pub max_workers_optimization: usize,

    /// Number of top-ranked papers that get a per-paper inspiration
    #[serde(default = "default_inspiration_top_k")]
    pub inspiration_top_k: usize,

    #[serde(default = "default_inspiration_timeout")]
    pub inspiration_timeout_secs: u64,

    #[serde(default = "default_generation_timeout")]
    pub generation_timeout_secs: u64,

    /// Per-idea refinement budget
    #[serde(default = "default_optimization_timeout")]
    pub optimization_timeout_secs: u64,

    /// Fixed slack added to the aggregate refinement timeout
    #[serde(default = "default_refine_buffer")]
    pub refine_buffer_secs: u64,

    #[serde(default = "default_evaluation_timeout")]
    pub evaluation_timeout_secs: u64,

    #[serde(default = "default_title_timeout")]
    pub title_timeout_secs: u64,

    #[serde(default = "default_plan_timeout")]
    pub plan_timeout_secs: u64,

    #[serde(default = "default_ideas_generate")]
    pub max_ideas_generate: usize,

    #[serde(default = "default_ideas_optimize")]
    pub max_ideas_optimize: usize,

    /// Papers summarized in the idea critique prompt
    #[serde(default = "default_critique_papers")]
    pub critique_paper_count: usize,

    #[serde(default = "default_true")]
    pub enable_brainstorm: bool,

    #[serde(default = "default_true")]
    pub enable_plan_review: bool,
}

fn default_workers_inspiration() -> usize { 8 }
fn default_workers_optimization() -> usize { 3 }
fn default_inspiration_top_k() -> usize { 8 }
fn default_inspiration_timeout() -> u64 { 30 }
fn default_generation_timeout() -> u64 { 120 }
fn default_optimization_timeout() -> u64 { 60 }
fn default_refine_buffer() -> u64 { 60 }
fn default_evaluation_timeout() -> u64 { 60 }
fn default_title_timeout() -> u64 { 60 }
fn default_plan_timeout() -> u64 { 120 }
fn default_ideas_generate() -> usize { 3 }
fn default_ideas_optimize() -> usize { 2 }
fn default_critique_papers() -> usize { 5 }
fn default_true() -> bool { true }

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_workers_inspiration: default_workers_inspiration(),
            max_workers_optimization: default_workers_optimization(),
            inspiration_top_k: default_inspiration_top_k(),
            inspiration_timeout_secs: default_inspiration_timeout(),
            generation_timeout_secs: default_generation_timeout(),
            optimization_timeout_secs: default_optimization_timeout(),
            refine_buffer_secs: default_refine_buffer(),
            evaluation_timeout_secs: default_evaluation_timeout(),
            title_timeout_secs: default_title_timeout(),
            plan_timeout_secs: default_plan_timeout(),
            max_ideas_generate: default_ideas_generate(),
            max_ideas_optimize: default_ideas_optimize(),
            critique_paper_count: default_critique_papers(),
            enable_brainstorm: true,
            enable_plan_review: true,
        }
    }
}

impl PipelineConfig {
    pub fn inspiration_timeout(&self) -> Duration {
        Duration::from_secs(self.inspiration_timeout_secs)
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs)
    }

    /// Aggregate refinement budget: per-idea timeout times idea count plus a fixed buffer
    pub fn refine_timeout(&self, idea_count: usize) -> Duration {
        Duration::from_secs(
            self.optimization_timeout_secs * idea_count as u64 + self.refine_buffer_secs,
        )
    }

    pub fn evaluation_timeout(&self) -> Duration {
        Duration::from_secs(self.evaluation_timeout_secs)
    }

    pub fn title_timeout(&self) -> Duration {
        Duration::from_secs(self.title_timeout_secs)
    }

    pub fn plan_timeout(&self) -> Duration {
        Duration::from_secs(self.plan_timeout_secs)
    }
}

/// How stream events are framed on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StreamFormat {
    /// OpenAI-style `chat.completion.chunk` frames closed by `data: [DONE]`
    #[default]
    Plain,
    /// `{type, step?, message}` objects, stream closes without a sentinel
    Structured,
}

impl std::str::FromStr for StreamFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plain" | "text" => Ok(Self::Plain),
            "structured" | "json" => Ok(Self::Structured),
            other => Err(ConfigError::Invalid {
                key: "stream_format".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// HTTP server and streaming settings
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Wall-clock budget for one ideation request
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: u64,

    #[serde(default = "default_heartbeat_poll")]
    pub heartbeat_poll_millis: u64,

    #[serde(default)]
    pub stream_format: StreamFormat,

    #[serde(default = "default_max_body")]
    pub max_body_bytes: usize,

    /// Include error chains in stream error events
    #[serde(default)]
    pub debug: bool,
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 3000 }
fn default_request_timeout() -> u64 { 600 }
fn default_heartbeat_interval() -> u64 { 25 }
fn default_heartbeat_poll() -> u64 { 1000 }
fn default_max_body() -> usize { 64 * 1024 }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
            heartbeat_interval_secs: default_heartbeat_interval(),
            heartbeat_poll_millis: default_heartbeat_poll(),
            stream_format: StreamFormat::default(),
            max_body_bytes: default_max_body(),
            debug: false,
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn heartbeat_poll(&self) -> Duration {
        Duration::from_millis(self.heartbeat_poll_millis)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Log output settings
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `pretty` or `json`
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "pretty".to_string() }

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}
