//! Flat environment variable overrides

use super::{ConfigError, IdeationConfig};
use secrecy::SecretString;
use std::str::FromStr;

/// Apply the flat variable names from the process environment
pub fn apply_legacy_env(config: &mut IdeationConfig) -> Result<(), ConfigError> {
    apply_env_with(config, |key| std::env::var(key).ok())
}

/// Apply overrides from an arbitrary lookup. The first name listed for a
/// setting wins when several are present.
pub fn apply_env_with<F>(config: &mut IdeationConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let first = |keys: &[&str]| -> Option<String> {
        keys.iter()
            .filter_map(|key| lookup(key))
            .map(|val| val.trim().to_string())
            .find(|val| !val.is_empty())
    };

    // LLM
    if let Some(val) = first(&["SCI_MODEL_BASE_URL", "LLM_API_ENDPOINT"]) {
        config.llm.endpoint = val;
    }
    if let Some(val) = first(&["SCI_MODEL_API_KEY", "LLM_API_KEY"]) {
        config.llm.api_key = Some(SecretString::new(val));
    }
    if let Some(val) = first(&["SCI_LLM_MODEL", "LLM_MODEL"]) {
        config.llm.model = val;
    }
    if let Some(val) = first(&["SCI_LLM_REASONING_MODEL"]) {
        config.llm.reasoning_model = Some(val);
    }
    if let Some(val) = first(&["LLM_REQUEST_TIMEOUT"]) {
        config.llm.request_timeout_secs = parse("LLM_REQUEST_TIMEOUT", &val)?;
    }
    if let Some(val) = first(&["DEFAULT_TEMPERATURE"]) {
        config.llm.default_temperature = parse("DEFAULT_TEMPERATURE", &val)?;
    }
    if let Some(val) = first(&["MAX_RETRIES"]) {
        config.llm.max_retries = parse("MAX_RETRIES", &val)?;
    }

    // Paper search
    if let Some(val) = first(&["MAX_PAPERS_PER_QUERY"]) {
        config.search.max_papers_per_query = parse("MAX_PAPERS_PER_QUERY", &val)?;
    }
    if let Some(val) = first(&["MAX_TOTAL_PAPERS"]) {
        config.search.max_total_papers = parse("MAX_TOTAL_PAPERS", &val)?;
    }
    if let Some(val) = first(&["SEMANTIC_SCHOLAR_TIMEOUT"]) {
        config.search.timeout_secs = parse("SEMANTIC_SCHOLAR_TIMEOUT", &val)?;
    }
    if let Some(val) = first(&["SEMANTIC_SCHOLAR_MAX_RETRIES"]) {
        config.search.max_retries = parse("SEMANTIC_SCHOLAR_MAX_RETRIES", &val)?;
    }
    if let Some(val) = first(&["SEMANTIC_SCHOLAR_API_KEY"]) {
        config.search.api_key = Some(SecretString::new(val));
    }

    // Embedding
    if let Some(val) = first(&["SCI_EMBEDDING_BASE_URL"]) {
        config.embedding.endpoint = Some(val);
    }
    if let Some(val) = first(&["SCI_EMBEDDING_API_KEY"]) {
        config.embedding.api_key = Some(SecretString::new(val));
    }
    if let Some(val) = first(&["SCI_EMBEDDING_MODEL", "EMBEDDING_MODEL_NAME"]) {
        config.embedding.model = val;
    }
    if let Some(val) = first(&["EMBEDDING_DEVICE"]) {
        config.embedding.device = val;
    }

    // Pipeline
    if let Some(val) = first(&["MAX_WORKERS_INSPIRATION"]) {
        config.pipeline.max_workers_inspiration = parse("MAX_WORKERS_INSPIRATION", &val)?;
    }
    if let Some(val) = first(&["MAX_WORKERS_OPTIMIZATION"]) {
        config.pipeline.max_workers_optimization = parse("MAX_WORKERS_OPTIMIZATION", &val)?;
    }
    if let Some(val) = first(&["INSPIRATION_TIMEOUT"]) {
        config.pipeline.inspiration_timeout_secs = parse("INSPIRATION_TIMEOUT", &val)?;
    }
    if let Some(val) = first(&["OPTIMIZATION_TIMEOUT"]) {
        config.pipeline.optimization_timeout_secs = parse("OPTIMIZATION_TIMEOUT", &val)?;
    }
    if let Some(val) = first(&["MAX_IDEAS_GENERATE"]) {
        config.pipeline.max_ideas_generate = parse("MAX_IDEAS_GENERATE", &val)?;
    }
    if let Some(val) = first(&["MAX_IDEAS_OPTIMIZE"]) {
        config.pipeline.max_ideas_optimize = parse("MAX_IDEAS_OPTIMIZE", &val)?;
    }
    if let Some(val) = first(&["ENABLE_BRAINSTORM"]) {
        config.pipeline.enable_brainstorm = parse_bool(&val);
    }
    if let Some(val) = first(&["ENABLE_PLAN_REVIEW"]) {
        config.pipeline.enable_plan_review = parse_bool(&val);
    }

    // Server
    if let Some(val) = first(&["DEBUG"]) {
        config.server.debug = parse_bool(&val);
    }
    if let Some(val) = first(&["PORT"]) {
        config.server.port = parse("PORT", &val)?;
    }

    Ok(())
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::Invalid {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_llm_overrides() {
        let mut config = IdeationConfig::default();
        apply_env_with(
            &mut config,
            lookup(&[
                ("LLM_API_ENDPOINT", "http://fallback"),
                ("SCI_MODEL_BASE_URL", "http://primary"),
                ("LLM_API_KEY", "secret"),
                ("SCI_LLM_REASONING_MODEL", "deepseek-r1"),
            ]),
        )
        .unwrap();

        assert_eq!(config.llm.endpoint, "http://primary");
        assert_eq!(config.llm.api_key.as_ref().unwrap().expose_secret(), "secret");
        assert_eq!(config.llm.reasoning_model.as_deref(), Some("deepseek-r1"));
    }

    #[test]
    fn test_pipeline_overrides() {
        let mut config = IdeationConfig::default();
        apply_env_with(
            &mut config,
            lookup(&[
                ("MAX_IDEAS_GENERATE", "5"),
                ("MAX_WORKERS_OPTIMIZATION", "1"),
                ("ENABLE_BRAINSTORM", "false"),
                ("ENABLE_PLAN_REVIEW", "0"),
                ("DEBUG", "True"),
                ("PORT", "8080"),
            ]),
        )
        .unwrap();

        assert_eq!(config.pipeline.max_ideas_generate, 5);
        assert_eq!(config.pipeline.max_workers_optimization, 1);
        assert!(!config.pipeline.enable_brainstorm);
        assert!(!config.pipeline.enable_plan_review);
        assert!(config.server.debug);
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_empty_values_ignored() {
        let mut config = IdeationConfig::default();
        apply_env_with(&mut config, lookup(&[("SCI_LLM_MODEL", "  ")])).unwrap();
        assert_eq!(config.llm.model, "deepseek-ai/DeepSeek-V3");
    }

    #[test]
    fn test_invalid_number_rejected() {
        let mut config = IdeationConfig::default();
        let err = apply_env_with(&mut config, lookup(&[("MAX_TOTAL_PAPERS", "ten")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref key, .. } if key == "MAX_TOTAL_PAPERS"));
    }
}
