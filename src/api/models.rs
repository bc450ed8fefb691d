//! Request and error bodies of the HTTP API

use crate::config::StreamFormat;
use serde::{Deserialize, Serialize};

/// POST /ideation body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IdeationRequest {
    #[serde(default)]
    pub query: Option<String>,

    /// Overrides the configured framing for this request
    #[serde(default)]
    pub format: Option<StreamFormat>,
}

impl IdeationRequest {
    /// Trimmed query, `None` when missing or blank
    pub fn query(&self) -> Option<&str> {
        self.query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
    }
}

/// JSON error body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

pub mod error_codes {
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const INVALID_BODY: &str = "INVALID_BODY";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_query_trimmed() {
        let request: IdeationRequest =
            serde_json::from_str(r#"{"query": "  sparse attention  "}"#).unwrap();
        assert_eq!(request.query(), Some("sparse attention"));
        assert!(request.format.is_none());
    }

    #[test]
    fn test_blank_or_missing_query() {
        let blank: IdeationRequest = serde_json::from_str(r#"{"query": "   "}"#).unwrap();
        assert_eq!(blank.query(), None);

        let missing: IdeationRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(missing.query(), None);
    }

    #[test]
    fn test_format_override() {
        let request: IdeationRequest =
            serde_json::from_str(r#"{"query": "q", "format": "structured"}"#).unwrap();
        assert_eq!(request.format, Some(StreamFormat::Structured));
    }
}
