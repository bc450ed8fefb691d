//! Idea scores and their extraction from evaluation responses

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

const MAX_SUBSCORE: f64 = 5.0;
const DEFAULT_SUBSCORE: f64 = 5.0;

/// Feasibility and novelty on a 0-5 scale. `total` is always their sum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Score {
    feasibility: f64,
    novelty: f64,
    total: f64,
}

impl Score {
    pub fn new(feasibility: f64, novelty: f64) -> Self {
        let feasibility = clamp(feasibility);
        let novelty = clamp(novelty);
        Self {
            feasibility,
            novelty,
            total: feasibility + novelty,
        }
    }

    /// Score used when evaluation fails or times out
    pub fn default_fallback() -> Self {
        Self::new(DEFAULT_SUBSCORE, DEFAULT_SUBSCORE)
    }

    pub fn feasibility(&self) -> f64 {
        self.feasibility
    }

    pub fn novelty(&self) -> f64 {
        self.novelty
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    /// Parse an evaluation response.
    ///
    /// A JSON object `{"feasibility": x, "novelty": y}` is preferred; labelled
    /// lines such as `Feasibility: 4.2/5` are the fallback. A sub-score found
    /// by neither is taken as 5.0.
    pub fn parse(response: &str) -> Self {
        let from_json = parse_json(response);
        let feasibility = from_json
            .and_then(|(f, _)| f)
            .or_else(|| capture_number(&FEASIBILITY, response))
            .unwrap_or(DEFAULT_SUBSCORE);
        let novelty = from_json
            .and_then(|(_, n)| n)
            .or_else(|| capture_number(&NOVELTY, response))
            .unwrap_or(DEFAULT_SUBSCORE);
        Self::new(feasibility, novelty)
    }
}

fn clamp(value: f64) -> f64 {
    if value.is_nan() {
        DEFAULT_SUBSCORE
    } else {
        value.clamp(0.0, MAX_SUBSCORE)
    }
}

static JSON_OBJECT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{[^{}]*\}").expect("json object pattern is valid"));

static FEASIBILITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:feasibility|可行性)\s*[:：]\s*\**\s*(\d+(?:\.\d+)?)")
        .expect("feasibility pattern is valid")
});

static NOVELTY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:novelty|创新性|新颖性)\s*[:：]\s*\**\s*(\d+(?:\.\d+)?)")
        .expect("novelty pattern is valid")
});

/// First JSON object carrying at least one of the two keys
fn parse_json(response: &str) -> Option<(Option<f64>, Option<f64>)> {
    JSON_OBJECT.find_iter(response).find_map(|m| {
        let value: serde_json::Value = serde_json::from_str(m.as_str()).ok()?;
        let feasibility = json_number(&value, "feasibility");
        let novelty = json_number(&value, "novelty");
        (feasibility.is_some() || novelty.is_some()).then_some((feasibility, novelty))
    })
}

fn json_number(value: &serde_json::Value, key: &str) -> Option<f64> {
    match value.get(key)? {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn capture_number(pattern: &Regex, text: &str) -> Option<f64> {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
