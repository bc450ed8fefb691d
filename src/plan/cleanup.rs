//! Normalization of generated proposal text

use once_cell::sync::Lazy;
use regex::Regex;

/// Openers narrating the answer, ending at the first period or comma
static LEADING_OPENERS: Lazy<[Regex; 3]> = Lazy::new(|| {
    [
        Regex::new(
            r"(?i)^\s*(?:Of course|Certainly|I have thoroughly revised|I have revised|Based on|According to)[^.\n]*\.\s*",
        )
        .expect("opener pattern is valid"),
        Regex::new(r"(?i)^\s*(?:Of course|Certainly|I have thoroughly revised|I have revised)[^,.\n]*,\s*")
            .expect("opener pattern is valid"),
        Regex::new(r"(?i)^\s*(?:Let me|I will|I would like to|I should|I need to)[^.\n]*\.\s*")
            .expect("opener pattern is valid"),
    ]
});

static TRAILING_CLOSER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s*(?:I hope|I believe|I think|I trust|I am confident)[^.\n]*\.\s*$")
        .expect("closer pattern is valid")
});

static STARTS_WITH_HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:Research Background|1\.|#|研究背景)").expect("heading pattern is valid")
});

/// Tried in order when the text does not open with a heading
static SECTION_SEARCH: Lazy<[Regex; 3]> = Lazy::new(|| {
    [
        Regex::new(r"(?i)Research Background|Limitations of Current Work|Proposed Research Plan|研究背景")
            .expect("section pattern is valid"),
        Regex::new(r"(?m)^\d+\.\s*[A-Z][^.\n]*:").expect("numbered heading pattern is valid"),
        Regex::new(r"(?m)^#{1,2}\s+\S").expect("markdown heading pattern is valid"),
    ]
});

/// Strip meta-commentary around a proposal and start it at its first heading
pub fn clean_research_plan(text: &str) -> String {
    let mut cleaned = text.to_string();

    loop {
        let before = cleaned.len();
        for pattern in LEADING_OPENERS.iter() {
            cleaned = pattern.replace(&cleaned, "").into_owned();
        }
        if cleaned.len() == before {
            break;
        }
    }

    cleaned = TRAILING_CLOSER.replace(&cleaned, "").into_owned();

    let trimmed = cleaned.trim_start();
    if !STARTS_WITH_HEADING.is_match(trimmed) {
        if let Some(start) = SECTION_SEARCH
            .iter()
            .find_map(|pattern| pattern.find(trimmed).map(|m| m.start()))
        {
            return trimmed[start..].trim().to_string();
        }
    }

    trimmed.trim().to_string()
}

/// First line of a generated title, without surrounding quotes
pub fn clean_title(text: &str) -> String {
    let stripped = text
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim();
    let first_line = stripped.lines().next().unwrap_or_default();
    first_line
        .trim_start_matches('#')
        .trim()
        .trim_matches(|c| c == '"' || c == '\'' || c == '*')
        .trim()
        .to_string()
}
