//! Best-effort extraction of `Idea <n>` blocks from model output.
//!
//! Marker patterns are tried in order of precedence and the first one that
//! matches anything wins:
//!
//! 1. bold markers, `**Idea 1**:`
//! 2. line-leading markers, `Idea 1:` or `*Idea 1*.` at the start of a line
//! 3. loose markers, `Idea 1:` anywhere
//!
//! Every extracted idea is normalized to `**Idea <n>**: <body>`. Leading
//! punctuation is stripped from each body, and a body with no word
//! character at all (`**Idea 3**: ...`) is dropped. Text with no markers is
//! returned whole as a single idea. When a pass leaves one
//! block that still holds several markers, the block is split again.

use once_cell::sync::Lazy;
use regex::Regex;

static BOLD_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*Idea\s+(\d+)\*\*:?").expect("bold marker pattern is valid"));

static LINE_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*\*?Idea\s+(\d+)\*?\s*[:.]").expect("line marker pattern is valid")
});

static LOOSE_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Idea\s+(\d+)[:.]").expect("loose marker pattern is valid"));

/// Any marker followed by a separator, used to split compound blocks
static ANY_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\*{0,2}Idea\s+(\d+)\*{0,2}\s*[:.]").expect("compound marker pattern is valid")
});

/// Split model output into individual ideas
pub fn extract_ideas(text: &str) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let ideas = [&*BOLD_MARKER, &*LINE_MARKER, &*LOOSE_MARKER]
        .into_iter()
        .map(|pattern| split_on(pattern, text))
        .find(|ideas| !ideas.is_empty())
        .unwrap_or_else(|| vec![text.to_string()]);

    if let [single] = ideas.as_slice() {
        if ANY_MARKER.find_iter(single).count() > 1 {
            let resplit = split_on(&ANY_MARKER, single);
            if resplit.len() > 1 {
                return resplit;
            }
        }
    }

    ideas
}

/// First idea in the text, or the trimmed text itself
pub fn extract_single_idea(text: &str) -> String {
    extract_ideas(text)
        .into_iter()
        .next()
        .unwrap_or_else(|| text.trim().to_string())
}

fn split_on(pattern: &Regex, text: &str) -> Vec<String> {
    let markers: Vec<(usize, usize, &str)> = pattern
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let number = caps.get(1)?.as_str();
            Some((whole.start(), whole.end(), number))
        })
        .collect();

    markers
        .iter()
        .enumerate()
        .filter_map(|(i, &(_, body_start, number))| {
            let body_end = markers.get(i + 1).map_or(text.len(), |next| next.0);
            let body = text[body_start..body_end]
                .trim()
                .trim_start_matches(|c: char| !is_word_char(c));
            (!body.is_empty()).then(|| format!("**Idea {}**: {}", number, body))
        })
        .collect()
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
