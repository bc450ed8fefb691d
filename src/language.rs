//! Query language detection

use serde::{Deserialize, Serialize};

/// Language every prompt of a request is rendered in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Zh,
    #[default]
    En,
}

impl Language {
    /// Detect the language of a query.
    ///
    /// Counts CJK unified ideographs against all letters (ASCII letters plus
    /// ideographs). More than 30% ideographs means Chinese; exactly 30% does not.
    pub fn detect(text: &str) -> Self {
        let mut cjk = 0usize;
        let mut letters = 0usize;

        for ch in text.chars() {
            if is_cjk(ch) {
                cjk += 1;
                letters += 1;
            } else if ch.is_ascii_alphabetic() {
                letters += 1;
            }
        }

        if letters == 0 {
            return Self::En;
        }

        // cjk / letters > 0.3 without floating point
        if cjk * 10 > letters * 3 {
            Self::Zh
        } else {
            Self::En
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Zh => "zh",
            Self::En => "en",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Zh => "中文",
            Self::En => "English",
        }
    }
}

fn is_cjk(ch: char) -> bool {
    ('\u{4e00}'..='\u{9fff}').contains(&ch)
}
