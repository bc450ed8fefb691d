//! Prompt catalog
//!
//! Templates are loaded once into a read-only map; rendering is a pure
//! function of template id, language and variables.

mod templates;

use crate::language::Language;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashMap;

/// Identifies one prompt template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptId {
    ExtractKeywords,
    ExpandBackground,
    Brainstorm,
    PaperInspiration,
    GlobalInspiration,
    IdeasFromInspirations,
    IdeasFromGlobalInspiration,
    IntegrateBrainstorm,
    CritiqueIdea,
    RefineIdea,
    EvaluateIdea,
    ResearchPlan,
    CritiquePlan,
    RefinePlan,
    PlanTitle,
}

impl PromptId {
    pub const ALL: [PromptId; 15] = [
        Self::ExtractKeywords,
        Self::ExpandBackground,
        Self::Brainstorm,
        Self::PaperInspiration,
        Self::GlobalInspiration,
        Self::IdeasFromInspirations,
        Self::IdeasFromGlobalInspiration,
        Self::IntegrateBrainstorm,
        Self::CritiqueIdea,
        Self::RefineIdea,
        Self::EvaluateIdea,
        Self::ResearchPlan,
        Self::CritiquePlan,
        Self::RefinePlan,
        Self::PlanTitle,
    ];

    /// Stable label for logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExtractKeywords => "extract_keywords",
            Self::ExpandBackground => "expand_background",
            Self::Brainstorm => "brainstorm",
            Self::PaperInspiration => "paper_inspiration",
            Self::GlobalInspiration => "global_inspiration",
            Self::IdeasFromInspirations => "ideas_from_inspirations",
            Self::IdeasFromGlobalInspiration => "ideas_from_global_inspiration",
            Self::IntegrateBrainstorm => "integrate_brainstorm",
            Self::CritiqueIdea => "critique_idea",
            Self::RefineIdea => "refine_idea",
            Self::EvaluateIdea => "evaluate_idea",
            Self::ResearchPlan => "research_plan",
            Self::CritiquePlan => "critique_plan",
            Self::RefinePlan => "refine_plan",
            Self::PlanTitle => "plan_title",
        }
    }
}

impl std::fmt::Display for PromptId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

const ZH_INSTRUCTION: &str = "请使用中文回答。所有输出内容都必须是中文。\n\n";

static TEMPLATES: Lazy<HashMap<PromptId, &'static str>> = Lazy::new(|| {
    use templates::*;
    HashMap::from([
        (PromptId::ExtractKeywords, EXTRACT_KEYWORDS),
        (PromptId::ExpandBackground, EXPAND_BACKGROUND),
        (PromptId::Brainstorm, BRAINSTORM),
        (PromptId::PaperInspiration, PAPER_INSPIRATION),
        (PromptId::GlobalInspiration, GLOBAL_INSPIRATION),
        (PromptId::IdeasFromInspirations, IDEAS_FROM_INSPIRATIONS),
        (PromptId::IdeasFromGlobalInspiration, IDEAS_FROM_GLOBAL_INSPIRATION),
        (PromptId::IntegrateBrainstorm, INTEGRATE_BRAINSTORM),
        (PromptId::CritiqueIdea, CRITIQUE_IDEA),
        (PromptId::RefineIdea, REFINE_IDEA),
        (PromptId::EvaluateIdea, EVALUATE_IDEA),
        (PromptId::ResearchPlan, RESEARCH_PLAN),
        (PromptId::CritiquePlan, CRITIQUE_PLAN),
        (PromptId::RefinePlan, REFINE_PLAN),
        (PromptId::PlanTitle, PLAN_TITLE),
    ])
});

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([a-z_]+)\}").expect("placeholder pattern is valid"));

/// Raw template text
pub fn template(id: PromptId) -> &'static str {
    TEMPLATES.get(&id).copied().unwrap_or_default()
}

/// Render a template for a language.
///
/// Substitution is a single pass, so braces inside substituted values are
/// never expanded. Placeholders without a value are left as written.
pub fn render(id: PromptId, language: Language, vars: &[(&str, &str)]) -> String {
    let body = PLACEHOLDER.replace_all(template(id), |caps: &Captures| {
        let name = &caps[1];
        vars.iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| (*value).to_string())
            .unwrap_or_else(|| caps[0].to_string())
    });

    match language {
        Language::Zh => format!("{}{}", ZH_INSTRUCTION, body),
        Language::En => body.into_owned(),
    }
}
