//! Research plan drafting and review

use super::cleanup::{clean_research_plan, clean_title};
use crate::config::PipelineConfig;
use crate::error::IdeationError;
use crate::gateway::{ChatModel, CompletionRequest, GatewayError};
use crate::language::Language;
use crate::metrics::METRICS;
use crate::prompts::{self, PromptId};
use crate::retrieval::{format_paper_list, Paper};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, warn};

/// Final proposal: a title and a cleaned body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResearchPlan {
    pub title: String,
    pub body: String,
}

impl ResearchPlan {
    /// Title, blank line, body
    pub fn render(&self) -> String {
        format!("{}\n\n{}", self.title, self.body)
    }
}

pub fn default_title(language: Language) -> &'static str {
    match language {
        Language::Zh => "研究计划",
        Language::En => "Research Proposal",
    }
}

pub struct PlanCompiler {
    chat: Arc<dyn ChatModel>,
    language: Language,
    config: PipelineConfig,
}

impl PlanCompiler {
    pub fn new(chat: Arc<dyn ChatModel>, language: Language, config: PipelineConfig) -> Self {
        Self {
            chat,
            language,
            config,
        }
    }

    async fn ask_within(
        &self,
        limit: Duration,
        id: PromptId,
        vars: &[(&str, &str)],
    ) -> Result<String, IdeationError> {
        let request =
            CompletionRequest::new(id, prompts::render(id, self.language, vars)).reasoning();
        match timeout(limit, self.chat.complete(request)).await {
            Ok(result) => result.map_err(IdeationError::from),
            Err(_) => Err(IdeationError::StepTimeout {
                stage: id.as_str(),
                secs: limit.as_secs(),
            }),
        }
    }

    /// Draft the title and body concurrently, clean the body and optionally
    /// run one critique and refine pass over it.
    ///
    /// Only a failed body draft is an error. A failed title becomes the
    /// default title and a failed review keeps the cleaned draft.
    pub async fn generate_plan(
        &self,
        query: &str,
        papers: &[Paper],
        best_idea: &str,
        global_inspiration: &str,
    ) -> Result<ResearchPlan, IdeationError> {
        let paper_list = format_paper_list(papers);

        let title_vars = [("best_idea", best_idea)];
        let body_vars = [
            ("query", query),
            ("papers", paper_list.as_str()),
            ("inspiration", global_inspiration),
            ("best_idea", best_idea),
        ];

        let title_call =
            self.ask_within(self.config.title_timeout(), PromptId::PlanTitle, &title_vars);
        let body_call =
            self.ask_within(self.config.plan_timeout(), PromptId::ResearchPlan, &body_vars);
        let (title, body) = tokio::join!(title_call, body_call);

        let title = match title.map(|t| clean_title(&t)) {
            Ok(title) if !title.is_empty() => title,
            Ok(_) => default_title(self.language).to_string(),
            Err(e) => {
                warn!("Title generation failed, using default: {}", e);
                METRICS.record_fallback("plan_title");
                default_title(self.language).to_string()
            }
        };

        let draft = clean_research_plan(&body?);

        let body = if self.config.enable_plan_review {
            match self.review(query, &paper_list, global_inspiration, &draft).await {
                Ok(revised) if !revised.is_empty() => revised,
                Ok(_) => draft,
                Err(e) => {
                    warn!("Plan review failed, keeping the draft: {}", e);
                    METRICS.record_fallback("plan_review");
                    draft
                }
            }
        } else {
            draft
        };

        info!("Research plan ready: {}", title);
        Ok(ResearchPlan { title, body })
    }

    async fn review(
        &self,
        query: &str,
        paper_list: &str,
        inspiration: &str,
        draft: &str,
    ) -> Result<String, IdeationError> {
        let criticism = self
            .ask_within(
                self.config.plan_timeout(),
                PromptId::CritiquePlan,
                &[
                    ("query", query),
                    ("papers", paper_list),
                    ("inspiration", inspiration),
                    ("plan", draft),
                ],
            )
            .await?;

        if criticism.trim().is_empty() {
            return Err(GatewayError::EmptyResponse.into());
        }

        let revised = self
            .ask_within(
                self.config.plan_timeout(),
                PromptId::RefinePlan,
                &[("query", query), ("plan", draft), ("criticism", &criticism)],
            )
            .await?;

        Ok(clean_research_plan(&revised))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{text, Reply, ScriptedChat};

    fn compiler(chat: Arc<ScriptedChat>, review: bool, language: Language) -> PlanCompiler {
        let config = PipelineConfig {
            enable_plan_review: review,
            ..PipelineConfig::default()
        };
        PlanCompiler::new(chat, language, config)
    }

    fn papers() -> Vec<Paper> {
        vec![Paper::new(Some("p1"), "Sparse Attention", Some("About attention"))]
    }

    #[tokio::test]
    async fn test_plan_with_review() {
        let chat = ScriptedChat::new(|req| match req.prompt_id {
            PromptId::PlanTitle => text("\"Sparse Priors\"\nextra"),
            PromptId::ResearchPlan => text("Certainly, here it is.\n# Draft\nBody."),
            PromptId::CritiquePlan => {
                assert!(req.prompt.contains("# Draft\nBody."));
                text("Needs more novelty")
            }
            PromptId::RefinePlan => text("# Final\nBetter body.\n\nI hope this helps."),
            _ => Reply::Fail,
        });

        let plan = compiler(chat, true, Language::En)
            .generate_plan("q", &papers(), "**Idea 1**: x", "global")
            .await
            .unwrap();

        assert_eq!(plan.title, "Sparse Priors");
        assert_eq!(plan.body, "# Final\nBetter body.");
        assert_eq!(plan.render(), "Sparse Priors\n\n# Final\nBetter body.");
    }

    #[tokio::test]
    async fn test_review_disabled_uses_cleaned_draft() {
        let chat = ScriptedChat::new(|req| match req.prompt_id {
            PromptId::PlanTitle => text("Title"),
            PromptId::ResearchPlan => text("Of course, here is the proposal.\n\n# Research Title\nBody"),
            _ => Reply::Fail,
        });

        let plan = compiler(chat.clone(), false, Language::En)
            .generate_plan("q", &papers(), "idea", "global")
            .await
            .unwrap();

        assert_eq!(plan.body, "# Research Title\nBody");
        assert_eq!(chat.calls_for(PromptId::CritiquePlan), 0);
    }

    #[tokio::test]
    async fn test_title_failure_uses_default() {
        let chat = ScriptedChat::new(|req| match req.prompt_id {
            PromptId::ResearchPlan => text("# Body"),
            _ => Reply::Fail,
        });

        let plan = compiler(chat, true, Language::Zh)
            .generate_plan("q", &papers(), "idea", "global")
            .await
            .unwrap();

        assert_eq!(plan.title, "研究计划");
        // Review failed, so the draft stands
        assert_eq!(plan.body, "# Body");
    }

    #[tokio::test]
    async fn test_body_failure_is_fatal() {
        let chat = ScriptedChat::new(|req| match req.prompt_id {
            PromptId::PlanTitle => text("Title"),
            _ => Reply::Fail,
        });

        let err = compiler(chat, true, Language::En)
            .generate_plan("q", &papers(), "idea", "global")
            .await
            .unwrap_err();

        assert!(matches!(err, IdeationError::Gateway(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_body_timeout_is_fatal() {
        let chat = ScriptedChat::new(|req| match req.prompt_id {
            PromptId::PlanTitle => text("Title"),
            _ => Reply::Hang,
        });

        let err = compiler(chat, true, Language::En)
            .generate_plan("q", &papers(), "idea", "global")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            IdeationError::StepTimeout { stage: "research_plan", secs: 120 }
        ));
    }
}
