//! Research plan compiler

pub mod cleanup;
pub mod compiler;

pub use cleanup::{clean_research_plan, clean_title};
pub use compiler::{default_title, PlanCompiler, ResearchPlan};
