//! Idea pipeline: generation, refinement and selection of research ideas

pub mod generator;
pub mod parser;
pub mod score;

pub use generator::{IdeaGenerator, Inspirations, RefineOutcome};
pub use parser::{extract_ideas, extract_single_idea};
pub use score::Score;
