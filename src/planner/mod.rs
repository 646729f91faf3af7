//! Plan requester, parser and validator
//!
//! The planner asks the language model for a plan and returns its raw text.
//! Parsing and validation are pure functions kept beside it.

use crate::Result;
use async_trait::async_trait;

pub mod llm;
pub mod parser;
pub mod validator;

pub use llm::LlmPlanner;
pub use parser::extract_json_object;
pub use validator::{validate_plan, ValidationReport};

/// Trait for plan generation (LLM controlled)
#[async_trait]
pub trait Planner: Send + Sync {
    /// Ask for a plan answering `query`; returns the model's raw text.
    async fn request_plan(&self, query: &str) -> Result<String>;
}
