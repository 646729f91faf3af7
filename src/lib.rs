//! Game Query Orchestrator
//!
//! Answers natural-language questions about video games by having a
//! language model write a structured plan, executing that plan
//! deterministically against the RAWG catalogue, and letting the model
//! review and phrase the results.
//!
//! QUERY LOOP:
//! PLAN → VALIDATE → EXECUTE → REVIEW → REPLAN? → ANSWER

pub mod agent;
pub mod api;
pub mod compute;
pub mod config;
pub mod error;
pub mod execution;
pub mod gemini;
pub mod llm;
pub mod models;
pub mod planner;
pub mod progress;
pub mod report;
pub mod tools;
pub mod verification;

pub use error::Result;

// Re-export common types
pub use models::*;
