//! Error types for the game query orchestrator

use thiserror::Error;

/// Result type alias for orchestrator operations
pub type Result<T> = std::result::Result<T, OrchestrationError>;

#[derive(Error, Debug)]
pub enum OrchestrationError {

    // =============================
    // Core Pipeline Errors
    // =============================

    #[error("Could not extract a plan from the language model response")]
    PlanParseFailure,

    #[error("Plan failed validation: {}", .0.join("; "))]
    PlanValidationFailure(Vec<String>),

    #[error(
        "Action '{action_id}' references unknown source '{source_id}'. Available fetch sources: [{}]",
        available.join(", ")
    )]
    SourceReference {
        action_id: String,
        source_id: String,
        available: Vec<String>,
    },

    #[error("Data source error: {0}")]
    DataSource(String),

    #[error("Compute error: {0}")]
    Compute(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),
}

impl OrchestrationError {
    /// Text shown to the user when a query terminates on this error.
    pub fn user_message(&self) -> String {
        match self {
            OrchestrationError::PlanParseFailure => {
                "Sorry, I couldn't work out a plan for that question. Could you try rephrasing it?"
                    .to_string()
            }
            OrchestrationError::PlanValidationFailure(errors) => {
                let mut out = String::from("Sorry, the generated plan was invalid:\n");
                for error in errors {
                    out.push_str("- ");
                    out.push_str(error);
                    out.push('\n');
                }
                out
            }
            OrchestrationError::DataSource(_) => {
                "Sorry, the game database request failed, so I couldn't finish answering. Please try again shortly."
                    .to_string()
            }
            _ => "Sorry, something went wrong while processing your question. Please try again."
                .to_string(),
        }
    }

    /// Short machine-readable category name, attached to error steps.
    pub fn kind(&self) -> &'static str {
        match self {
            OrchestrationError::PlanParseFailure => "plan_parse_failure",
            OrchestrationError::PlanValidationFailure(_) => "plan_validation_failure",
            OrchestrationError::SourceReference { .. } => "source_reference_error",
            OrchestrationError::DataSource(_) => "data_source_error",
            _ => "unhandled_failure",
        }
    }
}
