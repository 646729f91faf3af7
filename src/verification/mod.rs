//! Result reviewer
//!
//! Asks the model whether the digest answers the question. A reply that
//! cannot be parsed degrades to "satisfactory" so the query still completes.

use crate::llm::{GenerationOptions, LanguageModel};
use crate::planner::extract_json_object;
use crate::Result;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

const REVIEW_SYSTEM_PROMPT: &str = r#"You review whether retrieved video game data is sufficient to answer a user's question.

Respond with ONLY a JSON object:
{
  "satisfactory": true | false,
  "reasoning": "<why>",
  "new_plan": { "reasoning": "...", "actions": [ ... ] }
}

Include "new_plan" only when "satisfactory" is false and a different plan would do better
(for example, a filter returned zero games, or the wrong field was used).
The new plan uses exactly the same action format as the original plan and replaces it entirely:
every calculate/compare "source" must be the id of a fetch action inside the new plan."#;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReviewVerdict {
    pub satisfactory: bool,
    pub reasoning: String,
    /// Candidate replacement plan, still unvalidated.
    pub new_plan: Option<Value>,
    /// True when the reply could not be parsed and the verdict was assumed.
    pub degraded: bool,
}

impl ReviewVerdict {
    fn assumed_satisfactory() -> Self {
        Self {
            satisfactory: true,
            reasoning: "Review response could not be parsed; proceeding with existing results"
                .to_string(),
            new_plan: None,
            degraded: true,
        }
    }
}

/// Interpret the reviewer's raw reply.
pub fn parse_verdict(text: &str) -> ReviewVerdict {
    let Some(json) = extract_json_object(text) else {
        warn!("Review response unparseable; assuming satisfactory");
        return ReviewVerdict::assumed_satisfactory();
    };

    let satisfactory = json
        .get("satisfactory")
        .and_then(Value::as_bool)
        .unwrap_or(true);

    let reasoning = json
        .get("reasoning")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let new_plan = json
        .get("new_plan")
        .filter(|plan| plan.is_object())
        .cloned();

    ReviewVerdict {
        satisfactory,
        reasoning,
        new_plan,
        degraded: false,
    }
}

pub struct ResultReviewer {
    model: Arc<dyn LanguageModel>,
}

impl ResultReviewer {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    pub async fn review(&self, query: &str, digest: &str) -> Result<ReviewVerdict> {
        let prompt = format!(
            "USER QUESTION:\n{}\n\nRETRIEVED DATA:\n{}\n\nIs this data sufficient to answer the question?",
            query, digest
        );

        let response = self
            .model
            .generate(REVIEW_SYSTEM_PROMPT, &prompt, GenerationOptions::STRUCTURED)
            .await?;

        let verdict = parse_verdict(&response);

        info!(
            satisfactory = verdict.satisfactory,
            has_new_plan = verdict.new_plan.is_some(),
            degraded = verdict.degraded,
            "Review completed"
        );

        Ok(verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    #[test]
    fn test_satisfactory_verdict() {
        let verdict = parse_verdict(r#"{"satisfactory": true, "reasoning": "all good"}"#);
        assert!(verdict.satisfactory);
        assert_eq!(verdict.reasoning, "all good");
        assert!(verdict.new_plan.is_none());
        assert!(!verdict.degraded);
    }

    #[test]
    fn test_unsatisfactory_with_plan_in_fence() {
        let text = "Not enough data.\n```json\n{\"satisfactory\": false, \"reasoning\": \"zero results\", \"new_plan\": {\"actions\": []}}\n```";
        let verdict = parse_verdict(text);
        assert!(!verdict.satisfactory);
        assert_eq!(verdict.new_plan, Some(serde_json::json!({ "actions": [] })));
    }

    #[test]
    fn test_null_new_plan_is_absent() {
        let verdict = parse_verdict(r#"{"satisfactory": false, "new_plan": null}"#);
        assert!(!verdict.satisfactory);
        assert!(verdict.new_plan.is_none());
    }

    #[test]
    fn test_garbage_degrades_to_satisfactory() {
        let verdict = parse_verdict("I think it's probably fine?");
        assert!(verdict.satisfactory);
        assert!(verdict.degraded);
    }

    struct FixedModel(&'static str);

    #[async_trait]
    impl LanguageModel for FixedModel {
        async fn generate(&self, _s: &str, prompt: &str, _o: GenerationOptions) -> Result<String> {
            assert!(prompt.contains("RETRIEVED DATA"));
            Ok(self.0.to_string())
        }
    }

    #[tokio::test]
    async fn test_review_round_trip_through_model() {
        let reviewer = ResultReviewer::new(Arc::new(FixedModel(
            r#"{"satisfactory": false, "reasoning": "wrong field"}"#,
        )));
        let verdict = reviewer.review("q", "digest").await.unwrap();
        assert!(!verdict.satisfactory);
        assert_eq!(verdict.reasoning, "wrong field");
    }
}
