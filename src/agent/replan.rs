//! Replan controller
//!
//! Decides which of the two immutable plans (original or reviewer-revised)
//! feeds the rest of the query. At most one revision is ever considered.

use crate::models::Plan;
use crate::planner::validate_plan;
use crate::verification::ReviewVerdict;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum ReplanDecision {
    /// Review was satisfied.
    KeepOriginal,
    /// Review was not satisfied but offered no structurally usable plan.
    NoCandidate,
    /// The revised plan failed validation; the original results stand.
    Rejected(Vec<String>),
    /// The revised plan is valid and replaces the original entirely.
    Replace(Plan),
}

pub fn select_plan(verdict: &ReviewVerdict) -> ReplanDecision {
    if verdict.satisfactory {
        return ReplanDecision::KeepOriginal;
    }

    let Some(candidate) = verdict
        .new_plan
        .as_ref()
        .filter(|plan| plan.get("actions").map_or(false, Value::is_array))
    else {
        return ReplanDecision::NoCandidate;
    };

    match validate_plan(candidate) {
        (report, Some(plan)) if report.valid => ReplanDecision::Replace(plan),
        (report, _) => ReplanDecision::Rejected(report.errors),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn verdict(satisfactory: bool, new_plan: Option<Value>) -> ReviewVerdict {
        ReviewVerdict {
            satisfactory,
            reasoning: String::new(),
            new_plan,
            degraded: false,
        }
    }

    #[test]
    fn test_satisfactory_keeps_original_even_with_plan() {
        let decision = select_plan(&verdict(true, Some(json!({ "actions": [] }))));
        assert_eq!(decision, ReplanDecision::KeepOriginal);
    }

    #[test]
    fn test_missing_or_shapeless_plan_is_no_candidate() {
        assert_eq!(select_plan(&verdict(false, None)), ReplanDecision::NoCandidate);
        assert_eq!(
            select_plan(&verdict(false, Some(json!({ "reasoning": "try again" })))),
            ReplanDecision::NoCandidate
        );
    }

    #[test]
    fn test_invalid_revision_is_rejected() {
        let candidate = json!({
            "actions": [
                { "type": "calculate", "id": "c1", "operation": "sum", "source": "f1", "field": "rating" }
            ]
        });
        match select_plan(&verdict(false, Some(candidate))) {
            ReplanDecision::Rejected(errors) => assert_eq!(errors.len(), 1),
            other => panic!("unexpected decision {:?}", other),
        }
    }

    #[test]
    fn test_valid_revision_replaces() {
        let candidate = json!({
            "reasoning": "broader",
            "actions": [ { "type": "fetch", "id": "f2", "params": {} } ]
        });
        match select_plan(&verdict(false, Some(candidate))) {
            ReplanDecision::Replace(plan) => assert_eq!(plan.fetch_ids(), vec!["f2"]),
            other => panic!("unexpected decision {:?}", other),
        }
    }
}
