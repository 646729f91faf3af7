//! Plan validation
//!
//! Structural check on the candidate object, then a referential check: every
//! calculate source and every compare-group source must name a fetch action
//! in the same plan. All violations are reported together; nothing is repaired.

use crate::models::{Action, Plan};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ValidationReport {
    fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}

/// Validate a parsed candidate. Returns the report and, when valid, the typed plan.
pub fn validate_plan(candidate: &Value) -> (ValidationReport, Option<Plan>) {
    let Some(raw_actions) = candidate.get("actions").and_then(Value::as_array) else {
        return (
            ValidationReport::from_errors(vec![
                "Plan is missing an 'actions' list".to_string()
            ]),
            None,
        );
    };

    // Read from the raw objects so a fetch with a malformed body still counts
    // as a valid source; its own problem is reported once below.
    let fetch_ids: BTreeSet<&str> = raw_actions
        .iter()
        .filter(|raw| raw.get("type").and_then(Value::as_str) == Some("fetch"))
        .filter_map(|raw| raw.get("id").and_then(Value::as_str))
        .collect();

    let mut errors = Vec::new();
    let mut actions = Vec::with_capacity(raw_actions.len());

    for (index, raw) in raw_actions.iter().enumerate() {
        match serde_json::from_value::<Action>(raw.clone()) {
            Ok(action) => actions.push(action),
            Err(e) => {
                let label = raw
                    .get("id")
                    .and_then(Value::as_str)
                    .map(|id| format!("'{}'", id))
                    .unwrap_or_else(|| format!("#{}", index + 1));
                errors.push(format!("Action {} is malformed: {}", label, e));
            }
        }
    }

    let plan = Plan {
        reasoning: candidate
            .get("reasoning")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        actions,
    };

    errors.extend(reference_errors(&plan.actions, &fetch_ids));

    let report = ValidationReport::from_errors(errors);
    let plan = report.valid.then_some(plan);
    (report, plan)
}

/// Referential violations of typed actions against the fetch-id set.
///
/// Duplicate ids are not detected: two fetches sharing an id collapse into
/// one entry of the reference set.
fn reference_errors(actions: &[Action], fetch_ids: &BTreeSet<&str>) -> Vec<String> {
    let listed = || {
        fetch_ids
            .iter()
            .copied()
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut errors = Vec::new();

    for action in actions {
        match action {
            Action::Fetch { .. } => {}
            Action::Calculate { id, source, .. } => {
                if !fetch_ids.contains(source.as_str()) {
                    errors.push(format!(
                        "Calculate action '{}' references invalid source '{}'. Valid fetch ids: [{}]",
                        id,
                        source,
                        listed()
                    ));
                }
            }
            Action::Compare { id, groups, .. } => {
                for group in groups {
                    if !fetch_ids.contains(group.source.as_str()) {
                        errors.push(format!(
                            "Compare action '{}' group '{}' references invalid source '{}'. Valid fetch ids: [{}]",
                            id,
                            group.name,
                            group.source,
                            listed()
                        ));
                    }
                }
            }
        }
    }

    errors
}
