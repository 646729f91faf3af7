//! Plan executor
//!
//! Runs actions strictly in list order against the data source and the
//! calculator, building a fresh result store. Any failure aborts the rest
//! of the run. The LLM is NOT involved here.

use crate::compute::{Calculator, ComputeInput, ComputeValue, GroupData, Operation};
use crate::error::OrchestrationError;
use crate::models::{
    Action, ActionOutput, CalcField, CalcOperation, CompareField, CompareGroup,
    ComparisonResult, DisplaySnapshot, FetchParams, FetchResult, FieldValue, GroupView, Plan,
    RecordView, ResultStore, Step, StepKind,
};
use crate::progress::ProgressLog;
use crate::tools::DataSource;
use crate::Result;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Results of one executor run.
#[derive(Debug, Clone, Default)]
pub struct ExecutionOutcome {
    pub results: ResultStore,
    pub display: HashMap<String, DisplaySnapshot>,
}

/// Executes a plan step-by-step deterministically
pub struct PlanExecutor {
    data_source: Arc<dyn DataSource>,
}

impl PlanExecutor {
    pub fn new(data_source: Arc<dyn DataSource>) -> Self {
        Self { data_source }
    }

    /// Execute all actions in order (fail-fast). Always starts from an empty store.
    pub async fn execute_plan(
        &self,
        plan: &Plan,
        progress: &mut ProgressLog<'_>,
    ) -> Result<ExecutionOutcome> {
        let mut outcome = ExecutionOutcome::default();

        debug!(action_count = plan.actions.len(), "Starting plan execution");

        for action in &plan.actions {
            let start = Instant::now();

            match action {
                Action::Fetch {
                    id,
                    params,
                    description,
                } => {
                    self.run_fetch(id, params, description, &mut outcome, progress)
                        .await?
                }
                Action::Calculate {
                    id,
                    operation,
                    source,
                    field,
                    description,
                } => run_calculate(
                    id,
                    *operation,
                    source,
                    *field,
                    description,
                    &mut outcome,
                    progress,
                )?,
                Action::Compare {
                    id,
                    groups,
                    description,
                } => run_compare(id, groups, description, &mut outcome, progress)?,
            }

            debug!(
                action_id = %action.id(),
                kind = action.kind(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Action complete"
            );
        }

        info!(
            action_count = plan.actions.len(),
            stored = outcome.results.len(),
            "Plan execution completed"
        );

        Ok(outcome)
    }

    async fn run_fetch(
        &self,
        id: &str,
        params: &FetchParams,
        description: &str,
        outcome: &mut ExecutionOutcome,
        progress: &mut ProgressLog<'_>,
    ) -> Result<()> {
        progress.record(Step::new(
            StepKind::ToolCall,
            "fetch_games",
            format!("Fetching games: {}", label(description, id)),
            json!({ "action_id": id, "params": params }),
        ));

        let response = self.data_source.fetch(params).await?;
        let returned_count = response.records.len();

        progress.record(Step::new(
            StepKind::ToolResult,
            "fetch_games",
            format!(
                "Found {} matching games ({} returned)",
                response.total_count, returned_count
            ),
            json!({
                "action_id": id,
                "total_count": response.total_count,
                "returned_count": returned_count,
                "params": response.echoed_params,
            }),
        ));

        outcome.display.insert(
            id.to_string(),
            DisplaySnapshot::Fetch {
                description: description.to_string(),
                total_count: response.total_count,
                records: response.records.iter().map(RecordView::from).collect(),
            },
        );
        outcome.results.insert(
            id,
            ActionOutput::Fetch(FetchResult {
                records: response.records,
                total_count: response.total_count,
                returned_count,
                echoed_params: response.echoed_params,
            }),
        );

        Ok(())
    }
}

fn label<'a>(description: &'a str, id: &'a str) -> &'a str {
    if description.trim().is_empty() {
        id
    } else {
        description
    }
}

/// Fetch output for `source`, re-checked even though validation ran first.
fn resolve_source<'s>(
    results: &'s ResultStore,
    action_id: &str,
    source: &str,
) -> Result<&'s FetchResult> {
    results
        .fetch(source)
        .ok_or_else(|| OrchestrationError::SourceReference {
            action_id: action_id.to_string(),
            source_id: source.to_string(),
            available: results.fetch_ids(),
        })
}

fn run_calculate(
    id: &str,
    operation: CalcOperation,
    source: &str,
    field: CalcField,
    description: &str,
    outcome: &mut ExecutionOutcome,
    progress: &mut ProgressLog<'_>,
) -> Result<()> {
    progress.record(Step::new(
        StepKind::ToolCall,
        "calculate",
        format!("Calculating {} of {} over '{}'", operation, field, source),
        json!({
            "action_id": id,
            "operation": operation,
            "field": field,
            "source": source,
        }),
    ));

    let fetched = resolve_source(&outcome.results, id, source)?;

    let per_record: Vec<FieldValue> = fetched
        .records
        .iter()
        .map(|record| FieldValue {
            name: record.name.clone(),
            value: field.value(record),
        })
        .collect();
    let raw: Vec<Option<f64>> = per_record.iter().map(|r| r.value).collect();

    let computed = Calculator::execute(Operation::from(operation), &ComputeInput::Values(raw))?;
    let result = match computed.result {
        ComputeValue::Number(n) => n,
        ComputeValue::Comparison { .. } => {
            return Err(OrchestrationError::Compute(format!(
                "{} returned a comparison instead of a number",
                operation
            )))
        }
    };

    progress.record(Step::new(
        StepKind::ToolResult,
        "calculate",
        format!("{} of {} = {}", operation, field, result),
        json!({
            "action_id": id,
            "result": result,
            "formula": computed.formula,
            "details": computed.details,
        }),
    ));

    let values = per_record
        .iter()
        .filter_map(|r| r.value)
        .filter(|v| !v.is_nan())
        .collect();

    outcome.display.insert(
        id.to_string(),
        DisplaySnapshot::Calculate {
            description: description.to_string(),
            operation,
            field,
            result,
            formula: computed.formula,
            details: computed.details,
            values,
            records: per_record,
        },
    );
    outcome.results.insert(id, ActionOutput::Calculate(result));

    Ok(())
}

fn run_compare(
    id: &str,
    groups: &[CompareGroup],
    description: &str,
    outcome: &mut ExecutionOutcome,
    progress: &mut ProgressLog<'_>,
) -> Result<()> {
    progress.record(Step::new(
        StepKind::ToolCall,
        "compare",
        format!(
            "Comparing {}",
            groups
                .iter()
                .map(|g| g.name.as_str())
                .collect::<Vec<_>>()
                .join(" vs ")
        ),
        json!({ "action_id": id, "groups": groups }),
    ));

    let mut group_data = Vec::with_capacity(groups.len());
    let mut views = Vec::with_capacity(groups.len());

    for group in groups {
        let fetched = resolve_source(&outcome.results, id, &group.source)?;

        let (raw, records): (Vec<Option<f64>>, Vec<FieldValue>) = match group.field {
            // Count compares the fetch's total, not per-record values.
            CompareField::Count => (vec![Some(fetched.total_count as f64)], Vec::new()),
            CompareField::Metacritic | CompareField::Rating => {
                let records: Vec<FieldValue> = fetched
                    .records
                    .iter()
                    .map(|record| FieldValue {
                        name: record.name.clone(),
                        value: group.field.value(record),
                    })
                    .collect();
                (records.iter().map(|r| r.value).collect(), records)
            }
        };

        views.push(GroupView {
            name: group.name.clone(),
            source: group.source.clone(),
            field: group.field,
            values: crate::compute::valid_numbers(&raw),
            average: None,
            records,
        });
        group_data.push(GroupData {
            name: group.name.clone(),
            values: raw,
        });
    }

    let computed = Calculator::execute(Operation::Compare, &ComputeInput::Groups(group_data))?;
    let (averages, winner) = match computed.result {
        ComputeValue::Comparison { averages, winner } => (averages, winner),
        ComputeValue::Number(_) => {
            return Err(OrchestrationError::Compute(
                "compare returned a number instead of group averages".to_string(),
            ))
        }
    };

    for avg in &averages {
        if let Some(view) = views.get_mut(avg.group) {
            view.average = Some(avg.average);
        }
    }

    progress.record(Step::new(
        StepKind::ToolResult,
        "compare",
        match &winner {
            Some(name) => format!("{} leads the comparison", name),
            None => "No group had data to compare".to_string(),
        },
        json!({
            "action_id": id,
            "averages": averages,
            "winner": winner,
            "formula": computed.formula,
            "details": computed.details,
        }),
    ));

    outcome.display.insert(
        id.to_string(),
        DisplaySnapshot::Compare {
            description: description.to_string(),
            formula: computed.formula,
            winner: winner.clone(),
            groups: views,
        },
    );
    outcome
        .results
        .insert(id, ActionOutput::Compare(ComparisonResult { averages, winner }));

    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{FetchResponse, Record};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Data source replaying canned responses in call order.
    pub(crate) struct ScriptedDataSource {
        responses: Mutex<Vec<Result<FetchResponse>>>,
        pub(crate) calls: Mutex<Vec<FetchParams>>,
    }

    impl ScriptedDataSource {
        pub(crate) fn new(responses: Vec<Result<FetchResponse>>) -> Self {
            Self {
                responses: Mutex::new(responses.into_iter().rev().collect()),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl DataSource for ScriptedDataSource {
        async fn fetch(&self, params: &FetchParams) -> Result<FetchResponse> {
            self.calls.lock().unwrap().push(params.clone());
            self.responses
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| {
                    Err(OrchestrationError::DataSource(
                        "no scripted response".into(),
                    ))
                })
        }
    }

    pub(crate) fn record(name: &str, metacritic: Option<f64>, rating: Option<f64>) -> Record {
        Record {
            id: 1,
            name: name.to_string(),
            metacritic,
            rating,
            ratings_count: Some(10.0),
            ..Record::default()
        }
    }

    pub(crate) fn response(total_count: u64, records: Vec<Record>) -> Result<FetchResponse> {
        Ok(FetchResponse {
            total_count,
            records,
            echoed_params: json!({ "key": "[redacted]" }),
        })
    }

    fn fetch(id: &str) -> Action {
        Action::Fetch {
            id: id.to_string(),
            params: FetchParams::default(),
            description: String::new(),
        }
    }

    fn executor(responses: Vec<Result<FetchResponse>>) -> (PlanExecutor, Arc<ScriptedDataSource>) {
        let source = Arc::new(ScriptedDataSource::new(responses));
        (PlanExecutor::new(source.clone()), source)
    }

    #[tokio::test]
    async fn test_fetch_then_average_rating() {
        let (executor, _) = executor(vec![response(
            3,
            vec![
                record("A", None, Some(4.0)),
                record("B", None, Some(3.0)),
                record("C", None, None),
            ],
        )]);

        let plan = Plan {
            reasoning: String::new(),
            actions: vec![
                fetch("f1"),
                Action::Calculate {
                    id: "avg".to_string(),
                    operation: CalcOperation::Average,
                    source: "f1".to_string(),
                    field: CalcField::Rating,
                    description: String::new(),
                },
            ],
        };

        let mut progress = ProgressLog::new();
        let outcome = executor.execute_plan(&plan, &mut progress).await.unwrap();

        assert_eq!(outcome.results.get("avg"), Some(&ActionOutput::Calculate(3.5)));
        let fetched = outcome.results.fetch("f1").unwrap();
        assert_eq!(fetched.returned_count, 3);

        let kinds: Vec<(StepKind, &str)> = progress
            .steps()
            .iter()
            .map(|s| (s.kind, s.name.as_str()))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (StepKind::ToolCall, "fetch_games"),
                (StepKind::ToolResult, "fetch_games"),
                (StepKind::ToolCall, "calculate"),
                (StepKind::ToolResult, "calculate"),
            ]
        );

        match outcome.display.get("avg") {
            Some(DisplaySnapshot::Calculate { values, records, formula, .. }) => {
                assert_eq!(values, &vec![4.0, 3.0]);
                assert_eq!(records.len(), 3);
                assert_eq!(formula, "(4 + 3) / 2 = 3.5");
            }
            other => panic!("unexpected snapshot {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_compare_counts_use_total_count() {
        let (executor, _) = executor(vec![
            response(120, vec![record("x", Some(90.0), None)]),
            response(80, vec![record("y", Some(99.0), None)]),
        ]);

        let plan = Plan {
            reasoning: String::new(),
            actions: vec![
                fetch("ps5"),
                fetch("xbox"),
                Action::Compare {
                    id: "cmp".to_string(),
                    groups: vec![
                        CompareGroup {
                            name: "PS5".to_string(),
                            source: "ps5".to_string(),
                            field: CompareField::Count,
                        },
                        CompareGroup {
                            name: "Xbox".to_string(),
                            source: "xbox".to_string(),
                            field: CompareField::Count,
                        },
                    ],
                    description: String::new(),
                },
            ],
        };

        let mut progress = ProgressLog::new();
        let outcome = executor.execute_plan(&plan, &mut progress).await.unwrap();

        match outcome.results.get("cmp") {
            Some(ActionOutput::Compare(result)) => {
                assert_eq!(result.averages[0].average, 120.0);
                assert_eq!(result.averages[1].average, 80.0);
                assert_eq!(result.winner.as_deref(), Some("PS5"));
            }
            other => panic!("unexpected output {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_groups_sharing_a_name_keep_their_own_average() {
        let (executor, _) = executor(vec![
            response(2, vec![record("a", Some(90.0), None)]),
            response(2, vec![record("b", Some(60.0), None)]),
        ]);

        let group = |source: &str| CompareGroup {
            name: "Same".to_string(),
            source: source.to_string(),
            field: CompareField::Metacritic,
        };
        let plan = Plan {
            reasoning: String::new(),
            actions: vec![
                fetch("f1"),
                fetch("f2"),
                Action::Compare {
                    id: "cmp".to_string(),
                    groups: vec![group("f1"), group("f2")],
                    description: String::new(),
                },
            ],
        };

        let mut progress = ProgressLog::new();
        let outcome = executor.execute_plan(&plan, &mut progress).await.unwrap();

        match outcome.display.get("cmp") {
            Some(DisplaySnapshot::Compare { groups, .. }) => {
                assert_eq!(groups[0].average, Some(90.0));
                assert_eq!(groups[1].average, Some(60.0));
            }
            other => panic!("unexpected snapshot {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_source_is_source_reference_error() {
        let (executor, _) = executor(vec![response(1, vec![])]);

        let plan = Plan {
            reasoning: String::new(),
            actions: vec![
                fetch("f1"),
                Action::Calculate {
                    id: "c1".to_string(),
                    operation: CalcOperation::Sum,
                    source: "f9".to_string(),
                    field: CalcField::Metacritic,
                    description: String::new(),
                },
            ],
        };

        let mut progress = ProgressLog::new();
        let err = executor.execute_plan(&plan, &mut progress).await.unwrap_err();
        match err {
            OrchestrationError::SourceReference { action_id, source_id, available } => {
                assert_eq!(action_id, "c1");
                assert_eq!(source_id, "f9");
                assert_eq!(available, vec!["f1".to_string()]);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_data_source_failure_aborts_remaining_actions() {
        let (executor, source) = executor(vec![
            Err(OrchestrationError::DataSource("503".to_string())),
            response(5, vec![]),
        ]);

        let plan = Plan {
            reasoning: String::new(),
            actions: vec![fetch("f1"), fetch("f2")],
        };

        let mut progress = ProgressLog::new();
        let result = executor.execute_plan(&plan, &mut progress).await;

        assert!(matches!(result, Err(OrchestrationError::DataSource(_))));
        assert_eq!(source.calls.lock().unwrap().len(), 1);
        assert_eq!(progress.steps().len(), 1);
        assert_eq!(progress.steps()[0].kind, StepKind::ToolCall);
    }

    #[tokio::test]
    async fn test_fetches_run_sequentially_in_declared_order() {
        let (executor, source) = executor(vec![response(1, vec![]), response(2, vec![])]);

        let mut first = FetchParams::default();
        first.genres = vec!["RPG".to_string()];
        let mut second = FetchParams::default();
        second.genres = vec!["Shooter".to_string()];

        let plan = Plan {
            reasoning: String::new(),
            actions: vec![
                Action::Fetch {
                    id: "a".into(),
                    params: first.clone(),
                    description: String::new(),
                },
                Action::Fetch {
                    id: "b".into(),
                    params: second.clone(),
                    description: String::new(),
                },
            ],
        };

        let mut progress = ProgressLog::new();
        let outcome = executor.execute_plan(&plan, &mut progress).await.unwrap();

        assert_eq!(*source.calls.lock().unwrap(), vec![first, second]);
        assert_eq!(outcome.results.fetch("a").unwrap().total_count, 1);
        assert_eq!(outcome.results.fetch("b").unwrap().total_count, 2);
    }
}
