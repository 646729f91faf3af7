//! Main orchestrator - implements the query lifecycle
//!
//! PLAN → VALIDATE → EXECUTE → REVIEW → REPLAN? → ANSWER

use crate::error::OrchestrationError;
use crate::execution::{ExecutionOutcome, PlanExecutor};
use crate::llm::LanguageModel;
use crate::models::{Plan, QueryEvent, QueryResponse, Step, StepKind};
use crate::planner::{extract_json_object, validate_plan, LlmPlanner, Planner};
use crate::progress::{EventSink, ProgressLog};
use crate::report::render_digest;
use crate::tools::DataSource;
use crate::verification::ResultReviewer;
use crate::Result;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

pub mod answer;
pub mod replan;

pub use answer::AnswerSynthesizer;
pub use replan::{select_plan, ReplanDecision};

struct Completed {
    answer: String,
    display: HashMap<String, Value>,
}

/// Main orchestrator that coordinates the entire workflow
pub struct Orchestrator {
    planner: Box<dyn Planner>,
    executor: PlanExecutor,
    reviewer: ResultReviewer,
    synthesizer: AnswerSynthesizer,
}

impl Orchestrator {
    pub fn new(
        planner: Box<dyn Planner>,
        executor: PlanExecutor,
        reviewer: ResultReviewer,
        synthesizer: AnswerSynthesizer,
    ) -> Self {
        Self {
            planner,
            executor,
            reviewer,
            synthesizer,
        }
    }

    /// Wire every model-backed component to one language model.
    pub fn with_model(model: Arc<dyn LanguageModel>, data_source: Arc<dyn DataSource>) -> Self {
        Self::new(
            Box::new(LlmPlanner::new(model.clone())),
            PlanExecutor::new(data_source),
            ResultReviewer::new(model.clone()),
            AnswerSynthesizer::new(model),
        )
    }

    /// Answer a query, returning the answer and the full step log.
    pub async fn run_query(&self, query: &str) -> QueryResponse {
        let mut progress = ProgressLog::new();
        self.run(query, &mut progress).await
    }

    /// Answer a query, forwarding every step and the final answer or error to `sink`.
    pub async fn run_query_streaming(&self, query: &str, sink: &dyn EventSink) {
        let mut progress = ProgressLog::with_sink(sink);
        self.run(query, &mut progress).await;
    }

    async fn run(&self, query: &str, progress: &mut ProgressLog<'_>) -> QueryResponse {
        let start_time = Instant::now();

        info!(query = %query, "Orchestrator: starting query");

        match self.run_lifecycle(query, progress).await {
            Ok(completed) => {
                info!(
                    elapsed_ms = start_time.elapsed().as_millis() as u64,
                    "Query answered"
                );

                progress.finish(QueryEvent::Answer {
                    answer: completed.answer.clone(),
                    display: completed.display.clone(),
                });

                QueryResponse {
                    success: true,
                    answer: completed.answer,
                    steps: progress.steps().to_vec(),
                    display: completed.display,
                }
            }
            Err(e) => {
                error!(error = %e, kind = e.kind(), "Query terminated");

                let message = e.user_message();
                progress.record(Step::new(
                    StepKind::Error,
                    "error",
                    message.clone(),
                    json!({ "kind": e.kind(), "error": e.to_string() }),
                ));
                progress.finish(QueryEvent::Error {
                    message: message.clone(),
                });

                QueryResponse {
                    success: false,
                    answer: message,
                    steps: progress.steps().to_vec(),
                    display: HashMap::new(),
                }
            }
        }
    }

    async fn run_lifecycle(
        &self,
        query: &str,
        progress: &mut ProgressLog<'_>,
    ) -> Result<Completed> {
        // === PLAN ===
        progress.record(Step::new(
            StepKind::Thinking,
            "planning",
            "Working out how to answer the question",
            json!({ "query": query }),
        ));

        let raw_plan = self.planner.request_plan(query).await?;

        let candidate = extract_json_object(&raw_plan).ok_or_else(|| {
            warn!(response_chars = raw_plan.len(), "Plan response contained no JSON object");
            OrchestrationError::PlanParseFailure
        })?;

        // === VALIDATE ===
        let original = accept_plan(&candidate)?;

        progress.record(Step::new(
            StepKind::Plan,
            "plan",
            plan_summary(&original),
            json!({ "plan": original }),
        ));

        // === EXECUTE ===
        let first_run = self.executor.execute_plan(&original, progress).await?;

        // === REVIEW ===
        let digest = render_digest(query, &first_run.results, &original);
        let verdict = self.reviewer.review(query, &digest).await?;

        progress.record(Step::new(
            StepKind::Review,
            "review",
            if verdict.satisfactory {
                "Results look sufficient".to_string()
            } else {
                format!("Results insufficient: {}", verdict.reasoning)
            },
            json!({
                "satisfactory": verdict.satisfactory,
                "reasoning": verdict.reasoning,
                "degraded": verdict.degraded,
                "has_new_plan": verdict.new_plan.is_some(),
            }),
        ));

        // === REPLAN? ===
        let (active_plan, outcome) = match select_plan(&verdict) {
            ReplanDecision::KeepOriginal => (original, first_run),
            ReplanDecision::NoCandidate => {
                info!("Reviewer offered no usable plan; keeping original results");
                (original, first_run)
            }
            ReplanDecision::Rejected(errors) => {
                warn!(?errors, "Revised plan failed validation; keeping original results");
                progress.record(Step::new(
                    StepKind::Review,
                    "replan_rejected",
                    "Revised plan was invalid; answering from the original results",
                    json!({ "errors": errors, "attempted_plan": verdict.new_plan }),
                ));
                (original, first_run)
            }
            ReplanDecision::Replace(revised) => {
                info!(
                    action_count = revised.actions.len(),
                    fetch_ids = ?revised.fetch_ids(),
                    "Replanning with revised plan"
                );
                progress.record(Step::new(
                    StepKind::Plan,
                    "revised_plan",
                    plan_summary(&revised),
                    json!({ "plan": revised }),
                ));
                // Fresh store: the first run's results are discarded.
                drop(first_run);
                let rerun = self.executor.execute_plan(&revised, progress).await?;
                (revised, rerun)
            }
        };

        // === ANSWER ===
        progress.record(Step::new(
            StepKind::GeneratingAnswer,
            "generating_answer",
            "Writing the answer",
            json!({ "actions": active_plan.actions.len() }),
        ));

        let final_digest = render_digest(query, &outcome.results, &active_plan);
        debug!(digest_chars = final_digest.len(), "Final digest rendered");

        let answer = self.synthesizer.synthesize(query, &final_digest).await?;

        progress.record(Step::new(
            StepKind::Answer,
            "answer",
            "Answer ready",
            json!({ "answer_chars": answer.len() }),
        ));

        Ok(Completed {
            answer,
            display: display_values(&outcome),
        })
    }
}

/// Validate a parsed candidate, turning violations into a terminal error.
fn accept_plan(candidate: &Value) -> Result<Plan> {
    match validate_plan(candidate) {
        (report, Some(plan)) if report.valid => Ok(plan),
        (report, _) => {
            warn!(errors = ?report.errors, "Plan failed validation");
            Err(OrchestrationError::PlanValidationFailure(report.errors))
        }
    }
}

fn plan_summary(plan: &Plan) -> String {
    if plan.reasoning.trim().is_empty() {
        format!("Planned {} action(s)", plan.actions.len())
    } else {
        plan.reasoning.clone()
    }
}

fn display_values(outcome: &ExecutionOutcome) -> HashMap<String, Value> {
    outcome
        .display
        .iter()
        .filter_map(|(id, snapshot)| {
            serde_json::to_value(snapshot)
                .ok()
                .map(|value| (id.clone(), value))
        })
        .collect()
}
