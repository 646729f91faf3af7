//! Result reporter
//!
//! Renders the result store into the text digest the model reviews and
//! answers from. Pure formatting; nothing here touches the network.

use crate::compute::format_number;
use crate::models::{Action, ActionOutput, Plan, Record, ResultStore};

/// Records shown per fetch section.
pub const SAMPLE_SIZE: usize = 10;

const COUNT_KEYWORDS: &[&str] = &["how many", "count", "total", "number of"];

/// Whether the question asks for a quantity, so the total count is the answer.
pub fn is_count_question(query: &str) -> bool {
    let lowered = query.to_lowercase();
    COUNT_KEYWORDS.iter().any(|kw| lowered.contains(kw))
}

fn optional(value: Option<f64>) -> String {
    value
        .map(format_number)
        .unwrap_or_else(|| "n/a".to_string())
}

fn record_line(record: &Record) -> String {
    let mut line = format!("- {}", record.name);
    if let Some(released) = &record.released {
        line.push_str(&format!(" (released {})", released));
    }
    line.push_str(&format!(
        " | metacritic: {} | rating: {} | ratings: {}",
        optional(record.metacritic),
        optional(record.rating),
        optional(record.ratings_count)
    ));
    if !record.platforms.is_empty() {
        line.push_str(&format!(" | platforms: {}", record.platforms.join(", ")));
    }
    line
}

/// Build the digest for `query` from `results`, walking `plan` in order.
pub fn render_digest(query: &str, results: &ResultStore, plan: &Plan) -> String {
    let count_question = is_count_question(query);
    let mut out = String::new();

    out.push_str(&format!("QUESTION: {}\n\n", query));
    if !plan.reasoning.is_empty() {
        out.push_str(&format!("APPROACH: {}\n\n", plan.reasoning));
    }

    for action in &plan.actions {
        let id = action.id();
        match (action, results.get(id)) {
            (Action::Fetch { description, .. }, Some(ActionOutput::Fetch(fetched))) => {
                out.push_str(&format!("## Fetch '{}'", id));
                if !description.is_empty() {
                    out.push_str(&format!(": {}", description));
                }
                out.push('\n');

                if count_question {
                    out.push_str(&format!(
                        "TOTAL MATCHING GAMES: {} <- this total count is THE answer to the question\n",
                        fetched.total_count
                    ));
                } else {
                    out.push_str(&format!(
                        "Total matching games: {}\n",
                        fetched.total_count
                    ));
                }
                out.push_str(&format!(
                    "Records returned: {}\n",
                    fetched.returned_count
                ));

                if fetched.records.is_empty() {
                    out.push_str("No games matched these filters.\n");
                } else {
                    let shown = fetched.records.len().min(SAMPLE_SIZE);
                    out.push_str(&format!("Sample ({} of {}):\n", shown, fetched.returned_count));
                    for record in fetched.records.iter().take(SAMPLE_SIZE) {
                        out.push_str(&record_line(record));
                        out.push('\n');
                    }
                }
            }
            (
                Action::Calculate {
                    operation,
                    field,
                    source,
                    ..
                },
                Some(ActionOutput::Calculate(value)),
            ) => {
                out.push_str(&format!("## Calculate '{}'\n", id));
                out.push_str(&format!(
                    "{} of {} over '{}' = {}\n",
                    operation,
                    field,
                    source,
                    format_number(*value)
                ));
            }
            (Action::Compare { groups, .. }, Some(ActionOutput::Compare(compared))) => {
                out.push_str(&format!("## Compare '{}'\n", id));
                for (position, group) in groups.iter().enumerate() {
                    match compared.averages.iter().find(|g| g.group == position) {
                        Some(avg) => out.push_str(&format!(
                            "- {} ({} from '{}'): {}\n",
                            group.name,
                            group.field,
                            group.source,
                            format_number(avg.average)
                        )),
                        None => out.push_str(&format!(
                            "- {} ({} from '{}'): no data\n",
                            group.name, group.field, group.source
                        )),
                    }
                }
                match &compared.winner {
                    Some(winner) => out.push_str(&format!("Winner: {}\n", winner)),
                    None => out.push_str("Winner: none (no group had data)\n"),
                }
            }
            _ => {
                out.push_str(&format!("## {} '{}'\nNo result recorded.\n", action.kind(), id));
            }
        }
        out.push('\n');
    }

    if plan.actions.is_empty() {
        out.push_str("No actions were executed.\n");
    }

    out
}
