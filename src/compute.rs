//! Compute collaborator
//!
//! Pure arithmetic over numeric data extracted from fetch results.
//! Entries that are missing or NaN are skipped everywhere except `count`,
//! which counts items rather than valid numbers.

use crate::error::OrchestrationError;
use crate::models::{CalcOperation, GroupAverage};
use crate::Result;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Average,
    Sum,
    Count,
    Min,
    Max,
    Compare,
}

impl From<CalcOperation> for Operation {
    fn from(op: CalcOperation) -> Self {
        match op {
            CalcOperation::Average => Operation::Average,
            CalcOperation::Sum => Operation::Sum,
            CalcOperation::Count => Operation::Count,
            CalcOperation::Min => Operation::Min,
            CalcOperation::Max => Operation::Max,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupData {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ComputeInput {
    Values(Vec<Option<f64>>),
    Groups(Vec<GroupData>),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum ComputeValue {
    Number(f64),
    Comparison {
        averages: Vec<GroupAverage>,
        winner: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ComputeOutput {
    pub result: ComputeValue,
    pub formula: String,
    pub details: String,
}

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Drop missing and NaN entries.
pub fn valid_numbers(values: &[Option<f64>]) -> Vec<f64> {
    values
        .iter()
        .filter_map(|v| *v)
        .filter(|v| !v.is_nan())
        .collect()
}

pub struct Calculator;

impl Calculator {
    pub fn execute(operation: Operation, input: &ComputeInput) -> Result<ComputeOutput> {
        match (operation, input) {
            (Operation::Compare, ComputeInput::Groups(groups)) => Ok(compare(groups)),
            (Operation::Compare, ComputeInput::Values(_)) => Err(OrchestrationError::Compute(
                "compare requires named groups, got a flat value list".to_string(),
            )),
            (_, ComputeInput::Groups(_)) => Err(OrchestrationError::Compute(format!(
                "{:?} requires a flat value list, got named groups",
                operation
            ))),
            (Operation::Average, ComputeInput::Values(values)) => Ok(average(values)),
            (Operation::Sum, ComputeInput::Values(values)) => Ok(sum(values)),
            (Operation::Count, ComputeInput::Values(values)) => Ok(count(values)),
            (Operation::Min, ComputeInput::Values(values)) => Ok(extremum(values, false)),
            (Operation::Max, ComputeInput::Values(values)) => Ok(extremum(values, true)),
        }
    }
}

fn join_terms(values: &[f64], separator: &str) -> String {
    values
        .iter()
        .map(|v| format_number(*v))
        .collect::<Vec<_>>()
        .join(separator)
}

/// Integers print without a fractional part.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

fn number(result: f64, formula: String, details: String) -> ComputeOutput {
    ComputeOutput {
        result: ComputeValue::Number(result),
        formula,
        details,
    }
}

fn average(values: &[Option<f64>]) -> ComputeOutput {
    let valid = valid_numbers(values);
    if valid.is_empty() {
        return number(
            0.0,
            "average() = 0".to_string(),
            "No valid values to average; result defaults to 0".to_string(),
        );
    }

    let total: f64 = valid.iter().sum();
    let result = round2(total / valid.len() as f64);
    number(
        result,
        format!(
            "({}) / {} = {}",
            join_terms(&valid, " + "),
            valid.len(),
            format_number(result)
        ),
        format!(
            "Averaged {} valid of {} values",
            valid.len(),
            values.len()
        ),
    )
}

fn sum(values: &[Option<f64>]) -> ComputeOutput {
    let valid = valid_numbers(values);
    let total: f64 = valid.iter().sum();
    let formula = if valid.is_empty() {
        "sum() = 0".to_string()
    } else {
        format!("{} = {}", join_terms(&valid, " + "), format_number(total))
    };
    number(
        total,
        formula,
        format!("Summed {} valid of {} values", valid.len(), values.len()),
    )
}

fn count(values: &[Option<f64>]) -> ComputeOutput {
    let n = values.len();
    number(
        n as f64,
        format!("count = {}", n),
        format!("Counted {} items", n),
    )
}

fn extremum(values: &[Option<f64>], want_max: bool) -> ComputeOutput {
    let label = if want_max { "max" } else { "min" };
    let valid = valid_numbers(values);
    if valid.is_empty() {
        return number(
            0.0,
            format!("{}() = 0", label),
            format!("No valid values for {}; result defaults to 0", label),
        );
    }

    let result = valid
        .iter()
        .copied()
        .fold(if want_max { f64::NEG_INFINITY } else { f64::INFINITY }, |acc, v| {
            if want_max {
                acc.max(v)
            } else {
                acc.min(v)
            }
        });

    number(
        result,
        format!(
            "{}({}) = {}",
            label,
            join_terms(&valid, ", "),
            format_number(result)
        ),
        format!(
            "Took the {} of {} valid of {} values",
            label,
            valid.len(),
            values.len()
        ),
    )
}

fn compare(groups: &[GroupData]) -> ComputeOutput {
    let mut averages = Vec::with_capacity(groups.len());
    let mut skipped = Vec::new();
    let mut winner: Option<(&str, f64)> = None;

    for (position, group) in groups.iter().enumerate() {
        let valid = valid_numbers(&group.values);
        if valid.is_empty() {
            skipped.push(group.name.as_str());
            continue;
        }

        let average = round2(valid.iter().sum::<f64>() / valid.len() as f64);
        averages.push(GroupAverage {
            group: position,
            name: group.name.clone(),
            average,
        });

        // Strictly greater: on ties the earlier group keeps the lead.
        match winner {
            Some((_, best)) if average <= best => {}
            _ => winner = Some((group.name.as_str(), average)),
        }
    }

    let breakdown = averages
        .iter()
        .map(|g| format!("{}: {}", g.name, format_number(g.average)))
        .collect::<Vec<_>>()
        .join(", ");

    let formula = match winner {
        Some((name, best)) => format!("winner: {} ({})", name, format_number(best)),
        None => "winner: none".to_string(),
    };

    let mut details = if breakdown.is_empty() {
        "No group had valid values".to_string()
    } else {
        format!("Group averages: {}", breakdown)
    };
    if !skipped.is_empty() {
        details.push_str(&format!("; no valid values for {}", skipped.join(", ")));
    }

    ComputeOutput {
        result: ComputeValue::Comparison {
            averages,
            winner: winner.map(|(name, _)| name.to_string()),
        },
        formula,
        details,
    }
}
