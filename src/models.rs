//! Core data models for the query orchestrator

use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use tracing::warn;
use uuid::Uuid;

//
// ================= Plan =================
//

/// Ordered list of actions plus the model's rationale for them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Plan {
    #[serde(default)]
    pub reasoning: String,
    pub actions: Vec<Action>,
}

impl Plan {
    /// Ids of every fetch action, in declaration order.
    pub fn fetch_ids(&self) -> Vec<&str> {
        self.actions
            .iter()
            .filter_map(|action| match action {
                Action::Fetch { id, .. } => Some(id.as_str()),
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Action {
    Fetch {
        id: String,
        #[serde(default)]
        params: FetchParams,
        #[serde(default)]
        description: String,
    },
    Calculate {
        id: String,
        operation: CalcOperation,
        source: String,
        field: CalcField,
        #[serde(default)]
        description: String,
    },
    Compare {
        id: String,
        groups: Vec<CompareGroup>,
        #[serde(default)]
        description: String,
    },
}

impl Action {
    pub fn id(&self) -> &str {
        match self {
            Action::Fetch { id, .. }
            | Action::Calculate { id, .. }
            | Action::Compare { id, .. } => id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Action::Fetch { .. } => "fetch",
            Action::Calculate { .. } => "calculate",
            Action::Compare { .. } => "compare",
        }
    }
}

/// Query parameters for a fetch against the game catalogue.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FetchParams {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub platforms: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub genres: Vec<String>,
    #[serde(
        default,
        deserialize_with = "lenient_dates",
        skip_serializing_if = "Option::is_none"
    )]
    pub dates: Option<DateRange>,
    #[serde(
        default,
        deserialize_with = "lenient_score_range",
        skip_serializing_if = "Option::is_none"
    )]
    pub metacritic: Option<ScoreRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(default)]
    pub search_exact: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub developers: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publishers: Option<String>,
    #[serde(default)]
    pub exclude_additions: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ordering: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_page_size",
        skip_serializing_if = "Option::is_none"
    )]
    pub page_size: Option<u32>,
}

// Planners sometimes write RAWG's own query-string forms ("80,100",
// "2020-01-01,2020-12-31", "20"). Those are accepted; anything else unreadable
// is dropped so one bad optional filter never discards the whole fetch.

fn lenient_param<'de, D, T>(
    deserializer: D,
    param: &'static str,
    parse: fn(&Value) -> Option<T>,
) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.filter(|v| !v.is_null()).and_then(|value| {
        let parsed = parse(&value);
        if parsed.is_none() {
            warn!(param = param, value = %value, "Dropping unreadable fetch param");
        }
        parsed
    }))
}

fn lenient_dates<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<DateRange>, D::Error> {
    lenient_param(deserializer, "dates", |value: &Value| match value {
        Value::String(s) => {
            let (from, to) = s.split_once(',')?;
            let (from, to) = (from.trim(), to.trim());
            if from.is_empty() || to.is_empty() {
                return None;
            }
            Some(DateRange {
                from: from.to_string(),
                to: to.to_string(),
            })
        }
        other => serde_json::from_value(other.clone()).ok(),
    })
}

fn lenient_score_range<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<ScoreRange>, D::Error> {
    lenient_param(deserializer, "metacritic", |value: &Value| match value {
        Value::String(s) => {
            let (min, max) = s.split_once(',')?;
            let bound = |part: &str| -> Option<Option<u32>> {
                let part = part.trim();
                if part.is_empty() {
                    Some(None)
                } else {
                    part.parse().ok().map(Some)
                }
            };
            Some(ScoreRange {
                min: bound(min)?,
                max: bound(max)?,
            })
        }
        other => serde_json::from_value(other.clone()).ok(),
    })
}

fn lenient_page_size<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<u32>, D::Error> {
    lenient_param(deserializer, "page_size", |value: &Value| match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Inclusive release date range, `YYYY-MM-DD`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DateRange {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct ScoreRange {
    #[serde(default)]
    pub min: Option<u32>,
    #[serde(default)]
    pub max: Option<u32>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CalcOperation {
    Average,
    Sum,
    Count,
    Min,
    Max,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CalcField {
    Metacritic,
    Rating,
    RatingsCount,
}

impl CalcField {
    pub fn value(&self, record: &Record) -> Option<f64> {
        match self {
            CalcField::Metacritic => record.metacritic,
            CalcField::Rating => record.rating,
            CalcField::RatingsCount => record.ratings_count,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompareGroup {
    pub name: String,
    pub source: String,
    pub field: CompareField,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CompareField {
    Metacritic,
    Rating,
    Count,
}

impl CompareField {
    /// Per-record value. `Count` has none: it compares the fetch's total instead.
    pub fn value(&self, record: &Record) -> Option<f64> {
        match self {
            CompareField::Metacritic => record.metacritic,
            CompareField::Rating => record.rating,
            CompareField::Count => None,
        }
    }
}

impl fmt::Display for CalcOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CalcOperation::Average => "average",
            CalcOperation::Sum => "sum",
            CalcOperation::Count => "count",
            CalcOperation::Min => "min",
            CalcOperation::Max => "max",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for CalcField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CalcField::Metacritic => "metacritic",
            CalcField::Rating => "rating",
            CalcField::RatingsCount => "ratings_count",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for CompareField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CompareField::Metacritic => "metacritic",
            CompareField::Rating => "rating",
            CompareField::Count => "count",
        };
        write!(f, "{}", s)
    }
}

//
// ================= Records =================
//

/// One game as returned by the data source.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Record {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub released: Option<String>,
    #[serde(default)]
    pub metacritic: Option<f64>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub ratings_count: Option<f64>,
    #[serde(default)]
    pub platforms: Vec<String>,
    #[serde(default)]
    pub genres: Vec<String>,
}

/// Data-source reply for one fetch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FetchResponse {
    pub total_count: u64,
    pub records: Vec<Record>,
    pub echoed_params: Value,
}

//
// ================= Result Store =================
//

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FetchResult {
    pub records: Vec<Record>,
    pub total_count: u64,
    pub returned_count: usize,
    pub echoed_params: Value,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GroupAverage {
    /// Position of the group in the compare action's declaration.
    pub group: usize,
    pub name: String,
    pub average: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ComparisonResult {
    /// Per-group rounded averages, in declaration order. Groups without any
    /// valid value are omitted.
    pub averages: Vec<GroupAverage>,
    pub winner: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum ActionOutput {
    Fetch(FetchResult),
    Calculate(f64),
    Compare(ComparisonResult),
}

/// Per-run mapping from action id to that action's output.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ResultStore {
    entries: HashMap<String, ActionOutput>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, output: ActionOutput) {
        self.entries.insert(id.into(), output);
    }

    pub fn get(&self, id: &str) -> Option<&ActionOutput> {
        self.entries.get(id)
    }

    /// Looks up a fetch output. Derived outputs never resolve here.
    pub fn fetch(&self, id: &str) -> Option<&FetchResult> {
        match self.entries.get(id) {
            Some(ActionOutput::Fetch(result)) => Some(result),
            _ => None,
        }
    }

    /// Sorted ids of all stored fetch outputs.
    pub fn fetch_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, output)| matches!(output, ActionOutput::Fetch(_)))
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

//
// ================= Display Snapshot =================
//

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RecordView {
    pub name: String,
    pub released: Option<String>,
    pub metacritic: Option<f64>,
    pub rating: Option<f64>,
    pub ratings_count: Option<f64>,
    pub platforms: Vec<String>,
    pub genres: Vec<String>,
}

impl From<&Record> for RecordView {
    fn from(record: &Record) -> Self {
        Self {
            name: record.name.clone(),
            released: record.released.clone(),
            metacritic: record.metacritic,
            rating: record.rating,
            ratings_count: record.ratings_count,
            platforms: record.platforms.clone(),
            genres: record.genres.clone(),
        }
    }
}

/// A record's name with the single field value a computation read from it.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FieldValue {
    pub name: String,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GroupView {
    pub name: String,
    pub source: String,
    pub field: CompareField,
    pub values: Vec<f64>,
    pub average: Option<f64>,
    pub records: Vec<FieldValue>,
}

/// UI-oriented detail for one action; never read by other actions.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DisplaySnapshot {
    Fetch {
        description: String,
        total_count: u64,
        records: Vec<RecordView>,
    },
    Calculate {
        description: String,
        operation: CalcOperation,
        field: CalcField,
        result: f64,
        formula: String,
        details: String,
        values: Vec<f64>,
        records: Vec<FieldValue>,
    },
    Compare {
        description: String,
        formula: String,
        winner: Option<String>,
        groups: Vec<GroupView>,
    },
}

//
// ================= Progress Steps =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Thinking,
    Plan,
    ToolCall,
    ToolResult,
    Review,
    GeneratingAnswer,
    Answer,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Step {
    pub id: String,
    pub kind: StepKind,
    pub name: String,
    pub summary: String,
    pub details: Value,
    /// Unix milliseconds.
    pub timestamp: i64,
}

impl Step {
    pub fn new(
        kind: StepKind,
        name: impl Into<String>,
        summary: impl Into<String>,
        details: Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            name: name.into(),
            summary: summary.into(),
            details,
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}

//
// ================= Query Outcome =================
//

/// Final result of a query. On terminal failure `answer` holds the
/// user-facing explanation and `success` is false.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub success: bool,
    pub answer: String,
    pub steps: Vec<Step>,
    #[serde(default)]
    pub display: HashMap<String, Value>,
}

/// Streamed progress for a single query.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueryEvent {
    Step(Step),
    Answer {
        answer: String,
        display: HashMap<String, Value>,
    },
    Error {
        message: String,
    },
}
