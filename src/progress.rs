//! Per-query progress log
//!
//! Each query owns one log. Steps are appended in emission order and, when a
//! sink is attached, forwarded to it immediately.

use crate::models::{QueryEvent, Step};
use tokio::sync::mpsc::UnboundedSender;

/// Receiver of streamed query events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: QueryEvent);
}

impl EventSink for UnboundedSender<QueryEvent> {
    fn emit(&self, event: QueryEvent) {
        // A dropped receiver means the client went away; the query still completes.
        let _ = self.send(event);
    }
}

pub struct ProgressLog<'a> {
    steps: Vec<Step>,
    sink: Option<&'a dyn EventSink>,
}

impl<'a> ProgressLog<'a> {
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            sink: None,
        }
    }

    pub fn with_sink(sink: &'a dyn EventSink) -> Self {
        Self {
            steps: Vec::new(),
            sink: Some(sink),
        }
    }

    pub fn record(&mut self, step: Step) {
        if let Some(sink) = self.sink {
            sink.emit(QueryEvent::Step(step.clone()));
        }
        self.steps.push(step);
    }

    /// Forward a terminal event without recording it as a step.
    pub fn finish(&self, event: QueryEvent) {
        if let Some(sink) = self.sink {
            sink.emit(event);
        }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn into_steps(self) -> Vec<Step> {
        self.steps
    }
}

impl Default for ProgressLog<'_> {
    fn default() -> Self {
        Self::new()
    }
}
