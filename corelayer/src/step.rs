//! The append-only execution trace and the run-level result it produces.

use crate::action::{ActionResult, AgentThought};
use crate::id::StepId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

/// What kind of work a step represents.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// A reasoning step (ReAct's Think).
    Think,
    /// Carrying out a chosen action (ReAct's Act).
    Act,
    /// Reading back the outcome of an action (ReAct's Observe).
    Observe,
    /// Producing a plan (ReWoo's Sketch).
    Plan,
    /// Carrying out one item of a plan.
    Execute,
    /// Combining results into a final answer (ReWoo's Organize).
    Synthesize,
    /// ReWoo's Sketch phase, named distinctly for trace readability.
    Sketch,
    /// ReWoo's Work phase.
    Work,
    /// ReWoo's Organize phase.
    Organize,
}

/// One entry in a run's append-only history.
///
/// Strategies never mutate a step after appending it (P1) — later
/// corrections become a new step, not an edit to an old one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionStep {
    /// Unique id of this step.
    pub id: StepId,
    /// What kind of step this is.
    pub kind: StepKind,
    /// The thought that produced this step, if any.
    pub thought: Option<AgentThought>,
    /// The outcome of carrying out the step's action, if any.
    pub result: Option<ActionResult>,
    /// Free-form observation text derived from `result`.
    pub observation: Option<String>,
    /// Milliseconds since the run started.
    pub timestamp_ms: u64,
    /// How long this step took to produce.
    pub duration: Duration,
    /// Arbitrary step-scoped metadata (parser tier used, fallback reason, ...).
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl ExecutionStep {
    /// Build a new step with empty metadata.
    pub fn new(id: StepId, kind: StepKind, timestamp_ms: u64, duration: Duration) -> Self {
        Self {
            id,
            kind,
            thought: None,
            result: None,
            observation: None,
            timestamp_ms,
            duration,
            metadata: HashMap::new(),
        }
    }

    /// Attach a metadata entry, returning `self` for chaining.
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// Which strategy produced a run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Think → Act → Observe.
    React,
    /// Sketch → Work → Organize.
    Rewoo,
}

/// The terminal artifact of a strategy run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionResult {
    /// The final answer text, when the run produced one.
    pub output: Option<String>,
    /// Which strategy produced this result.
    pub strategy: StrategyKind,
    /// The full append-only step trace, in order.
    pub steps: Vec<ExecutionStep>,
    /// Whether the run produced a final answer, independent of whether
    /// every individual step succeeded.
    pub success: bool,
    /// Top-level failure description, when `success` is false.
    pub error: Option<String>,
    /// Total wall-clock time the run took.
    pub execution_time: Duration,
    /// Arbitrary run-scoped metadata (e.g. `forced_final: true`).
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl ExecutionResult {
    /// Number of steps recorded — the run's complexity measure.
    pub fn complexity(&self) -> usize {
        self.steps.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complexity_matches_step_count() {
        let r = ExecutionResult {
            output: Some("done".into()),
            strategy: StrategyKind::React,
            steps: vec![
                ExecutionStep::new(StepId::new("s1"), StepKind::Think, 0, Duration::ZERO),
                ExecutionStep::new(StepId::new("s2"), StepKind::Act, 1, Duration::ZERO),
            ],
            success: true,
            error: None,
            execution_time: Duration::from_millis(5),
            metadata: HashMap::new(),
        };
        assert_eq!(r.complexity(), 2);
    }
}
