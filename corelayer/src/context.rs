//! The mutable vessel threaded through one strategy run.

use crate::config::ExecutionConfig;
use crate::step::ExecutionStep;
use crate::tool::ToolSummary;
use serde_json::Value;
use std::collections::HashMap;

/// Everything a strategy needs to run once, consumed by value.
///
/// Taking this by value rather than by reference is deliberate: it makes
/// "a run has exactly one owner" a compile-time fact rather than a
/// documented convention — a second concurrent run cannot share the same
/// context (§5).
#[derive(Debug, Clone)]
pub struct StrategyExecutionContext {
    /// The goal or user message driving this run.
    pub input: String,
    /// Tools available for this run to call.
    pub tools: Vec<ToolSummary>,
    /// Opaque caller-supplied context (identity, memory hints, etc).
    pub agent_context: Value,
    /// Resolved budgets and thresholds for this run.
    pub config: ExecutionConfig,
    /// Steps completed so far. Append-only (P1).
    pub history: Vec<ExecutionStep>,
    /// Arbitrary run-scoped metadata.
    pub metadata: HashMap<String, Value>,
}

impl StrategyExecutionContext {
    /// Start a fresh run with no history.
    pub fn new(input: impl Into<String>, tools: Vec<ToolSummary>, config: ExecutionConfig) -> Self {
        Self {
            input: input.into(),
            tools,
            agent_context: Value::Null,
            config,
            history: Vec::new(),
            metadata: HashMap::new(),
        }
    }

    /// Append a step to the history. The only mutation path — callers never
    /// reach into `history` to edit a prior entry.
    pub fn push_step(&mut self, step: ExecutionStep) {
        self.history.push(step);
    }

    /// Number of tool-call actions recorded so far, for budget checks.
    pub fn tool_calls_used(&self) -> u32 {
        self.history
            .iter()
            .filter(|s| matches!(s.result, Some(crate::action::ActionResult::ToolResult { .. })))
            .count() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_context_has_empty_history() {
        let ctx = StrategyExecutionContext::new("goal", Vec::new(), ExecutionConfig::default());
        assert!(ctx.history.is_empty());
        assert_eq!(ctx.tool_calls_used(), 0);
    }
}
