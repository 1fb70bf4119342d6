//! Budget enforcement shared by both strategies (C6), following the same
//! checked-after-each-iteration pattern as `ReactOperator::execute`'s
//! `max_turns`/`max_cost`/`max_duration` checks.

use corelayer::StrategyExecutionContext;
use std::time::Instant;
use thiserror::Error;

/// Which named limit was breached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetKind {
    /// `max_iterations` was reached.
    Iterations,
    /// `max_tool_calls` was reached.
    ToolCalls,
    /// `max_execution_time` elapsed.
    ExecutionTime,
}

/// Errors the strategy runtime can raise outright (as opposed to budget
/// breaches, which trigger forced finalization rather than an error).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The model's output could not be interpreted by any parser tier.
    #[error("failed to parse model output: {0}")]
    ParseFailed(String),

    /// Catch-all for other errors.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Tracks a run's start time and checks it against the context's
/// configured budgets after each iteration.
pub struct BudgetTracker {
    started_at: Instant,
    iterations: u32,
}

impl BudgetTracker {
    /// Start tracking a run from now.
    pub fn start() -> Self {
        Self { started_at: Instant::now(), iterations: 0 }
    }

    /// Record that one iteration completed.
    pub fn record_iteration(&mut self) {
        self.iterations += 1;
    }

    /// Time elapsed since the tracker started.
    pub fn elapsed(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }

    /// Check all three budgets, returning the first one that is breached.
    pub fn check(&self, ctx: &StrategyExecutionContext) -> Option<BudgetKind> {
        if self.iterations >= ctx.config.max_iterations {
            return Some(BudgetKind::Iterations);
        }
        if ctx.tool_calls_used() >= ctx.config.max_tool_calls {
            return Some(BudgetKind::ToolCalls);
        }
        if self.elapsed() >= ctx.config.max_execution_time {
            return Some(BudgetKind::ExecutionTime);
        }
        None
    }
}
