//! The seam strategies use to carry out tool calls, without depending on
//! any concrete registry or invoker implementation.

use crate::action::ActionResult;
use crate::id::ThreadId;
use crate::tool::ToolCall;
use async_trait::async_trait;
use thiserror::Error;

/// Errors a [`ToolExecutor`] implementation can report.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// No tool is registered under the requested name.
    #[error("tool not found: {0}")]
    NotFound(String),

    /// Input failed schema validation before the tool was ever called.
    #[error("validation failed for {tool}: {message}")]
    ValidationFailed {
        /// Name of the tool whose input failed validation.
        tool: String,
        /// Human-readable description of what was wrong.
        message: String,
    },

    /// The call did not complete before its timeout.
    #[error("tool {0} timed out")]
    Timeout(String),

    /// The tool ran and raised an error.
    #[error("tool {tool} failed: {message}")]
    ExecutionFailed {
        /// Name of the tool that failed.
        tool: String,
        /// Error message from the tool.
        message: String,
    },

    /// Catch-all for other errors.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Executes a single [`ToolCall`] and returns its result as an
/// [`ActionResult`], folding in the result-content error predicate.
///
/// Strategies and the batch scheduler depend only on this trait, not on any
/// concrete registry — the concrete implementation (validation, timeout
/// racing, telemetry spans) lives in `agentcore-tools`.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Carry out one tool call, attributed to `thread_id` when the caller is
    /// running on behalf of a session thread (enables session-context
    /// enrichment and best-effort progress reporting downstream).
    async fn invoke(&self, call: &ToolCall, thread_id: Option<&ThreadId>) -> Result<ActionResult, ExecutorError>;
}
