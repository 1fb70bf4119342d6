//! The object-safe boundary both strategies implement — the same
//! one-method-atomic-boundary shape as `layer0::Operator`.

use async_trait::async_trait;
use corelayer::{ExecutionResult, StrategyExecutionContext};
use thiserror::Error;

/// Errors a [`Strategy::run`] call can return outright.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum StrategyError {
    /// The runtime's budget/parse error propagated up as fatal.
    #[error("{0}")]
    Runtime(#[from] crate::budget::RuntimeError),

    /// Catch-all for other errors.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// A reasoning strategy: consumes a fresh run context and produces a
/// terminal [`ExecutionResult`].
///
/// `ReactStrategy<P: Provider>` and `RewooStrategy<P: Provider>` are each
/// generic over the non-object-safe `Provider` trait and implement this
/// trait via `#[async_trait]` — callers that need to hold strategies of
/// different concrete `P` behind one value use `Arc<dyn Strategy>`.
#[async_trait]
pub trait Strategy: Send + Sync {
    /// Run to completion: budget exhaustion, loop detection, and parser
    /// failures are all handled internally and reflected in the returned
    /// result rather than surfaced as an `Err` — `Err` is reserved for
    /// failures the runtime cannot recover from at all.
    async fn run(&self, ctx: StrategyExecutionContext) -> Result<ExecutionResult, StrategyError>;
}
