//! The session/context-store seam (§6.3). Narrower than a generic
//! key-value `StateStore` — the three operations here are domain-shaped
//! patches, not generic gets/sets.

use crate::id::ThreadId;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// A patch to a thread's execution progress.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionPatch {
    /// Id of the step currently executing, if any.
    pub current_step: Option<String>,
    /// Name of the tool currently executing, if any.
    pub current_tool: Option<String>,
    /// Step ids newly completed since the last patch.
    pub completed_steps: Vec<String>,
    /// Step ids newly failed since the last patch.
    pub failed_steps: Vec<String>,
    /// The most recent error message, if any.
    pub last_error: Option<String>,
}

/// A point-in-time read of a thread's state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextSnapshot {
    /// The session this thread belongs to.
    pub session_id: Option<String>,
    /// Free-form thread state.
    pub state: HashMap<String, Value>,
    /// Recent messages, oldest first.
    pub messages: Vec<String>,
    /// Entities keyed by kind then id.
    pub entities: HashMap<String, HashMap<String, Value>>,
    /// The execution progress as last patched.
    pub execution: ExecutionPatch,
}

/// Errors from a [`SessionSink`] implementation.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SessionError {
    /// The write could not be completed.
    #[error("write failed: {0}")]
    WriteFailed(String),

    /// Catch-all for other errors.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// External session/context persistence, consumed best-effort.
///
/// Every caller of this trait is expected to log-and-swallow a returned
/// error rather than fail the run — see `agentcore-tools::ToolInvoker` and
/// `agentcore-runtime`'s step-boundary updates.
#[async_trait]
pub trait SessionSink: Send + Sync {
    /// Apply an execution-progress patch, keyed by `(thread_id, call_id)`
    /// for idempotence.
    async fn update_execution(&self, thread_id: &ThreadId, patch: ExecutionPatch) -> Result<(), SessionError>;

    /// Merge newly observed entities into the thread's entity table.
    async fn add_entities(
        &self,
        thread_id: &ThreadId,
        entities: HashMap<String, HashMap<String, Value>>,
    ) -> Result<(), SessionError>;

    /// Read the current snapshot for a thread.
    async fn get_context(&self, thread_id: &ThreadId) -> Result<ContextSnapshot, SessionError>;
}

/// A [`SessionSink`] that does nothing, for strategies and tests that don't
/// need persistence — mirrors `NullStateReader` in `neuron-op-react`'s
/// test suite.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSessionSink;

#[async_trait]
impl SessionSink for NoopSessionSink {
    async fn update_execution(&self, _thread_id: &ThreadId, _patch: ExecutionPatch) -> Result<(), SessionError> {
        Ok(())
    }

    async fn add_entities(
        &self,
        _thread_id: &ThreadId,
        _entities: HashMap<String, HashMap<String, Value>>,
    ) -> Result<(), SessionError> {
        Ok(())
    }

    async fn get_context(&self, _thread_id: &ThreadId) -> Result<ContextSnapshot, SessionError> {
        Ok(ContextSnapshot::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_sink_accepts_writes_and_returns_empty_snapshot() {
        let sink = NoopSessionSink;
        let thread = ThreadId::new("t1");
        sink.update_execution(&thread, ExecutionPatch::default()).await.unwrap();
        sink.add_entities(&thread, HashMap::new()).await.unwrap();
        let snap = sink.get_context(&thread).await.unwrap();
        assert!(snap.messages.is_empty());
    }
}
