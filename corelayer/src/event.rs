//! The best-effort event-emission seam (§6.4, §9's "Notifier seam").

use async_trait::async_trait;
use serde_json::Value;

/// An event emitted by the core as work progresses.
///
/// `#[non_exhaustive]` with a `Custom` escape hatch, the same
/// forward-compatibility device as `layer0::Effect::Custom`.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
pub enum CoreEvent {
    /// A tool call is about to be dispatched.
    ToolExecuteRequest {
        /// Name of the tool.
        tool_name: String,
        /// The input the tool will receive.
        input: Value,
    },
    /// A tool call completed, successfully or not.
    ToolExecuteResponse {
        /// Name of the tool.
        tool_name: String,
        /// Whether the call succeeded.
        success: bool,
        /// Correlation id tying this to the originating request.
        correlation_id: String,
    },
    /// A scheduling phase began.
    PhaseStart {
        /// 0-based phase index.
        phase: usize,
        /// Names of the tools entering this phase.
        tools: Vec<String>,
    },
    /// A scheduling phase completed successfully.
    PhaseSuccess {
        /// 0-based phase index.
        phase: usize,
    },
    /// A scheduling phase failed.
    PhaseError {
        /// 0-based phase index.
        phase: usize,
        /// Description of the failure.
        message: String,
    },
    /// Escape hatch for events not yet promoted to a named variant.
    Custom {
        /// The custom event type identifier.
        event_type: String,
        /// Arbitrary payload.
        data: Value,
    },
}

/// A fire-and-forget sink for [`CoreEvent`]s.
///
/// Infallible by design — an implementation that wants to report delivery
/// failures does so through its own telemetry, not by propagating a
/// `Result` back into the core. This is the literal reading of Design Note
/// §9: "wrap it in a Notifier seam that accepts a no-op implementation".
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Emit one event. Must not block the caller meaningfully; slow sinks
    /// should buffer or spawn internally.
    async fn emit(&self, event: CoreEvent);
}

/// A [`Notifier`] that discards every event, for strategies and tests that
/// don't need an event bus.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn emit(&self, _event: CoreEvent) {}
}
