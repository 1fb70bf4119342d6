#![deny(missing_docs)]
//! Bridges an external `tool.execute.request` event to the tool executor
//! and emits a matching `tool.execute.response`.
//!
//! Modeled on `neuron-hooks::HookRegistry`'s ordered-dispatch-with-
//! error-swallowing shape, specialized to the single request/response
//! pair this bridge needs rather than a general hook pipeline.

use corelayer::{ActionResult, CoreEvent, ExecutorError, Notifier, ThreadId, ToolCall, ToolExecutor};
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

/// An inbound request to execute a tool, as delivered by an external event
/// bus. `correlation_id` is carried straight through to the response.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolExecuteRequest {
    /// Name of the tool to invoke.
    pub tool_name: String,
    /// Arguments for the tool.
    pub input: Value,
    /// Correlation id from the originating event's metadata.
    pub correlation_id: String,
}

/// The response emitted back onto the event bus.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolExecuteResponse {
    /// Name of the tool that was invoked.
    pub tool_name: String,
    /// Whether the call succeeded.
    pub success: bool,
    /// The raw result content, when the call produced one.
    pub result: Option<Value>,
    /// Error description, when the call failed.
    pub error: Option<String>,
    /// The correlation id from the request.
    pub correlation_id: String,
}

/// Wires `tool.execute.request` to a [`ToolExecutor`] and emits
/// `tool.execute.response` through a [`Notifier`].
pub struct EventBridge {
    executor: Arc<dyn ToolExecutor>,
    notifier: Arc<dyn Notifier>,
}

impl EventBridge {
    /// Build a bridge over the given executor and notifier.
    pub fn new(executor: Arc<dyn ToolExecutor>, notifier: Arc<dyn Notifier>) -> Self {
        Self { executor, notifier }
    }

    /// Handle one request: invoke the tool, then emit a response event
    /// through the notifier. Delivery is fire-and-forget — a notifier
    /// failure is logged, never propagated back to the caller.
    pub async fn handle_request(&self, request: ToolExecuteRequest) -> ToolExecuteResponse {
        self.notifier
            .emit(CoreEvent::ToolExecuteRequest { tool_name: request.tool_name.clone(), input: request.input.clone() })
            .await;

        let call = ToolCall::new(request.correlation_id.clone(), request.tool_name.clone(), request.input.clone());
        let response = match self.executor.invoke(&call, None).await {
            Ok(ActionResult::ToolResult { content, success }) => ToolExecuteResponse {
                tool_name: request.tool_name.clone(),
                success,
                result: Some(content),
                error: None,
                correlation_id: request.correlation_id.clone(),
            },
            Ok(other) => ToolExecuteResponse {
                tool_name: request.tool_name.clone(),
                success: !other.is_error(),
                result: None,
                error: other.is_error().then(|| "action did not produce a tool result".to_string()),
                correlation_id: request.correlation_id.clone(),
            },
            Err(err) => ToolExecuteResponse {
                tool_name: request.tool_name.clone(),
                success: false,
                result: None,
                error: Some(describe(&err)),
                correlation_id: request.correlation_id.clone(),
            },
        };

        self.notifier
            .emit(CoreEvent::ToolExecuteResponse {
                tool_name: response.tool_name.clone(),
                success: response.success,
                correlation_id: response.correlation_id.clone(),
            })
            .await;

        response
    }
}

fn describe(err: &ExecutorError) -> String {
    warn!(error = %err, "tool execution failed in event bridge");
    err.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    struct EchoExecutor;
    #[async_trait]
    impl ToolExecutor for EchoExecutor {
        async fn invoke(&self, call: &ToolCall, _thread_id: Option<&ThreadId>) -> Result<ActionResult, ExecutorError> {
            Ok(ActionResult::from_tool_output(json!({"echo": call.arguments})))
        }
    }

    struct FailingExecutor;
    #[async_trait]
    impl ToolExecutor for FailingExecutor {
        async fn invoke(&self, call: &ToolCall, _thread_id: Option<&ThreadId>) -> Result<ActionResult, ExecutorError> {
            Err(ExecutorError::NotFound(call.tool_name.clone()))
        }
    }

    #[tokio::test]
    async fn successful_call_produces_success_response() {
        let bridge = EventBridge::new(Arc::new(EchoExecutor), Arc::new(corelayer::NoopNotifier));
        let response = bridge
            .handle_request(ToolExecuteRequest { tool_name: "echo".into(), input: json!({}), correlation_id: "cid-1".into() })
            .await;
        assert!(response.success);
        assert_eq!(response.correlation_id, "cid-1");
    }

    #[tokio::test]
    async fn failed_call_produces_error_response() {
        let bridge = EventBridge::new(Arc::new(FailingExecutor), Arc::new(corelayer::NoopNotifier));
        let response = bridge
            .handle_request(ToolExecuteRequest { tool_name: "missing".into(), input: json!({}), correlation_id: "cid-2".into() })
            .await;
        assert!(!response.success);
        assert!(response.error.is_some());
    }
}
