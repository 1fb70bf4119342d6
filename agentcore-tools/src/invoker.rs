//! Executes one tool call: lookup, schema validation, context enrichment,
//! timeout racing, and best-effort session/telemetry reporting.
//!
//! Grounded in `agent-flow::ToolOrchestrator::execute_step` for the
//! timeout-race shape, and in `layer0::state`'s "best-effort, swallow the
//! error" framing for the session-reporting steps.

use crate::registry::ToolRegistry;
use corelayer::{
    ActionResult, ContextSnapshot, ExecutionPatch, ExecutorError, NoopSessionSink, SessionSink, ThreadId, ToolCall,
    ToolExecutor,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info_span, warn, Instrument};

/// How many most-recent messages are carried into a tool's context.
const RECENT_MESSAGE_WINDOW: usize = 3;

/// Context passed to a tool's `call`, enriched with session state when a
/// thread id is available.
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    /// The thread this call belongs to, if any.
    pub thread_id: Option<ThreadId>,
    /// The session this thread belongs to, when known.
    pub session_id: Option<String>,
    /// Ids of steps already completed in this run.
    pub completed_steps: Vec<String>,
    /// Ids of steps already failed in this run.
    pub failed_steps: Vec<String>,
    /// The last few messages, oldest first.
    pub recent_messages: Vec<String>,
    /// Entities known for this thread, keyed by kind then id.
    pub entities: HashMap<String, HashMap<String, Value>>,
    /// A token the tool may poll/select on to notice cancellation.
    pub cancellation: CancellationToken,
}

/// Per-call overrides for an invocation.
#[derive(Debug, Clone, Default)]
pub struct InvokeOptions {
    /// Overrides the invoker's default per-call timeout.
    pub timeout: Option<Duration>,
    /// Correlation id for event-bridge and telemetry threading.
    pub correlation_id: Option<String>,
    /// The thread this call is made on behalf of, for session enrichment.
    pub thread_id: Option<ThreadId>,
    /// Cooperative cancellation for this specific call.
    pub cancellation: CancellationToken,
}

/// Executes tool calls against a [`ToolRegistry`], enforcing schema
/// validation and a per-call timeout, and reporting best-effort progress to
/// a [`SessionSink`].
pub struct ToolInvoker {
    registry: Arc<ToolRegistry>,
    session: Arc<dyn SessionSink>,
    default_timeout: Duration,
    validate_schemas: bool,
}

impl ToolInvoker {
    /// Build an invoker with no session persistence (`NoopSessionSink`).
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            session: Arc::new(NoopSessionSink),
            default_timeout: Duration::from_secs(60),
            validate_schemas: true,
        }
    }

    /// Attach a real session sink.
    pub fn with_session(mut self, session: Arc<dyn SessionSink>) -> Self {
        self.session = session;
        self
    }

    /// Override the default per-call timeout (§6.6 `toolTimeout`).
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Disable schema validation (§6.6 `validateSchemas`).
    pub fn without_schema_validation(mut self) -> Self {
        self.validate_schemas = false;
        self
    }

    /// Execute one call with full options.
    pub async fn invoke_with(&self, call: &ToolCall, opts: InvokeOptions) -> Result<ActionResult, ExecutorError> {
        let span = info_span!("tool.invoke", tool = %call.tool_name, call_id = %call.id);
        async {
            if let Some(thread_id) = &opts.thread_id {
                self.report_progress(thread_id, Some(call.id.as_str()), Some(&call.tool_name), &[], &[], None)
                    .await;
            }

            let tool = match self.registry.get(&call.tool_name) {
                Some(t) => t.clone(),
                None => return Err(ExecutorError::NotFound(call.tool_name.clone())),
            };

            if self.validate_schemas {
                if let Some(message) = validate_input(&tool.input_schema(), &call.arguments) {
                    return Err(ExecutorError::ValidationFailed {
                        tool: call.tool_name.clone(),
                        message,
                    });
                }
            }

            let ctx = self.build_context(&opts).await;

            let timeout = opts.timeout.unwrap_or(self.default_timeout);
            let outcome = tokio::time::timeout(timeout, tool.call(call.arguments.clone(), &ctx)).await;

            match outcome {
                Ok(Ok(value)) => {
                    if let Some(thread_id) = &opts.thread_id {
                        self.report_progress(thread_id, None, None, &[call.id.as_str().to_string()], &[], None)
                            .await;
                    }
                    Ok(ActionResult::from_tool_output(value))
                }
                Ok(Err(err)) => {
                    let message = err.0;
                    if let Some(thread_id) = &opts.thread_id {
                        self.report_progress(
                            thread_id,
                            None,
                            None,
                            &[],
                            &[call.id.as_str().to_string()],
                            Some(message.clone()),
                        )
                        .await;
                    }
                    Err(ExecutorError::ExecutionFailed {
                        tool: call.tool_name.clone(),
                        message,
                    })
                }
                Err(_elapsed) => {
                    if let Some(thread_id) = &opts.thread_id {
                        self.report_progress(
                            thread_id,
                            None,
                            None,
                            &[],
                            &[call.id.as_str().to_string()],
                            Some("timed out".to_string()),
                        )
                        .await;
                    }
                    Err(ExecutorError::Timeout(call.tool_name.clone()))
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Build the [`ToolContext`] for a call: enriched with session state
    /// (session id, recent messages, entity snapshot, completed/failed step
    /// ids) when `opts.thread_id` is set and the session read succeeds,
    /// falling back to the minimal context otherwise.
    async fn build_context(&self, opts: &InvokeOptions) -> ToolContext {
        let minimal = ToolContext {
            thread_id: opts.thread_id.clone(),
            cancellation: opts.cancellation.clone(),
            ..Default::default()
        };
        let Some(thread_id) = &opts.thread_id else {
            return minimal;
        };
        match self.session.get_context(thread_id).await {
            Ok(ContextSnapshot { session_id, messages, entities, execution, .. }) => ToolContext {
                thread_id: Some(thread_id.clone()),
                session_id,
                completed_steps: execution.completed_steps,
                failed_steps: execution.failed_steps,
                recent_messages: messages.into_iter().rev().take(RECENT_MESSAGE_WINDOW).rev().collect(),
                entities,
                cancellation: opts.cancellation.clone(),
            },
            Err(err) => {
                warn!(thread = %thread_id, error = %err, "session enrichment failed, using minimal context");
                minimal
            }
        }
    }

    async fn report_progress(
        &self,
        thread_id: &ThreadId,
        current_step: Option<&str>,
        current_tool: Option<&str>,
        completed: &[String],
        failed: &[String],
        last_error: Option<String>,
    ) {
        let patch = ExecutionPatch {
            current_step: current_step.map(str::to_string),
            current_tool: current_tool.map(str::to_string),
            completed_steps: completed.to_vec(),
            failed_steps: failed.to_vec(),
            last_error,
        };
        if let Err(err) = self.session.update_execution(thread_id, patch).await {
            warn!(thread = %thread_id, error = %err, "session update failed, continuing");
        }
    }
}

#[async_trait::async_trait]
impl ToolExecutor for ToolInvoker {
    async fn invoke(&self, call: &ToolCall, thread_id: Option<&ThreadId>) -> Result<ActionResult, ExecutorError> {
        let opts = InvokeOptions { thread_id: thread_id.cloned(), ..Default::default() };
        self.invoke_with(call, opts).await
    }
}

/// Checks the input against the schema's `required` list and, where a
/// property declares a `type`, that the supplied value's JSON kind matches.
/// This is not a full JSON Schema validator — it covers the shape of
/// validation failures the core needs to surface (missing/mistyped
/// parameters), matching the depth of validation a typical
/// tool-orchestrator performs before ever calling the tool.
fn validate_input(schema: &Value, input: &Value) -> Option<String> {
    let obj = input.as_object();
    let required = schema.get("required").and_then(Value::as_array);
    if let Some(required) = required {
        let mut missing = Vec::new();
        for name in required {
            if let Some(name) = name.as_str() {
                let present = obj.map(|o| o.contains_key(name)).unwrap_or(false);
                if !present {
                    missing.push(name.to_string());
                }
            }
        }
        if !missing.is_empty() {
            return Some(format!("missing required parameter(s): {}", missing.join(", ")));
        }
    }

    if let (Some(props), Some(obj)) = (schema.get("properties").and_then(Value::as_object), obj) {
        for (name, prop_schema) in props {
            let Some(value) = obj.get(name) else { continue };
            if let Some(expected) = prop_schema.get("type").and_then(Value::as_str) {
                if !json_type_matches(expected, value) {
                    return Some(format!("parameter {name} expected type {expected}"));
                }
            }
        }
    }

    None
}

fn json_type_matches(expected: &str, value: &Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Tool, ToolCallError};
    use serde_json::json;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex;

    struct EchoTool;
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "echoes"
        }
        fn input_schema(&self) -> Value {
            json!({"type": "object", "required": ["msg"], "properties": {"msg": {"type": "string"}}})
        }
        fn call(
            &self,
            input: Value,
            _ctx: &ToolContext,
        ) -> Pin<Box<dyn Future<Output = Result<Value, ToolCallError>> + Send + '_>> {
            Box::pin(async move { Ok(json!({"echoed": input})) })
        }
    }

    struct SlowTool;
    impl Tool for SlowTool {
        fn name(&self) -> &str {
            "slow"
        }
        fn description(&self) -> &str {
            "sleeps"
        }
        fn input_schema(&self) -> Value {
            json!({"type": "object"})
        }
        fn call(
            &self,
            _input: Value,
            _ctx: &ToolContext,
        ) -> Pin<Box<dyn Future<Output = Result<Value, ToolCallError>> + Send + '_>> {
            Box::pin(async move {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(json!({}))
            })
        }
    }

    fn registry_with(tool: Arc<dyn Tool>) -> Arc<ToolRegistry> {
        let mut reg = ToolRegistry::new();
        reg.register(tool);
        Arc::new(reg)
    }

    #[tokio::test]
    async fn invokes_registered_tool_successfully() {
        let invoker = ToolInvoker::new(registry_with(Arc::new(EchoTool)));
        let call = ToolCall::new("c1", "echo", json!({"msg": "hi"}));
        let result = invoker.invoke(&call, None).await.unwrap();
        assert!(!result.is_error());
    }

    #[tokio::test]
    async fn reports_not_found_for_unknown_tool() {
        let invoker = ToolInvoker::new(registry_with(Arc::new(EchoTool)));
        let call = ToolCall::new("c1", "missing", json!({}));
        let err = invoker.invoke(&call, None).await.unwrap_err();
        assert!(matches!(err, ExecutorError::NotFound(_)));
    }

    #[tokio::test]
    async fn rejects_missing_required_parameter() {
        let invoker = ToolInvoker::new(registry_with(Arc::new(EchoTool)));
        let call = ToolCall::new("c1", "echo", json!({}));
        let err = invoker.invoke(&call, None).await.unwrap_err();
        assert!(matches!(err, ExecutorError::ValidationFailed { .. }));
    }

    #[tokio::test]
    async fn skips_validation_when_disabled_for_valid_input() {
        let with_validation = ToolInvoker::new(registry_with(Arc::new(EchoTool)));
        let without_validation = ToolInvoker::new(registry_with(Arc::new(EchoTool))).without_schema_validation();
        let call = ToolCall::new("c1", "echo", json!({"msg": "hi"}));
        let a = with_validation.invoke(&call, None).await.unwrap();
        let b = without_validation.invoke(&call, None).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn times_out_slow_tools() {
        let invoker =
            ToolInvoker::new(registry_with(Arc::new(SlowTool))).with_default_timeout(Duration::from_millis(20));
        let call = ToolCall::new("c1", "slow", json!({}));
        let err = invoker.invoke(&call, None).await.unwrap_err();
        assert!(matches!(err, ExecutorError::Timeout(_)));
    }

    struct RecordingTool {
        seen: Mutex<Option<ToolContext>>,
    }

    impl Tool for RecordingTool {
        fn name(&self) -> &str {
            "recording"
        }
        fn description(&self) -> &str {
            "records the context it was called with"
        }
        fn input_schema(&self) -> Value {
            json!({"type": "object"})
        }
        fn call(
            &self,
            _input: Value,
            ctx: &ToolContext,
        ) -> Pin<Box<dyn Future<Output = Result<Value, ToolCallError>> + Send + '_>> {
            *self.seen.lock().unwrap() = Some(ctx.clone());
            Box::pin(async move { Ok(json!({})) })
        }
    }

    struct FakeSessionSink {
        snapshot: ContextSnapshot,
    }

    #[async_trait::async_trait]
    impl SessionSink for FakeSessionSink {
        async fn update_execution(&self, _thread_id: &ThreadId, _patch: ExecutionPatch) -> Result<(), corelayer::SessionError> {
            Ok(())
        }

        async fn add_entities(
            &self,
            _thread_id: &ThreadId,
            _entities: std::collections::HashMap<String, std::collections::HashMap<String, Value>>,
        ) -> Result<(), corelayer::SessionError> {
            Ok(())
        }

        async fn get_context(&self, _thread_id: &ThreadId) -> Result<ContextSnapshot, corelayer::SessionError> {
            Ok(self.snapshot.clone())
        }
    }

    #[tokio::test]
    async fn enriches_context_from_session_when_thread_id_is_present() {
        let snapshot = ContextSnapshot {
            session_id: Some("sess-1".to_string()),
            messages: vec!["m1".into(), "m2".into(), "m3".into(), "m4".into()],
            execution: ExecutionPatch { completed_steps: vec!["s1".into()], ..Default::default() },
            ..Default::default()
        };
        let tool = Arc::new(RecordingTool { seen: Mutex::new(None) });
        let mut reg = ToolRegistry::new();
        reg.register(tool.clone());
        let invoker = ToolInvoker::new(Arc::new(reg)).with_session(Arc::new(FakeSessionSink { snapshot }));
        let call = ToolCall::new("c1", "recording", json!({}));
        invoker.invoke(&call, Some(&ThreadId::new("t1"))).await.unwrap();
        let seen = tool.seen.lock().unwrap().clone().unwrap();
        assert_eq!(seen.session_id.as_deref(), Some("sess-1"));
        assert_eq!(seen.recent_messages, vec!["m2", "m3", "m4"]);
        assert_eq!(seen.completed_steps, vec!["s1".to_string()]);
    }

    #[tokio::test]
    async fn falls_back_to_minimal_context_when_session_enrichment_fails() {
        struct FailingSessionSink;
        #[async_trait::async_trait]
        impl SessionSink for FailingSessionSink {
            async fn update_execution(&self, _thread_id: &ThreadId, _patch: ExecutionPatch) -> Result<(), corelayer::SessionError> {
                Ok(())
            }
            async fn add_entities(
                &self,
                _thread_id: &ThreadId,
                _entities: std::collections::HashMap<String, std::collections::HashMap<String, Value>>,
            ) -> Result<(), corelayer::SessionError> {
                Ok(())
            }
            async fn get_context(&self, _thread_id: &ThreadId) -> Result<ContextSnapshot, corelayer::SessionError> {
                Err(corelayer::SessionError::WriteFailed("store unavailable".into()))
            }
        }
        let tool = Arc::new(RecordingTool { seen: Mutex::new(None) });
        let mut reg = ToolRegistry::new();
        reg.register(tool.clone());
        let invoker = ToolInvoker::new(Arc::new(reg)).with_session(Arc::new(FailingSessionSink));
        let call = ToolCall::new("c1", "recording", json!({}));
        invoker.invoke(&call, Some(&ThreadId::new("t1"))).await.unwrap();
        let seen = tool.seen.lock().unwrap().clone().unwrap();
        assert!(seen.session_id.is_none());
        assert!(seen.recent_messages.is_empty());
    }
}
