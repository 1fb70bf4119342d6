//! The ReWoo strategy: Sketch → Work → Organize → optional Verify, driven
//! by an explicit [`RewooPhase`] enum rather than a trait-object state
//! pattern (see the module doc on [`RewooPhase`]). No single source file
//! models this three-phase shape directly; the per-phase mechanisms
//! (model dispatch, gated fan-out, prompt composition) are all reused from
//! elsewhere in this codebase.

use crate::parser::{parse_organize, parse_sketches};
use crate::types::{Evidence, OrganizeOutput, RewooError, RewooPhase, Sketch};
use agentcore_runtime::{prompt::PromptMode, ComposedPrompt, PromptComposer, PromptRequest, Strategy, StrategyError};
use agentcore_scheduler::run_gated;
use async_trait::async_trait;
use corelayer::{
    ActionResult, CompletionRequest, ExecutionPatch, ExecutionResult, ExecutionStep, NoopNotifier, NoopSessionSink,
    Notifier, Provider, PromptMessage, RewooConfig, Role, SessionSink, StepId, StepKind, StrategyExecutionContext,
    StrategyKind, ThreadId, ToolCall, ToolExecutor,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Sketch → Work → Organize → optional Verify over a model and a tool
/// executor.
pub struct RewooStrategy<P: Provider> {
    provider: P,
    executor: Arc<dyn ToolExecutor>,
    notifier: Arc<dyn Notifier>,
    session: Arc<dyn SessionSink>,
    thread_id: ThreadId,
    identity: Option<String>,
    config: RewooConfig,
    step_counter: AtomicU64,
}

impl<P: Provider> RewooStrategy<P> {
    /// Build a strategy with default tuning, no session persistence, and no
    /// event emission.
    pub fn new(provider: P, executor: Arc<dyn ToolExecutor>) -> Self {
        Self {
            provider,
            executor,
            notifier: Arc::new(NoopNotifier),
            session: Arc::new(NoopSessionSink),
            thread_id: ThreadId::new("unthreaded"),
            identity: None,
            config: RewooConfig::default(),
            step_counter: AtomicU64::new(0),
        }
    }

    /// Attach a real notifier.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Attach a real session sink.
    pub fn with_session(mut self, session: Arc<dyn SessionSink>) -> Self {
        self.session = session;
        self
    }

    /// Identify the session thread this run reports progress against.
    pub fn with_thread_id(mut self, thread_id: ThreadId) -> Self {
        self.thread_id = thread_id;
        self
    }

    /// Set the identity/persona text included in every prompt.
    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    /// Override the default `RewooConfig`.
    pub fn with_config(mut self, config: RewooConfig) -> Self {
        self.config = config;
        self
    }

    fn next_step_id(&self) -> StepId {
        let n = self.step_counter.fetch_add(1, Ordering::SeqCst);
        StepId::new(format!("step-{n}"))
    }

    async fn call_model(&self, prompt: &ComposedPrompt) -> Result<String, StrategyError> {
        let request = CompletionRequest {
            messages: vec![
                PromptMessage { role: Role::System, content: prompt.system.clone() },
                PromptMessage { role: Role::User, content: prompt.user.clone() },
            ],
            temperature: None,
            max_tokens: None,
        };
        let response = self
            .provider
            .complete(request)
            .await
            .map_err(|e| StrategyError::Other(Box::new(e)))?;
        Ok(response.content)
    }

    /// Propose sketches, preferring structured output, then a model plan,
    /// then a plain-text call parsed with the Sketch-phase cascade — the
    /// capability fallback order fixed in §6.1.
    async fn sketch(&self, ctx: &StrategyExecutionContext) -> Result<Vec<Sketch>, StrategyError> {
        let request = PromptRequest {
            input: &ctx.input,
            tools: &ctx.tools,
            history: &[],
            identity: self.identity.as_deref(),
            mode: PromptMode::Planner,
        };
        let prompt = PromptComposer::compose(&request);

        let caps = self.provider.capabilities();
        let raw_sketches = if caps.supports_structured {
            let schema = json!({
                "type": "object",
                "properties": {"sketches": {"type": "array"}},
                "required": ["sketches"]
            });
            let completion_request = CompletionRequest {
                messages: vec![
                    PromptMessage { role: Role::System, content: prompt.system.clone() },
                    PromptMessage { role: Role::User, content: prompt.user.clone() },
                ],
                temperature: None,
                max_tokens: None,
            };
            match self.provider.generate_structured(completion_request, schema).await {
                Ok(value) => parse_sketches(&value.to_string()),
                Err(_) => None,
            }
        } else if caps.supports_plan {
            match self.provider.create_plan(&ctx.input, &ctx.tools).await {
                Ok(plan) => Some(
                    plan.steps
                        .into_iter()
                        .map(|step| Sketch { id: step.id, query: step.description, tool: step.tool, arguments: step.arguments })
                        .collect(),
                ),
                Err(_) => None,
            }
        } else {
            None
        };

        let sketches = match raw_sketches {
            Some(s) if !s.is_empty() => s,
            _ => {
                let raw = self.call_model(&prompt).await?;
                parse_sketches(&raw).ok_or_else(|| StrategyError::Other(Box::new(RewooError::NoSketches)))?
            }
        };

        let top_k = self.config.top_k_sketches as usize;
        Ok(sketches.into_iter().take(top_k.max(1)).collect())
    }

    /// Gather evidence for every sketch, gated to `max_parallel_work`
    /// concurrent tool calls. A sketch with no tool produces evidence
    /// recording that nothing was invoked, never a panic or a dropped
    /// entry — "errors are recorded, not thrown" applies to missing tools
    /// too.
    async fn work(&self, sketches: &[Sketch]) -> Vec<Evidence> {
        let executor = self.executor.clone();
        let timeout = self.config.per_work_timeout;
        let thread_id = self.thread_id.clone();
        let items: Vec<_> = sketches
            .iter()
            .cloned()
            .map(|sketch| {
                let executor = executor.clone();
                let thread_id = thread_id.clone();
                move || gather_evidence(executor, sketch, timeout, Some(thread_id))
            })
            .collect();
        run_gated(self.config.max_parallel_work as usize, items).await
    }

    /// Synthesize an answer from evidence, preferring structured output and
    /// falling back to a plain-text call parsed with the Organize-phase
    /// cascade, and finally to a deterministic summary built straight from
    /// evidence when no parse tier succeeds.
    async fn organize(&self, ctx: &StrategyExecutionContext, evidence: &[Evidence], extra_constraint: Option<&str>) -> OrganizeOutput {
        let request = PromptRequest {
            input: &ctx.input,
            tools: &ctx.tools,
            history: &[],
            identity: self.identity.as_deref(),
            mode: PromptMode::Organizer,
        };
        let mut prompt = PromptComposer::compose(&request);
        prompt.user.push_str("\n\nEvidence:\n");
        prompt.user.push_str(&describe_evidence(evidence));
        if let Some(constraint) = extra_constraint {
            prompt.user.push_str("\n\n");
            prompt.user.push_str(constraint);
        }

        let caps = self.provider.capabilities();
        let parsed = if caps.supports_structured {
            let schema = json!({
                "type": "object",
                "properties": {
                    "answer": {"type": "string"},
                    "citations": {"type": "array"},
                    "confidence": {"type": "number"}
                },
                "required": ["answer"]
            });
            let completion_request = CompletionRequest {
                messages: vec![
                    PromptMessage { role: Role::System, content: prompt.system.clone() },
                    PromptMessage { role: Role::User, content: prompt.user.clone() },
                ],
                temperature: None,
                max_tokens: None,
            };
            match self.provider.generate_structured(completion_request, schema).await {
                Ok(value) => parse_organize(&value.to_string()),
                Err(_) => None,
            }
        } else {
            None
        };

        let mut output = match parsed {
            Some(o) => o,
            None => match self.call_model(&prompt).await {
                Ok(raw) => parse_organize(&raw).unwrap_or_else(|| summarize_evidence(evidence)),
                Err(_) => summarize_evidence(evidence),
            },
        };

        if self.config.require_evidence_anchors && output.citations.is_empty() {
            output.citations = evidence.iter().filter(|e| e.output.is_some()).take(6).map(|e| e.id.clone()).collect();
        }
        output
    }

    async fn report_step(&self, step: &ExecutionStep) {
        let patch = ExecutionPatch { completed_steps: vec![step.id.to_string()], ..Default::default() };
        if let Err(err) = self.session.update_execution(&self.thread_id, patch).await {
            tracing::warn!(thread = %self.thread_id, error = %err, "session update failed, continuing");
        }
    }
}

#[async_trait]
impl<P: Provider> Strategy for RewooStrategy<P> {
    async fn run(&self, mut ctx: StrategyExecutionContext) -> Result<ExecutionResult, StrategyError> {
        let started = Instant::now();
        let mut phase = RewooPhase::Sketch;
        let mut sketches = Vec::new();
        let mut evidence = Vec::new();
        let mut organized: Option<OrganizeOutput> = None;
        let mut verify_passes_used = 0u32;
        let mut fatal: Option<String> = None;

        loop {
            if started.elapsed() >= self.config.overall_timeout && phase != RewooPhase::Done {
                tracing::warn!("rewoo overall timeout elapsed, finalizing with what is available");
                phase = RewooPhase::Done;
            }

            match phase {
                RewooPhase::Sketch => match self.sketch(&ctx).await {
                    Ok(s) => {
                        let step = ExecutionStep::new(self.next_step_id(), StepKind::Sketch, started.elapsed().as_millis() as u64, started.elapsed())
                            .with_metadata("sketchCount", json!(s.len()));
                        self.report_step(&step).await;
                        ctx.push_step(step);
                        sketches = s;
                        phase = RewooPhase::Work;
                    }
                    Err(err) => {
                        fatal = Some(err.to_string());
                        phase = RewooPhase::Done;
                    }
                },
                RewooPhase::Work => {
                    evidence = self.work(&sketches).await;
                    let failures = evidence.iter().filter(|e| e.output.is_none()).count();
                    let step = ExecutionStep::new(self.next_step_id(), StepKind::Work, started.elapsed().as_millis() as u64, started.elapsed())
                        .with_metadata("evidenceCount", json!(evidence.len()))
                        .with_metadata("failureCount", json!(failures));
                    self.report_step(&step).await;
                    ctx.push_step(step);
                    phase = RewooPhase::Organize;
                }
                RewooPhase::Organize => {
                    let output = self.organize(&ctx, &evidence, None).await;
                    let step = ExecutionStep::new(self.next_step_id(), StepKind::Organize, started.elapsed().as_millis() as u64, started.elapsed())
                        .with_metadata("confidence", json!(output.confidence));
                    self.report_step(&step).await;
                    ctx.push_step(step);
                    let needs_verify = output.confidence < 0.5 && verify_passes_used < self.config.max_verify_passes;
                    organized = Some(output);
                    phase = if needs_verify { RewooPhase::Verify } else { RewooPhase::Done };
                }
                RewooPhase::Verify => {
                    verify_passes_used += 1;
                    let constraint = format!(
                        "A previous attempt scored low confidence ({:.2}); be more specific and cite evidence explicitly.",
                        organized.as_ref().map(|o| o.confidence).unwrap_or(0.0)
                    );
                    let output = self.organize(&ctx, &evidence, Some(&constraint)).await;
                    let step = ExecutionStep::new(self.next_step_id(), StepKind::Synthesize, started.elapsed().as_millis() as u64, started.elapsed())
                        .with_metadata("confidence", json!(output.confidence))
                        .with_metadata("verifyPass", json!(verify_passes_used));
                    self.report_step(&step).await;
                    ctx.push_step(step);
                    organized = Some(output);
                    phase = RewooPhase::Done;
                }
                RewooPhase::Done => break,
            }
        }

        let success = fatal.is_none();
        let output = organized.map(|o| o.answer);
        Ok(ExecutionResult {
            output,
            strategy: StrategyKind::Rewoo,
            steps: ctx.history,
            success,
            error: fatal,
            execution_time: started.elapsed(),
            metadata: [("verifyPassesUsed".to_string(), json!(verify_passes_used))].into_iter().collect(),
        })
    }
}

async fn gather_evidence(executor: Arc<dyn ToolExecutor>, sketch: Sketch, timeout: Duration, thread_id: Option<ThreadId>) -> Evidence {
    let started = Instant::now();
    let Some(tool) = sketch.tool.clone() else {
        return Evidence {
            id: format!("ev-{}", sketch.id),
            sketch_id: sketch.id,
            tool_name: None,
            input: None,
            output: None,
            error: Some("no tool specified for this sketch".to_string()),
            latency_ms: 0,
        };
    };
    let arguments = sketch.arguments.clone().unwrap_or(Value::Object(Default::default()));
    let call = ToolCall::new(sketch.id.clone(), tool.clone(), arguments.clone());
    let outcome = tokio::time::timeout(timeout, executor.invoke(&call, thread_id.as_ref())).await;
    let (output, error) = match outcome {
        Ok(Ok(ActionResult::ToolResult { content, success: true })) => (Some(content), None),
        Ok(Ok(ActionResult::ToolResult { content, success: false })) => (None, Some(format!("tool reported failure: {content}"))),
        Ok(Ok(other)) => (None, Some(format!("unexpected result for evidence gathering: {other:?}"))),
        Ok(Err(err)) => (None, Some(err.to_string())),
        Err(_elapsed) => (None, Some("evidence gathering timed out".to_string())),
    };
    Evidence {
        id: format!("ev-{}", sketch.id),
        sketch_id: sketch.id,
        tool_name: Some(tool),
        input: Some(arguments),
        output,
        error,
        latency_ms: started.elapsed().as_millis() as u64,
    }
}

fn describe_evidence(evidence: &[Evidence]) -> String {
    evidence
        .iter()
        .map(|e| match (&e.output, &e.error) {
            (Some(output), _) => format!("- [{}] {}: {output}", e.id, e.tool_name.as_deref().unwrap_or("none")),
            (None, Some(err)) => format!("- [{}] {}: error: {err}", e.id, e.tool_name.as_deref().unwrap_or("none")),
            (None, None) => format!("- [{}] no output", e.id),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn summarize_evidence(evidence: &[Evidence]) -> OrganizeOutput {
    let successful: Vec<&Evidence> = evidence.iter().filter(|e| e.output.is_some()).collect();
    if successful.is_empty() {
        return OrganizeOutput { answer: "Unable to gather usable evidence for this request.".to_string(), citations: Vec::new(), confidence: 0.0 };
    }
    let answer = successful.iter().map(|e| e.output.as_ref().unwrap().to_string()).collect::<Vec<_>>().join("; ");
    OrganizeOutput { answer, citations: successful.iter().map(|e| e.id.clone()).collect(), confidence: 0.2 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corelayer::{ExecutionConfig, ExecutorError, ProviderCapabilities, ProviderError, ToolSummary};
    use std::sync::Mutex;

    struct ScriptedProvider {
        replies: Mutex<Vec<String>>,
        caps: ProviderCapabilities,
    }

    impl ScriptedProvider {
        fn new(replies: Vec<&str>) -> Self {
            Self { replies: Mutex::new(replies.into_iter().rev().map(str::to_string).collect()), caps: ProviderCapabilities::default() }
        }
    }

    impl Provider for ScriptedProvider {
        fn capabilities(&self) -> ProviderCapabilities {
            self.caps
        }

        async fn complete(&self, _request: CompletionRequest) -> Result<corelayer::CompletionResponse, ProviderError> {
            let mut replies = self.replies.lock().unwrap();
            let content = replies.pop().unwrap_or_default();
            Ok(corelayer::CompletionResponse { content })
        }

        async fn generate_structured(&self, _request: CompletionRequest, _schema: Value) -> Result<Value, ProviderError> {
            Err(ProviderError::Unsupported)
        }

        async fn create_plan(&self, _goal: &str, _tools: &[ToolSummary]) -> Result<corelayer::Plan, ProviderError> {
            Err(ProviderError::Unsupported)
        }
    }

    struct EchoExecutor;

    #[async_trait::async_trait]
    impl ToolExecutor for EchoExecutor {
        async fn invoke(&self, call: &ToolCall, _thread_id: Option<&ThreadId>) -> Result<ActionResult, ExecutorError> {
            Ok(ActionResult::from_tool_output(json!({"tool": call.tool_name, "args": call.arguments})))
        }
    }

    fn ctx() -> StrategyExecutionContext {
        let tools = vec![ToolSummary { name: "search".into(), description: "web search".into(), input_schema: json!({"type": "object"}) }];
        StrategyExecutionContext::new("research the topic", tools, ExecutionConfig::default())
    }

    #[tokio::test]
    async fn full_pipeline_produces_an_answer() {
        let sketch_reply = json!({"sketches": [{"id": "s1", "query": "look it up", "tool": "search", "arguments": {"q": "rust"}}]}).to_string();
        let organize_reply = json!({"answer": "Rust is a systems language.", "citations": ["ev-s1"], "confidence": 0.9}).to_string();
        let provider = ScriptedProvider::new(vec![&sketch_reply, &organize_reply]);
        let strategy = RewooStrategy::new(provider, Arc::new(EchoExecutor));
        let result = strategy.run(ctx()).await.unwrap();
        assert!(result.success);
        assert_eq!(result.output.as_deref(), Some("Rust is a systems language."));
        assert_eq!(result.complexity(), 3);
    }

    #[tokio::test]
    async fn no_sketches_fails_the_run() {
        let provider = ScriptedProvider::new(vec!["not valid json at all"]);
        let strategy = RewooStrategy::new(provider, Arc::new(EchoExecutor));
        let result = strategy.run(ctx()).await.unwrap();
        assert!(!result.success);
        assert!(result.error.is_some());
    }

    #[tokio::test]
    async fn low_confidence_triggers_a_verify_pass() {
        let sketch_reply = json!({"sketches": [{"id": "s1", "query": "look it up", "tool": "search", "arguments": {}}]}).to_string();
        let low_confidence = json!({"answer": "maybe", "citations": [], "confidence": 0.1}).to_string();
        let better = json!({"answer": "definitely", "citations": ["ev-s1"], "confidence": 0.9}).to_string();
        let provider = ScriptedProvider::new(vec![&sketch_reply, &low_confidence, &better]);
        let strategy = RewooStrategy::new(provider, Arc::new(EchoExecutor));
        let result = strategy.run(ctx()).await.unwrap();
        assert_eq!(result.output.as_deref(), Some("definitely"));
        assert_eq!(result.metadata.get("verifyPassesUsed").and_then(|v| v.as_u64()), Some(1));
    }

    #[tokio::test]
    async fn missing_tool_sketch_records_evidence_without_invoking() {
        let evidence = gather_evidence(Arc::new(EchoExecutor), Sketch { id: "s1".into(), query: "q".into(), tool: None, arguments: None }, Duration::from_secs(1), None).await;
        assert!(evidence.output.is_none());
        assert!(evidence.error.is_some());
    }
}
