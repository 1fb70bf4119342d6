//! The ReAct strategy: Think → Act → Observe, generalized from the
//! teacher's `ReactOperator::execute` loop (turns → iterations, hook
//! dispatch → runtime instrumentation, inline tool dispatch → the batch
//! scheduler's sequential-of-one).

use crate::parser::parse_model_output;
use agentcore_runtime::{
    fingerprint, prompt::PromptMode, BudgetTracker, ComposedPrompt, FingerprintMatcher, PromptComposer,
    PromptRequest, Strategy, StrategyError,
};
use async_trait::async_trait;
use corelayer::{
    ActionResult, AgentAction, CompletionRequest, CoreEvent, ExecutionPatch, ExecutionResult, ExecutionStep,
    NoopNotifier, NoopSessionSink, Notifier, Provider, PromptMessage, ResultAnalysis, Role, SessionSink, StepId,
    StepKind, StrategyExecutionContext, StrategyKind, ThreadId, ToolCall, ToolExecutor,
};
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

const LOOP_DETECTION_WINDOW: usize = 5;

/// Think → Act → Observe over a model and a tool executor.
pub struct ReactStrategy<P: Provider> {
    provider: P,
    executor: Arc<dyn ToolExecutor>,
    notifier: Arc<dyn Notifier>,
    session: Arc<dyn SessionSink>,
    thread_id: ThreadId,
    identity: Option<String>,
    step_counter: AtomicU64,
}

impl<P: Provider> ReactStrategy<P> {
    /// Build a strategy with no session persistence or event emission.
    pub fn new(provider: P, executor: Arc<dyn ToolExecutor>) -> Self {
        Self {
            provider,
            executor,
            notifier: Arc::new(NoopNotifier),
            session: Arc::new(NoopSessionSink),
            thread_id: ThreadId::new("unthreaded"),
            identity: None,
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

    /// Set the identity/persona text included in every system prompt.
    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
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

    /// Carry out one chosen action and derive its observation. The third
    /// element is a fallback reason to attach as step metadata, when the
    /// action couldn't be carried out as requested.
    async fn act(
        &self,
        ctx: &StrategyExecutionContext,
        action: &AgentAction,
    ) -> (ActionResult, ResultAnalysis, Option<&'static str>) {
        match action {
            AgentAction::FinalAnswer { content } => {
                let result = ActionResult::FinalAnswer { content: content.clone() };
                let analysis = ResultAnalysis::from_result(&result);
                (result, analysis, None)
            }
            AgentAction::NeedMoreInfo { question } => {
                // The single-shot `execute` entry point has no channel to ask
                // the caller something and resume — a clarifying question is
                // the terminal output of this run, same as a final answer.
                let result = ActionResult::FinalAnswer { content: question.clone() };
                let analysis = ResultAnalysis::from_result(&result);
                (result, analysis, None)
            }
            AgentAction::ExecutePlan { plan_id } => {
                let result = ActionResult::FinalAnswer {
                    content: format!("plan execution ({plan_id}) is not supported by this strategy"),
                };
                let analysis = ResultAnalysis::from_result(&result);
                (result, analysis, None)
            }
            AgentAction::ToolCall { tool, arguments } => {
                let known = ctx.tools.iter().any(|t| &t.name == tool);
                if !known {
                    let available = ctx.tools.iter().map(|t| t.name.as_str()).collect::<Vec<_>>().join(", ");
                    let result = ActionResult::FinalAnswer {
                        content: format!("Tool \"{tool}\" is not available. Available tools: {available}"),
                    };
                    let analysis = ResultAnalysis::from_result(&result);
                    return (result, analysis, Some("tool_not_available"));
                }
                self.notifier.emit(CoreEvent::ToolExecuteRequest { tool_name: tool.clone(), input: arguments.clone() }).await;
                let call = ToolCall::new(self.next_step_id().as_str(), tool.clone(), arguments.clone());
                let result = match self.executor.invoke(&call, Some(&self.thread_id)).await {
                    Ok(result) => result,
                    Err(err) => ActionResult::Error { message: err.to_string() },
                };
                self.notifier
                    .emit(CoreEvent::ToolExecuteResponse {
                        tool_name: tool.clone(),
                        success: !result.is_error(),
                        correlation_id: call.id.to_string(),
                    })
                    .await;
                let analysis = ResultAnalysis::from_result(&result);
                (result, analysis, None)
            }
            other => {
                let result = ActionResult::FinalAnswer {
                    content: format!("action {other:?} is not supported by this strategy"),
                };
                let analysis = ResultAnalysis::from_result(&result);
                (result, analysis, None)
            }
        }
    }

    async fn report_step(&self, step: &ExecutionStep) {
        let patch = if step.result.as_ref().is_some_and(|r| r.is_error()) {
            ExecutionPatch { failed_steps: vec![step.id.to_string()], ..Default::default() }
        } else {
            ExecutionPatch { completed_steps: vec![step.id.to_string()], ..Default::default() }
        };
        if let Err(err) = self.session.update_execution(&self.thread_id, patch).await {
            tracing::warn!(thread = %self.thread_id, error = %err, "session update failed, continuing");
        }
    }

    fn forced_final_answer(&self, ctx: &StrategyExecutionContext) -> String {
        ctx.history
            .iter()
            .rev()
            .find_map(|step| match &step.result {
                Some(ActionResult::ToolResult { content, success: true }) => Some(content.to_string()),
                _ => None,
            })
            .unwrap_or_else(|| "Unable to reach a final answer within the available budget.".to_string())
    }

    async fn force_finalize(&self, ctx: &StrategyExecutionContext) -> Result<String, StrategyError> {
        let clean_history = PromptComposer::filter_contaminated_history(&ctx.history);
        let request = PromptRequest {
            input: &ctx.input,
            tools: &ctx.tools,
            history: &clean_history,
            identity: self.identity.as_deref(),
            mode: PromptMode::FinalAnswerForced,
        };
        let prompt = PromptComposer::compose(&request);
        let raw = self.call_model(&prompt).await?;
        let outcome = parse_model_output(&raw);
        match outcome.thought.action {
            AgentAction::FinalAnswer { content } => Ok(content),
            _ => Ok(self.forced_final_answer(ctx)),
        }
    }
}

#[async_trait]
impl<P: Provider> Strategy for ReactStrategy<P> {
    async fn run(&self, mut ctx: StrategyExecutionContext) -> Result<ExecutionResult, StrategyError> {
        let started = Instant::now();
        let mut tracker = BudgetTracker::start();
        let mut loop_guard = FingerprintMatcher::new(LOOP_DETECTION_WINDOW);
        let mut forced_final = false;

        let output = loop {
            if let Some(kind) = tracker.check(&ctx) {
                tracing::warn!(?kind, "budget exceeded, forcing finalization");
                forced_final = true;
                break self.force_finalize(&ctx).await?;
            }

            let clean_history = PromptComposer::filter_contaminated_history(&ctx.history);
            let request = PromptRequest {
                input: &ctx.input,
                tools: &ctx.tools,
                history: &clean_history,
                identity: self.identity.as_deref(),
                mode: PromptMode::Executor,
            };
            let prompt = PromptComposer::compose(&request);
            let raw = self.call_model(&prompt).await?;
            let outcome = parse_model_output(&raw);
            let mut thought = outcome.thought;

            let chosen_action = if thought.early_stopping.as_ref().is_some_and(|e| e.should_stop) {
                let reason = thought
                    .early_stopping
                    .as_ref()
                    .and_then(|e| e.reason.clone())
                    .unwrap_or_else(|| "model signalled early stopping".to_string());
                AgentAction::FinalAnswer { content: reason }
            } else if let Some(best) = thought.best_hypothesis() {
                best.action.clone()
            } else {
                thought.action.clone()
            };
            thought.action = chosen_action.clone();

            let fp = fingerprint(&chosen_action);
            let repeating = loop_guard.push(fp);

            let (result, analysis, fallback_reason) = self.act(&ctx, &chosen_action).await;

            let mut step = ExecutionStep {
                id: self.next_step_id(),
                kind: if matches!(chosen_action, AgentAction::ToolCall { .. }) { StepKind::Act } else { StepKind::Think },
                thought: Some(thought),
                result: Some(result.clone()),
                observation: Some(analysis.feedback.clone()),
                timestamp_ms: started.elapsed().as_millis() as u64,
                duration: started.elapsed(),
                metadata: [("parser_tier".to_string(), json!(format!("{:?}", outcome.tier)))].into_iter().collect(),
            };
            if let Some(reason) = fallback_reason {
                step = step.with_metadata("fallbackReason", json!(reason));
            }
            self.report_step(&step).await;
            ctx.push_step(step);
            tracker.record_iteration();

            if !analysis.should_continue {
                break match result {
                    ActionResult::FinalAnswer { content } => content,
                    _ => self.forced_final_answer(&ctx),
                };
            }

            if repeating {
                tracing::warn!("repeating action detected, forcing finalization");
                forced_final = true;
                break self.force_finalize(&ctx).await?;
            }
        };

        Ok(ExecutionResult {
            output: Some(output),
            strategy: StrategyKind::React,
            steps: ctx.history,
            success: true,
            error: None,
            execution_time: started.elapsed(),
            metadata: [("forcedFinal".to_string(), json!(forced_final))].into_iter().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corelayer::{ExecutionConfig, ExecutorError, ProviderCapabilities, ProviderError, ThreadId, ToolSummary};
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    struct ScriptedProvider {
        replies: Mutex<Vec<String>>,
    }

    impl ScriptedProvider {
        fn new(replies: Vec<&str>) -> Self {
            Self { replies: Mutex::new(replies.into_iter().rev().map(str::to_string).collect()) }
        }
    }

    impl Provider for ScriptedProvider {
        fn capabilities(&self) -> ProviderCapabilities {
            ProviderCapabilities::default()
        }

        async fn complete(&self, _request: CompletionRequest) -> Result<corelayer::CompletionResponse, ProviderError> {
            let mut replies = self.replies.lock().unwrap();
            let content = replies.pop().unwrap_or_else(|| {
                r#"{"reasoning":"out of script","confidence":0.1,"action":{"type":"final_answer","content":"done"}}"#
                    .to_string()
            });
            Ok(corelayer::CompletionResponse { content })
        }

        async fn generate_structured(&self, _request: CompletionRequest, _schema: serde_json::Value) -> Result<serde_json::Value, ProviderError> {
            Err(ProviderError::Unsupported)
        }

        async fn create_plan(&self, _goal: &str, _tools: &[ToolSummary]) -> Result<corelayer::Plan, ProviderError> {
            Err(ProviderError::Unsupported)
        }
    }

    struct CountingExecutor {
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl ToolExecutor for CountingExecutor {
        async fn invoke(&self, _call: &ToolCall, _thread_id: Option<&ThreadId>) -> Result<ActionResult, ExecutorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ActionResult::from_tool_output(json!({"ok": true})))
        }
    }

    fn ctx_with_tool() -> StrategyExecutionContext {
        let tools = vec![ToolSummary {
            name: "search".into(),
            description: "web search".into(),
            input_schema: json!({"type": "object"}),
        }];
        StrategyExecutionContext::new("find the answer", tools, ExecutionConfig::default())
    }

    #[tokio::test]
    async fn finishes_immediately_on_final_answer() {
        let provider = ScriptedProvider::new(vec![
            r#"{"reasoning":"I already know","confidence":0.9,"action":{"type":"final_answer","content":"42"}}"#,
        ]);
        let executor = Arc::new(CountingExecutor { calls: AtomicUsize::new(0) });
        let strategy = ReactStrategy::new(provider, executor.clone());
        let result = strategy.run(ctx_with_tool()).await.unwrap();
        assert_eq!(result.output.as_deref(), Some("42"));
        assert_eq!(executor.calls.load(Ordering::SeqCst), 0);
        assert!(result.success);
    }

    #[tokio::test]
    async fn runs_a_tool_then_finishes() {
        let provider = ScriptedProvider::new(vec![
            r#"{"reasoning":"need to search","confidence":0.7,"action":{"type":"tool_call","tool":"search","arguments":{"q":"rust"}}}"#,
            r#"{"reasoning":"got it","confidence":0.9,"action":{"type":"final_answer","content":"found it"}}"#,
        ]);
        let executor = Arc::new(CountingExecutor { calls: AtomicUsize::new(0) });
        let strategy = ReactStrategy::new(provider, executor.clone());
        let result = strategy.run(ctx_with_tool()).await.unwrap();
        assert_eq!(executor.calls.load(Ordering::SeqCst), 1);
        assert_eq!(result.output.as_deref(), Some("found it"));
        assert_eq!(result.complexity(), 2);
    }

    #[tokio::test]
    async fn unknown_tool_short_circuits_to_final_answer() {
        let provider = ScriptedProvider::new(vec![
            r#"{"reasoning":"oops","confidence":0.5,"action":{"type":"tool_call","tool":"ghost","arguments":{}}}"#,
        ]);
        let executor = Arc::new(CountingExecutor { calls: AtomicUsize::new(0) });
        let strategy = ReactStrategy::new(provider, executor.clone());
        let result = strategy.run(ctx_with_tool()).await.unwrap();
        assert_eq!(executor.calls.load(Ordering::SeqCst), 0);
        assert!(result.output.unwrap().contains("not available"));
        let step = result.steps.last().unwrap();
        assert_eq!(step.metadata.get("fallbackReason").and_then(|v| v.as_str()), Some("tool_not_available"));
    }

    #[tokio::test]
    async fn repeating_tool_call_forces_finalization() {
        let looping_reply = r#"{"reasoning":"again","confidence":0.5,"action":{"type":"tool_call","tool":"search","arguments":{"q":"same"}}}"#;
        let provider = ScriptedProvider::new(vec![looping_reply, looping_reply, looping_reply]);
        let executor = Arc::new(CountingExecutor { calls: AtomicUsize::new(0) });
        let mut config = ExecutionConfig::default();
        config.max_iterations = 50;
        let strategy = ReactStrategy::new(provider, executor.clone());
        let mut ctx = ctx_with_tool();
        ctx.config = config;
        let result = strategy.run(ctx).await.unwrap();
        assert!(result.metadata.get("forcedFinal").and_then(|v| v.as_bool()).unwrap_or(false));
    }

    #[tokio::test]
    async fn iteration_budget_forces_finalization() {
        let looping_reply = r#"{"reasoning":"keep going","confidence":0.5,"action":{"type":"tool_call","tool":"search","arguments":{"q":"x"}}}"#;
        let provider = ScriptedProvider::new(vec![looping_reply; 10]);
        let executor = Arc::new(CountingExecutor { calls: AtomicUsize::new(0) });
        let mut config = ExecutionConfig::default();
        config.max_iterations = 2;
        let strategy = ReactStrategy::new(provider, executor.clone());
        let mut ctx = ctx_with_tool();
        ctx.config = config;
        let result = strategy.run(ctx).await.unwrap();
        assert!(result.metadata.get("forcedFinal").and_then(|v| v.as_bool()).unwrap_or(false));
        assert!(executor.calls.load(Ordering::SeqCst) <= 2);
    }
}
