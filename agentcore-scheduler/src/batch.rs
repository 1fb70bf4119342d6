//! Parallel / sequential / conditional / dependency-phased execution of
//! tool calls over a [`ToolExecutor`] (C5).
//!
//! The parallel-mode fan-out reuses the concurrent-dispatch shape of
//! `neuron-orch-local::LocalOrch::dispatch_many` (`tokio::spawn` +
//! `JoinHandle` collection), chunked and timeout-raced the way a
//! tool-orchestrator races `tokio::time::timeout` around a batch of steps.

use crate::resolver::DependencyResolver;
use corelayer::{ActionResult, CoreEvent, NoopNotifier, Notifier, ThreadId, ToolCall, ToolDependency, ToolExecutor};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{info, warn};

/// The per-tool outcome every scheduling mode returns, in submission order.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutcome {
    /// Name of the tool this outcome belongs to.
    pub tool_name: String,
    /// The result, when the call completed (successfully or not).
    pub result: Option<ActionResult>,
    /// A description of why no result is present, when `result` is `None`.
    pub error: Option<String>,
}

impl ToolOutcome {
    fn ok(tool_name: &str, result: ActionResult) -> Self {
        Self { tool_name: tool_name.to_string(), result: Some(result), error: None }
    }

    fn failed(tool_name: &str, error: impl Into<String>) -> Self {
        Self { tool_name: tool_name.to_string(), result: None, error: Some(error.into()) }
    }

    /// Whether this outcome represents a failure (no result, or a result
    /// that is itself an error per the §3 predicate).
    pub fn is_error(&self) -> bool {
        self.error.is_some() || self.result.as_ref().is_some_and(ActionResult::is_error)
    }
}

/// Errors the scheduler itself raises (distinct from a single tool's
/// failure, which is carried in a [`ToolOutcome`]).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// `failFast` aborted the whole call because one tool failed.
    #[error("fail-fast aborted on tool {tool}: {message}")]
    FailFastAborted {
        /// Name of the tool whose failure triggered the abort.
        tool: String,
        /// Description of the failure.
        message: String,
    },
    /// A required dependency in a dependency-phased run failed.
    #[error("required dependency {tool} failed: {message}")]
    RequiredDependencyFailed {
        /// Name of the failing required dependency.
        tool: String,
        /// Description of the failure.
        message: String,
    },
}

/// Tuning for the parallel and dependency-phased modes.
#[derive(Debug, Clone)]
pub struct ParallelOptions {
    /// Maximum number of tool calls in flight at once.
    pub concurrency: usize,
    /// Wall-clock budget per batch of `concurrency` calls.
    pub timeout: Duration,
    /// Abort the whole call as soon as any tool in a batch fails.
    pub fail_fast: bool,
}

impl Default for ParallelOptions {
    fn default() -> Self {
        Self { concurrency: 5, timeout: Duration::from_secs(60), fail_fast: false }
    }
}

/// One entry in a conditional run: the call to make, and the predicate
/// that decides whether the global condition state selects it.
pub struct ConditionalStep {
    /// The tool call this step would make.
    pub call: ToolCall,
    /// Evaluated against the run's shared condition state each iteration.
    pub predicate: Box<dyn Fn(&Value) -> bool + Send + Sync>,
}

/// Executes tool calls in parallel, sequential, conditional, or
/// dependency-phased mode over a shared [`ToolExecutor`].
pub struct BatchScheduler {
    executor: Arc<dyn ToolExecutor>,
    notifier: Arc<dyn Notifier>,
    thread_id: Option<ThreadId>,
}

impl BatchScheduler {
    /// Build a scheduler with no event emission (`NoopNotifier`) and no
    /// session thread attribution.
    pub fn new(executor: Arc<dyn ToolExecutor>) -> Self {
        Self { executor, notifier: Arc::new(NoopNotifier), thread_id: None }
    }

    /// Attach a real notifier.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Attribute every call this scheduler makes to a session thread, for
    /// context enrichment and progress reporting downstream.
    pub fn with_thread_id(mut self, thread_id: ThreadId) -> Self {
        self.thread_id = Some(thread_id);
        self
    }

    /// Run tools chunked into `opts.concurrency`-sized concurrent batches.
    pub async fn run_parallel(&self, tools: Vec<ToolCall>, opts: &ParallelOptions) -> Result<Vec<ToolOutcome>, SchedulerError> {
        let mut outcomes = Vec::with_capacity(tools.len());
        for (phase_idx, chunk) in tools.chunks(opts.concurrency.max(1)).enumerate() {
            let names: Vec<String> = chunk.iter().map(|c| c.tool_name.clone()).collect();
            self.notifier.emit(CoreEvent::PhaseStart { phase: phase_idx, tools: names }).await;

            let mut handles = Vec::with_capacity(chunk.len());
            for call in chunk {
                let executor = self.executor.clone();
                let thread_id = self.thread_id.clone();
                let call = call.clone();
                handles.push((
                    call.tool_name.clone(),
                    tokio::spawn(async move { executor.invoke(&call, thread_id.as_ref()).await }),
                ));
            }

            let batch_result = tokio::time::timeout(opts.timeout, async {
                let mut batch_outcomes = Vec::with_capacity(handles.len());
                for (name, handle) in handles {
                    let outcome = match handle.await {
                        Ok(Ok(result)) => ToolOutcome::ok(&name, result),
                        Ok(Err(err)) => ToolOutcome::failed(&name, err.to_string()),
                        Err(join_err) => ToolOutcome::failed(&name, format!("task panicked: {join_err}")),
                    };
                    batch_outcomes.push(outcome);
                }
                batch_outcomes
            })
            .await;

            let batch_outcomes = match batch_result {
                Ok(o) => o,
                Err(_elapsed) => {
                    warn!(phase = phase_idx, "parallel batch timed out");
                    chunk.iter().map(|c| ToolOutcome::failed(&c.tool_name, "batch timed out")).collect()
                }
            };

            let failure = batch_outcomes.iter().find(|o| o.is_error());
            if opts.fail_fast {
                if let Some(bad) = failure {
                    self.notifier
                        .emit(CoreEvent::PhaseError { phase: phase_idx, message: bad.error.clone().unwrap_or_default() })
                        .await;
                    return Err(SchedulerError::FailFastAborted {
                        tool: bad.tool_name.clone(),
                        message: bad.error.clone().unwrap_or_else(|| "result indicated failure".to_string()),
                    });
                }
            }
            self.notifier.emit(CoreEvent::PhaseSuccess { phase: phase_idx }).await;
            outcomes.extend(batch_outcomes);
        }
        Ok(outcomes)
    }

    /// Run tools one after another. When `pass_results` is set, the
    /// previous *successful* result is merged into the next call's
    /// arguments under `previousResult`.
    pub async fn run_sequential(
        &self,
        tools: Vec<ToolCall>,
        stop_on_error: bool,
        pass_results: bool,
    ) -> Vec<ToolOutcome> {
        let mut outcomes = Vec::with_capacity(tools.len());
        let mut previous_success: Option<Value> = None;
        for mut call in tools {
            if pass_results {
                if let Some(prev) = &previous_success {
                    if let Value::Object(map) = &mut call.arguments {
                        map.insert("previousResult".to_string(), prev.clone());
                    }
                }
            }
            let outcome = match self.executor.invoke(&call, self.thread_id.as_ref()).await {
                Ok(result) => {
                    if let ActionResult::ToolResult { content, success: true } = &result {
                        previous_success = Some(content.clone());
                    }
                    ToolOutcome::ok(&call.tool_name, result)
                }
                Err(err) => ToolOutcome::failed(&call.tool_name, err.to_string()),
            };
            let stop = stop_on_error && outcome.is_error();
            outcomes.push(outcome);
            if stop {
                break;
            }
        }
        outcomes
    }

    /// Repeatedly select tools whose predicate matches the shared condition
    /// state, running matches in parallel when `evaluate_all` is set or
    /// one at a time otherwise; falls back to `default_tool` when nothing
    /// matches. Guaranteed to terminate: each iteration removes at least
    /// one remaining tool or breaks.
    pub async fn run_conditional(
        &self,
        mut steps: Vec<ConditionalStep>,
        conditions: Value,
        evaluate_all: bool,
        default_tool: Option<String>,
    ) -> Vec<ToolOutcome> {
        let mut outcomes = Vec::new();
        loop {
            if steps.is_empty() {
                break;
            }
            let matched_idx: Vec<usize> = steps
                .iter()
                .enumerate()
                .filter(|(_, s)| (s.predicate)(&conditions))
                .map(|(i, _)| i)
                .collect();

            if matched_idx.is_empty() {
                let default_idx = default_tool
                    .as_ref()
                    .and_then(|name| steps.iter().position(|s| &s.call.tool_name == name));
                match default_idx {
                    Some(idx) => {
                        let step = steps.remove(idx);
                        outcomes.push(self.run_one(step.call).await);
                    }
                    None => break,
                }
                continue;
            }

            if evaluate_all {
                let batch: Vec<ConditionalStep> = take_indices(&mut steps, &matched_idx);
                let mut handles = Vec::with_capacity(batch.len());
                for step in batch {
                    let executor = self.executor.clone();
                    let thread_id = self.thread_id.clone();
                    let call = step.call;
                    handles.push((
                        call.tool_name.clone(),
                        tokio::spawn(async move { executor.invoke(&call, thread_id.as_ref()).await }),
                    ));
                }
                for (name, handle) in handles {
                    let outcome = match handle.await {
                        Ok(Ok(result)) => ToolOutcome::ok(&name, result),
                        Ok(Err(err)) => ToolOutcome::failed(&name, err.to_string()),
                        Err(join_err) => ToolOutcome::failed(&name, format!("task panicked: {join_err}")),
                    };
                    outcomes.push(outcome);
                }
            } else {
                let step = steps.remove(matched_idx[0]);
                outcomes.push(self.run_one(step.call).await);
            }
        }
        outcomes
    }

    /// Resolve dependency phases and run each phase with `run_parallel` in
    /// order, awaiting a phase fully before the next begins.
    pub async fn run_dependency_phased(
        &self,
        tools: Vec<ToolCall>,
        deps: Vec<ToolDependency>,
        opts: &ParallelOptions,
    ) -> Result<Vec<ToolOutcome>, SchedulerError> {
        let plan = DependencyResolver::resolve(&tools, &deps);
        for warning in &plan.warnings {
            warn!("{warning}");
        }
        let mut outcomes = Vec::with_capacity(tools.len());
        for phase in plan.phases {
            let phase_outcomes = self.run_parallel(phase, opts).await?;
            if opts.fail_fast {
                if let Some(bad) = phase_outcomes.iter().find(|o| o.is_error()) {
                    return Err(SchedulerError::RequiredDependencyFailed {
                        tool: bad.tool_name.clone(),
                        message: bad.error.clone().unwrap_or_else(|| "result indicated failure".to_string()),
                    });
                }
            }
            outcomes.extend(phase_outcomes);
        }
        Ok(outcomes)
    }

    async fn run_one(&self, call: ToolCall) -> ToolOutcome {
        match self.executor.invoke(&call, self.thread_id.as_ref()).await {
            Ok(result) => ToolOutcome::ok(&call.tool_name, result),
            Err(err) => ToolOutcome::failed(&call.tool_name, err.to_string()),
        }
    }
}

fn take_indices<T>(vec: &mut Vec<T>, indices: &[usize]) -> Vec<T> {
    let mut sorted = indices.to_vec();
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    let mut taken = Vec::with_capacity(sorted.len());
    for idx in sorted {
        taken.push(vec.remove(idx));
    }
    taken.reverse();
    taken
}

/// A bounded worker pool for the ReWoo Work phase's evidence gathering —
/// a semaphore-gated fan-out rather than fixed-size chunking, since Work
/// has no phase-ordering requirement the way dependency-phased mode does.
pub async fn run_gated<F, Fut, T>(max_concurrency: usize, items: Vec<F>) -> Vec<T>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: std::future::Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(max_concurrency.max(1)));
    let mut handles = Vec::with_capacity(items.len());
    for item in items {
        let permit = semaphore.clone();
        handles.push(tokio::spawn(async move {
            let _permit = permit.acquire_owned().await.expect("semaphore not closed");
            item().await
        }));
    }
    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        match handle.await {
            Ok(value) => results.push(value),
            Err(err) => {
                info!(error = %err, "gated task panicked");
            }
        }
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use corelayer::ExecutorError;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingExecutor {
        calls: Arc<AtomicUsize>,
        fail_on: Option<String>,
    }

    #[async_trait]
    impl ToolExecutor for CountingExecutor {
        async fn invoke(&self, call: &ToolCall, _thread_id: Option<&ThreadId>) -> Result<ActionResult, ExecutorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_on.as_deref() == Some(call.tool_name.as_str()) {
                return Err(ExecutorError::ExecutionFailed { tool: call.tool_name.clone(), message: "boom".into() });
            }
            Ok(ActionResult::from_tool_output(json!({"tool": call.tool_name})))
        }
    }

    fn call(name: &str) -> ToolCall {
        ToolCall::new(name, name, json!({}))
    }

    #[tokio::test]
    async fn parallel_runs_all_tools_in_submission_order() {
        let exec = Arc::new(CountingExecutor { calls: Arc::new(AtomicUsize::new(0)), fail_on: None });
        let sched = BatchScheduler::new(exec);
        let outcomes = sched
            .run_parallel(vec![call("a"), call("b"), call("c")], &ParallelOptions { concurrency: 2, ..Default::default() })
            .await
            .unwrap();
        let names: Vec<&str> = outcomes.iter().map(|o| o.tool_name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn parallel_fail_fast_aborts_on_first_failure() {
        let exec = Arc::new(CountingExecutor { calls: Arc::new(AtomicUsize::new(0)), fail_on: Some("b".into()) });
        let sched = BatchScheduler::new(exec);
        let err = sched
            .run_parallel(vec![call("a"), call("b"), call("c")], &ParallelOptions { concurrency: 3, fail_fast: true, ..Default::default() })
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulerError::FailFastAborted { .. }));
    }

    #[tokio::test]
    async fn sequential_passes_previous_result_forward() {
        struct EchoArgsExecutor;
        #[async_trait]
        impl ToolExecutor for EchoArgsExecutor {
            async fn invoke(&self, call: &ToolCall, _thread_id: Option<&ThreadId>) -> Result<ActionResult, ExecutorError> {
                Ok(ActionResult::from_tool_output(call.arguments.clone()))
            }
        }
        let sched = BatchScheduler::new(Arc::new(EchoArgsExecutor));
        let mut second = call("b");
        second.arguments = json!({});
        let outcomes = sched.run_sequential(vec![call("a"), second], false, true).await;
        let Some(ActionResult::ToolResult { content, .. }) = &outcomes[1].result else { panic!("expected tool result") };
        assert!(content.get("previousResult").is_some());
    }

    #[tokio::test]
    async fn sequential_stops_on_error_when_requested() {
        let exec = Arc::new(CountingExecutor { calls: Arc::new(AtomicUsize::new(0)), fail_on: Some("a".into()) });
        let sched = BatchScheduler::new(exec);
        let outcomes = sched.run_sequential(vec![call("a"), call("b")], true, false).await;
        assert_eq!(outcomes.len(), 1);
    }

    #[tokio::test]
    async fn conditional_falls_back_to_default_tool() {
        let exec = Arc::new(CountingExecutor { calls: Arc::new(AtomicUsize::new(0)), fail_on: None });
        let sched = BatchScheduler::new(exec);
        let steps = vec![ConditionalStep { call: call("fallback"), predicate: Box::new(|_| false) }];
        let outcomes = sched.run_conditional(steps, json!({}), false, Some("fallback".to_string())).await;
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].tool_name, "fallback");
    }

    #[tokio::test]
    async fn conditional_evaluate_all_runs_matches_concurrently() {
        struct SlowExecutor {
            calls: Arc<AtomicUsize>,
        }
        #[async_trait]
        impl ToolExecutor for SlowExecutor {
            async fn invoke(&self, call: &ToolCall, _thread_id: Option<&ThreadId>) -> Result<ActionResult, ExecutorError> {
                self.calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok(ActionResult::from_tool_output(json!({"tool": call.tool_name})))
            }
        }
        let calls = Arc::new(AtomicUsize::new(0));
        let sched = BatchScheduler::new(Arc::new(SlowExecutor { calls: calls.clone() }));
        let steps = vec![
            ConditionalStep { call: call("a"), predicate: Box::new(|_| true) },
            ConditionalStep { call: call("b"), predicate: Box::new(|_| true) },
            ConditionalStep { call: call("c"), predicate: Box::new(|_| true) },
        ];
        let started = std::time::Instant::now();
        let outcomes = sched.run_conditional(steps, json!({}), true, None).await;
        assert_eq!(outcomes.len(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(started.elapsed() < Duration::from_millis(150), "matches should run concurrently, not sequentially");
    }

    #[tokio::test]
    async fn conditional_terminates_when_nothing_matches_and_no_default() {
        let exec = Arc::new(CountingExecutor { calls: Arc::new(AtomicUsize::new(0)), fail_on: None });
        let sched = BatchScheduler::new(exec);
        let steps = vec![ConditionalStep { call: call("never"), predicate: Box::new(|_| false) }];
        let outcomes = sched.run_conditional(steps, json!({}), false, None).await;
        assert!(outcomes.is_empty());
    }

    #[tokio::test]
    async fn dependency_phased_awaits_each_phase_before_the_next() {
        let exec = Arc::new(CountingExecutor { calls: Arc::new(AtomicUsize::new(0)), fail_on: None });
        let sched = BatchScheduler::new(exec);
        let deps = vec![ToolDependency {
            tool_name: "b".to_string(),
            dependencies: vec!["a".to_string()],
            kind: corelayer::DependencyKind::Required,
        }];
        let outcomes = sched
            .run_dependency_phased(vec![call("a"), call("b")], deps, &ParallelOptions::default())
            .await
            .unwrap();
        assert_eq!(outcomes.len(), 2);
    }

    #[tokio::test]
    async fn single_tool_phase_is_mode_independent() {
        let exec_a = Arc::new(CountingExecutor { calls: Arc::new(AtomicUsize::new(0)), fail_on: None });
        let exec_b = Arc::new(CountingExecutor { calls: Arc::new(AtomicUsize::new(0)), fail_on: None });
        let sched_a = BatchScheduler::new(exec_a);
        let sched_b = BatchScheduler::new(exec_b);
        let parallel = sched_a.run_parallel(vec![call("solo")], &ParallelOptions::default()).await.unwrap();
        let sequential = sched_b.run_sequential(vec![call("solo")], false, false).await;
        assert_eq!(parallel[0].tool_name, sequential[0].tool_name);
        assert_eq!(parallel[0].result, sequential[0].result);
    }
}
