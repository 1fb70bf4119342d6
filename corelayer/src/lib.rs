#![deny(missing_docs)]
//! Domain model and protocol seams for the agentic execution core.
//!
//! This crate carries no behavior of its own beyond clamping/derivation on
//! construction — it defines the tagged unions (`AgentAction`,
//! `ActionResult`, `AgentThought`), the append-only trace (`ExecutionStep`,
//! `ExecutionResult`), and the seams concrete crates implement
//! (`ToolExecutor`, `Provider`, `SessionSink`, `Notifier`).

pub mod action;
pub mod config;
pub mod context;
pub mod event;
pub mod executor;
pub mod id;
pub mod provider;
pub mod session;
pub mod step;
pub mod tool;

pub use action::{ActionResult, AgentAction, AgentThought, EarlyStopping, Hypothesis, ResultAnalysis};
pub use config::{ExecutionConfig, ExecutionConfigOverride, RewooConfig};
pub use context::StrategyExecutionContext;
pub use event::{CoreEvent, NoopNotifier, Notifier};
pub use executor::{ExecutorError, ToolExecutor};
pub use id::{RunId, StepId, ThreadId, ToolCallId};
pub use provider::{
    CompletionRequest, CompletionResponse, Plan, PlanStep, Provider, ProviderCapabilities, ProviderError,
    PromptMessage, Role,
};
pub use session::{ContextSnapshot, ExecutionPatch, NoopSessionSink, SessionError, SessionSink};
pub use step::{ExecutionResult, ExecutionStep, StepKind, StrategyKind};
pub use tool::{is_error_result, DependencyKind, ToolCall, ToolDependency, ToolSummary};
