#![deny(missing_docs)]
//! # agentcore — umbrella crate
//!
//! Single import surface for the agentic execution core. Re-exports each
//! sub-crate behind a feature flag, plus a `prelude` for the happy path:
//! pick a [`corelayer::Provider`], a tool executor from `agentcore-tools`,
//! and a reasoning strategy from `agentcore-react` or `agentcore-rewoo`.

#[cfg(feature = "core")]
pub use agentcore_events;
#[cfg(feature = "react")]
pub use agentcore_react;
#[cfg(feature = "rewoo")]
pub use agentcore_rewoo;
#[cfg(feature = "core")]
pub use agentcore_runtime;
#[cfg(feature = "core")]
pub use agentcore_scheduler;
#[cfg(feature = "core")]
pub use agentcore_tools;
#[cfg(feature = "core")]
pub use corelayer;

/// Happy-path imports for composing an agentic run.
pub mod prelude {
    #[cfg(feature = "core")]
    pub use corelayer::{
        ActionResult, AgentAction, AgentThought, ExecutionConfig, ExecutionResult, ExecutionStep,
        Provider, ProviderCapabilities, ProviderError, StrategyExecutionContext, StrategyKind,
        ToolCall, ToolExecutor, ToolSummary,
    };

    #[cfg(feature = "core")]
    pub use agentcore_tools::{InvokeOptions, Tool, ToolInvoker, ToolRegistry};

    #[cfg(feature = "core")]
    pub use agentcore_scheduler::{BatchScheduler, DependencyResolver, ParallelOptions};

    #[cfg(feature = "core")]
    pub use agentcore_events::EventBridge;

    #[cfg(feature = "core")]
    pub use agentcore_runtime::{BudgetTracker, Strategy, StrategyError};

    #[cfg(feature = "react")]
    pub use agentcore_react::ReactStrategy;

    #[cfg(feature = "rewoo")]
    pub use agentcore_rewoo::RewooStrategy;
}
