#![deny(missing_docs)]
//! Dependency resolution and batch scheduling of tool calls (C4 + C5).

mod batch;
mod resolver;

pub use batch::{run_gated, BatchScheduler, ConditionalStep, ParallelOptions, SchedulerError, ToolOutcome};
pub use resolver::{DependencyResolver, ResolvedPlan};
