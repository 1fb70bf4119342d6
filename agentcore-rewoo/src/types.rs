//! Data carried between ReWoo's phases.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// One sub-question proposed during the Sketch phase.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Sketch {
    /// Identifier unique within this run's sketch set.
    pub id: String,
    /// The sub-question or research step this sketch addresses.
    pub query: String,
    /// Tool to invoke for this sketch, when evidence requires a call.
    pub tool: Option<String>,
    /// Arguments for the tool, when `tool` is set.
    pub arguments: Option<Value>,
}

/// The outcome of gathering evidence for one sketch during the Work phase.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Evidence {
    /// Identifier unique within this run's evidence set.
    pub id: String,
    /// The sketch this evidence was gathered for.
    pub sketch_id: String,
    /// Name of the tool invoked, when the sketch specified one.
    pub tool_name: Option<String>,
    /// Input passed to the tool, when one was invoked.
    pub input: Option<Value>,
    /// Output the tool returned, when the call succeeded.
    pub output: Option<Value>,
    /// Description of why no output is present.
    pub error: Option<String>,
    /// How long gathering this evidence took.
    pub latency_ms: u64,
}

/// The synthesized answer produced by the Organize phase.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrganizeOutput {
    /// The synthesized answer.
    pub answer: String,
    /// Evidence ids the answer draws on.
    pub citations: Vec<String>,
    /// The model's confidence in this answer, clamped to `[0, 1]`.
    pub confidence: f64,
}

/// The closed set of phases a ReWoo run passes through.
///
/// A plain enum driven by a `match`, not a trait-object state pattern — the
/// phase set is closed and known ahead of time, same reasoning as
/// `StopReason`/`ExitReason` being plain enums elsewhere in this codebase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewooPhase {
    /// Proposing sketches.
    Sketch,
    /// Gathering evidence for each sketch.
    Work,
    /// Synthesizing an answer from evidence.
    Organize,
    /// Re-running Organize once with added constraints.
    Verify,
    /// Terminal: the run has produced its result.
    Done,
}

/// Errors a ReWoo phase can fail with fatally.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum RewooError {
    /// The Sketch phase proposed zero sketches.
    #[error("sketch phase produced no sketches")]
    NoSketches,

    /// Catch-all for other errors (provider failures, etc).
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}
