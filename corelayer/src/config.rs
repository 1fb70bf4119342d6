//! Budgets and thresholds shared by both strategies (§6.6).

use std::time::Duration;

/// Named limits a strategy run is bounded by.
///
/// Mirrors `OperatorConfig`'s all-optional-override-a-default shape: callers
/// construct one with [`ExecutionConfig::default`] and override only the
/// fields they care about.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionConfig {
    /// Maximum number of think/act/observe iterations (ReAct) or
    /// sketch-work-organize passes (ReWoo).
    pub max_iterations: u32,
    /// Maximum number of tool calls across the whole run.
    pub max_tool_calls: u32,
    /// Wall-clock budget for the entire run.
    pub max_execution_time: Duration,
    /// Per-iteration wall-clock budget.
    pub step_timeout: Duration,
    /// Whether tool input is validated against its schema before invocation.
    pub validate_schemas: bool,
    /// Per-tool-call timeout.
    pub tool_timeout: Duration,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            max_tool_calls: 20,
            max_execution_time: Duration::from_secs(300),
            step_timeout: Duration::from_secs(60),
            validate_schemas: true,
            tool_timeout: Duration::from_secs(60),
        }
    }
}

/// Overrides for [`ExecutionConfig`], merged onto the default the same way
/// `ReactOperator::resolve_config` layers a per-request override onto
/// `ReactConfig`'s defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionConfigOverride {
    /// See [`ExecutionConfig::max_iterations`].
    pub max_iterations: Option<u32>,
    /// See [`ExecutionConfig::max_tool_calls`].
    pub max_tool_calls: Option<u32>,
    /// See [`ExecutionConfig::max_execution_time`].
    pub max_execution_time: Option<Duration>,
    /// See [`ExecutionConfig::step_timeout`].
    pub step_timeout: Option<Duration>,
    /// See [`ExecutionConfig::validate_schemas`].
    pub validate_schemas: Option<bool>,
    /// See [`ExecutionConfig::tool_timeout`].
    pub tool_timeout: Option<Duration>,
}

impl ExecutionConfig {
    /// Merge an override onto this config's defaults, field by field.
    pub fn resolve(base: &ExecutionConfig, over: &ExecutionConfigOverride) -> ExecutionConfig {
        ExecutionConfig {
            max_iterations: over.max_iterations.unwrap_or(base.max_iterations),
            max_tool_calls: over.max_tool_calls.unwrap_or(base.max_tool_calls),
            max_execution_time: over.max_execution_time.unwrap_or(base.max_execution_time),
            step_timeout: over.step_timeout.unwrap_or(base.step_timeout),
            validate_schemas: over.validate_schemas.unwrap_or(base.validate_schemas),
            tool_timeout: over.tool_timeout.unwrap_or(base.tool_timeout),
        }
    }
}

/// ReWoo-specific tuning (§6.6), kept separate from [`ExecutionConfig`]
/// since nothing outside the ReWoo strategy reads it.
#[derive(Debug, Clone, PartialEq)]
pub struct RewooConfig {
    /// Maximum number of sketches proposed per run.
    pub top_k_sketches: u32,
    /// Maximum number of concurrent Work-phase tool calls.
    pub max_parallel_work: u32,
    /// Per-evidence timeout during the Work phase.
    pub per_work_timeout: Duration,
    /// Wall-clock budget for the whole run.
    pub overall_timeout: Duration,
    /// Maximum number of Verify retries of the Organize phase.
    pub max_verify_passes: u32,
    /// Whether Organize must cite at least one piece of evidence.
    pub require_evidence_anchors: bool,
}

impl Default for RewooConfig {
    fn default() -> Self {
        Self {
            top_k_sketches: 4,
            max_parallel_work: 4,
            per_work_timeout: Duration::from_secs(25),
            overall_timeout: Duration::from_secs(120),
            max_verify_passes: 1,
            require_evidence_anchors: true,
        }
    }
}
