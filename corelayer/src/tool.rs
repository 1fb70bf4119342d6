//! Tool call and dependency types shared across the scheduler, invoker, and strategies.

use crate::id::ToolCallId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single requested invocation of a named tool with concrete arguments.
///
/// Immutable once constructed. Produced by a planner or a strategy's think
/// step; consumed by the invoker and the scheduler.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    /// Identity of this call, distinct from the tool's name.
    pub id: ToolCallId,
    /// Name of the tool to invoke.
    pub tool_name: String,
    /// Arguments to pass to the tool.
    pub arguments: Value,
}

impl ToolCall {
    /// Build a new tool call with a freshly assigned id.
    pub fn new(id: impl Into<ToolCallId>, tool_name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            tool_name: tool_name.into(),
            arguments,
        }
    }
}

/// Whether a dependency must be satisfied before a tool can run, or is
/// merely preferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyKind {
    /// The dependency must complete successfully before this tool runs.
    Required,
    /// The dependency runs first when present, but its absence does not
    /// raise this tool's phase.
    Optional,
}

/// One edge in the dependency graph over tool names.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDependency {
    /// The dependent tool's name.
    pub tool_name: String,
    /// Names of tools this one depends on.
    pub dependencies: Vec<String>,
    /// Whether the dependency is required or optional.
    pub kind: DependencyKind,
}

/// Enough about a registered tool for a prompt composer or planner to
/// describe it to a model, without exposing the callable itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolSummary {
    /// The tool's unique name.
    pub name: String,
    /// Human-readable description of what the tool does.
    pub description: String,
    /// JSON Schema for the tool's input parameters.
    pub input_schema: Value,
}

/// True when a successfully-returned tool result should nonetheless be
/// treated as an error by the calling layer.
///
/// Checks, in order: a top-level `isError: true`, a top-level
/// `successful: false`, or either of those nested one level down inside a
/// `result` field (the MCP convention). The rule is intentionally
/// conservative — absence of these markers means the result is not an
/// error, even if it looks unusual.
pub fn is_error_result(value: &Value) -> bool {
    fn flagged(v: &Value) -> bool {
        matches!(v.get("isError"), Some(Value::Bool(true)))
            || matches!(v.get("successful"), Some(Value::Bool(false)))
    }

    if flagged(value) {
        return true;
    }
    if let Some(nested) = value.get("result") {
        return flagged(nested);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn detects_top_level_is_error() {
        assert!(is_error_result(&json!({"isError": true})));
    }

    #[test]
    fn detects_top_level_successful_false() {
        assert!(is_error_result(&json!({"successful": false})));
    }

    #[test]
    fn detects_nested_mcp_style_result() {
        assert!(is_error_result(&json!({"result": {"isError": true}})));
        assert!(is_error_result(&json!({"result": {"successful": false}})));
    }

    #[test]
    fn plain_success_is_not_error() {
        assert!(!is_error_result(&json!({"data": 42})));
        assert!(!is_error_result(&json!({"result": {"data": 42}})));
    }

    #[test]
    fn is_error_result_is_deterministic() {
        let v = json!({"isError": true, "data": [1, 2, 3]});
        assert_eq!(is_error_result(&v), is_error_result(&v));
    }
}
