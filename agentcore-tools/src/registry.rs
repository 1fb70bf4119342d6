//! Object-safe tool abstraction and the registry that holds them.
//!
//! Adapted directly from `neuron-tool`'s `ToolDyn`/`ToolRegistry` pair:
//! same `Arc<dyn Trait>`-keyed-by-name shape, same object-safety test,
//! same overwrite-on-duplicate-register behavior.

use corelayer::ToolSummary;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Object-safe trait for tool implementations.
///
/// Any tool source (local function, MCP server, HTTP endpoint) implements
/// this trait. Tools are stored as `Arc<dyn Tool>` in [`ToolRegistry`].
pub trait Tool: Send + Sync {
    /// The tool's unique name.
    fn name(&self) -> &str;

    /// Human-readable description of what the tool does.
    fn description(&self) -> &str;

    /// JSON Schema for the tool's input parameters.
    fn input_schema(&self) -> serde_json::Value;

    /// Execute the tool with the given input and context.
    fn call(
        &self,
        input: serde_json::Value,
        ctx: &super::ToolContext,
    ) -> Pin<Box<dyn Future<Output = Result<serde_json::Value, ToolCallError>> + Send + '_>>;
}

/// Error a [`Tool::call`] implementation raises directly (distinct from
/// validation/not-found/timeout errors, which the invoker produces itself).
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct ToolCallError(pub String);

/// Registry of tools available to a strategy run.
///
/// Holds tools as `Arc<dyn Tool>` keyed by name. Read-mostly: mutated only
/// through `register`/`cleanup` (§5), looked up far more often than it is
/// written to.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { tools: HashMap::new() }
    }

    /// Register a tool. Overwrites any existing tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Remove every registered tool.
    pub fn cleanup(&mut self) {
        self.tools.clear();
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    /// Iterate over all registered tools.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Tool>> {
        self.tools.values()
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Summaries of every registered tool, for a prompt composer or planner.
    pub fn summaries(&self) -> Vec<ToolSummary> {
        self.tools
            .values()
            .map(|t| ToolSummary {
                name: t.name().to_string(),
                description: t.description().to_string(),
                input_schema: t.input_schema(),
            })
            .collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ToolContext;
    use serde_json::json;

    fn _assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn tool_is_object_safe() {
        _assert_send_sync::<Arc<dyn Tool>>();
    }

    struct EchoTool;

    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echoes input back"
        }
        fn input_schema(&self) -> serde_json::Value {
            json!({"type": "object"})
        }
        fn call(
            &self,
            input: serde_json::Value,
            _ctx: &ToolContext,
        ) -> Pin<Box<dyn Future<Output = Result<serde_json::Value, ToolCallError>> + Send + '_>> {
            Box::pin(async move { Ok(json!({"echoed": input})) })
        }
    }

    #[test]
    fn registry_add_and_get() {
        let mut reg = ToolRegistry::new();
        assert!(reg.is_empty());
        reg.register(Arc::new(EchoTool));
        assert_eq!(reg.len(), 1);
        assert!(reg.get("echo").is_some());
        assert!(reg.get("nonexistent").is_none());
    }

    #[test]
    fn registry_summaries_reflect_registered_tools() {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(EchoTool));
        let summaries = reg.summaries();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].name, "echo");
    }

    #[test]
    fn registry_overwrite() {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(EchoTool));
        reg.register(Arc::new(EchoTool));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn cleanup_empties_registry() {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(EchoTool));
        reg.cleanup();
        assert!(reg.is_empty());
    }
}
