#![deny(missing_docs)]
//! Tool registry and invoker: validation, timeout racing, result-error
//! detection, and session/telemetry reporting around a single tool call.

mod invoker;
mod registry;

pub use invoker::{InvokeOptions, ToolContext, ToolInvoker};
pub use registry::{Tool, ToolRegistry};
