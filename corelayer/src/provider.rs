//! The language-model adapter seam (§6.1).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use thiserror::Error;

/// A role-tagged message in a conversation sent to the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromptMessage {
    /// Who produced this message.
    pub role: Role,
    /// The message text.
    pub content: String,
}

/// Message author.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The system prompt.
    System,
    /// The end user or calling strategy.
    User,
    /// A prior model response.
    Assistant,
}

/// A raw completion request.
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    /// The conversation so far, system message first.
    pub messages: Vec<PromptMessage>,
    /// Sampling temperature, when the provider supports it.
    pub temperature: Option<f32>,
    /// Maximum tokens to generate, when the provider supports it.
    pub max_tokens: Option<u32>,
}

/// A raw completion response.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionResponse {
    /// The model's reply text.
    pub content: String,
}

/// One step of a model-proposed plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanStep {
    /// Identifier unique within the plan.
    pub id: String,
    /// Human-readable description of the step.
    pub description: String,
    /// Tool to invoke for this step, if any.
    pub tool: Option<String>,
    /// Arguments for the tool, if any.
    pub arguments: Option<Value>,
}

/// A model-proposed plan, returned by [`Provider::create_plan`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Plan {
    /// The model's reasoning behind the plan.
    pub reasoning: String,
    /// The ordered steps of the plan.
    pub steps: Vec<PlanStep>,
}

/// What a provider can do beyond plain-text completion, probed once at
/// construction rather than through runtime reflection (Design Note §9).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProviderCapabilities {
    /// Whether [`Provider::generate_structured`] is implemented.
    pub supports_structured: bool,
    /// Whether [`Provider::create_plan`] is implemented.
    pub supports_plan: bool,
}

/// Errors a [`Provider`] can report.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The underlying request failed (network, API error, etc).
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// The provider does not implement the requested capability.
    #[error("unsupported capability")]
    Unsupported,

    /// The response could not be interpreted.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Catch-all for other errors.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// The language-model adapter the core consumes.
///
/// Deliberately not object-safe: `complete`/`generate_structured`/
/// `create_plan` return `impl Future` (RPITIT) rather than a boxed future,
/// trading dyn-compatibility for a zero-cost generic boundary. Callers that
/// need to hold different concrete providers behind one value do so at the
/// `Strategy` layer (`Arc<dyn Strategy>`), not here.
pub trait Provider: Send + Sync {
    /// Capabilities available on this provider, checked once by callers
    /// before choosing which of `complete`/`generate_structured`/
    /// `create_plan` to prefer.
    fn capabilities(&self) -> ProviderCapabilities;

    /// Raw text completion.
    fn complete(
        &self,
        request: CompletionRequest,
    ) -> impl Future<Output = Result<CompletionResponse, ProviderError>> + Send;

    /// Generate a value conforming to `schema`. Returns
    /// `ProviderError::Unsupported` when `capabilities().supports_structured`
    /// is false.
    fn generate_structured(
        &self,
        request: CompletionRequest,
        schema: Value,
    ) -> impl Future<Output = Result<Value, ProviderError>> + Send;

    /// Produce a plan rather than a single next action. Returns
    /// `ProviderError::Unsupported` when `capabilities().supports_plan` is
    /// false.
    fn create_plan(
        &self,
        goal: &str,
        tools: &[crate::tool::ToolSummary],
    ) -> impl Future<Output = Result<Plan, ProviderError>> + Send;
}
