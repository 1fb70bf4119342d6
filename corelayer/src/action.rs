//! The reasoning/action/result tagged unions that cross every strategy boundary.

use crate::tool::is_error_result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What a strategy decided to do after one think step.
///
/// Intentionally a closed, tagged union rather than a dynamic JSON shape —
/// see the Design Notes on typed decoders over `Record<string, unknown>`
/// casts. `#[non_exhaustive]` leaves room for a future variant without
/// breaking existing `match` arms at a minor version bump.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentAction {
    /// Invoke a named tool with the given arguments.
    ToolCall {
        /// Name of the tool to invoke.
        tool: String,
        /// Arguments to pass to the tool.
        arguments: Value,
    },
    /// Conclude the run with a final answer.
    FinalAnswer {
        /// The answer content.
        content: String,
    },
    /// Ask the caller to supply more information before continuing.
    NeedMoreInfo {
        /// The clarifying question.
        question: String,
    },
    /// Hand off to a precomputed plan rather than reasoning step by step.
    ExecutePlan {
        /// Identifier of the plan to execute.
        plan_id: String,
    },
}

/// One candidate approach considered during a think step, with the
/// confidence the model assigned it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Hypothesis {
    /// Short description of the approach.
    pub approach: String,
    /// Confidence in `[0, 1]`, clamped on construction.
    pub confidence: f64,
    /// The action this hypothesis would take.
    pub action: AgentAction,
}

impl Hypothesis {
    /// Build a hypothesis, clamping confidence into `[0, 1]`.
    pub fn new(approach: impl Into<String>, confidence: f64, action: AgentAction) -> Self {
        Self {
            approach: approach.into(),
            confidence: clamp_confidence(confidence),
            action,
        }
    }
}

/// Signal from the model that it believes further iteration is unnecessary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct EarlyStopping {
    /// Whether the model believes the run should stop now.
    #[serde(rename = "shouldStop")]
    pub should_stop: bool,
    /// Why it believes that, when `should_stop` is true.
    pub reason: Option<String>,
}

/// The result of one think step: the model's reasoning, its chosen action,
/// and how confident it is.
///
/// `confidence` is always clamped to `[0, 1]` by every constructor here —
/// see P5. A missing confidence defaults to 0.5, not 0.0, since an absent
/// value is not evidence of low confidence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentThought {
    /// Free-form reasoning text.
    pub reasoning: String,
    /// The action selected for this step.
    pub action: AgentAction,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    /// Alternative approaches considered, if any.
    #[serde(default)]
    pub hypotheses: Vec<Hypothesis>,
    /// Self-critique of the chosen action, if the model produced one.
    pub reflection: Option<String>,
    /// Whether the model flagged this as a natural stopping point.
    #[serde(default, rename = "earlyStopping")]
    pub early_stopping: Option<EarlyStopping>,
}

impl AgentThought {
    /// Construct a thought, clamping confidence and normalizing a missing
    /// value to the neutral default of 0.5.
    pub fn new(reasoning: impl Into<String>, action: AgentAction, confidence: Option<f64>) -> Self {
        Self {
            reasoning: reasoning.into(),
            action,
            confidence: confidence.map(clamp_confidence).unwrap_or(0.5),
            hypotheses: Vec::new(),
            reflection: None,
            early_stopping: None,
        }
    }

    /// The hypothesis with the highest confidence, first-encountered wins
    /// on ties (B2).
    pub fn best_hypothesis(&self) -> Option<&Hypothesis> {
        self.hypotheses.iter().fold(None, |best, h| match best {
            None => Some(h),
            Some(b) if h.confidence > b.confidence => Some(h),
            Some(b) => Some(b),
        })
    }
}

fn clamp_confidence(raw: f64) -> f64 {
    if raw.is_nan() {
        0.5
    } else {
        raw.clamp(0.0, 1.0)
    }
}

/// Outcome of carrying out an `AgentAction`.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionResult {
    /// A tool ran; `success` additionally accounts for the result-level
    /// error predicate (§3), not just "the call didn't throw".
    ToolResult {
        /// The raw value the tool returned.
        content: Value,
        /// False when the content itself signals failure (is_error_result).
        success: bool,
    },
    /// The run concluded.
    FinalAnswer {
        /// The answer content.
        content: String,
    },
    /// Carrying out the action failed outright (tool threw, not found, etc).
    Error {
        /// Human-readable failure description.
        message: String,
    },
    /// The strategy determined it must replan before continuing.
    NeedsReplan,
}

impl ActionResult {
    /// Build a `ToolResult`, deriving `success` from the result-content
    /// error predicate so callers never need to re-run the check (P6).
    pub fn from_tool_output(content: Value) -> Self {
        let success = !is_error_result(&content);
        ActionResult::ToolResult { content, success }
    }

    /// Whether this result should be treated as a failure for the purposes
    /// of strategy decision-making.
    pub fn is_error(&self) -> bool {
        match self {
            ActionResult::ToolResult { success, .. } => !success,
            ActionResult::Error { .. } => true,
            ActionResult::FinalAnswer { .. } | ActionResult::NeedsReplan => false,
        }
    }
}

/// Deterministic read of an `ActionResult`, with no model call involved.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultAnalysis {
    /// Whether the run is now complete.
    pub is_complete: bool,
    /// Whether the action succeeded.
    pub is_successful: bool,
    /// Whether the strategy should keep iterating.
    pub should_continue: bool,
    /// Human-readable summary fed back into the next prompt.
    pub feedback: String,
    /// A suggested next action, when one is obvious from the result shape.
    pub suggested_next_action: Option<AgentAction>,
}

impl ResultAnalysis {
    /// Derive an analysis from an `ActionResult` with no model call.
    pub fn from_result(result: &ActionResult) -> Self {
        match result {
            ActionResult::FinalAnswer { .. } => ResultAnalysis {
                is_complete: true,
                is_successful: true,
                should_continue: false,
                feedback: "final answer produced".to_string(),
                suggested_next_action: None,
            },
            ActionResult::ToolResult { success, .. } => ResultAnalysis {
                is_complete: false,
                is_successful: *success,
                should_continue: true,
                feedback: if *success {
                    "tool call succeeded".to_string()
                } else {
                    "tool call returned an error result".to_string()
                },
                suggested_next_action: None,
            },
            ActionResult::Error { message } => ResultAnalysis {
                is_complete: false,
                is_successful: false,
                should_continue: true,
                feedback: format!("action failed: {message}"),
                suggested_next_action: None,
            },
            ActionResult::NeedsReplan => ResultAnalysis {
                is_complete: false,
                is_successful: false,
                should_continue: true,
                feedback: "replanning required".to_string(),
                suggested_next_action: None,
            },
        }
    }
}
