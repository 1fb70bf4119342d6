//! Produces system/user prompts for a strategy from tools, history, and
//! identity (C9). No I/O, no model calls — a pure function over its input.

use corelayer::{ActionResult, ExecutionStep, ToolSummary};

/// Which kind of prompt is being composed, determining the expected output
/// shape described to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptMode {
    /// ReAct's per-iteration think step.
    Executor,
    /// ReWoo's Sketch phase.
    Planner,
    /// ReWoo's Organize phase.
    Organizer,
    /// A forced-finalization pass (C6).
    FinalAnswerForced,
}

/// Input to [`PromptComposer::compose`].
pub struct PromptRequest<'a> {
    /// The goal or user message driving the run.
    pub input: &'a str,
    /// Tools available for this run.
    pub tools: &'a [ToolSummary],
    /// Prior steps, already filtered for contamination by the caller.
    pub history: &'a [ExecutionStep],
    /// Free-form identity/persona text, if any.
    pub identity: Option<&'a str>,
    /// Which prompt shape to produce.
    pub mode: PromptMode,
}

/// A composed system/user prompt pair.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedPrompt {
    /// The system prompt.
    pub system: String,
    /// The user-turn prompt.
    pub user: String,
}

/// Builds prompts describing available tools, recent history, and the
/// expected response shape for a given [`PromptMode`].
pub struct PromptComposer;

impl PromptComposer {
    /// Compose a system/user prompt pair. Pure: no I/O, no async.
    pub fn compose(req: &PromptRequest<'_>) -> ComposedPrompt {
        let mut system = String::new();
        if let Some(identity) = req.identity {
            system.push_str(identity);
            system.push_str("\n\n");
        }
        system.push_str(&Self::describe_tools(req.tools));
        system.push_str("\n\n");
        system.push_str(Self::expected_shape(req.mode));

        let mut user = String::new();
        user.push_str("Goal: ");
        user.push_str(req.input);
        user.push('\n');
        if !req.history.is_empty() {
            user.push_str("\nRecent history:\n");
            user.push_str(&Self::describe_history(req.history));
        }
        if req.mode == PromptMode::FinalAnswerForced {
            user.push_str("\nYou MUST provide a final_answer now.\n");
        }

        ComposedPrompt { system, user }
    }

    fn describe_tools(tools: &[ToolSummary]) -> String {
        if tools.is_empty() {
            return "No tools are available for this run.".to_string();
        }
        let mut out = String::from("Available tools:\n");
        for tool in tools {
            out.push_str(&format!("- {}: {}\n", tool.name, tool.description));
            if let Some(props) = tool.input_schema.get("properties").and_then(|p| p.as_object()) {
                let required: Vec<&str> = tool
                    .input_schema
                    .get("required")
                    .and_then(|r| r.as_array())
                    .map(|arr| arr.iter().filter_map(|v| v.as_str()).collect())
                    .unwrap_or_default();
                for (name, schema) in props {
                    let ty = schema.get("type").and_then(|t| t.as_str()).unwrap_or("any");
                    let flag = if required.contains(&name.as_str()) { "required" } else { "optional" };
                    let default = schema
                        .get("default")
                        .map(|d| format!(", default={d}"))
                        .unwrap_or_default();
                    out.push_str(&format!("    {name} ({ty}, {flag}{default})\n"));
                }
            }
        }
        out
    }

    fn describe_history(history: &[ExecutionStep]) -> String {
        history
            .iter()
            .rev()
            .take(6)
            .rev()
            .map(|step| match &step.result {
                Some(ActionResult::Error { message }) => format!("- {:?}: error: {message}", step.kind),
                Some(result) if result.is_error() => format!("- {:?}: failed", step.kind),
                Some(_) => format!("- {:?}: ok", step.kind),
                None => format!("- {:?}", step.kind),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn expected_shape(mode: PromptMode) -> &'static str {
        match mode {
            PromptMode::Executor => {
                "Respond with JSON: {reasoning, confidence, hypotheses, reflection, earlyStopping, action}."
            }
            PromptMode::Planner => "Respond with JSON: {sketches: [{id, query, tool, arguments}]}.",
            PromptMode::Organizer => "Respond with JSON: {answer, citations, confidence}.",
            PromptMode::FinalAnswerForced => "Respond with JSON: {action: {type: \"final_answer\", content}}.",
        }
    }

    /// Entries whose reasoning begins with `"Previous execution:"` or whose
    /// final-answer content says `"Previous execution completed"` are
    /// contaminated history from a prior run and must not be fed back into
    /// prompt context (§4.5).
    pub fn filter_contaminated_history(history: &[ExecutionStep]) -> Vec<ExecutionStep> {
        history
            .iter()
            .filter(|step| {
                let reasoning_contaminated =
                    step.thought.as_ref().is_some_and(|t| t.reasoning.starts_with("Previous execution:"));
                let answer_contaminated = matches!(
                    &step.result,
                    Some(ActionResult::FinalAnswer { content }) if content.contains("Previous execution completed")
                );
                !reasoning_contaminated && !answer_contaminated
            })
            .cloned()
            .collect()
    }
}
