//! Multi-tier parsing of a model's think-step reply into an [`AgentThought`].
//!
//! A pipeline of pure, independently-testable decoders tried in order
//! (Design Note §9): strict JSON, JSON inside a fenced code block, a
//! manual regex extraction, and a zero-confidence fallback that always
//! succeeds.

use corelayer::{AgentAction, AgentThought};
use regex::Regex;

/// Which parser tier produced a thought, recorded in step metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserTier {
    /// Tier (a): strict structured JSON.
    Strict,
    /// Tier (b): JSON extracted from a fenced code block.
    Fenced,
    /// Tier (c): manual regex extraction of individual fields.
    Regex,
    /// Tier (d): zero-confidence final-answer fallback.
    Fallback,
}

/// The result of running the parser cascade: the thought plus which tier
/// produced it.
pub struct ParseOutcome {
    /// The parsed (or synthesized) thought.
    pub thought: AgentThought,
    /// Which tier produced it.
    pub tier: ParserTier,
}

/// Try each tier in order; tier (d) always succeeds, so this never fails.
pub fn parse_model_output(raw: &str) -> ParseOutcome {
    if let Some(thought) = parse_strict(raw) {
        return ParseOutcome { thought, tier: ParserTier::Strict };
    }
    if let Some(thought) = parse_fenced(raw) {
        return ParseOutcome { thought, tier: ParserTier::Fenced };
    }
    if let Some(thought) = parse_regex(raw) {
        return ParseOutcome { thought, tier: ParserTier::Regex };
    }
    ParseOutcome { thought: fallback(raw), tier: ParserTier::Fallback }
}

fn parse_strict(raw: &str) -> Option<AgentThought> {
    serde_json::from_str(raw.trim()).ok()
}

fn parse_fenced(raw: &str) -> Option<AgentThought> {
    let start_marker = "```json";
    let start = raw.find(start_marker)? + start_marker.len();
    let rest = &raw[start..];
    let end = rest.find("```")?;
    serde_json::from_str(rest[..end].trim()).ok()
}

fn parse_regex(raw: &str) -> Option<AgentThought> {
    let reasoning = capture(raw, r#""?reasoning"?\s*[:=]\s*"([^"]*)""#)?;
    let has_tool_type = capture(raw, r#""type"\s*[:=]\s*"tool_call""#).is_some();
    let tool_name = capture(raw, r#""?(?:tool|toolName)"?\s*[:=]\s*"([a-zA-Z0-9_]+)""#);

    let action = if has_tool_type || tool_name.is_some() {
        let tool = tool_name?;
        let input = capture(raw, r#""?input"?\s*[:=]\s*(\{[^}]*\})"#)
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or(serde_json::json!({}));
        AgentAction::ToolCall { tool, arguments: input }
    } else {
        let content = capture(raw, r#""?content"?\s*[:=]\s*"([^"]*)""#)?;
        AgentAction::FinalAnswer { content }
    };

    Some(AgentThought::new(reasoning, action, None))
}

fn capture(raw: &str, pattern: &str) -> Option<String> {
    Regex::new(pattern).ok()?.captures(raw)?.get(1).map(|m| m.as_str().to_string())
}

fn fallback(raw: &str) -> AgentThought {
    AgentThought::new(
        format!("could not interpret model output: {raw}"),
        AgentAction::FinalAnswer {
            content: "I was unable to determine a next action from the model's response.".to_string(),
        },
        Some(0.0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_tier_parses_well_formed_json() {
        let raw = r#"{"reasoning":"r","confidence":0.8,"action":{"type":"final_answer","content":"done"}}"#;
        let outcome = parse_model_output(raw);
        assert_eq!(outcome.tier, ParserTier::Strict);
        assert_eq!(outcome.thought.confidence, 0.8);
    }

    #[test]
    fn fenced_tier_parses_json_inside_code_block() {
        let raw = "Here is my answer:\n```json\n{\"reasoning\":\"r\",\"confidence\":0.5,\"action\":{\"type\":\"final_answer\",\"content\":\"done\"}}\n```\n";
        let outcome = parse_model_output(raw);
        assert_eq!(outcome.tier, ParserTier::Fenced);
    }

    #[test]
    fn regex_tier_extracts_tool_call_fields() {
        let raw = r#"reasoning: "need to search", action: {"type": "tool_call"}, tool: "search", input: {"q": "rust"}"#;
        let outcome = parse_model_output(raw);
        assert_eq!(outcome.tier, ParserTier::Regex);
        assert!(matches!(outcome.thought.action, AgentAction::ToolCall { .. }));
    }

    #[test]
    fn fallback_tier_always_succeeds_with_zero_confidence() {
        let outcome = parse_model_output("complete gibberish with no structure");
        assert_eq!(outcome.tier, ParserTier::Fallback);
        assert_eq!(outcome.thought.confidence, 0.0);
    }

    #[test]
    fn empty_content_falls_through_to_fallback() {
        let outcome = parse_model_output("");
        assert_eq!(outcome.tier, ParserTier::Fallback);
    }
}
