//! Parsing of the Sketch and Organize phases' model replies, the same
//! strict-then-fenced cascade `agentcore-react::parser` uses, minus the
//! regex tier — both shapes here are simple enough that a `(c)` manual
//! extraction tier would add complexity without covering any case the
//! zero-confidence fallback doesn't already handle adequately.

use crate::types::{OrganizeOutput, Sketch};
use serde::Deserialize;

#[derive(Deserialize)]
struct SketchReply {
    sketches: Vec<Sketch>,
}

/// Parse a Sketch-phase reply, deduplicating by id and preserving first
/// occurrence order. Returns `None` if no valid sketch JSON could be found.
pub fn parse_sketches(raw: &str) -> Option<Vec<Sketch>> {
    let reply = parse_strict::<SketchReply>(raw).or_else(|| parse_fenced::<SketchReply>(raw))?;
    let mut seen = std::collections::HashSet::new();
    let deduped: Vec<Sketch> = reply.sketches.into_iter().filter(|s| seen.insert(s.id.clone())).collect();
    if deduped.is_empty() {
        None
    } else {
        Some(deduped)
    }
}

/// Parse an Organize-phase reply. Returns `None` if no valid JSON could be
/// found; the caller falls back to synthesizing an answer from raw evidence.
pub fn parse_organize(raw: &str) -> Option<OrganizeOutput> {
    let mut parsed = parse_strict::<OrganizeOutput>(raw).or_else(|| parse_fenced::<OrganizeOutput>(raw))?;
    parsed.confidence = parsed.confidence.clamp(0.0, 1.0);
    Some(parsed)
}

fn parse_strict<T: for<'de> Deserialize<'de>>(raw: &str) -> Option<T> {
    serde_json::from_str(raw.trim()).ok()
}

fn parse_fenced<T: for<'de> Deserialize<'de>>(raw: &str) -> Option<T> {
    let start_marker = "```json";
    let start = raw.find(start_marker)? + start_marker.len();
    let rest = &raw[start..];
    let end = rest.find("```")?;
    serde_json::from_str(rest[..end].trim()).ok()
}
