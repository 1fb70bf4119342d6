//! A small stateful matcher for action-repetition loop detection,
//! independent of any strategy so it can be reused by both — Design Note
//! §9's "factor loop detection into a small stateful matcher" taken
//! literally.

use corelayer::AgentAction;
use serde_json::Value;
use std::collections::VecDeque;

/// A canonical string summarizing an action, stable under re-evaluation.
pub type Fingerprint = String;

/// Produce the fingerprint for an action: its kind, tool name when
/// applicable, and canonical JSON of its arguments.
pub fn fingerprint(action: &AgentAction) -> Fingerprint {
    match action {
        AgentAction::ToolCall { tool, arguments } => format!("tool_call:{tool}:{}", canonical(arguments)),
        AgentAction::FinalAnswer { .. } => "final_answer".to_string(),
        AgentAction::NeedMoreInfo { .. } => "need_more_info".to_string(),
        AgentAction::ExecutePlan { plan_id } => format!("execute_plan:{plan_id}"),
        other => format!("unknown:{other:?}"),
    }
}

fn canonical(value: &Value) -> String {
    // serde_json's map serialization already preserves insertion order; for
    // fingerprinting purposes this is stable enough without re-sorting keys.
    value.to_string()
}

/// Bounded history of recent action fingerprints, flagging repetition.
pub struct FingerprintMatcher {
    recent: VecDeque<Fingerprint>,
    capacity: usize,
}

impl FingerprintMatcher {
    /// Build a matcher that remembers the last `capacity` fingerprints.
    pub fn new(capacity: usize) -> Self {
        Self { recent: VecDeque::with_capacity(capacity), capacity: capacity.max(3) }
    }

    /// Record a fingerprint and report whether a repetition pattern is now
    /// present: the last 3 identical, an A-B-A pattern, or two consecutive
    /// identical calls.
    pub fn push(&mut self, fp: Fingerprint) -> bool {
        self.recent.push_back(fp);
        while self.recent.len() > self.capacity {
            self.recent.pop_front();
        }
        self.is_repeating()
    }

    fn is_repeating(&self) -> bool {
        let n = self.recent.len();
        if n >= 3 {
            let last3: Vec<&Fingerprint> = self.recent.iter().rev().take(3).collect();
            if last3[0] == last3[1] && last3[1] == last3[2] {
                return true;
            }
            if last3[0] == last3[2] && last3[0] != last3[1] {
                return true;
            }
        }
        if n >= 2 {
            let mut iter = self.recent.iter().rev();
            let last = iter.next();
            let prev = iter.next();
            if last.is_some() && last == prev {
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_identical_calls_trigger_detection() {
        let mut m = FingerprintMatcher::new(5);
        assert!(!m.push("a".to_string()));
        assert!(!m.push("a".to_string()));
        assert!(m.push("a".to_string()));
    }

    #[test]
    fn a_b_a_pattern_triggers_detection() {
        let mut m = FingerprintMatcher::new(5);
        assert!(!m.push("a".to_string()));
        assert!(!m.push("b".to_string()));
        assert!(m.push("a".to_string()));
    }

    #[test]
    fn distinct_calls_do_not_trigger() {
        let mut m = FingerprintMatcher::new(5);
        assert!(!m.push("a".to_string()));
        assert!(!m.push("b".to_string()));
        assert!(!m.push("c".to_string()));
    }

    #[test]
    fn fingerprint_is_stable_for_identical_tool_calls() {
        let action = AgentAction::ToolCall { tool: "search".into(), arguments: serde_json::json!({"q": "a"}) };
        assert_eq!(fingerprint(&action), fingerprint(&action));
    }
}
