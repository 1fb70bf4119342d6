//! Topological phase assignment over a tool-call dependency graph (C4).

use corelayer::{DependencyKind, ToolCall, ToolDependency};
use std::collections::HashMap;

/// The outcome of resolving a dependency graph: tools grouped into
/// concurrency-safe phases, plus any cycle warnings (cycles are reported,
/// never fatal — see §4.2).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedPlan {
    /// Tool calls grouped by phase, in ascending phase order. Calls within
    /// a phase may run concurrently.
    pub phases: Vec<Vec<ToolCall>>,
    /// Human-readable cycle warnings, e.g. `"Circular dependency detected
    /// involving tool: A"`.
    pub warnings: Vec<String>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum VisitState {
    Unvisited,
    InProgress,
    Done,
}

/// Resolves a set of tool calls plus dependency edges into ordered phases.
pub struct DependencyResolver;

impl DependencyResolver {
    /// Build a phase plan. Insertion order is preserved within a phase.
    pub fn resolve(calls: &[ToolCall], deps: &[ToolDependency]) -> ResolvedPlan {
        let mut required_deps: HashMap<&str, Vec<&str>> = HashMap::new();
        for d in deps {
            if d.kind == DependencyKind::Required {
                required_deps
                    .entry(d.tool_name.as_str())
                    .or_default()
                    .extend(d.dependencies.iter().map(String::as_str));
            }
        }

        let mut state: HashMap<&str, VisitState> =
            calls.iter().map(|c| (c.tool_name.as_str(), VisitState::Unvisited)).collect();
        let mut phase_of: HashMap<&str, usize> = HashMap::new();
        let mut warnings = Vec::new();

        for call in calls {
            visit(call.tool_name.as_str(), &required_deps, &mut state, &mut phase_of, &mut warnings);
        }

        let max_phase = phase_of.values().copied().max().unwrap_or(0);
        let mut phases: Vec<Vec<ToolCall>> = (0..=max_phase).map(|_| Vec::new()).collect();
        for call in calls {
            let phase = phase_of.get(call.tool_name.as_str()).copied().unwrap_or(0);
            phases[phase].push(call.clone());
        }

        ResolvedPlan { phases, warnings }
    }
}

fn visit<'a>(
    name: &'a str,
    required_deps: &HashMap<&'a str, Vec<&'a str>>,
    state: &mut HashMap<&'a str, VisitState>,
    phase_of: &mut HashMap<&'a str, usize>,
    warnings: &mut Vec<String>,
) -> usize {
    if let Some(&p) = phase_of.get(name) {
        return p;
    }
    match state.get(name).copied().unwrap_or(VisitState::Unvisited) {
        VisitState::InProgress => {
            warnings.push(format!("Circular dependency detected involving tool: {name}"));
            return 0;
        }
        VisitState::Done => return *phase_of.get(name).unwrap_or(&0),
        VisitState::Unvisited => {}
    }

    state.insert(name, VisitState::InProgress);
    let mut phase = 0usize;
    if let Some(deps) = required_deps.get(name) {
        for dep in deps {
            let dep_phase = visit(dep, required_deps, state, phase_of, warnings);
            phase = phase.max(dep_phase + 1);
        }
    }
    state.insert(name, VisitState::Done);
    phase_of.insert(name, phase);
    phase
}
