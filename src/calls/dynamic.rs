//! Snippet heuristic for dynamic call sites.
//!
//! Frameworks invoke functions through string names (routing tables,
//! event maps, `obj['handler']`). The heuristic pulls identifier-shaped
//! strings out of the call snippet and matches them against the
//! registry, preferring candidates close to the caller's module.

use regex::Regex;
use std::sync::OnceLock;

use crate::state::IndexState;
use crate::symbol::SymbolKind;

pub fn resolve_from_snippet(
    state: &IndexState,
    snippet: &str,
    module_qn: &str,
) -> Option<(SymbolKind, String)> {
    for candidate in candidate_names(snippet) {
        let matches = state.registry.find_ending_with(&candidate);
        if matches.is_empty() {
            continue;
        }
        let best = select_best(&matches, module_qn);
        let kind = state.registry.get(&best)?;
        return Some((kind, best));
    }
    None
}

fn candidate_names(snippet: &str) -> Vec<String> {
    static STRING_ID: OnceLock<Regex> = OnceLock::new();
    static ROUTE_ACTION: OnceLock<Regex> = OnceLock::new();
    static BRACKET_MEMBER: OnceLock<Regex> = OnceLock::new();

    let string_id =
        STRING_ID.get_or_init(|| Regex::new(r#"['"]([A-Za-z_][A-Za-z0-9_]*)['"]"#).unwrap());
    let route_action = ROUTE_ACTION.get_or_init(|| Regex::new(r"@([A-Za-z_][A-Za-z0-9_]*)").unwrap());
    let bracket_member = BRACKET_MEMBER
        .get_or_init(|| Regex::new(r#"\[\s*['"]([A-Za-z_][A-Za-z0-9_]*)['"]\s*\]"#).unwrap());

    let mut seen = std::collections::HashSet::new();
    let mut candidates = Vec::new();
    for re in [string_id, route_action, bracket_member] {
        for capture in re.captures_iter(snippet) {
            let name = capture[1].to_string();
            if seen.insert(name.clone()) {
                candidates.push(name);
            }
        }
    }
    candidates
}

fn select_best(candidates: &[String], module_qn: &str) -> String {
    let prefix = format!("{module_qn}.");
    if let Some(preferred) = candidates.iter().find(|qn| qn.starts_with(&prefix)) {
        return preferred.clone();
    }
    candidates
        .iter()
        .min_by_key(|qn| distance(qn, module_qn))
        .cloned()
        .unwrap_or_default()
}

fn distance(candidate_qn: &str, module_qn: &str) -> usize {
    let caller: Vec<&str> = module_qn.split('.').collect();
    let candidate: Vec<&str> = candidate_qn.split('.').collect();
    let common = caller
        .iter()
        .zip(candidate.iter())
        .take_while(|(a, b)| a == b)
        .count();
    caller.len().max(candidate.len()) - common
}
