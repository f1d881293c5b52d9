//! Trie-indexed symbol registry with a simple-name reverse index.
//!
//! The trie is keyed by dotted FQN segments. The reverse index maps the
//! last segment of every registered FQN to the set of FQNs sharing it.
//! Both structures are mutated in lockstep behind the registry's single
//! update path; readers (the call resolver) never mutate.
//!
//! Ownership: the definition processor inserts, the pipeline purges
//! during incremental updates, everything else is read-only. A missing
//! lookup returns `None`, never an error.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::SymbolKind;

/// One trie node: children by segment, payload at terminals.
#[derive(Debug, Default)]
struct TrieNode {
    children: BTreeMap<String, TrieNode>,
    kind: Option<SymbolKind>,
}

/// A trie over dotted FQN segments.
#[derive(Debug, Default)]
pub struct FqnTrie {
    root: TrieNode,
    len: usize,
}

impl FqnTrie {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn insert(&mut self, fqn: &str, kind: SymbolKind) -> Option<SymbolKind> {
        let mut node = &mut self.root;
        for segment in fqn.split('.') {
            node = node.children.entry(segment.to_string()).or_default();
        }
        let previous = node.kind.replace(kind);
        if previous.is_none() {
            self.len += 1;
        }
        previous
    }

    pub fn contains(&self, fqn: &str) -> bool {
        self.get(fqn).is_some()
    }

    pub fn get(&self, fqn: &str) -> Option<SymbolKind> {
        let mut node = &self.root;
        for segment in fqn.split('.') {
            node = node.children.get(segment)?;
        }
        node.kind
    }

    pub fn remove(&mut self, fqn: &str) -> Option<SymbolKind> {
        fn recurse(node: &mut TrieNode, segments: &[&str]) -> Option<SymbolKind> {
            match segments {
                [] => node.kind.take(),
                [head, rest @ ..] => {
                    let child = node.children.get_mut(*head)?;
                    let removed = recurse(child, rest)?;
                    if child.kind.is_none() && child.children.is_empty() {
                        node.children.remove(*head);
                    }
                    Some(removed)
                }
            }
        }
        let segments: Vec<&str> = fqn.split('.').collect();
        let removed = recurse(&mut self.root, &segments);
        if removed.is_some() {
            self.len -= 1;
        }
        removed
    }

    /// All `(fqn, kind)` pairs in lexicographic segment order.
    pub fn items(&self) -> Vec<(String, SymbolKind)> {
        let mut out = Vec::with_capacity(self.len);
        Self::collect(&self.root, &mut String::new(), &mut out);
        out
    }

    /// All entries whose FQN starts with `prefix` (segment-aligned).
    pub fn find_with_prefix(&self, prefix: &str) -> Vec<(String, SymbolKind)> {
        let mut node = &self.root;
        for segment in prefix.split('.') {
            match node.children.get(segment) {
                Some(child) => node = child,
                None => return Vec::new(),
            }
        }
        let mut out = Vec::new();
        let mut path = prefix.to_string();
        if let Some(kind) = node.kind {
            out.push((path.clone(), kind));
        }
        Self::collect(node, &mut path, &mut out);
        out
    }

    /// All FQNs whose dot-segment suffix equals `suffix`.
    ///
    /// Matching is segment-aligned: `a.b.c` is a suffix of `x.a.b.c` but
    /// not of `x.za.b.c`.
    pub fn find_ending_with(&self, suffix: &str) -> Vec<String> {
        if suffix.is_empty() {
            return Vec::new();
        }
        let dotted = format!(".{suffix}");
        self.items()
            .into_iter()
            .filter(|(fqn, _)| fqn == suffix || fqn.ends_with(&dotted))
            .map(|(fqn, _)| fqn)
            .collect()
    }

    fn collect(node: &TrieNode, path: &mut String, out: &mut Vec<(String, SymbolKind)>) {
        for (segment, child) in &node.children {
            let saved = path.len();
            if !path.is_empty() {
                path.push('.');
            }
            path.push_str(segment);
            if let Some(kind) = child.kind {
                out.push((path.clone(), kind));
            }
            Self::collect(child, path, out);
            path.truncate(saved);
        }
    }
}

/// The registry pairing the trie with the simple-name lookup.
#[derive(Debug, Default)]
pub struct SymbolRegistry {
    trie: FqnTrie,
    simple_names: HashMap<String, BTreeSet<String>>,
}

impl SymbolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.trie.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trie.is_empty()
    }

    pub fn insert(&mut self, fqn: &str, kind: SymbolKind) {
        if fqn.is_empty() || fqn.contains(char::is_whitespace) {
            tracing::debug!("Refusing to register malformed FQN '{fqn}'");
            return;
        }
        if self.trie.insert(fqn, kind).is_none() {
            let simple = last_segment(fqn);
            self.simple_names
                .entry(simple.to_string())
                .or_default()
                .insert(fqn.to_string());
        }
    }

    pub fn contains(&self, fqn: &str) -> bool {
        self.trie.contains(fqn)
    }

    pub fn get(&self, fqn: &str) -> Option<SymbolKind> {
        self.trie.get(fqn)
    }

    pub fn remove(&mut self, fqn: &str) -> Option<SymbolKind> {
        let removed = self.trie.remove(fqn);
        if removed.is_some() {
            let simple = last_segment(fqn);
            if let Some(set) = self.simple_names.get_mut(simple) {
                set.remove(fqn);
                if set.is_empty() {
                    self.simple_names.remove(simple);
                }
            }
        }
        removed
    }

    pub fn items(&self) -> Vec<(String, SymbolKind)> {
        self.trie.items()
    }

    pub fn find_with_prefix(&self, prefix: &str) -> Vec<(String, SymbolKind)> {
        self.trie.find_with_prefix(prefix)
    }

    pub fn find_ending_with(&self, suffix: &str) -> Vec<String> {
        self.trie.find_ending_with(suffix)
    }

    /// FQNs registered under the given simple name.
    pub fn lookup_simple_name(&self, name: &str) -> Option<&BTreeSet<String>> {
        self.simple_names.get(name)
    }

    /// Purge everything registered under `module_qn`.
    ///
    /// Submodule subtrees survive: for a package `__init__` module, the
    /// FQNs of sibling file modules (and their members) are registered by
    /// other files and must not disappear with the package module.
    /// Returns the removed FQNs.
    pub fn purge_module(&mut self, module_qn: &str) -> Vec<String> {
        let prefix = format!("{module_qn}.");
        let submodules: Vec<String> = self
            .trie
            .find_with_prefix(module_qn)
            .into_iter()
            .filter(|(fqn, kind)| *kind == SymbolKind::Module && fqn != module_qn)
            .map(|(fqn, _)| fqn)
            .collect();

        let doomed: Vec<String> = self
            .trie
            .find_with_prefix(module_qn)
            .into_iter()
            .map(|(fqn, _)| fqn)
            .filter(|fqn| fqn == module_qn || fqn.starts_with(&prefix))
            .filter(|fqn| {
                !submodules
                    .iter()
                    .any(|sub| fqn == sub || fqn.starts_with(&format!("{sub}.")))
            })
            .collect();

        for fqn in &doomed {
            self.remove(fqn);
        }
        doomed
    }
}

fn last_segment(fqn: &str) -> &str {
    fqn.rsplit('.').next().unwrap_or(fqn)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SymbolRegistry {
        let mut registry = SymbolRegistry::new();
        registry.insert("proj.m", SymbolKind::Module);
        registry.insert("proj.m.foo", SymbolKind::Function);
        registry.insert("proj.m.A", SymbolKind::Class);
        registry.insert("proj.m.A.run", SymbolKind::Method);
        registry.insert("proj.sub.util.foo", SymbolKind::Function);
        registry
    }

    #[test]
    fn insert_and_get() {
        let registry = sample();
        assert_eq!(registry.get("proj.m.foo"), Some(SymbolKind::Function));
        assert_eq!(registry.get("proj.m.A.run"), Some(SymbolKind::Method));
        assert_eq!(registry.get("proj.m.missing"), None);
        assert!(!registry.contains("proj"));
    }

    #[test]
    fn suffix_search_is_segment_aligned() {
        let mut registry = sample();
        registry.insert("proj.m.barfoo", SymbolKind::Function);

        let hits = registry.find_ending_with("foo");
        assert!(hits.contains(&"proj.m.foo".to_string()));
        assert!(hits.contains(&"proj.sub.util.foo".to_string()));
        assert!(!hits.contains(&"proj.m.barfoo".to_string()));
    }

    #[test]
    fn multi_segment_suffix_search() {
        let registry = sample();
        let hits = registry.find_ending_with("A.run");
        assert_eq!(hits, vec!["proj.m.A.run".to_string()]);
    }

    #[test]
    fn prefix_search_returns_subtree() {
        let registry = sample();
        let hits = registry.find_with_prefix("proj.m");
        let fqns: Vec<&str> = hits.iter().map(|(f, _)| f.as_str()).collect();
        assert!(fqns.contains(&"proj.m"));
        assert!(fqns.contains(&"proj.m.A.run"));
        assert!(!fqns.contains(&"proj.sub.util.foo"));
    }

    #[test]
    fn simple_name_lookup_tracks_inserts_and_removes() {
        let mut registry = sample();
        let foos = registry.lookup_simple_name("foo").unwrap();
        assert_eq!(foos.len(), 2);

        registry.remove("proj.m.foo");
        let foos = registry.lookup_simple_name("foo").unwrap();
        assert_eq!(foos.len(), 1);
        assert!(foos.contains("proj.sub.util.foo"));

        registry.remove("proj.sub.util.foo");
        assert!(registry.lookup_simple_name("foo").is_none());
    }

    #[test]
    fn every_registered_fqn_is_in_the_lookup() {
        let registry = sample();
        for (fqn, _) in registry.items() {
            let simple = fqn.rsplit('.').next().unwrap();
            assert!(
                registry.lookup_simple_name(simple).unwrap().contains(&fqn),
                "{fqn} missing from simple-name lookup"
            );
        }
    }

    #[test]
    fn purge_module_removes_members_but_keeps_submodules() {
        let mut registry = SymbolRegistry::new();
        registry.insert("proj.pkg", SymbolKind::Module);
        registry.insert("proj.pkg.helper", SymbolKind::Function);
        registry.insert("proj.pkg.sub", SymbolKind::Module);
        registry.insert("proj.pkg.sub.f", SymbolKind::Function);

        let removed = registry.purge_module("proj.pkg");
        assert!(removed.contains(&"proj.pkg".to_string()));
        assert!(removed.contains(&"proj.pkg.helper".to_string()));
        assert!(registry.contains("proj.pkg.sub"));
        assert!(registry.contains("proj.pkg.sub.f"));
    }

    #[test]
    fn malformed_fqns_are_rejected() {
        let mut registry = SymbolRegistry::new();
        registry.insert("", SymbolKind::Function);
        registry.insert("has space", SymbolKind::Function);
        assert!(registry.is_empty());
    }
}
