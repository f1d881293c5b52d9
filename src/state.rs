//! Explicitly-owned shared state for one indexing run.
//!
//! Everything the passes share lives here: the symbol registry, the
//! per-module import maps, the class-inheritance map, module-to-file
//! bookkeeping, and the AST cache. The parse pass borrows the state
//! mutably; the call pass borrows it immutably. No globals.

use indexmap::IndexMap;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tree_sitter::Tree;

use crate::parsing::Language;
use crate::symbol::SymbolRegistry;

/// Per-module alias map: `local name -> full qualified name`.
/// Wildcard entries use the key `*<module-qn>`.
pub type ModuleImports = IndexMap<String, String>;

/// A parsed file owned by the AST cache.
pub struct CachedAst {
    pub tree: Tree,
    pub source: String,
    pub language: Language,
    pub structure_signature: Option<String>,
    inserted: Instant,
    last_access: Instant,
}

/// Bounded cache of parsed trees, keyed by file path.
///
/// The cache is the single owner of every tree after the parse pass;
/// the call pass borrows entries read-only. Evicting an entry also
/// drops its derived structural signature.
#[derive(Default)]
pub struct AstCache {
    entries: HashMap<PathBuf, CachedAst>,
}

impl AstCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn insert(
        &mut self,
        path: PathBuf,
        tree: Tree,
        source: String,
        language: Language,
        structure_signature: Option<String>,
    ) {
        let now = Instant::now();
        self.entries.insert(
            path,
            CachedAst {
                tree,
                source,
                language,
                structure_signature,
                inserted: now,
                last_access: now,
            },
        );
    }

    /// Read-only access that leaves the LRU clock untouched.
    pub fn peek(&self, path: &Path) -> Option<&CachedAst> {
        self.entries.get(path)
    }

    pub fn touch(&mut self, path: &Path) -> Option<&CachedAst> {
        let entry = self.entries.get_mut(path)?;
        entry.last_access = Instant::now();
        Some(entry)
    }

    pub fn remove(&mut self, path: &Path) -> Option<CachedAst> {
        self.entries.remove(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    /// Paths in sorted order, for deterministic iteration.
    pub fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.entries.keys().cloned().collect();
        paths.sort();
        paths
    }

    /// Drop entries older than `ttl`.
    pub fn purge_stale(&mut self, ttl: Duration) -> usize {
        let before = self.entries.len();
        let now = Instant::now();
        self.entries
            .retain(|_, entry| now.duration_since(entry.inserted) < ttl);
        before - self.entries.len()
    }

    /// Evict least-recently-used entries until at most `max_entries` remain.
    pub fn evict_lru_to(&mut self, max_entries: usize) -> usize {
        if self.entries.len() <= max_entries {
            return 0;
        }
        let mut by_age: Vec<(PathBuf, Instant)> = self
            .entries
            .iter()
            .map(|(path, entry)| (path.clone(), entry.last_access))
            .collect();
        by_age.sort_by_key(|(_, at)| *at);
        let doomed = self.entries.len() - max_entries;
        for (path, _) in by_age.into_iter().take(doomed) {
            self.entries.remove(&path);
        }
        doomed
    }
}

/// A class whose parent and interface names await cross-file
/// resolution in the linking pass.
#[derive(Debug, Clone)]
pub struct PendingTypeRelation {
    pub class_qn: String,
    pub module_qn: String,
    pub parent_names: Vec<String>,
    pub interface_names: Vec<String>,
    /// Rust traits contribute default methods, so they join the
    /// inheritance map as well as getting IMPLEMENTS edges.
    pub interfaces_into_inheritance: bool,
}

/// Shared mutable state for an indexing run.
#[derive(Default)]
pub struct IndexState {
    /// Trie + simple-name lookup over every known definition.
    pub registry: SymbolRegistry,
    /// `module_qn -> {local name -> full qn}`.
    pub imports: HashMap<String, ModuleImports>,
    /// `class qn -> parent class qns`, in declaration order.
    pub class_inheritance: HashMap<String, Vec<String>>,
    /// `module_qn -> source file path`.
    pub module_paths: HashMap<String, PathBuf>,
    /// `module_qn -> content hash`.
    pub module_hashes: HashMap<String, String>,
    /// External module nodes already emitted, to avoid re-emission.
    pub external_modules: std::collections::HashSet<String>,
    /// Inheritance clauses waiting for the linking pass.
    pub pending_type_relations: Vec<PendingTypeRelation>,
    /// Parsed trees owned by this run.
    pub ast_cache: AstCache,
}

impl IndexState {
    pub fn new() -> Self {
        Self::default()
    }

    /// The import map for a module, if any imports were recorded.
    pub fn module_imports(&self, module_qn: &str) -> Option<&ModuleImports> {
        self.imports.get(module_qn)
    }

    /// BFS over the class-inheritance map for the nearest ancestor that
    /// defines `method_name`. Cycle-safe via a visited set.
    pub fn find_inherited_method(&self, class_qn: &str, method_name: &str) -> Option<String> {
        let mut queue: std::collections::VecDeque<String> = self
            .class_inheritance
            .get(class_qn)?
            .iter()
            .cloned()
            .collect();
        let mut visited: std::collections::HashSet<String> = queue.iter().cloned().collect();
        while let Some(parent) = queue.pop_front() {
            let candidate = format!("{parent}.{method_name}");
            if self.registry.contains(&candidate) {
                return Some(candidate);
            }
            if let Some(grandparents) = self.class_inheritance.get(&parent) {
                for gp in grandparents {
                    if visited.insert(gp.clone()) {
                        queue.push_back(gp.clone());
                    }
                }
            }
        }
        None
    }

    /// Purge every trace of a file: its AST cache entry, its module's
    /// registry subtree, its import map, and its bookkeeping rows.
    pub fn purge_file(&mut self, file_path: &Path, module_qn: &str) {
        self.ast_cache.remove(file_path);
        let removed = self.registry.purge_module(module_qn);
        for fqn in &removed {
            self.class_inheritance.remove(fqn);
        }
        self.imports.remove(module_qn);
        self.module_paths.remove(module_qn);
        self.module_hashes.remove(module_qn);
        self.pending_type_relations
            .retain(|pending| pending.module_qn != module_qn);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::SymbolKind;

    #[test]
    fn lru_eviction_keeps_most_recent() {
        let mut cache = AstCache::new();
        let mut parser = crate::parsing::new_parser(Language::Python, None).unwrap();
        for name in ["a.py", "b.py", "c.py"] {
            let tree = parser.parse("x = 1\n", None).unwrap();
            cache.insert(PathBuf::from(name), tree, "x = 1\n".into(), Language::Python, None);
        }
        cache.touch(Path::new("a.py"));

        let evicted = cache.evict_lru_to(1);
        assert_eq!(evicted, 2);
        assert!(cache.contains(Path::new("a.py")));
    }

    #[test]
    fn purge_file_clears_all_state() {
        let mut state = IndexState::new();
        state.registry.insert("proj.m", SymbolKind::Module);
        state.registry.insert("proj.m.f", SymbolKind::Function);
        state.registry.insert("proj.m.C", SymbolKind::Class);
        state
            .class_inheritance
            .insert("proj.m.C".into(), vec!["proj.base.B".into()]);
        state
            .imports
            .entry("proj.m".into())
            .or_default()
            .insert("os".into(), "os".into());
        state
            .module_paths
            .insert("proj.m".into(), PathBuf::from("m.py"));

        state.purge_file(Path::new("m.py"), "proj.m");

        assert!(!state.registry.contains("proj.m.f"));
        assert!(!state.registry.contains("proj.m"));
        assert!(state.class_inheritance.is_empty());
        assert!(state.imports.is_empty());
        assert!(state.module_paths.is_empty());
    }
}
