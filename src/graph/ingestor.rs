//! The write-side sink the core emits graph mutations to.
//!
//! Concrete sinks (graph database driver, binary file writer) are
//! interchangeable behind [`Ingestor`]. The crate ships a deterministic
//! in-memory implementation used by the CLI JSON dump and the test suite.

use indexmap::IndexMap;
use serde::Serialize;

use super::schema::{NodeLabel, NodeRef, Properties, PropertyValue, RelKind};
use crate::error::IndexResult;

/// Named deletion queries used by the selective updater.
///
/// Sinks that cannot execute these degrade selective update to a full
/// re-parse (see [`Ingestor::execute_write`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteQuery {
    /// Delete a module node identified by repo-relative path along with
    /// every definition node carrying that path.
    DeleteModuleByPath(String),
    /// Delete only the dynamic edges (IMPORTS, CALLS) originating from
    /// the module at the given repo-relative path.
    DeleteDynamicEdgesByPath(String),
}

/// Write-side boundary of the core.
///
/// Both ensure operations are idempotent: nodes by
/// `(label, primary-key, value)`, relationships by `(from, kind, to)`.
/// Re-ensuring merges properties non-destructively.
pub trait Ingestor {
    fn ensure_node_batch(&mut self, label: NodeLabel, properties: Properties);

    fn ensure_relationship_batch(
        &mut self,
        from: NodeRef,
        kind: RelKind,
        to: NodeRef,
        properties: Option<Properties>,
    );

    /// Commit all batches. Called exactly once per indexing run.
    fn flush_all(&mut self) -> IndexResult<()>;

    /// Run a named deletion query. Returns false when the sink does not
    /// support selective deletion, in which case the caller falls back to
    /// a full re-parse.
    fn execute_write(&mut self, _query: WriteQuery) -> bool {
        false
    }
}

/// A node row in the exported graph.
#[derive(Debug, Clone, Serialize)]
pub struct GraphNode {
    pub label: NodeLabel,
    pub properties: Properties,
}

/// A relationship row in the exported graph.
#[derive(Debug, Clone, Serialize)]
pub struct GraphRelationship {
    pub from: NodeRef,
    pub kind: RelKind,
    pub to: NodeRef,
    pub properties: Properties,
}

/// Deterministic in-memory ingestor.
///
/// Nodes are keyed by `(label, primary-key value)`; relationships by the
/// full `(from, kind, to)` triple. Insertion order is preserved so two
/// runs over the same repository produce identical dumps.
#[derive(Default)]
pub struct MemoryIngestor {
    nodes: IndexMap<(NodeLabel, String), Properties>,
    relationships: IndexMap<(NodeRef, RelKind, NodeRef), Properties>,
    flushed: bool,
}

impl MemoryIngestor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn relationship_count(&self) -> usize {
        self.relationships.len()
    }

    pub fn was_flushed(&self) -> bool {
        self.flushed
    }

    /// All nodes with the given label.
    pub fn nodes_with_label(&self, label: NodeLabel) -> Vec<&Properties> {
        self.nodes
            .iter()
            .filter(|((l, _), _)| *l == label)
            .map(|(_, props)| props)
            .collect()
    }

    /// Look up a node's properties by label and primary-key value.
    pub fn node(&self, label: NodeLabel, key_value: &str) -> Option<&Properties> {
        self.nodes.get(&(label, key_value.to_string()))
    }

    pub fn has_node(&self, label: NodeLabel, key_value: &str) -> bool {
        self.node(label, key_value).is_some()
    }

    /// All relationships of the given kind as (from-value, to-value) pairs.
    pub fn relationships_of_kind(&self, kind: RelKind) -> Vec<(&str, &str)> {
        self.relationships
            .keys()
            .filter(|(_, k, _)| *k == kind)
            .map(|(from, _, to)| (from.value.as_str(), to.value.as_str()))
            .collect()
    }

    pub fn has_relationship(&self, from_value: &str, kind: RelKind, to_value: &str) -> bool {
        self.relationships
            .keys()
            .any(|(f, k, t)| *k == kind && f.value == from_value && t.value == to_value)
    }

    /// Serialize the whole graph to pretty JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        #[derive(Serialize)]
        struct Dump<'a> {
            nodes: Vec<GraphNode>,
            relationships: Vec<GraphRelationship>,
            metadata: Metadata<'a>,
        }
        #[derive(Serialize)]
        struct Metadata<'a> {
            total_nodes: usize,
            total_relationships: usize,
            exported_at: &'a str,
        }

        let exported_at = chrono::Utc::now().to_rfc3339();
        let dump = Dump {
            nodes: self
                .nodes
                .iter()
                .map(|((label, _), props)| GraphNode {
                    label: *label,
                    properties: props.clone(),
                })
                .collect(),
            relationships: self
                .relationships
                .iter()
                .map(|((from, kind, to), props)| GraphRelationship {
                    from: from.clone(),
                    kind: *kind,
                    to: to.clone(),
                    properties: props.clone(),
                })
                .collect(),
            metadata: Metadata {
                total_nodes: self.nodes.len(),
                total_relationships: self.relationships.len(),
                exported_at: &exported_at,
            },
        };
        serde_json::to_string_pretty(&dump)
    }

    fn merge(existing: &mut Properties, incoming: Properties) {
        for (key, value) in incoming {
            match existing.get(key) {
                Some(old) if *old != PropertyValue::Null && value == PropertyValue::Null => {}
                _ => {
                    existing.insert(key, value);
                }
            }
        }
    }

    fn path_of(&self, node: &NodeRef) -> Option<String> {
        let props = self.nodes.get(&(node.label, node.value.clone()))?;
        props.get("path").and_then(|v| v.as_str()).map(String::from)
    }
}

impl Ingestor for MemoryIngestor {
    fn ensure_node_batch(&mut self, label: NodeLabel, mut properties: Properties) {
        let Some(key_value) = properties
            .get(label.primary_key())
            .and_then(|v| v.as_str())
            .map(String::from)
        else {
            tracing::warn!(
                "Dropping {label} node without primary key '{}'",
                label.primary_key()
            );
            return;
        };

        match self.nodes.get_mut(&(label, key_value.clone())) {
            Some(existing) => Self::merge(existing, properties),
            None => {
                self.nodes.insert((label, key_value), properties);
            }
        }
    }

    fn ensure_relationship_batch(
        &mut self,
        from: NodeRef,
        kind: RelKind,
        to: NodeRef,
        properties: Option<Properties>,
    ) {
        if !super::schema::is_allowed_edge(from.label, kind, to.label) {
            tracing::warn!("Dropping disallowed edge {} -{kind}-> {}", from.label, to.label);
            return;
        }
        let key = (from, kind, to);
        let incoming = properties.unwrap_or_default();
        match self.relationships.get_mut(&key) {
            Some(existing) => Self::merge(existing, incoming),
            None => {
                self.relationships.insert(key, incoming);
            }
        }
    }

    fn flush_all(&mut self) -> IndexResult<()> {
        self.flushed = true;
        tracing::info!(
            target: "pipeline",
            "Flushed {} nodes, {} relationships",
            self.nodes.len(),
            self.relationships.len()
        );
        Ok(())
    }

    fn execute_write(&mut self, query: WriteQuery) -> bool {
        match query {
            WriteQuery::DeleteModuleByPath(path) => {
                // Folders and packages are shared containers and stay;
                // the File node goes with its module (the structure pass
                // re-ensures it for files that still exist).
                let removed: Vec<(NodeLabel, String)> = self
                    .nodes
                    .iter()
                    .filter(|((label, _), props)| {
                        !matches!(label, NodeLabel::Folder | NodeLabel::Package)
                            && props.get("path").and_then(|v| v.as_str()) == Some(path.as_str())
                    })
                    .map(|(key, _)| key.clone())
                    .collect();

                let removed_refs: Vec<NodeRef> = removed
                    .iter()
                    .map(|(label, value)| NodeRef::primary(*label, value.clone()))
                    .collect();
                for key in &removed {
                    self.nodes.shift_remove(key);
                }
                self.relationships.retain(|(from, _, to), _| {
                    !removed_refs.contains(from) && !removed_refs.contains(to)
                });
                true
            }
            WriteQuery::DeleteDynamicEdgesByPath(path) => {
                let paths: IndexMap<NodeRef, Option<String>> = self
                    .relationships
                    .keys()
                    .filter(|(_, kind, _)| matches!(kind, RelKind::Imports | RelKind::Calls))
                    .map(|(from, _, _)| (from.clone(), self.path_of(from)))
                    .collect();
                self.relationships.retain(|(from, kind, _), _| {
                    if !matches!(kind, RelKind::Imports | RelKind::Calls) {
                        return true;
                    }
                    paths.get(from).and_then(|p| p.as_deref()) != Some(path.as_str())
                });
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::props;

    #[test]
    fn nodes_are_idempotent_by_primary_key() {
        let mut ingestor = MemoryIngestor::new();
        ingestor.ensure_node_batch(
            NodeLabel::Function,
            props! {"qualified_name" => "p.m.f", "name" => "f"},
        );
        ingestor.ensure_node_batch(
            NodeLabel::Function,
            props! {"qualified_name" => "p.m.f", "start_line" => 3usize},
        );

        assert_eq!(ingestor.node_count(), 1);
        let props = ingestor.node(NodeLabel::Function, "p.m.f").unwrap();
        assert_eq!(props.get("name").unwrap().as_str(), Some("f"));
        assert_eq!(props.get("start_line"), Some(&PropertyValue::Int(3)));
    }

    #[test]
    fn null_never_overwrites_a_value() {
        let mut ingestor = MemoryIngestor::new();
        ingestor.ensure_node_batch(
            NodeLabel::Function,
            props! {"qualified_name" => "p.m.f", "docstring" => "doc"},
        );
        ingestor.ensure_node_batch(
            NodeLabel::Function,
            props! {"qualified_name" => "p.m.f", "docstring" => PropertyValue::Null},
        );
        let props = ingestor.node(NodeLabel::Function, "p.m.f").unwrap();
        assert_eq!(props.get("docstring").unwrap().as_str(), Some("doc"));
    }

    #[test]
    fn relationships_are_idempotent() {
        let mut ingestor = MemoryIngestor::new();
        let from = NodeRef::primary(NodeLabel::Module, "p.m");
        let to = NodeRef::primary(NodeLabel::Function, "p.m.f");
        ingestor.ensure_relationship_batch(from.clone(), RelKind::Defines, to.clone(), None);
        ingestor.ensure_relationship_batch(from, RelKind::Defines, to, None);
        assert_eq!(ingestor.relationship_count(), 1);
    }

    #[test]
    fn disallowed_edges_are_dropped() {
        let mut ingestor = MemoryIngestor::new();
        let from = NodeRef::primary(NodeLabel::Function, "p.m.f");
        let to = NodeRef::primary(NodeLabel::Class, "p.m.C");
        ingestor.ensure_relationship_batch(from, RelKind::Inherits, to, None);
        assert_eq!(ingestor.relationship_count(), 0);
    }

    #[test]
    fn delete_module_by_path_purges_definitions() {
        let mut ingestor = MemoryIngestor::new();
        ingestor.ensure_node_batch(
            NodeLabel::Module,
            props! {"qualified_name" => "p.m", "path" => "m.py"},
        );
        ingestor.ensure_node_batch(
            NodeLabel::Function,
            props! {"qualified_name" => "p.m.f", "path" => "m.py"},
        );
        ingestor.ensure_node_batch(NodeLabel::File, props! {"path" => "m.py", "name" => "m.py"});
        ingestor.ensure_relationship_batch(
            NodeRef::primary(NodeLabel::Module, "p.m"),
            RelKind::Defines,
            NodeRef::primary(NodeLabel::Function, "p.m.f"),
            None,
        );

        assert!(ingestor.execute_write(WriteQuery::DeleteModuleByPath("m.py".into())));
        assert!(!ingestor.has_node(NodeLabel::Module, "p.m"));
        assert!(!ingestor.has_node(NodeLabel::Function, "p.m.f"));
        assert!(!ingestor.has_node(NodeLabel::File, "m.py"));
        assert_eq!(ingestor.relationship_count(), 0);
    }

    #[test]
    fn delete_dynamic_edges_keeps_definitions() {
        let mut ingestor = MemoryIngestor::new();
        ingestor.ensure_node_batch(
            NodeLabel::Function,
            props! {"qualified_name" => "p.a.f", "path" => "a.py"},
        );
        ingestor.ensure_node_batch(
            NodeLabel::Function,
            props! {"qualified_name" => "p.b.g", "path" => "b.py"},
        );
        ingestor.ensure_relationship_batch(
            NodeRef::primary(NodeLabel::Function, "p.a.f"),
            RelKind::Calls,
            NodeRef::primary(NodeLabel::Function, "p.b.g"),
            None,
        );

        assert!(ingestor.execute_write(WriteQuery::DeleteDynamicEdgesByPath("a.py".into())));
        assert_eq!(ingestor.relationship_count(), 0);
        assert_eq!(ingestor.node_count(), 2);
    }
}
