//! Node labels, relationship kinds, and the allowed-edge table.
//!
//! A node is identified by `(label, primary key, value)`. The primary key
//! property depends on the label: `name` for Project/ExternalPackage,
//! `path` for Folder/File, `qualified_name` for everything else.

use indexmap::IndexMap;
use serde::Serialize;

/// Labels a graph node can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NodeLabel {
    Project,
    Package,
    Folder,
    File,
    Module,
    Class,
    Interface,
    Enum,
    Type,
    Union,
    Function,
    Method,
    ModuleInterface,
    ModuleImplementation,
    ExternalPackage,
}

impl NodeLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Project => "Project",
            Self::Package => "Package",
            Self::Folder => "Folder",
            Self::File => "File",
            Self::Module => "Module",
            Self::Class => "Class",
            Self::Interface => "Interface",
            Self::Enum => "Enum",
            Self::Type => "Type",
            Self::Union => "Union",
            Self::Function => "Function",
            Self::Method => "Method",
            Self::ModuleInterface => "ModuleInterface",
            Self::ModuleImplementation => "ModuleImplementation",
            Self::ExternalPackage => "ExternalPackage",
        }
    }

    /// The property that uniquely identifies nodes of this label.
    pub fn primary_key(&self) -> &'static str {
        match self {
            Self::Project | Self::ExternalPackage => "name",
            Self::Folder | Self::File => "path",
            _ => "qualified_name",
        }
    }

    /// Labels that represent class-like containers in the symbol registry.
    pub fn is_class_like(&self) -> bool {
        matches!(
            self,
            Self::Class | Self::Interface | Self::Enum | Self::Type | Self::Union
        )
    }
}

impl std::fmt::Display for NodeLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed relationship kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RelKind {
    ContainsPackage,
    ContainsFolder,
    ContainsFile,
    ContainsModule,
    Defines,
    DefinesMethod,
    Imports,
    Exports,
    ExportsModule,
    ImplementsModule,
    Inherits,
    Implements,
    Overrides,
    DependsOnExternal,
    Calls,
}

impl RelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ContainsPackage => "CONTAINS_PACKAGE",
            Self::ContainsFolder => "CONTAINS_FOLDER",
            Self::ContainsFile => "CONTAINS_FILE",
            Self::ContainsModule => "CONTAINS_MODULE",
            Self::Defines => "DEFINES",
            Self::DefinesMethod => "DEFINES_METHOD",
            Self::Imports => "IMPORTS",
            Self::Exports => "EXPORTS",
            Self::ExportsModule => "EXPORTS_MODULE",
            Self::ImplementsModule => "IMPLEMENTS_MODULE",
            Self::Inherits => "INHERITS",
            Self::Implements => "IMPLEMENTS",
            Self::Overrides => "OVERRIDES",
            Self::DependsOnExternal => "DEPENDS_ON_EXTERNAL",
            Self::Calls => "CALLS",
        }
    }
}

impl std::fmt::Display for RelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed table of allowed (source label, kind, target label) edges.
pub fn is_allowed_edge(source: NodeLabel, kind: RelKind, target: NodeLabel) -> bool {
    use NodeLabel::*;
    use RelKind::*;
    let container = matches!(source, Project | Package | Folder);
    match kind {
        ContainsPackage => container && target == Package,
        ContainsFolder => container && target == Folder,
        ContainsFile => container && target == File,
        // A File also contains the Module parsed out of it.
        ContainsModule => (container || source == File) && target == Module,
        Defines => source == Module && (target.is_class_like() || target == Function),
        DefinesMethod => source.is_class_like() && target == Method,
        Imports => source == Module && target == Module,
        Exports => source == Module && (target.is_class_like() || target == Function),
        ExportsModule => source == Module && target == ModuleInterface,
        ImplementsModule => source == Module && target == ModuleImplementation,
        Inherits => source.is_class_like() && target.is_class_like(),
        Implements => {
            (source.is_class_like() && target == Interface)
                || (source == ModuleImplementation && target == ModuleInterface)
        }
        Overrides => source == Method && target == Method,
        DependsOnExternal => source == Project && target == ExternalPackage,
        Calls => {
            matches!(source, Function | Method | Module | File)
                && matches!(target, Function | Method)
        }
    }
}

/// A property value storable on a node or relationship.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Str(String),
    Int(i64),
    Bool(bool),
    List(Vec<String>),
    Null,
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<usize> for PropertyValue {
    fn from(value: usize) -> Self {
        Self::Int(value as i64)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Vec<String>> for PropertyValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

impl From<Option<String>> for PropertyValue {
    fn from(value: Option<String>) -> Self {
        match value {
            Some(s) => Self::Str(s),
            None => Self::Null,
        }
    }
}

impl PropertyValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }
}

/// An ordered property map; insertion order is preserved so graph dumps
/// are deterministic.
pub type Properties = IndexMap<&'static str, PropertyValue>;

/// Builds a property map from `key => value` pairs.
#[macro_export]
macro_rules! props {
    ($($key:literal => $value:expr),* $(,)?) => {{
        let mut map = $crate::graph::Properties::new();
        $(map.insert($key, $crate::graph::PropertyValue::from($value));)*
        map
    }};
}

/// Identifies one endpoint of a relationship: `(label, key, value)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct NodeRef {
    pub label: NodeLabel,
    pub key: &'static str,
    pub value: String,
}

impl NodeRef {
    pub fn new(label: NodeLabel, key: &'static str, value: impl Into<String>) -> Self {
        Self {
            label,
            key,
            value: value.into(),
        }
    }

    /// Reference keyed by the label's primary key.
    pub fn primary(label: NodeLabel, value: impl Into<String>) -> Self {
        Self::new(label, label.primary_key(), value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_keys_follow_label_conventions() {
        assert_eq!(NodeLabel::Project.primary_key(), "name");
        assert_eq!(NodeLabel::Folder.primary_key(), "path");
        assert_eq!(NodeLabel::File.primary_key(), "path");
        assert_eq!(NodeLabel::Module.primary_key(), "qualified_name");
        assert_eq!(NodeLabel::Method.primary_key(), "qualified_name");
        assert_eq!(NodeLabel::ExternalPackage.primary_key(), "name");
    }

    #[test]
    fn edge_table_accepts_schema_rows() {
        assert!(is_allowed_edge(
            NodeLabel::Project,
            RelKind::ContainsPackage,
            NodeLabel::Package
        ));
        assert!(is_allowed_edge(
            NodeLabel::Module,
            RelKind::Defines,
            NodeLabel::Class
        ));
        assert!(is_allowed_edge(
            NodeLabel::Class,
            RelKind::DefinesMethod,
            NodeLabel::Method
        ));
        assert!(is_allowed_edge(
            NodeLabel::Method,
            RelKind::Calls,
            NodeLabel::Function
        ));
        assert!(is_allowed_edge(
            NodeLabel::ModuleImplementation,
            RelKind::Implements,
            NodeLabel::ModuleInterface
        ));
    }

    #[test]
    fn edge_table_rejects_invalid_rows() {
        assert!(!is_allowed_edge(
            NodeLabel::File,
            RelKind::Defines,
            NodeLabel::Function
        ));
        assert!(!is_allowed_edge(
            NodeLabel::Function,
            RelKind::Inherits,
            NodeLabel::Class
        ));
        assert!(!is_allowed_edge(
            NodeLabel::Package,
            RelKind::DependsOnExternal,
            NodeLabel::ExternalPackage
        ));
    }

    #[test]
    fn props_macro_preserves_order() {
        let props = props! {
            "qualified_name" => "proj.m.f",
            "name" => "f",
            "start_line" => 3usize,
        };
        let keys: Vec<_> = props.keys().copied().collect();
        assert_eq!(keys, vec!["qualified_name", "name", "start_line"]);
    }
}
