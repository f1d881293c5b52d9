//! Scala import parsing: comma-separated entries, brace groups,
//! `=>` renames, and `_` wildcards.

use tree_sitter::Node;

use super::{ImportEnv, ImportSink, module_path_of};
use crate::parsing::ast::node_text;

pub fn parse(nodes: &[Node], source: &str, _env: &ImportEnv, sink: &mut ImportSink) {
    for node in nodes {
        let text = node_text(*node, source);
        for entry in split_entries(text) {
            register_entry(&entry, sink);
        }
    }
}

/// Split one import statement into entries on top-level commas.
fn split_entries(import_text: &str) -> Vec<String> {
    let mut text = import_text.trim();
    text = text.strip_prefix("import").unwrap_or(text).trim();
    if text.is_empty() {
        return Vec::new();
    }

    let mut entries = Vec::new();
    let mut buffer = String::new();
    let mut depth = 0usize;
    for ch in text.chars() {
        match ch {
            '{' => {
                depth += 1;
                buffer.push(ch);
            }
            '}' => {
                depth = depth.saturating_sub(1);
                buffer.push(ch);
            }
            ',' if depth == 0 => {
                if !buffer.trim().is_empty() {
                    entries.push(buffer.trim().to_string());
                }
                buffer.clear();
            }
            _ => buffer.push(ch),
        }
    }
    if !buffer.trim().is_empty() {
        entries.push(buffer.trim().to_string());
    }
    entries
}

fn register_entry(entry: &str, sink: &mut ImportSink) {
    let cleaned = entry.trim().trim_end_matches(';').trim();
    if cleaned.is_empty() {
        return;
    }

    if let (Some(open), Some(close)) = (cleaned.find('{'), cleaned.rfind('}')) {
        let prefix = cleaned[..open].trim().trim_end_matches('.').to_string();
        for item in cleaned[open + 1..close].split(',') {
            register_item(&prefix, item.trim(), sink);
        }
        return;
    }

    register_item("", cleaned, sink);
}

fn register_item(prefix: &str, item: &str, sink: &mut ImportSink) {
    if item.is_empty() {
        return;
    }

    let (original, alias) = match item.split_once("=>") {
        Some((name, alias)) => (name.trim(), Some(alias.trim().to_string())),
        None => (item, None),
    };

    let full_name = if prefix.is_empty() {
        original.to_string()
    } else {
        format!("{prefix}.{original}")
    };

    if original == "_" || full_name.ends_with("._") {
        let module_path = if prefix.is_empty() {
            full_name.trim_end_matches("._").to_string()
        } else {
            prefix.to_string()
        };
        if !module_path.is_empty() {
            sink.ensure_external_module(&module_path, &module_path);
            sink.record_wildcard(&module_path);
        }
        return;
    }

    sink.ensure_external_module(module_path_of(&full_name), &full_name);
    let local = alias.unwrap_or_else(|| {
        full_name
            .rsplit('.')
            .next()
            .unwrap_or(&full_name)
            .to_string()
    });
    sink.record(local, full_name);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::MemoryIngestor;
    use crate::state::ModuleImports;
    use std::collections::HashSet;

    fn run(entries: &str) -> ModuleImports {
        let mut map = ModuleImports::new();
        let mut externals = HashSet::new();
        let mut ingestor = MemoryIngestor::new();
        let mut sink = ImportSink {
            map: &mut map,
            externals: &mut externals,
            ingestor: &mut ingestor,
        };
        for entry in split_entries(entries) {
            register_entry(&entry, &mut sink);
        }
        map
    }

    #[test]
    fn plain_import() {
        let map = run("import scala.collection.mutable.ListBuffer");
        assert_eq!(map.get("ListBuffer").unwrap(), "scala.collection.mutable.ListBuffer");
    }

    #[test]
    fn grouped_import_with_rename() {
        let map = run("import java.util.{List => JList, Map}");
        assert_eq!(map.get("JList").unwrap(), "java.util.List");
        assert_eq!(map.get("Map").unwrap(), "java.util.Map");
    }

    #[test]
    fn wildcard_import() {
        let map = run("import scala.concurrent._");
        assert_eq!(map.get("*scala.concurrent").unwrap(), "scala.concurrent");
    }
}
