//! Go import parsing.
//!
//! Each import spec contributes `(alias-or-last-segment, full path)`.
//! A `_` alias is blank-imported but still recorded.

use tree_sitter::Node;

use super::{ImportEnv, ImportSink};
use crate::parsing::ast::{collect_nodes, node_text};

pub fn parse(nodes: &[Node], source: &str, env: &ImportEnv, sink: &mut ImportSink) {
    for node in nodes {
        for spec in collect_nodes(*node, &["import_spec"]) {
            let Some(path_node) = spec.child_by_field_name("path") else {
                continue;
            };
            let import_path = node_text(path_node, source).trim_matches('"').to_string();
            if import_path.is_empty() {
                continue;
            }
            let dotted = import_path.replace('/', ".");

            let local = spec
                .child_by_field_name("name")
                .map(|n| node_text(n, source).to_string())
                .unwrap_or_else(|| {
                    import_path
                        .rsplit('/')
                        .next()
                        .unwrap_or(&import_path)
                        .to_string()
                });

            if !dotted.starts_with(&env.project_prefix()) {
                sink.ensure_external_module(&dotted, &import_path);
            }
            sink.record(local, dotted);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::MemoryIngestor;
    use crate::parsing::{Language, new_parser};
    use crate::state::ModuleImports;
    use std::collections::HashSet;
    use std::path::Path;

    fn parse_source(source: &str) -> ModuleImports {
        let mut parser = new_parser(Language::Go, None).unwrap();
        let tree = parser.parse(source, None).unwrap();
        let mut map = ModuleImports::new();
        let mut externals = HashSet::new();
        let mut ingestor = MemoryIngestor::new();
        let env = ImportEnv {
            repo_path: Path::new("."),
            project_name: "proj",
            module_qn: "proj.main",
            language: Language::Go,
        };
        let mut sink = ImportSink {
            map: &mut map,
            externals: &mut externals,
            ingestor: &mut ingestor,
        };
        super::super::parse_imports(tree.root_node(), source, &env, &mut sink);
        map
    }

    #[test]
    fn grouped_imports_with_aliases() {
        let map = parse_source(
            "package main\n\nimport (\n\t\"fmt\"\n\tlog \"github.com/rs/zerolog\"\n\t_ \"net/http/pprof\"\n)\n",
        );
        assert_eq!(map.get("fmt").unwrap(), "fmt");
        assert_eq!(map.get("log").unwrap(), &"github.com/rs/zerolog".replace('/', "."));
        assert_eq!(map.get("_").unwrap(), "net.http.pprof");
    }

    #[test]
    fn single_import() {
        let map = parse_source("package main\n\nimport \"strings\"\n");
        assert_eq!(map.get("strings").unwrap(), "strings");
    }
}
