//! C# `using` directive parsing: plain, `global`, `static`, and alias
//! forms.

use tree_sitter::Node;

use super::{ImportEnv, ImportSink, module_path_of};
use crate::parsing::ast::node_text;

pub fn parse(nodes: &[Node], source: &str, _env: &ImportEnv, sink: &mut ImportSink) {
    for node in nodes {
        let text = node_text(*node, source);
        for (local, full) in parse_using(text) {
            sink.ensure_external_module(module_path_of(&full), &full);
            sink.record(local, full);
        }
    }
}

fn parse_using(using_text: &str) -> Vec<(String, String)> {
    let mut body = using_text.trim().trim_end_matches(';').trim();
    for prefix in ["global", "using", "static"] {
        body = body.strip_prefix(prefix).unwrap_or(body).trim();
    }
    if body.is_empty() {
        return Vec::new();
    }

    if let Some((alias, target)) = body.split_once('=') {
        let alias = alias.trim();
        let target = target.trim();
        if alias.is_empty() || target.is_empty() {
            return Vec::new();
        }
        return vec![(alias.to_string(), target.to_string())];
    }

    let local = body.rsplit('.').next().unwrap_or(body);
    vec![(local.to_string(), body.to_string())]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_using() {
        assert_eq!(
            parse_using("using System.Collections.Generic;"),
            vec![("Generic".to_string(), "System.Collections.Generic".to_string())]
        );
    }

    #[test]
    fn alias_using() {
        assert_eq!(
            parse_using("using Dict = System.Collections.Generic.Dictionary;"),
            vec![(
                "Dict".to_string(),
                "System.Collections.Generic.Dictionary".to_string()
            )]
        );
    }

    #[test]
    fn static_and_global_prefixes() {
        assert_eq!(
            parse_using("global using static System.Math;"),
            vec![("Math".to_string(), "System.Math".to_string())]
        );
    }
}
