//! PHP import parsing: `use` statements (grouped, aliased) and
//! `include` / `require` expressions found in the source text.

use regex::Regex;
use std::sync::OnceLock;
use tree_sitter::Node;

use super::{ImportEnv, ImportSink, module_path_of};
use crate::parsing::ast::node_text;

pub fn parse(nodes: &[Node], source: &str, _env: &ImportEnv, sink: &mut ImportSink) {
    for node in nodes {
        let text = node_text(*node, source);
        for (local, full) in parse_use_statement(text) {
            sink.ensure_external_module(module_path_of(&full), &full);
            sink.record(local, full);
        }
    }

    for path in include_paths(source) {
        let local = path
            .rsplit('/')
            .next()
            .and_then(|name| name.split('.').next())
            .unwrap_or(&path)
            .to_string();
        let full = path.trim_end_matches(".php").replace('/', ".");
        if !local.is_empty() {
            sink.record(local, full);
        }
    }
}

fn parse_use_statement(use_text: &str) -> Vec<(String, String)> {
    static USE_RE: OnceLock<Regex> = OnceLock::new();
    let re = USE_RE.get_or_init(|| Regex::new(r"use\s+(.+?);").unwrap());

    let mut results = Vec::new();
    for capture in re.captures_iter(use_text) {
        let body = capture[1].trim().to_string();
        if let (Some(open), Some(close)) = (body.find('{'), body.rfind('}')) {
            let prefix = body[..open].trim().trim_end_matches('\\').to_string();
            for entry in body[open + 1..close].split(',') {
                let entry = entry.trim();
                if entry.is_empty() {
                    continue;
                }
                let (target, alias) = split_alias(entry);
                let full = if prefix.is_empty() {
                    target.clone()
                } else {
                    format!("{prefix}\\{target}")
                };
                results.push((
                    alias.unwrap_or_else(|| last_segment(&target)),
                    normalize(&full),
                ));
            }
        } else {
            for entry in body.split(',') {
                let entry = entry.trim();
                if entry.is_empty() {
                    continue;
                }
                let (target, alias) = split_alias(entry);
                results.push((
                    alias.unwrap_or_else(|| last_segment(&target)),
                    normalize(&target),
                ));
            }
        }
    }
    results
}

fn include_paths(source: &str) -> Vec<String> {
    static INCLUDE_RE: OnceLock<Regex> = OnceLock::new();
    let re = INCLUDE_RE.get_or_init(|| {
        Regex::new(r#"\b(?:include|include_once|require|require_once)\s*\(?\s*['"]([^'"]+)['"]"#)
            .unwrap()
    });
    re.captures_iter(source)
        .map(|c| c[1].to_string())
        .collect()
}

fn split_alias(entry: &str) -> (String, Option<String>) {
    static ALIAS_RE: OnceLock<Regex> = OnceLock::new();
    let re = ALIAS_RE.get_or_init(|| Regex::new(r"(?i)\s+as\s+").unwrap());
    match re.splitn(entry, 2).collect::<Vec<_>>()[..] {
        [target, alias] => (target.trim().to_string(), Some(alias.trim().to_string())),
        _ => (entry.trim().to_string(), None),
    }
}

fn last_segment(target: &str) -> String {
    target.rsplit('\\').next().unwrap_or(target).to_string()
}

fn normalize(name: &str) -> String {
    name.trim().trim_start_matches('\\').replace('\\', ".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_use() {
        let entries = parse_use_statement("use App\\Service\\Mailer;");
        assert_eq!(
            entries,
            vec![("Mailer".to_string(), "App.Service.Mailer".to_string())]
        );
    }

    #[test]
    fn aliased_use() {
        let entries = parse_use_statement("use App\\Service\\Mailer as Mail;");
        assert_eq!(
            entries,
            vec![("Mail".to_string(), "App.Service.Mailer".to_string())]
        );
    }

    #[test]
    fn grouped_use() {
        let entries = parse_use_statement("use App\\Models\\{User, Post as Article};");
        assert!(entries.contains(&("User".to_string(), "App.Models.User".to_string())));
        assert!(entries.contains(&("Article".to_string(), "App.Models.Post".to_string())));
    }

    #[test]
    fn include_extraction() {
        let paths = include_paths("<?php require_once('lib/helpers.php'); ?>");
        assert_eq!(paths, vec!["lib/helpers.php".to_string()]);
    }
}
