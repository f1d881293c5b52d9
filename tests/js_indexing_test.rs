//! JavaScript / TypeScript indexing: CommonJS, ES6 exports, classes.

use std::fs;
use std::path::{Path, PathBuf};

use codegraph::Settings;
use codegraph::graph::{MemoryIngestor, NodeLabel, RelKind};
use codegraph::pipeline::GraphPipeline;

fn setup_repo(dir: &Path) -> PathBuf {
    let root = dir.join("proj");
    fs::create_dir_all(&root).unwrap();
    root
}

fn index(root: &Path) -> MemoryIngestor {
    let mut settings = Settings::default();
    settings.incremental.incremental_cache_enabled = false;
    settings.incremental.git_delta_enabled = false;
    let mut ingestor = MemoryIngestor::new();
    GraphPipeline::new(&settings, root)
        .unwrap()
        .run(&mut ingestor)
        .unwrap();
    ingestor
}

#[test]
fn commonjs_export_and_require() {
    // a.js exports hi; b.js requires it and calls it at module level.
    let dir = tempfile::tempdir().unwrap();
    let root = setup_repo(dir.path());
    fs::write(root.join("a.js"), "module.exports.hi = function () {};\n").unwrap();
    fs::write(root.join("b.js"), "const a = require('./a');\na.hi();\n").unwrap();

    let ingestor = index(&root);

    assert!(ingestor.has_node(NodeLabel::Function, "proj.a.hi"));
    assert!(ingestor.has_relationship("proj.a", RelKind::Exports, "proj.a.hi"));
    assert!(ingestor.has_relationship("proj.b", RelKind::Calls, "proj.a.hi"));
}

#[test]
fn es6_exports_and_imports_edge() {
    let dir = tempfile::tempdir().unwrap();
    let root = setup_repo(dir.path());
    fs::write(
        root.join("util.js"),
        "export function helper() {}\n\nexport class Box {}\n",
    )
    .unwrap();
    fs::write(
        root.join("app.js"),
        "import { helper } from './util';\n\nfunction main() {\n  helper();\n}\n",
    )
    .unwrap();

    let ingestor = index(&root);

    assert!(ingestor.has_relationship("proj.util", RelKind::Exports, "proj.util.helper"));
    assert!(ingestor.has_relationship("proj.app", RelKind::Imports, "proj.util"));
    assert!(ingestor.has_relationship("proj.app.main", RelKind::Calls, "proj.util.helper"));
}

#[test]
fn class_extends_and_method_dispatch() {
    let dir = tempfile::tempdir().unwrap();
    let root = setup_repo(dir.path());
    fs::write(
        root.join("zoo.js"),
        concat!(
            "class Animal {\n",
            "  speak() {}\n",
            "}\n",
            "\n",
            "class Dog extends Animal {\n",
            "  fetch() {\n",
            "    this.speak();\n",
            "  }\n",
            "}\n",
            "\n",
            "function main() {\n",
            "  const d = new Dog();\n",
            "  d.fetch();\n",
            "}\n",
        ),
    )
    .unwrap();

    let ingestor = index(&root);

    assert!(ingestor.has_relationship("proj.zoo.Dog", RelKind::Inherits, "proj.zoo.Animal"));
    assert!(ingestor.has_relationship("proj.zoo.main", RelKind::Calls, "proj.zoo.Dog.fetch"));
}

#[test]
fn iife_gets_a_deterministic_synthetic_name() {
    let dir = tempfile::tempdir().unwrap();
    let root = setup_repo(dir.path());
    fs::write(root.join("boot.js"), "(function () {\n  run();\n})();\n").unwrap();

    let ingestor = index(&root);

    let functions = ingestor.nodes_with_label(NodeLabel::Function);
    assert!(
        functions.iter().any(|props| {
            props
                .get("qualified_name")
                .and_then(|v| v.as_str())
                .is_some_and(|qn| qn.starts_with("proj.boot.iife_func_"))
        }),
        "expected a synthetic IIFE function node"
    );
}

#[test]
fn typescript_interfaces_and_types() {
    let dir = tempfile::tempdir().unwrap();
    let root = setup_repo(dir.path());
    fs::write(
        root.join("model.ts"),
        concat!(
            "export interface Shape {\n",
            "  area(): number;\n",
            "}\n",
            "\n",
            "export type Point = { x: number; y: number };\n",
            "\n",
            "export class Circle implements Shape {\n",
            "  area(): number {\n",
            "    return 0;\n",
            "  }\n",
            "}\n",
        ),
    )
    .unwrap();

    let ingestor = index(&root);

    assert!(ingestor.has_node(NodeLabel::Interface, "proj.model.Shape"));
    assert!(ingestor.has_node(NodeLabel::Type, "proj.model.Point"));
    assert!(ingestor.has_node(NodeLabel::Class, "proj.model.Circle"));
    assert!(ingestor.has_relationship(
        "proj.model.Circle",
        RelKind::Implements,
        "proj.model.Shape"
    ));
}

#[test]
fn object_literal_methods_are_registered() {
    let dir = tempfile::tempdir().unwrap();
    let root = setup_repo(dir.path());
    fs::write(
        root.join("api.js"),
        "const api = {\n  fetch() {},\n  post: function () {},\n};\n",
    )
    .unwrap();

    let ingestor = index(&root);

    assert!(ingestor.has_node(NodeLabel::Function, "proj.api.api.fetch"));
    assert!(ingestor.has_node(NodeLabel::Function, "proj.api.api.post"));
}
