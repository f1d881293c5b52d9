//! Rust indexing: impl blocks, traits, use declarations.

use std::fs;
use std::path::{Path, PathBuf};

use codegraph::Settings;
use codegraph::graph::{MemoryIngestor, NodeLabel, RelKind};
use codegraph::pipeline::GraphPipeline;

fn setup_repo(dir: &Path) -> PathBuf {
    let root = dir.join("proj");
    fs::create_dir_all(root.join("src")).unwrap();
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
fn impl_methods_attach_to_the_struct() {
    let dir = tempfile::tempdir().unwrap();
    let root = setup_repo(dir.path());
    fs::write(
        root.join("src/server.rs"),
        concat!(
            "pub struct Server {\n",
            "    port: u16,\n",
            "}\n",
            "\n",
            "impl Server {\n",
            "    pub fn new(port: u16) -> Self {\n",
            "        Self { port }\n",
            "    }\n",
            "\n",
            "    pub fn start(&self) {}\n",
            "}\n",
        ),
    )
    .unwrap();

    let ingestor = index(&root);

    assert!(ingestor.has_node(NodeLabel::Class, "proj.src.server.Server"));
    assert!(ingestor.has_node(NodeLabel::Method, "proj.src.server.Server.new"));
    assert!(ingestor.has_node(NodeLabel::Method, "proj.src.server.Server.start"));
    assert!(ingestor.has_relationship(
        "proj.src.server.Server",
        RelKind::DefinesMethod,
        "proj.src.server.Server.start"
    ));
}

#[test]
fn trait_impls_get_implements_edges() {
    let dir = tempfile::tempdir().unwrap();
    let root = setup_repo(dir.path());
    fs::write(
        root.join("src/lib.rs"),
        concat!(
            "pub trait Runner {\n",
            "    fn run(&self);\n",
            "}\n",
            "\n",
            "pub struct Job;\n",
            "\n",
            "impl Runner for Job {\n",
            "    fn run(&self) {}\n",
            "}\n",
        ),
    )
    .unwrap();

    let ingestor = index(&root);

    assert!(ingestor.has_node(NodeLabel::Interface, "proj.src.lib.Runner"));
    assert!(ingestor.has_relationship(
        "proj.src.lib.Job",
        RelKind::Implements,
        "proj.src.lib.Runner"
    ));
}

#[test]
fn cross_module_call_through_crate_import() {
    let dir = tempfile::tempdir().unwrap();
    let root = setup_repo(dir.path());
    fs::write(root.join("src/util.rs"), "pub fn helper() {}\n").unwrap();
    fs::write(
        root.join("src/main.rs"),
        "use crate::util::helper;\n\nfn main() {\n    helper();\n}\n",
    )
    .unwrap();

    let ingestor = index(&root);

    assert!(ingestor.has_relationship(
        "proj.src.main.main",
        RelKind::Calls,
        "proj.src.util.helper"
    ));
}

#[test]
fn mod_rs_maps_to_its_directory() {
    let dir = tempfile::tempdir().unwrap();
    let root = setup_repo(dir.path());
    fs::create_dir_all(root.join("src/net")).unwrap();
    fs::write(root.join("src/net/mod.rs"), "pub fn connect() {}\n").unwrap();

    let ingestor = index(&root);

    assert!(ingestor.has_node(NodeLabel::Module, "proj.src.net"));
    assert!(ingestor.has_node(NodeLabel::Function, "proj.src.net.connect"));
}

#[test]
fn constructor_call_redirects_to_new() {
    let dir = tempfile::tempdir().unwrap();
    let root = setup_repo(dir.path());
    fs::write(
        root.join("src/app.rs"),
        concat!(
            "pub struct Engine;\n",
            "\n",
            "impl Engine {\n",
            "    pub fn new() -> Self {\n",
            "        Engine\n",
            "    }\n",
            "}\n",
            "\n",
            "pub fn boot() {\n",
            "    let _engine = Engine::new();\n",
            "}\n",
        ),
    )
    .unwrap();

    let ingestor = index(&root);

    assert!(ingestor.has_relationship(
        "proj.src.app.boot",
        RelKind::Calls,
        "proj.src.app.Engine.new"
    ));
}
