//! Java inheritance and method dispatch across files.

use std::fs;
use std::path::{Path, PathBuf};

use codegraph::Settings;
use codegraph::graph::{MemoryIngestor, NodeLabel, RelKind};
use codegraph::pipeline::GraphPipeline;

fn setup_repo(dir: &Path) -> PathBuf {
    let root = dir.join("proj");
    fs::create_dir_all(root.join("a")).unwrap();
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
fn subclass_inherits_and_calls_parent_method() {
    let dir = tempfile::tempdir().unwrap();
    let root = setup_repo(dir.path());
    fs::write(
        root.join("a/Base.java"),
        "package a;\n\nclass Base {\n    void f() {}\n}\n",
    )
    .unwrap();
    fs::write(
        root.join("a/Sub.java"),
        "package a;\n\nclass Sub extends Base {\n    void g() {\n        f();\n    }\n}\n",
    )
    .unwrap();

    let ingestor = index(&root);

    assert!(ingestor.has_node(NodeLabel::Class, "proj.a.Base.Base"));
    assert!(ingestor.has_node(NodeLabel::Class, "proj.a.Sub.Sub"));
    assert!(ingestor.has_relationship(
        "proj.a.Sub.Sub",
        RelKind::Inherits,
        "proj.a.Base.Base"
    ));
    assert!(ingestor.has_relationship(
        "proj.a.Sub.Sub.g",
        RelKind::Calls,
        "proj.a.Base.Base.f"
    ));
}

#[test]
fn overriding_method_gets_an_overrides_edge() {
    let dir = tempfile::tempdir().unwrap();
    let root = setup_repo(dir.path());
    fs::write(
        root.join("a/Animal.java"),
        "package a;\n\nclass Animal {\n    void speak() {}\n}\n",
    )
    .unwrap();
    fs::write(
        root.join("a/Dog.java"),
        "package a;\n\nclass Dog extends Animal {\n    void speak() {}\n}\n",
    )
    .unwrap();

    let ingestor = index(&root);

    assert!(ingestor.has_relationship(
        "proj.a.Dog.Dog.speak",
        RelKind::Overrides,
        "proj.a.Animal.Animal.speak"
    ));
}

#[test]
fn typed_local_dispatches_to_the_declared_class() {
    let dir = tempfile::tempdir().unwrap();
    let root = setup_repo(dir.path());
    fs::write(
        root.join("a/Mailer.java"),
        "package a;\n\nclass Mailer {\n    void send() {}\n}\n",
    )
    .unwrap();
    fs::write(
        root.join("a/App.java"),
        concat!(
            "package a;\n",
            "\n",
            "class App {\n",
            "    void run() {\n",
            "        Mailer mailer = new Mailer();\n",
            "        mailer.send();\n",
            "    }\n",
            "}\n",
        ),
    )
    .unwrap();

    let ingestor = index(&root);

    assert!(ingestor.has_relationship(
        "proj.a.App.App.run",
        RelKind::Calls,
        "proj.a.Mailer.Mailer.send"
    ));
}

#[test]
fn interfaces_get_implements_edges() {
    let dir = tempfile::tempdir().unwrap();
    let root = setup_repo(dir.path());
    fs::write(
        root.join("a/Worker.java"),
        "package a;\n\ninterface Worker {\n    void work();\n}\n",
    )
    .unwrap();
    fs::write(
        root.join("a/Robot.java"),
        "package a;\n\nclass Robot implements Worker {\n    public void work() {}\n}\n",
    )
    .unwrap();

    let ingestor = index(&root);

    assert!(ingestor.has_node(NodeLabel::Interface, "proj.a.Worker.Worker"));
    assert!(ingestor.has_relationship(
        "proj.a.Robot.Robot",
        RelKind::Implements,
        "proj.a.Worker.Worker"
    ));
}
