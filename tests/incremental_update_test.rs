//! Incremental re-indexing: hash skips, edge-only updates, Git deltas.

use std::fs;
use std::path::{Path, PathBuf};

use codegraph::Settings;
use codegraph::graph::{MemoryIngestor, NodeLabel, RelKind};
use codegraph::pipeline::{GraphPipeline, IndexStats};

fn setup_repo(dir: &Path) -> PathBuf {
    let root = dir.join("proj");
    fs::create_dir_all(&root).unwrap();
    root
}

fn settings_with_cache() -> Settings {
    let mut settings = Settings::default();
    settings.incremental.git_delta_enabled = false;
    settings
}

fn index(root: &Path, settings: &Settings) -> (MemoryIngestor, IndexStats) {
    let mut ingestor = MemoryIngestor::new();
    let stats = GraphPipeline::new(settings, root)
        .unwrap()
        .run(&mut ingestor)
        .unwrap();
    (ingestor, stats)
}

#[test]
fn unchanged_files_are_skipped_on_rerun() {
    let dir = tempfile::tempdir().unwrap();
    let root = setup_repo(dir.path());
    fs::write(root.join("a.py"), "def f():\n    pass\n").unwrap();

    let settings = settings_with_cache();
    let (_, first) = index(&root, &settings);
    assert_eq!(first.files_parsed, 1);
    assert_eq!(first.files_skipped, 0);

    let (_, second) = index(&root, &settings);
    assert_eq!(second.files_parsed, 0);
    assert_eq!(second.files_skipped, 1);
}

#[test]
fn body_only_change_takes_the_edge_only_path() {
    // Reformatting and body edits leave the structural signature alone.
    let dir = tempfile::tempdir().unwrap();
    let root = setup_repo(dir.path());
    fs::write(
        root.join("m.py"),
        "def f():\n    return 1\n\n\ndef g():\n    f()\n",
    )
    .unwrap();

    let settings = settings_with_cache();
    let (_, first) = index(&root, &settings);
    assert_eq!(first.files_parsed, 1);
    assert_eq!(first.edge_only_updates, 0);

    fs::write(
        root.join("m.py"),
        "# a new comment\n\ndef f():\n    value = 2\n    return value\n\n\ndef g():\n    f()\n",
    )
    .unwrap();

    let (ingestor, second) = index(&root, &settings);
    assert_eq!(second.edge_only_updates, 1);
    assert_eq!(second.files_parsed, 1);

    // Definition nodes are intact and calls re-emitted.
    assert!(ingestor.has_node(NodeLabel::Function, "proj.m.f"));
    assert!(ingestor.has_node(NodeLabel::Function, "proj.m.g"));
    assert!(ingestor.has_relationship("proj.m.g", RelKind::Calls, "proj.m.f"));
}

#[test]
fn structural_change_forces_a_full_parse() {
    let dir = tempfile::tempdir().unwrap();
    let root = setup_repo(dir.path());
    fs::write(root.join("m.py"), "def f():\n    pass\n").unwrap();

    let settings = settings_with_cache();
    index(&root, &settings);

    fs::write(root.join("m.py"), "def f():\n    pass\n\n\ndef h():\n    pass\n").unwrap();
    let (ingestor, stats) = index(&root, &settings);

    assert_eq!(stats.edge_only_updates, 0);
    assert_eq!(stats.files_parsed, 1);
    assert!(ingestor.has_node(NodeLabel::Function, "proj.m.h"));
}

#[test]
fn disabling_the_cache_reparses_everything() {
    let dir = tempfile::tempdir().unwrap();
    let root = setup_repo(dir.path());
    fs::write(root.join("a.py"), "def f():\n    pass\n").unwrap();

    let settings = settings_with_cache();
    index(&root, &settings);

    let mut no_cache = settings_with_cache();
    no_cache.incremental.incremental_cache_enabled = false;
    let (_, stats) = index(&root, &no_cache);
    assert_eq!(stats.files_parsed, 1);
    assert_eq!(stats.files_skipped, 0);
}

mod git_delta {
    use super::*;
    use git2::{Repository, Signature};

    fn commit_all(repo: &Repository, message: &str) {
        let sig = Signature::now("test", "test@example.com").unwrap();
        let mut index = repo.index().unwrap();
        index
            .add_all(["*"].iter(), git2::IndexAddOption::DEFAULT, None)
            .unwrap();
        // add_all does not record removals; update_all does.
        index.update_all(["*"].iter(), None).unwrap();
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let parent = repo
            .head()
            .ok()
            .and_then(|head| head.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .unwrap();
    }

    fn git_settings() -> Settings {
        let mut settings = Settings::default();
        settings.incremental.incremental_cache_enabled = false;
        settings
    }

    #[test]
    fn unchanged_head_parses_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let root = setup_repo(dir.path());
        fs::write(root.join("a.py"), "def f():\n    pass\n").unwrap();
        let repo = Repository::init(&root).unwrap();
        commit_all(&repo, "initial");

        let settings = git_settings();
        let (_, first) = index(&root, &settings);
        assert_eq!(first.files_parsed, 1);

        let (_, second) = index(&root, &settings);
        assert_eq!(second.files_parsed, 0);
        assert_eq!(second.files_deleted, 0);
    }

    #[test]
    fn deleted_files_are_purged_from_a_persistent_sink() {
        let dir = tempfile::tempdir().unwrap();
        let root = setup_repo(dir.path());
        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(root.join("src/x.py"), "def gone():\n    pass\n").unwrap();
        fs::write(root.join("src/y.py"), "def stays():\n    pass\n").unwrap();
        let repo = Repository::init(&root).unwrap();
        commit_all(&repo, "initial");

        // The same sink carries over between runs, like a database would.
        let settings = git_settings();
        let mut ingestor = MemoryIngestor::new();
        GraphPipeline::new(&settings, &root)
            .unwrap()
            .run(&mut ingestor)
            .unwrap();
        assert!(ingestor.has_node(NodeLabel::Function, "proj.src.x.gone"));

        fs::remove_file(root.join("src/x.py")).unwrap();
        commit_all(&repo, "remove x");

        let stats = GraphPipeline::new(&settings, &root)
            .unwrap()
            .run(&mut ingestor)
            .unwrap();
        assert_eq!(stats.files_deleted, 1);
        assert!(!ingestor.has_node(NodeLabel::Module, "proj.src.x"));
        assert!(!ingestor.has_node(NodeLabel::Function, "proj.src.x.gone"));
        assert!(!ingestor.has_node(NodeLabel::File, "src/x.py"));
        assert!(ingestor.has_node(NodeLabel::Function, "proj.src.y.stays"));
    }

    #[test]
    fn changed_set_limits_the_parse() {
        let dir = tempfile::tempdir().unwrap();
        let root = setup_repo(dir.path());
        fs::write(root.join("a.py"), "def f():\n    pass\n").unwrap();
        fs::write(root.join("b.py"), "def g():\n    pass\n").unwrap();
        let repo = Repository::init(&root).unwrap();
        commit_all(&repo, "initial");

        let settings = git_settings();
        let (_, first) = index(&root, &settings);
        assert_eq!(first.files_parsed, 2);

        fs::write(root.join("a.py"), "def f():\n    return 2\n").unwrap();
        commit_all(&repo, "edit a");

        let (_, second) = index(&root, &settings);
        assert_eq!(second.files_parsed, 1);
    }
}
