//! Structure processor: walks the repository and emits the containment
//! skeleton (Project, Package, Folder, File nodes and `CONTAINS_*` edges).
//!
//! A directory is a Package when any configured language lists one of its
//! package-indicator files present in it; otherwise it is a Folder.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use crate::graph::{Ingestor, NodeLabel, NodeRef, RelKind};
use crate::parsing::spec::all_package_indicators;
use crate::parsing::Language;
use crate::paths::{content_hash, is_test_path, should_skip_path, to_posix};
use crate::props;

/// Walks the filesystem and seeds structural nodes.
pub struct StructureProcessor<'a> {
    repo_path: &'a Path,
    project_name: &'a str,
    exclude_paths: Option<&'a BTreeSet<String>>,
    unignore_paths: Option<&'a BTreeSet<String>>,
    /// Relative dir path -> package qualified name (None for plain folders).
    structural_elements: HashMap<PathBuf, Option<String>>,
}

impl<'a> StructureProcessor<'a> {
    pub fn new(
        repo_path: &'a Path,
        project_name: &'a str,
        exclude_paths: Option<&'a BTreeSet<String>>,
        unignore_paths: Option<&'a BTreeSet<String>>,
    ) -> Self {
        Self {
            repo_path,
            project_name,
            exclude_paths,
            unignore_paths,
            structural_elements: HashMap::new(),
        }
    }

    /// The package qualified name of a relative directory, if it is one.
    pub fn package_of(&self, relative_dir: &Path) -> Option<&str> {
        self.structural_elements
            .get(relative_dir)
            .and_then(|qn| qn.as_deref())
    }

    /// Identify packages and folders, emitting their nodes and edges.
    pub fn identify_structure(&mut self, ingestor: &mut dyn Ingestor) {
        let indicators = all_package_indicators();

        let mut directories: Vec<PathBuf> = vec![self.repo_path.to_path_buf()];
        let walker = ignore::WalkBuilder::new(self.repo_path)
            .hidden(false)
            .git_ignore(true)
            .require_git(false)
            .follow_links(false)
            .build();
        for entry in walker.flatten() {
            let path = entry.path();
            if path.is_dir()
                && path != self.repo_path
                && !should_skip_path(path, self.repo_path, self.exclude_paths, self.unignore_paths)
            {
                directories.push(path.to_path_buf());
            }
        }
        directories.sort();

        for root in directories {
            let relative_root = root.strip_prefix(self.repo_path).unwrap_or(&root).to_path_buf();
            let parent_rel = relative_root
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default();

            let is_package = indicators.iter().any(|name| root.join(name).exists());

            if is_package {
                let mut segments = vec![self.project_name.to_string()];
                segments.extend(
                    relative_root
                        .components()
                        .filter_map(|c| c.as_os_str().to_str().map(String::from)),
                );
                let package_qn = segments.join(".");
                tracing::info!("Identified package: {package_qn}");

                let parent_qn = package_qn
                    .rsplit_once('.')
                    .map(|(head, _)| head.to_string())
                    .unwrap_or_else(|| self.project_name.to_string());
                ingestor.ensure_node_batch(
                    NodeLabel::Package,
                    props! {
                        "qualified_name" => package_qn.clone(),
                        "name" => root.file_name().and_then(|n| n.to_str()).unwrap_or(self.project_name).to_string(),
                        "path" => to_posix(&relative_root),
                        "parent_qn" => parent_qn,
                        "is_test" => is_test_path(&relative_root),
                    },
                );
                ingestor.ensure_relationship_batch(
                    self.parent_ref(&parent_rel),
                    RelKind::ContainsPackage,
                    NodeRef::primary(NodeLabel::Package, package_qn.clone()),
                    None,
                );
                self.structural_elements
                    .insert(relative_root, Some(package_qn));
            } else if root != self.repo_path {
                tracing::info!("Identified folder: {}", relative_root.display());
                ingestor.ensure_node_batch(
                    NodeLabel::Folder,
                    props! {
                        "path" => to_posix(&relative_root),
                        "name" => root.file_name().and_then(|n| n.to_str()).unwrap_or_default().to_string(),
                        "is_test" => is_test_path(&relative_root),
                    },
                );
                ingestor.ensure_relationship_batch(
                    self.parent_ref(&parent_rel),
                    RelKind::ContainsFolder,
                    NodeRef::new(NodeLabel::Folder, "path", to_posix(&relative_root)),
                    None,
                );
                self.structural_elements.insert(relative_root, None);
            }
        }
    }

    /// Emit the File node for one path and link it under its container.
    pub fn process_file(&self, file_path: &Path, ingestor: &mut dyn Ingestor) {
        let Ok(relative) = file_path.strip_prefix(self.repo_path) else {
            return;
        };
        let relative_str = to_posix(relative);
        let parent_rel = relative.parent().map(Path::to_path_buf).unwrap_or_default();

        let mut props = props! {
            "path" => relative_str.clone(),
            "name" => file_path.file_name().and_then(|n| n.to_str()).unwrap_or_default().to_string(),
            "extension" => file_path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| format!(".{e}"))
                .unwrap_or_default(),
            "is_test" => is_test_path(relative),
        };
        if let Some(language) = Language::from_path(file_path) {
            props.insert("language", language.key().into());
        }
        if let Ok(bytes) = std::fs::read(file_path) {
            props.insert("file_hash", content_hash(&bytes).into());
        }

        ingestor.ensure_node_batch(NodeLabel::File, props);
        ingestor.ensure_relationship_batch(
            self.parent_ref(&parent_rel),
            RelKind::ContainsFile,
            NodeRef::new(NodeLabel::File, "path", relative_str),
            None,
        );
    }

    /// Reference for the container of a relative directory: the Project
    /// at the root, a Package when one was identified, a Folder otherwise.
    pub fn parent_ref(&self, parent_rel: &Path) -> NodeRef {
        if parent_rel.as_os_str().is_empty() {
            return NodeRef::primary(NodeLabel::Project, self.project_name);
        }
        match self.structural_elements.get(parent_rel) {
            Some(Some(package_qn)) => NodeRef::primary(NodeLabel::Package, package_qn.clone()),
            _ => NodeRef::new(NodeLabel::Folder, "path", to_posix(parent_rel)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::MemoryIngestor;
    use std::fs;

    #[test]
    fn packages_and_folders_are_distinguished() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("pkg")).unwrap();
        fs::write(root.join("pkg/__init__.py"), "").unwrap();
        fs::create_dir_all(root.join("docs")).unwrap();
        fs::write(root.join("docs/guide.txt"), "hi").unwrap();

        let mut ingestor = MemoryIngestor::new();
        let mut processor = StructureProcessor::new(root, "proj", None, None);
        processor.identify_structure(&mut ingestor);

        assert!(ingestor.has_node(NodeLabel::Package, "proj.pkg"));
        assert!(ingestor.has_node(NodeLabel::Folder, "docs"));
        assert_eq!(processor.package_of(Path::new("pkg")), Some("proj.pkg"));
        assert_eq!(processor.package_of(Path::new("docs")), None);
    }

    #[test]
    fn files_link_to_their_container() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("pkg")).unwrap();
        fs::write(root.join("pkg/__init__.py"), "").unwrap();
        fs::write(root.join("pkg/util.py"), "def f():\n    pass\n").unwrap();

        let mut ingestor = MemoryIngestor::new();
        let mut processor = StructureProcessor::new(root, "proj", None, None);
        processor.identify_structure(&mut ingestor);
        processor.process_file(&root.join("pkg/util.py"), &mut ingestor);

        assert!(ingestor.has_node(NodeLabel::File, "pkg/util.py"));
        assert!(ingestor.has_relationship("proj.pkg", RelKind::ContainsFile, "pkg/util.py"));
        let file = ingestor.node(NodeLabel::File, "pkg/util.py").unwrap();
        assert_eq!(file.get("extension").unwrap().as_str(), Some(".py"));
        assert_eq!(file.get("language").unwrap().as_str(), Some("python"));
    }

    #[test]
    fn nested_folder_chain_reaches_project() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("a/b")).unwrap();
        fs::write(root.join("a/b/x.txt"), "x").unwrap();

        let mut ingestor = MemoryIngestor::new();
        let mut processor = StructureProcessor::new(root, "proj", None, None);
        processor.identify_structure(&mut ingestor);

        assert!(ingestor.has_relationship("proj", RelKind::ContainsFolder, "a"));
        assert!(ingestor.has_relationship("a", RelKind::ContainsFolder, "a/b"));
    }
}
