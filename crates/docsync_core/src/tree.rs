use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use walkdir::WalkDir;

use crate::error::{Result, SyncError};

pub const DOCUMENT_EXTENSION: &str = "md";

const MAIN_DOCUMENT_SUFFIXES: &[&str] = &["index.md", "readme.md"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedEntry {
    pub path: PathBuf,
    pub kind: EntryKind,
}

/// Read-only view of the documentation tree.
///
/// `list_dir` must return immediate entries in the order the backing store
/// lists them; main-document selection depends on that order.
pub trait SourceTree {
    fn list_dir(&self, dir: &Path) -> Result<Vec<ListedEntry>>;
    fn read_document(&self, path: &Path) -> Result<String>;
}

/// `SourceTree` over the real filesystem. Listing order is whatever the OS returns.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSourceTree;

impl SourceTree for FsSourceTree {
    fn list_dir(&self, dir: &Path) -> Result<Vec<ListedEntry>> {
        let mut entries = Vec::new();
        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
        {
            let entry = entry.map_err(|error| SyncError::from_walk(dir, error))?;
            let kind = if entry.file_type().is_dir() {
                EntryKind::Directory
            } else if entry.file_type().is_file() {
                EntryKind::File
            } else {
                continue;
            };
            entries.push(ListedEntry {
                path: entry.into_path(),
                kind,
            });
        }
        Ok(entries)
    }

    fn read_document(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).map_err(|error| SyncError::filesystem(path, error))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryEntry {
    Document(PathBuf),
    Subdirectory(PathBuf),
}

impl DirectoryEntry {
    /// Hidden entries and non-document files classify to `None`.
    pub fn classify(entry: &ListedEntry) -> Option<Self> {
        let name = entry.path.file_name()?.to_string_lossy();
        if name.starts_with('.') {
            return None;
        }
        match entry.kind {
            EntryKind::Directory => Some(Self::Subdirectory(entry.path.clone())),
            EntryKind::File if is_document(&entry.path) => {
                Some(Self::Document(entry.path.clone()))
            }
            EntryKind::File => None,
        }
    }
}

/// One wiki page plus everything nested under it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishNode {
    pub folder_path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main_document: Option<PathBuf>,
    pub sibling_documents: Vec<PathBuf>,
    pub children: Vec<PublishNode>,
}

impl PublishNode {
    /// Pages this subtree publishes, including the node's own page.
    pub fn page_count(&self) -> usize {
        1 + self.sibling_documents.len()
            + self
                .children
                .iter()
                .map(PublishNode::page_count)
                .sum::<usize>()
    }

    /// Copy of the subtree with every path made relative to `root`.
    pub fn relative_to(&self, root: &Path) -> PublishNode {
        let strip = |path: &Path| {
            path.strip_prefix(root)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| path.to_path_buf())
        };
        PublishNode {
            folder_path: strip(&self.folder_path),
            main_document: self.main_document.as_deref().map(strip),
            sibling_documents: self.sibling_documents.iter().map(|p| strip(p)).collect(),
            children: self
                .children
                .iter()
                .map(|child| child.relative_to(root))
                .collect(),
        }
    }
}

pub fn forest_page_count(forest: &[PublishNode]) -> usize {
    forest.iter().map(PublishNode::page_count).sum()
}

/// Fold `dir` into publish nodes.
///
/// A directory without documents of its own yields its children's nodes
/// directly; a subtree without any document yields nothing.
pub fn build_forest<T: SourceTree + ?Sized>(tree: &T, dir: &Path) -> Result<Vec<PublishNode>> {
    let mut documents = Vec::new();
    let mut subdirectories = Vec::new();
    for entry in tree.list_dir(dir)?.iter().filter_map(DirectoryEntry::classify) {
        match entry {
            DirectoryEntry::Document(path) => documents.push(path),
            DirectoryEntry::Subdirectory(path) => subdirectories.push(path),
        }
    }

    let mut children = Vec::new();
    for subdirectory in &subdirectories {
        children.extend(build_forest(tree, subdirectory)?);
    }

    if documents.is_empty() {
        return Ok(children);
    }

    let main_document = documents
        .iter()
        .position(|path| is_main_document(path))
        .map(|index| documents.remove(index));

    Ok(vec![PublishNode {
        folder_path: dir.to_path_buf(),
        main_document,
        sibling_documents: documents,
        children,
    }])
}

pub fn is_document(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext == DOCUMENT_EXTENSION)
}

pub fn is_main_document(path: &Path) -> bool {
    let Some(name) = path.file_name() else {
        return false;
    };
    let name = name.to_string_lossy().to_lowercase();
    MAIN_DOCUMENT_SUFFIXES
        .iter()
        .any(|suffix| name.ends_with(suffix))
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::{Path, PathBuf};

    use tempfile::tempdir;

    use super::{
        DirectoryEntry, EntryKind, FsSourceTree, ListedEntry, PublishNode, SourceTree,
        build_forest, forest_page_count, is_main_document,
    };
    use crate::test_support::MemoryTree;

    fn p(value: &str) -> PathBuf {
        PathBuf::from(value)
    }

    #[test]
    fn classify_skips_hidden_and_non_documents() {
        let hidden_dir = ListedEntry {
            path: p("/ws/.git"),
            kind: EntryKind::Directory,
        };
        let hidden_doc = ListedEntry {
            path: p("/ws/.draft.md"),
            kind: EntryKind::File,
        };
        let image = ListedEntry {
            path: p("/ws/pic.png"),
            kind: EntryKind::File,
        };
        let upper = ListedEntry {
            path: p("/ws/Guide.MD"),
            kind: EntryKind::File,
        };
        let doc = ListedEntry {
            path: p("/ws/Guide.md"),
            kind: EntryKind::File,
        };
        assert_eq!(DirectoryEntry::classify(&hidden_dir), None);
        assert_eq!(DirectoryEntry::classify(&hidden_doc), None);
        assert_eq!(DirectoryEntry::classify(&image), None);
        assert_eq!(DirectoryEntry::classify(&upper), None);
        assert_eq!(
            DirectoryEntry::classify(&doc),
            Some(DirectoryEntry::Document(p("/ws/Guide.md")))
        );
    }

    #[test]
    fn main_document_matches_stem_case_insensitively() {
        assert!(is_main_document(Path::new("/ws/README.md")));
        assert!(is_main_document(Path::new("/ws/Index.md")));
        assert!(is_main_document(Path::new("/ws/api-index.md")));
        assert!(!is_main_document(Path::new("/ws/notes.md")));
        assert!(!is_main_document(Path::new("/ws/index.txt")));
    }

    #[test]
    fn docs_scenario_builds_expected_forest() {
        let tree = MemoryTree::new("/ws")
            .with_file("/ws/docs/index.md", "# Docs")
            .with_file("/ws/docs/extra.md", "Extra")
            .with_file("/ws/docs/guide/usage.md", "# Usage");

        let forest = build_forest(&tree, Path::new("/ws")).expect("forest");
        assert_eq!(
            forest,
            vec![PublishNode {
                folder_path: p("/ws/docs"),
                main_document: Some(p("/ws/docs/index.md")),
                sibling_documents: vec![p("/ws/docs/extra.md")],
                children: vec![PublishNode {
                    folder_path: p("/ws/docs/guide"),
                    main_document: None,
                    sibling_documents: vec![p("/ws/docs/guide/usage.md")],
                    children: Vec::new(),
                }],
            }]
        );
        assert_eq!(forest_page_count(&forest), 4);
    }

    #[test]
    fn first_main_candidate_in_listing_order_wins() {
        let readme_first = MemoryTree::new("/ws")
            .with_file("/ws/README.md", "# Readme")
            .with_file("/ws/index.md", "# Index")
            .with_file("/ws/notes.md", "Notes");
        let forest = build_forest(&readme_first, Path::new("/ws")).expect("forest");
        assert_eq!(forest[0].main_document, Some(p("/ws/README.md")));
        assert_eq!(
            forest[0].sibling_documents,
            vec![p("/ws/index.md"), p("/ws/notes.md")]
        );

        let index_first = MemoryTree::new("/ws")
            .with_file("/ws/notes.md", "Notes")
            .with_file("/ws/index.md", "# Index")
            .with_file("/ws/README.md", "# Readme");
        let forest = build_forest(&index_first, Path::new("/ws")).expect("forest");
        assert_eq!(forest[0].main_document, Some(p("/ws/index.md")));
        assert_eq!(
            forest[0].sibling_documents,
            vec![p("/ws/notes.md"), p("/ws/README.md")]
        );
    }

    #[test]
    fn directories_without_documents_are_pruned() {
        let tree = MemoryTree::new("/ws")
            .with_dir("/ws/empty")
            .with_dir("/ws/assets/nested")
            .with_file("/ws/assets/logo.png", "binary")
            .with_file("/ws/docs/page.md", "Page");

        let forest = build_forest(&tree, Path::new("/ws")).expect("forest");
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].folder_path, p("/ws/docs"));
        assert!(forest[0].children.is_empty());
    }

    #[test]
    fn documentless_levels_hoist_their_children() {
        let tree = MemoryTree::new("/ws")
            .with_file("/ws/a/one/page.md", "One")
            .with_file("/ws/a/two/deeper/page.md", "Two")
            .with_file("/ws/b/index.md", "# B");

        let forest = build_forest(&tree, Path::new("/ws")).expect("forest");
        let folders: Vec<_> = forest.iter().map(|node| node.folder_path.clone()).collect();
        assert_eq!(
            folders,
            vec![p("/ws/a/one"), p("/ws/a/two/deeper"), p("/ws/b")]
        );
        assert!(forest.iter().all(|node| node.children.is_empty()));
    }

    #[test]
    fn node_without_main_document_keeps_all_siblings() {
        let tree = MemoryTree::new("/ws")
            .with_file("/ws/guide/b.md", "B")
            .with_file("/ws/guide/a.md", "A");
        let forest = build_forest(&tree, Path::new("/ws/guide")).expect("forest");
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].main_document, None);
        assert_eq!(
            forest[0].sibling_documents,
            vec![p("/ws/guide/b.md"), p("/ws/guide/a.md")]
        );
    }

    #[test]
    fn hidden_subtrees_never_contribute() {
        let tree = MemoryTree::new("/ws")
            .with_file("/ws/.github/README.md", "# Workflows")
            .with_file("/ws/docs/.hidden.md", "hidden");
        let forest = build_forest(&tree, Path::new("/ws")).expect("forest");
        assert!(forest.is_empty());
    }

    #[test]
    fn relative_to_strips_workspace_root() {
        let tree = MemoryTree::new("/ws")
            .with_file("/ws/docs/index.md", "# Docs")
            .with_file("/ws/docs/guide/usage.md", "# Usage");
        let forest = build_forest(&tree, Path::new("/ws")).expect("forest");
        let relative = forest[0].relative_to(Path::new("/ws"));
        assert_eq!(relative.folder_path, p("docs"));
        assert_eq!(relative.main_document, Some(p("docs/index.md")));
        assert_eq!(
            relative.children[0].sibling_documents,
            vec![p("docs/guide/usage.md")]
        );

        let json = serde_json::to_value(&relative.children[0]).expect("serialize");
        assert_eq!(json["folder_path"], "docs/guide");
        assert!(json.get("main_document").is_none());
    }

    #[test]
    fn filesystem_tree_scans_real_directories() {
        let temp = tempdir().expect("tempdir");
        let root = temp.path();
        fs::create_dir_all(root.join("docs").join("guide")).expect("create dirs");
        fs::create_dir_all(root.join(".git")).expect("create git dir");
        fs::create_dir_all(root.join("empty")).expect("create empty dir");
        fs::write(root.join("docs").join("index.md"), "# Docs").expect("write index");
        fs::write(root.join("docs").join("guide").join("usage.md"), "# Usage")
            .expect("write usage");
        fs::write(root.join(".git").join("README.md"), "# ignored").expect("write hidden");

        let forest = build_forest(&FsSourceTree, root).expect("forest");
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].folder_path, root.join("docs"));
        assert_eq!(forest[0].main_document, Some(root.join("docs").join("index.md")));
        assert_eq!(forest[0].children.len(), 1);
        assert_eq!(
            forest[0].children[0].sibling_documents,
            vec![root.join("docs").join("guide").join("usage.md")]
        );

        let content = FsSourceTree
            .read_document(&root.join("docs").join("index.md"))
            .expect("read");
        assert_eq!(content, "# Docs");
    }

    #[test]
    fn filesystem_tree_reports_missing_root() {
        let temp = tempdir().expect("tempdir");
        let missing = temp.path().join("missing");
        let error = build_forest(&FsSourceTree, &missing).expect_err("must fail");
        assert!(matches!(error, crate::SyncError::Filesystem { .. }));
    }
}
