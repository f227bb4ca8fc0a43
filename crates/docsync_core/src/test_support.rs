//! In-memory fixtures shared by the unit tests.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{Result, SyncError};
use crate::tree::{EntryKind, ListedEntry, SourceTree};

/// `SourceTree` whose listing order is the order entries were added.
#[derive(Debug, Clone, Default)]
pub struct MemoryTree {
    listings: BTreeMap<PathBuf, Vec<ListedEntry>>,
    files: BTreeMap<PathBuf, String>,
}

impl MemoryTree {
    pub fn new(root: &str) -> Self {
        let mut tree = Self::default();
        tree.listings.insert(PathBuf::from(root), Vec::new());
        tree
    }

    pub fn with_dir(mut self, path: &str) -> Self {
        self.ensure_dir(Path::new(path));
        self
    }

    pub fn with_file(mut self, path: &str, content: &str) -> Self {
        let path = PathBuf::from(path);
        let parent = path.parent().expect("file has parent").to_path_buf();
        self.ensure_dir(&parent);
        self.listings
            .get_mut(&parent)
            .expect("parent listed")
            .push(ListedEntry {
                path: path.clone(),
                kind: EntryKind::File,
            });
        self.files.insert(path, content.to_string());
        self
    }

    fn ensure_dir(&mut self, dir: &Path) {
        if self.listings.contains_key(dir) {
            return;
        }
        if let Some(parent) = dir.parent() {
            self.ensure_dir(parent);
            if let Some(listing) = self.listings.get_mut(parent) {
                listing.push(ListedEntry {
                    path: dir.to_path_buf(),
                    kind: EntryKind::Directory,
                });
            }
        }
        self.listings.insert(dir.to_path_buf(), Vec::new());
    }
}

impl SourceTree for MemoryTree {
    fn list_dir(&self, dir: &Path) -> Result<Vec<ListedEntry>> {
        self.listings.get(dir).cloned().ok_or_else(|| {
            SyncError::filesystem(dir, io::Error::new(io::ErrorKind::NotFound, "no such dir"))
        })
    }

    fn read_document(&self, path: &Path) -> Result<String> {
        self.files.get(path).cloned().ok_or_else(|| {
            SyncError::filesystem(path, io::Error::new(io::ErrorKind::NotFound, "no such file"))
        })
    }
}
