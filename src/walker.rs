//! Source tree enumeration.
//!
//! Only leaf entries are yielded; directories are descended into but never
//! returned. Symbolic links are not followed, so a link (to a file or a
//! directory) is yielded as a leaf like any regular file. Entries within a
//! directory are visited in file-name order.

use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Walks every file under a root directory.
#[derive(Debug, Clone)]
pub struct TreeWalker {
    root: PathBuf,
    skip: Vec<PathBuf>,
}

impl TreeWalker {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            skip: Vec::new(),
        }
    }

    /// Directories that are not entered at all.
    pub fn skipping(mut self, dirs: Vec<PathBuf>) -> Self {
        self.skip = dirs;
        self
    }

    fn is_skipped(&self, entry: &DirEntry) -> bool {
        entry.file_type().is_dir() && self.skip.iter().any(|dir| dir == entry.path())
    }

    fn files(&self) -> impl Iterator<Item = walkdir::Result<PathBuf>> + '_ {
        WalkDir::new(&self.root)
            .follow_links(false)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !self.is_skipped(entry))
            .filter_map(|entry| match entry {
                Ok(entry) if entry.file_type().is_dir() => None,
                Ok(entry) => Some(Ok(entry.into_path())),
                Err(e) => Some(Err(e)),
            })
    }

    /// Enumerates every file before any is processed.
    ///
    /// # Errors
    ///
    /// Fails on the first directory that cannot be read.
    pub fn collect_files(&self) -> walkdir::Result<Vec<PathBuf>> {
        self.files().collect()
    }

    /// Hands each file to `handle` as soon as it is discovered.
    ///
    /// Each directory's listing is read in full before its entries are
    /// handed out, so `handle` may move the file it receives.
    pub fn for_each_file<F>(&self, mut handle: F) -> walkdir::Result<()>
    where
        F: FnMut(PathBuf),
    {
        for file in self.files() {
            handle(file?);
        }
        Ok(())
    }
}
