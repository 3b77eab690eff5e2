//! Post-pass removal of empty directories.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Removes every directory under `root` that is empty once its own
/// subdirectories have been pruned.
///
/// Children are handled before their parent, so a chain of nested empty
/// directories disappears in one pass. `root` itself is never removed, and
/// directories listed in `skip` are neither entered nor removed. Symbolic
/// links are left alone. Returns the removed directories, deepest first.
///
/// # Errors
///
/// Fails if a directory cannot be listed or an empty one cannot be removed.
pub fn prune_empty_dirs(root: &Path, skip: &[PathBuf]) -> io::Result<Vec<PathBuf>> {
    let mut removed = Vec::new();
    prune(root, skip, &mut removed)?;
    Ok(removed)
}

fn prune(dir: &Path, skip: &[PathBuf], removed: &mut Vec<PathBuf>) -> io::Result<()> {
    let mut subdirs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            subdirs.push(entry.path());
        }
    }

    for subdir in subdirs {
        if skip.contains(&subdir) {
            continue;
        }
        prune(&subdir, skip, removed)?;
        if fs::read_dir(&subdir)?.next().is_none() {
            fs::remove_dir(&subdir)?;
            debug!(dir = %subdir.display(), "removed empty directory");
            removed.push(subdir);
        }
    }
    Ok(())
}
