/// Moving and extracting files into category directories.
///
/// Regular files are renamed to `<category>/<normalized_stem>.<EXT>` under
/// the destination root. Archives are unpacked into
/// `archives/<normalized_stem>/` and then deleted; a failed extraction leaves
/// the archive where it was.
use crate::archive::{self, ArchiveError};
use crate::config::{ConflictPolicy, SortConfig};
use crate::file_category::{Category, CategoryTable};
use crate::normalize::normalize;
use serde::Serialize;
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;
use tracing::debug;

/// What was done with a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Moved,
    Extracted,
}

/// Represents a single completed (or, in a dry run, planned) operation.
#[derive(Debug, Clone, Serialize)]
pub struct Operation {
    /// The original path of the file.
    pub original_path: PathBuf,
    /// Where the file went. For archives, the extraction directory.
    pub new_path: PathBuf,
    /// The category the file was classified into.
    pub category: Category,
    pub action: Action,
}

/// Errors that can occur while placing a single file.
#[derive(Debug, Error)]
pub enum OrganizeError {
    /// Failed to create a destination directory.
    #[error("Failed to create directory {}: {source}", path.display())]
    DirectoryCreationFailed { path: PathBuf, source: io::Error },

    /// Failed to move a file to its category directory.
    #[error("Failed to move {} to {}: {source}", file.display(), destination.display())]
    FileMoveFailure {
        file: PathBuf,
        destination: PathBuf,
        source: io::Error,
    },

    /// The archive could not be unpacked. The archive is left in place.
    #[error("Failed to extract {}: {source}", file.display())]
    ExtractionFailed {
        file: PathBuf,
        #[source]
        source: ArchiveError,
    },

    /// Extraction succeeded but the archive could not be deleted.
    #[error("Extracted {} but could not remove it: {source}", file.display())]
    ArchiveRemovalFailed { file: PathBuf, source: io::Error },

    /// The path has no file name component.
    #[error("Path has no file name: {}", .0.display())]
    NoFileName(PathBuf),
}

/// Result type for file organization operations.
pub type OrganizeResult<T> = Result<T, OrganizeError>;

/// Destination naming for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub category: Category,
    /// Normalized stem, never empty.
    pub stem: String,
    /// Upper-cased extension, if the file has one.
    pub extension: Option<String>,
}

impl Placement {
    /// File name for the `n`th candidate: `stem.EXT`, then `stem_1.EXT`, ...
    pub fn file_name(&self, n: usize) -> String {
        let stem = if n == 0 {
            self.stem.clone()
        } else {
            format!("{}_{}", self.stem, n)
        };
        match &self.extension {
            Some(ext) => format!("{stem}.{ext}"),
            None => stem,
        }
    }

    /// Directory name for the `n`th extraction candidate.
    pub fn dir_name(&self, n: usize) -> String {
        if n == 0 {
            self.stem.clone()
        } else {
            format!("{}_{}", self.stem, n)
        }
    }
}

/// Places files into category directories according to a [`SortConfig`].
///
/// One organizer is shared across worker threads. In a dry run it remembers
/// the destinations it has planned so two files are never planned onto the
/// same name.
pub struct FileOrganizer<'a> {
    config: &'a SortConfig,
    table: CategoryTable,
    planned: Mutex<HashSet<PathBuf>>,
}

impl<'a> FileOrganizer<'a> {
    pub fn new(config: &'a SortConfig) -> Self {
        Self {
            config,
            table: CategoryTable::default(),
            planned: Mutex::new(HashSet::new()),
        }
    }

    /// Classifies a file and computes its normalized name.
    ///
    /// # Examples
    ///
    /// ```
    /// use dirsort::config::SortConfig;
    /// use dirsort::file_category::Category;
    /// use dirsort::file_organizer::FileOrganizer;
    /// use std::path::Path;
    ///
    /// let config = SortConfig::in_place(Path::new("/inbox"));
    /// let organizer = FileOrganizer::new(&config);
    /// let placement = organizer.placement(Path::new("/inbox/фото.jpg")).unwrap();
    /// assert_eq!(placement.category, Category::Images);
    /// assert_eq!(placement.file_name(0), "foto.JPG");
    /// ```
    pub fn placement(&self, file_path: &Path) -> OrganizeResult<Placement> {
        let name = file_path
            .file_name()
            .ok_or_else(|| OrganizeError::NoFileName(file_path.to_path_buf()))?;
        // `file.` has an empty extension; its trailing dot stays in the stem.
        let (stem, extension) = match file_path.extension().filter(|ext| !ext.is_empty()) {
            Some(ext) => (
                file_path.file_stem().unwrap_or(name).to_string_lossy(),
                Some(ext.to_string_lossy().to_uppercase()),
            ),
            None => (name.to_string_lossy(), None),
        };

        let mut stem = normalize(&stem);
        if stem.is_empty() {
            stem.push('_');
        }

        Ok(Placement {
            category: self.table.classify_path(file_path),
            stem,
            extension,
        })
    }

    /// Moves or extracts a file into its category directory.
    ///
    /// In a dry run nothing on disk changes and the returned operation
    /// describes what would have happened.
    pub fn organize(&self, file_path: &Path) -> OrganizeResult<Operation> {
        let placement = self.placement(file_path)?;

        if self.config.is_dry_run() {
            return Ok(self.preview(file_path, &placement));
        }

        let category_dir = self.config.category_dir(placement.category);
        ensure_dir(&category_dir)?;

        if placement.category.is_extracted() {
            self.extract_into(file_path, &category_dir, &placement)
        } else {
            self.move_into(file_path, &category_dir, &placement)
        }
    }

    fn move_into(
        &self,
        file_path: &Path,
        category_dir: &Path,
        placement: &Placement,
    ) -> OrganizeResult<Operation> {
        let move_err = |destination: &Path, source| OrganizeError::FileMoveFailure {
            file: file_path.to_path_buf(),
            destination: destination.to_path_buf(),
            source,
        };

        let destination = match self.config.conflict_policy() {
            ConflictPolicy::Overwrite => category_dir.join(placement.file_name(0)),
            ConflictPolicy::Rename => reserve_file(category_dir, placement)
                .map_err(|e| move_err(category_dir, e))?,
        };

        if let Err(e) = move_file(file_path, &destination) {
            if self.config.conflict_policy() == ConflictPolicy::Rename {
                let _ = fs::remove_file(&destination);
            }
            return Err(move_err(&destination, e));
        }

        debug!(from = %file_path.display(), to = %destination.display(), "moved");
        Ok(Operation {
            original_path: file_path.to_path_buf(),
            new_path: destination,
            category: placement.category,
            action: Action::Moved,
        })
    }

    fn extract_into(
        &self,
        file_path: &Path,
        category_dir: &Path,
        placement: &Placement,
    ) -> OrganizeResult<Operation> {
        // Always unpack into a freshly claimed directory. Under `Overwrite`
        // it replaces the existing extraction only once the archive is gone.
        let mut target = reserve_dir(category_dir, placement).map_err(|e| {
            OrganizeError::DirectoryCreationFailed {
                path: category_dir.join(placement.dir_name(0)),
                source: e,
            }
        })?;

        if let Err(e) = archive::extract(file_path, &target) {
            debug!(archive = %file_path.display(), error = %e, "extraction failed, archive left in place");
            archive::discard_partial(&target);
            return Err(OrganizeError::ExtractionFailed {
                file: file_path.to_path_buf(),
                source: e,
            });
        }

        remove_archive(file_path, &target)?;

        if self.config.conflict_policy() == ConflictPolicy::Overwrite {
            let preferred = category_dir.join(placement.dir_name(0));
            if target != preferred {
                replace_dir(&target, &preferred)?;
                target = preferred;
            }
        }

        debug!(archive = %file_path.display(), into = %target.display(), "extracted");
        Ok(Operation {
            original_path: file_path.to_path_buf(),
            new_path: target,
            category: placement.category,
            action: Action::Extracted,
        })
    }

    /// Computes where a file would go without touching the filesystem.
    fn preview(&self, file_path: &Path, placement: &Placement) -> Operation {
        let category_dir = self.config.category_dir(placement.category);
        let overwrite = self.config.conflict_policy() == ConflictPolicy::Overwrite;
        let extracted = placement.category.is_extracted();

        let mut planned = self.planned.lock().unwrap_or_else(PoisonError::into_inner);
        let mut n = 0;
        let new_path = loop {
            let name = if extracted {
                placement.dir_name(n)
            } else {
                placement.file_name(n)
            };
            let candidate = category_dir.join(name);
            if overwrite || (!candidate.exists() && !planned.contains(&candidate)) {
                break candidate;
            }
            n += 1;
        };
        planned.insert(new_path.clone());

        Operation {
            original_path: file_path.to_path_buf(),
            new_path,
            category: placement.category,
            action: if extracted {
                Action::Extracted
            } else {
                Action::Moved
            },
        }
    }
}

/// Creates a directory and its parents. Succeeds if it already exists, even
/// when another worker created it concurrently.
fn ensure_dir(path: &Path) -> OrganizeResult<()> {
    fs::create_dir_all(path).map_err(|e| OrganizeError::DirectoryCreationFailed {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Claims the first free file name by creating an empty placeholder.
///
/// `create_new` is atomic, so two workers can never claim the same name.
fn reserve_file(dir: &Path, placement: &Placement) -> io::Result<PathBuf> {
    let mut n = 0;
    loop {
        let candidate = dir.join(placement.file_name(n));
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
        {
            Ok(_) => return Ok(candidate),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => n += 1,
            Err(e) => return Err(e),
        }
    }
}

/// Claims the first free extraction directory.
fn reserve_dir(dir: &Path, placement: &Placement) -> io::Result<PathBuf> {
    let mut n = 0;
    loop {
        let candidate = dir.join(placement.dir_name(n));
        match fs::create_dir(&candidate) {
            Ok(()) => return Ok(candidate),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => n += 1,
            Err(e) => return Err(e),
        }
    }
}

/// Deletes an archive that has been unpacked into `extracted`.
///
/// If the archive cannot be deleted the extraction is discarded as well, so
/// the archive is still the only copy of its contents and a later run
/// unpacks it once.
fn remove_archive(archive_path: &Path, extracted: &Path) -> OrganizeResult<()> {
    fs::remove_file(archive_path).map_err(|e| {
        archive::discard_partial(extracted);
        OrganizeError::ArchiveRemovalFailed {
            file: archive_path.to_path_buf(),
            source: e,
        }
    })
}

/// Moves a finished extraction onto `destination`, replacing whatever was
/// there.
fn replace_dir(extracted: &Path, destination: &Path) -> OrganizeResult<()> {
    let replace_err = |source| OrganizeError::DirectoryCreationFailed {
        path: destination.to_path_buf(),
        source,
    };
    if destination.is_dir() {
        fs::remove_dir_all(destination).map_err(replace_err)?;
    } else if destination.exists() {
        fs::remove_file(destination).map_err(replace_err)?;
    }
    fs::rename(extracted, destination).map_err(replace_err)
}

/// Renames a file, falling back to copy and delete across filesystems.
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    fn setup() -> (TempDir, PathBuf) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let source = temp_dir.path().join("inbox");
        fs::create_dir(&source).expect("Failed to create source");
        (temp_dir, source)
    }

    fn write_zip(path: &Path, name: &str, content: &str) {
        let mut writer = zip::ZipWriter::new(File::create(path).unwrap());
        writer.start_file(name, SimpleFileOptions::default()).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
        writer.finish().unwrap();
    }

    #[test]
    fn test_placement_names() {
        let config = SortConfig::in_place(Path::new("/inbox"));
        let organizer = FileOrganizer::new(&config);

        let p = organizer.placement(Path::new("/inbox/my photo.jpeg")).unwrap();
        assert_eq!(p.category, Category::Images);
        assert_eq!(p.file_name(0), "my_photo.JPEG");
        assert_eq!(p.file_name(2), "my_photo_2.JPEG");

        let p = organizer.placement(Path::new("/inbox/README")).unwrap();
        assert_eq!(p.category, Category::Other);
        assert_eq!(p.file_name(0), "README");

        let p = organizer.placement(Path::new("/inbox/backup.tar.gz")).unwrap();
        assert_eq!(p.category, Category::Archives);
        assert_eq!(p.dir_name(0), "backup_tar");
    }

    #[test]
    fn test_placement_of_trailing_dot_name() {
        let config = SortConfig::in_place(Path::new("/inbox"));
        let organizer = FileOrganizer::new(&config);

        let p = organizer.placement(Path::new("/inbox/file.")).unwrap();
        assert_eq!(p.category, Category::Other);
        assert_eq!(p.extension, None);
        assert_eq!(p.file_name(0), "file_");

        let p = organizer.placement(Path::new("/inbox/.hidden")).unwrap();
        assert_eq!(p.file_name(0), "_hidden");
    }

    #[test]
    fn test_move_creates_category_directory() {
        let (temp_dir, source) = setup();
        let file_path = source.join("notes.docx");
        fs::write(&file_path, "test content").unwrap();

        let config = SortConfig::separate_output(&source, Path::new("sorted"));
        let op = FileOrganizer::new(&config).organize(&file_path).unwrap();

        let expected = temp_dir.path().join("sorted").join("documents").join("notes.DOCX");
        assert_eq!(op.new_path, expected);
        assert_eq!(op.action, Action::Moved);
        assert!(!file_path.exists());
        assert_eq!(fs::read_to_string(expected).unwrap(), "test content");
    }

    #[test]
    fn test_collision_renames_with_suffix() {
        let (_temp_dir, source) = setup();
        let images = source.join("images");
        fs::create_dir(&images).unwrap();
        fs::write(images.join("photo.JPG"), "old").unwrap();
        let file_path = source.join("photo.jpg");
        fs::write(&file_path, "new").unwrap();

        let config = SortConfig::in_place(&source);
        let op = FileOrganizer::new(&config).organize(&file_path).unwrap();

        assert_eq!(op.new_path, images.join("photo_1.JPG"));
        assert_eq!(fs::read_to_string(images.join("photo.JPG")).unwrap(), "old");
        assert_eq!(fs::read_to_string(images.join("photo_1.JPG")).unwrap(), "new");
    }

    #[test]
    fn test_collision_overwrite_policy() {
        let (_temp_dir, source) = setup();
        let images = source.join("images");
        fs::create_dir(&images).unwrap();
        fs::write(images.join("photo.JPG"), "old").unwrap();
        let file_path = source.join("photo.jpg");
        fs::write(&file_path, "new").unwrap();

        let config = SortConfig::in_place(&source).with_conflict_policy(ConflictPolicy::Overwrite);
        let op = FileOrganizer::new(&config).organize(&file_path).unwrap();

        assert_eq!(op.new_path, images.join("photo.JPG"));
        assert_eq!(fs::read_to_string(images.join("photo.JPG")).unwrap(), "new");
        assert!(!images.join("photo_1.JPG").exists());
    }

    #[test]
    fn test_archive_is_extracted_and_removed() {
        let (_temp_dir, source) = setup();
        let archive_path = source.join("archive.zip");
        write_zip(&archive_path, "a.txt", "alpha");

        let config = SortConfig::in_place(&source);
        let op = FileOrganizer::new(&config).organize(&archive_path).unwrap();

        let target = source.join("archives").join("archive");
        assert_eq!(op.action, Action::Extracted);
        assert_eq!(op.new_path, target);
        assert_eq!(fs::read_to_string(target.join("a.txt")).unwrap(), "alpha");
        assert!(!archive_path.exists());
    }

    #[test]
    fn test_failed_extraction_keeps_archive() {
        let (_temp_dir, source) = setup();
        let archive_path = source.join("broken.zip");
        fs::write(&archive_path, "not a zip").unwrap();

        let config = SortConfig::in_place(&source);
        let result = FileOrganizer::new(&config).organize(&archive_path);

        assert!(matches!(
            result,
            Err(OrganizeError::ExtractionFailed { .. })
        ));
        assert!(archive_path.exists());
        assert!(!source.join("archives").join("broken").exists());
    }

    #[test]
    fn test_dry_run_changes_nothing() {
        let (temp_dir, source) = setup();
        let file_path = source.join("song.mp3");
        fs::write(&file_path, "la").unwrap();

        let config = SortConfig::separate_output(&source, Path::new("sorted")).with_dry_run(true);
        let op = FileOrganizer::new(&config).organize(&file_path).unwrap();

        assert_eq!(
            op.new_path,
            temp_dir.path().join("sorted").join("audio").join("song.MP3")
        );
        assert!(file_path.exists());
        assert!(!temp_dir.path().join("sorted").exists());
    }

    #[test]
    fn test_overwrite_replaces_previous_extraction() {
        let (_temp_dir, source) = setup();
        let previous = source.join("archives").join("bundle");
        fs::create_dir_all(&previous).unwrap();
        fs::write(previous.join("old.txt"), "old").unwrap();
        let archive_path = source.join("bundle.zip");
        write_zip(&archive_path, "new.txt", "new");

        let config = SortConfig::in_place(&source).with_conflict_policy(ConflictPolicy::Overwrite);
        let op = FileOrganizer::new(&config).organize(&archive_path).unwrap();

        assert_eq!(op.new_path, previous);
        assert_eq!(fs::read_to_string(previous.join("new.txt")).unwrap(), "new");
        assert!(!previous.join("old.txt").exists());
        assert!(!source.join("archives").join("bundle_1").exists());
        assert!(!archive_path.exists());
    }

    #[test]
    fn test_overwrite_keeps_previous_extraction_when_archive_is_corrupt() {
        let (_temp_dir, source) = setup();
        let previous = source.join("archives").join("bundle");
        fs::create_dir_all(&previous).unwrap();
        fs::write(previous.join("keep.txt"), "kept").unwrap();
        let archive_path = source.join("bundle.zip");
        fs::write(&archive_path, "not a zip").unwrap();

        let config = SortConfig::in_place(&source).with_conflict_policy(ConflictPolicy::Overwrite);
        let result = FileOrganizer::new(&config).organize(&archive_path);

        assert!(matches!(
            result,
            Err(OrganizeError::ExtractionFailed { .. })
        ));
        assert_eq!(fs::read_to_string(previous.join("keep.txt")).unwrap(), "kept");
        assert!(!source.join("archives").join("bundle_1").exists());
        assert!(archive_path.exists());
    }

    #[test]
    fn test_unremovable_archive_discards_extraction() {
        let (_temp_dir, source) = setup();
        let extracted = source.join("archives").join("gone");
        fs::create_dir_all(&extracted).unwrap();
        fs::write(extracted.join("a.txt"), "alpha").unwrap();

        let result = remove_archive(&source.join("gone.zip"), &extracted);

        assert!(matches!(
            result,
            Err(OrganizeError::ArchiveRemovalFailed { .. })
        ));
        assert!(!extracted.exists());
    }

    #[test]
    fn test_dry_run_plans_distinct_names() {
        let (temp_dir, source) = setup();
        fs::create_dir_all(source.join("a")).unwrap();
        fs::create_dir_all(source.join("b")).unwrap();
        fs::write(source.join("a/photo.jpg"), "a").unwrap();
        fs::write(source.join("b/photo.jpg"), "b").unwrap();
        fs::write(source.join("bundle.zip"), "zip").unwrap();
        fs::write(source.join("a/bundle.tar"), "tar").unwrap();

        let config = SortConfig::separate_output(&source, Path::new("sorted")).with_dry_run(true);
        let organizer = FileOrganizer::new(&config);
        let first = organizer.organize(&source.join("a/photo.jpg")).unwrap();
        let second = organizer.organize(&source.join("b/photo.jpg")).unwrap();
        let zip = organizer.organize(&source.join("bundle.zip")).unwrap();
        let tar = organizer.organize(&source.join("a/bundle.tar")).unwrap();

        let images = temp_dir.path().join("sorted").join("images");
        let archives = temp_dir.path().join("sorted").join("archives");
        assert_eq!(first.new_path, images.join("photo.JPG"));
        assert_eq!(second.new_path, images.join("photo_1.JPG"));
        assert_eq!(zip.new_path, archives.join("bundle"));
        assert_eq!(tar.new_path, archives.join("bundle_1"));
        assert!(!temp_dir.path().join("sorted").exists());
    }
}
