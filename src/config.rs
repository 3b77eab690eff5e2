//! Run configuration.
//!
//! A [`SortConfig`] carries everything a sorting run needs: where files come
//! from, where category folders go, how work is dispatched and what happens
//! on a name collision. It is built once from command-line arguments and
//! passed down explicitly.
//!
//! ```
//! use dirsort::config::{ConflictPolicy, SortConfig};
//! use std::path::Path;
//!
//! let config = SortConfig::separate_output(Path::new("/data/inbox"), Path::new("sorted"))
//!     .with_conflict_policy(ConflictPolicy::Overwrite);
//! assert_eq!(config.destination(), Path::new("/data/sorted"));
//! ```

use crate::file_category::Category;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that make a configuration unusable.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The source path does not exist.
    #[error("There is no such dir: {}", .0.display())]
    SourceNotFound(PathBuf),
    /// The source path exists but is not a directory.
    #[error("Not a directory: {}", .0.display())]
    SourceNotDirectory(PathBuf),
    /// Sorting into the source itself must use in-place mode.
    #[error("Output directory is the source directory: {}", .0.display())]
    DestinationIsSource(PathBuf),
    /// A worker count of zero.
    #[error("Worker count must be at least 1")]
    NoWorkers,
}

/// Where category folders are created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    /// Into a separate output tree; the emptied source root is removed.
    SeparateOutput,
    /// Into the source directory itself; the source root is kept.
    InPlace,
}

/// How files are dispatched to the mover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Execution {
    /// Collect every file first, then process them on a worker pool.
    Parallel { jobs: usize },
    /// Walk and process one file at a time on the calling thread.
    Sequential,
}

impl Execution {
    /// Parallel execution sized to the available CPU parallelism.
    pub fn parallel_default() -> Self {
        let jobs = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Execution::Parallel { jobs }
    }
}

/// What to do when the destination name is already taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Pick the first free name among `stem.EXT`, `stem_1.EXT`, `stem_2.EXT`, ...
    #[default]
    Rename,
    /// Replace whatever is already there.
    Overwrite,
}

/// Configuration for one sorting run.
#[derive(Debug, Clone, Serialize)]
pub struct SortConfig {
    source: PathBuf,
    destination: PathBuf,
    mode: SortMode,
    execution: Execution,
    conflict_policy: ConflictPolicy,
    dry_run: bool,
}

impl SortConfig {
    /// Sort `source` into `output`, resolved against the source's parent.
    ///
    /// An absolute `output` is used as given. Defaults to parallel execution.
    pub fn separate_output(source: &Path, output: &Path) -> Self {
        let parent = source.parent().unwrap_or_else(|| Path::new(""));
        Self {
            source: source.to_path_buf(),
            destination: parent.join(output),
            mode: SortMode::SeparateOutput,
            execution: Execution::parallel_default(),
            conflict_policy: ConflictPolicy::default(),
            dry_run: false,
        }
    }

    /// Sort `source` into category folders inside itself, sequentially.
    pub fn in_place(source: &Path) -> Self {
        Self {
            source: source.to_path_buf(),
            destination: source.to_path_buf(),
            mode: SortMode::InPlace,
            execution: Execution::Sequential,
            conflict_policy: ConflictPolicy::default(),
            dry_run: false,
        }
    }

    pub fn with_execution(mut self, execution: Execution) -> Self {
        self.execution = execution;
        self
    }

    pub fn with_conflict_policy(mut self, policy: ConflictPolicy) -> Self {
        self.conflict_policy = policy;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Root under which category folders are created.
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn mode(&self) -> SortMode {
        self.mode
    }

    pub fn execution(&self) -> Execution {
        self.execution
    }

    pub fn conflict_policy(&self) -> ConflictPolicy {
        self.conflict_policy
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Directory a category's files are placed in.
    pub fn category_dir(&self, category: Category) -> PathBuf {
        self.destination.join(category.dir_name())
    }

    /// Directories under the source that belong to the destination tree and
    /// must be neither walked nor pruned.
    pub fn skipped_dirs(&self) -> Vec<PathBuf> {
        match self.mode {
            SortMode::InPlace => Category::ALL
                .iter()
                .map(|category| self.category_dir(*category))
                .collect(),
            SortMode::SeparateOutput if self.destination.starts_with(&self.source) => {
                vec![self.destination.clone()]
            }
            SortMode::SeparateOutput => Vec::new(),
        }
    }

    /// Checks that the run can start.
    ///
    /// # Errors
    ///
    /// Returns an error if the source is missing or not a directory, if a
    /// separate output resolves to the source itself, or if zero workers
    /// were requested.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.source.exists() {
            return Err(ConfigError::SourceNotFound(self.source.clone()));
        }
        if !self.source.is_dir() {
            return Err(ConfigError::SourceNotDirectory(self.source.clone()));
        }
        if self.mode == SortMode::SeparateOutput && self.destination == self.source {
            return Err(ConfigError::DestinationIsSource(self.destination.clone()));
        }
        if self.execution == (Execution::Parallel { jobs: 0 }) {
            return Err(ConfigError::NoWorkers);
        }
        Ok(())
    }
}
