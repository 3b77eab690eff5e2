//! The sorting pipeline: walk, place every file, prune, report.
//!
//! In parallel mode the whole file list is collected first and spread over a
//! rayon pool; in sequential mode files are placed one by one as the walk
//! finds them. Either way a failure on one file is recorded and the run
//! continues. Cleanup only starts after every file has been handled.

use crate::cleanup::prune_empty_dirs;
use crate::config::{ConfigError, Execution, SortConfig, SortMode};
use crate::file_category::Category;
use crate::file_organizer::{FileOrganizer, Operation, OrganizeResult};
use crate::walker::TreeWalker;
use chrono::{DateTime, Utc};
use indicatif::ProgressBar;
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that stop a run as a whole. Per-file failures do not.
#[derive(Debug, Error)]
pub enum SortError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to walk source tree: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Failed to clean up {}: {source}", path.display())]
    Cleanup { path: PathBuf, source: io::Error },
}

/// A file that could not be placed. It is still where it was.
#[derive(Debug, Clone, Serialize)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: String,
}

/// Outcome of a sorting run.
#[derive(Debug, Clone, Serialize)]
pub struct SortReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub config: SortConfig,
    pub operations: Vec<Operation>,
    pub failures: Vec<FileFailure>,
    /// Directories removed by the cleanup pass, deepest first.
    pub removed_dirs: Vec<PathBuf>,
    /// Whether the emptied source root was removed (separate-output mode).
    pub source_removed: bool,
}

impl SortReport {
    /// Every file was placed.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of placed files per category, in category order. Categories
    /// with no files are omitted.
    pub fn category_counts(&self) -> Vec<(Category, usize)> {
        Category::ALL
            .iter()
            .map(|category| {
                let count = self
                    .operations
                    .iter()
                    .filter(|op| op.category == *category)
                    .count();
                (*category, count)
            })
            .filter(|(_, count)| *count > 0)
            .collect()
    }
}

/// Runs a [`SortConfig`] end to end.
pub struct Sorter {
    config: SortConfig,
    progress: Option<ProgressBar>,
}

impl Sorter {
    pub fn new(config: SortConfig) -> Self {
        Self {
            config,
            progress: None,
        }
    }

    /// Advances `progress` once per handled file. Its length is set once the
    /// file count is known.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn config(&self) -> &SortConfig {
        &self.config
    }

    /// Sorts the source tree.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the source tree
    /// cannot be walked, or the cleanup pass fails. Failures on individual
    /// files are reported in [`SortReport::failures`] instead.
    pub fn run(&self) -> Result<SortReport, SortError> {
        self.config.validate()?;
        let started_at = Utc::now();
        info!(
            source = %self.config.source().display(),
            destination = %self.config.destination().display(),
            "sorting"
        );

        let outcomes = match self.config.execution() {
            Execution::Parallel { jobs } => self.run_parallel(jobs)?,
            Execution::Sequential => self.run_sequential()?,
        };
        if let Some(progress) = &self.progress {
            progress.finish_and_clear();
        }

        let mut operations = Vec::new();
        let mut failures = Vec::new();
        for (path, outcome) in outcomes {
            match outcome {
                Ok(operation) => operations.push(operation),
                Err(e) => {
                    debug!(file = %path.display(), error = %e, "file left in place");
                    failures.push(FileFailure {
                        path,
                        error: e.to_string(),
                    });
                }
            }
        }

        let (removed_dirs, source_removed) = if self.config.is_dry_run() {
            (Vec::new(), false)
        } else {
            self.clean_up()?
        };

        info!(
            placed = operations.len(),
            failed = failures.len(),
            pruned = removed_dirs.len(),
            "finished"
        );
        Ok(SortReport {
            started_at,
            finished_at: Utc::now(),
            config: self.config.clone(),
            operations,
            failures,
            removed_dirs,
            source_removed,
        })
    }

    fn walker(&self) -> TreeWalker {
        TreeWalker::new(self.config.source()).skipping(self.config.skipped_dirs())
    }

    fn place(
        &self,
        organizer: &FileOrganizer<'_>,
        file: PathBuf,
    ) -> (PathBuf, OrganizeResult<Operation>) {
        let outcome = organizer.organize(&file);
        if let Some(progress) = &self.progress {
            progress.inc(1);
        }
        (file, outcome)
    }

    fn run_parallel(
        &self,
        jobs: usize,
    ) -> Result<Vec<(PathBuf, OrganizeResult<Operation>)>, SortError> {
        let files = self.walker().collect_files()?;
        info!(files = files.len(), jobs, "dispatching to worker pool");
        if let Some(progress) = &self.progress {
            progress.set_length(files.len() as u64);
        }

        let organizer = FileOrganizer::new(&self.config);
        let pool = rayon::ThreadPoolBuilder::new().num_threads(jobs).build()?;
        // install() returns only after every worker is done.
        Ok(pool.install(|| {
            files
                .into_par_iter()
                .map(|file| self.place(&organizer, file))
                .collect()
        }))
    }

    fn run_sequential(&self) -> Result<Vec<(PathBuf, OrganizeResult<Operation>)>, SortError> {
        let organizer = FileOrganizer::new(&self.config);
        let mut outcomes = Vec::new();
        self.walker().for_each_file(|file| {
            if let Some(progress) = &self.progress {
                progress.inc_length(1);
            }
            outcomes.push(self.place(&organizer, file));
        })?;
        Ok(outcomes)
    }

    /// Prunes empty directories, then removes the source root in
    /// separate-output mode.
    fn clean_up(&self) -> Result<(Vec<PathBuf>, bool), SortError> {
        let source = self.config.source();
        let removed = prune_empty_dirs(source, &self.config.skipped_dirs()).map_err(|e| {
            SortError::Cleanup {
                path: source.to_path_buf(),
                source: e,
            }
        })?;

        let source_removed = self.config.mode() == SortMode::SeparateOutput
            && !self.config.destination().starts_with(source)
            && remove_source_root(source);

        Ok((removed, source_removed))
    }
}

fn remove_source_root(source: &Path) -> bool {
    match fs::remove_dir(source) {
        Ok(()) => {
            debug!(dir = %source.display(), "removed source root");
            true
        }
        Err(e) => {
            warn!(dir = %source.display(), error = %e, "source root not removed");
            false
        }
    }
}
