//! Command-line interface module for dirsort.
//!
//! This module handles argument parsing, turning the arguments into a
//! [`SortConfig`], running the sorter and presenting the result.

use crate::config::{ConfigError, ConflictPolicy, Execution, SortConfig};
use crate::output::OutputFormatter;
use crate::sorter::{SortError, Sorter};
use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// Sort a directory tree into category folders.
///
/// By default files are moved into a new output tree next to the source and
/// the emptied source is removed. With `--in-place` the category folders are
/// created inside the source instead.
#[derive(Debug, Parser)]
#[command(name = "dirsort", version, about)]
pub struct Cli {
    /// Source folder
    #[arg(short, long)]
    pub source: PathBuf,

    /// Output folder, relative to the source's parent
    #[arg(short, long, default_value = "sorted", conflicts_with = "in_place")]
    pub output: PathBuf,

    /// Sort inside the source folder and keep it
    #[arg(long)]
    pub in_place: bool,

    /// Number of worker threads [default: available CPUs]
    #[arg(short, long, conflicts_with_all = ["in_place", "sequential"])]
    pub jobs: Option<usize>,

    /// Process files one at a time
    #[arg(long)]
    pub sequential: bool,

    /// Show what would happen without touching any file
    #[arg(long)]
    pub dry_run: bool,

    /// What to do when a destination name is taken
    #[arg(long, value_enum, default_value_t = ConflictPolicy::Rename)]
    pub conflict: ConflictPolicy,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,

    /// More log output (repeatable)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Cli {
    /// Builds the run configuration described by the arguments.
    ///
    /// `--in-place` always runs sequentially; otherwise `--sequential` and
    /// `--jobs` pick the execution mode, defaulting to one worker per CPU.
    ///
    /// # Example
    ///
    /// ```
    /// use clap::Parser;
    /// use dirsort::cli::Cli;
    /// use dirsort::config::SortMode;
    ///
    /// let cli = Cli::parse_from(["dirsort", "-s", "/inbox", "--in-place"]);
    /// assert_eq!(cli.to_config().mode(), SortMode::InPlace);
    /// ```
    pub fn to_config(&self) -> SortConfig {
        let config = if self.in_place {
            SortConfig::in_place(&self.source)
        } else {
            let execution = match (self.sequential, self.jobs) {
                (true, _) => Execution::Sequential,
                (false, Some(jobs)) => Execution::Parallel { jobs },
                (false, None) => Execution::parallel_default(),
            };
            SortConfig::separate_output(&self.source, &self.output).with_execution(execution)
        };
        config
            .with_conflict_policy(self.conflict)
            .with_dry_run(self.dry_run)
    }
}

/// Runs the CLI application.
///
/// Returns `Ok(true)` when every file was sorted, `Ok(false)` when some were
/// left in place. A source that is missing or not a directory is reported
/// and counts as success, with nothing processed.
///
/// # Arguments
///
/// * `cli` - Parsed command line arguments
///
/// # Errors
///
/// Returns an error if the run fails as a whole: the source tree cannot be
/// walked, the worker pool cannot start, the cleanup pass fails, or the JSON
/// report cannot be written.
///
/// # Examples
///
/// ```no_run
/// use clap::Parser;
/// use dirsort::cli::{Cli, run_cli};
///
/// let cli = Cli::parse_from(["dirsort", "--source", "/path/to/inbox"]);
/// match run_cli(&cli) {
///     Ok(all_sorted) => println!("all sorted: {all_sorted}"),
///     Err(e) => eprintln!("Error: {e:#}"),
/// }
/// ```
pub fn run_cli(cli: &Cli) -> anyhow::Result<bool> {
    let config = cli.to_config();
    let show_progress =
        matches!(config.execution(), Execution::Parallel { .. }) && !cli.json && !cli.quiet;

    if !cli.json {
        if config.is_dry_run() {
            OutputFormatter::dry_run_notice(&format!(
                "Analyzing contents of: {}",
                config.source().display()
            ));
        } else {
            OutputFormatter::info(&format!("Sorting contents of: {}", config.source().display()));
        }
    }

    let mut sorter = Sorter::new(config);
    if show_progress {
        sorter = sorter.with_progress(OutputFormatter::create_progress_bar());
    }

    let report = match sorter.run() {
        Ok(report) => report,
        Err(SortError::Config(
            e @ (ConfigError::SourceNotFound(_) | ConfigError::SourceNotDirectory(_)),
        )) => {
            OutputFormatter::error(&e.to_string());
            return Ok(true);
        }
        Err(e) => return Err(e.into()),
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        OutputFormatter::report(&report);
    }

    Ok(report.is_success())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SortMode;
    use std::path::Path;

    #[test]
    fn test_defaults_are_separate_output_parallel() {
        let cli = Cli::parse_from(["dirsort", "-s", "/data/inbox"]);
        let config = cli.to_config();
        assert_eq!(config.mode(), SortMode::SeparateOutput);
        assert_eq!(config.destination(), Path::new("/data/sorted"));
        assert!(matches!(config.execution(), Execution::Parallel { .. }));
        assert_eq!(config.conflict_policy(), ConflictPolicy::Rename);
    }

    #[test]
    fn test_in_place_is_sequential() {
        let cli = Cli::parse_from(["dirsort", "--source", "/data/inbox", "--in-place"]);
        let config = cli.to_config();
        assert_eq!(config.mode(), SortMode::InPlace);
        assert_eq!(config.execution(), Execution::Sequential);
        assert_eq!(config.destination(), Path::new("/data/inbox"));
    }

    #[test]
    fn test_explicit_jobs_and_options() {
        let cli = Cli::parse_from([
            "dirsort", "-s", "/in", "-o", "out", "-j", "3", "--conflict", "overwrite", "--dry-run",
        ]);
        let config = cli.to_config();
        assert_eq!(config.execution(), Execution::Parallel { jobs: 3 });
        assert_eq!(config.conflict_policy(), ConflictPolicy::Overwrite);
        assert!(config.is_dry_run());
        assert_eq!(config.destination(), Path::new("/out"));
    }

    #[test]
    fn test_sequential_flag() {
        let cli = Cli::parse_from(["dirsort", "-s", "/in", "--sequential"]);
        assert_eq!(cli.to_config().execution(), Execution::Sequential);
    }

    #[test]
    fn test_output_conflicts_with_in_place() {
        let result = Cli::try_parse_from(["dirsort", "-s", "/in", "-o", "x", "--in-place"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_source_is_required() {
        assert!(Cli::try_parse_from(["dirsort"]).is_err());
    }

    #[test]
    fn test_verbosity_counts() {
        let cli = Cli::parse_from(["dirsort", "-s", "/in", "-vv"]);
        assert_eq!(cli.verbose, 2);
        assert!(Cli::try_parse_from(["dirsort", "-s", "/in", "-v", "-q"]).is_err());
    }

    #[test]
    fn test_missing_source_exits_normally() {
        let cli = Cli::parse_from(["dirsort", "-s", "/no/such/inbox", "--in-place", "--json"]);
        assert!(run_cli(&cli).unwrap());
    }
}
