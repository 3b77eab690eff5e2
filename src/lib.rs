//! dirsort - sort a directory tree into category folders
//!
//! This library classifies files by extension, normalizes their names
//! (transliterating Cyrillic, collapsing punctuation), moves them into
//! category subdirectories, unpacks archives, and prunes the directories
//! left empty behind them.

pub mod archive;
pub mod cleanup;
pub mod cli;
pub mod config;
pub mod file_category;
pub mod file_organizer;
pub mod logging;
pub mod normalize;
pub mod output;
pub mod sorter;
pub mod walker;

pub use config::{ConfigError, ConflictPolicy, Execution, SortConfig, SortMode};
pub use file_category::{Category, CategoryTable};
pub use file_organizer::{FileOrganizer, Operation, OrganizeError};
pub use sorter::{SortError, SortReport, Sorter};

pub use cli::{Cli, run_cli};
