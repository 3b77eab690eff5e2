//! Output formatting and styling module.
//!
//! Provides a centralized interface for user-facing CLI output: colored
//! status lines, the progress bar, and the per-category summary table.
//! Diagnostics go through `tracing` instead.

use crate::file_category::Category;
use crate::sorter::SortReport;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

/// Manages all CLI output with consistent styling and formatting.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    ///
    /// # Arguments
    ///
    /// * `message` - The message to display
    ///
    /// # Example
    ///
    /// ```no_run
    /// use dirsort::output::OutputFormatter;
    /// OutputFormatter::success("Finished");
    /// ```
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark, on stderr.
    ///
    /// # Arguments
    ///
    /// * `message` - The message to display
    ///
    /// # Example
    ///
    /// ```no_run
    /// use dirsort::output::OutputFormatter;
    /// OutputFormatter::error("There is no such dir: /tmp/inbox");
    /// ```
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    ///
    /// # Arguments
    ///
    /// * `message` - The message to display
    ///
    /// # Example
    ///
    /// ```no_run
    /// use dirsort::output::OutputFormatter;
    /// OutputFormatter::warning("2 files could not be sorted and were left in place");
    /// ```
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints an info message in cyan.
    ///
    /// # Arguments
    ///
    /// * `message` - The message to display
    ///
    /// # Example
    ///
    /// ```no_run
    /// use dirsort::output::OutputFormatter;
    /// OutputFormatter::info("Sorting /home/user/Downloads");
    /// ```
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    /// Prints a section header.
    ///
    /// # Arguments
    ///
    /// * `header` - The header text
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Prints a dry-run notice message.
    ///
    /// # Arguments
    ///
    /// * `message` - The notice to display after the `[DRY RUN]` tag
    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }

    /// Creates a progress bar whose length is filled in once the number of
    /// files is known.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use dirsort::output::OutputFormatter;
    /// let pb = OutputFormatter::create_progress_bar();
    /// pb.set_length(10);
    /// pb.inc(1);
    /// pb.finish_and_clear();
    /// ```
    pub fn create_progress_bar() -> ProgressBar {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .expect("Invalid progress bar template")
                .progress_chars("█▓░"),
        );
        pb
    }

    /// Prints a summary table with file counts by category.
    ///
    /// # Arguments
    ///
    /// * `category_counts` - Files placed per category, in display order
    /// * `total_files` - Total number of files placed
    ///
    /// # Example
    ///
    /// ```no_run
    /// use dirsort::file_category::Category;
    /// use dirsort::output::OutputFormatter;
    /// OutputFormatter::summary_table(&[(Category::Images, 3), (Category::Other, 1)], 4);
    /// ```
    pub fn summary_table(category_counts: &[(Category, usize)], total_files: usize) {
        Self::header("SUMMARY");

        let width = category_counts
            .iter()
            .map(|(category, _)| category.dir_name().len())
            .max()
            .unwrap_or(0)
            .max(8); // At least "Category" width

        println!(
            "{:<width$} | {}",
            "Category".bold(),
            "Files".bold(),
            width = width
        );
        println!("{}", "-".repeat(width + 10));

        for (category, count) in category_counts {
            println!(
                "{:<width$} | {} {}",
                category.dir_name(),
                count.to_string().green(),
                plural(*count),
                width = width
            );
        }

        println!("{}", "-".repeat(width + 10));
        println!(
            "{:<width$} | {} {}",
            "Total".bold(),
            total_files.to_string().green().bold(),
            plural(total_files),
            width = width
        );
    }

    /// Prints the human-readable account of a finished run: planned moves in
    /// a dry run, failures, the category summary and a closing status line.
    ///
    /// # Arguments
    ///
    /// * `report` - The report returned by [`Sorter::run`](crate::sorter::Sorter::run)
    pub fn report(report: &SortReport) {
        let dry_run = report.config.is_dry_run();

        if dry_run {
            Self::header("PLANNED");
            for op in &report.operations {
                println!(
                    "  {} → {}",
                    op.original_path.display(),
                    op.new_path.display()
                );
            }
        }

        if !report.failures.is_empty() {
            Self::header("FAILED");
            for failure in &report.failures {
                Self::error(&failure.error);
            }
        }

        Self::summary_table(&report.category_counts(), report.operations.len());

        if !report.removed_dirs.is_empty() {
            Self::info(&format!(
                "Removed {} empty {}",
                report.removed_dirs.len(),
                if report.removed_dirs.len() == 1 {
                    "directory"
                } else {
                    "directories"
                }
            ));
        }

        if dry_run {
            Self::dry_run_notice("No files were modified.");
        } else if !report.is_success() {
            Self::warning(&format!(
                "{} {} could not be sorted and were left in place",
                report.failures.len(),
                plural(report.failures.len())
            ));
        } else {
            Self::success("Finished");
        }
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "file" } else { "files" }
}
