//! Output formatting and reporting

use colored::*;
use redwood_core::{Node, ValidationResult};
use std::path::Path;

/// Counts of a `check` run
#[derive(Debug, Clone, Default)]
pub struct CheckSummary {
    pub files_checked: usize,
    pub failures: usize,
}

impl CheckSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_failures(&self) -> bool {
        self.failures > 0
    }
}

/// Report one file that round-tripped cleanly
pub fn print_pass(file: &Path) {
    println!("{} {}", "✓".green().bold(), file.display());
}

/// Report one file whose round trip lost information
pub fn print_failure(file: &Path, result: &ValidationResult, show_diff: bool) {
    println!("{} {}", "✗".red().bold(), file.display());
    for issue in result.issues() {
        println!("    {}", issue.yellow());
    }
    if show_diff {
        print!("{}", result.diff());
    }
}

/// Report a file that could not be checked at all
pub fn print_error(file: &Path, message: &str) {
    println!("{} {}", "✗".red().bold(), file.display());
    println!("    {}", message.red());
}

pub fn print_summary(summary: &CheckSummary) {
    let passed = summary.files_checked - summary.failures;
    let line = format!(
        "{} checked, {} lossless, {} failed",
        summary.files_checked, passed, summary.failures
    );
    if summary.has_failures() {
        println!("\n{}", line.red().bold());
    } else {
        println!("\n{}", line.green().bold());
    }
}

/// One search hit: its location and the first line of its source
pub fn print_match(node: &Node) {
    let source = node.dumps();
    let first_line = source.lines().next().unwrap_or_default();
    println!("{}  {}", node.path().to_string().cyan(), first_line);
}
