//! Redwood CLI
//!
//! Command-line interface for inspecting and editing Python sources through
//! the lossless redwood tree

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use redwood_core::init_tracing_with_filter;
use std::path::PathBuf;
use tracing::error;

#[derive(Parser)]
#[command(name = "redwood")]
#[command(about = "Redwood: lossless Python syntax trees you can query and edit")]
#[command(version = redwood_core::VERSION)]
#[command(
    long_about = "Redwood parses Python source into a full syntax tree that keeps every\n\
space, comment and newline, so edits render back without disturbing the rest of the file.\n\
\n\
Examples:\n  \
redwood fst app.py                          # Print the full syntax tree as JSON\n  \
redwood check src/*.py                      # Verify lossless round trips\n  \
redwood find app.py name --filter value=x   # Locate every name 'x'\n  \
redwood append app.py def 'return 1' -w     # Append a statement to the first def"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(
        short,
        long,
        global = true,
        help = "Path to configuration file (.redwood.toml/redwood.json)"
    )]
    config: Option<PathBuf>,

    /// Verbose output (can be used multiple times for increased verbosity)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the full syntax tree of a file as JSON
    Fst {
        /// Python source file
        file: PathBuf,

        /// Print on a single line
        #[arg(long)]
        compact: bool,
    },

    /// Check that files render back byte for byte after parsing
    Check {
        /// Python source files
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Show a unified diff for files that fail
        #[arg(long)]
        diff: bool,
    },

    /// Find every node of a given type
    Find {
        /// Python source file
        file: PathBuf,

        /// Node type or alias (e.g. name, def, assignment)
        query: String,

        /// Attribute filters, all of which must match
        #[arg(short, long, value_parser = parse_filter, help = "Attribute filter as key=value")]
        filter: Vec<(String, String)>,

        /// Print one JSON path per match instead of readable locations
        #[arg(long)]
        json: bool,
    },

    /// Print the source of the node or list at a JSON path
    Path {
        /// Python source file
        file: PathBuf,

        /// Path as emitted by `find --json`, e.g. '{"path":[],"type":"list","position_in_rendering_list":0}'
        path: String,
    },

    /// Append a value into the main list of the first matching node
    Append {
        /// Python source file
        file: PathBuf,

        /// Node type or alias of the receiving node
        query: String,

        /// Source text of the value to append
        value: String,

        /// Attribute filters selecting the receiving node
        #[arg(short, long, value_parser = parse_filter, help = "Attribute filter as key=value")]
        filter: Vec<(String, String)>,

        /// Key for dict items and keyword arguments
        #[arg(short, long)]
        key: Option<String>,

        /// Leave a trailing separator after the appended element
        #[arg(long)]
        trailing: bool,

        /// Write the result back to the file instead of printing it
        #[arg(short, long)]
        write: bool,
    },
}

fn parse_filter(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!(
            "Invalid filter format '{}'. Expected 'key=value'",
            s
        )),
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize colored output
    if !cli.no_color && std::env::var("NO_COLOR").is_err() {
        colored::control::set_override(true);
    } else {
        colored::control::set_override(false);
    }

    // Initialize tracing based on verbosity
    let log_level = match cli.verbose {
        0 => "redwood=error",
        1 => "redwood=warn",
        2 => "redwood=info",
        3 => "redwood=debug",
        _ => "redwood=trace",
    };
    init_tracing_with_filter(log_level);

    if let Err(e) = run_command(cli) {
        error!("{e:#}");
        std::process::exit(1);
    }
}

fn run_command(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Fst { file, compact } => commands::fst_command(&file, compact),
        Commands::Check { files, diff } => commands::check_command(&files, diff),
        Commands::Find {
            file,
            query,
            filter,
            json,
        } => commands::find_command(&file, &query, &filter, json),
        Commands::Path { file, path } => commands::path_command(&file, &path),
        Commands::Append {
            file,
            query,
            value,
            filter,
            key,
            trailing,
            write,
        } => commands::append_command(commands::AppendArgs {
            file,
            query,
            value,
            filter,
            key,
            trailing,
            write,
            config_path: cli.config,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_filter() {
        assert_eq!(
            parse_filter("value=a=b").unwrap(),
            ("value".to_string(), "a=b".to_string())
        );
        assert!(parse_filter("value").is_err());
        assert!(parse_filter("=x").is_err());
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
