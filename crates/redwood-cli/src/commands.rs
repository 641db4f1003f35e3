//! CLI command implementations

use anyhow::{Context, Result, bail};
use redwood_core::{ConfigLoader, Element, NodeList, RoundTripValidator, parse};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::output::{self, CheckSummary};

fn read_source(file: &Path) -> Result<String> {
    fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))
}

fn load_tree(file: &Path) -> Result<NodeList> {
    let source = read_source(file)?;
    NodeList::from_source(&source).with_context(|| format!("Failed to parse {}", file.display()))
}

fn borrowed(filters: &[(String, String)]) -> Vec<(&str, &str)> {
    filters
        .iter()
        .map(|(key, value)| (key.as_str(), value.as_str()))
        .collect()
}

/// Print the FST of a file
pub fn fst_command(file: &Path, compact: bool) -> Result<()> {
    let source = read_source(file)?;
    let fst = parse(&source).with_context(|| format!("Failed to parse {}", file.display()))?;
    let text = if compact {
        serde_json::to_string(&fst)?
    } else {
        serde_json::to_string_pretty(&fst)?
    };
    println!("{text}");
    Ok(())
}

/// Round-trip every file and report the ones that are not lossless
pub fn check_command(files: &[PathBuf], show_diff: bool) -> Result<()> {
    let validator = RoundTripValidator::new();
    let mut summary = CheckSummary::new();

    for file in files {
        summary.files_checked += 1;
        let source = match read_source(file) {
            Ok(source) => source,
            Err(e) => {
                summary.failures += 1;
                output::print_error(file, &format!("{e:#}"));
                continue;
            }
        };
        match validator.validate(&source) {
            Ok(result) if result.is_valid() => output::print_pass(file),
            Ok(result) => {
                summary.failures += 1;
                output::print_failure(file, &result, show_diff);
            }
            Err(e) => {
                summary.failures += 1;
                output::print_error(file, &e.to_string());
            }
        }
    }

    output::print_summary(&summary);
    if summary.has_failures() {
        bail!("{} of {} files failed the round trip", summary.failures, summary.files_checked);
    }
    Ok(())
}

/// Print every node of type `query` matching the filters
pub fn find_command(
    file: &Path,
    query: &str,
    filters: &[(String, String)],
    json: bool,
) -> Result<()> {
    let root = load_tree(file)?;
    let matches = root.find_all(query, &borrowed(filters));
    debug!("Found {} matches for '{}'", matches.len(), query);

    for node in &matches {
        if json {
            println!("{}", node.path().to_baron_path());
        } else {
            output::print_match(&node);
        }
    }
    if matches.is_empty() {
        info!("No '{}' node in {}", query, file.display());
    }
    Ok(())
}

/// Print the source of the element at a JSON path
pub fn path_command(file: &Path, path: &str) -> Result<()> {
    let root = load_tree(file)?;
    let path: serde_json::Value =
        serde_json::from_str(path).with_context(|| format!("Invalid JSON path '{path}'"))?;
    let element = root.find_by_baron_path(&path)?;
    match element {
        Element::Node(node) => println!("{}", node.dumps()),
        Element::List(list) => println!("{}", list.dumps()),
    }
    Ok(())
}

/// Arguments of the `append` command
pub struct AppendArgs {
    pub file: PathBuf,
    pub query: String,
    pub value: String,
    pub filter: Vec<(String, String)>,
    pub key: Option<String>,
    pub trailing: bool,
    pub write: bool,
    pub config_path: Option<PathBuf>,
}

/// Append into the first matching node, then print or save the result
pub fn append_command(args: AppendArgs) -> Result<()> {
    let start_dir = args.file.parent().filter(|dir| !dir.as_os_str().is_empty());
    let config = ConfigLoader::load(args.config_path.as_deref(), start_dir)?;

    let root = load_tree(&args.file)?;
    let Some(target) = root.find(&args.query, &borrowed(&args.filter)) else {
        bail!("No '{}' node in {}", args.query, args.file.display());
    };

    let mut options = config.append_options().trailing(args.trailing);
    if let Some(key) = args.key {
        options = options.key(key);
    }
    target.append_value_with(args.value.as_str(), options)?;

    let rendered = root.dumps();
    if args.write {
        fs::write(&args.file, &rendered)
            .with_context(|| format!("Failed to write {}", args.file.display()))?;
        info!("Updated {}", args.file.display());
    } else {
        print!("{rendered}");
    }
    Ok(())
}
