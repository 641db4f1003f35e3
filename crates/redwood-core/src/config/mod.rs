//! Configuration for tree editing
//!
//! Edits that synthesize new formatting (turning a one-line suite into a
//! block, adding the comma of a one-element tuple) read their defaults from a
//! [`TreeConfig`]. Configuration files are optional.
//!
//! ## Configuration Files
//!
//! - `.redwood.toml` - TOML (preferred)
//! - `redwood.json` - JSON
//!
//! When no explicit path is given, discovery starts from the current directory
//! and walks up until a file is found or the filesystem root is reached.
//!
//! ## Example Configuration
//!
//! ```toml
//! indent_unit = "  "
//! single_tuple_comma = true
//! ```

mod loader;
mod tree_config;

pub use loader::ConfigLoader;
pub use tree_config::TreeConfig;
