//! Redwood Core
//!
//! Lossless, mutable syntax trees for Python source code.
//! This crate parses source text into a full syntax tree (FST) that keeps
//! every byte of whitespace and comments, wraps it in navigable [`Node`] and
//! [`NodeList`] handles, and renders edited trees back to source text that is
//! unchanged apart from the edits.

pub mod config;
pub mod error;
pub mod grammar;
pub mod lexer;
pub mod parser;
pub mod render;
pub mod result;
pub mod round_trip;
pub mod tree;

// Re-export commonly used types
pub use config::{ConfigLoader, TreeConfig};
pub use error::{ErrorKind, RedwoodError};
pub use grammar::{Context, Field, FieldKind, NodeSpec, Shape};
pub use parser::{parse, parse_snippet};
pub use render::render;
pub use result::Result;
pub use round_trip::{RoundTripValidator, ValidationResult};
pub use tree::{
    AppendOptions, Attr, Descendants, Element, Input, Node, NodeList, Path, Siblings, Step,
    make_path,
};

/// Initialize the tracing subscriber for logging
///
/// `RUST_LOG` takes precedence; otherwise `redwood=info`.
pub fn init_tracing() {
    init_tracing_with_filter("redwood=info");
}

/// Initialize the tracing subscriber with a default filter directive
pub fn init_tracing_with_filter(default_filter: &str) {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(true)
                .with_line_number(true)
                .with_writer(std::io::stderr),
        )
        .init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
