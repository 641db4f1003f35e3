//! Mutable, lossless tree over the FST
//!
//! [`NodeList::from_source`] parses a file into a root list of [`Node`]s.
//! Nodes expose their grammar fields as attributes, keep weak links to their
//! parent, and render back to the exact source text with `dumps()`. Edits made
//! through any handle are visible through every other handle to the same node.

mod append;
mod coerce;
mod help;
mod indentation;
mod node;
mod node_list;
mod path;
mod search;

pub use append::AppendOptions;
pub use coerce::Input;
pub use node::{Attr, Element, Node, Siblings};
pub use node_list::NodeList;
pub use path::{Path, Step, make_path};
pub use search::Descendants;
