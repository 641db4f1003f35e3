//! Structural search over the tree
//!
//! Queries match node identifiers case-insensitively (see
//! [`Node::generate_identifiers`]); filters compare attribute values by their
//! rendered text. Traversal is pre-order: a node, then its children in
//! rendering order.

use super::node::{Attr, Node};
use super::node_list::NodeList;

/// Pre-order walk over a subtree, the starting node included
pub struct Descendants {
    stack: Vec<Node>,
}

impl Iterator for Descendants {
    type Item = Node;

    fn next(&mut self) -> Option<Node> {
        let node = self.stack.pop()?;
        self.stack.extend(node.rendered_children().into_iter().rev());
        Some(node)
    }
}

fn attr_matches(attr: &Attr, expected: &str) -> bool {
    match attr {
        Attr::Str(text) => text == expected,
        Attr::Int(value) => value.to_string() == expected,
        Attr::Bool(flag) => flag.to_string() == expected,
        Attr::Node(node) => node.dumps() == expected,
        Attr::List(list) => list.dumps() == expected,
        Attr::None => false,
    }
}

impl Node {
    /// Walk this subtree in pre-order
    pub fn descendants(&self) -> Descendants {
        Descendants {
            stack: vec![self.clone()],
        }
    }

    /// Whether this node answers to `query` and satisfies every filter
    pub fn matches(&self, query: &str, filters: &[(&str, &str)]) -> bool {
        if query.is_empty() {
            return false;
        }
        if !self.generate_identifiers().contains(&query.to_lowercase()) {
            return false;
        }
        filters.iter().all(|(name, expected)| {
            self.get(name)
                .is_ok_and(|attr| attr_matches(&attr, expected))
        })
    }

    /// First node of this subtree (itself included) matching the query
    pub fn find(&self, query: &str, filters: &[(&str, &str)]) -> Option<Node> {
        self.descendants().find(|node| node.matches(query, filters))
    }

    /// Every node of this subtree matching the query, in pre-order
    pub fn find_all(&self, query: &str, filters: &[(&str, &str)]) -> NodeList {
        let found = self
            .descendants()
            .filter(|node| node.matches(query, filters))
            .collect();
        NodeList::results(found)
    }

    /// Attribute access that falls back to search
    ///
    /// Returns the attribute when `identifier` names one, otherwise the first
    /// node matching it, otherwise `None`.
    pub fn lookup(&self, identifier: &str) -> Option<Attr> {
        match self.get(identifier) {
            Ok(attr) => Some(attr),
            Err(_) => self.find(identifier, &[]).map(Attr::Node),
        }
    }

    /// Nearest ancestor (this node excluded) matching the query
    pub fn parent_find(&self, query: &str, filters: &[(&str, &str)]) -> Option<Node> {
        let mut current = self.parent_node();
        while let Some(node) = current {
            if node.matches(query, filters) {
                return Some(node);
            }
            current = node.parent_node();
        }
        None
    }
}

impl NodeList {
    /// First match across the element subtrees, in order
    pub fn find(&self, query: &str, filters: &[(&str, &str)]) -> Option<Node> {
        self.iter().find_map(|node| node.find(query, filters))
    }

    /// Every match across the element subtrees, in order
    pub fn find_all(&self, query: &str, filters: &[(&str, &str)]) -> NodeList {
        let found = self
            .iter()
            .flat_map(|node| node.find_all(query, filters).nodes())
            .collect();
        NodeList::results(found)
    }

    /// Search by identifier, `None` when nothing matches
    pub fn lookup(&self, identifier: &str) -> Option<Node> {
        self.find(identifier, &[])
    }
}
