//! Indentation resolution
//!
//! Indentation lives in the `indent` key of `endl` nodes: the whitespace that
//! starts the line after the newline. A node's indentation is found by walking
//! backward through the rendering order of its ancestors until an `endl` is
//! reached. Root-level nodes have no indentation node.

use super::node::Node;

impl Node {
    /// The `endl` node whose `indent` this node starts its line with
    pub fn get_indentation_node(&self) -> Option<Node> {
        if self.kind() == "endl" {
            return None;
        }
        let previous = self.previous_rendered()?;
        if previous.kind() == "endl" {
            Some(previous)
        } else {
            previous.get_indentation_node()
        }
    }

    /// Whitespace prefix of the line this node is on
    pub fn indentation(&self) -> String {
        self.get_indentation_node()
            .and_then(|endl| endl.get("indent").ok())
            .and_then(|indent| indent.as_str().map(str::to_string))
            .unwrap_or_default()
    }

    /// Whether the indentation node immediately precedes this node
    pub fn indentation_node_is_direct(&self) -> bool {
        self.previous_rendered()
            .is_some_and(|previous| previous.kind() == "endl")
    }

    /// Leaf rendered right before this one inside the enclosing statement
    fn previous_rendered(&self) -> Option<Node> {
        let parent = self.parent_node()?;
        let siblings = parent.rendered_children();
        let index = siblings.iter().position(|node| node.ptr_eq(self))?;
        match index.checked_sub(1) {
            Some(before) => siblings.get(before).map(Node::last_rendered_leaf),
            None => parent.previous_rendered(),
        }
    }

    /// Last node of this subtree in rendering order
    pub(crate) fn last_rendered_leaf(&self) -> Node {
        let mut current = self.clone();
        while let Some(last) = current.rendered_children().pop() {
            current = last;
        }
        current
    }
}
