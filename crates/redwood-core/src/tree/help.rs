//! Human-readable dumps of nodes for interactive exploration

use std::io::{self, Write};

use super::node::{Node, Slot};
use super::node_list::NodeList;
use crate::grammar::{self, FieldKind};

const INDENT: &str = "  ";

impl Node {
    /// Describe this node: identifiers, helpers, and its non-formatting fields
    pub fn help(&self, out: &mut dyn Write) -> io::Result<()> {
        self.write_help(out, 0)
    }

    fn write_help(&self, out: &mut dyn Write, depth: usize) -> io::Result<()> {
        let pad = INDENT.repeat(depth);
        writeln!(out, "{pad}{}()", grammar::class_name(self.kind()))?;
        let identifiers: Vec<_> = self.generate_identifiers().into_iter().collect();
        writeln!(out, "{pad}{INDENT}# identifiers: {}", identifiers.join(", "))?;
        let helpers = self.helpers();
        if !helpers.is_empty() {
            writeln!(out, "{pad}{INDENT}# helpers: {}", helpers.join(", "))?;
        }

        for field in self.spec().stored_fields() {
            if field.kind == FieldKind::Formatting {
                continue;
            }
            match self.slot(field.name) {
                Some(Slot::Node(child)) => {
                    writeln!(out, "{pad}{INDENT}{} ->", field.name)?;
                    child.write_help(out, depth + 2)?;
                }
                Some(Slot::List(list)) => {
                    writeln!(out, "{pad}{INDENT}{} ->", field.name)?;
                    for item in &list {
                        write!(out, "{pad}{INDENT}{INDENT}* ")?;
                        writeln!(out, "{:?}", item)?;
                    }
                }
                Some(Slot::Value(value)) => {
                    writeln!(out, "{pad}{INDENT}{}={}", field.name, value)?;
                }
                None => {}
            }
        }
        Ok(())
    }
}

impl NodeList {
    /// Describe every element in turn
    pub fn help(&self, out: &mut dyn Write) -> io::Result<()> {
        for (index, node) in self.iter().enumerate() {
            writeln!(out, "{index} -----------------------------------------------------")?;
            node.help(out)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn help_text(node: &Node) -> String {
        let mut out = Vec::new();
        node.help(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_help_lists_fields() {
        let root = NodeList::from_source("ax + (z * 4)").unwrap();
        let text = help_text(&root.get(0).unwrap());
        assert!(text.starts_with("BinaryOperatorNode()\n"));
        assert!(text.contains("value=\"+\""));
        assert!(text.contains("first ->\n    NameNode()"));
        assert!(!text.contains("first_formatting"));
    }

    #[test]
    fn test_help_shows_helpers() {
        let root = NodeList::from_source("import a").unwrap();
        let text = help_text(&root.get(0).unwrap());
        assert!(text.contains("# helpers: modules, names"));
    }
}
