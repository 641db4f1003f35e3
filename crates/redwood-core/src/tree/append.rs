//! Separator-aware insertion into lists
//!
//! Appending picks a policy from the shape of the receiving list: comma lists
//! manage their `comma` separators, statement suites manage `endl` nodes and
//! indentation, dotted chains insert `dot` nodes, plain lists take the value
//! as is.

use serde_json::{Value, json};
use tracing::debug;

use super::coerce::{self, Input};
use super::node::Node;
use super::node_list::NodeList;
use crate::error::RedwoodError;
use crate::grammar::{Context, Shape};
use crate::parser::parse_snippet;
use crate::result::Result;

/// Knobs of [`NodeList::append_value_with`]
#[derive(Debug, Clone)]
pub struct AppendOptions {
    /// Key of the appended pair, for dicts (`key: value`) and calls (`key=value`)
    pub key: Option<Input>,
    /// Leave a separator after the appended element
    pub trailing: bool,
    /// One indentation step, used when a one-line suite becomes a block
    pub indent_unit: String,
    /// Add the disambiguating comma when appending into an empty tuple
    pub single_tuple_comma: bool,
}

impl Default for AppendOptions {
    fn default() -> Self {
        Self {
            key: None,
            trailing: false,
            indent_unit: "    ".to_string(),
            single_tuple_comma: true,
        }
    }
}

impl AppendOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(mut self, key: impl Into<Input>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn trailing(mut self, trailing: bool) -> Self {
        self.trailing = trailing;
        self
    }

    pub fn indent_unit(mut self, unit: impl Into<String>) -> Self {
        self.indent_unit = unit.into();
        self
    }

    pub fn single_tuple_comma(mut self, enabled: bool) -> Self {
        self.single_tuple_comma = enabled;
        self
    }
}

fn comma(second_formatting: Value) -> Result<Node> {
    Node::from_fst(json!({
        "type": "comma",
        "first_formatting": [],
        "second_formatting": second_formatting,
    }))
}

fn space() -> Value {
    json!([{"type": "space", "value": " "}])
}

fn endl(indent: &str) -> Result<Node> {
    Node::from_fst(json!({
        "type": "endl",
        "formatting": [],
        "value": "\n",
        "indent": indent,
    }))
}

fn is_endl(node: &Node) -> bool {
    node.kind() == "endl"
}

impl Node {
    /// Append to this node's main list (its suite, or its `value` list)
    pub fn append_value(&self, value: impl Into<Input>) -> Result<()> {
        self.append_value_with(value, AppendOptions::default())
    }

    pub fn append_value_with(&self, value: impl Into<Input>, options: AppendOptions) -> Result<()> {
        self.main_list()?.append_value_with(value, options)
    }

    /// Insert into this node's main list at `index`, without separator handling
    pub fn insert_value(&self, index: usize, value: impl Into<Input>) -> Result<()> {
        self.main_list()?.insert(index, value)
    }

    fn main_list(&self) -> Result<NodeList> {
        let field = self.spec().append_field().ok_or_else(|| {
            RedwoodError::invalid_value(format!("cannot append into a '{}' node", self.kind()))
        })?;
        self.list(field.name)
    }
}

impl NodeList {
    pub fn append_value(&self, value: impl Into<Input>) -> Result<()> {
        self.append_value_with(value, AppendOptions::default())
    }

    /// Append `value`, keeping the separators and layout of this list valid
    pub fn append_value_with(&self, value: impl Into<Input>, options: AppendOptions) -> Result<()> {
        let value = value.into();
        let shape = self.shape();
        debug!(?shape, "Appending into list of {} elements", self.len());
        match shape {
            Shape::Comma => self.append_comma(value, &options),
            Shape::Suite => self.append_statements(value, &options),
            Shape::Dotted => {
                let node = self.single(value)?;
                let mut nodes = Vec::with_capacity(2);
                if !self.is_empty() {
                    nodes.push(Node::from_fst(json!({"type": "dot"}))?);
                }
                nodes.push(node);
                self.push_nodes(nodes);
                Ok(())
            }
            Shape::Plain | Shape::Single => {
                let nodes = coerce::to_nodes(value, shape, self.context())?;
                self.push_nodes(nodes);
                Ok(())
            }
        }
    }

    fn single(&self, value: Input) -> Result<Node> {
        coerce::to_node(value, self.context())?
            .ok_or_else(|| RedwoodError::invalid_value("nothing to append"))
    }

    fn append_comma(&self, value: Input, options: &AppendOptions) -> Result<()> {
        let owner = self.owner();
        if options.key.is_none() && owner.as_ref().is_some_and(|owner| owner.kind() == "dict") {
            return Err(RedwoodError::invalid_value("appending into a dict needs a key"));
        }
        let node = match &options.key {
            Some(key) => {
                let kind = owner.as_ref().map(Node::kind);
                let pair = match kind {
                    Some("dict") => Node::from_fst(json!({
                        "type": "dictitem",
                        "first_formatting": [],
                        "second_formatting": space(),
                    }))?,
                    Some("call") => Node::from_fst(json!({"type": "call_argument"}))?,
                    _ => {
                        return Err(RedwoodError::invalid_value(format!(
                            "keyed append needs a dict or a call, not {}",
                            kind.unwrap_or("a free list")
                        )));
                    }
                };
                let key_field = if kind == Some("dict") { "key" } else { "target" };
                pair.set(key_field, key.clone())?;
                pair.set("value", value)?;
                pair
            }
            None => self.single(value)?,
        };

        let mut nodes = Vec::with_capacity(3);
        match self.last() {
            None => {
                nodes.push(node);
                let lone_tuple = owner.as_ref().is_some_and(|owner| owner.kind() == "tuple")
                    && options.single_tuple_comma;
                if options.trailing || lone_tuple {
                    nodes.push(comma(json!([]))?);
                }
            }
            Some(last) if last.kind() == "comma" => {
                if last.list("second_formatting")?.is_empty() {
                    last.set("second_formatting", space())?;
                }
                nodes.push(node);
                if options.trailing {
                    nodes.push(comma(json!([]))?);
                }
            }
            Some(_) => {
                nodes.push(comma(space())?);
                nodes.push(node);
                if options.trailing {
                    nodes.push(comma(json!([]))?);
                }
            }
        }
        self.push_nodes(nodes);
        Ok(())
    }

    /// Turn `while a: pass` into a block before appending to it
    fn expand_one_line_suite(&self, owner: &Node, indent_unit: &str) -> Result<()> {
        let starts_with_newline = self
            .iter()
            .find(|node| node.kind() != "comment")
            .is_some_and(|node| is_endl(&node));
        if starts_with_newline || self.is_empty() {
            return Ok(());
        }

        debug!(kind = owner.kind(), "Expanding one-line suite into a block");
        if let Some(field) = owner.spec().suite_formatting_field() {
            owner.set(field.name, json!([]))?;
        }
        let indent = format!("{}{indent_unit}", owner.indentation());
        self.insert_nodes(0, vec![endl(&indent)?])
    }

    fn append_statements(&self, value: Input, options: &AppendOptions) -> Result<()> {
        if let Some(owner) = self.owner() {
            self.expand_one_line_suite(&owner, &options.indent_unit)?;
        }

        let block_indent = self
            .iter()
            .rev()
            .find(|node| !is_endl(node))
            .map(|node| node.indentation())
            .unwrap_or_default();
        let statements = self.statements(value, &block_indent)?;
        if statements.is_empty() {
            return Ok(());
        }

        let items = self.nodes();
        let len = items.len();
        let Some(last) = items.last() else {
            self.push_nodes(statements);
            return Ok(());
        };

        if is_endl(last) {
            let Some(content) = items.iter().rposition(|node| !is_endl(node)) else {
                let mut nodes = vec![endl(&block_indent)?];
                nodes.extend(statements);
                return self.insert_nodes(len - 1, nodes);
            };
            // the endl closing the last statement starts the appended line,
            // the blank lines after it stay after the block
            let terminator = &items[content + 1];
            let indent = terminator.get("indent")?;
            let outer = indent.as_str().unwrap_or_default();
            let reuses_blank_line = len - content == 3 && !outer.is_empty();
            terminator.set("indent", block_indent.as_str())?;
            let mut nodes = statements;
            if !reuses_blank_line {
                nodes.push(endl(outer)?);
            }
            self.insert_nodes(content + 2, nodes)
        } else {
            let leaf = last.last_rendered_leaf();
            if is_endl(&leaf) {
                let outer = leaf.get("indent")?;
                leaf.set("indent", block_indent.as_str())?;
                let mut nodes = statements;
                nodes.push(endl(outer.as_str().unwrap_or_default())?);
                self.push_nodes(nodes);
            } else {
                let mut nodes = vec![endl(&block_indent)?];
                nodes.extend(statements);
                self.push_nodes(nodes);
            }
            Ok(())
        }
    }

    /// Build the statement nodes to append, re-indented for this block
    fn statements(&self, value: Input, block_indent: &str) -> Result<Vec<Node>> {
        let Input::Literal(text) = value else {
            return coerce::to_nodes(value, Shape::Suite, Context::Statements);
        };

        let mut values = parse_snippet(text.trim_end(), Context::Statements)?;
        while values.last().is_some_and(|value| value["type"] == "endl") {
            values.pop();
        }
        let nodes = values.iter().map(Node::build).collect::<Result<Vec<_>>>()?;
        if !block_indent.is_empty() {
            for node in &nodes {
                for endl in node.descendants().filter(is_endl) {
                    let indent = endl.get("indent")?;
                    let indented = format!("{block_indent}{}", indent.as_str().unwrap_or_default());
                    endl.set("indent", indented)?;
                }
            }
        }
        Ok(nodes)
    }
}
