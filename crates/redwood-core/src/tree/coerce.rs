//! Normalization of assigned values into tree content
//!
//! Every assignment (`Node::set`, list insertion, append) goes through here.
//! Literal source is parsed in the context of the receiving field, FST values
//! are built into nodes, and existing nodes or lists are adopted as they are.

use serde_json::Value;
use tracing::trace;

use super::node::{Node, Slot};
use super::node_list::NodeList;
use crate::error::RedwoodError;
use crate::grammar::{Context, Field, FieldKind, Shape};
use crate::parser::parse_snippet;
use crate::result::Result;

/// Anything that can be assigned into the tree
#[derive(Debug, Clone)]
pub enum Input {
    /// Source text, parsed in the receiving field's context
    Literal(String),
    /// A (possibly partial) FST dict, list or primitive
    Fst(Value),
    /// An existing node, adopted by reference
    Node(Node),
    /// An existing list, adopted by reference
    List(NodeList),
    /// A mix of the above, flattened in order
    Seq(Vec<Input>),
}

impl From<&str> for Input {
    fn from(text: &str) -> Self {
        Input::Literal(text.to_string())
    }
}

impl From<String> for Input {
    fn from(text: String) -> Self {
        Input::Literal(text)
    }
}

impl From<&String> for Input {
    fn from(text: &String) -> Self {
        Input::Literal(text.clone())
    }
}

impl From<Value> for Input {
    fn from(value: Value) -> Self {
        Input::Fst(value)
    }
}

impl From<Node> for Input {
    fn from(node: Node) -> Self {
        Input::Node(node)
    }
}

impl From<&Node> for Input {
    fn from(node: &Node) -> Self {
        Input::Node(node.clone())
    }
}

impl From<NodeList> for Input {
    fn from(list: NodeList) -> Self {
        Input::List(list)
    }
}

impl From<&NodeList> for Input {
    fn from(list: &NodeList) -> Self {
        Input::List(list.clone())
    }
}

impl From<i64> for Input {
    fn from(value: i64) -> Self {
        Input::Fst(Value::from(value))
    }
}

impl From<bool> for Input {
    fn from(flag: bool) -> Self {
        Input::Fst(Value::Bool(flag))
    }
}

impl<T: Into<Input>> From<Vec<T>> for Input {
    fn from(items: Vec<T>) -> Self {
        Input::Seq(items.into_iter().map(Into::into).collect())
    }
}

/// Normalize an input into the content of one grammar field
pub(crate) fn to_slot(field: &'static Field, input: Input) -> Result<Slot> {
    match field.kind {
        FieldKind::Key => Ok(Slot::Value(Value::String(key_text(field, input)?))),
        FieldKind::Boolean => Ok(Slot::Value(Value::Bool(flag_value(field, input)?))),
        FieldKind::Constant => Err(RedwoodError::invalid_value(format!(
            "'{}' is constant text and cannot be assigned",
            field.name
        ))),
        FieldKind::Value | FieldKind::Formatting if field.is_list() => {
            Ok(Slot::List(to_list(input, field.shape, field.context)?))
        }
        FieldKind::Value | FieldKind::Formatting => Ok(to_node(input, field.context)?
            .map_or(Slot::Value(Value::Null), Slot::Node)),
    }
}

fn key_text(field: &Field, input: Input) -> Result<String> {
    match input {
        Input::Literal(text) | Input::Fst(Value::String(text)) => Ok(text),
        Input::Fst(Value::Number(number)) => Ok(number.to_string()),
        Input::Fst(Value::Null) => Ok(String::new()),
        other => Err(RedwoodError::invalid_value(format!(
            "'{}' holds plain text, got {other:?}",
            field.name
        ))),
    }
}

fn flag_value(field: &Field, input: Input) -> Result<bool> {
    match input {
        Input::Fst(Value::Bool(flag)) => Ok(flag),
        Input::Fst(Value::Null) => Ok(false),
        Input::Literal(text) => match text.trim() {
            "True" | "true" => Ok(true),
            "False" | "false" | "" => Ok(false),
            other => Err(RedwoodError::invalid_value(format!(
                "'{}' is a flag, got {other:?}",
                field.name
            ))),
        },
        other => Err(RedwoodError::invalid_value(format!(
            "'{}' is a flag, got {other:?}",
            field.name
        ))),
    }
}

/// Normalize an input into a list; existing lists are adopted as they are
pub(crate) fn to_list(input: Input, shape: Shape, context: Context) -> Result<NodeList> {
    match input {
        Input::List(list) => Ok(list),
        other => Ok(NodeList::detached(to_nodes(other, shape, context)?, shape, context)),
    }
}

/// Normalize an input into the nodes it stands for
pub(crate) fn to_nodes(input: Input, shape: Shape, context: Context) -> Result<Vec<Node>> {
    match input {
        Input::Literal(text) => parse_literal(&text, shape, context),
        Input::Fst(Value::Array(items)) => items.iter().map(Node::build).collect(),
        Input::Fst(Value::Null) => Ok(Vec::new()),
        Input::Fst(Value::Object(map)) if map.is_empty() => Ok(Vec::new()),
        Input::Fst(object @ Value::Object(_)) => Ok(vec![Node::build(&object)?]),
        Input::Fst(Value::String(text)) => parse_literal(&text, shape, context),
        Input::Fst(Value::Number(number)) => parse_literal(&number.to_string(), shape, context),
        Input::Fst(Value::Bool(flag)) => Err(RedwoodError::invalid_value(format!(
            "cannot turn {flag} into nodes"
        ))),
        Input::Node(node) => Ok(vec![node]),
        Input::List(list) => Ok(list.nodes()),
        Input::Seq(items) => {
            let mut nodes = Vec::new();
            for item in items {
                nodes.extend(to_nodes(item, shape, context)?);
            }
            Ok(nodes)
        }
    }
}

/// Normalize an input into at most one node
pub(crate) fn to_node(input: Input, context: Context) -> Result<Option<Node>> {
    match input {
        Input::Node(node) => Ok(Some(node)),
        Input::Literal(text) if text.trim().is_empty() => Ok(None),
        Input::Fst(Value::String(text)) if text.trim().is_empty() => Ok(None),
        other => {
            let mut nodes = to_nodes(other, Shape::Single, context)?;
            match nodes.len() {
                0 => Ok(None),
                1 => Ok(nodes.pop()),
                count => Err(RedwoodError::invalid_value(format!(
                    "expected a single node, got {count}"
                ))),
            }
        }
    }
}

/// Parse a source literal in the given field context
fn parse_literal(text: &str, shape: Shape, context: Context) -> Result<Vec<Node>> {
    if text.is_empty() {
        return Ok(Vec::new());
    }
    trace!(?context, "Coercing literal {:?}", text);

    let mut values = parse_snippet(text, context)?;
    // "1, 2" assigned to a comma list means its elements, not a nested tuple
    let bare_tuple = shape == Shape::Comma
        && context == Context::Expression
        && values.len() == 1
        && values[0]["type"] == "tuple"
        && values[0]["with_parenthesis"] == false;
    if bare_tuple {
        let items = values[0]["value"].take();
        if let Value::Array(items) = items {
            values = items;
        }
    }
    values.iter().map(Node::build).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_literal_is_parsed_in_context() {
        let nodes = to_nodes("*a".into(), Shape::Comma, Context::CallArgument).unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].kind(), "list_argument");
    }

    #[test]
    fn test_unparenthesized_tuple_is_spliced() {
        let nodes = to_nodes("1, 2".into(), Shape::Comma, Context::Expression).unwrap();
        let kinds: Vec<_> = nodes.iter().map(Node::kind).collect();
        assert_eq!(kinds, ["int", "comma", "int"]);
    }

    #[test]
    fn test_empty_literal_is_nothing() {
        assert!(to_node("".into(), Context::Expression).unwrap().is_none());
        assert!(to_nodes("".into(), Shape::Comma, Context::Expression).unwrap().is_empty());
    }

    #[test]
    fn test_mixed_sequence() {
        let input = Input::from(vec![
            Input::from("plop"),
            Input::from(json!({"type": "comma"})),
            Input::from(json!({"type": "name", "value": "pouet"})),
        ]);
        let nodes = to_nodes(input, Shape::Comma, Context::Expression).unwrap();
        let kinds: Vec<_> = nodes.iter().map(Node::kind).collect();
        assert_eq!(kinds, ["name", "comma", "name"]);
    }

    #[test]
    fn test_number_becomes_literal() {
        let node = to_node(Input::from(42_i64), Context::Expression).unwrap().unwrap();
        assert_eq!(node.kind(), "int");
    }

    #[test]
    fn test_several_nodes_for_a_single_field() {
        let err = to_node(Input::from(vec!["a", "b"]), Context::Expression).unwrap_err();
        assert!(matches!(err, RedwoodError::InvalidValue { .. }));
    }

    #[test]
    fn test_unknown_type_in_fst() {
        let err = to_node(json!({"type": "pouet"}).into(), Context::Expression).unwrap_err();
        assert!(matches!(err, RedwoodError::UnknownNodeType { .. }));
    }
}
