//! Renderer from the full syntax tree back to source text
//!
//! Walks each node's grammar fields in order: constants are emitted verbatim,
//! keys emit their stored string, value and formatting fields recurse, and
//! booleans only steer conditional entries.

use serde_json::{Map, Value};

use crate::error::RedwoodError;
use crate::grammar::{self, FieldKind};
use crate::result::Result;

/// Render an FST value (a node, a list of nodes, or null) to source text
pub fn render(fst: &Value) -> Result<String> {
    let mut out = String::new();
    render_into(fst, &mut out)?;
    Ok(out)
}

fn render_into(value: &Value, out: &mut String) -> Result<()> {
    match value {
        Value::Null => Ok(()),
        Value::Array(items) => items.iter().try_for_each(|item| render_into(item, out)),
        Value::Object(map) if map.is_empty() => Ok(()),
        Value::Object(map) => render_node(map, out),
        other => Err(RedwoodError::invalid_value(format!(
            "cannot render {other} where a node was expected"
        ))),
    }
}

fn render_node(map: &Map<String, Value>, out: &mut String) -> Result<()> {
    let kind = map
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| RedwoodError::invalid_value("node object without a 'type'"))?;
    let spec = grammar::require(kind)?;

    for field in spec.fields {
        if let Some(condition) = field.when
            && !is_truthy(map.get(condition))
        {
            continue;
        }
        match field.kind {
            FieldKind::Constant => out.push_str(field.name),
            FieldKind::Boolean => {}
            FieldKind::Key => match map.get(field.name) {
                Some(Value::String(text)) => out.push_str(text),
                Some(Value::Number(number)) => out.push_str(&number.to_string()),
                Some(Value::Null) | None => {}
                Some(other) => {
                    return Err(RedwoodError::invalid_value(format!(
                        "'{kind}.{}' must hold text, got {other}",
                        field.name
                    )));
                }
            },
            FieldKind::Value | FieldKind::Formatting => {
                if let Some(child) = map.get(field.name) {
                    render_into(child, out)?;
                }
            }
        }
    }
    Ok(())
}

/// Truthiness used by conditional grammar entries
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(Value::String(text)) => !text.is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Object(map)) => !map.is_empty(),
        Some(Value::Number(number)) => number.as_f64().is_some_and(|n| n != 0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_leaf() {
        let fst = json!({"type": "name", "value": "pouet"});
        assert_eq!(render(&fst).unwrap(), "pouet");
    }

    #[test]
    fn test_render_conditional_constant() {
        let argument = json!({
            "type": "call_argument",
            "target": {"type": "name", "value": "a"},
            "first_formatting": [],
            "second_formatting": [],
            "value": {"type": "int", "value": "1"},
        });
        assert_eq!(render(&argument).unwrap(), "a=1");

        let argument = json!({
            "type": "call_argument",
            "target": null,
            "first_formatting": [],
            "second_formatting": [],
            "value": {"type": "int", "value": "1"},
        });
        assert_eq!(render(&argument).unwrap(), "1");
    }

    #[test]
    fn test_render_tuple_parenthesis_flag() {
        let mut tuple = json!({
            "type": "tuple",
            "first_formatting": [],
            "second_formatting": [],
            "value": [
                {"type": "int", "value": "1"},
                {"type": "comma", "first_formatting": [], "second_formatting": []},
            ],
            "third_formatting": [],
            "fourth_formatting": [],
            "with_parenthesis": true,
        });
        assert_eq!(render(&tuple).unwrap(), "(1,)");
        tuple["with_parenthesis"] = json!(false);
        assert_eq!(render(&tuple).unwrap(), "1,");
    }

    #[test]
    fn test_render_unknown_type() {
        let fst = json!({"type": "pouet"});
        assert!(matches!(
            render(&fst),
            Err(RedwoodError::UnknownNodeType { .. })
        ));
    }

    #[test]
    fn test_truthiness() {
        assert!(!is_truthy(None));
        assert!(!is_truthy(Some(&json!(""))));
        assert!(!is_truthy(Some(&json!([]))));
        assert!(is_truthy(Some(&json!({"type": "name", "value": "a"}))));
        assert!(is_truthy(Some(&json!(true))));
    }
}
