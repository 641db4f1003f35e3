//! Path addressing: locating a node from the root and back
//!
//! A [`Path`] records, from the root down, every attribute and list index taken
//! to reach a node. Attribute steps carry the position of the field in the
//! owner's rendering table so they survive serialization as plain data.

use std::fmt;

use serde_json::{Value, json};
use tracing::debug;

use super::node::{Attr, Element, Node, ParentRef, Slot};
use super::node_list::NodeList;
use crate::error::RedwoodError;
use crate::grammar;
use crate::result::Result;

/// One step from a container to its child
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Field `name` of a node of type `kind`, at `position` in its rendering table
    Attribute {
        kind: &'static str,
        name: &'static str,
        position: usize,
    },
    /// Element of a list
    Index(usize),
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Attribute { kind, name, .. } => write!(f, "{kind}.{name}"),
            Step::Index(index) => write!(f, "[{index}]"),
        }
    }
}

/// Route from a root to a node or list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Path {
    steps: Vec<Step>,
}

impl Path {
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn is_root(&self) -> bool {
        self.steps.is_empty()
    }

    /// Plain-data encoding: the keys leading to the container, plus how the
    /// target sits in it (`"list"` and an index, or the owner type and the
    /// field position)
    pub fn to_baron_path(&self) -> Value {
        let Some((last, keys)) = self.steps.split_last() else {
            return make_path(json!([]), None, None);
        };
        let keys = keys
            .iter()
            .map(|step| match step {
                Step::Attribute { name, .. } => Value::from(*name),
                Step::Index(index) => Value::from(*index),
            })
            .collect();
        match last {
            Step::Attribute { kind, position, .. } => {
                make_path(Value::Array(keys), Some(*kind), Some(*position))
            }
            Step::Index(index) => make_path(Value::Array(keys), Some("list"), Some(*index)),
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("root")?;
        for step in &self.steps {
            match step {
                Step::Attribute { name, .. } => write!(f, ".{name}")?,
                Step::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

/// Build a plain-data path
pub fn make_path(path: Value, kind: Option<&str>, position: Option<usize>) -> Value {
    json!({
        "path": path,
        "type": kind,
        "position_in_rendering_list": position,
    })
}

fn attribute_step(owner: &Node, attribute: &str) -> Option<Step> {
    let spec = owner.spec();
    let field = spec.field(attribute)?;
    Some(Step::Attribute {
        kind: spec.kind,
        name: field.name,
        position: spec.position(attribute)?,
    })
}

impl Node {
    /// Route from the outermost ancestor to this node
    pub fn path(&self) -> Path {
        let mut steps = Vec::new();
        let mut current = self.clone();
        loop {
            match current.parent_ref() {
                Some(ParentRef::List(weak)) => {
                    let index = weak
                        .upgrade()
                        .and_then(|cell| NodeList(cell).position(&current));
                    steps.extend(index.map(Step::Index));
                    break;
                }
                Some(ParentRef::Node(weak)) => {
                    let Some(owner) = weak.upgrade().map(Node) else {
                        break;
                    };
                    let Some(attribute) = current.on_attribute() else {
                        break;
                    };
                    if let Some(Slot::List(list)) = owner.slot(&attribute) {
                        match list.position(&current) {
                            Some(index) => steps.push(Step::Index(index)),
                            None => break,
                        }
                    }
                    match attribute_step(&owner, &attribute) {
                        Some(step) => steps.push(step),
                        None => break,
                    }
                    current = owner;
                }
                None => break,
            }
        }
        steps.reverse();
        Path::new(steps)
    }

    pub fn find_by_path(&self, path: &Path) -> Result<Element> {
        resolve(Element::Node(self.clone()), path.steps())
    }

    pub fn find_by_baron_path(&self, path: &Value) -> Result<Element> {
        resolve_baron(Element::Node(self.clone()), path)
    }
}

impl NodeList {
    /// Route from the outermost ancestor to this list
    pub fn path(&self) -> Path {
        let (Some(owner), Some(attribute)) = (self.owner(), self.field_attribute()) else {
            return Path::default();
        };
        let mut path = owner.path();
        if let Some(step) = attribute_step(&owner, attribute) {
            path.steps.push(step);
        }
        path
    }

    pub fn find_by_path(&self, path: &Path) -> Result<Element> {
        resolve(Element::List(self.clone()), path.steps())
    }

    pub fn find_by_baron_path(&self, path: &Value) -> Result<Element> {
        resolve_baron(Element::List(self.clone()), path)
    }
}

fn lookup_failed(step: usize, message: impl Into<String>) -> RedwoodError {
    let error = RedwoodError::path_lookup(step, message);
    debug!("{error}");
    error
}

/// Resolve step number `index` of a path against `current`
fn child(current: &Element, step: &Step, index: usize) -> Result<Element> {
    match (current, step) {
        (Element::List(list), Step::Index(position)) => list
            .get(*position)
            .map(Element::Node)
            .ok_or_else(|| {
                lookup_failed(
                    index,
                    format!("index {position} out of range for a list of {}", list.len()),
                )
            }),
        (Element::Node(node), Step::Attribute { kind, name, .. }) => {
            if node.kind() != *kind {
                return Err(lookup_failed(
                    index,
                    format!("expected a '{kind}' node, found '{}'", node.kind()),
                ));
            }
            attribute_element(node, name, index)
        }
        (Element::Node(node), Step::Index(_)) => Err(lookup_failed(
            index,
            format!("'{}' node is not a list", node.kind()),
        )),
        (Element::List(_), Step::Attribute { name, .. }) => Err(lookup_failed(
            index,
            format!("a list has no attribute '{name}'"),
        )),
    }
}

fn attribute_element(node: &Node, name: &str, index: usize) -> Result<Element> {
    match node.get(name) {
        Ok(Attr::Node(child)) => Ok(Element::Node(child)),
        Ok(Attr::List(list)) => Ok(Element::List(list)),
        Ok(_) => Err(lookup_failed(index, format!("'{name}' holds no node"))),
        Err(error) => Err(lookup_failed(index, error.to_string())),
    }
}

fn resolve(start: Element, steps: &[Step]) -> Result<Element> {
    steps
        .iter()
        .enumerate()
        .try_fold(start, |current, (index, step)| child(&current, step, index))
}

fn resolve_baron(start: Element, path: &Value) -> Result<Element> {
    let keys = path
        .get("path")
        .and_then(Value::as_array)
        .ok_or_else(|| lookup_failed(0, "missing 'path' keys"))?;

    let mut current = start;
    for (index, key) in keys.iter().enumerate() {
        current = match (&current, key) {
            (Element::List(_), Value::Number(number)) => {
                let position = number
                    .as_u64()
                    .and_then(|position| usize::try_from(position).ok())
                    .ok_or_else(|| lookup_failed(index, format!("{key} is not a list index")))?;
                child(&current, &Step::Index(position), index)?
            }
            (Element::Node(node), Value::String(name)) => attribute_element(node, name, index)?,
            _ => {
                return Err(lookup_failed(
                    index,
                    format!("key {key} does not match the tree shape"),
                ));
            }
        };
    }

    let last = keys.len();
    let position = path
        .get("position_in_rendering_list")
        .and_then(Value::as_u64)
        .and_then(|position| usize::try_from(position).ok());
    // "list" names both a list container and the `[...]` node type, so the
    // current element decides how the position is read
    let in_list = matches!(current, Element::List(_));
    match (in_list, path.get("type").and_then(Value::as_str), position) {
        (_, None, _) => Ok(current),
        (_, Some(kind), None) => Err(lookup_failed(last, format!("no position given for '{kind}'"))),
        (true, Some("list"), Some(position)) => child(&current, &Step::Index(position), last),
        (true, Some(kind), Some(_)) => Err(lookup_failed(
            last,
            format!("a list holds no '{kind}' fields"),
        )),
        (false, Some(kind), Some(position)) => {
            let spec = grammar::require(kind)?;
            let field = spec
                .fields
                .get(position)
                .filter(|field| field.is_stored())
                .ok_or_else(|| {
                    lookup_failed(last, format!("'{kind}' has no field at position {position}"))
                })?;
            let step = Step::Attribute {
                kind: spec.kind,
                name: field.name,
                position,
            };
            child(&current, &step, last)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_path() {
        let root = NodeList::from_source("a\n").unwrap();
        assert!(root.path().is_root());
        assert_eq!(
            root.path().to_baron_path(),
            json!({"path": [], "type": null, "position_in_rendering_list": null})
        );
    }

    #[test]
    fn test_path_display() {
        let root = NodeList::from_source("a = b + c\n").unwrap();
        let second = root.find("name", &[("value", "c")]).unwrap();
        assert_eq!(second.path().to_string(), "root[0].value.second");
    }

    #[test]
    fn test_stale_path() {
        let root = NodeList::from_source("a = 1\n").unwrap();
        let path = Path::new(vec![Step::Index(5)]);
        let err = root.find_by_path(&path).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Path step 0 could not be resolved: index 5 out of range for a list of 2"
        );
    }

    #[test]
    fn test_wrong_owner_type() {
        let root = NodeList::from_source("a = 1\n").unwrap();
        let path = make_path(json!([0]), Some("funcdef"), Some(0));
        assert!(root.find_by_baron_path(&path).is_err());
    }
}
