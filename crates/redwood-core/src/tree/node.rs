//! Node handles over the full syntax tree
//!
//! A [`Node`] is a cheap, clonable handle to one FST dict. Every handle to the
//! same node shares the same storage, so an edit made through any of them is
//! visible through all of them and in the rendered output of every ancestor.
//! Parents are held weakly: a child never keeps its parent alive.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::{IndexMap, IndexSet};
use serde_json::{Map, Value};
use tracing::trace;

use super::coerce::{self, Input};
use super::node_list::{ListData, NodeList};
use crate::error::RedwoodError;
use crate::grammar::{self, Field, FieldKind, NodeSpec};
use crate::render::is_truthy;
use crate::result::Result;

pub(crate) type NodeCell = Rc<RefCell<NodeData>>;
pub(crate) type WeakNode = Weak<RefCell<NodeData>>;

/// Non-owning link from a node to whatever holds it
#[derive(Clone)]
pub(crate) enum ParentRef {
    Node(WeakNode),
    List(Weak<RefCell<ListData>>),
}

/// Content of one stored grammar field
#[derive(Clone)]
pub(crate) enum Slot {
    Node(Node),
    List(NodeList),
    /// Primitive key or flag, or null for an empty node field
    Value(Value),
}

impl Slot {
    pub(crate) fn is_truthy(&self) -> bool {
        match self {
            Slot::Node(_) => true,
            Slot::List(list) => !list.is_empty(),
            Slot::Value(value) => is_truthy(Some(value)),
        }
    }

    fn to_fst(&self) -> Value {
        match self {
            Slot::Node(node) => node.fst(),
            Slot::List(list) => list.fst(),
            Slot::Value(value) => value.clone(),
        }
    }

    fn deep_copy(&self) -> Slot {
        match self {
            Slot::Node(node) => Slot::Node(node.copy()),
            Slot::List(list) => Slot::List(list.copy()),
            Slot::Value(value) => Slot::Value(value.clone()),
        }
    }
}

pub(crate) struct NodeData {
    pub(crate) spec: &'static NodeSpec,
    pub(crate) fields: IndexMap<&'static str, Slot>,
    pub(crate) parent: Option<ParentRef>,
    pub(crate) on_attribute: Option<String>,
}

/// Handle to one node of the tree
#[derive(Clone)]
pub struct Node(pub(crate) NodeCell);

/// Value of a node attribute
#[derive(Debug, Clone, PartialEq)]
pub enum Attr {
    Node(Node),
    List(NodeList),
    Str(String),
    Int(i64),
    Bool(bool),
    None,
}

impl Attr {
    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Attr::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&NodeList> {
        match self {
            Attr::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Attr::Str(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Attr::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Attr::Bool(flag) => Some(*flag),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Attr::None)
    }

    pub fn into_node(self) -> Option<Node> {
        match self {
            Attr::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn into_list(self) -> Option<NodeList> {
        match self {
            Attr::List(list) => Some(list),
            _ => None,
        }
    }
}

/// Either kind of tree handle: what a parent link or a path resolves to
#[derive(Debug, Clone)]
pub enum Element {
    Node(Node),
    List(NodeList),
}

impl Element {
    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Element::Node(node) => Some(node),
            Element::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&NodeList> {
        match self {
            Element::List(list) => Some(list),
            Element::Node(_) => None,
        }
    }

    pub fn into_node(self) -> Option<Node> {
        match self {
            Element::Node(node) => Some(node),
            Element::List(_) => None,
        }
    }

    pub fn into_list(self) -> Option<NodeList> {
        match self {
            Element::List(list) => Some(list),
            Element::Node(_) => None,
        }
    }

    /// Identity comparison: both handles point at the same storage
    pub fn is(&self, other: &Element) -> bool {
        match (self, other) {
            (Element::Node(a), Element::Node(b)) => a.ptr_eq(b),
            (Element::List(a), Element::List(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    pub fn dumps(&self) -> String {
        match self {
            Element::Node(node) => node.dumps(),
            Element::List(list) => list.dumps(),
        }
    }

    pub fn fst(&self) -> Value {
        match self {
            Element::Node(node) => node.fst(),
            Element::List(list) => list.fst(),
        }
    }
}

impl From<Node> for Element {
    fn from(node: Node) -> Self {
        Element::Node(node)
    }
}

impl From<NodeList> for Element {
    fn from(list: NodeList) -> Self {
        Element::List(list)
    }
}

impl Node {
    /// Build a node (and its whole subtree) from an FST dict
    ///
    /// Missing fields take their empty value, so partial dicts such as
    /// `{"type": "name", "value": "a"}` are accepted. Unknown node types fail.
    pub fn from_fst(fst: Value) -> Result<Node> {
        Self::build(&fst)
    }

    pub(crate) fn build(fst: &Value) -> Result<Node> {
        let map = fst.as_object().ok_or_else(|| {
            RedwoodError::invalid_value(format!("expected a node object, got {fst}"))
        })?;
        let kind = map
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| RedwoodError::invalid_value("node object without a 'type'"))?;
        let spec = grammar::require(kind)?;

        let node = Node::empty(spec);
        for field in spec.stored_fields() {
            let slot = build_slot(field, map.get(field.name))?;
            node.attach(field, slot);
        }
        Ok(node)
    }

    fn empty(spec: &'static NodeSpec) -> Node {
        Node(Rc::new(RefCell::new(NodeData {
            spec,
            fields: IndexMap::new(),
            parent: None,
            on_attribute: None,
        })))
    }

    pub(crate) fn spec(&self) -> &'static NodeSpec {
        self.0.borrow().spec
    }

    /// Node type name, e.g. `"binary_operator"`
    pub fn kind(&self) -> &'static str {
        self.spec().kind
    }

    /// Identity comparison: both handles point at the same node
    pub fn ptr_eq(&self, other: &Node) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    fn field(&self, name: &str) -> Result<&'static Field> {
        let spec = self.spec();
        spec.field(name)
            .or_else(|| name.strip_suffix('_').and_then(|base| spec.field(base)))
            .ok_or_else(|| RedwoodError::no_such_attribute(spec.kind, name))
    }

    pub(crate) fn slot(&self, name: &str) -> Option<Slot> {
        self.0.borrow().fields.get(name).cloned()
    }

    /// Read an attribute
    ///
    /// A trailing underscore reaches attributes named after keywords
    /// (`finally_`). Unknown attribute names are an error.
    pub fn get(&self, name: &str) -> Result<Attr> {
        if name == "type" {
            return Ok(Attr::Str(self.kind().to_string()));
        }
        let field = self.field(name)?;
        let attr = match self.slot(field.name) {
            Some(Slot::Node(node)) => Attr::Node(node),
            Some(Slot::List(list)) => Attr::List(list),
            Some(Slot::Value(value)) => primitive(self.spec(), field, value),
            None => Attr::None,
        };
        Ok(attr)
    }

    /// Read a node-valued attribute, failing when it is empty or a list
    pub fn node(&self, name: &str) -> Result<Node> {
        match self.get(name)? {
            Attr::Node(node) => Ok(node),
            other => Err(RedwoodError::invalid_value(format!(
                "'{}.{name}' is not a node: {other:?}",
                self.kind()
            ))),
        }
    }

    /// Read a list-valued attribute
    pub fn list(&self, name: &str) -> Result<NodeList> {
        match self.get(name)? {
            Attr::List(list) => Ok(list),
            other => Err(RedwoodError::invalid_value(format!(
                "'{}.{name}' is not a list: {other:?}",
                self.kind()
            ))),
        }
    }

    /// Assign an attribute
    ///
    /// Accepts source literals (parsed in the field's context), FST values,
    /// existing nodes or lists (adopted by reference), or sequences of these.
    /// The assigned value is parented to this node under `name`.
    pub fn set(&self, name: &str, value: impl Into<Input>) -> Result<()> {
        let field = self.field(name)?;
        let slot = coerce::to_slot(field, value.into())?;
        trace!(kind = self.kind(), attribute = field.name, "Assigning attribute");
        self.attach(field, slot);
        Ok(())
    }

    /// Store a slot and parent its content to this node
    ///
    /// The replaced content is released first so that elements shared between
    /// the old and the new list end up parented here.
    pub(crate) fn attach(&self, field: &'static Field, slot: Slot) {
        let previous = self.0.borrow_mut().fields.insert(field.name, slot.clone());
        match (previous, &slot) {
            (Some(Slot::Node(old)), Slot::Node(new)) if old.ptr_eq(new) => {}
            (Some(Slot::List(old)), Slot::List(new)) if old.ptr_eq(new) => {}
            (Some(Slot::Node(old)), _) => old.release_from(self, field.name),
            (Some(Slot::List(old)), _) => old.release_from(self, field.name),
            _ => {}
        }

        match &slot {
            Slot::Node(child) => child.set_parent(
                Some(ParentRef::Node(Rc::downgrade(&self.0))),
                Some(field.name.to_string()),
            ),
            Slot::List(list) => list.attach_to(self, field),
            Slot::Value(_) => {}
        }
    }

    /// Drop the parent link if it still points at `owner.attribute`
    pub(crate) fn release_from(&self, owner: &Node, attribute: &str) {
        let held = matches!(
            self.0.borrow().parent.as_ref(),
            Some(ParentRef::Node(weak)) if weak.upgrade().is_some_and(|cell| Rc::ptr_eq(&cell, &owner.0))
        ) && self.on_attribute().as_deref() == Some(attribute);
        if held {
            self.set_parent(None, None);
        }
    }

    pub(crate) fn set_parent(&self, parent: Option<ParentRef>, on_attribute: Option<String>) {
        let mut data = self.0.borrow_mut();
        data.parent = parent;
        data.on_attribute = on_attribute;
    }

    pub(crate) fn parent_ref(&self) -> Option<ParentRef> {
        self.0.borrow().parent.clone()
    }

    /// The node or list holding this node, `None` for a detached node
    pub fn parent(&self) -> Option<Element> {
        match self.parent_ref()? {
            ParentRef::Node(weak) => weak.upgrade().map(|cell| Element::Node(Node(cell))),
            ParentRef::List(weak) => weak.upgrade().map(|cell| Element::List(NodeList(cell))),
        }
    }

    /// The parent when it is a node (root-level nodes have a list parent)
    pub(crate) fn parent_node(&self) -> Option<Node> {
        match self.parent_ref()? {
            ParentRef::Node(weak) => weak.upgrade().map(Node),
            ParentRef::List(_) => None,
        }
    }

    /// Attribute of the parent under which this node is reachable
    ///
    /// List membership is transparent: elements of `funcdef.value` report
    /// `"value"`, and elements of a root list report `"root"`.
    pub fn on_attribute(&self) -> Option<String> {
        self.0.borrow().on_attribute.clone()
    }

    /// Deep, independent copy with no parent
    pub fn copy(&self) -> Node {
        let spec = self.spec();
        let copy = Node::empty(spec);
        for field in spec.stored_fields() {
            if let Some(slot) = self.slot(field.name) {
                copy.attach(field, slot.deep_copy());
            }
        }
        copy
    }

    /// Render this subtree back to source text
    pub fn dumps(&self) -> String {
        let mut out = String::new();
        self.write_source(&mut out);
        out
    }

    pub(crate) fn write_source(&self, out: &mut String) {
        let data = self.0.borrow();
        for field in data.spec.fields {
            if let Some(condition) = field.when
                && !data.fields.get(condition).is_some_and(Slot::is_truthy)
            {
                continue;
            }
            match field.kind {
                FieldKind::Constant => out.push_str(field.name),
                FieldKind::Boolean => {}
                FieldKind::Key => {
                    if let Some(Slot::Value(Value::String(text))) = data.fields.get(field.name) {
                        out.push_str(text);
                    }
                }
                FieldKind::Value | FieldKind::Formatting => match data.fields.get(field.name) {
                    Some(Slot::Node(child)) => child.write_source(out),
                    Some(Slot::List(list)) => list.write_source(out),
                    _ => {}
                },
            }
        }
    }

    /// Plain-data snapshot of this subtree
    pub fn fst(&self) -> Value {
        let data = self.0.borrow();
        let mut map = Map::new();
        map.insert("type".to_string(), Value::String(data.spec.kind.to_string()));
        for (name, slot) in &data.fields {
            map.insert((*name).to_string(), slot.to_fst());
        }
        Value::Object(map)
    }

    /// Child nodes in rendering order, list elements flattened in place
    pub(crate) fn rendered_children(&self) -> Vec<Node> {
        let data = self.0.borrow();
        let mut children = Vec::new();
        for slot in data.fields.values() {
            match slot {
                Slot::Node(node) => children.push(node.clone()),
                Slot::List(list) => children.extend(list.nodes()),
                Slot::Value(_) => {}
            }
        }
        children
    }

    /// The list holding this node and its index there
    pub(crate) fn container(&self) -> Option<(NodeList, usize)> {
        let list = match self.parent_ref()? {
            ParentRef::List(weak) => NodeList(weak.upgrade()?),
            ParentRef::Node(weak) => {
                let owner = Node(weak.upgrade()?);
                match owner.slot(&self.on_attribute()?)? {
                    Slot::List(list) => list,
                    _ => return None,
                }
            }
        };
        let index = list.position(self)?;
        Some((list, index))
    }

    /// Following sibling in the owning list
    #[allow(clippy::should_implement_trait)]
    pub fn next(&self) -> Option<Node> {
        let (list, index) = self.container()?;
        list.get(index + 1)
    }

    /// Preceding sibling in the owning list
    pub fn previous(&self) -> Option<Node> {
        let (list, index) = self.container()?;
        list.get(index.checked_sub(1)?)
    }

    /// Lazily walk the following siblings
    pub fn next_generator(&self) -> Siblings {
        Siblings {
            current: Some(self.clone()),
            forward: true,
        }
    }

    /// Lazily walk the preceding siblings, nearest first
    pub fn previous_generator(&self) -> Siblings {
        Siblings {
            current: Some(self.clone()),
            forward: false,
        }
    }

    /// Every identifier this node answers to in searches, lowercase
    pub fn generate_identifiers(&self) -> IndexSet<String> {
        let spec = self.spec();
        let mut identifiers = IndexSet::new();
        identifiers.insert(spec.kind.to_string());
        identifiers.insert(format!("{}_", spec.kind));
        identifiers.insert(grammar::class_name(spec.kind).to_lowercase());
        identifiers.extend(spec.aliases.iter().map(|alias| alias.to_lowercase()));
        identifiers
    }

    /// Helper operations available on this node type
    pub fn helpers(&self) -> Vec<&'static str> {
        self.spec().helpers.to_vec()
    }

    /// Full dotted paths of the modules an import statement brings in
    pub fn modules(&self) -> Result<Vec<String>> {
        match self.kind() {
            "import" => self
                .list("value")?
                .filtered()
                .iter()
                .map(|item| Ok(item.list("value")?.dumps()))
                .collect(),
            "from_import" => {
                let module = self.list("value")?.dumps();
                self.list("targets")?
                    .filtered()
                    .iter()
                    .map(|item| Ok(format!("{module}.{}", attr_text(&item.get("value")?))))
                    .collect()
            }
            kind => Err(RedwoodError::invalid_value(format!(
                "'{kind}' has no modules helper"
            ))),
        }
    }

    /// Names an import statement binds in the importing scope
    pub fn names(&self) -> Result<Vec<String>> {
        fn dotted(item: &Node) -> Result<String> {
            Ok(item.list("value")?.dumps())
        }
        fn plain(item: &Node) -> Result<String> {
            Ok(attr_text(&item.get("value")?))
        }

        let (list, value_of): (NodeList, fn(&Node) -> Result<String>) = match self.kind() {
            "import" => (self.list("value")?, dotted),
            "from_import" => (self.list("targets")?, plain),
            kind => {
                return Err(RedwoodError::invalid_value(format!(
                    "'{kind}' has no names helper"
                )));
            }
        };

        list.filtered()
            .iter()
            .map(|item| {
                let target = attr_text(&item.get("target")?);
                if target.is_empty() {
                    value_of(item)
                } else {
                    Ok(target)
                }
            })
            .collect()
    }
}

fn attr_text(attr: &Attr) -> String {
    match attr {
        Attr::Str(text) => text.clone(),
        Attr::Int(value) => value.to_string(),
        Attr::Bool(flag) => flag.to_string(),
        Attr::Node(node) => node.dumps(),
        Attr::List(list) => list.dumps(),
        Attr::None => String::new(),
    }
}

/// Convert a stored primitive to its attribute value
fn primitive(spec: &NodeSpec, field: &Field, value: Value) -> Attr {
    match value {
        Value::String(text) if spec.integer && field.name == "value" => {
            parse_int_literal(&text).map_or(Attr::Str(text), Attr::Int)
        }
        Value::String(text) => Attr::Str(text),
        Value::Bool(flag) => Attr::Bool(flag),
        Value::Number(number) => number
            .as_i64()
            .map_or_else(|| Attr::Str(number.to_string()), Attr::Int),
        Value::Null => Attr::None,
        other => Attr::Str(other.to_string()),
    }
}

fn parse_int_literal(text: &str) -> Option<i64> {
    let digits = text.trim_end_matches(['l', 'L']).replace('_', "");
    let lower = digits.to_ascii_lowercase();
    if let Some(hex) = lower.strip_prefix("0x") {
        i64::from_str_radix(hex, 16).ok()
    } else if let Some(octal) = lower.strip_prefix("0o") {
        i64::from_str_radix(octal, 8).ok()
    } else if let Some(binary) = lower.strip_prefix("0b") {
        i64::from_str_radix(binary, 2).ok()
    } else {
        lower.parse().ok()
    }
}

/// Build the slot of one field from its (possibly missing) FST value
fn build_slot(field: &'static Field, value: Option<&Value>) -> Result<Slot> {
    let invalid = |value: &Value| {
        RedwoodError::invalid_value(format!("unexpected value for '{}': {value}", field.name))
    };

    match field.kind {
        FieldKind::Key => match value {
            None | Some(Value::Null) => Ok(Slot::Value(Value::String(String::new()))),
            Some(Value::String(text)) => Ok(Slot::Value(Value::String(text.clone()))),
            Some(Value::Number(number)) => Ok(Slot::Value(Value::String(number.to_string()))),
            Some(other) => Err(invalid(other)),
        },
        FieldKind::Boolean => Ok(Slot::Value(Value::Bool(is_truthy(value)))),
        FieldKind::Constant => Err(RedwoodError::invalid_value(format!(
            "constant '{}' is not stored",
            field.name
        ))),
        FieldKind::Value | FieldKind::Formatting if field.is_list() => {
            let items = match value {
                None | Some(Value::Null) => Vec::new(),
                Some(Value::Array(items)) => items.iter().map(Node::build).collect::<Result<_>>()?,
                Some(other) => return Err(invalid(other)),
            };
            Ok(Slot::List(NodeList::detached(items, field.shape, field.context)))
        }
        FieldKind::Value | FieldKind::Formatting => match value {
            None | Some(Value::Null) => Ok(Slot::Value(Value::Null)),
            Some(Value::Object(map)) if map.is_empty() => Ok(Slot::Value(Value::Null)),
            Some(object @ Value::Object(_)) => Ok(Slot::Node(Node::build(object)?)),
            Some(other) => Err(invalid(other)),
        },
    }
}

impl PartialEq for Node {
    /// Structural equality of the two subtrees
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.fst() == other.fst()
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({:?})", grammar::class_name(self.kind()), self.dumps())
    }
}

/// Lazy walk over the siblings of a node in one direction
///
/// Each step re-reads the live tree, so edits made while iterating are seen.
pub struct Siblings {
    current: Option<Node>,
    forward: bool,
}

impl Iterator for Siblings {
    type Item = Node;

    fn next(&mut self) -> Option<Node> {
        let node = self.current.take()?;
        let sibling = if self.forward {
            node.next()
        } else {
            node.previous()
        };
        self.current = sibling.clone();
        sibling
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_partial_fst_gets_defaults() {
        let comma = Node::from_fst(json!({"type": "comma"})).unwrap();
        assert!(comma.list("first_formatting").unwrap().is_empty());
        assert_eq!(comma.dumps(), ",");
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let err = Node::from_fst(json!({"type": "pouet"})).unwrap_err();
        assert!(matches!(err, RedwoodError::UnknownNodeType { .. }));
    }

    #[test]
    fn test_int_value_is_numeric() {
        let int = Node::from_fst(json!({"type": "int", "value": "42"})).unwrap();
        assert_eq!(int.get("value").unwrap(), Attr::Int(42));
        let hex = Node::from_fst(json!({"type": "int", "value": "0x1f"})).unwrap();
        assert_eq!(hex.get("value").unwrap(), Attr::Int(31));
    }

    #[test]
    fn test_unknown_attribute() {
        let name = Node::from_fst(json!({"type": "name", "value": "a"})).unwrap();
        let err = name.get("plop").unwrap_err();
        assert_eq!(err.to_string(), "'name' has no attribute 'plop'");
    }

    #[test]
    fn test_identifiers() {
        let node = Node::from_fst(json!({"type": "binary_operator", "value": "+"})).unwrap();
        let identifiers: Vec<_> = node.generate_identifiers().into_iter().collect();
        assert_eq!(
            identifiers,
            ["binary_operator", "binary_operator_", "binaryoperatornode"]
        );
    }

    #[test]
    fn test_fst_snapshot_keeps_grammar_order() {
        let node = Node::from_fst(json!({"value": "a", "type": "name"})).unwrap();
        let fst = node.fst();
        let keys: Vec<_> = fst.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, ["type", "value"]);
    }

    #[test]
    fn test_replaced_child_is_released() {
        let assignment = Node::from_fst(json!({
            "type": "assignment",
            "target": {"type": "name", "value": "a"},
            "operator": "",
            "value": {"type": "int", "value": "1"},
        }))
        .unwrap();
        let old = assignment.node("target").unwrap();
        assignment.set("target", "b").unwrap();
        assert!(old.parent().is_none());
        assert_eq!(assignment.dumps(), "b=1");
    }
}
