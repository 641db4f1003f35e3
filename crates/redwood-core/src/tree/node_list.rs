//! Ordered node sequences: the root of a parsed file and every list field

use std::cell::RefCell;
use std::fmt;
use std::ops::Range;
use std::rc::Rc;

use serde_json::Value;
use tracing::debug;

use super::coerce::{self, Input};
use super::node::{Node, ParentRef, WeakNode};
use crate::error::RedwoodError;
use crate::grammar::{Context, Field, Shape};
use crate::parser;
use crate::result::Result;

/// What a list is to the tree around it
#[derive(Clone)]
pub(crate) enum ListRole {
    /// Top-level statements of a parsed file
    Root,
    /// Stored under `attribute` of its owner node
    Field {
        owner: WeakNode,
        attribute: &'static str,
    },
    /// Built but not stored anywhere yet
    Detached,
    /// Result of a filter or search: elements keep their real parents
    View,
}

pub(crate) struct ListData {
    pub(crate) items: Vec<Node>,
    pub(crate) role: ListRole,
    pub(crate) shape: Shape,
    pub(crate) context: Context,
}

/// Handle to an ordered list of nodes
///
/// Clones share storage, like [`Node`] handles. Elements of a list stored in a
/// node field report that node as their parent; elements of a root list report
/// the list itself with `on_attribute() == Some("root")`.
#[derive(Clone)]
pub struct NodeList(pub(crate) Rc<RefCell<ListData>>);

impl NodeList {
    fn with_role(items: Vec<Node>, role: ListRole, shape: Shape, context: Context) -> NodeList {
        NodeList(Rc::new(RefCell::new(ListData {
            items,
            role,
            shape,
            context,
        })))
    }

    /// Parse a complete source file
    pub fn from_source(source: &str) -> Result<NodeList> {
        NodeList::from_fst(parser::parse(source)?)
    }

    /// Wrap a root FST list
    pub fn from_fst(fst: Value) -> Result<NodeList> {
        let Value::Array(items) = fst else {
            return Err(RedwoodError::invalid_value(format!(
                "expected a list of nodes, got {fst}"
            )));
        };
        let nodes = items.iter().map(Node::build).collect::<Result<Vec<_>>>()?;
        debug!("Built root list with {} nodes", nodes.len());

        let root = NodeList::with_role(Vec::new(), ListRole::Root, Shape::Suite, Context::Statements);
        root.push_nodes(nodes);
        Ok(root)
    }

    pub(crate) fn detached(items: Vec<Node>, shape: Shape, context: Context) -> NodeList {
        NodeList::with_role(items, ListRole::Detached, shape, context)
    }

    pub(crate) fn view(&self, items: Vec<Node>) -> NodeList {
        let (shape, context) = {
            let data = self.0.borrow();
            (data.shape, data.context)
        };
        NodeList::with_role(items, ListRole::View, shape, context)
    }

    /// Free-standing view holding search results
    pub(crate) fn results(items: Vec<Node>) -> NodeList {
        NodeList::with_role(items, ListRole::View, Shape::Plain, Context::Structural)
    }

    pub(crate) fn shape(&self) -> Shape {
        self.0.borrow().shape
    }

    pub(crate) fn context(&self) -> Context {
        self.0.borrow().context
    }

    /// Identity comparison: both handles point at the same list
    pub fn ptr_eq(&self, other: &NodeList) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn len(&self) -> usize {
        self.0.borrow().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Node> {
        self.0.borrow().items.get(index).cloned()
    }

    /// Index from the end when negative: `at(-1)` is the last element
    pub fn at(&self, index: isize) -> Option<Node> {
        let resolved = if index < 0 {
            self.len().checked_sub(index.unsigned_abs())?
        } else {
            index.unsigned_abs()
        };
        self.get(resolved)
    }

    pub fn first(&self) -> Option<Node> {
        self.0.borrow().items.first().cloned()
    }

    pub fn last(&self) -> Option<Node> {
        self.0.borrow().items.last().cloned()
    }

    /// View over a range of elements, clamped to the list bounds
    pub fn slice(&self, range: Range<usize>) -> NodeList {
        let items = {
            let data = self.0.borrow();
            let end = range.end.min(data.items.len());
            let start = range.start.min(end);
            data.items[start..end].to_vec()
        };
        self.view(items)
    }

    /// Snapshot of the elements
    pub fn nodes(&self) -> Vec<Node> {
        self.0.borrow().items.clone()
    }

    pub fn iter(&self) -> std::vec::IntoIter<Node> {
        self.nodes().into_iter()
    }

    pub fn position(&self, node: &Node) -> Option<usize> {
        self.0.borrow().items.iter().position(|item| item.ptr_eq(node))
    }

    pub(crate) fn owner(&self) -> Option<Node> {
        match &self.0.borrow().role {
            ListRole::Field { owner, .. } => owner.upgrade().map(Node),
            _ => None,
        }
    }

    /// The node this list is stored in, `None` for root lists and views
    pub fn parent(&self) -> Option<Node> {
        self.owner()
    }

    pub fn on_attribute(&self) -> Option<String> {
        match &self.0.borrow().role {
            ListRole::Field { attribute, .. } => Some((*attribute).to_string()),
            _ => None,
        }
    }

    pub(crate) fn field_attribute(&self) -> Option<&'static str> {
        match &self.0.borrow().role {
            ListRole::Field { attribute, .. } => Some(*attribute),
            _ => None,
        }
    }

    /// Parent link handed to elements inserted into this list
    fn element_parent(&self) -> Option<(ParentRef, String)> {
        match &self.0.borrow().role {
            ListRole::Root => Some((ParentRef::List(Rc::downgrade(&self.0)), "root".to_string())),
            ListRole::Field { owner, attribute } => {
                Some((ParentRef::Node(owner.clone()), (*attribute).to_string()))
            }
            ListRole::Detached | ListRole::View => None,
        }
    }

    fn adopt(&self, nodes: &[Node]) {
        if let Some((parent, attribute)) = self.element_parent() {
            for node in nodes {
                node.set_parent(Some(parent.clone()), Some(attribute.clone()));
            }
        }
    }

    /// Store this list under `field` of `owner`
    pub(crate) fn attach_to(&self, owner: &Node, field: &'static Field) {
        {
            let mut data = self.0.borrow_mut();
            data.role = ListRole::Field {
                owner: Rc::downgrade(&owner.0),
                attribute: field.name,
            };
            data.shape = field.shape;
            data.context = field.context;
        }
        self.adopt(&self.nodes());
    }

    /// Undo [`NodeList::attach_to`] once `owner.attribute` holds something else
    pub(crate) fn release_from(&self, owner: &Node, attribute: &str) {
        let held = match self.owner() {
            Some(current) => current.ptr_eq(owner) && self.field_attribute() == Some(attribute),
            None => false,
        };
        if held {
            self.0.borrow_mut().role = ListRole::Detached;
            for item in self.nodes() {
                item.release_from(owner, attribute);
            }
        }
    }

    /// Insert already-built nodes at `index`, parenting them to this list
    pub fn insert_nodes(&self, index: usize, nodes: Vec<Node>) -> Result<()> {
        let len = self.len();
        if index > len {
            return Err(RedwoodError::invalid_value(format!(
                "insertion index {index} out of range for a list of {len}"
            )));
        }
        self.adopt(&nodes);
        self.0.borrow_mut().items.splice(index..index, nodes);
        Ok(())
    }

    /// Append already-built nodes, parenting them to this list
    pub fn push_nodes(&self, nodes: Vec<Node>) {
        self.adopt(&nodes);
        self.0.borrow_mut().items.extend(nodes);
    }

    /// Coerce `value` in this list's context and insert the result at `index`
    pub fn insert(&self, index: usize, value: impl Into<Input>) -> Result<()> {
        let nodes = coerce::to_nodes(value.into(), self.shape(), self.context())?;
        self.insert_nodes(index, nodes)
    }

    /// Replace the element at `index` with the coerced `value`
    pub fn set(&self, index: usize, value: impl Into<Input>) -> Result<()> {
        if index >= self.len() {
            return Err(RedwoodError::invalid_value(format!(
                "index {index} out of range for a list of {}",
                self.len()
            )));
        }
        let nodes = coerce::to_nodes(value.into(), self.shape(), self.context())?;
        self.remove(index)?;
        self.insert_nodes(index, nodes)
    }

    /// Remove and return the element at `index`, detached from the tree
    pub fn remove(&self, index: usize) -> Result<Node> {
        let len = self.len();
        if index >= len {
            return Err(RedwoodError::invalid_value(format!(
                "index {index} out of range for a list of {len}"
            )));
        }
        let node = self.0.borrow_mut().items.remove(index);
        if self.element_parent().is_some() {
            node.set_parent(None, None);
        }
        Ok(node)
    }

    /// Apply `f` to every element and collect the results
    pub fn map<T>(&self, f: impl FnMut(&Node) -> T) -> Vec<T> {
        self.nodes().iter().map(f).collect()
    }

    /// Run `f` on every element for its side effects, returning this list
    pub fn apply<R>(&self, mut f: impl FnMut(&Node) -> R) -> &Self {
        for node in self.nodes() {
            f(&node);
        }
        self
    }

    /// View over the elements matching `predicate`, in order
    pub fn filter(&self, mut predicate: impl FnMut(&Node) -> bool) -> NodeList {
        let items = self.nodes().into_iter().filter(|node| predicate(node)).collect();
        self.view(items)
    }

    /// Elements without the separators of this list's shape
    pub fn filtered(&self) -> Vec<Node> {
        let separators = self.shape().separators();
        self.nodes()
            .into_iter()
            .filter(|node| !separators.contains(&node.kind()))
            .collect()
    }

    /// Render every element back to source text
    pub fn dumps(&self) -> String {
        let mut out = String::new();
        self.write_source(&mut out);
        out
    }

    pub(crate) fn write_source(&self, out: &mut String) {
        for item in self.0.borrow().items.iter() {
            item.write_source(out);
        }
    }

    /// Plain-data snapshot of the elements
    pub fn fst(&self) -> Value {
        Value::Array(self.0.borrow().items.iter().map(Node::fst).collect())
    }

    /// Deep, independent copy with no parent
    pub fn copy(&self) -> NodeList {
        let (role, shape, context) = {
            let data = self.0.borrow();
            let role = match data.role {
                ListRole::Root => ListRole::Root,
                _ => ListRole::Detached,
            };
            (role, data.shape, data.context)
        };
        let copy = NodeList::with_role(Vec::new(), role, shape, context);
        copy.push_nodes(self.nodes().iter().map(Node::copy).collect());
        copy
    }
}

impl<'a> IntoIterator for &'a NodeList {
    type Item = Node;
    type IntoIter = std::vec::IntoIter<Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl PartialEq for NodeList {
    /// Element-wise structural equality
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.nodes() == other.nodes()
    }
}

impl fmt::Debug for NodeList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.nodes()).finish()
    }
}
