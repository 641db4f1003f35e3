//! Node model integration tests
//!
//! Attribute access, parent links, siblings and list views on parsed sources.

use redwood_core::{Attr, Element, Node, NodeList, parse};
use serde_json::json;

fn root(source: &str) -> NodeList {
    NodeList::from_source(source).unwrap()
}

fn first(source: &str) -> (NodeList, Node) {
    let root = root(source);
    let node = root.get(0).unwrap();
    (root, node)
}

fn parent_is(node: &Node, owner: &Node) -> bool {
    node.parent()
        .and_then(Element::into_node)
        .is_some_and(|parent| parent.ptr_eq(owner))
}

#[test]
fn test_empty_source() {
    let root = root("");
    assert!(root.is_empty());
    assert_eq!(root.dumps(), "");
}

#[test]
fn test_name_and_endl() {
    let root = root("a\n");
    assert_eq!(root.len(), 2);
    assert_eq!(root.get(0).unwrap().kind(), "name");
    assert_eq!(root.get(1).unwrap().kind(), "endl");
    assert_eq!(root.get(0).unwrap().get("value").unwrap(), Attr::Str("a".to_string()));
}

#[test]
fn test_int_value_is_a_number() {
    let (_root, int) = first("1\n");
    assert_eq!(int.kind(), "int");
    assert_eq!(int.get("value").unwrap().as_int(), Some(1));
}

#[test]
fn test_assignment_fields() {
    let (_root, assignment) = first("a = 2");
    assert_eq!(assignment.kind(), "assignment");
    assert_eq!(assignment.node("value").unwrap().get("value").unwrap().as_int(), Some(2));
    assert_eq!(
        assignment.node("target").unwrap().get("value").unwrap().as_str(),
        Some("a")
    );
}

#[test]
fn test_binary_operator_fields() {
    for source in ["z +  42", "z  -      42"] {
        let (_root, binop) = first(source);
        let operator = if source.contains('+') { "+" } else { "-" };
        assert_eq!(binop.get("value").unwrap().as_str(), Some(operator));
        assert_eq!(binop.node("first").unwrap().get("value").unwrap().as_str(), Some("z"));
        assert_eq!(binop.node("second").unwrap().get("value").unwrap().as_int(), Some(42));
    }
}

#[test]
fn test_pass() {
    let (_root, node) = first("pass");
    assert_eq!(node.kind(), "pass");
}

#[test]
fn test_copy_is_a_distinct_equal_node() {
    let (_root, name) = first("a");
    let copy = name.copy();
    assert_eq!(copy.get("value").unwrap(), name.get("value").unwrap());
    assert!(!copy.ptr_eq(&name));
    assert_eq!(copy, name);
    assert!(copy.parent().is_none());
}

#[test]
fn test_copy_keeps_the_node_type() {
    let (_root, atomtrailers) = first("a()");
    let call = atomtrailers.list("value").unwrap().get(1).unwrap();
    assert_eq!(call.copy().kind(), "call");
}

#[test]
fn test_dumps_and_fst() {
    let source = "ax + (z * 4)";
    let root = root(source);
    assert_eq!(root.dumps(), source);
    assert_eq!(root.fst(), parse(source).unwrap());
}

#[test]
fn test_helpers() {
    assert!(first("a").1.helpers().is_empty());
    assert_eq!(first("import a").1.helpers(), ["modules", "names"]);
}

#[test]
fn test_import_helpers() {
    let (_root, import) = first("import os.path as p, sys\n");
    assert_eq!(import.modules().unwrap(), ["os.path", "sys"]);
    assert_eq!(import.names().unwrap(), ["p", "sys"]);

    let (_root, from_import) = first("from a.b import c as d, e\n");
    assert_eq!(from_import.modules().unwrap(), ["a.b.c", "a.b.e"]);
    assert_eq!(from_import.names().unwrap(), ["d", "e"]);
}

#[test]
fn test_help_does_not_fail() {
    let root = root("ax + (z * 4)");
    let mut out = Vec::new();
    root.help(&mut out).unwrap();
    root.get(0).unwrap().help(&mut out).unwrap();
    assert!(!out.is_empty());
}

#[test]
fn test_generate_identifiers() {
    let (_root, funcdef) = first("def a(): pass");
    let identifiers: Vec<_> = funcdef.generate_identifiers().into_iter().collect();
    let mut sorted = identifiers.clone();
    sorted.sort();
    assert_eq!(sorted, ["def", "def_", "funcdef", "funcdef_", "funcdefnode"]);
}

#[test]
fn test_trailing_underscore_reaches_reserved_names() {
    let (_root, try_node) = first("try:\n    pass\nfinally:\n    pass\n");
    let finally = try_node.node("finally_").unwrap();
    assert_eq!(finally.kind(), "finally");
}

#[test]
fn test_typed_accessors_reject_shape_mismatch() {
    let (_root, assignment) = first("a = 1");
    assert!(assignment.list("target").is_err());
    assert!(assignment.node("operator").is_err());
}

#[test]
fn test_parent_links() {
    let (root, assignment) = first("a = 1 + caramba");
    assert!(root.parent().is_none());
    assert!(assignment.parent().unwrap().is(&Element::List(root.clone())));
    assert_eq!(assignment.on_attribute().as_deref(), Some("root"));

    let target = assignment.node("target").unwrap();
    assert!(parent_is(&target, &assignment));
    assert_eq!(target.on_attribute().as_deref(), Some("target"));

    let value = assignment.node("value").unwrap();
    assert!(parent_is(&value, &assignment));
    assert_eq!(value.on_attribute().as_deref(), Some("value"));

    for attribute in ["first", "second"] {
        let operand = value.node(attribute).unwrap();
        assert!(parent_is(&operand, &value));
        assert_eq!(operand.on_attribute().as_deref(), Some(attribute));
    }
}

#[test]
fn test_list_elements_point_at_the_owner() {
    let (_root, list) = first("[1, 2, 3]");
    let value = list.list("value").unwrap();
    assert_eq!(value.len(), 5);
    for element in &value {
        assert!(parent_is(&element, &list));
        assert_eq!(element.on_attribute().as_deref(), Some("value"));
    }
    assert!(value.parent().unwrap().ptr_eq(&list));
    assert_eq!(value.on_attribute().as_deref(), Some("value"));
}

#[test]
fn test_copy_has_no_parent() {
    let (_root, assignment) = first("a = 1 + caramba");
    assert!(assignment.node("value").unwrap().copy().parent().is_none());
}

#[test]
fn test_next_and_previous() {
    let (root, list) = first("[1, 2, 3]");
    assert!(list.next().is_none());
    assert!(list.previous().is_none());
    assert!(root.parent().is_none());

    let inner = list.list("value").unwrap();
    for index in 0..4 {
        let node = inner.get(index).unwrap();
        assert!(node.next().unwrap().ptr_eq(&inner.get(index + 1).unwrap()));
    }
    assert!(inner.get(4).unwrap().next().is_none());

    for index in 1..5 {
        let node = inner.get(index).unwrap();
        assert!(node.previous().unwrap().ptr_eq(&inner.get(index - 1).unwrap()));
    }
    assert!(inner.get(0).unwrap().previous().is_none());
}

#[test]
fn test_sibling_generators() {
    let (_root, list) = first("[1, 2, 3]");
    let inner = list.list("value").unwrap();
    let third = inner.get(2).unwrap();

    let following: Vec<Node> = third.next_generator().collect();
    assert_eq!(following, inner.slice(3..5).nodes());

    let preceding: Vec<Node> = third.previous_generator().collect();
    let mut expected = inner.slice(0..2).nodes();
    expected.reverse();
    assert_eq!(preceding, expected);
}

#[test]
fn test_map() {
    let root = root("[1, 2, 3]");
    let values = root
        .find_all("int", &[])
        .map(|node| node.get("value").unwrap().as_int());
    assert_eq!(values, [Some(1), Some(2), Some(3)]);
}

#[test]
fn test_apply_returns_the_same_list() {
    let root = root("a()\nb()");
    let calls = root.find_all("call", &[]);
    let returned = calls.apply(|call| call.append_value("plop"));
    assert!(returned.ptr_eq(&calls));
    assert_eq!(root.dumps(), "a(plop)\nb(plop)");
}

#[test]
fn test_filter() {
    let (root, list) = first("[1, 2, 3]");
    let without_commas = list.list("value").unwrap().filter(|node| node.kind() != "comma");
    assert_eq!(without_commas, root.find_all("int", &[]));
}

#[test]
fn test_filtered_drops_separators() {
    let (_root, while_node) = first("while a:\n    pass\n");
    let value = while_node.list("value").unwrap();
    assert_eq!(value.filtered(), [value.at(-2).unwrap()]);

    let (_root, list) = first("[1, 2, 3]");
    let value = list.list("value").unwrap();
    assert_eq!(
        value.filtered(),
        value.filter(|node| node.kind() != "comma").nodes()
    );

    let (_root, atomtrailers) = first("a.b.c(d)");
    let value = atomtrailers.list("value").unwrap();
    let kinds: Vec<_> = value.filtered().iter().map(Node::kind).collect();
    assert_eq!(kinds, ["name", "name", "name", "call"]);
}

#[test]
fn test_debug_shows_class_and_source() {
    let (_root, name) = first("a");
    assert_eq!(format!("{name:?}"), "NameNode(\"a\")");
}

#[test]
fn test_fst_of_detached_node() {
    let node = Node::from_fst(json!({"type": "name", "value": "pouet"})).unwrap();
    assert_eq!(node.fst(), json!({"type": "name", "value": "pouet"}));
    assert_eq!(node.dumps(), "pouet");
}
