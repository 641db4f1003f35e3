//! Indentation resolution integration tests

use redwood_core::{Node, NodeList};

fn value_list(root: &NodeList) -> NodeList {
    root.get(0).unwrap().list("value").unwrap()
}

fn same(a: Option<Node>, b: &Node) -> bool {
    a.is_some_and(|a| a.ptr_eq(b))
}

#[test]
fn test_root_level_has_no_indentation() {
    let root = NodeList::from_source("pouet").unwrap();
    assert_eq!(root.get(0).unwrap().indentation(), "");

    let root = NodeList::from_source("pouet\nplop\npop").unwrap();
    assert_eq!(root.len(), 5);
    for node in &root {
        assert_eq!(node.indentation(), "");
        assert!(node.get_indentation_node().is_none());
    }
}

#[test]
fn test_block_statement() {
    let root = NodeList::from_source("while a:\n    pass\n").unwrap();
    let value = value_list(&root);
    let statement = value.at(-2).unwrap();
    let closing = value.at(-1).unwrap();
    let opening = value.at(-3).unwrap();

    assert_eq!(statement.indentation(), "    ");
    assert_eq!(closing.indentation(), "");
    assert!(same(statement.get_indentation_node(), &opening));
    assert!(closing.get_indentation_node().is_none());
    assert!(opening.get_indentation_node().is_none());
    assert!(statement.indentation_node_is_direct());
}

#[test]
fn test_one_line_suite() {
    let root = NodeList::from_source("while a: pass\n").unwrap();
    let value = value_list(&root);
    assert_eq!(value.get(0).unwrap().indentation(), "");
    assert!(value.at(-2).unwrap().get_indentation_node().is_none());
    assert!(!value.at(-2).unwrap().indentation_node_is_direct());
}

#[test]
fn test_inner_node_of_one_line_suite() {
    let root = NodeList::from_source("while a: pass\n").unwrap();
    let test = root.get(0).unwrap().node("test").unwrap();
    assert_eq!(test.indentation(), "");
}

#[test]
fn test_dotted_chain() {
    let root = NodeList::from_source("a.b.c.d").unwrap();
    let value = value_list(&root);
    assert_eq!(value.at(-3).unwrap().indentation(), "");
    assert!(value.at(-2).unwrap().get_indentation_node().is_none());
    assert!(!value.at(-2).unwrap().indentation_node_is_direct());
}

#[test]
fn test_inherited_from_enclosing_block() {
    let root = NodeList::from_source("def f():\n    x = [1,\n         2]\n").unwrap();
    let two = root.find("int", &[("value", "2")]).unwrap();
    assert_eq!(two.indentation(), "    ");
    assert!(!two.indentation_node_is_direct());
}

#[test]
fn test_branch_after_block() {
    let root = NodeList::from_source("def f():\n    if a:\n        b\n    else:\n        c\n").unwrap();
    let else_node = root.find("else", &[]).unwrap();
    assert_eq!(else_node.indentation(), "    ");
    let c = root.find("name", &[("value", "c")]).unwrap();
    assert_eq!(c.indentation(), "        ");
}

#[test]
fn test_detached_copy() {
    let root = NodeList::from_source("a").unwrap();
    let copy = root.get(0).unwrap().copy();
    assert!(copy.get_indentation_node().is_none());
    assert_eq!(copy.indentation(), "");
}
