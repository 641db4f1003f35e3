//! Structural search integration tests

use redwood_core::{Attr, NodeList};

const NESTED: &str = "\
def plop():
    def a():
        with b as c:
            d = e
";

fn root(source: &str) -> NodeList {
    NodeList::from_source(source).unwrap()
}

#[test]
fn test_parent_find_without_match() {
    let root = root("a");
    assert!(root.get(0).unwrap().parent_find("a", &[]).is_none());
}

#[test]
fn test_parent_find_direct() {
    let root = root(NESTED);
    let target = root.find("assignment", &[]).unwrap().node("target").unwrap();
    let with = root.find("with", &[]).unwrap();
    assert!(target.parent_find("with", &[]).unwrap().ptr_eq(&with));
}

#[test]
fn test_parent_find_two_levels() {
    let root = root(NESTED);
    let target = root.find("assignment", &[]).unwrap().node("target").unwrap();
    let inner = root.find("funcdef", &[("name", "a")]).unwrap();
    assert!(target.parent_find("funcdef", &[]).unwrap().ptr_eq(&inner));
}

#[test]
fn test_parent_find_with_filters() {
    let root = root(NESTED);
    let target = root.find("assignment", &[]).unwrap().node("target").unwrap();
    let outer = root.find("def", &[]).unwrap();
    assert!(
        target
            .parent_find("def", &[("name", "plop")])
            .unwrap()
            .ptr_eq(&outer)
    );
    assert!(target.parent_find("def", &[("name", "dont_exist")]).is_none());
}

#[test]
fn test_find_in_empty_source() {
    let root = root("");
    assert!(root.find("stuff", &[]).is_none());
    assert!(root.find("something_else", &[]).is_none());
    assert!(root.find("something_else", &[("useless", "pouet")]).is_none());
    assert!(root.lookup("something_else").is_none());
}

#[test]
fn test_find_first_in_pre_order() {
    let root = root("def a(): b = c");
    let assignment = root.get(0).unwrap().list("value").unwrap().get(0).unwrap();
    let target = assignment.node("target").unwrap();
    let value = assignment.node("value").unwrap();

    assert!(root.find("name", &[]).unwrap().ptr_eq(&target));
    assert!(root.find("name", &[("value", "c")]).unwrap().ptr_eq(&value));
    assert!(root.lookup("name").unwrap().ptr_eq(&target));
}

#[test]
fn test_find_by_alias() {
    let root = root("def a(): b = c");
    let funcdef = root.get(0).unwrap();
    for query in ["funcdef", "funcdef_", "def_", "def"] {
        assert!(root.find(query, &[]).unwrap().ptr_eq(&funcdef));
    }
}

#[test]
fn test_find_is_case_insensitive() {
    let root = root("a");
    let name = root.get(0).unwrap();
    for query in ["NameNode", "NaMeNoDe", "namenode", "NAME"] {
        assert!(root.find(query, &[]).unwrap().ptr_eq(&name));
    }
}

#[test]
fn test_find_starts_at_the_node_itself() {
    let root = root("a + b");
    let binop = root.get(0).unwrap();
    assert!(binop.find("binary_operator", &[]).unwrap().ptr_eq(&binop));
}

#[test]
fn test_find_all_keeps_source_order() {
    let root = root("a = b\nc(d, a)\n");
    let names: Vec<_> = root
        .find_all("name", &[])
        .map(|node| node.get("value").unwrap().as_str().map(str::to_string));
    let names: Vec<_> = names.into_iter().flatten().collect();
    assert_eq!(names, ["a", "b", "c", "d", "a"]);

    let filtered = root.find_all("name", &[("value", "a")]);
    assert_eq!(filtered.len(), 2);
}

#[test]
fn test_filter_on_numeric_attribute() {
    let root = root("[1, 2, 3]");
    let two = root.find("int", &[("value", "2")]).unwrap();
    assert_eq!(two.dumps(), "2");
}

#[test]
fn test_lookup_prefers_attributes() {
    let root = root("a = b");
    let assignment = root.get(0).unwrap();
    let Some(Attr::Node(target)) = assignment.lookup("target") else {
        panic!("target should be an attribute");
    };
    assert_eq!(target.dumps(), "a");

    let Some(Attr::Node(name)) = assignment.lookup("name") else {
        panic!("name should be found by search");
    };
    assert!(name.ptr_eq(&target));
    assert!(assignment.lookup("funcdef").is_none());
}

#[test]
fn test_descendants_cover_the_subtree() {
    let root = root("f(a, b)");
    let count = root.get(0).unwrap().descendants().filter(|n| n.kind() == "name").count();
    assert_eq!(count, 3);
}
