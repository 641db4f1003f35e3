//! Path addressing integration tests
//!
//! Every element of a decorated function is addressed from the root, encoded
//! as plain data, and resolved back to the very same element.

use redwood_core::{Element, Node, NodeList, Path, make_path};
use serde_json::{Value, json};

const SOURCE: &str = "\
@deco
def a(c, d):
    b = c + d
";

fn fixture() -> (NodeList, Node) {
    let root = NodeList::from_source(SOURCE).unwrap();
    let funcdef = root.find("funcdef", &[]).unwrap();
    (root, funcdef)
}

fn check_path(root: &NodeList, element: Element, expected: Value) {
    let path = match &element {
        Element::Node(node) => node.path(),
        Element::List(list) => list.path(),
    };
    assert_eq!(path.to_baron_path(), expected);
    assert!(root.find_by_baron_path(&expected).unwrap().is(&element));
    assert!(root.find_by_path(&path).unwrap().is(&element));
}

fn node(node: Node) -> Element {
    Element::Node(node)
}

fn list(list: NodeList) -> Element {
    Element::List(list)
}

#[test]
fn test_path_root() {
    let (root, _) = fixture();
    check_path(&root, list(root.clone()), make_path(json!([]), None, None));
}

#[test]
fn test_path_first_statement() {
    let (root, funcdef) = fixture();
    check_path(&root, node(funcdef), make_path(json!([]), Some("list"), Some(0)));
}

#[test]
fn test_path_decorators() {
    let (root, funcdef) = fixture();
    let decorators = funcdef.list("decorators").unwrap();
    check_path(
        &root,
        list(decorators.clone()),
        make_path(json!([0]), Some("funcdef"), Some(0)),
    );

    let decorator = decorators.get(0).unwrap();
    check_path(
        &root,
        node(decorator.clone()),
        make_path(json!([0, "decorators"]), Some("list"), Some(0)),
    );

    let dotted_name = decorator.node("value").unwrap();
    check_path(
        &root,
        node(dotted_name.clone()),
        make_path(json!([0, "decorators", 0]), Some("decorator"), Some(1)),
    );

    let parts = dotted_name.list("value").unwrap();
    check_path(
        &root,
        list(parts.clone()),
        make_path(json!([0, "decorators", 0, "value"]), Some("dotted_name"), Some(0)),
    );
    check_path(
        &root,
        node(parts.get(0).unwrap()),
        make_path(
            json!([0, "decorators", 0, "value", "value"]),
            Some("list"),
            Some(0),
        ),
    );

    check_path(
        &root,
        node(decorators.get(1).unwrap()),
        make_path(json!([0, "decorators"]), Some("list"), Some(1)),
    );
}

#[test]
fn test_path_formatting_fields() {
    let (root, funcdef) = fixture();
    let expected = [
        ("first_formatting", 2),
        ("second_formatting", 4),
        ("third_formatting", 6),
        ("fourth_formatting", 8),
        ("fifth_formatting", 10),
        ("sixth_formatting", 12),
    ];
    for (field, position) in expected {
        check_path(
            &root,
            list(funcdef.list(field).unwrap()),
            make_path(json!([0]), Some("funcdef"), Some(position)),
        );
    }

    let space = funcdef.list("first_formatting").unwrap().get(0).unwrap();
    check_path(
        &root,
        node(space),
        make_path(json!([0, "first_formatting"]), Some("list"), Some(0)),
    );
}

#[test]
fn test_path_arguments() {
    let (root, funcdef) = fixture();
    let arguments = funcdef.list("arguments").unwrap();
    check_path(
        &root,
        list(arguments.clone()),
        make_path(json!([0]), Some("funcdef"), Some(7)),
    );
    for index in 0..3 {
        check_path(
            &root,
            node(arguments.get(index).unwrap()),
            make_path(json!([0, "arguments"]), Some("list"), Some(index)),
        );
    }
}

#[test]
fn test_path_suite() {
    let (root, funcdef) = fixture();
    let value = funcdef.list("value").unwrap();
    check_path(
        &root,
        list(value.clone()),
        make_path(json!([0]), Some("funcdef"), Some(13)),
    );
    for index in 0..3 {
        check_path(
            &root,
            node(value.get(index).unwrap()),
            make_path(json!([0, "value"]), Some("list"), Some(index)),
        );
    }
}

#[test]
fn test_path_inside_statements() {
    let (root, funcdef) = fixture();
    let assignment = funcdef.list("value").unwrap().get(1).unwrap();
    check_path(
        &root,
        node(assignment.node("target").unwrap()),
        make_path(json!([0, "value", 1]), Some("assignment"), Some(0)),
    );

    let binop = assignment.node("value").unwrap();
    check_path(
        &root,
        node(binop.clone()),
        make_path(json!([0, "value", 1]), Some("assignment"), Some(5)),
    );
    check_path(
        &root,
        node(binop.node("first").unwrap()),
        make_path(json!([0, "value", 1, "value"]), Some("binary_operator"), Some(0)),
    );
    check_path(
        &root,
        node(binop.node("second").unwrap()),
        make_path(json!([0, "value", 1, "value"]), Some("binary_operator"), Some(4)),
    );
}

#[test]
fn test_path_survives_reparse() {
    let (root, _) = fixture();
    let second = root.find("name", &[("value", "d")]).unwrap();
    let encoded = second.path().to_baron_path();

    let reparsed = NodeList::from_source(&root.dumps()).unwrap();
    let found = reparsed.find_by_baron_path(&encoded).unwrap();
    assert_eq!(found.dumps(), "d");
    assert_eq!(found.into_node().unwrap().path().to_baron_path(), encoded);
}

#[test]
fn test_stale_path_is_a_lookup_error() {
    let (root, _) = fixture();
    let path = make_path(json!([0, "value", 7]), Some("assignment"), Some(0));
    let err = root.find_by_baron_path(&path).unwrap_err();
    assert_eq!(err.kind(), redwood_core::ErrorKind::Lookup);
}

#[test]
fn test_path_of_detached_node_is_root() {
    let (_, funcdef) = fixture();
    let copy = funcdef.copy();
    assert_eq!(copy.path(), Path::default());
    assert_eq!(copy.path().to_string(), "root");
}

#[test]
fn test_find_by_path_from_a_node() {
    let (_, funcdef) = fixture();
    let target = funcdef.find("assignment", &[]).unwrap().node("target").unwrap();
    let relative = make_path(json!(["value", 1]), Some("assignment"), Some(0));
    assert!(
        funcdef
            .find_by_baron_path(&relative)
            .unwrap()
            .is(&Element::Node(target))
    );
}

const SOURCES: &[&str] = &[
    SOURCE,
    "x = [1, 2]\n",
    "d = {'a': [b, (c,)]}\nf(x, *y, k=[z])\n",
    "class A(B):\n    def m(self, x=[1]):\n        return self.a.b\n",
    "for i in [1, 2]:\n    if i: pass\n    else:\n        continue\n",
    "try:\n    a\nexcept E as e:\n    pass\nfinally:\n    b\n",
];

/// Address `element` both ways and resolve it back from `root`
fn assert_resolves(root: &NodeList, element: Element) {
    let path = match &element {
        Element::Node(node) => node.path(),
        Element::List(list) => list.path(),
    };
    let found = root.find_by_path(&path).unwrap();
    assert!(found.is(&element), "{path} resolved to another element");

    let encoded = path.to_baron_path();
    let found = root
        .find_by_baron_path(&encoded)
        .unwrap_or_else(|err| panic!("{encoded} failed: {err}"));
    assert!(found.is(&element), "{encoded} resolved to another element");
}

#[test]
fn test_every_element_resolves_from_its_path() {
    for source in SOURCES {
        let root = NodeList::from_source(source).unwrap();
        for statement in &root {
            for node in statement.descendants() {
                for field in redwood_core::grammar::fields_of(node.kind()).unwrap() {
                    if field.is_list() {
                        assert_resolves(&root, list(node.list(field.name).unwrap()));
                    }
                }
                assert_resolves(&root, Element::Node(node));
            }
        }
    }
}

#[test]
fn test_list_literal_attributes_resolve() {
    let root = NodeList::from_source("x = [1, 2]\n").unwrap();
    let literal = root.find("list", &[]).unwrap();
    let values = literal.list("value").unwrap();

    let encoded = values.path().to_baron_path();
    assert_eq!(
        encoded,
        json!({"path": [0, "value"], "type": "list", "position_in_rendering_list": 3})
    );
    assert!(root.find_by_baron_path(&encoded).unwrap().is(&list(values)));

    let wrong = make_path(json!([0]), Some("list"), Some(0));
    let err = root.find_by_baron_path(&wrong).unwrap_err();
    assert_eq!(err.kind(), redwood_core::ErrorKind::Lookup);
}
