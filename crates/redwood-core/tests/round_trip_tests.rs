//! Lossless round-trip integration tests
//!
//! Sources must render back byte for byte after parsing, and edits must leave
//! every untouched byte in place.

use redwood_core::{ErrorKind, NodeList, RoundTripValidator, parse, render};

const MODULE: &str = r#"#!/usr/bin/env python
# a module with a bit of everything

import os.path as p, sys
from . import a as b, c


@decorator.attr(1)
class Thing(Base, Mixin):
    # body comment
    def method(self, x, y=2, *args, **kwargs):  # trailing
        if x is not None and y:
            return x  +  y
        elif x:
            pass
        else:
            raise ValueError
        for i, j in zip(x, y):
            continue
        while True:
            break

    def other(self): return [1,
                             2]


try:
    value = {'a': 1, "b": (2,)}
except Exception as error:
    value = None
finally:
    pass

with open(p) as f, lock:
    data = f.read()[0]
x = -y ** 2; z = `x`
"#;

#[test]
fn test_module_round_trip() {
    let root = NodeList::from_source(MODULE).unwrap();
    assert_eq!(root.dumps(), MODULE);
    assert_eq!(render(&parse(MODULE).unwrap()).unwrap(), MODULE);
}

#[test]
fn test_validator_accepts_module() {
    let result = RoundTripValidator::new().validate(MODULE).unwrap();
    assert!(result.is_valid(), "issues: {:?}", result.issues());
}

#[test]
fn test_tree_fst_matches_parser_fst() {
    let root = NodeList::from_source(MODULE).unwrap();
    assert_eq!(render(&root.fst()).unwrap(), MODULE);
}

#[test]
fn test_edit_keeps_surrounding_formatting() {
    let root = NodeList::from_source(MODULE).unwrap();
    let call = root.find("call", &[]).unwrap();
    call.append_value("3").unwrap();
    let expected = MODULE.replace("@decorator.attr(1)", "@decorator.attr(1, 3)");
    assert_eq!(root.dumps(), expected);
}

#[test]
fn test_rename_keeps_comments() {
    let root = NodeList::from_source(MODULE).unwrap();
    let method = root.find("def", &[("name", "method")]).unwrap();
    method.set("name", "renamed").unwrap();
    let expected = MODULE.replace("def method(", "def renamed(");
    assert_eq!(root.dumps(), expected);
}

#[test]
fn test_copy_renders_like_the_original() {
    let root = NodeList::from_source(MODULE).unwrap();
    let copy = root.copy();
    assert_eq!(copy.dumps(), MODULE);
    copy.find("class", &[]).unwrap().set("name", "Other").unwrap();
    assert_eq!(root.dumps(), MODULE);
}

#[test]
fn test_syntax_error_position() {
    let err = NodeList::from_source("a = 1\nb = (\n").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Syntax);
    assert!(err.to_string().starts_with("Syntax error at line "));
}

const GENERATORS: &str = r#"def numbers(limit):
    global seen
    assert limit > 0, "limit must be positive"
    squares = [n * n for n in range(limit) if n % 2]
    table = {k: v for k, v in zip(squares, squares)}
    total = sum(n for n in squares)
    del table[0]
    doc = ("first part "
           'second part')
    received = yield total
    yield from (s for s in {x for x in squares})
"#;

#[test]
fn test_generator_module_round_trip() {
    let root = NodeList::from_source(GENERATORS).unwrap();
    assert_eq!(root.dumps(), GENERATORS);
    let result = RoundTripValidator::new().validate(GENERATORS).unwrap();
    assert!(result.is_valid(), "issues: {:?}", result.issues());
}

#[test]
fn test_edit_comprehension_result() {
    let root = NodeList::from_source(GENERATORS).unwrap();
    let squares = root.find("list_comprehension", &[]).unwrap();
    squares.set("result", "n ** 2").unwrap();
    let expected = GENERATORS.replace("[n * n for", "[n ** 2 for");
    assert_eq!(root.dumps(), expected);
}

#[test]
fn test_append_global_name() {
    let root = NodeList::from_source(GENERATORS).unwrap();
    root.find("global", &[]).unwrap().append_value("other").unwrap();
    let expected = GENERATORS.replace("global seen", "global seen, other");
    assert_eq!(root.dumps(), expected);
}
