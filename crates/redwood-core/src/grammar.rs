//! Grammar table for the full syntax tree
//!
//! Every node type of the FST is described by a static [`NodeSpec`]: the
//! ordered list of fields the renderer walks, what kind of data each field
//! holds, and how literal snippets assigned into a field must be parsed.
//!
//! The field order is significant twice over: it is the rendering order
//! (concatenating the fields in order reproduces the source), and the index of
//! a field in the table is the `position_in_rendering_list` used by
//! [`crate::tree::Path`].

use crate::error::RedwoodError;
use crate::result::Result;

/// What a grammar field holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// A child node, a list of child nodes, or null
    Value,
    /// A list of whitespace/comment tokens with no semantic meaning
    Formatting,
    /// A primitive string stored under the field name and rendered verbatim
    Key,
    /// A primitive flag that is never rendered
    Boolean,
    /// Literal text that is rendered but never stored
    Constant,
}

/// Shape of a value field, and the separator policy of list-shaped ones
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Exactly one child node (or null)
    Single,
    /// Elements delimited by `comma` nodes: list, set, tuple, call arguments...
    Comma,
    /// Elements delimited by `dot` nodes: dotted names and atom trailers
    Dotted,
    /// An indented statement block whose lines end with `endl` nodes
    Suite,
    /// A list with no separator semantics
    Plain,
}

impl Shape {
    pub fn is_list(self) -> bool {
        !matches!(self, Shape::Single)
    }

    /// Node types that act as punctuation in a list of this shape
    pub fn separators(self) -> &'static [&'static str] {
        match self {
            Shape::Comma => &["comma"],
            Shape::Dotted => &["dot"],
            Shape::Suite => &["endl"],
            Shape::Single | Shape::Plain => &[],
        }
    }
}

/// How a literal snippet assigned into a field is parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Context {
    Expression,
    Statements,
    CallArgument,
    DictItem,
    DefArgument,
    WithContext,
    Dotted,
    Formatting,
    /// Only FST values or built nodes are accepted
    Structural,
}

/// One entry of a node type's rendering table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    /// Field name, or the literal text for constants
    pub name: &'static str,
    pub kind: FieldKind,
    pub shape: Shape,
    pub context: Context,
    /// Render this entry only when the named field is truthy
    pub when: Option<&'static str>,
}

impl Field {
    const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            shape: Shape::Single,
            context: Context::Expression,
            when: None,
        }
    }

    /// Whether this entry is stored in the FST dict (constants are not)
    pub fn is_stored(&self) -> bool {
        self.kind != FieldKind::Constant
    }

    /// Whether this entry holds a list of nodes
    pub fn is_list(&self) -> bool {
        self.kind == FieldKind::Formatting || (self.kind == FieldKind::Value && self.shape.is_list())
    }
}

const fn constant(text: &'static str) -> Field {
    Field::new(text, FieldKind::Constant)
}

const fn constant_if(text: &'static str, when: &'static str) -> Field {
    let mut field = Field::new(text, FieldKind::Constant);
    field.when = Some(when);
    field
}

const fn formatting(name: &'static str) -> Field {
    let mut field = Field::new(name, FieldKind::Formatting);
    field.shape = Shape::Plain;
    field.context = Context::Formatting;
    field
}

const fn key(name: &'static str) -> Field {
    Field::new(name, FieldKind::Key)
}

const fn flag(name: &'static str) -> Field {
    Field::new(name, FieldKind::Boolean)
}

const fn node(name: &'static str) -> Field {
    Field::new(name, FieldKind::Value)
}

const fn node_in(name: &'static str, context: Context) -> Field {
    let mut field = Field::new(name, FieldKind::Value);
    field.context = context;
    field
}

const fn list(name: &'static str, shape: Shape, context: Context) -> Field {
    let mut field = Field::new(name, FieldKind::Value);
    field.shape = shape;
    field.context = context;
    field
}

/// Static metadata for one node type
#[derive(Debug)]
pub struct NodeSpec {
    pub kind: &'static str,
    pub fields: &'static [Field],
    /// Extra identifiers this type answers to in searches
    pub aliases: &'static [&'static str],
    /// Helper operations available on this type
    pub helpers: &'static [&'static str],
    /// The `value` key holds an integer literal
    pub integer: bool,
}

impl NodeSpec {
    const fn new(kind: &'static str, fields: &'static [Field]) -> Self {
        Self {
            kind,
            fields,
            aliases: &[],
            helpers: &[],
            integer: false,
        }
    }

    const fn aliases(mut self, aliases: &'static [&'static str]) -> Self {
        self.aliases = aliases;
        self
    }

    const fn helpers(mut self, helpers: &'static [&'static str]) -> Self {
        self.helpers = helpers;
        self
    }

    const fn integer(mut self) -> Self {
        self.integer = true;
        self
    }

    /// Look up a stored field by name
    pub fn field(&self, name: &str) -> Option<&'static Field> {
        self.fields
            .iter()
            .find(|f| f.is_stored() && f.name == name)
    }

    /// Index of a stored field in rendering order
    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields
            .iter()
            .position(|f| f.is_stored() && f.name == name)
    }

    /// Stored fields in rendering order
    pub fn stored_fields(&self) -> impl Iterator<Item = &'static Field> + '_ {
        self.fields.iter().filter(|f| f.is_stored())
    }

    /// The suite field of a compound statement, if this type has one
    pub fn suite_field(&self) -> Option<&'static Field> {
        self.fields
            .iter()
            .find(|f| f.kind == FieldKind::Value && f.shape == Shape::Suite)
    }

    /// The formatting field rendered right before the suite (the space of a
    /// one-line compound statement lives there)
    pub fn suite_formatting_field(&self) -> Option<&'static Field> {
        let index = self
            .fields
            .iter()
            .position(|f| f.kind == FieldKind::Value && f.shape == Shape::Suite)?;
        self.fields[..index]
            .iter()
            .rev()
            .find(|f| f.kind == FieldKind::Formatting)
    }

    /// The main list field used by append operations
    pub fn append_field(&self) -> Option<&'static Field> {
        self.suite_field().or_else(|| {
            self.fields
                .iter()
                .find(|f| f.kind == FieldKind::Value && f.name == "value" && f.shape.is_list())
        })
    }
}

const SEPARATOR: &[Field] = &[
    formatting("first_formatting"),
    constant(","),
    formatting("second_formatting"),
];

static SPECS: &[NodeSpec] = &[
    // Leaves
    NodeSpec::new("name", &[key("value")]),
    NodeSpec::new("int", &[key("value")]).integer(),
    NodeSpec::new("float", &[key("value")]),
    NodeSpec::new("string", &[key("value")]),
    NodeSpec::new("space", &[key("value")]),
    NodeSpec::new("comment", &[formatting("formatting"), key("value")]),
    NodeSpec::new(
        "endl",
        &[formatting("formatting"), key("value"), key("indent")],
    ),
    NodeSpec::new("comma", SEPARATOR),
    NodeSpec::new(
        "dot",
        &[
            formatting("first_formatting"),
            constant("."),
            formatting("second_formatting"),
        ],
    ),
    NodeSpec::new(
        "semicolon",
        &[
            formatting("first_formatting"),
            constant(";"),
            formatting("second_formatting"),
        ],
    ),
    // Simple statements
    NodeSpec::new("pass", &[constant("pass")]),
    NodeSpec::new("break", &[constant("break")]),
    NodeSpec::new("continue", &[constant("continue")]),
    NodeSpec::new(
        "return",
        &[constant("return"), formatting("formatting"), node("value")],
    ),
    NodeSpec::new(
        "raise",
        &[constant("raise"), formatting("formatting"), node("value")],
    ),
    NodeSpec::new(
        "yield",
        &[constant("yield"), formatting("formatting"), node("value")],
    ),
    NodeSpec::new(
        "yield_from",
        &[
            constant("yield"),
            formatting("first_formatting"),
            constant("from"),
            formatting("second_formatting"),
            node("value"),
        ],
    ),
    NodeSpec::new(
        "del",
        &[constant("del"), formatting("formatting"), node("value")],
    ),
    NodeSpec::new(
        "assert",
        &[
            constant("assert"),
            formatting("first_formatting"),
            node("value"),
            formatting("second_formatting"),
            constant_if(",", "message"),
            formatting("third_formatting"),
            node("message"),
        ],
    ),
    NodeSpec::new(
        "global",
        &[
            constant("global"),
            formatting("formatting"),
            list("value", Shape::Comma, Context::Expression),
        ],
    ),
    NodeSpec::new(
        "nonlocal",
        &[
            constant("nonlocal"),
            formatting("formatting"),
            list("value", Shape::Comma, Context::Expression),
        ],
    ),
    NodeSpec::new(
        "assignment",
        &[
            node("target"),
            formatting("first_formatting"),
            key("operator"),
            constant("="),
            formatting("second_formatting"),
            node("value"),
        ],
    ),
    // Expressions
    NodeSpec::new(
        "binary_operator",
        &[
            node("first"),
            formatting("first_formatting"),
            key("value"),
            formatting("second_formatting"),
            node("second"),
        ],
    ),
    NodeSpec::new(
        "boolean_operator",
        &[
            node("first"),
            formatting("first_formatting"),
            key("value"),
            formatting("second_formatting"),
            node("second"),
        ],
    ),
    NodeSpec::new(
        "comparison",
        &[
            node("first"),
            formatting("first_formatting"),
            key("value"),
            formatting("second_formatting"),
            node("second"),
        ],
    ),
    NodeSpec::new(
        "unitary_operator",
        &[key("value"), formatting("formatting"), node("target")],
    ),
    NodeSpec::new(
        "associative_parenthesis",
        &[
            formatting("first_formatting"),
            constant("("),
            formatting("second_formatting"),
            node("value"),
            formatting("third_formatting"),
            constant(")"),
            formatting("fourth_formatting"),
        ],
    ),
    NodeSpec::new(
        "atomtrailers",
        &[list("value", Shape::Dotted, Context::Dotted)],
    ),
    NodeSpec::new(
        "call",
        &[
            formatting("first_formatting"),
            constant("("),
            formatting("second_formatting"),
            list("value", Shape::Comma, Context::CallArgument),
            formatting("third_formatting"),
            constant(")"),
            formatting("fourth_formatting"),
        ],
    ),
    NodeSpec::new(
        "call_argument",
        &[
            node("target"),
            formatting("first_formatting"),
            constant_if("=", "target"),
            formatting("second_formatting"),
            node("value"),
        ],
    ),
    NodeSpec::new(
        "list_argument",
        &[constant("*"), formatting("formatting"), node("value")],
    ),
    NodeSpec::new(
        "dict_argument",
        &[constant("**"), formatting("formatting"), node("value")],
    ),
    NodeSpec::new(
        "getitem",
        &[
            formatting("first_formatting"),
            constant("["),
            formatting("second_formatting"),
            node("value"),
            formatting("third_formatting"),
            constant("]"),
            formatting("fourth_formatting"),
        ],
    ),
    NodeSpec::new(
        "list",
        &[
            formatting("first_formatting"),
            constant("["),
            formatting("second_formatting"),
            list("value", Shape::Comma, Context::Expression),
            formatting("third_formatting"),
            constant("]"),
            formatting("fourth_formatting"),
        ],
    ),
    NodeSpec::new(
        "set",
        &[
            formatting("first_formatting"),
            constant("{"),
            formatting("second_formatting"),
            list("value", Shape::Comma, Context::Expression),
            formatting("third_formatting"),
            constant("}"),
            formatting("fourth_formatting"),
        ],
    ),
    NodeSpec::new(
        "dict",
        &[
            formatting("first_formatting"),
            constant("{"),
            formatting("second_formatting"),
            list("value", Shape::Comma, Context::DictItem),
            formatting("third_formatting"),
            constant("}"),
            formatting("fourth_formatting"),
        ],
    ),
    NodeSpec::new(
        "dictitem",
        &[
            node("key"),
            formatting("first_formatting"),
            constant(":"),
            formatting("second_formatting"),
            node("value"),
        ],
    ),
    NodeSpec::new(
        "tuple",
        &[
            formatting("first_formatting"),
            constant_if("(", "with_parenthesis"),
            formatting("second_formatting"),
            list("value", Shape::Comma, Context::Expression),
            formatting("third_formatting"),
            constant_if(")", "with_parenthesis"),
            formatting("fourth_formatting"),
            flag("with_parenthesis"),
        ],
    ),
    NodeSpec::new(
        "repr",
        &[
            constant("`"),
            formatting("first_formatting"),
            list("value", Shape::Comma, Context::Expression),
            formatting("second_formatting"),
            constant("`"),
        ],
    ),
    NodeSpec::new(
        "string_chain",
        &[list("value", Shape::Plain, Context::Structural)],
    ),
    // Comprehensions
    NodeSpec::new(
        "list_comprehension",
        &[
            formatting("first_formatting"),
            constant("["),
            formatting("second_formatting"),
            node("result"),
            list("generators", Shape::Plain, Context::Structural),
            formatting("third_formatting"),
            constant("]"),
            formatting("fourth_formatting"),
        ],
    ),
    NodeSpec::new(
        "set_comprehension",
        &[
            formatting("first_formatting"),
            constant("{"),
            formatting("second_formatting"),
            node("result"),
            list("generators", Shape::Plain, Context::Structural),
            formatting("third_formatting"),
            constant("}"),
            formatting("fourth_formatting"),
        ],
    ),
    NodeSpec::new(
        "dict_comprehension",
        &[
            formatting("first_formatting"),
            constant("{"),
            formatting("second_formatting"),
            node_in("result", Context::DictItem),
            list("generators", Shape::Plain, Context::Structural),
            formatting("third_formatting"),
            constant("}"),
            formatting("fourth_formatting"),
        ],
    ),
    NodeSpec::new(
        "generator_comprehension",
        &[
            formatting("first_formatting"),
            constant_if("(", "with_parenthesis"),
            formatting("second_formatting"),
            node("result"),
            list("generators", Shape::Plain, Context::Structural),
            formatting("third_formatting"),
            constant_if(")", "with_parenthesis"),
            formatting("fourth_formatting"),
            flag("with_parenthesis"),
        ],
    ),
    NodeSpec::new(
        "comprehension_loop",
        &[
            formatting("first_formatting"),
            constant("for"),
            formatting("second_formatting"),
            node("target"),
            formatting("third_formatting"),
            constant("in"),
            formatting("fourth_formatting"),
            node("iterator"),
            list("ifs", Shape::Plain, Context::Structural),
        ],
    ),
    NodeSpec::new(
        "comprehension_if",
        &[
            formatting("first_formatting"),
            constant("if"),
            formatting("second_formatting"),
            node("value"),
        ],
    ),
    NodeSpec::new(
        "dotted_name",
        &[list("value", Shape::Dotted, Context::Dotted)],
    ),
    // Imports
    NodeSpec::new(
        "import",
        &[
            constant("import"),
            formatting("first_formatting"),
            list("value", Shape::Comma, Context::Structural),
        ],
    )
    .helpers(&["modules", "names"]),
    NodeSpec::new(
        "dotted_as_name",
        &[
            list("value", Shape::Dotted, Context::Dotted),
            formatting("first_formatting"),
            constant_if("as", "target"),
            formatting("second_formatting"),
            key("target"),
        ],
    ),
    NodeSpec::new(
        "from_import",
        &[
            constant("from"),
            formatting("first_formatting"),
            list("value", Shape::Dotted, Context::Dotted),
            formatting("second_formatting"),
            constant("import"),
            formatting("third_formatting"),
            list("targets", Shape::Comma, Context::Structural),
        ],
    )
    .helpers(&["modules", "names"]),
    NodeSpec::new(
        "name_as_name",
        &[
            key("value"),
            formatting("first_formatting"),
            constant_if("as", "target"),
            formatting("second_formatting"),
            key("target"),
        ],
    ),
    // Compound statements
    NodeSpec::new(
        "while",
        &[
            constant("while"),
            formatting("first_formatting"),
            node("test"),
            formatting("second_formatting"),
            constant(":"),
            formatting("third_formatting"),
            list("value", Shape::Suite, Context::Statements),
            node_in("else", Context::Structural),
        ],
    ),
    NodeSpec::new(
        "for",
        &[
            constant("for"),
            formatting("first_formatting"),
            node("iterator"),
            formatting("second_formatting"),
            constant("in"),
            formatting("third_formatting"),
            node("target"),
            formatting("fourth_formatting"),
            constant(":"),
            formatting("fifth_formatting"),
            list("value", Shape::Suite, Context::Statements),
            node_in("else", Context::Structural),
        ],
    ),
    NodeSpec::new(
        "ifelseblock",
        &[list("value", Shape::Plain, Context::Structural)],
    ),
    NodeSpec::new(
        "if",
        &[
            constant("if"),
            formatting("first_formatting"),
            node("test"),
            formatting("second_formatting"),
            constant(":"),
            formatting("third_formatting"),
            list("value", Shape::Suite, Context::Statements),
        ],
    ),
    NodeSpec::new(
        "elif",
        &[
            constant("elif"),
            formatting("first_formatting"),
            node("test"),
            formatting("second_formatting"),
            constant(":"),
            formatting("third_formatting"),
            list("value", Shape::Suite, Context::Statements),
        ],
    ),
    NodeSpec::new(
        "else",
        &[
            constant("else"),
            formatting("first_formatting"),
            constant(":"),
            formatting("second_formatting"),
            list("value", Shape::Suite, Context::Statements),
        ],
    ),
    NodeSpec::new(
        "try",
        &[
            constant("try"),
            formatting("first_formatting"),
            constant(":"),
            formatting("second_formatting"),
            list("value", Shape::Suite, Context::Statements),
            list("excepts", Shape::Plain, Context::Structural),
            node_in("else", Context::Structural),
            node_in("finally", Context::Structural),
        ],
    ),
    NodeSpec::new(
        "except",
        &[
            constant("except"),
            formatting("first_formatting"),
            node("exception"),
            formatting("second_formatting"),
            constant_if("as", "target"),
            formatting("third_formatting"),
            node("target"),
            formatting("fourth_formatting"),
            constant(":"),
            formatting("fifth_formatting"),
            list("value", Shape::Suite, Context::Statements),
        ],
    ),
    NodeSpec::new(
        "finally",
        &[
            constant("finally"),
            formatting("first_formatting"),
            constant(":"),
            formatting("second_formatting"),
            list("value", Shape::Suite, Context::Statements),
        ],
    ),
    NodeSpec::new(
        "with",
        &[
            constant("with"),
            formatting("first_formatting"),
            list("contexts", Shape::Comma, Context::WithContext),
            formatting("second_formatting"),
            constant(":"),
            formatting("third_formatting"),
            list("value", Shape::Suite, Context::Statements),
        ],
    ),
    NodeSpec::new(
        "with_context",
        &[
            node("value"),
            formatting("first_formatting"),
            constant_if("as", "as"),
            formatting("second_formatting"),
            node("as"),
        ],
    ),
    NodeSpec::new(
        "funcdef",
        &[
            list("decorators", Shape::Plain, Context::Structural),
            constant("def"),
            formatting("first_formatting"),
            key("name"),
            formatting("second_formatting"),
            constant("("),
            formatting("third_formatting"),
            list("arguments", Shape::Comma, Context::DefArgument),
            formatting("fourth_formatting"),
            constant(")"),
            formatting("fifth_formatting"),
            constant(":"),
            formatting("sixth_formatting"),
            list("value", Shape::Suite, Context::Statements),
        ],
    )
    .aliases(&["def", "def_"]),
    NodeSpec::new(
        "def_argument",
        &[
            key("name"),
            formatting("first_formatting"),
            constant_if("=", "value"),
            formatting("second_formatting"),
            node("value"),
        ],
    ),
    NodeSpec::new(
        "decorator",
        &[
            constant("@"),
            node_in("value", Context::Structural),
            node_in("call", Context::Structural),
        ],
    ),
    NodeSpec::new(
        "class",
        &[
            list("decorators", Shape::Plain, Context::Structural),
            constant("class"),
            formatting("first_formatting"),
            key("name"),
            formatting("second_formatting"),
            constant_if("(", "parenthesis"),
            formatting("third_formatting"),
            list("inherit_from", Shape::Comma, Context::Expression),
            formatting("fourth_formatting"),
            constant_if(")", "parenthesis"),
            formatting("fifth_formatting"),
            constant(":"),
            formatting("sixth_formatting"),
            list("value", Shape::Suite, Context::Statements),
            flag("parenthesis"),
        ],
    ),
];

/// Look up the spec of a node type
pub fn spec(kind: &str) -> Option<&'static NodeSpec> {
    SPECS.iter().find(|s| s.kind == kind)
}

/// Look up the spec of a node type, failing for undeclared types
pub fn require(kind: &str) -> Result<&'static NodeSpec> {
    spec(kind).ok_or_else(|| RedwoodError::unknown_node_type(kind))
}

/// Ordered fields of a node type
pub fn fields_of(kind: &str) -> Result<&'static [Field]> {
    require(kind).map(|s| s.fields)
}

/// Extra identifiers declared for a node type
pub fn aliases_of(kind: &str) -> Result<&'static [&'static str]> {
    require(kind).map(|s| s.aliases)
}

/// Every declared node type
pub fn node_types() -> impl Iterator<Item = &'static str> {
    SPECS.iter().map(|s| s.kind)
}

/// Class-style name of a node type: `binary_operator` becomes `BinaryOperatorNode`
pub fn class_name(kind: &str) -> String {
    let mut name = String::with_capacity(kind.len() + 4);
    for part in kind.split('_').filter(|p| !p.is_empty()) {
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            name.extend(first.to_uppercase());
            name.push_str(chars.as_str());
        }
    }
    name.push_str("Node");
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_funcdef_positions() {
        let funcdef = spec("funcdef").unwrap();
        assert_eq!(funcdef.position("decorators"), Some(0));
        assert_eq!(funcdef.position("first_formatting"), Some(2));
        assert_eq!(funcdef.position("arguments"), Some(7));
        assert_eq!(funcdef.position("value"), Some(13));
        assert_eq!(funcdef.position("def"), None);
    }

    #[test]
    fn test_assignment_positions() {
        let assignment = spec("assignment").unwrap();
        assert_eq!(assignment.position("target"), Some(0));
        assert_eq!(assignment.position("value"), Some(5));
    }

    #[test]
    fn test_suite_formatting_field() {
        let expected = [
            ("while", "third_formatting"),
            ("for", "fifth_formatting"),
            ("funcdef", "sixth_formatting"),
            ("class", "sixth_formatting"),
            ("else", "second_formatting"),
            ("try", "second_formatting"),
            ("except", "fifth_formatting"),
            ("with", "third_formatting"),
        ];
        for (kind, field) in expected {
            let found = spec(kind).unwrap().suite_formatting_field().unwrap();
            assert_eq!(found.name, field, "wrong suite formatting for {kind}");
        }
    }

    #[test]
    fn test_unknown_type() {
        assert!(spec("pouet").is_none());
        assert!(fields_of("pouet").is_err());
    }

    #[test]
    fn test_class_name() {
        assert_eq!(class_name("name"), "NameNode");
        assert_eq!(class_name("binary_operator"), "BinaryOperatorNode");
        assert_eq!(class_name("funcdef"), "FuncdefNode");
    }

    #[test]
    fn test_every_when_refers_to_a_stored_field() {
        for kind in node_types() {
            let spec = spec(kind).unwrap();
            for field in spec.fields {
                if let Some(when) = field.when {
                    assert!(spec.field(when).is_some(), "{kind}: dangling condition {when}");
                }
            }
        }
    }
}
