//! Recursive-descent parser producing the full syntax tree
//!
//! The parser consumes the trivia-preserving token stream and builds the FST
//! directly as JSON values. Every token lands in exactly one node, either as
//! semantic content or inside a formatting field, so rendering the result
//! reproduces the input byte for byte.
//!
//! Layout conventions:
//! - an `endl` node owns the newline, the whitespace before it (`formatting`)
//!   and the whitespace that starts the next line (`indent`);
//! - operands never consume the whitespace that follows them; the enclosing
//!   construct collects it into its own formatting field when an operator
//!   follows;
//! - a compound statement's suite owns every `endl` up to the first line that
//!   dedents, including blank lines.

use serde_json::{Value, json};
use tracing::{debug, trace};

use crate::error::RedwoodError;
use crate::grammar::Context;
use crate::lexer::{Token, TokenKind, is_integer_literal, lex_with_trivia, line_col};
use crate::result::Result;

/// Words that can never start an expression atom
const RESERVED: &[&str] = &[
    "and", "as", "assert", "break", "class", "continue", "def", "del", "elif", "else",
    "except", "finally", "for", "from", "global", "if", "import", "in", "is", "lambda",
    "nonlocal", "not", "or", "pass", "raise", "return", "try", "while", "with", "yield",
];

const COMPOUND: &[&str] = &["if", "while", "for", "try", "with", "def", "class"];

const ASSIGN_OPS: &[&str] = &[
    "=", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "**=", "//=", ">>=", "<<=",
];

const COMPARISON_OPS: &[&str] = &["<", ">", "==", ">=", "<=", "!=", "<>"];

/// Parse a complete source file into the root FST list
pub fn parse(source: &str) -> Result<Value> {
    debug!("Parsing {} bytes of source", source.len());
    let mut parser = Parser::new(source)?;
    let items = parser.parse_file()?;
    debug!("Parsed {} top-level nodes", items.len());
    Ok(Value::Array(items))
}

/// Parse a literal snippet in the given context
///
/// List-shaped contexts (call arguments, dict items, def arguments, with
/// contexts, dotted names, statements, formatting) return every element of
/// the list, separators included. The expression context returns one node.
pub fn parse_snippet(source: &str, context: Context) -> Result<Vec<Value>> {
    trace!(?context, "Parsing snippet {:?}", source);
    let text = match context {
        Context::Statements | Context::Formatting => source,
        _ => source.trim(),
    };
    let mut parser = Parser::new(text)?;

    let items = match context {
        Context::Statements => return parser.parse_file(),
        Context::Formatting => return parser.parse_formatting(),
        Context::Expression => vec![parser.parse_testlist()?],
        Context::CallArgument => parser.comma_list(Parser::parse_call_argument, None)?,
        Context::DictItem => parser.comma_list(Parser::parse_dictitem, None)?,
        Context::DefArgument => parser.comma_list(Parser::parse_def_argument, None)?,
        Context::WithContext => parser.comma_list(Parser::parse_with_context, None)?,
        Context::Dotted => parser.parse_dotted_snippet()?,
        Context::Structural => {
            return Err(RedwoodError::invalid_value(format!(
                "source literal {source:?} cannot be parsed here, supply a node or FST value"
            )));
        }
    };

    parser.finish_snippet()?;
    Ok(items)
}

fn space(text: &str) -> Value {
    json!({"type": "space", "value": text})
}

fn comment(formatting: Vec<Value>, text: &str) -> Value {
    json!({"type": "comment", "formatting": formatting, "value": text})
}

fn comma(first_formatting: Vec<Value>, second_formatting: Vec<Value>) -> Value {
    json!({
        "type": "comma",
        "first_formatting": first_formatting,
        "second_formatting": second_formatting,
    })
}

fn dot(first_formatting: Vec<Value>, second_formatting: Vec<Value>) -> Value {
    json!({
        "type": "dot",
        "first_formatting": first_formatting,
        "second_formatting": second_formatting,
    })
}

/// A bracketed collection: list, set or dict
fn collection(
    kind: &str,
    value: Vec<Value>,
    second_formatting: Vec<Value>,
    third_formatting: Vec<Value>,
) -> Value {
    json!({
        "type": kind,
        "first_formatting": [],
        "second_formatting": second_formatting,
        "value": value,
        "third_formatting": third_formatting,
        "fourth_formatting": [],
    })
}

fn name(text: &str) -> Value {
    json!({"type": "name", "value": text})
}

/// Signature shared by the element parsers handed to [`Parser::comma_list`]
type ItemParser<'a> = fn(&mut Parser<'a>) -> Result<Value>;

/// Token stream parser
struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    /// Bracket nesting; comments only count as formatting inside brackets
    depth: usize,
    /// Width of the indentation of the current physical line
    line_indent: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Result<Self> {
        let (tokens, errors) = lex_with_trivia(source);
        if let Some(error) = errors.first() {
            let (line, column) = line_col(source, error.span.start);
            return Err(RedwoodError::syntax(error.message.clone(), line, column));
        }
        Ok(Self {
            source,
            tokens,
            pos: 0,
            depth: 0,
            line_indent: 0,
        })
    }

    // ----- token cursor -----

    fn current(&self) -> &Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.pos.min(last)]
    }

    fn current_kind(&self) -> TokenKind {
        self.current().kind
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn is_trivia(&self, token: &Token) -> bool {
        token.kind == TokenKind::Whitespace || (self.depth > 0 && token.kind == TokenKind::Comment)
    }

    /// Next token at or after `index` that is not formatting
    fn significant_from(&self, mut index: usize) -> &Token {
        let last = self.tokens.len().saturating_sub(1);
        while index < last && self.is_trivia(&self.tokens[index]) {
            index += 1;
        }
        &self.tokens[index.min(last)]
    }

    fn peek(&self) -> &Token {
        self.significant_from(self.pos)
    }

    fn peek_op(&self, op: &str) -> bool {
        self.peek().is(TokenKind::Op, op)
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        self.peek().is(TokenKind::Name, keyword)
    }

    fn at_op(&self, op: &str) -> bool {
        self.current().is(TokenKind::Op, op)
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        self.current().is(TokenKind::Name, keyword)
    }

    /// Consume whitespace (and comments inside brackets) as formatting nodes
    fn formatting(&mut self) -> Vec<Value> {
        let mut nodes = Vec::new();
        while self.is_trivia(self.current()) {
            let token = self.advance();
            if token.kind == TokenKind::Comment {
                nodes.push(comment(Vec::new(), &token.text));
            } else {
                nodes.push(space(&token.text));
            }
        }
        nodes
    }

    fn error_at(&self, token: &Token, message: impl Into<String>) -> RedwoodError {
        let (line, column) = line_col(self.source, token.span.start);
        RedwoodError::syntax(message, line, column)
    }

    fn unexpected(&self) -> RedwoodError {
        let token = self.current();
        let message = match token.kind {
            TokenKind::Eof => "unexpected end of input".to_string(),
            TokenKind::Newline => "unexpected end of line".to_string(),
            _ => format!("unexpected token '{}'", token.text),
        };
        self.error_at(token, message)
    }

    fn expect_op(&mut self, op: &str) -> Result<Token> {
        if self.at_op(op) {
            Ok(self.advance())
        } else {
            Err(self.unexpected())
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<Token> {
        if self.at_keyword(keyword) {
            Ok(self.advance())
        } else {
            Err(self.unexpected())
        }
    }

    fn expect_name(&mut self) -> Result<String> {
        let token = self.current();
        if token.kind == TokenKind::Name && !RESERVED.contains(&token.text.as_str()) {
            Ok(self.advance().text)
        } else {
            Err(self.unexpected())
        }
    }

    fn open(&mut self, op: &str) -> Result<()> {
        self.expect_op(op)?;
        self.depth += 1;
        Ok(())
    }

    fn close(&mut self, op: &str) -> Result<()> {
        self.expect_op(op)?;
        self.depth = self.depth.saturating_sub(1);
        Ok(())
    }

    fn can_start_expression(&self, token: &Token) -> bool {
        match token.kind {
            TokenKind::Name => token.text == "not" || !RESERVED.contains(&token.text.as_str()),
            TokenKind::Number | TokenKind::String => true,
            TokenKind::Op => matches!(
                token.text.as_str(),
                "(" | "[" | "{" | "`" | "-" | "+" | "~"
            ),
            _ => false,
        }
    }

    fn at_statement_end(&self) -> bool {
        let token = self.peek();
        matches!(
            token.kind,
            TokenKind::Newline | TokenKind::Eof | TokenKind::Comment
        ) || token.is(TokenKind::Op, ";")
    }

    fn finish_snippet(&mut self) -> Result<()> {
        while matches!(
            self.current_kind(),
            TokenKind::Whitespace | TokenKind::Newline
        ) {
            self.advance();
        }
        if self.current_kind() == TokenKind::Eof {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    // ----- lists -----

    /// Parse `item (, item)*` with comma nodes between the items
    ///
    /// Whitespace after the last element is left for the caller.
    fn comma_list(&mut self, item: ItemParser<'a>, closer: Option<&str>) -> Result<Vec<Value>> {
        let first = item(self)?;
        self.comma_list_from(first, item, closer)
    }

    fn comma_list_from(
        &mut self,
        first: Value,
        item: ItemParser<'a>,
        closer: Option<&str>,
    ) -> Result<Vec<Value>> {
        let mut items = vec![first];
        while self.peek_op(",") {
            let first_formatting = self.formatting();
            self.advance();
            let second_formatting = self.formatting();
            items.push(comma(first_formatting, second_formatting));

            let ended = match closer {
                Some(op) => self.peek_op(op),
                None => !self.can_start_expression(self.peek()),
            };
            if ended {
                break;
            }
            items.push(item(self)?);
        }
        Ok(items)
    }

    /// A comma list that becomes a tuple without parenthesis when it has commas
    fn sequence(&mut self, item: ItemParser<'a>) -> Result<Value> {
        let first = item(self)?;
        if !self.peek_op(",") {
            return Ok(first);
        }
        let items = self.comma_list_from(first, item, None)?;
        Ok(json!({
            "type": "tuple",
            "first_formatting": [],
            "second_formatting": [],
            "value": items,
            "third_formatting": [],
            "fourth_formatting": [],
            "with_parenthesis": false,
        }))
    }

    // ----- statements -----

    fn parse_file(&mut self) -> Result<Vec<Value>> {
        let mut items = Vec::new();
        self.parse_block(0, &mut items)?;
        if self.current_kind() != TokenKind::Eof {
            return Err(self.unexpected());
        }
        Ok(items)
    }

    fn parse_formatting(&mut self) -> Result<Vec<Value>> {
        let mut nodes = Vec::new();
        loop {
            let token = self.advance();
            match token.kind {
                TokenKind::Whitespace => nodes.push(space(&token.text)),
                TokenKind::Comment => nodes.push(comment(Vec::new(), &token.text)),
                TokenKind::Eof => return Ok(nodes),
                _ => return Err(self.error_at(&token, "formatting may only hold whitespace")),
            }
        }
    }

    /// Parse lines into `items` until a line dedents below `block_indent`
    fn parse_block(&mut self, block_indent: usize, items: &mut Vec<Value>) -> Result<()> {
        loop {
            match self.current_kind() {
                TokenKind::Eof => return Ok(()),
                TokenKind::Newline => {
                    let endl = self.endl(Vec::new())?;
                    items.push(endl);
                }
                TokenKind::Whitespace => {
                    // Only the first line of the input can start with whitespace
                    let token = self.advance();
                    let leading = vec![space(&token.text)];
                    match self.current_kind() {
                        TokenKind::Comment => self.comment_line(leading, items)?,
                        TokenKind::Newline => {
                            let endl = self.endl(leading)?;
                            items.push(endl);
                        }
                        TokenKind::Eof => items.extend(leading),
                        _ => return Err(self.error_at(&token, "unexpected indent")),
                    }
                }
                TokenKind::Comment => {
                    if self.line_indent < block_indent
                        && self
                            .next_code_indent()
                            .is_none_or(|indent| indent < block_indent)
                    {
                        return Ok(());
                    }
                    self.comment_line(Vec::new(), items)?;
                }
                _ => {
                    if self.line_indent < block_indent {
                        return Ok(());
                    }
                    if self.line_indent > block_indent {
                        return Err(self.error_at(self.current(), "unexpected indent"));
                    }
                    self.parse_line(items)?;
                }
            }
        }
    }

    /// Indentation of the next line holding code, skipping blank and comment lines
    fn next_code_indent(&self) -> Option<usize> {
        let mut index = self.pos;
        let mut indent = self.line_indent;
        loop {
            let token = self.tokens.get(index)?;
            match token.kind {
                TokenKind::Comment | TokenKind::Whitespace => index += 1,
                TokenKind::Newline => {
                    index += 1;
                    indent = 0;
                    if let Some(next) = self.tokens.get(index)
                        && next.kind == TokenKind::Whitespace
                    {
                        indent = next.text.chars().count();
                        index += 1;
                    }
                }
                TokenKind::Eof => return None,
                _ => return Some(indent),
            }
        }
    }

    /// Consume a newline into an endl node, taking the next line's indentation
    fn endl(&mut self, formatting: Vec<Value>) -> Result<Value> {
        let newline = self.advance();
        if newline.kind != TokenKind::Newline {
            return Err(self.error_at(&newline, "expected end of line"));
        }
        let indent = if self.current_kind() == TokenKind::Whitespace {
            self.advance().text
        } else {
            String::new()
        };
        self.line_indent = indent.chars().count();
        Ok(json!({
            "type": "endl",
            "formatting": formatting,
            "value": newline.text,
            "indent": indent,
        }))
    }

    fn comment_line(&mut self, formatting: Vec<Value>, items: &mut Vec<Value>) -> Result<()> {
        let token = self.advance();
        items.push(comment(formatting, &token.text));
        if self.current_kind() == TokenKind::Newline {
            let endl = self.endl(Vec::new())?;
            items.push(endl);
        }
        Ok(())
    }

    /// Consume the end of a logical line: trailing whitespace, comment, newline
    fn end_of_line(&mut self, items: &mut Vec<Value>) -> Result<()> {
        let formatting = self.formatting();
        match self.current_kind() {
            TokenKind::Comment => self.comment_line(formatting, items),
            TokenKind::Newline => {
                let endl = self.endl(formatting)?;
                items.push(endl);
                Ok(())
            }
            TokenKind::Eof => {
                items.extend(formatting);
                Ok(())
            }
            _ => Err(self.unexpected()),
        }
    }

    fn parse_line(&mut self, items: &mut Vec<Value>) -> Result<()> {
        let token = self.current();
        if token.is(TokenKind::Op, "@") {
            let node = self.parse_decorated()?;
            items.push(node);
            return Ok(());
        }
        if token.kind == TokenKind::Name && COMPOUND.contains(&token.text.as_str()) {
            let node = self.parse_compound()?;
            items.push(node);
            return Ok(());
        }
        self.simple_line(items)
    }

    /// One or more simple statements separated by semicolons, then end of line
    fn simple_line(&mut self, items: &mut Vec<Value>) -> Result<()> {
        loop {
            let statement = self.parse_simple_statement()?;
            items.push(statement);
            if !self.peek_op(";") {
                break;
            }
            let first_formatting = self.formatting();
            self.advance();
            let second_formatting = self.formatting();
            items.push(json!({
                "type": "semicolon",
                "first_formatting": first_formatting,
                "second_formatting": second_formatting,
            }));
            if matches!(
                self.current_kind(),
                TokenKind::Newline | TokenKind::Eof | TokenKind::Comment
            ) {
                break;
            }
        }
        self.end_of_line(items)
    }

    /// Parse the `:` and the suite of a compound statement
    ///
    /// Returns the formatting that precedes an inline body and the suite itself.
    fn suite(&mut self, statement_indent: usize) -> Result<(Vec<Value>, Vec<Value>)> {
        self.expect_op(":")?;
        let formatting = self.formatting();
        let mut value = Vec::new();

        match self.current_kind() {
            TokenKind::Comment | TokenKind::Newline => {
                if self.current_kind() == TokenKind::Comment {
                    self.comment_line(formatting, &mut value)?;
                } else {
                    let endl = self.endl(formatting)?;
                    value.push(endl);
                }
                let block_indent = self
                    .next_code_indent()
                    .filter(|indent| *indent > statement_indent)
                    .ok_or_else(|| self.error_at(self.current(), "expected an indented block"))?;
                self.parse_block(block_indent, &mut value)?;
                Ok((Vec::new(), value))
            }
            TokenKind::Eof => Err(self.unexpected()),
            _ => {
                self.simple_line(&mut value)?;
                Ok((formatting, value))
            }
        }
    }

    fn parse_compound(&mut self) -> Result<Value> {
        match self.current().text.as_str() {
            "if" => self.parse_if(),
            "while" => self.parse_while(),
            "for" => self.parse_for(),
            "try" => self.parse_try(),
            "with" => self.parse_with(),
            "def" => self.parse_funcdef(Vec::new()),
            "class" => self.parse_class(Vec::new()),
            _ => Err(self.unexpected()),
        }
    }

    fn parse_if(&mut self) -> Result<Value> {
        let indent = self.line_indent;
        let mut branches = vec![self.parse_conditional("if", indent)?];
        while self.line_indent == indent {
            if self.at_keyword("elif") {
                branches.push(self.parse_conditional("elif", indent)?);
            } else if self.at_keyword("else") {
                branches.push(self.parse_else(indent)?);
                break;
            } else {
                break;
            }
        }
        Ok(json!({"type": "ifelseblock", "value": branches}))
    }

    fn parse_conditional(&mut self, keyword: &str, indent: usize) -> Result<Value> {
        self.expect_keyword(keyword)?;
        let first_formatting = self.formatting();
        let test = self.parse_test()?;
        let second_formatting = self.formatting();
        let (third_formatting, value) = self.suite(indent)?;
        Ok(json!({
            "type": keyword,
            "first_formatting": first_formatting,
            "test": test,
            "second_formatting": second_formatting,
            "third_formatting": third_formatting,
            "value": value,
        }))
    }

    fn parse_else(&mut self, indent: usize) -> Result<Value> {
        self.expect_keyword("else")?;
        let first_formatting = self.formatting();
        let (second_formatting, value) = self.suite(indent)?;
        Ok(json!({
            "type": "else",
            "first_formatting": first_formatting,
            "second_formatting": second_formatting,
            "value": value,
        }))
    }

    /// An `else` clause continuing a loop or try statement, if present
    fn optional_else(&mut self, indent: usize) -> Result<Value> {
        if self.line_indent == indent && self.at_keyword("else") {
            self.parse_else(indent)
        } else {
            Ok(Value::Null)
        }
    }

    fn parse_while(&mut self) -> Result<Value> {
        let indent = self.line_indent;
        self.expect_keyword("while")?;
        let first_formatting = self.formatting();
        let test = self.parse_test()?;
        let second_formatting = self.formatting();
        let (third_formatting, value) = self.suite(indent)?;
        let else_clause = self.optional_else(indent)?;
        Ok(json!({
            "type": "while",
            "first_formatting": first_formatting,
            "test": test,
            "second_formatting": second_formatting,
            "third_formatting": third_formatting,
            "value": value,
            "else": else_clause,
        }))
    }

    fn parse_for(&mut self) -> Result<Value> {
        let indent = self.line_indent;
        self.expect_keyword("for")?;
        let first_formatting = self.formatting();
        let iterator = self.sequence(Parser::parse_expr)?;
        let second_formatting = self.formatting();
        self.expect_keyword("in")?;
        let third_formatting = self.formatting();
        let target = self.parse_testlist()?;
        let fourth_formatting = self.formatting();
        let (fifth_formatting, value) = self.suite(indent)?;
        let else_clause = self.optional_else(indent)?;
        Ok(json!({
            "type": "for",
            "first_formatting": first_formatting,
            "iterator": iterator,
            "second_formatting": second_formatting,
            "third_formatting": third_formatting,
            "target": target,
            "fourth_formatting": fourth_formatting,
            "fifth_formatting": fifth_formatting,
            "value": value,
            "else": else_clause,
        }))
    }

    fn parse_try(&mut self) -> Result<Value> {
        let indent = self.line_indent;
        self.expect_keyword("try")?;
        let first_formatting = self.formatting();
        let (second_formatting, value) = self.suite(indent)?;

        let mut excepts = Vec::new();
        while self.line_indent == indent && self.at_keyword("except") {
            excepts.push(self.parse_except(indent)?);
        }
        let else_clause = self.optional_else(indent)?;
        let finally_clause = if self.line_indent == indent && self.at_keyword("finally") {
            self.expect_keyword("finally")?;
            let first_formatting = self.formatting();
            let (second_formatting, value) = self.suite(indent)?;
            json!({
                "type": "finally",
                "first_formatting": first_formatting,
                "second_formatting": second_formatting,
                "value": value,
            })
        } else {
            Value::Null
        };

        if excepts.is_empty() && finally_clause.is_null() {
            return Err(self.error_at(self.current(), "expected 'except' or 'finally' block"));
        }

        Ok(json!({
            "type": "try",
            "first_formatting": first_formatting,
            "second_formatting": second_formatting,
            "value": value,
            "excepts": excepts,
            "else": else_clause,
            "finally": finally_clause,
        }))
    }

    fn parse_except(&mut self, indent: usize) -> Result<Value> {
        self.expect_keyword("except")?;
        let first_formatting = self.formatting();
        let mut exception = Value::Null;
        let mut second_formatting = Vec::new();
        let mut third_formatting = Vec::new();
        let mut target = Value::Null;
        let mut fourth_formatting = Vec::new();

        if !self.at_op(":") {
            exception = self.parse_test()?;
            if self.peek_keyword("as") {
                second_formatting = self.formatting();
                self.advance();
                third_formatting = self.formatting();
                target = self.parse_test()?;
                fourth_formatting = self.formatting();
            } else {
                second_formatting = self.formatting();
            }
        }

        let (fifth_formatting, value) = self.suite(indent)?;
        Ok(json!({
            "type": "except",
            "first_formatting": first_formatting,
            "exception": exception,
            "second_formatting": second_formatting,
            "third_formatting": third_formatting,
            "target": target,
            "fourth_formatting": fourth_formatting,
            "fifth_formatting": fifth_formatting,
            "value": value,
        }))
    }

    fn parse_with(&mut self) -> Result<Value> {
        let indent = self.line_indent;
        self.expect_keyword("with")?;
        let first_formatting = self.formatting();
        let contexts = self.comma_list(Parser::parse_with_context, None)?;
        let second_formatting = self.formatting();
        let (third_formatting, value) = self.suite(indent)?;
        Ok(json!({
            "type": "with",
            "first_formatting": first_formatting,
            "contexts": contexts,
            "second_formatting": second_formatting,
            "third_formatting": third_formatting,
            "value": value,
        }))
    }

    fn parse_with_context(&mut self) -> Result<Value> {
        let value = self.parse_test()?;
        if !self.peek_keyword("as") {
            return Ok(json!({
                "type": "with_context",
                "value": value,
                "first_formatting": [],
                "second_formatting": [],
                "as": null,
            }));
        }
        let first_formatting = self.formatting();
        self.advance();
        let second_formatting = self.formatting();
        let target = self.parse_expr()?;
        Ok(json!({
            "type": "with_context",
            "value": value,
            "first_formatting": first_formatting,
            "second_formatting": second_formatting,
            "as": target,
        }))
    }

    fn parse_decorated(&mut self) -> Result<Value> {
        let indent = self.line_indent;
        let mut decorators = Vec::new();
        while self.at_op("@") {
            self.advance();
            let value = json!({"type": "dotted_name", "value": self.dotted_parts()?});
            let call = if self.at_op("(") {
                self.parse_call(Vec::new())?
            } else {
                Value::Null
            };
            decorators.push(json!({"type": "decorator", "value": value, "call": call}));
            self.end_of_line(&mut decorators)?;
            if self.line_indent != indent {
                return Err(self.error_at(self.current(), "unexpected indent"));
            }
        }

        if self.at_keyword("def") {
            self.parse_funcdef(decorators)
        } else if self.at_keyword("class") {
            self.parse_class(decorators)
        } else {
            Err(self.unexpected())
        }
    }

    fn parse_funcdef(&mut self, decorators: Vec<Value>) -> Result<Value> {
        let indent = self.line_indent;
        self.expect_keyword("def")?;
        let first_formatting = self.formatting();
        let name = self.expect_name()?;
        let second_formatting = self.formatting();
        self.open("(")?;
        let third_formatting = self.formatting();
        let arguments = if self.at_op(")") {
            Vec::new()
        } else {
            self.comma_list(Parser::parse_def_argument, Some(")"))?
        };
        let fourth_formatting = self.formatting();
        self.close(")")?;
        let fifth_formatting = self.formatting();
        let (sixth_formatting, value) = self.suite(indent)?;
        Ok(json!({
            "type": "funcdef",
            "decorators": decorators,
            "first_formatting": first_formatting,
            "name": name,
            "second_formatting": second_formatting,
            "third_formatting": third_formatting,
            "arguments": arguments,
            "fourth_formatting": fourth_formatting,
            "fifth_formatting": fifth_formatting,
            "sixth_formatting": sixth_formatting,
            "value": value,
        }))
    }

    fn parse_def_argument(&mut self) -> Result<Value> {
        for (op, kind) in [("*", "list_argument"), ("**", "dict_argument")] {
            if self.at_op(op) {
                self.advance();
                let formatting = self.formatting();
                let value = name(&self.expect_name()?);
                return Ok(json!({"type": kind, "formatting": formatting, "value": value}));
            }
        }

        let argument = self.expect_name()?;
        if !self.peek_op("=") {
            return Ok(json!({
                "type": "def_argument",
                "name": argument,
                "first_formatting": [],
                "second_formatting": [],
                "value": null,
            }));
        }
        let first_formatting = self.formatting();
        self.advance();
        let second_formatting = self.formatting();
        let value = self.parse_test()?;
        Ok(json!({
            "type": "def_argument",
            "name": argument,
            "first_formatting": first_formatting,
            "second_formatting": second_formatting,
            "value": value,
        }))
    }

    fn parse_class(&mut self, decorators: Vec<Value>) -> Result<Value> {
        let indent = self.line_indent;
        self.expect_keyword("class")?;
        let first_formatting = self.formatting();
        let name = self.expect_name()?;
        let second_formatting = self.formatting();

        let mut third_formatting = Vec::new();
        let mut inherit_from = Vec::new();
        let mut fourth_formatting = Vec::new();
        let mut fifth_formatting = Vec::new();
        let parenthesis = self.at_op("(");
        if parenthesis {
            self.open("(")?;
            third_formatting = self.formatting();
            if !self.at_op(")") {
                inherit_from = self.comma_list(Parser::parse_test, Some(")"))?;
            }
            fourth_formatting = self.formatting();
            self.close(")")?;
            fifth_formatting = self.formatting();
        }

        let (sixth_formatting, value) = self.suite(indent)?;
        Ok(json!({
            "type": "class",
            "decorators": decorators,
            "first_formatting": first_formatting,
            "name": name,
            "second_formatting": second_formatting,
            "third_formatting": third_formatting,
            "inherit_from": inherit_from,
            "fourth_formatting": fourth_formatting,
            "fifth_formatting": fifth_formatting,
            "sixth_formatting": sixth_formatting,
            "value": value,
            "parenthesis": parenthesis,
        }))
    }

    fn parse_simple_statement(&mut self) -> Result<Value> {
        let token = self.current().clone();
        if token.kind == TokenKind::Name {
            match token.text.as_str() {
                "pass" | "break" | "continue" => {
                    self.advance();
                    return Ok(json!({"type": token.text.clone()}));
                }
                "return" | "raise" => {
                    self.advance();
                    if self.at_statement_end() {
                        return Ok(json!({
                            "type": token.text.clone(),
                            "formatting": [],
                            "value": null,
                        }));
                    }
                    let formatting = self.formatting();
                    let value = self.parse_testlist()?;
                    return Ok(json!({
                        "type": token.text.clone(),
                        "formatting": formatting,
                        "value": value,
                    }));
                }
                "import" => return self.parse_import(),
                "from" => return self.parse_from_import(),
                "yield" => return self.parse_yield(),
                "assert" => return self.parse_assert(),
                "del" => {
                    self.advance();
                    let formatting = self.formatting();
                    let value = self.parse_testlist()?;
                    return Ok(json!({"type": "del", "formatting": formatting, "value": value}));
                }
                "global" | "nonlocal" => {
                    self.advance();
                    let formatting = self.formatting();
                    let value = self.comma_list(Parser::parse_name, None)?;
                    return Ok(json!({
                        "type": token.text.clone(),
                        "formatting": formatting,
                        "value": value,
                    }));
                }
                text if RESERVED.contains(&text) && text != "not" => {
                    return Err(self.error_at(&token, format!("unsupported statement '{text}'")));
                }
                _ => {}
            }
        }
        self.parse_expression_statement()
    }

    fn parse_expression_statement(&mut self) -> Result<Value> {
        let target = self.parse_testlist()?;
        let operator = self.peek();
        if operator.kind != TokenKind::Op || !ASSIGN_OPS.contains(&operator.text.as_str()) {
            return Ok(target);
        }

        let first_formatting = self.formatting();
        let operator = self.advance().text;
        let second_formatting = self.formatting();
        let value = if self.at_keyword("yield") {
            self.parse_yield()?
        } else {
            self.parse_expression_statement()?
        };
        let operator = operator.strip_suffix('=').unwrap_or_default();
        Ok(json!({
            "type": "assignment",
            "target": target,
            "first_formatting": first_formatting,
            "operator": operator,
            "second_formatting": second_formatting,
            "value": value,
        }))
    }

    /// `yield`, `yield value` or `yield from value`
    fn parse_yield(&mut self) -> Result<Value> {
        self.expect_keyword("yield")?;
        if self.peek_keyword("from") {
            let first_formatting = self.formatting();
            self.advance();
            let second_formatting = self.formatting();
            let value = self.parse_test()?;
            return Ok(json!({
                "type": "yield_from",
                "first_formatting": first_formatting,
                "second_formatting": second_formatting,
                "value": value,
            }));
        }
        if self.at_statement_end() || self.peek_op(")") {
            return Ok(json!({"type": "yield", "formatting": [], "value": null}));
        }
        let formatting = self.formatting();
        let value = self.parse_testlist()?;
        Ok(json!({"type": "yield", "formatting": formatting, "value": value}))
    }

    fn parse_assert(&mut self) -> Result<Value> {
        self.expect_keyword("assert")?;
        let first_formatting = self.formatting();
        let value = self.parse_test()?;
        let (second_formatting, third_formatting, message) = if self.peek_op(",") {
            let second_formatting = self.formatting();
            self.advance();
            let third_formatting = self.formatting();
            (second_formatting, third_formatting, self.parse_test()?)
        } else {
            (Vec::new(), Vec::new(), Value::Null)
        };
        Ok(json!({
            "type": "assert",
            "first_formatting": first_formatting,
            "value": value,
            "second_formatting": second_formatting,
            "third_formatting": third_formatting,
            "message": message,
        }))
    }

    fn parse_name(&mut self) -> Result<Value> {
        Ok(name(&self.expect_name()?))
    }

    fn parse_import(&mut self) -> Result<Value> {
        self.expect_keyword("import")?;
        let first_formatting = self.formatting();
        let value = self.comma_list(Parser::parse_dotted_as_name, None)?;
        Ok(json!({
            "type": "import",
            "first_formatting": first_formatting,
            "value": value,
        }))
    }

    fn parse_dotted_as_name(&mut self) -> Result<Value> {
        let value = self.dotted_parts()?;
        let (first_formatting, second_formatting, target) = self.optional_as_name()?;
        Ok(json!({
            "type": "dotted_as_name",
            "value": value,
            "first_formatting": first_formatting,
            "second_formatting": second_formatting,
            "target": target,
        }))
    }

    fn parse_from_import(&mut self) -> Result<Value> {
        self.expect_keyword("from")?;
        let first_formatting = self.formatting();

        let mut value = Vec::new();
        while self.at_op(".") {
            self.advance();
            let second_formatting = self.formatting();
            value.push(dot(Vec::new(), second_formatting));
        }
        if !self.at_keyword("import") {
            value.extend(self.dotted_parts()?);
        }

        let second_formatting = self.formatting();
        self.expect_keyword("import")?;
        let third_formatting = self.formatting();
        let targets = if self.at_op("*") {
            self.advance();
            vec![json!({
                "type": "name_as_name",
                "value": "*",
                "first_formatting": [],
                "second_formatting": [],
                "target": "",
            })]
        } else {
            self.comma_list(Parser::parse_name_as_name, None)?
        };

        Ok(json!({
            "type": "from_import",
            "first_formatting": first_formatting,
            "value": value,
            "second_formatting": second_formatting,
            "third_formatting": third_formatting,
            "targets": targets,
        }))
    }

    fn parse_name_as_name(&mut self) -> Result<Value> {
        let value = self.expect_name()?;
        let (first_formatting, second_formatting, target) = self.optional_as_name()?;
        Ok(json!({
            "type": "name_as_name",
            "value": value,
            "first_formatting": first_formatting,
            "second_formatting": second_formatting,
            "target": target,
        }))
    }

    fn optional_as_name(&mut self) -> Result<(Vec<Value>, Vec<Value>, String)> {
        if !self.peek_keyword("as") {
            return Ok((Vec::new(), Vec::new(), String::new()));
        }
        let first_formatting = self.formatting();
        self.advance();
        let second_formatting = self.formatting();
        let target = self.expect_name()?;
        Ok((first_formatting, second_formatting, target))
    }

    /// `name (. name)*` as a flat list of name and dot nodes
    fn dotted_parts(&mut self) -> Result<Vec<Value>> {
        let mut parts = vec![name(&self.expect_name()?)];
        while self.peek_op(".") {
            let first_formatting = self.formatting();
            self.advance();
            let second_formatting = self.formatting();
            parts.push(dot(first_formatting, second_formatting));
            parts.push(name(&self.expect_name()?));
        }
        Ok(parts)
    }

    /// Elements of a dotted list: a chain of atom trailers or a single atom
    fn parse_dotted_snippet(&mut self) -> Result<Vec<Value>> {
        let node = self.parse_atom_trailers()?;
        if node["type"] == "atomtrailers"
            && let Value::Array(parts) = &node["value"]
        {
            return Ok(parts.clone());
        }
        Ok(vec![node])
    }

    // ----- expressions -----

    fn parse_testlist(&mut self) -> Result<Value> {
        self.sequence(Parser::parse_test)
    }

    fn parse_test(&mut self) -> Result<Value> {
        self.parse_or_test()
    }

    fn binary(
        &mut self,
        kind: &str,
        ops: &[&str],
        operand: ItemParser<'a>,
        rest: ItemParser<'a>,
    ) -> Result<Value> {
        let first = operand(self)?;
        let next = self.peek();
        let matches = matches!(next.kind, TokenKind::Op | TokenKind::Name)
            && ops.contains(&next.text.as_str());
        if !matches {
            return Ok(first);
        }

        let first_formatting = self.formatting();
        let value = self.advance().text;
        let second_formatting = self.formatting();
        let second = rest(self)?;
        Ok(json!({
            "type": kind,
            "first": first,
            "first_formatting": first_formatting,
            "value": value,
            "second_formatting": second_formatting,
            "second": second,
        }))
    }

    fn parse_or_test(&mut self) -> Result<Value> {
        self.binary(
            "boolean_operator",
            &["or"],
            Parser::parse_and_test,
            Parser::parse_or_test,
        )
    }

    fn parse_and_test(&mut self) -> Result<Value> {
        self.binary(
            "boolean_operator",
            &["and"],
            Parser::parse_not_test,
            Parser::parse_and_test,
        )
    }

    fn parse_not_test(&mut self) -> Result<Value> {
        if !self.at_keyword("not") {
            return self.parse_comparison();
        }
        self.advance();
        let formatting = self.formatting();
        let target = self.parse_not_test()?;
        Ok(json!({
            "type": "unitary_operator",
            "value": "not",
            "formatting": formatting,
            "target": target,
        }))
    }

    fn parse_comparison(&mut self) -> Result<Value> {
        let first = self.parse_expr()?;
        let next = self.peek().clone();
        let is_operator = (next.kind == TokenKind::Op
            && COMPARISON_OPS.contains(&next.text.as_str()))
            || (next.kind == TokenKind::Name && matches!(next.text.as_str(), "in" | "is" | "not"));
        if !is_operator {
            return Ok(first);
        }

        let first_formatting = self.formatting();
        let mut value = self.advance().text;
        if value == "not" || (value == "is" && self.peek_keyword("not")) {
            let second_word = if value == "not" { "in" } else { "not" };
            while self.current_kind() == TokenKind::Whitespace {
                value.push_str(&self.advance().text);
            }
            value.push_str(&self.expect_keyword(second_word)?.text);
        }
        let second_formatting = self.formatting();
        let second = self.parse_comparison()?;
        Ok(json!({
            "type": "comparison",
            "first": first,
            "first_formatting": first_formatting,
            "value": value,
            "second_formatting": second_formatting,
            "second": second,
        }))
    }

    fn parse_expr(&mut self) -> Result<Value> {
        self.binary("binary_operator", &["|"], Parser::parse_xor, Parser::parse_expr)
    }

    fn parse_xor(&mut self) -> Result<Value> {
        self.binary("binary_operator", &["^"], Parser::parse_and, Parser::parse_xor)
    }

    fn parse_and(&mut self) -> Result<Value> {
        self.binary("binary_operator", &["&"], Parser::parse_shift, Parser::parse_and)
    }

    fn parse_shift(&mut self) -> Result<Value> {
        self.binary(
            "binary_operator",
            &["<<", ">>"],
            Parser::parse_arith,
            Parser::parse_shift,
        )
    }

    fn parse_arith(&mut self) -> Result<Value> {
        self.binary(
            "binary_operator",
            &["+", "-"],
            Parser::parse_term,
            Parser::parse_arith,
        )
    }

    fn parse_term(&mut self) -> Result<Value> {
        self.binary(
            "binary_operator",
            &["*", "/", "%", "//"],
            Parser::parse_factor,
            Parser::parse_term,
        )
    }

    fn parse_factor(&mut self) -> Result<Value> {
        let token = self.current();
        if token.kind == TokenKind::Op && matches!(token.text.as_str(), "+" | "-" | "~") {
            let value = self.advance().text;
            let formatting = self.formatting();
            let target = self.parse_factor()?;
            return Ok(json!({
                "type": "unitary_operator",
                "value": value,
                "formatting": formatting,
                "target": target,
            }));
        }
        self.parse_power()
    }

    fn parse_power(&mut self) -> Result<Value> {
        self.binary(
            "binary_operator",
            &["**"],
            Parser::parse_atom_trailers,
            Parser::parse_factor,
        )
    }

    fn parse_atom_trailers(&mut self) -> Result<Value> {
        let mut parts = vec![self.parse_atom()?];
        loop {
            if self.peek_op(".") {
                let first_formatting = self.formatting();
                self.advance();
                let second_formatting = self.formatting();
                parts.push(dot(first_formatting, second_formatting));
                parts.push(name(&self.expect_name()?));
            } else if self.peek_op("(") {
                let first_formatting = self.formatting();
                parts.push(self.parse_call(first_formatting)?);
            } else if self.peek_op("[") {
                let first_formatting = self.formatting();
                parts.push(self.parse_getitem(first_formatting)?);
            } else {
                break;
            }
        }

        if parts.len() == 1 {
            return Ok(parts.remove(0));
        }
        Ok(json!({"type": "atomtrailers", "value": parts}))
    }

    fn parse_call(&mut self, first_formatting: Vec<Value>) -> Result<Value> {
        self.open("(")?;
        let second_formatting = self.formatting();
        let value = if self.at_op(")") {
            Vec::new()
        } else {
            self.comma_list(Parser::parse_call_argument, Some(")"))?
        };
        let third_formatting = self.formatting();
        self.close(")")?;
        Ok(json!({
            "type": "call",
            "first_formatting": first_formatting,
            "second_formatting": second_formatting,
            "value": value,
            "third_formatting": third_formatting,
            "fourth_formatting": [],
        }))
    }

    fn parse_call_argument(&mut self) -> Result<Value> {
        for (op, kind) in [("*", "list_argument"), ("**", "dict_argument")] {
            if self.at_op(op) {
                self.advance();
                let formatting = self.formatting();
                let value = self.parse_test()?;
                return Ok(json!({"type": kind, "formatting": formatting, "value": value}));
            }
        }

        let keyword = self.current().kind == TokenKind::Name
            && self
                .significant_from(self.pos + 1)
                .is(TokenKind::Op, "=");
        if keyword {
            let target = name(&self.expect_name()?);
            let first_formatting = self.formatting();
            self.expect_op("=")?;
            let second_formatting = self.formatting();
            let value = self.parse_test()?;
            return Ok(json!({
                "type": "call_argument",
                "target": target,
                "first_formatting": first_formatting,
                "second_formatting": second_formatting,
                "value": value,
            }));
        }

        let mut value = self.parse_test()?;
        if self.peek_keyword("for") {
            let generators = self.comprehension_loops()?;
            value = json!({
                "type": "generator_comprehension",
                "first_formatting": [],
                "second_formatting": [],
                "result": value,
                "generators": generators,
                "third_formatting": [],
                "fourth_formatting": [],
                "with_parenthesis": false,
            });
        }
        Ok(json!({
            "type": "call_argument",
            "target": null,
            "first_formatting": [],
            "second_formatting": [],
            "value": value,
        }))
    }

    fn parse_getitem(&mut self, first_formatting: Vec<Value>) -> Result<Value> {
        self.open("[")?;
        let second_formatting = self.formatting();
        let value = self.parse_testlist()?;
        let third_formatting = self.formatting();
        self.close("]")?;
        Ok(json!({
            "type": "getitem",
            "first_formatting": first_formatting,
            "second_formatting": second_formatting,
            "value": value,
            "third_formatting": third_formatting,
            "fourth_formatting": [],
        }))
    }

    fn parse_dictitem(&mut self) -> Result<Value> {
        let key = self.parse_test()?;
        self.dictitem_from(key)
    }

    fn dictitem_from(&mut self, key: Value) -> Result<Value> {
        let first_formatting = self.formatting();
        self.expect_op(":")?;
        let second_formatting = self.formatting();
        let value = self.parse_test()?;
        Ok(json!({
            "type": "dictitem",
            "key": key,
            "first_formatting": first_formatting,
            "second_formatting": second_formatting,
            "value": value,
        }))
    }

    /// `for target in iterator (if condition)*` clauses of a comprehension
    fn comprehension_loops(&mut self) -> Result<Vec<Value>> {
        let mut loops = Vec::new();
        while self.peek_keyword("for") {
            let first_formatting = self.formatting();
            self.advance();
            let second_formatting = self.formatting();
            let target = self.sequence(Parser::parse_expr)?;
            let third_formatting = self.formatting();
            self.expect_keyword("in")?;
            let fourth_formatting = self.formatting();
            let iterator = self.parse_or_test()?;

            let mut ifs = Vec::new();
            while self.peek_keyword("if") {
                let first_formatting = self.formatting();
                self.advance();
                let second_formatting = self.formatting();
                let value = self.parse_or_test()?;
                ifs.push(json!({
                    "type": "comprehension_if",
                    "first_formatting": first_formatting,
                    "second_formatting": second_formatting,
                    "value": value,
                }));
            }

            loops.push(json!({
                "type": "comprehension_loop",
                "first_formatting": first_formatting,
                "second_formatting": second_formatting,
                "target": target,
                "third_formatting": third_formatting,
                "fourth_formatting": fourth_formatting,
                "iterator": iterator,
                "ifs": ifs,
            }));
        }
        Ok(loops)
    }

    /// Finish a bracketed comprehension whose result is already parsed
    fn comprehension(
        &mut self,
        kind: &str,
        result: Value,
        second_formatting: Vec<Value>,
        closer: &str,
    ) -> Result<Value> {
        let generators = self.comprehension_loops()?;
        let third_formatting = self.formatting();
        self.close(closer)?;
        Ok(json!({
            "type": kind,
            "first_formatting": [],
            "second_formatting": second_formatting,
            "result": result,
            "generators": generators,
            "third_formatting": third_formatting,
            "fourth_formatting": [],
        }))
    }

    fn parse_atom(&mut self) -> Result<Value> {
        let token = self.current().clone();
        match token.kind {
            TokenKind::Name if !RESERVED.contains(&token.text.as_str()) => {
                self.advance();
                Ok(name(&token.text))
            }
            TokenKind::Number => {
                self.advance();
                let kind = if is_integer_literal(&token.text) {
                    "int"
                } else {
                    "float"
                };
                Ok(json!({"type": kind, "value": token.text}))
            }
            TokenKind::String => {
                self.advance();
                let first = json!({"type": "string", "value": token.text});
                if self.peek().kind != TokenKind::String {
                    return Ok(first);
                }
                let mut value = vec![first];
                while self.peek().kind == TokenKind::String {
                    value.extend(self.formatting());
                    value.push(json!({"type": "string", "value": self.advance().text}));
                }
                Ok(json!({"type": "string_chain", "value": value}))
            }
            TokenKind::Op if token.text == "(" => self.parse_parenthesized(),
            TokenKind::Op if token.text == "[" => {
                self.open("[")?;
                let second_formatting = self.formatting();
                if self.at_op("]") {
                    self.close("]")?;
                    return Ok(collection("list", Vec::new(), second_formatting, Vec::new()));
                }
                let first = self.parse_test()?;
                if self.peek_keyword("for") {
                    return self.comprehension("list_comprehension", first, second_formatting, "]");
                }
                let value = self.comma_list_from(first, Parser::parse_test, Some("]"))?;
                let third_formatting = self.formatting();
                self.close("]")?;
                Ok(collection("list", value, second_formatting, third_formatting))
            }
            TokenKind::Op if token.text == "{" => {
                self.open("{")?;
                let second_formatting = self.formatting();
                if self.at_op("}") {
                    self.close("}")?;
                    return Ok(collection("dict", Vec::new(), second_formatting, Vec::new()));
                }
                let first = self.parse_test()?;
                let (kind, first) = if self.peek_op(":") {
                    ("dict", self.dictitem_from(first)?)
                } else {
                    ("set", first)
                };
                if self.peek_keyword("for") {
                    let kind = format!("{kind}_comprehension");
                    return self.comprehension(&kind, first, second_formatting, "}");
                }
                let item: ItemParser<'a> = if kind == "dict" {
                    Parser::parse_dictitem
                } else {
                    Parser::parse_test
                };
                let value = self.comma_list_from(first, item, Some("}"))?;
                let third_formatting = self.formatting();
                self.close("}")?;
                Ok(collection(kind, value, second_formatting, third_formatting))
            }
            TokenKind::Op if token.text == "`" => {
                self.advance();
                self.depth += 1;
                let first_formatting = self.formatting();
                let value = self.comma_list(Parser::parse_test, Some("`"))?;
                let second_formatting = self.formatting();
                self.close("`")?;
                Ok(json!({
                    "type": "repr",
                    "first_formatting": first_formatting,
                    "value": value,
                    "second_formatting": second_formatting,
                }))
            }
            _ => Err(self.unexpected()),
        }
    }

    fn parse_parenthesized(&mut self) -> Result<Value> {
        self.open("(")?;
        let second_formatting = self.formatting();

        let tuple = |value: Vec<Value>,
                     second_formatting: Vec<Value>,
                     third_formatting: Vec<Value>| {
            json!({
                "type": "tuple",
                "first_formatting": [],
                "second_formatting": second_formatting,
                "value": value,
                "third_formatting": third_formatting,
                "fourth_formatting": [],
                "with_parenthesis": true,
            })
        };

        if self.at_op(")") {
            self.close(")")?;
            return Ok(tuple(Vec::new(), second_formatting, Vec::new()));
        }

        let first = if self.at_keyword("yield") {
            self.parse_yield()?
        } else {
            self.parse_test()?
        };
        if self.peek_keyword("for") {
            let mut generator =
                self.comprehension("generator_comprehension", first, second_formatting, ")")?;
            generator["with_parenthesis"] = Value::Bool(true);
            return Ok(generator);
        }
        if self.peek_op(",") {
            let value = self.comma_list_from(first, Parser::parse_test, Some(")"))?;
            let third_formatting = self.formatting();
            self.close(")")?;
            return Ok(tuple(value, second_formatting, third_formatting));
        }

        let third_formatting = self.formatting();
        self.close(")")?;
        Ok(json!({
            "type": "associative_parenthesis",
            "first_formatting": [],
            "second_formatting": second_formatting,
            "value": first,
            "third_formatting": third_formatting,
            "fourth_formatting": [],
        }))
    }
}
