//! Trivia-preserving tokenizer
//!
//! Every byte of the input ends up in exactly one token, so concatenating the
//! token texts reproduces the source. Whitespace, comments and newlines are
//! tokens of their own. Inside brackets, and after a backslash continuation,
//! newlines do not terminate a logical line and are folded into whitespace.

use std::ops::Range;

/// Simple span representing a byte range in the source
pub type Span = Range<usize>;

/// Token categories produced by the lexer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Identifiers and keywords
    Name,
    Number,
    String,
    /// Operators and punctuation
    Op,
    /// Spaces, tabs, and newlines that do not end a logical line
    Whitespace,
    Comment,
    /// A newline that ends a logical line
    Newline,
    Eof,
}

/// A lexer error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexerError {
    pub message: String,
    pub span: Span,
}

impl LexerError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

/// A token with its kind and span
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            text: text.into(),
            span,
        }
    }

    pub fn is(&self, kind: TokenKind, text: &str) -> bool {
        self.kind == kind && self.text == text
    }
}

/// Result returned by the lexer
pub type LexResult = (Vec<Token>, Vec<LexerError>);

/// Operators, longest first so that greedy matching works
const OPERATORS: &[&str] = &[
    "**=", "//=", ">>=", "<<=", "...", "**", "//", "<<", ">>", "<=", ">=", "==", "!=", "<>",
    "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "->", "+", "-", "*", "/", "%", "&", "|",
    "^", "~", "<", ">", "(", ")", "[", "]", "{", "}", ",", ":", ".", ";", "@", "=", "`",
];

const STRING_PREFIXES: &[&str] = &[
    "r", "u", "b", "f", "br", "rb", "ur", "fr", "rf", "R", "U", "B", "F", "BR", "RB", "Br",
    "bR", "Rb", "rB", "UR", "Ur", "uR", "FR", "Fr", "fR", "RF", "Rf", "rF",
];

/// Lex input preserving all trivia
pub fn lex_with_trivia(input: &str) -> LexResult {
    let mut tokens: Vec<Token> = Vec::new();
    let mut errors = Vec::new();

    let len = input.len();
    let mut i = 0usize;
    let mut depth = 0usize;

    while i < len {
        let Some((current, size)) = next_char(input, i) else {
            break;
        };
        let start = i;

        match current {
            '\n' | '\r' => {
                let mut end = i + size;
                if current == '\r'
                    && let Some(('\n', nl_size)) = next_char(input, end)
                {
                    end += nl_size;
                }
                if depth > 0 {
                    push_whitespace(&mut tokens, input, start, end);
                } else {
                    tokens.push(Token::new(
                        TokenKind::Newline,
                        &input[start..end],
                        start..end,
                    ));
                }
                i = end;
            }

            // Line continuation
            '\\' => {
                let mut end = i + size;
                match next_char(input, end) {
                    Some(('\n', nl_size)) => end += nl_size,
                    Some(('\r', cr_size)) => {
                        end += cr_size;
                        if let Some(('\n', nl_size)) = next_char(input, end) {
                            end += nl_size;
                        }
                    }
                    _ => {
                        errors.push(LexerError::new(
                            "unexpected character after line continuation",
                            start..end,
                        ));
                    }
                }
                push_whitespace(&mut tokens, input, start, end);
                i = end;
            }

            c if c == ' ' || c == '\t' || c == '\x0c' => {
                let mut end = i + size;
                while let Some((next_ch, next_size)) = next_char(input, end) {
                    if next_ch == ' ' || next_ch == '\t' || next_ch == '\x0c' {
                        end += next_size;
                    } else {
                        break;
                    }
                }
                push_whitespace(&mut tokens, input, start, end);
                i = end;
            }

            '#' => {
                let end = input[start..]
                    .find(['\n', '\r'])
                    .map_or(len, |offset| start + offset);
                tokens.push(Token::new(
                    TokenKind::Comment,
                    &input[start..end],
                    start..end,
                ));
                i = end;
            }

            '"' | '\'' => {
                let (end, error) = lex_string(input, start, start);
                if let Some(err) = error {
                    errors.push(err);
                }
                tokens.push(Token::new(TokenKind::String, &input[start..end], start..end));
                i = end;
            }

            c if c.is_ascii_digit() => {
                let end = lex_number(input, start);
                tokens.push(Token::new(TokenKind::Number, &input[start..end], start..end));
                i = end;
            }

            '.' if next_char(input, i + size).is_some_and(|(c, _)| c.is_ascii_digit()) => {
                let end = lex_number(input, start);
                tokens.push(Token::new(TokenKind::Number, &input[start..end], start..end));
                i = end;
            }

            c if is_identifier_start(c) => {
                let mut end = i + size;
                while let Some((next_ch, next_size)) = next_char(input, end) {
                    if is_identifier_continue(next_ch) {
                        end += next_size;
                    } else {
                        break;
                    }
                }

                let word = &input[start..end];
                let quote_follows = matches!(next_char(input, end), Some(('"' | '\'', _)));
                if quote_follows && STRING_PREFIXES.contains(&word) {
                    let (string_end, error) = lex_string(input, start, end);
                    if let Some(err) = error {
                        errors.push(err);
                    }
                    tokens.push(Token::new(
                        TokenKind::String,
                        &input[start..string_end],
                        start..string_end,
                    ));
                    i = string_end;
                } else {
                    tokens.push(Token::new(TokenKind::Name, word, start..end));
                    i = end;
                }
            }

            _ => {
                let rest = &input[start..];
                if let Some(op) = OPERATORS.iter().find(|op| rest.starts_with(**op)) {
                    let end = start + op.len();
                    match *op {
                        "(" | "[" | "{" => depth += 1,
                        ")" | "]" | "}" => depth = depth.saturating_sub(1),
                        _ => {}
                    }
                    tokens.push(Token::new(TokenKind::Op, *op, start..end));
                    i = end;
                } else {
                    errors.push(LexerError::new(
                        format!("unexpected character '{current}'"),
                        start..start + size,
                    ));
                    i += size;
                }
            }
        }
    }

    tokens.push(Token::new(TokenKind::Eof, "", len..len));
    (tokens, errors)
}

/// Append whitespace, merging with a preceding whitespace token
fn push_whitespace(tokens: &mut Vec<Token>, input: &str, start: usize, end: usize) {
    if let Some(last) = tokens.last_mut()
        && last.kind == TokenKind::Whitespace
        && last.span.end == start
    {
        last.text.push_str(&input[start..end]);
        last.span.end = end;
        return;
    }
    tokens.push(Token::new(TokenKind::Whitespace, &input[start..end], start..end));
}

/// Lex a string literal whose quote starts at `quote_start`
fn lex_string(input: &str, start: usize, quote_start: usize) -> (usize, Option<LexerError>) {
    let rest = &input[quote_start..];
    let quote = if rest.starts_with("\"\"\"") {
        "\"\"\""
    } else if rest.starts_with("'''") {
        "'''"
    } else if rest.starts_with('"') {
        "\""
    } else {
        "'"
    };
    let triple = quote.len() == 3;

    let mut i = quote_start + quote.len();
    while let Some((c, size)) = next_char(input, i) {
        if c == '\\' {
            i += size;
            if let Some((_, escaped)) = next_char(input, i) {
                i += escaped;
            }
            continue;
        }
        if input[i..].starts_with(quote) {
            return (i + quote.len(), None);
        }
        if !triple && (c == '\n' || c == '\r') {
            break;
        }
        i += size;
    }

    (
        i,
        Some(LexerError::new("unterminated string literal", start..i)),
    )
}

fn lex_number(input: &str, start: usize) -> usize {
    let bytes = input.as_bytes();
    let mut i = start;

    if bytes[i] == b'0' && matches!(bytes.get(i + 1), Some(b'x' | b'X' | b'o' | b'O' | b'b' | b'B')) {
        i += 2;
        while i < bytes.len() && (bytes[i].is_ascii_hexdigit() || bytes[i] == b'_') {
            i += 1;
        }
    } else {
        while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'_') {
            i += 1;
        }
        if i < bytes.len() && bytes[i] == b'.' {
            i += 1;
            while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'_') {
                i += 1;
            }
        }
        if i < bytes.len() && matches!(bytes[i], b'e' | b'E') {
            let mut j = i + 1;
            if j < bytes.len() && matches!(bytes[j], b'+' | b'-') {
                j += 1;
            }
            if j < bytes.len() && bytes[j].is_ascii_digit() {
                i = j;
                while i < bytes.len() && bytes[i].is_ascii_digit() {
                    i += 1;
                }
            }
        }
    }

    if i < bytes.len() && matches!(bytes[i], b'j' | b'J' | b'l' | b'L') {
        i += 1;
    }
    i
}

fn is_identifier_start(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}

fn is_identifier_continue(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

fn next_char(input: &str, index: usize) -> Option<(char, usize)> {
    input[index..].chars().next().map(|c| (c, c.len_utf8()))
}

/// Convert a byte offset into a 1-based (line, column) pair
pub fn line_col(input: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(input.len());
    let before = &input[..offset];
    let line = before.matches('\n').count() + 1;
    let column = before
        .rfind('\n')
        .map_or(before.chars().count(), |nl| before[nl + 1..].chars().count())
        + 1;
    (line, column)
}

/// Whether a number literal is an integer (as opposed to a float)
pub fn is_integer_literal(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    if lower.starts_with("0x") || lower.starts_with("0o") || lower.starts_with("0b") {
        return !lower.ends_with('j');
    }
    !lower.contains(['.', 'e', 'j'])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<(TokenKind, String)> {
        let (tokens, errors) = lex_with_trivia(input);
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        tokens.into_iter().map(|t| (t.kind, t.text)).collect()
    }

    #[test]
    fn test_lossless() {
        let inputs = [
            "a = 1\n",
            "def f(a, b=2):\n    return a  # done\n",
            "x = [1,\n     2]\n",
            "s = r'raw' + \"\"\"multi\nline\"\"\"\n",
            "a = 1 + \\\n    2\r\n",
        ];
        for input in inputs {
            let (tokens, errors) = lex_with_trivia(input);
            assert!(errors.is_empty());
            let text: String = tokens.iter().map(|t| t.text.as_str()).collect();
            assert_eq!(text, input);
        }
    }

    #[test]
    fn test_basic_tokens() {
        assert_eq!(
            kinds("z +  42"),
            vec![
                (TokenKind::Name, "z".to_string()),
                (TokenKind::Whitespace, " ".to_string()),
                (TokenKind::Op, "+".to_string()),
                (TokenKind::Whitespace, "  ".to_string()),
                (TokenKind::Number, "42".to_string()),
                (TokenKind::Eof, String::new()),
            ]
        );
    }

    #[test]
    fn test_newline_in_brackets_is_whitespace() {
        let tokens = kinds("[1,\n 2]");
        assert!(tokens.contains(&(TokenKind::Whitespace, "\n ".to_string())));
        assert!(!tokens.iter().any(|(kind, _)| *kind == TokenKind::Newline));
    }

    #[test]
    fn test_comment_stops_at_newline() {
        let tokens = kinds("# hello\na");
        assert_eq!(tokens[0], (TokenKind::Comment, "# hello".to_string()));
        assert_eq!(tokens[1], (TokenKind::Newline, "\n".to_string()));
    }

    #[test]
    fn test_string_prefix() {
        let tokens = kinds("b'x' rb\"y\"");
        assert_eq!(tokens[0], (TokenKind::String, "b'x'".to_string()));
        assert_eq!(tokens[2], (TokenKind::String, "rb\"y\"".to_string()));
    }

    #[test]
    fn test_numbers() {
        assert_eq!(kinds("3.14")[0], (TokenKind::Number, "3.14".to_string()));
        assert_eq!(kinds("1e-3")[0], (TokenKind::Number, "1e-3".to_string()));
        assert_eq!(kinds("0xff")[0], (TokenKind::Number, "0xff".to_string()));
        assert!(is_integer_literal("42"));
        assert!(is_integer_literal("0xff"));
        assert!(!is_integer_literal("3.14"));
        assert!(!is_integer_literal("1e3"));
    }

    #[test]
    fn test_unterminated_string() {
        let (_, errors) = lex_with_trivia("'abc\n");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("unterminated"));
    }

    #[test]
    fn test_line_col() {
        assert_eq!(line_col("a\nbc", 3), (2, 2));
        assert_eq!(line_col("abc", 0), (1, 1));
    }
}
