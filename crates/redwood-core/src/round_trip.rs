//! Round-trip validation
//!
//! Checks the lossless contract of the parser and renderer on a given source:
//! 1. `render(parse(source))` reproduces `source` byte for byte
//! 2. re-parsing the rendered text yields a structurally equal FST
//!
//! # Example
//!
//! ```rust,ignore
//! use redwood_core::round_trip::RoundTripValidator;
//!
//! let result = RoundTripValidator::new().validate("a = 1\n")?;
//! assert!(result.is_valid());
//! ```

use serde_json::Value;
use similar::TextDiff;
use tracing::debug;

use crate::parser::parse;
use crate::render::render;
use crate::result::Result;

/// Result of round-trip validation
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    /// Original source code
    pub original: String,
    /// Source rendered back from the parsed tree
    pub rendered: String,
    /// Differences found, in discovery order
    pub differences: Vec<Difference>,
}

impl ValidationResult {
    /// Whether the round trip was lossless
    pub fn is_valid(&self) -> bool {
        self.differences.is_empty()
    }

    /// One line per difference
    pub fn issues(&self) -> Vec<String> {
        self.differences
            .iter()
            .map(|difference| match &difference.location {
                Some(location) => format!("{} at {location}", difference.description),
                None => difference.description.clone(),
            })
            .collect()
    }

    /// Unified diff between the original and the rendered source
    pub fn diff(&self) -> String {
        TextDiff::from_lines(&self.original, &self.rendered)
            .unified_diff()
            .context_radius(3)
            .header("original", "rendered")
            .to_string()
    }
}

/// A way in which the round trip was not lossless
#[derive(Debug, Clone, PartialEq)]
pub struct Difference {
    pub kind: DifferenceKind,
    /// Byte offset or FST pointer where the difference starts
    pub location: Option<String>,
    pub description: String,
}

/// Types of round-trip differences
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DifferenceKind {
    /// Rendered text differs from the input
    TextDifference,
    /// Re-parsed FST differs from the first parse
    StructuralDifference,
    /// The rendered text no longer parses
    ReparseFailure,
}

/// Round-trip validator for source text
#[derive(Debug, Default)]
pub struct RoundTripValidator;

impl RoundTripValidator {
    pub fn new() -> Self {
        Self
    }

    /// Parse, render, re-parse and compare
    ///
    /// Fails only when the original source does not parse.
    pub fn validate(&self, source: &str) -> Result<ValidationResult> {
        let fst = parse(source)?;
        let rendered = render(&fst)?;
        let mut differences = Vec::new();

        if let Some(offset) = first_divergence(source, &rendered) {
            differences.push(Difference {
                kind: DifferenceKind::TextDifference,
                location: Some(format!("byte {offset}")),
                description: "Rendered text differs from the source".to_string(),
            });
        }

        match parse(&rendered) {
            Ok(reparsed) => {
                if let Some(pointer) = first_fst_divergence(&fst, &reparsed, String::new()) {
                    differences.push(Difference {
                        kind: DifferenceKind::StructuralDifference,
                        location: Some(if pointer.is_empty() { "/".to_string() } else { pointer }),
                        description: "Re-parsed tree differs from the original tree".to_string(),
                    });
                }
            }
            Err(error) => differences.push(Difference {
                kind: DifferenceKind::ReparseFailure,
                location: None,
                description: format!("Rendered text does not parse: {error}"),
            }),
        }

        debug!("Round trip found {} differences", differences.len());
        Ok(ValidationResult {
            original: source.to_string(),
            rendered,
            differences,
        })
    }
}

/// Byte offset of the first difference between two texts
fn first_divergence(left: &str, right: &str) -> Option<usize> {
    if left == right {
        return None;
    }
    let common = left
        .bytes()
        .zip(right.bytes())
        .take_while(|(a, b)| a == b)
        .count();
    Some(common)
}

/// JSON pointer of the first difference between two FST values
fn first_fst_divergence(left: &Value, right: &Value, pointer: String) -> Option<String> {
    match (left, right) {
        (Value::Object(a), Value::Object(b)) => {
            if a.len() != b.len() || a.keys().zip(b.keys()).any(|(x, y)| x != y) {
                return Some(pointer);
            }
            a.iter().find_map(|(key, value)| {
                first_fst_divergence(value, &b[key], format!("{pointer}/{key}"))
            })
        }
        (Value::Array(a), Value::Array(b)) => {
            if a.len() != b.len() {
                return Some(pointer);
            }
            a.iter()
                .zip(b)
                .enumerate()
                .find_map(|(index, (x, y))| first_fst_divergence(x, y, format!("{pointer}/{index}")))
        }
        _ if left == right => None,
        _ => Some(pointer),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valid_round_trip() {
        let result = RoundTripValidator::new()
            .validate("def f(a, b=1):\n    return a\n")
            .unwrap();
        assert!(result.is_valid());
        assert!(result.issues().is_empty());
    }

    #[test]
    fn test_syntax_error_is_reported() {
        assert!(RoundTripValidator::new().validate("a = (").is_err());
    }

    #[test]
    fn test_first_divergence() {
        assert_eq!(first_divergence("abc", "abc"), None);
        assert_eq!(first_divergence("abc", "abd"), Some(2));
        assert_eq!(first_divergence("ab", "abc"), Some(2));
    }

    #[test]
    fn test_fst_divergence_pointer() {
        let left = json!([{"type": "name", "value": "a"}]);
        let right = json!([{"type": "name", "value": "b"}]);
        assert_eq!(
            first_fst_divergence(&left, &right, String::new()),
            Some("/0/value".to_string())
        );
        assert_eq!(first_fst_divergence(&left, &left, String::new()), None);
    }

    #[test]
    fn test_diff_output() {
        let result = ValidationResult {
            original: "a\n".to_string(),
            rendered: "b\n".to_string(),
            differences: Vec::new(),
        };
        let diff = result.diff();
        assert!(diff.contains("-a"));
        assert!(diff.contains("+b"));
    }
}
