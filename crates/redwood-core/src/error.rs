//! Error types and handling for tree operations

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for parsing, editing and addressing trees
#[derive(Debug, Error)]
pub enum RedwoodError {
    /// Source text the parser could not accept
    #[error("Syntax error at line {line}, column {column}: {message}")]
    Syntax {
        message: String,
        line: usize,
        column: usize,
    },

    /// A node type that the grammar table does not declare
    #[error("Unknown node type '{kind}'")]
    UnknownNodeType { kind: String },

    /// A value that cannot be normalized into a node, or an operation whose
    /// structural precondition does not hold
    #[error("Invalid value: {message}")]
    InvalidValue { message: String },

    /// Explicit access to an attribute the node type does not declare
    #[error("'{kind}' has no attribute '{attribute}'")]
    NoSuchAttribute { kind: String, attribute: String },

    /// A path step that no longer resolves against the live tree
    #[error("Path step {step} could not be resolved: {message}")]
    PathLookup { step: usize, message: String },

    /// Configuration loading or validation errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// File system I/O errors
    #[error("IO error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Error kind enumeration for categorizing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Syntax,
    Value,
    Key,
    Lookup,
    Config,
    Io,
}

impl RedwoodError {
    /// Get the error kind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            RedwoodError::Syntax { .. } => ErrorKind::Syntax,
            RedwoodError::UnknownNodeType { .. } => ErrorKind::Value,
            RedwoodError::InvalidValue { .. } => ErrorKind::Value,
            RedwoodError::NoSuchAttribute { .. } => ErrorKind::Key,
            RedwoodError::PathLookup { .. } => ErrorKind::Lookup,
            RedwoodError::Config { .. } => ErrorKind::Config,
            RedwoodError::Io { .. } => ErrorKind::Io,
        }
    }

    /// Create a syntax error
    pub fn syntax(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self::Syntax {
            message: message.into(),
            line,
            column,
        }
    }

    /// Create an unknown node type error
    pub fn unknown_node_type(kind: impl Into<String>) -> Self {
        Self::UnknownNodeType { kind: kind.into() }
    }

    /// Create an invalid value error
    pub fn invalid_value(message: impl Into<String>) -> Self {
        Self::InvalidValue {
            message: message.into(),
        }
    }

    /// Create a missing attribute error
    pub fn no_such_attribute(kind: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::NoSuchAttribute {
            kind: kind.into(),
            attribute: attribute.into(),
        }
    }

    /// Create a path lookup error for the given step index
    pub fn path_lookup(step: usize, message: impl Into<String>) -> Self {
        Self::PathLookup {
            step,
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an IO error with path context
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(RedwoodError::syntax("bad", 1, 2).kind(), ErrorKind::Syntax);
        assert_eq!(
            RedwoodError::unknown_node_type("pouet").kind(),
            ErrorKind::Value
        );
        assert_eq!(
            RedwoodError::no_such_attribute("name", "plop").kind(),
            ErrorKind::Key
        );
        assert_eq!(RedwoodError::path_lookup(3, "gone").kind(), ErrorKind::Lookup);
    }

    #[test]
    fn test_error_messages() {
        let err = RedwoodError::no_such_attribute("name", "plop");
        assert_eq!(err.to_string(), "'name' has no attribute 'plop'");

        let err = RedwoodError::syntax("unexpected indent", 2, 1);
        assert_eq!(
            err.to_string(),
            "Syntax error at line 2, column 1: unexpected indent"
        );
    }
}
