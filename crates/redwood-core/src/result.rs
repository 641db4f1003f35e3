//! Result type alias for tree operations

use crate::error::RedwoodError;

/// Standard Result type for tree operations
pub type Result<T> = std::result::Result<T, RedwoodError>;
