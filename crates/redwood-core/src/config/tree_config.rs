//! Settings applied by edits that create formatting

use serde::{Deserialize, Serialize};

use crate::error::RedwoodError;
use crate::result::Result;
use crate::tree::AppendOptions;

/// Tree editing configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TreeConfig {
    /// One indentation step for blocks created from one-line suites
    pub indent_unit: String,

    /// Append a comma after the only element of a tuple
    pub single_tuple_comma: bool,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            indent_unit: "    ".to_string(),
            single_tuple_comma: true,
        }
    }
}

impl TreeConfig {
    /// Reject settings that would produce invalid source
    pub fn validate(&self) -> Result<()> {
        if self.indent_unit.is_empty() {
            return Err(RedwoodError::config_error("indent_unit must not be empty"));
        }
        if !self.indent_unit.chars().all(|c| c == ' ' || c == '\t') {
            return Err(RedwoodError::config_error(format!(
                "indent_unit must contain only spaces and tabs, got {:?}",
                self.indent_unit
            )));
        }
        Ok(())
    }

    /// Append options carrying these settings
    pub fn append_options(&self) -> AppendOptions {
        AppendOptions::new()
            .indent_unit(self.indent_unit.clone())
            .single_tuple_comma(self.single_tuple_comma)
    }
}
