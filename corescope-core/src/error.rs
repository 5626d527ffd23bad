//! Structured error types for corescope.

use thiserror::Error;

/// Unified error type for all corescope operations.
///
/// Every error is scoped to the operation that raised it. Pattern compilation
/// and table rows fail one item at a time; see [`CorescopeError::is_recoverable`].
#[derive(Debug, Error)]
pub enum CorescopeError {
    /// I/O error (file not found, permission denied, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error (malformed structure, pattern or library text)
    #[error("parse error: {0}")]
    Parse(String),

    /// Invalid input (bad arguments, out-of-range indices)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A named pattern could not be compiled into a matcher.
    #[error("pattern '{name}' failed to compile: {reason}")]
    PatternCompile { name: String, reason: String },

    /// A pattern references a substitution definition that does not exist.
    #[error("pattern '{name}' references undefined substitution '${reference}'")]
    UnresolvedSubstitution { name: String, reference: String },

    /// A data row has a different field count from the header.
    #[error("line {line}: expected {expected} fields, found {found}")]
    LoadSchema {
        line: usize,
        expected: usize,
        found: usize,
    },

    /// A column required by the aggregation write-back is absent.
    #[error("missing column '{0}'")]
    MissingColumn(String),

    /// Settings or report (de)serialization failure
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Catch-all for other errors
    #[error("{0}")]
    Other(String),
}

impl CorescopeError {
    /// Build a [`CorescopeError::PatternCompile`] for `name`, wrapping any error.
    pub fn pattern_compile(name: impl Into<String>, reason: impl ToString) -> Self {
        CorescopeError::PatternCompile {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the failure only affects a single pattern or row, leaving the
    /// surrounding batch free to continue.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CorescopeError::PatternCompile { .. }
                | CorescopeError::UnresolvedSubstitution { .. }
                | CorescopeError::LoadSchema { .. }
        )
    }

    /// Whether this is a pattern compilation failure of either kind.
    pub fn is_pattern_error(&self) -> bool {
        matches!(
            self,
            CorescopeError::PatternCompile { .. } | CorescopeError::UnresolvedSubstitution { .. }
        )
    }
}

/// Convenience alias used throughout corescope.
pub type Result<T> = std::result::Result<T, CorescopeError>;
