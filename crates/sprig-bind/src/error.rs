//! Binding error types

use thiserror::Error;

/// Result type alias for binding operations
pub type BindResult<T> = std::result::Result<T, BindError>;

/// Raised by a [`ValueReader`](crate::ValueReader) when a raw attribute
/// value cannot become the requested type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    #[error("Cannot read '{raw}' as {target}: {message}")]
    Unreadable {
        raw: String,
        target: &'static str,
        message: String,
    },
}

/// Binding-specific error types
#[derive(Error, Debug)]
pub enum BindError {
    #[error("Pattern error: {0}")]
    Pattern(#[from] sprig_core::Error),

    #[error("Field '{field}' expects one match for '{selector}' but found {matches}")]
    Ambiguous {
        field: &'static str,
        selector: String,
        matches: usize,
    },

    #[error(transparent)]
    Value(#[from] ValueError),
}
