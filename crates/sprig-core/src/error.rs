//! Error types for Sprig Core

use crate::node::NodeId;
use thiserror::Error;

/// Result type alias using Sprig's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Sprig error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("Syntax error at position {position}: {message}")]
    Syntax { position: usize, message: String },

    #[error("Selector is empty")]
    EmptySelector,

    #[error("Invalid index: {0}")]
    InvalidIndex(String),

    #[error("Invalid regular expression '{pattern}': {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Unknown filter function: {0}")]
    UnknownFunction(String),

    #[error("Invalid argument for {function}(): {message}")]
    InvalidArgument { function: String, message: String },

    #[error("Selector too long: {len} chars (max {max})")]
    SelectorTooLong { len: usize, max: usize },

    #[error("Block nesting too deep: {depth} (max {max})")]
    NestingTooDeep { depth: usize, max: usize },

    #[error("Cycle detected among {} nodes", remaining.len())]
    CycleDetected { remaining: Vec<NodeId> },

    #[error("Contract violation: {0}")]
    Contract(String),

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Document error: {0}")]
    Document(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub(crate) fn syntax(position: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            position,
            message: message.into(),
        }
    }

    pub(crate) fn invalid_argument(function: &str, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            function: function.to_string(),
            message: message.into(),
        }
    }

    /// Whether this error was raised while compiling a selector
    pub fn is_compile_error(&self) -> bool {
        matches!(
            self,
            Self::Syntax { .. }
                | Self::EmptySelector
                | Self::InvalidIndex(_)
                | Self::InvalidRegex { .. }
                | Self::UnknownFunction(_)
                | Self::InvalidArgument { .. }
                | Self::SelectorTooLong { .. }
                | Self::NestingTooDeep { .. }
        )
    }
}
