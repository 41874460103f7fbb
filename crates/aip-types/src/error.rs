use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid handle {value:?}: {reason}")]
    InvalidHandle { value: String, reason: String },

    #[error("invalid escape sequence in safe id: {0}")]
    InvalidEscape(String),

    #[error("unknown object kind: {0}")]
    UnknownKind(String),
}
