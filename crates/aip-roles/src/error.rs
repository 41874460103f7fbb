use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum RoleError {
    #[error("malformed role document: {0}")]
    Malformed(String),

    #[error("unknown role: {0}")]
    UnknownRole(String),

    #[error("group not found: {0}")]
    GroupNotFound(Uuid),

    #[error("person not found: {0}")]
    PersonNotFound(Uuid),

    #[error("duplicate {kind}: {name}")]
    Duplicate { kind: &'static str, name: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type RoleResult<T> = Result<T, RoleError>;
