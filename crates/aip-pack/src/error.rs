use aip_bag::BagError;
use aip_roles::RoleError;
use aip_types::{Handle, ObjectKind, TypeError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PackerError {
    #[error("object not found: {0}")]
    NotFound(Handle),

    #[error("object already exists: {0}")]
    AlreadyExists(Handle),

    #[error("parent object not found: {0}")]
    MissingParent(Handle),

    #[error("package holds a {found} but the packer handles {expected}")]
    KindMismatch {
        expected: ObjectKind,
        found: ObjectKind,
    },

    #[error("metadata field {0:?} is not registered")]
    UnknownField(String),

    #[error("invalid object properties: {0}")]
    Properties(String),

    #[error("repository error: {0}")]
    Repository(String),

    #[error(transparent)]
    Bag(#[from] BagError),

    #[error(transparent)]
    Roles(#[from] RoleError),

    #[error(transparent)]
    Type(#[from] TypeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type PackResult<T> = Result<T, PackerError>;
