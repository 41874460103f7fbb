use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BagError {
    #[error("unable to create bag, data directory already exists: {0}")]
    DataDirExists(PathBuf),

    #[error("unsupported operation: {0}")]
    Unsupported(String),

    #[error("invalid tag key {0:?}: expected <tag-file>.<field>")]
    InvalidTagKey(String),

    #[error("tag value for {0:?} must be a single line")]
    InvalidTagValue(String),

    #[error("unknown archive format: {0}")]
    UnknownFormat(String),

    #[error("invalid name for a package entry: {0:?}")]
    InvalidName(String),

    #[error("malformed package: {0}")]
    Format(String),

    #[error("malformed XML document: {0}")]
    MalformedXml(String),

    #[error("package file not found: {0}")]
    MissingFile(String),

    #[error("checksum mismatch for {path}")]
    ChecksumMismatch { path: String },

    #[error("archive error: {0}")]
    Archive(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type BagResult<T> = Result<T, BagError>;
