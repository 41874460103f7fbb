/// Errors from replica store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The group name cannot be used as a storage namespace.
    #[error("invalid store group {0:?}")]
    InvalidGroup(String),

    /// The local file handed to `put` does not exist.
    #[error("missing local file: {0}")]
    MissingFile(std::path::PathBuf),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Storage backend is read-only or otherwise unavailable.
    #[error("store is read-only")]
    ReadOnly,
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Validate a group name: non-empty, a single path component.
pub(crate) fn check_group(group: &str) -> StoreResult<()> {
    if group.is_empty()
        || group == "."
        || group == ".."
        || group.contains(['/', '\\'])
        || group.chars().any(char::is_control)
    {
        return Err(StoreError::InvalidGroup(group.to_string()));
    }
    Ok(())
}
