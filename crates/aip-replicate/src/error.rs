use std::path::PathBuf;

use aip_bag::BagError;
use aip_pack::PackerError;
use aip_store::StoreError;
use aip_types::Handle;
use thiserror::Error;

/// Errors from loading replication settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("restore profile {profile:?} must enable exactly one mode, found {enabled}")]
    ModeCount { profile: String, enabled: usize },

    #[error("unknown restore profile {0:?}")]
    UnknownProfile(String),

    #[error("{0}")]
    Invalid(String),
}

/// Errors that abort a replication call.
#[derive(Debug, Error)]
pub enum ReplicateError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Packer(#[from] PackerError),

    #[error("no replica stored for {0}")]
    MissingReplica(Handle),

    /// The archive for `handle` could not be read; a restore walk stops here.
    #[error("unreadable package for {handle}: {source}")]
    Unreadable {
        handle: Handle,
        #[source]
        source: PackerError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<BagError> for ReplicateError {
    fn from(e: BagError) -> Self {
        Self::Packer(PackerError::Bag(e))
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;
pub type ReplicateResult<T> = Result<T, ReplicateError>;
