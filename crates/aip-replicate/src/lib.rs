//! Replication of archival packages.
//!
//! [`ReplicaManager`] ties the packers to a replica store: it transmits
//! objects (singly or a whole tree), checks and removes replicas, and fetches
//! them back. [`RestoreReconciler`] drives the reverse path, applying fetched
//! packages to the live repository under a [`RestoreMode`].
//!
//! ```text
//! transmit: repository ─► Packer::pack ─► staging/<group>/<id>.<ext> ─► ReplicaStore::put
//! restore:  ReplicaStore::get ─► staging ─► object.properties ─► mode ─► Packer::unpack
//! ```
//!
//! Settings come from a [`ReplicateConfig`], normally loaded from TOML.

pub mod config;
pub mod error;
pub mod manager;
pub mod restore;
#[cfg(test)]
mod testing;

pub use config::{ReplicateConfig, RestoreProfile, DEFAULT_GROUP};
pub use error::{ConfigError, ConfigResult, ReplicateError, ReplicateResult};
pub use manager::{ReplicaManager, TransmitEntry, TransmitReport, Transmission};
pub use restore::{
    ObjectOutcome, RestoreEntry, RestoreMode, RestoreOptions, RestoreReconciler, RestoreReport,
    RestoreStatus,
};
