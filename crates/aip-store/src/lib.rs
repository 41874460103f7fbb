//! Replica store client for archival packages.
//!
//! The replica store is an external, independently operated service holding
//! serialized packages for disaster recovery. This crate defines the client
//! contract and ships two backends.
//!
//! # Storage Backends
//!
//! All backends implement the [`ReplicaStore`] trait:
//!
//! - [`InMemoryReplicaStore`] -- `HashMap`-based store for tests and embedding
//! - [`LocalReplicaStore`] -- one directory per group on a local or mounted
//!   filesystem
//!
//! Packages are keyed by group name and [`ReplicaRef`](aip_types::ReplicaRef).
//! [`Staging`] allocates the local working directories packages are built in
//! before transfer.
//!
//! # Design Rules
//!
//! 1. Transfers are blocking; timeouts and retries belong to the caller.
//! 2. A `put` either stores the complete file or leaves no object behind.
//! 3. The store never interprets package contents.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod local;
pub mod memory;
pub mod staging;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use local::LocalReplicaStore;
pub use memory::InMemoryReplicaStore;
pub use staging::Staging;
pub use traits::ReplicaStore;
