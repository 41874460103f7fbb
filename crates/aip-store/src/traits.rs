use std::path::Path;

use aip_types::ReplicaRef;

use crate::error::StoreResult;

/// Client for a remote store of serialized packages.
///
/// All implementations must satisfy these invariants:
/// - Objects are addressed by `(group, reference)`; groups are flat
///   namespaces.
/// - `put` replaces any existing object under the same key atomically.
/// - Calls block until the transfer completes.
/// - All I/O errors are propagated, never silently ignored.
pub trait ReplicaStore: Send + Sync {
    /// Transfer a local file into the store. Returns the bytes transferred.
    fn put(&self, group: &str, reference: &ReplicaRef, file: &Path) -> StoreResult<u64>;

    /// Copy a stored object to `dest`.
    ///
    /// Returns `Ok(None)` if the object does not exist, otherwise the number
    /// of bytes written.
    fn get(&self, group: &str, reference: &ReplicaRef, dest: &Path) -> StoreResult<Option<u64>>;

    /// Check whether an object exists in the store.
    fn exists(&self, group: &str, reference: &ReplicaRef) -> StoreResult<bool>;

    /// Delete an object. Returns `true` if the object existed.
    fn delete(&self, group: &str, reference: &ReplicaRef) -> StoreResult<bool>;

    /// Size of a stored object in bytes, if present.
    fn size(&self, group: &str, reference: &ReplicaRef) -> StoreResult<Option<u64>>;
}
