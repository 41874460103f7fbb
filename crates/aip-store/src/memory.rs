use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::RwLock;

use aip_types::ReplicaRef;

use crate::error::{check_group, StoreError, StoreResult};
use crate::traits::ReplicaStore;

/// In-memory, HashMap-based replica store.
///
/// Intended for tests and embedding. Package bytes are held in memory behind
/// a `RwLock` for safe concurrent access.
pub struct InMemoryReplicaStore {
    objects: RwLock<HashMap<(String, String), Vec<u8>>>,
}

impl InMemoryReplicaStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
        }
    }

    /// Number of objects currently stored across all groups.
    pub fn len(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.objects.read().expect("lock poisoned").is_empty()
    }

    /// Sorted keys stored under a group.
    pub fn keys(&self, group: &str) -> Vec<String> {
        let map = self.objects.read().expect("lock poisoned");
        let mut keys: Vec<String> = map
            .keys()
            .filter(|(g, _)| g == group)
            .map(|(_, k)| k.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Raw bytes of a stored object.
    pub fn bytes(&self, group: &str, reference: &ReplicaRef) -> Option<Vec<u8>> {
        let map = self.objects.read().expect("lock poisoned");
        map.get(&(group.to_string(), reference.key())).cloned()
    }
}

impl Default for InMemoryReplicaStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplicaStore for InMemoryReplicaStore {
    fn put(&self, group: &str, reference: &ReplicaRef, file: &Path) -> StoreResult<u64> {
        check_group(group)?;
        if !file.is_file() {
            return Err(StoreError::MissingFile(file.to_path_buf()));
        }
        let data = fs::read(file)?;
        let len = data.len() as u64;
        let mut map = self.objects.write().expect("lock poisoned");
        map.insert((group.to_string(), reference.key()), data);
        Ok(len)
    }

    fn get(&self, group: &str, reference: &ReplicaRef, dest: &Path) -> StoreResult<Option<u64>> {
        check_group(group)?;
        let data = match self.bytes(group, reference) {
            Some(data) => data,
            None => return Ok(None),
        };
        fs::write(dest, &data)?;
        Ok(Some(data.len() as u64))
    }

    fn exists(&self, group: &str, reference: &ReplicaRef) -> StoreResult<bool> {
        check_group(group)?;
        let map = self.objects.read().expect("lock poisoned");
        Ok(map.contains_key(&(group.to_string(), reference.key())))
    }

    fn delete(&self, group: &str, reference: &ReplicaRef) -> StoreResult<bool> {
        check_group(group)?;
        let mut map = self.objects.write().expect("lock poisoned");
        Ok(map.remove(&(group.to_string(), reference.key())).is_some())
    }

    fn size(&self, group: &str, reference: &ReplicaRef) -> StoreResult<Option<u64>> {
        check_group(group)?;
        Ok(self.bytes(group, reference).map(|d| d.len() as u64))
    }
}

impl std::fmt::Debug for InMemoryReplicaStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.len();
        f.debug_struct("InMemoryReplicaStore")
            .field("object_count", &count)
            .finish()
    }
}
