use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use aip_types::ReplicaRef;
use tracing::{debug, info};

use crate::error::{check_group, StoreError, StoreResult};
use crate::traits::ReplicaStore;

/// Directory-backed replica store.
///
/// Each group is a directory under `root` and each package a file named by
/// its [`ReplicaRef::key`]. Writes go to a hidden temporary file first and
/// are renamed into place, so a failed `put` never leaves a partial package.
#[derive(Debug, Clone)]
pub struct LocalReplicaStore {
    root: PathBuf,
    read_only: bool,
}

impl LocalReplicaStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            read_only: false,
        })
    }

    /// Refuse all mutating calls.
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, group: &str, reference: &ReplicaRef) -> StoreResult<PathBuf> {
        check_group(group)?;
        Ok(self.root.join(group).join(reference.key()))
    }
}

impl ReplicaStore for LocalReplicaStore {
    fn put(&self, group: &str, reference: &ReplicaRef, file: &Path) -> StoreResult<u64> {
        if self.read_only {
            return Err(StoreError::ReadOnly);
        }
        let target = self.object_path(group, reference)?;
        if !file.is_file() {
            return Err(StoreError::MissingFile(file.to_path_buf()));
        }
        let group_dir = self.root.join(group);
        fs::create_dir_all(&group_dir)?;

        let partial = group_dir.join(format!(".{}.partial", reference.key()));
        let copied = match fs::copy(file, &partial) {
            Ok(n) => n,
            Err(e) => {
                let _ = fs::remove_file(&partial);
                return Err(e.into());
            }
        };
        if let Err(e) = fs::rename(&partial, &target) {
            let _ = fs::remove_file(&partial);
            return Err(e.into());
        }
        info!(group, key = %reference, bytes = copied, "stored replica");
        Ok(copied)
    }

    fn get(&self, group: &str, reference: &ReplicaRef, dest: &Path) -> StoreResult<Option<u64>> {
        let source = self.object_path(group, reference)?;
        match fs::copy(&source, dest) {
            Ok(n) => {
                debug!(group, key = %reference, bytes = n, "fetched replica");
                Ok(Some(n))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn exists(&self, group: &str, reference: &ReplicaRef) -> StoreResult<bool> {
        Ok(self.object_path(group, reference)?.is_file())
    }

    fn delete(&self, group: &str, reference: &ReplicaRef) -> StoreResult<bool> {
        if self.read_only {
            return Err(StoreError::ReadOnly);
        }
        let path = self.object_path(group, reference)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                info!(group, key = %reference, "deleted replica");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn size(&self, group: &str, reference: &ReplicaRef) -> StoreResult<Option<u64>> {
        let path = self.object_path(group, reference)?;
        match fs::metadata(&path) {
            Ok(meta) if meta.is_file() => Ok(Some(meta.len())),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aip_types::Handle;

    fn reference(handle: &str) -> ReplicaRef {
        ReplicaRef::new(&Handle::parse(handle).unwrap(), "tar.zst")
    }

    #[test]
    fn put_lays_out_group_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalReplicaStore::open(dir.path().join("replicas")).unwrap();
        let src = dir.path().join("pkg");
        fs::write(&src, b"package").unwrap();

        assert_eq!(store.put("aip", &reference("123/4"), &src).unwrap(), 7);
        let stored = dir.path().join("replicas/aip/123-4.tar.zst");
        assert_eq!(fs::read(stored).unwrap(), b"package");
    }

    #[test]
    fn put_leaves_no_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalReplicaStore::open(dir.path()).unwrap();
        let src = dir.path().join("pkg");
        fs::write(&src, b"x").unwrap();
        store.put("aip", &reference("1/1"), &src).unwrap();

        let names: Vec<String> = fs::read_dir(dir.path().join("aip"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["1-1.tar.zst"]);
    }

    #[test]
    fn get_exists_size_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalReplicaStore::open(dir.path().join("s")).unwrap();
        let r = reference("1/2");
        let src = dir.path().join("pkg");
        fs::write(&src, b"abcdef").unwrap();

        assert!(!store.exists("aip", &r).unwrap());
        assert_eq!(store.size("aip", &r).unwrap(), None);
        store.put("aip", &r, &src).unwrap();
        assert!(store.exists("aip", &r).unwrap());
        assert_eq!(store.size("aip", &r).unwrap(), Some(6));

        let dest = dir.path().join("back");
        assert_eq!(store.get("aip", &r, &dest).unwrap(), Some(6));
        assert_eq!(fs::read(&dest).unwrap(), b"abcdef");

        assert!(store.delete("aip", &r).unwrap());
        assert!(!store.delete("aip", &r).unwrap());
        assert_eq!(store.get("aip", &r, &dest).unwrap(), None);
    }

    #[test]
    fn missing_source_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalReplicaStore::open(dir.path()).unwrap();
        let err = store
            .put("aip", &reference("1/2"), &dir.path().join("absent"))
            .unwrap_err();
        assert!(matches!(err, StoreError::MissingFile(_)));
        assert!(!store.exists("aip", &reference("1/2")).unwrap());
    }

    #[test]
    fn read_only_rejects_writes() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalReplicaStore::open(dir.path()).unwrap().read_only();
        let src = dir.path().join("pkg");
        fs::write(&src, b"x").unwrap();
        assert!(matches!(
            store.put("aip", &reference("1/2"), &src),
            Err(StoreError::ReadOnly)
        ));
        assert!(matches!(
            store.delete("aip", &reference("1/2")),
            Err(StoreError::ReadOnly)
        ));
    }

    #[test]
    fn group_cannot_escape_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalReplicaStore::open(dir.path()).unwrap();
        assert!(matches!(
            store.exists("../etc", &reference("1/2")),
            Err(StoreError::InvalidGroup(_))
        ));
    }
}
