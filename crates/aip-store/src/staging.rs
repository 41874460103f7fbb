use std::fs;
use std::path::{Path, PathBuf};

use aip_types::{Handle, ReplicaRef};
use tracing::debug;

use crate::error::{check_group, StoreResult};

/// Local staging area where packages are built before transfer and fetched
/// into before restore.
///
/// Layout: `<root>/<group>/<safe-id>` for a package directory and
/// `<root>/<group>/<safe-id>.<ext>` for its serialized archive.
#[derive(Debug, Clone)]
pub struct Staging {
    root: PathBuf,
}

impl Staging {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Ensure the group directory exists and return the package directory
    /// path for `handle`. The package directory itself is not created.
    pub fn stage(&self, group: &str, handle: &Handle) -> StoreResult<PathBuf> {
        check_group(group)?;
        let group_dir = self.root.join(group);
        fs::create_dir_all(&group_dir)?;
        let dir = group_dir.join(handle.safe_id());
        debug!(path = %dir.display(), "staged package directory");
        Ok(dir)
    }

    /// Path of a serialized archive inside the staging area.
    pub fn archive_path(&self, group: &str, reference: &ReplicaRef) -> StoreResult<PathBuf> {
        check_group(group)?;
        let group_dir = self.root.join(group);
        fs::create_dir_all(&group_dir)?;
        Ok(group_dir.join(reference.key()))
    }
}
