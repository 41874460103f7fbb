use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use aip_bag::BagError;
use aip_pack::{Pack, PackContext, Packer, PackerError, Repository, SizeMode};
use aip_roles::RoleService;
use aip_store::{ReplicaStore, Staging};
use aip_types::{Handle, ReplicaRef};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::ReplicateConfig;
use crate::error::{ReplicateError, ReplicateResult};
use crate::restore::{RestoreOptions, RestoreReconciler, RestoreReport};

/// Result of transmitting one object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Transmission {
    Sent { key: String, bytes: u64 },
    Failed { reason: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TransmitEntry {
    pub handle: Handle,
    #[serde(flatten)]
    pub transmission: Transmission,
}

/// Per-object results of a tree transmit, parents first.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TransmitReport {
    pub entries: Vec<TransmitEntry>,
}

impl TransmitReport {
    pub fn sent(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.transmission, Transmission::Sent { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.entries.len() - self.sent()
    }
}

/// Moves packages between a live repository and a replica store.
///
/// Packages are built in and fetched into the staging area, under the
/// configured group. The local copy of an archive is removed once it has been
/// transferred.
pub struct ReplicaManager {
    ctx: PackContext,
    store: Arc<dyn ReplicaStore>,
    staging: Staging,
    group: String,
}

impl ReplicaManager {
    pub fn new(
        config: &ReplicateConfig,
        repository: Arc<dyn Repository>,
        store: Arc<dyn ReplicaStore>,
    ) -> Self {
        Self {
            ctx: PackContext::new(repository).with_options(config.pack_options()),
            store,
            staging: Staging::new(config.staging_dir.clone()),
            group: config.aip_group.clone(),
        }
    }

    pub fn with_roles(mut self, roles: Arc<dyn RoleService>) -> Self {
        self.ctx = self.ctx.with_roles(roles);
        self
    }

    pub fn context(&self) -> &PackContext {
        &self.ctx
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn staging(&self) -> &Staging {
        &self.staging
    }

    /// Store reference for `handle` under the configured archive format.
    pub fn replica_ref(&self, handle: &Handle) -> ReplicaRef {
        ReplicaRef::new(handle, self.ctx.options.bag.format.extension())
    }

    /// Package one object and put it in the store.
    ///
    /// Returns the bytes transferred. On failure nothing is left in the store
    /// for this object. A package directory that already holds `data/` is
    /// left untouched.
    pub fn transmit(&self, handle: &Handle) -> ReplicateResult<u64> {
        let object = self.ctx.require(handle)?;
        let reference = self.replica_ref(handle);
        let dir = self.staging.stage(&self.group, handle)?;
        let archive = match Packer::for_object(&object).pack(&self.ctx, &dir) {
            Ok(archive) => archive,
            Err(e @ PackerError::Bag(BagError::DataDirExists(_))) => return Err(e.into()),
            Err(e) => {
                discard_dir(&dir);
                return Err(e.into());
            }
        };

        let sent = self.store.put(&self.group, &reference, &archive);
        discard_file(&archive);
        match sent {
            Ok(bytes) => {
                info!(%handle, key = %reference.key(), bytes, "transmitted package");
                Ok(bytes)
            }
            Err(e) => {
                if let Err(cleanup) = self.store.delete(&self.group, &reference) {
                    warn!(%handle, error = %cleanup, "failed to remove partial replica");
                }
                Err(e.into())
            }
        }
    }

    /// Transmit `root` and every descendant, each parent before its children.
    ///
    /// A failed object is recorded and its children are still attempted,
    /// since every package stands alone.
    pub fn transmit_tree(&self, root: &Handle) -> ReplicateResult<TransmitReport> {
        let mut report = TransmitReport::default();
        let mut stack = vec![root.clone()];
        while let Some(handle) = stack.pop() {
            let transmission = match self.transmit(&handle) {
                Ok(bytes) => Transmission::Sent {
                    key: self.replica_ref(&handle).key(),
                    bytes,
                },
                Err(e) => {
                    warn!(%handle, error = %e, "transmit failed");
                    Transmission::Failed {
                        reason: e.to_string(),
                    }
                }
            };
            report.entries.push(TransmitEntry {
                handle: handle.clone(),
                transmission,
            });
            if let Some(object) = self.ctx.repository.find(&handle)? {
                stack.extend(object.children.into_iter().rev());
            }
        }
        info!(%root, sent = report.sent(), failed = report.failed(), "tree transmitted");
        Ok(report)
    }

    /// Whether a replica of `handle` is in the store.
    pub fn verify(&self, handle: &Handle) -> ReplicateResult<bool> {
        let present = self.store.exists(&self.group, &self.replica_ref(handle))?;
        debug!(%handle, present, "verified replica");
        Ok(present)
    }

    /// Copy the replica of `handle` into the staging area.
    pub fn fetch(&self, handle: &Handle) -> ReplicateResult<PathBuf> {
        let reference = self.replica_ref(handle);
        let dest = self.staging.archive_path(&self.group, &reference)?;
        match self.store.get(&self.group, &reference, &dest)? {
            Some(bytes) => {
                debug!(%handle, bytes, path = %dest.display(), "fetched replica");
                Ok(dest)
            }
            None => Err(ReplicateError::MissingReplica(handle.clone())),
        }
    }

    /// Delete the replica of `handle`. Returns whether one existed.
    pub fn remove(&self, handle: &Handle) -> ReplicateResult<bool> {
        let removed = self.store.delete(&self.group, &self.replica_ref(handle))?;
        info!(%handle, removed, "removed replica");
        Ok(removed)
    }

    /// Bytes the live object would package.
    pub fn size(&self, handle: &Handle, mode: SizeMode) -> ReplicateResult<u64> {
        let object = self.ctx.require(handle)?;
        Ok(Packer::for_object(&object).size(&self.ctx, mode)?)
    }

    /// Restore `targets` from the store into the live repository.
    pub fn restore(
        &self,
        targets: &[Handle],
        options: RestoreOptions,
    ) -> ReplicateResult<RestoreReport> {
        RestoreReconciler::new(self, options).run(targets)
    }
}

fn discard_dir(dir: &Path) {
    if dir.exists() {
        if let Err(e) = fs::remove_dir_all(dir) {
            warn!(path = %dir.display(), error = %e, "failed to remove package directory");
        }
    }
}

fn discard_file(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "failed to remove archive"),
    }
}

impl std::fmt::Debug for ReplicaManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplicaManager")
            .field("group", &self.group)
            .field("staging", &self.staging.root())
            .field("options", &self.ctx.options)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{handle, tree, Fixture};

    #[test]
    fn transmit_puts_replica_and_cleans_staging() {
        let fx = Fixture::new(tree());
        let bytes = fx.manager.transmit(&handle("1/1")).unwrap();
        assert!(bytes > 0);
        assert_eq!(fx.store.keys(fx.manager.group()), vec!["1-1.zip"]);
        let group_dir = fx.staging.path().join(fx.manager.group());
        assert_eq!(fs::read_dir(group_dir).unwrap().count(), 0);
        assert!(fx.manager.verify(&handle("1/1")).unwrap());
    }

    #[test]
    fn failed_pack_leaves_no_replica() {
        let fx = Fixture::new(tree());
        fx.repo
            .add_bitstream(
                &handle("1/3"),
                aip_types::Bitstream::new("ORIGINAL", "remote.bin", Vec::new())
                    .with_fetch_url("https://example.org/remote.bin"),
            )
            .unwrap();
        let err = fx.manager.transmit(&handle("1/3")).unwrap_err();
        assert!(matches!(
            err,
            ReplicateError::Packer(PackerError::Bag(BagError::Unsupported(_)))
        ));
        assert!(fx.store.is_empty());
        assert!(!fx.manager.verify(&handle("1/3")).unwrap());
    }

    #[test]
    fn existing_data_dir_is_left_alone() {
        let fx = Fixture::new(tree());
        let dir = fx.manager.staging().stage(fx.manager.group(), &handle("1/1")).unwrap();
        fs::create_dir_all(dir.join("data")).unwrap();
        let err = fx.manager.transmit(&handle("1/1")).unwrap_err();
        assert!(matches!(
            err,
            ReplicateError::Packer(PackerError::Bag(BagError::DataDirExists(_)))
        ));
        assert!(dir.join("data").is_dir());
        assert!(fx.store.is_empty());
    }

    #[test]
    fn transmit_missing_object() {
        let fx = Fixture::new(tree());
        assert!(matches!(
            fx.manager.transmit(&handle("1/404")),
            Err(ReplicateError::Packer(PackerError::NotFound(_)))
        ));
    }

    #[test]
    fn tree_is_sent_parent_first() {
        let fx = Fixture::new(tree());
        let report = fx.manager.transmit_tree(&handle("1/0")).unwrap();
        let order: Vec<&str> = report.entries.iter().map(|e| e.handle.as_str()).collect();
        assert_eq!(order, vec!["1/0", "1/1", "1/2", "1/3"]);
        assert_eq!(report.sent(), 4);
        assert_eq!(report.failed(), 0);
        assert_eq!(fx.store.len(), 4);
    }

    #[test]
    fn fetch_and_remove() {
        let fx = Fixture::new(tree());
        fx.manager.transmit(&handle("1/2")).unwrap();
        let path = fx.manager.fetch(&handle("1/2")).unwrap();
        assert!(path.is_file());
        assert_eq!(path.file_name().unwrap(), "1-2.zip");

        assert!(fx.manager.remove(&handle("1/2")).unwrap());
        assert!(!fx.manager.remove(&handle("1/2")).unwrap());
        assert!(matches!(
            fx.manager.fetch(&handle("1/2")),
            Err(ReplicateError::MissingReplica(_))
        ));
    }

    #[test]
    fn size_modes() {
        let fx = Fixture::new(tree());
        assert_eq!(fx.manager.size(&handle("1/1"), SizeMode::Recursive).unwrap(), 4);
        assert_eq!(fx.manager.size(&handle("1/1"), SizeMode::NoRecurse).unwrap(), 0);
    }

    #[test]
    fn report_serializes_outcomes() {
        let report = TransmitReport {
            entries: vec![TransmitEntry {
                handle: handle("1/1"),
                transmission: Transmission::Sent {
                    key: "1-1.zip".into(),
                    bytes: 10,
                },
            }],
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["entries"][0]["outcome"], "sent");
        assert_eq!(json["entries"][0]["bytes"], 10);
    }
}
