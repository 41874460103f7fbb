//! Shared fixtures for replication tests.

use std::sync::Arc;

use aip_pack::fields::COLLECTION_FIELDS;
use aip_pack::{InMemoryRepository, Repository};
use aip_store::InMemoryReplicaStore;
use aip_types::{Bitstream, DigitalObject, Handle, ObjectKind};
use tempfile::TempDir;

use crate::config::ReplicateConfig;
use crate::manager::ReplicaManager;

pub fn handle(s: &str) -> Handle {
    Handle::parse(s).unwrap()
}

pub fn empty_repository() -> Arc<InMemoryRepository> {
    let repo = InMemoryRepository::new()
        .with_fields(COLLECTION_FIELDS.iter().copied())
        .with_fields(["dc.title"]);
    Arc::new(repo)
}

/// `1/0` root holding container `1/1`, collection `1/2` and item `1/3`.
pub fn tree() -> Arc<InMemoryRepository> {
    let repo = empty_repository();
    repo.create(ObjectKind::Root, &handle("1/0"), None).unwrap();
    for (kind, h, parent) in [
        (ObjectKind::Container, "1/1", "1/0"),
        (ObjectKind::Collection, "1/2", "1/1"),
        (ObjectKind::Item, "1/3", "1/2"),
    ] {
        repo.create(kind, &handle(h), Some(&handle(parent))).unwrap();
    }
    repo.set_metadata(&handle("1/0"), "name", "Archive").unwrap();
    repo.set_metadata(&handle("1/1"), "name", "Physics").unwrap();
    repo.set_metadata(&handle("1/2"), "name", "Theses").unwrap();
    repo.set_metadata(&handle("1/3"), "dc.title", "On Quanta").unwrap();
    repo.add_bitstream(
        &handle("1/3"),
        Bitstream::new("ORIGINAL", "thesis.pdf", b"%PDF".to_vec()),
    )
    .unwrap();
    repo.clear_calls();
    repo
}

pub struct Fixture {
    pub staging: TempDir,
    pub store: Arc<InMemoryReplicaStore>,
    pub repo: Arc<InMemoryRepository>,
    pub manager: ReplicaManager,
}

impl Fixture {
    pub fn new(repo: Arc<InMemoryRepository>) -> Self {
        Self::with_store(repo, Arc::new(InMemoryReplicaStore::new()))
    }

    pub fn with_store(repo: Arc<InMemoryRepository>, store: Arc<InMemoryReplicaStore>) -> Self {
        let staging = tempfile::tempdir().unwrap();
        let config = ReplicateConfig {
            staging_dir: staging.path().to_path_buf(),
            ..ReplicateConfig::default()
        };
        let manager = ReplicaManager::new(&config, repo.clone(), store.clone());
        Self {
            staging,
            store,
            repo,
            manager,
        }
    }
}

pub fn object(repo: &InMemoryRepository, h: &str) -> Option<DigitalObject> {
    repo.find(&handle(h)).unwrap()
}
