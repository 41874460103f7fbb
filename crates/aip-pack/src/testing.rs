//! Shared fixtures for packer tests.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use aip_types::{DigitalObject, Handle, ObjectKind};

use crate::context::PackContext;
use crate::fields::COLLECTION_FIELDS;
use crate::memory::InMemoryRepository;
use crate::repository::Repository;

pub fn handle(s: &str) -> Handle {
    Handle::parse(s).unwrap()
}

/// Repository with every descriptive field registered and a bare root.
pub fn repository() -> Arc<InMemoryRepository> {
    let repo = InMemoryRepository::new()
        .with_fields(COLLECTION_FIELDS.iter().copied())
        .with_fields(["dc.title", "dc.contributor.author"]);
    repo.insert(DigitalObject::new(ObjectKind::Root, handle("1/0")));
    Arc::new(repo)
}

pub fn context(repo: &Arc<InMemoryRepository>) -> PackContext {
    PackContext::new(repo.clone())
}

/// Insert `object` and link it under its parent.
pub fn attach(repo: &InMemoryRepository, object: DigitalObject) {
    if let Some(parent) = &object.parent {
        if let Some(owner) = repo.find(parent).unwrap() {
            repo.insert(owner.with_child(object.handle.clone()));
        }
    }
    repo.insert(object);
}

/// Bag directory for `handle` under `root`.
pub fn bag_dir(root: &Path, handle: &Handle) -> PathBuf {
    root.join(handle.safe_id())
}
