use std::path::{Path, PathBuf};

use aip_roles::RoleScope;
use aip_types::{Handle, ObjectKind};

use crate::composite::{self, CompositeKind};
use crate::context::PackContext;
use crate::error::PackResult;
use crate::fields::COLLECTION_FIELDS;
use crate::packer::{children_size, Pack, SizeMode};

const COLLECTION: CompositeKind = CompositeKind {
    kind: ObjectKind::Collection,
    fields: COLLECTION_FIELDS,
    scope: RoleScope::Collection,
};

/// Packs a collection: its own fields, logo and roles. Items get packages
/// of their own.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollectionPacker {
    handle: Handle,
}

impl CollectionPacker {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }
}

impl Pack for CollectionPacker {
    fn pack(&self, ctx: &PackContext, dir: &Path) -> PackResult<PathBuf> {
        composite::pack(ctx, &COLLECTION, &self.handle, dir)
    }

    fn unpack(&self, ctx: &PackContext, archive: &Path) -> PackResult<()> {
        composite::unpack(ctx, &COLLECTION, &self.handle, archive)
    }

    fn size(&self, ctx: &PackContext, mode: SizeMode) -> PackResult<u64> {
        let object = composite::require_kind(ctx, &self.handle, ObjectKind::Collection)?;
        let mut total = object.logo_size();
        if mode == SizeMode::Recursive {
            total += children_size(ctx, &object)?;
        }
        Ok(total)
    }
}
