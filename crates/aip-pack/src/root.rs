use std::path::{Path, PathBuf};

use aip_roles::RoleScope;
use aip_types::{Handle, ObjectKind};

use crate::composite::{self, CompositeKind};
use crate::context::PackContext;
use crate::error::PackResult;
use crate::fields::ROOT_FIELDS;
use crate::packer::{children_size, Pack, SizeMode};

const ROOT: CompositeKind = CompositeKind {
    kind: ObjectKind::Root,
    fields: ROOT_FIELDS,
    scope: root_scope,
};

fn root_scope(_: uuid::Uuid) -> RoleScope {
    RoleScope::Root
}

/// Packs the repository itself: its name, the full role graph and the list
/// of top-level containers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RootPacker {
    handle: Handle,
}

impl RootPacker {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }
}

impl Pack for RootPacker {
    fn pack(&self, ctx: &PackContext, dir: &Path) -> PackResult<PathBuf> {
        composite::pack(ctx, &ROOT, &self.handle, dir)
    }

    fn unpack(&self, ctx: &PackContext, archive: &Path) -> PackResult<()> {
        composite::unpack(ctx, &ROOT, &self.handle, archive)
    }

    fn size(&self, ctx: &PackContext, mode: SizeMode) -> PackResult<u64> {
        let object = composite::require_kind(ctx, &self.handle, ObjectKind::Root)?;
        let mut total = object.logo_size();
        if mode == SizeMode::Recursive {
            total += children_size(ctx, &object)?;
        }
        Ok(total)
    }
}
