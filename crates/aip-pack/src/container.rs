use std::path::{Path, PathBuf};

use aip_roles::RoleScope;
use aip_types::{Handle, ObjectKind};

use crate::composite::{self, CompositeKind};
use crate::context::PackContext;
use crate::error::PackResult;
use crate::fields::CONTAINER_FIELDS;
use crate::packer::{children_size, Pack, SizeMode};

const CONTAINER: CompositeKind = CompositeKind {
    kind: ObjectKind::Container,
    fields: CONTAINER_FIELDS,
    scope: RoleScope::Container,
};

/// Packs a container: its own fields, logo and roles. Sub-containers and
/// collections get packages of their own.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContainerPacker {
    handle: Handle,
}

impl ContainerPacker {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }
}

impl Pack for ContainerPacker {
    fn pack(&self, ctx: &PackContext, dir: &Path) -> PackResult<PathBuf> {
        composite::pack(ctx, &CONTAINER, &self.handle, dir)
    }

    fn unpack(&self, ctx: &PackContext, archive: &Path) -> PackResult<()> {
        composite::unpack(ctx, &CONTAINER, &self.handle, archive)
    }

    fn size(&self, ctx: &PackContext, mode: SizeMode) -> PackResult<u64> {
        let object = composite::require_kind(ctx, &self.handle, ObjectKind::Container)?;
        let mut total = object.logo_size();
        if mode == SizeMode::Recursive {
            total += children_size(ctx, &object)?;
        }
        Ok(total)
    }
}
