use std::path::{Path, PathBuf};

use aip_types::{DigitalObject, Handle, ObjectKind};
use serde::{Deserialize, Serialize};

use crate::collection::CollectionPacker;
use crate::container::ContainerPacker;
use crate::context::PackContext;
use crate::error::PackResult;
use crate::item::ItemPacker;
use crate::root::RootPacker;

/// Whether a size computation descends into children.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeMode {
    #[default]
    Recursive,
    NoRecurse,
}

/// Build, apply and size packages for one object.
pub trait Pack {
    /// Package the object into `dir` and return the serialized archive.
    fn pack(&self, ctx: &PackContext, dir: &Path) -> PackResult<PathBuf>;

    /// Apply a package onto the live object, which must already exist.
    fn unpack(&self, ctx: &PackContext, archive: &Path) -> PackResult<()>;

    /// Bytes the object (and, unless `NoRecurse`, its subtree) would package.
    fn size(&self, ctx: &PackContext, mode: SizeMode) -> PackResult<u64>;
}

/// Packer for any object kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Packer {
    Root(RootPacker),
    Container(ContainerPacker),
    Collection(CollectionPacker),
    Item(ItemPacker),
}

impl Packer {
    pub fn for_kind(kind: ObjectKind, handle: Handle) -> Self {
        match kind {
            ObjectKind::Root => Self::Root(RootPacker::new(handle)),
            ObjectKind::Container => Self::Container(ContainerPacker::new(handle)),
            ObjectKind::Collection => Self::Collection(CollectionPacker::new(handle)),
            ObjectKind::Item => Self::Item(ItemPacker::new(handle)),
        }
    }

    pub fn for_object(object: &DigitalObject) -> Self {
        Self::for_kind(object.kind, object.handle.clone())
    }

    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::Root(_) => ObjectKind::Root,
            Self::Container(_) => ObjectKind::Container,
            Self::Collection(_) => ObjectKind::Collection,
            Self::Item(_) => ObjectKind::Item,
        }
    }

    pub fn handle(&self) -> &Handle {
        match self {
            Self::Root(p) => p.handle(),
            Self::Container(p) => p.handle(),
            Self::Collection(p) => p.handle(),
            Self::Item(p) => p.handle(),
        }
    }

    fn inner(&self) -> &dyn Pack {
        match self {
            Self::Root(p) => p,
            Self::Container(p) => p,
            Self::Collection(p) => p,
            Self::Item(p) => p,
        }
    }
}

impl Pack for Packer {
    fn pack(&self, ctx: &PackContext, dir: &Path) -> PackResult<PathBuf> {
        self.inner().pack(ctx, dir)
    }

    fn unpack(&self, ctx: &PackContext, archive: &Path) -> PackResult<()> {
        self.inner().unpack(ctx, archive)
    }

    fn size(&self, ctx: &PackContext, mode: SizeMode) -> PackResult<u64> {
        self.inner().size(ctx, mode)
    }
}

/// Total size of the children of `object`, each measured recursively.
pub(crate) fn children_size(ctx: &PackContext, object: &DigitalObject) -> PackResult<u64> {
    let mut total = 0;
    for child in &object.children {
        let child = ctx.require(child)?;
        total += Packer::for_object(&child).size(ctx, SizeMode::Recursive)?;
    }
    Ok(total)
}
