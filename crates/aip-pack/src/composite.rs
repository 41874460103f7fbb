use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use aip_bag::{PackageReader, PackageWriter, PayloadSource};
use aip_roles::{export_roles, import_roles, read_roles, roles_to_vec, RoleScope, ROLES_XML};
use aip_types::{Bitstream, DigitalObject, Handle, ObjectKind};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::context::PackContext;
use crate::error::{PackResult, PackerError};
use crate::fields::{apply_metadata, metadata_for};
use crate::properties::{ObjectProperties, OBJECT_PROPERTIES};

pub(crate) const LOGO_BUNDLE: &str = "LOGO";

/// What distinguishes one composite kind from another.
pub(crate) struct CompositeKind {
    pub kind: ObjectKind,
    pub fields: &'static [&'static str],
    pub scope: fn(Uuid) -> RoleScope,
}

/// Payload source for a live bitstream.
pub(crate) fn source_of(bitstream: &Bitstream) -> PayloadSource {
    match &bitstream.fetch_url {
        Some(url) => PayloadSource::FetchUrl(url.clone()),
        None => PayloadSource::Bytes(bitstream.content.clone()),
    }
}

/// Fetch a live object and make sure it has the expected kind.
pub(crate) fn require_kind(
    ctx: &PackContext,
    handle: &Handle,
    kind: ObjectKind,
) -> PackResult<DigitalObject> {
    let object = ctx.require(handle)?;
    if object.kind != kind {
        return Err(PackerError::KindMismatch {
            expected: kind,
            found: object.kind,
        });
    }
    Ok(object)
}

/// Start a writer with the properties and fields common to every package.
pub(crate) fn base_writer(
    object: &DigitalObject,
    fields: Option<&[&str]>,
    dir: &Path,
) -> PackageWriter {
    let mut writer = PackageWriter::new(dir);
    writer
        .add_properties(OBJECT_PROPERTIES, ObjectProperties::of(object).to_lines())
        .extend_metadata(metadata_for(object, fields));
    writer
}

pub(crate) fn pack(
    ctx: &PackContext,
    shape: &CompositeKind,
    handle: &Handle,
    dir: &Path,
) -> PackResult<PathBuf> {
    let object = require_kind(ctx, handle, shape.kind)?;
    let mut writer = base_writer(&object, Some(shape.fields), dir);
    if let Some(logo) = &object.logo {
        writer.set_logo(source_of(logo));
    }
    if ctx.options.include_roles {
        if let Some(roles) = &ctx.roles {
            let graph = export_roles(roles.as_ref(), (shape.scope)(object.id))?;
            writer.add_document(ROLES_XML, roles_to_vec(&graph)?);
        }
    }
    let package = writer.finish(&ctx.options.bag)?;
    info!(%handle, kind = %shape.kind, archive = %package.archive.display(), "packed object");
    Ok(package.archive)
}

/// Open a package, run `apply` against it and clean the extraction on every
/// exit path.
pub(crate) fn with_package<F>(ctx: &PackContext, archive: &Path, apply: F) -> PackResult<()>
where
    F: FnOnce(&PackageReader) -> PackResult<()>,
{
    let mut reader = ctx.open_package(archive)?;
    let result = apply(&reader);
    let cleaned = reader.clean();
    result?;
    cleaned?;
    Ok(())
}

/// Check a package describes `handle` of the given kind.
pub(crate) fn check_properties(
    reader: &PackageReader,
    handle: &Handle,
    kind: ObjectKind,
) -> PackResult<ObjectProperties> {
    let props = ObjectProperties::read(reader)?;
    if props.kind != kind {
        return Err(PackerError::KindMismatch {
            expected: kind,
            found: props.kind,
        });
    }
    if &props.handle != handle {
        return Err(PackerError::Properties(format!(
            "package describes {}, not {handle}",
            props.handle
        )));
    }
    Ok(props)
}

/// Restore the logo and role graph of a composite package.
pub(crate) fn apply_extras(
    ctx: &PackContext,
    reader: &PackageReader,
    object: &DigitalObject,
) -> PackResult<()> {
    if let Some(path) = reader.find_logo() {
        let logo = Bitstream::new(LOGO_BUNDLE, "logo", fs::read(path)?);
        ctx.repository.set_logo(&object.handle, logo)?;
    }
    if let Some(path) = reader.find_document(ROLES_XML) {
        match &ctx.roles {
            Some(roles) => {
                let graph = read_roles(BufReader::new(File::open(path)?))?;
                import_roles(roles.as_ref(), object.id, &graph)?;
            }
            None => warn!(handle = %object.handle, "package has roles but no role service is configured"),
        }
    }
    Ok(())
}

pub(crate) fn unpack(
    ctx: &PackContext,
    shape: &CompositeKind,
    handle: &Handle,
    archive: &Path,
) -> PackResult<()> {
    with_package(ctx, archive, |reader| {
        check_properties(reader, handle, shape.kind)?;
        let object = require_kind(ctx, handle, shape.kind)?;
        let written = apply_metadata(ctx, handle, &reader.read_metadata()?)?;
        apply_extras(ctx, reader, &object)?;
        ctx.repository.update(handle)?;
        debug!(%handle, fields = written, "restored object");
        Ok(())
    })
}
