use std::fs;
use std::path::{Path, PathBuf};

use aip_bag::{BagPayload, PackageReader, PayloadEntry};
use aip_types::{Bitstream, DigitalObject, Handle, MetadataElement, ObjectKind};
use tracing::{debug, info};
use uuid::Uuid;

use crate::composite::{self, source_of};
use crate::context::PackContext;
use crate::error::PackResult;
use crate::fields::apply_metadata;
use crate::packer::{Pack, SizeMode};

/// Packs an item: every metadata field and its payloads, filtered by the
/// configured bundle list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemPacker {
    handle: Handle,
}

impl ItemPacker {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }
}

fn payload_metadata(bitstream: &Bitstream) -> Vec<MetadataElement> {
    let mut xml = vec![MetadataElement::named("name", bitstream.name.as_str())];
    if let Some(description) = &bitstream.description {
        xml.push(MetadataElement::named("description", description.as_str()));
    }
    if let Some(mime_type) = &bitstream.mime_type {
        xml.push(MetadataElement::named("mime_type", mime_type.as_str()));
    }
    xml.push(MetadataElement::named("bundle", bitstream.bundle.as_str()));
    xml
}

fn restore_bitstream(entry: &PayloadEntry) -> PackResult<Bitstream> {
    let file_name = entry
        .path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = entry.field("name").map(str::to_string).unwrap_or(file_name);
    let mut bitstream = Bitstream::new(entry.bundle.clone(), name, fs::read(&entry.path)?);
    if let Ok(id) = Uuid::parse_str(&entry.id) {
        bitstream.id = id;
    }
    bitstream.description = entry.field("description").map(str::to_string);
    bitstream.mime_type = entry.field("mime_type").map(str::to_string);
    Ok(bitstream)
}

fn apply(ctx: &PackContext, handle: &Handle, reader: &PackageReader) -> PackResult<()> {
    composite::check_properties(reader, handle, ObjectKind::Item)?;
    composite::require_kind(ctx, handle, ObjectKind::Item)?;
    let written = apply_metadata(ctx, handle, &reader.read_metadata()?)?;
    let mut payloads = 0;
    for entry in reader.payloads()? {
        ctx.repository.add_bitstream(handle, restore_bitstream(&entry)?)?;
        payloads += 1;
    }
    ctx.repository.update(handle)?;
    debug!(%handle, fields = written, payloads, "restored item");
    Ok(())
}

fn packed_bitstreams<'a>(
    ctx: &'a PackContext,
    object: &'a DigitalObject,
) -> impl Iterator<Item = &'a Bitstream> + 'a {
    object
        .bitstreams
        .iter()
        .filter(move |b| ctx.options.accepts_bundle(&b.bundle))
}

impl Pack for ItemPacker {
    fn pack(&self, ctx: &PackContext, dir: &Path) -> PackResult<PathBuf> {
        let object = composite::require_kind(ctx, &self.handle, ObjectKind::Item)?;
        let mut writer = composite::base_writer(&object, None, dir);
        for bitstream in packed_bitstreams(ctx, &object) {
            writer.add_payload(BagPayload {
                id: bitstream.id.to_string(),
                bundle: bitstream.bundle.clone(),
                extension: bitstream.extension.clone(),
                xml: payload_metadata(bitstream),
                source: source_of(bitstream),
            });
        }
        let package = writer.finish(&ctx.options.bag)?;
        info!(handle = %self.handle, archive = %package.archive.display(), "packed item");
        Ok(package.archive)
    }

    fn unpack(&self, ctx: &PackContext, archive: &Path) -> PackResult<()> {
        composite::with_package(ctx, archive, |reader| apply(ctx, &self.handle, reader))
    }

    /// Items have no children, so both modes measure the packed payloads.
    fn size(&self, ctx: &PackContext, _mode: SizeMode) -> PackResult<u64> {
        let object = composite::require_kind(ctx, &self.handle, ObjectKind::Item)?;
        Ok(packed_bitstreams(ctx, &object).map(Bitstream::size).sum())
    }
}

#[cfg(test)]
mod tests {
    use aip_bag::BagError;

    use super::*;
    use crate::error::PackerError;
    use crate::repository::Repository;
    use crate::testing::{attach, bag_dir, context, handle, repository};

    fn thesis() -> DigitalObject {
        DigitalObject::new(ObjectKind::Item, handle("1/5"))
            .with_parent(handle("1/2"))
            .with_field("dc.title", "On Quanta")
            .with_field("dc.contributor.author", "Liddell, A.")
            .with_bitstream(
                Bitstream::new("ORIGINAL", "thesis.pdf", b"%PDF-1.4 body".to_vec())
                    .with_description("Full text")
                    .with_mime_type("application/pdf"),
            )
            .with_bitstream(Bitstream::new("THUMBNAIL", "thesis.jpg", b"jpeg".to_vec()))
    }

    fn source() -> std::sync::Arc<crate::memory::InMemoryRepository> {
        let repo = repository();
        attach(
            &repo,
            DigitalObject::new(ObjectKind::Collection, handle("1/2")).with_parent(handle("1/0")),
        );
        attach(&repo, thesis());
        repo
    }

    #[test]
    fn payloads_roundtrip() {
        let repo = source();
        let original = repo.find(&handle("1/5")).unwrap().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        let archive = ItemPacker::new(handle("1/5"))
            .pack(&context(&repo), &bag_dir(tmp.path(), &handle("1/5")))
            .unwrap();

        let target = repository();
        target
            .create(ObjectKind::Item, &handle("1/5"), None)
            .unwrap();
        ItemPacker::new(handle("1/5"))
            .unpack(&context(&target), &archive)
            .unwrap();

        let restored = target.find(&handle("1/5")).unwrap().unwrap();
        assert_eq!(restored.metadata, original.metadata);
        assert_eq!(restored.bitstreams.len(), 2);
        let pdf = restored
            .bitstreams
            .iter()
            .find(|b| b.bundle == "ORIGINAL")
            .unwrap();
        assert_eq!(pdf.id, original.bitstreams[0].id);
        assert_eq!(pdf.name, "thesis.pdf");
        assert_eq!(pdf.content, b"%PDF-1.4 body");
        assert_eq!(pdf.description.as_deref(), Some("Full text"));
        assert_eq!(pdf.mime_type.as_deref(), Some("application/pdf"));
    }

    #[test]
    fn content_filter_limits_bundles() {
        let repo = source();
        let mut ctx = context(&repo);
        ctx.options.content_filter = Some(vec!["ORIGINAL".into()]);
        let packer = ItemPacker::new(handle("1/5"));
        assert_eq!(packer.size(&ctx, SizeMode::Recursive).unwrap(), 13);

        let tmp = tempfile::tempdir().unwrap();
        let archive = packer
            .pack(&ctx, &bag_dir(tmp.path(), &handle("1/5")))
            .unwrap();
        let reader = PackageReader::open(&archive).unwrap();
        let payloads = reader.payloads().unwrap();
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0].bundle, "ORIGINAL");
    }

    #[test]
    fn size_ignores_mode() {
        let repo = source();
        let ctx = context(&repo);
        let packer = ItemPacker::new(handle("1/5"));
        assert_eq!(packer.size(&ctx, SizeMode::Recursive).unwrap(), 17);
        assert_eq!(packer.size(&ctx, SizeMode::NoRecurse).unwrap(), 17);
    }

    #[test]
    fn fetch_url_payloads_are_unsupported() {
        let repo = repository();
        attach(
            &repo,
            DigitalObject::new(ObjectKind::Item, handle("1/6")).with_bitstream(
                Bitstream::new("ORIGINAL", "big.iso", Vec::new())
                    .with_fetch_url("https://example.org/big.iso"),
            ),
        );
        let tmp = tempfile::tempdir().unwrap();
        let dir = bag_dir(tmp.path(), &handle("1/6"));
        let err = ItemPacker::new(handle("1/6"))
            .pack(&context(&repo), &dir)
            .unwrap_err();
        assert!(matches!(err, PackerError::Bag(BagError::Unsupported(_))));
        assert!(!dir.exists());
    }

    #[test]
    fn unknown_fields_abort_before_any_write() {
        let repo = source();
        let tmp = tempfile::tempdir().unwrap();
        let archive = ItemPacker::new(handle("1/5"))
            .pack(&context(&repo), &bag_dir(tmp.path(), &handle("1/5")))
            .unwrap();

        let target = std::sync::Arc::new(crate::memory::InMemoryRepository::new());
        target
            .create(ObjectKind::Item, &handle("1/5"), None)
            .unwrap();
        target.clear_calls();
        let err = ItemPacker::new(handle("1/5"))
            .unpack(&context(&target), &archive)
            .unwrap_err();
        assert!(matches!(err, PackerError::UnknownField(_)));
        assert!(target.calls().is_empty());
    }
}
