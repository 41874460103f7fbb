use aip_types::{DigitalObject, Handle, MetadataElement};
use tracing::{debug, warn};

use crate::context::PackContext;
use crate::error::{PackResult, PackerError};

pub const ROOT_FIELDS: &[&str] = &["name"];

pub const CONTAINER_FIELDS: &[&str] = &[
    "name",
    "short_description",
    "introductory_text",
    "copyright_text",
    "side_bar_text",
];

pub const COLLECTION_FIELDS: &[&str] = &[
    "name",
    "short_description",
    "introductory_text",
    "provenance_description",
    "license",
    "copyright_text",
    "side_bar_text",
];

/// Metadata elements for `object`.
///
/// With a field list only those fields are emitted, in list order, skipping
/// empty values. Without one every field is emitted in name order.
pub fn metadata_for(object: &DigitalObject, fields: Option<&[&str]>) -> Vec<MetadataElement> {
    match fields {
        Some(fields) => fields
            .iter()
            .filter_map(|name| {
                object
                    .field(name)
                    .filter(|v| !v.is_empty())
                    .map(|v| MetadataElement::named(*name, v))
            })
            .collect(),
        None => object
            .metadata
            .iter()
            .map(|(name, value)| MetadataElement::named(name.as_str(), value.as_str()))
            .collect(),
    }
}

/// Write packaged metadata onto a live object, one call per field.
///
/// Every field is checked against the registry before the first write.
pub fn apply_metadata(
    ctx: &PackContext,
    handle: &Handle,
    elements: &[MetadataElement],
) -> PackResult<usize> {
    let repository = &ctx.repository;
    let named: Vec<(&str, &str)> = elements
        .iter()
        .filter_map(|e| match e.name() {
            Some(name) => Some((name, e.body.as_str())),
            None => {
                warn!(%handle, "skipping metadata value without a name");
                None
            }
        })
        .collect();

    for (field, _) in &named {
        if repository.field_registered(field)? {
            continue;
        }
        if !ctx.options.create_metadata_fields {
            return Err(PackerError::UnknownField(field.to_string()));
        }
        repository.register_field(field)?;
        debug!(field, "registered metadata field");
    }

    for (field, value) in &named {
        repository.set_metadata(handle, field, value)?;
    }
    Ok(named.len())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::memory::{InMemoryRepository, RepositoryCall};
    use aip_types::ObjectKind;

    fn handle(s: &str) -> Handle {
        Handle::parse(s).unwrap()
    }

    #[test]
    fn fixed_field_list_skips_missing_and_empty() {
        let object = DigitalObject::new(ObjectKind::Container, handle("1/2"))
            .with_field("short_description", "Dept. of Physics")
            .with_field("name", "Physics")
            .with_field("side_bar_text", "")
            .with_field("not_exported", "x");
        let elements = metadata_for(&object, Some(CONTAINER_FIELDS));
        assert_eq!(
            elements,
            vec![
                MetadataElement::named("name", "Physics"),
                MetadataElement::named("short_description", "Dept. of Physics"),
            ]
        );
    }

    #[test]
    fn all_fields_in_name_order() {
        let object = DigitalObject::new(ObjectKind::Item, handle("1/7"))
            .with_field("dc.title", "Notes")
            .with_field("dc.contributor.author", "Liddell, A.");
        let names: Vec<String> = metadata_for(&object, None)
            .iter()
            .filter_map(|e| e.name().map(str::to_string))
            .collect();
        assert_eq!(names, vec!["dc.contributor.author", "dc.title"]);
    }

    #[test]
    fn unknown_field_fails_before_writes() {
        let repo = Arc::new(InMemoryRepository::new().with_fields(["name"]));
        let h = handle("1/2");
        repo.insert(DigitalObject::new(ObjectKind::Container, h.clone()));
        let ctx = PackContext::new(repo.clone());

        let err = apply_metadata(
            &ctx,
            &h,
            &[
                MetadataElement::named("name", "Physics"),
                MetadataElement::named("license", "CC0"),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, PackerError::UnknownField(f) if f == "license"));
        assert!(repo.calls().is_empty());
    }

    #[test]
    fn unknown_field_registered_when_allowed() {
        let repo = Arc::new(InMemoryRepository::new());
        let h = handle("1/2");
        repo.insert(DigitalObject::new(ObjectKind::Container, h.clone()));
        let mut ctx = PackContext::new(repo.clone());
        ctx.options.create_metadata_fields = true;

        let written = apply_metadata(&ctx, &h, &[MetadataElement::named("license", "CC0")]).unwrap();
        assert_eq!(written, 1);
        assert_eq!(
            repo.calls(),
            vec![
                RepositoryCall::RegisterField("license".into()),
                RepositoryCall::SetMetadata {
                    handle: h.clone(),
                    field: "license".into(),
                    value: "CC0".into(),
                },
            ]
        );
    }
}
