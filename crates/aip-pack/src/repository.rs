use aip_types::{Bitstream, DigitalObject, Handle, ObjectKind};

use crate::error::PackResult;

/// Domain services of the host repository.
///
/// Reads return owned snapshots; writes go straight to the live object and
/// become durable on [`update`](Self::update).
pub trait Repository: Send + Sync {
    fn find(&self, handle: &Handle) -> PackResult<Option<DigitalObject>>;

    fn exists(&self, handle: &Handle) -> PackResult<bool> {
        Ok(self.find(handle)?.is_some())
    }

    /// Create an empty object under `parent` and return it.
    ///
    /// Fails with [`PackerError::MissingParent`](crate::PackerError::MissingParent)
    /// when the parent is not live.
    fn create(
        &self,
        kind: ObjectKind,
        handle: &Handle,
        parent: Option<&Handle>,
    ) -> PackResult<DigitalObject>;

    /// Remove every metadata field, payload and the logo of an object.
    fn clear(&self, handle: &Handle) -> PackResult<()>;

    fn set_metadata(&self, handle: &Handle, field: &str, value: &str) -> PackResult<()>;

    /// Whether the field exists in the metadata registry.
    fn field_registered(&self, field: &str) -> PackResult<bool>;

    fn register_field(&self, field: &str) -> PackResult<()>;

    fn set_logo(&self, handle: &Handle, logo: Bitstream) -> PackResult<()>;

    /// Add a payload, replacing any payload with the same id.
    fn add_bitstream(&self, handle: &Handle, bitstream: Bitstream) -> PackResult<()>;

    fn update(&self, handle: &Handle) -> PackResult<()>;
}
