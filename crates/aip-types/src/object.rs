use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TypeError;
use crate::handle::Handle;

/// The kind of repository object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    /// The repository itself; parent of top-level containers.
    Root,
    /// Holds nested containers and collections.
    Container,
    /// Holds items.
    Collection,
    /// Leaf record with payloads.
    Item,
}

impl ObjectKind {
    /// The tag written to the `objectType` property.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Container => "container",
            Self::Collection => "collection",
            Self::Item => "item",
        }
    }

    /// Returns `true` for kinds that own child objects.
    pub fn is_composite(&self) -> bool {
        !matches!(self, Self::Item)
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectKind {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "root" => Ok(Self::Root),
            "container" => Ok(Self::Container),
            "collection" => Ok(Self::Collection),
            "item" => Ok(Self::Item),
            other => Err(TypeError::UnknownKind(other.to_string())),
        }
    }
}

/// A binary payload entry of an object.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bitstream {
    pub id: Uuid,
    /// Logical bundle the payload belongs to (e.g. `ORIGINAL`).
    pub bundle: String,
    /// Original file name.
    pub name: String,
    pub description: Option<String>,
    pub mime_type: Option<String>,
    /// File extension hint, without a leading dot.
    pub extension: Option<String>,
    pub content: Vec<u8>,
    /// Set when the payload must be fetched by reference instead of inlined.
    pub fetch_url: Option<String>,
}

impl Bitstream {
    /// Create an inline payload, taking the extension from `name`.
    pub fn new(bundle: impl Into<String>, name: impl Into<String>, content: Vec<u8>) -> Self {
        let name = name.into();
        let extension = name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| !ext.is_empty());
        Self {
            id: Uuid::new_v4(),
            bundle: bundle.into(),
            name,
            description: None,
            mime_type: None,
            extension,
            content,
            fetch_url: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn with_fetch_url(mut self, url: impl Into<String>) -> Self {
        self.fetch_url = Some(url.into());
        self
    }

    /// Size of the payload in bytes.
    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }
}

impl fmt::Debug for Bitstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bitstream")
            .field("id", &self.id)
            .field("bundle", &self.bundle)
            .field("name", &self.name)
            .field("size", &self.size())
            .finish()
    }
}

/// Read-only snapshot of one node of the repository tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigitalObject {
    pub id: Uuid,
    pub kind: ObjectKind,
    pub handle: Handle,
    pub parent: Option<Handle>,
    /// Sub-containers and collections for containers, items for collections.
    pub children: Vec<Handle>,
    pub metadata: BTreeMap<String, String>,
    pub bitstreams: Vec<Bitstream>,
    pub logo: Option<Bitstream>,
}

impl DigitalObject {
    pub fn new(kind: ObjectKind, handle: Handle) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            handle,
            parent: None,
            children: Vec::new(),
            metadata: BTreeMap::new(),
            bitstreams: Vec::new(),
            logo: None,
        }
    }

    pub fn with_parent(mut self, parent: Handle) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_child(mut self, child: Handle) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(name.into(), value.into());
        self
    }

    pub fn with_logo(mut self, logo: Bitstream) -> Self {
        self.logo = Some(logo);
        self
    }

    pub fn with_bitstream(mut self, bitstream: Bitstream) -> Self {
        self.bitstreams.push(bitstream);
        self
    }

    /// Look up a metadata field.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.metadata.get(name).map(String::as_str)
    }

    /// Size of the logo in bytes, zero when absent.
    pub fn logo_size(&self) -> u64 {
        self.logo.as_ref().map(Bitstream::size).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(s: &str) -> Handle {
        Handle::parse(s).unwrap()
    }

    #[test]
    fn kind_string_roundtrip() {
        for kind in [
            ObjectKind::Root,
            ObjectKind::Container,
            ObjectKind::Collection,
            ObjectKind::Item,
        ] {
            assert_eq!(kind.as_str().parse::<ObjectKind>().unwrap(), kind);
        }
    }

    #[test]
    fn unknown_kind() {
        let err = "community".parse::<ObjectKind>().unwrap_err();
        assert_eq!(err, TypeError::UnknownKind("community".into()));
    }

    #[test]
    fn composite_kinds() {
        assert!(ObjectKind::Container.is_composite());
        assert!(!ObjectKind::Item.is_composite());
    }

    #[test]
    fn bitstream_extension_from_name() {
        let b = Bitstream::new("ORIGINAL", "thesis.PDF", vec![1, 2, 3]);
        assert_eq!(b.extension.as_deref(), Some("pdf"));
        assert_eq!(b.size(), 3);

        let b = Bitstream::new("ORIGINAL", "README", vec![]);
        assert!(b.extension.is_none());
    }

    #[test]
    fn object_builder() {
        let obj = DigitalObject::new(ObjectKind::Container, handle("1/1"))
            .with_parent(handle("1/0"))
            .with_child(handle("1/2"))
            .with_field("name", "Physics")
            .with_logo(Bitstream::new("LOGO", "logo.png", vec![0; 10]));
        assert_eq!(obj.field("name"), Some("Physics"));
        assert_eq!(obj.children.len(), 1);
        assert_eq!(obj.logo_size(), 10);
    }

    #[test]
    fn logo_size_defaults_to_zero() {
        let obj = DigitalObject::new(ObjectKind::Collection, handle("1/3"));
        assert_eq!(obj.logo_size(), 0);
    }
}
