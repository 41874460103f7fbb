//! Per-object-type packers.
//!
//! Each repository object kind has a packer that knows which of its fields,
//! payloads and role assignments go into a package, and how to write them
//! back. [`Packer`] dispatches over the four kinds:
//!
//! | Kind | Packed | Children |
//! |---|---|---|
//! | Root | name, full role graph | top-level containers |
//! | Container | descriptive fields, logo, scoped roles | containers and collections |
//! | Collection | descriptive fields, logo, scoped roles | items |
//! | Item | every field, filtered payloads | none |
//!
//! Composite objects are never inlined: each child is packaged on its own and
//! linked back through the `ownerId` and `childIds` properties.
//!
//! The host repository is reached only through the [`Repository`] trait;
//! [`InMemoryRepository`] implements it for tests and embedding.

pub mod collection;
mod composite;
pub mod container;
pub mod context;
pub mod error;
pub mod fields;
pub mod item;
pub mod memory;
pub mod packer;
pub mod properties;
pub mod repository;
pub mod root;
#[cfg(test)]
mod testing;

pub use collection::CollectionPacker;
pub use container::ContainerPacker;
pub use context::{PackContext, PackOptions};
pub use error::{PackResult, PackerError};
pub use item::ItemPacker;
pub use memory::{InMemoryRepository, RepositoryCall};
pub use packer::{Pack, Packer, SizeMode};
pub use properties::{ObjectProperties, OBJECT_PROPERTIES};
pub use repository::Repository;
pub use root::RootPacker;
