//! Foundation types for archival package replication.
//!
//! This crate provides the identity and structural types shared by every
//! other crate in the workspace.
//!
//! # Key Types
//!
//! - [`Handle`] — persistent identifier of a repository object
//! - [`ReplicaRef`] — store key derived from a handle and an archive extension
//! - [`ObjectKind`] — Root, Container, Collection, or Item
//! - [`DigitalObject`] — read-only snapshot of one node of the repository tree
//! - [`Bitstream`] — a binary payload entry within a bundle
//! - [`MetadataElement`] — a name-attributed value in a metadata document

pub mod error;
pub mod handle;
pub mod metadata;
pub mod object;

pub use error::TypeError;
pub use handle::{safe_id, unsafe_id, Handle, ReplicaRef};
pub use metadata::{MetadataElement, NAME_ATTRIBUTE};
pub use object::{Bitstream, DigitalObject, ObjectKind};
