//! BagIt packages for repository objects.
//!
//! A package holds exactly one object: its properties, a metadata document,
//! payload files grouped by bundle, an optional logo and extra documents such
//! as a role graph. Every file under `data/` is digested as it is written and
//! listed in `manifest-<alg>.txt`; the tag files are listed in
//! `tagmanifest-<alg>.txt`.
//!
//! # Layout
//!
//! ```text
//! <safe-id>/
//!   bagit.txt
//!   bag-info.txt
//!   manifest-sha256.txt
//!   tagmanifest-sha256.txt
//!   data/
//!     object.properties
//!     metadata.xml
//!     logo
//!     roles.xml
//!     ORIGINAL/
//!       bitstream_<id>.pdf
//!       bitstream_<id>-metadata.xml
//! ```
//!
//! The finished directory is serialized into a single archive
//! ([`ArchiveFormat`]) and removed. [`PackageReader`] extracts an archive into
//! a temporary directory and exposes each part.

pub mod archive;
pub mod error;
pub mod reader;
pub mod tags;
pub mod writer;
pub mod xml;

pub use archive::ArchiveFormat;
pub use error::{BagError, BagResult};
pub use reader::{PackageReader, PayloadEntry, VerifyReport};
pub use tags::{BagConfig, TagFiles};
pub use writer::{BagPayload, PackageFile, PackageWriter, PayloadSource};
