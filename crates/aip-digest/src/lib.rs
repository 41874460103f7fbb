//! Streaming digests for archival packages.
//!
//! Every file a package writer produces passes through a [`DigestWriter`],
//! which hashes and counts the bytes actually written to disk. Running totals
//! for a whole package are kept in a [`PayloadTally`].
//!
//! All hashing wraps the `sha2` crate.

pub mod algorithm;
pub mod stream;
pub mod tally;

pub use algorithm::{digest_file, digest_reader, DigestAlgorithm, DigestError, Hasher};
pub use stream::{DigestWriter, FileDigest};
pub use tally::{display_size, PayloadTally};
