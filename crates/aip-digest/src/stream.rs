use std::io::{self, Write};
use std::path::PathBuf;

use crate::algorithm::{DigestAlgorithm, Hasher};

/// Digest and byte count of one file written into a package.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileDigest {
    /// Path relative to the package root, e.g. `data/metadata.xml`.
    pub path: PathBuf,
    /// Lowercase hex digest of the bytes written.
    pub digest: String,
    pub bytes: u64,
}

/// Output stream that hashes and counts everything written through it.
///
/// Only bytes accepted by the inner writer are hashed, so the digest always
/// describes what reached the destination.
pub struct DigestWriter<W: Write> {
    inner: W,
    hasher: Hasher,
    count: u64,
}

impl<W: Write> DigestWriter<W> {
    pub fn new(inner: W, algorithm: DigestAlgorithm) -> Self {
        Self {
            inner,
            hasher: algorithm.hasher(),
            count: 0,
        }
    }

    /// Bytes written so far.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Flush the inner writer and return it with the hex digest and byte
    /// count.
    pub fn finish(mut self) -> io::Result<(W, String, u64)> {
        self.inner.flush()?;
        Ok((self.inner, self.hasher.finalize_hex(), self.count))
    }
}

impl<W: Write> Write for DigestWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        self.count += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Writer that accepts at most `limit` bytes per call.
    struct Trickle {
        data: Vec<u8>,
        limit: usize,
    }

    impl Write for Trickle {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let n = buf.len().min(self.limit);
            self.data.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn digest_matches_written_bytes() {
        let mut w = DigestWriter::new(Vec::new(), DigestAlgorithm::Sha256);
        w.write_all(b"name  value\n").unwrap();
        let (inner, digest, count) = w.finish().unwrap();
        assert_eq!(inner, b"name  value\n");
        assert_eq!(count, 12);
        assert_eq!(digest, DigestAlgorithm::Sha256.hash_hex(b"name  value\n"));
    }

    #[test]
    fn partial_writes_are_hashed_exactly() {
        let sink = Trickle {
            data: Vec::new(),
            limit: 3,
        };
        let mut w = DigestWriter::new(sink, DigestAlgorithm::Sha256);
        w.write_all(b"abcdefghij").unwrap();
        assert_eq!(w.count(), 10);
        let (inner, digest, _) = w.finish().unwrap();
        assert_eq!(inner.data, b"abcdefghij");
        assert_eq!(digest, DigestAlgorithm::Sha256.hash_hex(b"abcdefghij"));
    }

    #[test]
    fn copy_through_writer() {
        let payload = vec![0xABu8; 100_000];
        let mut w = DigestWriter::new(Vec::new(), DigestAlgorithm::Sha512);
        let copied = io::copy(&mut payload.as_slice(), &mut w).unwrap();
        assert_eq!(copied, 100_000);
        let (_, digest, count) = w.finish().unwrap();
        assert_eq!(count, 100_000);
        assert_eq!(digest, DigestAlgorithm::Sha512.hash_hex(&payload));
    }

    #[test]
    fn empty_stream() {
        let w = DigestWriter::new(Vec::new(), DigestAlgorithm::Sha256);
        let (_, digest, count) = w.finish().unwrap();
        assert_eq!(count, 0);
        assert_eq!(digest, DigestAlgorithm::Sha256.hash_hex(b""));
    }
}
