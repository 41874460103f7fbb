use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};

/// Digest algorithm used for package manifests.
///
/// The lowercase name doubles as the manifest suffix, so SHA-256 manifests
/// are written to `manifest-sha256.txt`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    #[default]
    Sha256,
    Sha512,
}

impl DigestAlgorithm {
    /// Name as used in manifest file names.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
        }
    }

    /// Start a new incremental hash.
    pub fn hasher(&self) -> Hasher {
        match self {
            Self::Sha256 => Hasher::Sha256(Sha256::new()),
            Self::Sha512 => Hasher::Sha512(Sha512::new()),
        }
    }

    /// Hash a byte slice in one shot, returning lowercase hex.
    pub fn hash_hex(&self, data: &[u8]) -> String {
        let mut hasher = self.hasher();
        hasher.update(data);
        hasher.finalize_hex()
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(Self::Sha256),
            "sha512" | "sha-512" => Ok(Self::Sha512),
            other => Err(DigestError::UnknownAlgorithm(other.to_string())),
        }
    }
}

/// Incremental hash state for one of the supported algorithms.
#[derive(Clone)]
pub enum Hasher {
    Sha256(Sha256),
    Sha512(Sha512),
}

impl Hasher {
    pub fn update(&mut self, data: &[u8]) {
        match self {
            Self::Sha256(h) => h.update(data),
            Self::Sha512(h) => h.update(data),
        }
    }

    /// Consume the state and return the lowercase hex digest.
    pub fn finalize_hex(self) -> String {
        match self {
            Self::Sha256(h) => hex::encode(h.finalize()),
            Self::Sha512(h) => hex::encode(h.finalize()),
        }
    }
}

/// Hash everything readable from `reader`.
pub fn digest_reader<R: Read>(algorithm: DigestAlgorithm, mut reader: R) -> io::Result<String> {
    let mut hasher = algorithm.hasher();
    let mut buf = [0u8; 8192];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize_hex())
}

/// Hash the contents of a file on disk.
pub fn digest_file(algorithm: DigestAlgorithm, path: &Path) -> io::Result<String> {
    let file = File::open(path)?;
    digest_reader(algorithm, BufReader::new(file))
}

/// Errors from digest configuration.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DigestError {
    #[error("unknown digest algorithm: {0}")]
    UnknownAlgorithm(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        let a = DigestAlgorithm::Sha256.hash_hex(b"hello world");
        let b = DigestAlgorithm::Sha256.hash_hex(b"hello world");
        assert_eq!(a, b);
    }

    #[test]
    fn sha256_known_vector() {
        assert_eq!(
            DigestAlgorithm::Sha256.hash_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn digest_lengths() {
        assert_eq!(DigestAlgorithm::Sha256.hash_hex(b"x").len(), 64);
        assert_eq!(DigestAlgorithm::Sha512.hash_hex(b"x").len(), 128);
    }

    #[test]
    fn parse_names() {
        assert_eq!("SHA256".parse::<DigestAlgorithm>().unwrap(), DigestAlgorithm::Sha256);
        assert_eq!("sha-512".parse::<DigestAlgorithm>().unwrap(), DigestAlgorithm::Sha512);
        assert_eq!(
            "md5".parse::<DigestAlgorithm>().unwrap_err(),
            DigestError::UnknownAlgorithm("md5".into())
        );
    }

    #[test]
    fn incremental_matches_one_shot() {
        let mut h = DigestAlgorithm::Sha512.hasher();
        h.update(b"hello ");
        h.update(b"world");
        assert_eq!(h.finalize_hex(), DigestAlgorithm::Sha512.hash_hex(b"hello world"));
    }

    #[test]
    fn digest_file_matches_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.bin");
        std::fs::write(&path, b"payload bytes").unwrap();
        assert_eq!(
            digest_file(DigestAlgorithm::Sha256, &path).unwrap(),
            DigestAlgorithm::Sha256.hash_hex(b"payload bytes")
        );
    }
}
