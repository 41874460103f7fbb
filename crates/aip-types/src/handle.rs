use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Persistent identifier of a repository object, e.g. `123456789/2`.
///
/// Handles are stable across repositories and are the only identifier
/// recorded inside a package. They may contain `/` and other characters that
/// are unsafe in file names, so store keys go through [`safe_id`].
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Handle(String);

impl Handle {
    /// Parse a handle, rejecting empty values and whitespace.
    pub fn parse(value: impl Into<String>) -> Result<Self, TypeError> {
        let value = value.into();
        if value.is_empty() {
            return Err(TypeError::InvalidHandle {
                value,
                reason: "handle must not be empty".into(),
            });
        }
        if let Some(ch) = value.chars().find(|c| c.is_whitespace() || c.is_control()) {
            return Err(TypeError::InvalidHandle {
                reason: format!("contains forbidden character: {ch:?}"),
                value,
            });
        }
        Ok(Self(value))
    }

    /// The handle as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The filesystem-safe form of this handle.
    pub fn safe_id(&self) -> String {
        safe_id(&self.0)
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({})", self.0)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Handle {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Handle {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Handle> for String {
    fn from(handle: Handle) -> Self {
        handle.0
    }
}

/// Map a persistent identifier to a file- and URL-safe token.
///
/// `/` becomes `-`; a literal `-` or `%` and any byte outside
/// `[A-Za-z0-9._]` is percent-encoded, so the mapping is injective and
/// reversible with [`unsafe_id`].
pub fn safe_id(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    for byte in id.bytes() {
        match byte {
            b'/' => out.push('-'),
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'.' | b'_' => out.push(byte as char),
            other => out.push_str(&format!("%{other:02X}")),
        }
    }
    out
}

/// Reverse of [`safe_id`].
pub fn unsafe_id(safe: &str) -> Result<String, TypeError> {
    let bytes = safe.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut pos = 0;
    while pos < bytes.len() {
        match bytes[pos] {
            b'-' => {
                out.push(b'/');
                pos += 1;
            }
            b'%' => {
                let digits = safe
                    .get(pos + 1..pos + 3)
                    .ok_or_else(|| TypeError::InvalidEscape(safe.to_string()))?;
                let byte = u8::from_str_radix(digits, 16)
                    .map_err(|_| TypeError::InvalidEscape(safe.to_string()))?;
                out.push(byte);
                pos += 3;
            }
            other => {
                out.push(other);
                pos += 1;
            }
        }
    }
    String::from_utf8(out).map_err(|_| TypeError::InvalidEscape(safe.to_string()))
}

/// Key of a serialized package in the replica store:
/// `<safe-id>.<archive-extension>`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReplicaRef {
    safe_id: String,
    extension: String,
}

impl ReplicaRef {
    /// Derive the store key for a handle packaged with the given extension.
    pub fn new(handle: &Handle, extension: &str) -> Self {
        Self {
            safe_id: handle.safe_id(),
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    /// The safe object identifier (file stem).
    pub fn safe_id(&self) -> &str {
        &self.safe_id
    }

    /// The archive extension, without a leading dot.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// The handle this reference was derived from.
    pub fn handle(&self) -> Result<Handle, TypeError> {
        Handle::parse(unsafe_id(&self.safe_id)?)
    }

    /// The full key, e.g. `123456789-2.zip`.
    pub fn key(&self) -> String {
        format!("{}.{}", self.safe_id, self.extension)
    }
}

impl fmt::Debug for ReplicaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ReplicaRef({})", self.key())
    }
}

impl fmt::Display for ReplicaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}
