use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Running totals of bytes and files written into a package.
///
/// Counters are atomic so payload files may be written from several threads
/// into the same package.
#[derive(Debug, Default)]
pub struct PayloadTally {
    bytes: AtomicU64,
    files: AtomicU64,
}

impl PayloadTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one written file of `bytes` length.
    pub fn record(&self, bytes: u64) {
        self.bytes.fetch_add(bytes, Ordering::SeqCst);
        self.files.fetch_add(1, Ordering::SeqCst);
    }

    pub fn bytes(&self) -> u64 {
        self.bytes.load(Ordering::SeqCst)
    }

    pub fn files(&self) -> u64 {
        self.files.load(Ordering::SeqCst)
    }

    /// Payload-Oxum value: `<bytes>.<files>`.
    pub fn oxum(&self) -> String {
        format!("{}.{}", self.bytes(), self.files())
    }

    /// Human-readable total size, e.g. `12 KB`.
    pub fn display_size(&self) -> String {
        display_size(self.bytes())
    }
}

impl fmt::Display for PayloadTally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} bytes in {} files", self.bytes(), self.files())
    }
}

/// Render a byte count with the largest whole binary unit (truncating).
pub fn display_size(bytes: u64) -> String {
    const UNITS: [(&str, u64); 5] = [
        ("EB", 1 << 60),
        ("PB", 1 << 50),
        ("TB", 1 << 40),
        ("GB", 1 << 30),
        ("MB", 1 << 20),
    ];
    for (unit, scale) in UNITS {
        if bytes / scale > 0 {
            return format!("{} {unit}", bytes / scale);
        }
    }
    if bytes / 1024 > 0 {
        format!("{} KB", bytes / 1024)
    } else {
        format!("{bytes} bytes")
    }
}
