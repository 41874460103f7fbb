use std::ffi::OsString;
use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tar::{Archive, Builder};
use tracing::debug;
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{BagError, BagResult};

const ZSTD_LEVEL: i32 = 3;

/// Serialization format of a finished package.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArchiveFormat {
    #[default]
    #[serde(rename = "zip")]
    Zip,
    #[serde(rename = "tar")]
    Tar,
    #[serde(rename = "tgz")]
    Tgz,
    #[serde(rename = "tar.zst")]
    TarZst,
}

impl ArchiveFormat {
    pub const ALL: [ArchiveFormat; 4] = [Self::Zip, Self::Tar, Self::Tgz, Self::TarZst];

    /// File extension, without a leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::Tar => "tar",
            Self::Tgz => "tgz",
            Self::TarZst => "tar.zst",
        }
    }

    /// Detect the format from an archive file name.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_ascii_lowercase();
        if name.ends_with(".tar.zst") {
            Some(Self::TarZst)
        } else if name.ends_with(".tgz") || name.ends_with(".tar.gz") {
            Some(Self::Tgz)
        } else if name.ends_with(".tar") {
            Some(Self::Tar)
        } else if name.ends_with(".zip") {
            Some(Self::Zip)
        } else {
            None
        }
    }

    /// Path of the archive `serialize` produces for `dir`: `<dir>.<ext>`.
    pub fn archive_path(&self, dir: &Path) -> PathBuf {
        let mut name = OsString::from(dir.as_os_str());
        name.push(".");
        name.push(self.extension());
        PathBuf::from(name)
    }

    /// Serialize `dir` into a single archive next to it. Entries are rooted
    /// at the directory's own name.
    pub fn serialize(&self, dir: &Path) -> BagResult<PathBuf> {
        let base = dir
            .file_name()
            .ok_or_else(|| BagError::InvalidName(dir.display().to_string()))?;
        let target = self.archive_path(dir);
        let out = BufWriter::new(File::create(&target)?);

        match self {
            Self::Zip => write_zip(out, dir)?,
            Self::Tar => {
                let inner = write_tar(out, base, dir)?;
                finish_writer(inner)?;
            }
            Self::Tgz => {
                let encoder = flate2::write::GzEncoder::new(out, flate2::Compression::default());
                let encoder = write_tar(encoder, base, dir)?;
                finish_writer(encoder.finish()?)?;
            }
            Self::TarZst => {
                let encoder = zstd::Encoder::new(out, ZSTD_LEVEL)?;
                let encoder = write_tar(encoder, base, dir)?;
                finish_writer(encoder.finish()?)?;
            }
        }
        debug!(archive = %target.display(), format = %self, "serialized package");
        Ok(target)
    }

    /// Extract `archive` into `dest`. Any decoding failure is reported as a
    /// malformed package.
    pub fn extract(&self, archive: &Path, dest: &Path) -> BagResult<()> {
        let input = BufReader::new(File::open(archive)?);
        let corrupt = |e: &dyn fmt::Display| {
            BagError::Format(format!("cannot extract {}: {e}", archive.display()))
        };
        match self {
            Self::Zip => {
                let mut zip = ZipArchive::new(input).map_err(|e| corrupt(&e))?;
                zip.extract(dest).map_err(|e| corrupt(&e))?;
            }
            Self::Tar => Archive::new(input).unpack(dest).map_err(|e| corrupt(&e))?,
            Self::Tgz => {
                let decoder = flate2::read::GzDecoder::new(input);
                Archive::new(decoder).unpack(dest).map_err(|e| corrupt(&e))?;
            }
            Self::TarZst => {
                let decoder = zstd::Decoder::new(input).map_err(|e| corrupt(&e))?;
                Archive::new(decoder).unpack(dest).map_err(|e| corrupt(&e))?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ArchiveFormat {
    type Err = BagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "zip" => Ok(Self::Zip),
            "tar" => Ok(Self::Tar),
            "tgz" | "tar.gz" => Ok(Self::Tgz),
            "tar.zst" | "zst" => Ok(Self::TarZst),
            other => Err(BagError::UnknownFormat(other.to_string())),
        }
    }
}

fn write_tar<W: Write>(out: W, base: &std::ffi::OsStr, dir: &Path) -> BagResult<W> {
    let mut builder = Builder::new(out);
    builder.mode(tar::HeaderMode::Deterministic);
    builder
        .append_dir_all(base, dir)
        .map_err(|e| BagError::Archive(format!("tar append: {e}")))?;
    builder
        .into_inner()
        .map_err(|e| BagError::Archive(format!("tar finish: {e}")))
}

fn finish_writer<W: Write>(mut out: W) -> io::Result<()> {
    out.flush()
}

fn write_zip<W: Write + io::Seek>(out: W, dir: &Path) -> BagResult<()> {
    let parent = dir.parent().unwrap_or_else(|| Path::new(""));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(out);
    let zip_err = |e: zip::result::ZipError| BagError::Archive(format!("zip: {e}"));

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(io::Error::from)?;
        let relative = entry
            .path()
            .strip_prefix(parent)
            .map_err(|_| BagError::InvalidName(entry.path().display().to_string()))?;
        let name = entry_name(relative)?;
        if entry.file_type().is_dir() {
            zip.add_directory(name, options).map_err(zip_err)?;
        } else {
            zip.start_file(name, options).map_err(zip_err)?;
            let mut file = File::open(entry.path())?;
            io::copy(&mut file, &mut zip)?;
        }
    }
    let mut out = zip.finish().map_err(zip_err)?;
    out.flush()?;
    Ok(())
}

/// Archive entry name with `/` separators regardless of platform.
fn entry_name(relative: &Path) -> BagResult<String> {
    let mut parts = Vec::new();
    for component in relative.components() {
        let part = component
            .as_os_str()
            .to_str()
            .ok_or_else(|| BagError::InvalidName(relative.display().to_string()))?;
        parts.push(part);
    }
    Ok(parts.join("/"))
}
