use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use aip_digest::{digest_file, DigestAlgorithm};
use aip_types::MetadataElement;
use serde::Serialize;
use tempfile::TempDir;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::archive::ArchiveFormat;
use crate::error::{BagError, BagResult};
use crate::tags::{parse_tags, BAGIT_TXT};
use crate::writer::{BITSTREAM_PREFIX, DATA_DIR, LOGO_FILE, METADATA_XML};
use crate::xml;

const PROPERTIES_DELIMITER: &str = "  ";
const METADATA_SUFFIX: &str = "-metadata.xml";

/// A payload file found in an extracted package.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PayloadEntry {
    pub bundle: String,
    pub id: String,
    pub path: PathBuf,
    /// Contents of the payload's `bitstream_<id>-metadata.xml`, if present.
    pub metadata: Vec<MetadataElement>,
}

impl PayloadEntry {
    /// Look up a named value in the payload metadata.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find(|e| e.name() == Some(name))
            .map(|e| e.body.as_str())
    }
}

/// Outcome of recomputing every manifest digest.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
    pub algorithm: String,
    pub checked: usize,
    pub mismatched: Vec<String>,
    pub missing: Vec<String>,
    /// Files under `data/` with no manifest entry.
    pub unlisted: Vec<String>,
}

impl VerifyReport {
    pub fn is_valid(&self) -> bool {
        self.mismatched.is_empty() && self.missing.is_empty() && self.unlisted.is_empty()
    }
}

/// Read access to a serialized package.
///
/// Opening extracts the archive into a temporary directory beside it. The
/// extraction is removed by [`clean`](Self::clean) or when the reader drops.
#[derive(Debug)]
pub struct PackageReader {
    archive: PathBuf,
    extraction: Option<TempDir>,
    root: PathBuf,
    algorithm: DigestAlgorithm,
}

impl PackageReader {
    /// Extract `archive` and locate the bag root.
    pub fn open(archive: &Path) -> BagResult<Self> {
        let format = ArchiveFormat::from_path(archive)
            .ok_or_else(|| BagError::UnknownFormat(archive.display().to_string()))?;
        if !archive.is_file() {
            return Err(BagError::MissingFile(archive.display().to_string()));
        }
        let parent = match archive.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let extraction = tempfile::Builder::new()
            .prefix(".extract-")
            .tempdir_in(parent)?;
        format.extract(archive, extraction.path())?;

        let root = find_bag_root(extraction.path())?;
        let algorithm = detect_algorithm(&root)?;
        debug!(archive = %archive.display(), root = %root.display(), "opened package");
        Ok(Self {
            archive: archive.to_path_buf(),
            extraction: Some(extraction),
            root,
            algorithm,
        })
    }

    /// Open and reject the package unless every digest verifies.
    pub fn open_verified(archive: &Path) -> BagResult<Self> {
        let reader = Self::open(archive)?;
        let report = reader.verify()?;
        if let Some(path) = report
            .mismatched
            .first()
            .or(report.missing.first())
            .or(report.unlisted.first())
        {
            return Err(BagError::ChecksumMismatch { path: path.clone() });
        }
        Ok(reader)
    }

    pub fn archive(&self) -> &Path {
        &self.archive
    }

    /// Directory holding `bagit.txt` and `data/`.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    fn data_path(&self, name: &str) -> PathBuf {
        self.root.join(DATA_DIR).join(name)
    }

    /// Parse `data/metadata.xml`. A package without one is malformed.
    pub fn read_metadata(&self) -> BagResult<Vec<MetadataElement>> {
        let path = self.data_path(METADATA_XML);
        if !path.is_file() {
            return Err(BagError::MissingFile(format!("{DATA_DIR}/{METADATA_XML}")));
        }
        xml::read_metadata(BufReader::new(File::open(path)?))
    }

    /// Parse a `KEY  VALUE` properties file under `data/`.
    pub fn read_properties(&self, name: &str) -> BagResult<BTreeMap<String, String>> {
        let path = self.data_path(name);
        if !path.is_file() {
            return Err(BagError::MissingFile(format!("{DATA_DIR}/{name}")));
        }
        let text = fs::read_to_string(path)?;
        let mut properties = BTreeMap::new();
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            let (key, value) = line
                .split_once(PROPERTIES_DELIMITER)
                .ok_or_else(|| BagError::Format(format!("invalid properties line: {line:?}")))?;
            properties.insert(key.to_string(), value.trim_start().to_string());
        }
        Ok(properties)
    }

    /// Parse a tag file at the bag root, e.g. `bag-info.txt`.
    pub fn read_tags(&self, file: &str) -> BagResult<Vec<(String, String)>> {
        let path = self.root.join(file);
        if !path.is_file() {
            return Err(BagError::MissingFile(file.to_string()));
        }
        parse_tags(&fs::read_to_string(path)?)
    }

    pub fn find_logo(&self) -> Option<PathBuf> {
        let path = self.data_path(LOGO_FILE);
        path.is_file().then_some(path)
    }

    /// Find an extra document such as `roles.xml`.
    pub fn find_document(&self, name: &str) -> Option<PathBuf> {
        let path = self.data_path(name);
        path.is_file().then_some(path)
    }

    /// First payload of `bundle` accepted by `predicate`.
    pub fn find_payload<P>(&self, bundle: &str, predicate: P) -> BagResult<Option<PayloadEntry>>
    where
        P: Fn(&PayloadEntry) -> bool,
    {
        Ok(self
            .payloads()?
            .into_iter()
            .find(|p| p.bundle == bundle && predicate(p)))
    }

    /// Every payload file, ordered by bundle then file name.
    pub fn payloads(&self) -> BagResult<Vec<PayloadEntry>> {
        let data = self.root.join(DATA_DIR);
        let mut entries = Vec::new();
        if !data.is_dir() {
            return Ok(entries);
        }
        let mut bundles: Vec<PathBuf> = fs::read_dir(&data)?
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.is_dir())
            .collect();
        bundles.sort();

        for bundle_dir in bundles {
            let bundle = file_name(&bundle_dir);
            let mut files: Vec<PathBuf> = fs::read_dir(&bundle_dir)?
                .filter_map(|e| e.ok().map(|e| e.path()))
                .filter(|p| p.is_file())
                .collect();
            files.sort();
            for path in files {
                let name = file_name(&path);
                let Some(rest) = name.strip_prefix(BITSTREAM_PREFIX) else {
                    continue;
                };
                if rest.ends_with(METADATA_SUFFIX) {
                    continue;
                }
                let id = rest.split_once('.').map_or(rest, |(id, _)| id).to_string();
                let xml_path = bundle_dir.join(format!("{BITSTREAM_PREFIX}{id}{METADATA_SUFFIX}"));
                let metadata = if xml_path.is_file() {
                    xml::read_metadata(BufReader::new(File::open(&xml_path)?))?
                } else {
                    Vec::new()
                };
                entries.push(PayloadEntry {
                    bundle: bundle.clone(),
                    id,
                    path,
                    metadata,
                });
            }
        }
        Ok(entries)
    }

    /// Recompute every digest listed in the payload and tag manifests.
    pub fn verify(&self) -> BagResult<VerifyReport> {
        let mut report = VerifyReport {
            algorithm: self.algorithm.name().to_string(),
            ..VerifyReport::default()
        };
        let manifest = format!("manifest-{}.txt", self.algorithm.name());
        let listed = self.check_manifest(&manifest, &mut report)?;
        let tagmanifest = format!("tagmanifest-{}.txt", self.algorithm.name());
        if self.root.join(&tagmanifest).is_file() {
            self.check_manifest(&tagmanifest, &mut report)?;
        }

        for entry in WalkDir::new(self.root.join(DATA_DIR)).sort_by_file_name() {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = relative_name(&self.root, entry.path());
            if !listed.contains(&relative) {
                report.unlisted.push(relative);
            }
        }
        if !report.is_valid() {
            warn!(archive = %self.archive.display(), ?report, "package failed verification");
        }
        Ok(report)
    }

    fn check_manifest(&self, name: &str, report: &mut VerifyReport) -> BagResult<BTreeSet<String>> {
        let path = self.root.join(name);
        if !path.is_file() {
            return Err(BagError::MissingFile(name.to_string()));
        }
        let mut listed = BTreeSet::new();
        for line in fs::read_to_string(path)?.lines().filter(|l| !l.trim().is_empty()) {
            let (expected, file) = line
                .split_once(char::is_whitespace)
                .ok_or_else(|| BagError::Format(format!("invalid manifest line: {line:?}")))?;
            let file = file.trim_start();
            listed.insert(file.to_string());
            let target = self.root.join(file);
            if !target.is_file() {
                report.missing.push(file.to_string());
                continue;
            }
            report.checked += 1;
            if digest_file(self.algorithm, &target)? != expected.to_ascii_lowercase() {
                report.mismatched.push(file.to_string());
            }
        }
        Ok(listed)
    }

    /// Remove the extracted files. Safe to call more than once.
    pub fn clean(&mut self) -> BagResult<()> {
        if let Some(extraction) = self.extraction.take() {
            let path = extraction.path().to_path_buf();
            extraction.close()?;
            debug!(path = %path.display(), "removed package extraction");
        }
        Ok(())
    }

    pub fn is_clean(&self) -> bool {
        self.extraction.is_none()
    }
}

fn find_bag_root(extracted: &Path) -> BagResult<PathBuf> {
    for entry in WalkDir::new(extracted).max_depth(2).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        if entry.file_type().is_file() && entry.file_name() == BAGIT_TXT {
            if let Some(parent) = entry.path().parent() {
                return Ok(parent.to_path_buf());
            }
        }
    }
    Err(BagError::Format(format!("no {BAGIT_TXT} in package")))
}

fn detect_algorithm(root: &Path) -> BagResult<DigestAlgorithm> {
    for algorithm in [DigestAlgorithm::Sha512, DigestAlgorithm::Sha256] {
        if root.join(format!("manifest-{}.txt", algorithm.name())).is_file() {
            return Ok(algorithm);
        }
    }
    Err(BagError::Format("no supported payload manifest".into()))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn relative_name(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags::BagConfig;
    use crate::writer::{BagPayload, PackageWriter, PayloadSource};

    fn build(dir: &Path, format: ArchiveFormat) -> PathBuf {
        let mut writer = PackageWriter::new(dir.join("1-7"));
        writer
            .add_properties(
                "object.properties",
                vec![
                    "bagType  AIP".into(),
                    "objectType  item".into(),
                    "objectId  1/7".into(),
                    "ownerId  1/3".into(),
                ],
            )
            .add_metadata(MetadataElement::named("dc.title", "Field notes  vol. 2"))
            .add_payload(BagPayload {
                id: "aa".into(),
                bundle: "ORIGINAL".into(),
                extension: Some("txt".into()),
                xml: vec![
                    MetadataElement::named("name", "notes.txt"),
                    MetadataElement::named("mime_type", "text/plain"),
                ],
                source: PayloadSource::Bytes(b"hello".to_vec()),
            })
            .add_payload(BagPayload {
                id: "bb".into(),
                bundle: "LICENSE".into(),
                extension: None,
                xml: vec![MetadataElement::named("name", "license")],
                source: PayloadSource::Bytes(b"cc-by".to_vec()),
            })
            .add_document("roles.xml", b"<RoleGraph/>".to_vec())
            .set_logo(PayloadSource::Bytes(vec![9; 16]));
        let config = BagConfig {
            format,
            ..BagConfig::default()
        };
        writer.finish(&config).unwrap().archive
    }

    #[test]
    fn reads_every_part() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = build(tmp.path(), ArchiveFormat::Zip);
        let reader = PackageReader::open(&archive).unwrap();

        let props = reader.read_properties("object.properties").unwrap();
        assert_eq!(props["objectType"], "item");
        assert_eq!(props["ownerId"], "1/3");

        let metadata = reader.read_metadata().unwrap();
        assert_eq!(metadata, vec![MetadataElement::named("dc.title", "Field notes  vol. 2")]);

        let payloads = reader.payloads().unwrap();
        assert_eq!(payloads.len(), 2);
        assert_eq!(payloads[0].bundle, "LICENSE");
        assert_eq!(payloads[1].field("mime_type"), Some("text/plain"));
        assert_eq!(fs::read(&payloads[1].path).unwrap(), b"hello");

        let found = reader
            .find_payload("ORIGINAL", |p| p.field("name") == Some("notes.txt"))
            .unwrap()
            .unwrap();
        assert_eq!(found.id, "aa");
        assert!(reader.find_payload("THUMBNAIL", |_| true).unwrap().is_none());

        assert_eq!(fs::read(reader.find_logo().unwrap()).unwrap(), vec![9; 16]);
        assert!(reader.find_document("roles.xml").is_some());
        assert!(reader.find_document("absent.xml").is_none());
        assert_eq!(reader.algorithm(), DigestAlgorithm::Sha256);
    }

    #[test]
    fn verify_detects_tampering() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = build(tmp.path(), ArchiveFormat::Tgz);
        let reader = PackageReader::open(&archive).unwrap();
        let report = reader.verify().unwrap();
        assert!(report.is_valid());
        assert_eq!(report.checked, 8 + 3);

        fs::write(reader.root().join("data/logo"), b"swapped").unwrap();
        fs::write(reader.root().join("data/stray.bin"), b"x").unwrap();
        let report = reader.verify().unwrap();
        assert_eq!(report.mismatched, vec!["data/logo"]);
        assert_eq!(report.unlisted, vec!["data/stray.bin"]);
    }

    #[test]
    fn open_verified_accepts_intact_package() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = build(tmp.path(), ArchiveFormat::Tar);
        assert!(PackageReader::open_verified(&archive).is_ok());
    }

    #[test]
    fn clean_is_idempotent_and_removes_extraction() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = build(tmp.path(), ArchiveFormat::TarZst);
        let mut reader = PackageReader::open(&archive).unwrap();
        let root = reader.root().to_path_buf();
        assert!(root.is_dir());

        reader.clean().unwrap();
        assert!(!root.exists());
        assert!(reader.is_clean());
        reader.clean().unwrap();
        assert!(archive.is_file());
    }

    #[test]
    fn drop_removes_extraction() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = build(tmp.path(), ArchiveFormat::Zip);
        let root = {
            let reader = PackageReader::open(&archive).unwrap();
            reader.root().to_path_buf()
        };
        assert!(!root.exists());
    }

    #[test]
    fn missing_metadata_is_error() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = build(tmp.path(), ArchiveFormat::Zip);
        let reader = PackageReader::open(&archive).unwrap();
        fs::remove_file(reader.root().join("data/metadata.xml")).unwrap();
        assert!(matches!(
            reader.read_metadata(),
            Err(BagError::MissingFile(_))
        ));
        assert!(matches!(
            reader.read_properties("absent.properties"),
            Err(BagError::MissingFile(_))
        ));
    }

    #[test]
    fn corrupt_archive_is_format_error() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("1-9.tar.zst");
        fs::write(&archive, b"\x00\x01garbage").unwrap();
        assert!(matches!(
            PackageReader::open(&archive),
            Err(BagError::Format(_))
        ));
    }

    #[test]
    fn archive_without_bag_is_format_error() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("not-a-bag");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("readme"), b"hi").unwrap();
        let archive = ArchiveFormat::Zip.serialize(&dir).unwrap();
        assert!(matches!(
            PackageReader::open(&archive),
            Err(BagError::Format(_))
        ));
    }

    #[test]
    fn unknown_extension_and_missing_archive() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(matches!(
            PackageReader::open(&tmp.path().join("x.rar")),
            Err(BagError::UnknownFormat(_))
        ));
        assert!(matches!(
            PackageReader::open(&tmp.path().join("x.zip")),
            Err(BagError::MissingFile(_))
        ));
    }
}
