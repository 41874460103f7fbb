use std::collections::BTreeSet;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use aip_digest::{DigestAlgorithm, DigestWriter, FileDigest, PayloadTally};
use aip_types::MetadataElement;
use tracing::{debug, info};

use crate::error::{BagError, BagResult};
use crate::tags::{
    render_tags, BagConfig, TagFiles, BAGGING_DATE_KEY, BAGIT_TXT, BAG_INFO_TXT, BAG_SIZE_KEY,
    PAYLOAD_OXUM_KEY, PROFILE_IDENTIFIER_KEY,
};
use crate::xml;

pub const DATA_DIR: &str = "data";
pub const METADATA_XML: &str = "metadata.xml";
pub const LOGO_FILE: &str = "logo";
pub const BITSTREAM_PREFIX: &str = "bitstream_";
pub const BAGIT_DECLARATION: &str = "BagIt-Version: 1.0\nTag-File-Character-Encoding: UTF-8\n";

/// Where the bytes of a payload come from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PayloadSource {
    Bytes(Vec<u8>),
    File(PathBuf),
    /// Payload kept outside the bag and fetched by URL.
    FetchUrl(String),
}

/// One payload file destined for `data/<bundle>/`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BagPayload {
    pub id: String,
    pub bundle: String,
    pub extension: Option<String>,
    /// Written alongside as `bitstream_<id>-metadata.xml`.
    pub xml: Vec<MetadataElement>,
    pub source: PayloadSource,
}

impl BagPayload {
    /// File name of the payload inside its bundle directory.
    pub fn file_name(&self) -> String {
        match &self.extension {
            Some(ext) => format!("{BITSTREAM_PREFIX}{}.{ext}", self.id),
            None => format!("{BITSTREAM_PREFIX}{}", self.id),
        }
    }

    pub fn metadata_file_name(&self) -> String {
        format!("{BITSTREAM_PREFIX}{}-{METADATA_XML}", self.id)
    }
}

/// Result of finishing a package.
#[derive(Clone, Debug)]
pub struct PackageFile {
    pub archive: PathBuf,
    /// Digest records for every file under `data/`, in write order.
    pub manifest: Vec<FileDigest>,
    pub payload_oxum: String,
}

/// Builds one BagIt package from the parts a packer hands it.
///
/// Nothing touches the filesystem until [`finish`](Self::finish).
pub struct PackageWriter {
    directory: PathBuf,
    properties: Vec<(String, Vec<String>)>,
    metadata: Vec<MetadataElement>,
    payloads: Vec<BagPayload>,
    documents: Vec<(String, Vec<u8>)>,
    logo: Option<PayloadSource>,
}

impl PackageWriter {
    /// Create a writer targeting `directory`. The archive lands next to it.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            properties: Vec::new(),
            metadata: Vec::new(),
            payloads: Vec::new(),
            documents: Vec::new(),
            logo: None,
        }
    }

    /// Add a properties file under `data/`, one `KEY  VALUE` line each.
    pub fn add_properties(&mut self, file_name: impl Into<String>, lines: Vec<String>) -> &mut Self {
        self.properties.push((file_name.into(), lines));
        self
    }

    pub fn add_metadata(&mut self, element: MetadataElement) -> &mut Self {
        self.metadata.push(element);
        self
    }

    pub fn extend_metadata(&mut self, elements: impl IntoIterator<Item = MetadataElement>) -> &mut Self {
        self.metadata.extend(elements);
        self
    }

    pub fn add_payload(&mut self, payload: BagPayload) -> &mut Self {
        self.payloads.push(payload);
        self
    }

    /// Add an extra document, written to `data/<name>`.
    pub fn add_document(&mut self, name: impl Into<String>, content: Vec<u8>) -> &mut Self {
        self.documents.push((name.into(), content));
        self
    }

    pub fn set_logo(&mut self, logo: PayloadSource) -> &mut Self {
        self.logo = Some(logo);
        self
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Write the bag, serialize it and remove the working directory.
    ///
    /// All preconditions are checked before the first write. An I/O failure
    /// part way through leaves the partial directory in place.
    pub fn finish(self, config: &BagConfig) -> BagResult<PackageFile> {
        let mut tag_files = config.tag_files()?;
        let data_dir = self.directory.join(DATA_DIR);
        if data_dir.exists() {
            return Err(BagError::DataDirExists(data_dir));
        }
        self.check_entries()?;
        check_tag_files(&tag_files, config.digest)?;

        fs::create_dir_all(&data_dir)?;
        let mut build = Build {
            root: &self.directory,
            algorithm: config.digest,
            tally: PayloadTally::new(),
            manifest: Vec::new(),
        };

        for (name, lines) in &self.properties {
            build.write_data(&format!("{DATA_DIR}/{name}"), true, |out| {
                for line in lines {
                    out.write_all(line.as_bytes())?;
                    out.write_all(b"\n")?;
                }
                Ok(())
            })?;
        }

        build.write_data(&format!("{DATA_DIR}/{METADATA_XML}"), true, |out| {
            xml::write_metadata(out, &self.metadata)
        })?;

        for payload in &self.payloads {
            fs::create_dir_all(data_dir.join(&payload.bundle))?;
            let prefix = format!("{DATA_DIR}/{}", payload.bundle);
            build.write_data(&format!("{prefix}/{}", payload.metadata_file_name()), false, |out| {
                xml::write_metadata(out, &payload.xml)
            })?;
            build.write_data(&format!("{prefix}/{}", payload.file_name()), false, |out| {
                copy_source(&payload.source, out)
            })?;
        }

        for (name, content) in &self.documents {
            build.write_data(&format!("{DATA_DIR}/{name}"), true, |out| {
                out.write_all(content)?;
                Ok(())
            })?;
        }

        if let Some(logo) = &self.logo {
            build.write_data(&format!("{DATA_DIR}/{LOGO_FILE}"), false, |out| {
                copy_source(logo, out)
            })?;
        }

        let mut bag_info = vec![
            (PROFILE_IDENTIFIER_KEY.to_string(), config.profile_identifier.clone()),
            (BAG_SIZE_KEY.to_string(), build.tally.display_size()),
            (PAYLOAD_OXUM_KEY.to_string(), build.tally.oxum()),
            (
                BAGGING_DATE_KEY.to_string(),
                chrono::Local::now().format("%Y-%m-%d").to_string(),
            ),
        ];
        if let Some(extra) = tag_files.remove(BAG_INFO_TXT) {
            for (label, value) in extra {
                if !bag_info.iter().any(|(l, _)| *l == label) {
                    bag_info.push((label, value));
                }
            }
        }

        let mut tag_digests = Vec::new();
        tag_digests.push(build.write_tag(BAGIT_TXT, BAGIT_DECLARATION.as_bytes())?);
        let manifest_name = format!("manifest-{}.txt", config.digest.name());
        let manifest_text = render_manifest(&build.manifest);
        tag_digests.push(build.write_tag(&manifest_name, manifest_text.as_bytes())?);
        let info_text = render_tags(bag_info.iter().map(|(l, v)| (l.as_str(), v.as_str())));
        tag_digests.push(build.write_tag(BAG_INFO_TXT, info_text.as_bytes())?);
        for (file, fields) in &tag_files {
            let text = render_tags(fields.iter().map(|(l, v)| (l.as_str(), v.as_str())));
            tag_digests.push(build.write_tag(file, text.as_bytes())?);
        }
        let tagmanifest_name = format!("tagmanifest-{}.txt", config.digest.name());
        fs::write(
            self.directory.join(&tagmanifest_name),
            render_manifest(&tag_digests),
        )?;

        let archive = config.format.serialize(&self.directory)?;
        fs::remove_dir_all(&self.directory)?;

        let payload_oxum = build.tally.oxum();
        info!(
            archive = %archive.display(),
            files = build.tally.files(),
            bytes = build.tally.bytes(),
            "package written"
        );
        Ok(PackageFile {
            archive,
            manifest: build.manifest,
            payload_oxum,
        })
    }

    fn check_entries(&self) -> BagResult<()> {
        if self
            .payloads
            .iter()
            .any(|p| matches!(p.source, PayloadSource::FetchUrl(_)))
            || matches!(self.logo, Some(PayloadSource::FetchUrl(_)))
        {
            return Err(BagError::Unsupported(
                "fetch.txt for bags is not supported".into(),
            ));
        }
        let names = self
            .properties
            .iter()
            .map(|(n, _)| n.as_str())
            .chain(self.documents.iter().map(|(n, _)| n.as_str()))
            .chain(self.payloads.iter().map(|p| p.bundle.as_str()))
            .chain(self.payloads.iter().map(|p| p.id.as_str()))
            .chain(self.payloads.iter().filter_map(|p| p.extension.as_deref()));
        for name in names {
            check_component(name)?;
        }

        // Every file under data/ is written exactly once.
        let bundles: BTreeSet<&str> = self.payloads.iter().map(|p| p.bundle.as_str()).collect();
        let mut seen: BTreeSet<String> = [METADATA_XML, LOGO_FILE].map(String::from).into();
        let top_level = self
            .properties
            .iter()
            .map(|(n, _)| n.as_str())
            .chain(self.documents.iter().map(|(n, _)| n.as_str()));
        for name in top_level {
            if bundles.contains(name) || !seen.insert(name.to_string()) {
                return Err(BagError::InvalidName(name.to_string()));
            }
        }
        for payload in &self.payloads {
            for file in [payload.metadata_file_name(), payload.file_name()] {
                let path = format!("{}/{file}", payload.bundle);
                if !seen.insert(path.clone()) {
                    return Err(BagError::InvalidName(path));
                }
            }
        }
        Ok(())
    }
}

/// Digest bookkeeping for one in-progress build.
struct Build<'a> {
    root: &'a Path,
    algorithm: DigestAlgorithm,
    tally: PayloadTally,
    manifest: Vec<FileDigest>,
}

impl Build<'_> {
    /// Write one payload file through a digesting stream and record it.
    fn write_data<F>(&mut self, relative: &str, create_new: bool, write: F) -> BagResult<()>
    where
        F: FnOnce(&mut DigestWriter<BufWriter<File>>) -> BagResult<()>,
    {
        let path = self.root.join(relative);
        let file = OpenOptions::new()
            .write(true)
            .create_new(create_new)
            .create(!create_new)
            .truncate(!create_new)
            .open(&path)?;
        let mut out = DigestWriter::new(BufWriter::new(file), self.algorithm);
        write(&mut out)?;
        let (_, digest, bytes) = out.finish()?;
        self.tally.record(bytes);
        debug!(path = relative, bytes, "wrote package file");
        self.manifest.push(FileDigest {
            path: PathBuf::from(relative),
            digest,
            bytes,
        });
        Ok(())
    }

    fn write_tag(&self, name: &str, content: &[u8]) -> BagResult<FileDigest> {
        fs::write(self.root.join(name), content)?;
        Ok(FileDigest {
            path: PathBuf::from(name),
            digest: self.algorithm.hash_hex(content),
            bytes: content.len() as u64,
        })
    }
}

fn copy_source<W: Write>(source: &PayloadSource, out: &mut W) -> BagResult<()> {
    match source {
        PayloadSource::Bytes(bytes) => out.write_all(bytes)?,
        PayloadSource::File(path) => {
            let mut file = File::open(path)?;
            io::copy(&mut file, out)?;
        }
        PayloadSource::FetchUrl(url) => {
            return Err(BagError::Unsupported(format!("fetch by reference: {url}")))
        }
    }
    Ok(())
}

/// Manifest lines: `<digest>  <path>`, sorted by path.
fn render_manifest(entries: &[FileDigest]) -> String {
    let mut lines: Vec<(String, &str)> = entries
        .iter()
        .map(|e| (e.path.to_string_lossy().replace('\\', "/"), e.digest.as_str()))
        .collect();
    lines.sort();
    let mut out = String::new();
    for (path, digest) in lines {
        out.push_str(digest);
        out.push_str("  ");
        out.push_str(&path);
        out.push('\n');
    }
    out
}

/// Configured tag files may not replace a file the writer produces itself.
fn check_tag_files(tag_files: &TagFiles, digest: DigestAlgorithm) -> BagResult<()> {
    let reserved = [
        BAGIT_TXT.to_string(),
        format!("manifest-{}.txt", digest.name()),
        format!("tagmanifest-{}.txt", digest.name()),
    ];
    match tag_files.keys().find(|file| reserved.contains(*file)) {
        Some(file) => Err(BagError::InvalidTagKey(file.clone())),
        None => Ok(()),
    }
}

fn check_component(name: &str) -> BagResult<()> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || name.chars().any(char::is_control)
    {
        return Err(BagError::InvalidName(name.to_string()));
    }
    Ok(())
}
