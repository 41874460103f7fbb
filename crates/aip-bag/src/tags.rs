use std::collections::BTreeMap;

use aip_digest::DigestAlgorithm;
use serde::{Deserialize, Serialize};

use crate::archive::ArchiveFormat;
use crate::error::{BagError, BagResult};

pub const BAGIT_TXT: &str = "bagit.txt";
pub const BAG_INFO_TXT: &str = "bag-info.txt";

pub const PROFILE_IDENTIFIER_KEY: &str = "BagIt-Profile-Identifier";
pub const BAG_SIZE_KEY: &str = "Bag-Size";
pub const PAYLOAD_OXUM_KEY: &str = "Payload-Oxum";
pub const BAGGING_DATE_KEY: &str = "Bagging-Date";

/// Profile packages declare conformance to unless configured otherwise.
pub const DEFAULT_PROFILE_IDENTIFIER: &str =
    "https://github.com/dpscollaborative/btr_bagit_profile/releases/download/1.0/btr-bagit-profile.json";

/// Tag file stems reserved for files the writer produces itself. Manifests
/// are reserved for every algorithm suffix.
const RESERVED_STEMS: [&str; 3] = ["bagit", "manifest", "tagmanifest"];
const RESERVED_PREFIXES: [&str; 2] = ["manifest-", "tagmanifest-"];

/// Tag files keyed by file name, each an ordered map of label to value.
pub type TagFiles = BTreeMap<String, BTreeMap<String, String>>;

/// Package-wide settings used when finishing a bag.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BagConfig {
    pub format: ArchiveFormat,
    pub digest: DigestAlgorithm,
    pub profile_identifier: String,
    /// Free-form tag fields keyed `<tag-file-stem>.<field-name>`, e.g.
    /// `bag-info.source-organization`.
    pub tags: BTreeMap<String, String>,
}

impl Default for BagConfig {
    fn default() -> Self {
        Self {
            format: ArchiveFormat::default(),
            digest: DigestAlgorithm::default(),
            profile_identifier: DEFAULT_PROFILE_IDENTIFIER.to_string(),
            tags: BTreeMap::new(),
        }
    }
}

impl BagConfig {
    pub fn new(format: ArchiveFormat, digest: DigestAlgorithm) -> Self {
        Self {
            format,
            digest,
            ..Self::default()
        }
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Group the configured tag fields by tag file.
    ///
    /// `bag-info.source-organization = X` yields
    /// `bag-info.txt: Source-Organization: X`.
    pub fn tag_files(&self) -> BagResult<TagFiles> {
        let mut files = TagFiles::new();
        check_tag_value(PROFILE_IDENTIFIER_KEY, &self.profile_identifier)?;
        for (key, value) in &self.tags {
            let (file, label) = parse_tag_key(key)?;
            check_tag_value(key, value)?;
            files.entry(file).or_default().insert(label, value.clone());
        }
        Ok(files)
    }
}

/// Split a `<stem>.<field>` key into its tag file name and field label.
pub fn parse_tag_key(key: &str) -> BagResult<(String, String)> {
    let segments: Vec<&str> = key.split('.').collect();
    let [stem, field] = segments.as_slice() else {
        return Err(BagError::InvalidTagKey(key.to_string()));
    };
    if stem.is_empty()
        || field.is_empty()
        || RESERVED_STEMS.contains(stem)
        || RESERVED_PREFIXES.iter().any(|p| stem.starts_with(p))
    {
        return Err(BagError::InvalidTagKey(key.to_string()));
    }
    if stem.contains(['/', '\\']) {
        return Err(BagError::InvalidTagKey(key.to_string()));
    }
    Ok((format!("{stem}.txt"), field_label(field)))
}

/// Tag values are written on a single line.
fn check_tag_value(key: &str, value: &str) -> BagResult<()> {
    if value.chars().any(|c| c == '\n' || c == '\r') {
        return Err(BagError::InvalidTagValue(key.to_string()));
    }
    Ok(())
}

/// `source-organization` -> `Source-Organization`.
fn field_label(field: &str) -> String {
    field
        .split('-')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join("-")
}

/// Render tag lines as `Label: value`.
pub fn render_tags<'a>(fields: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    let mut out = String::new();
    for (label, value) in fields {
        out.push_str(label);
        out.push_str(": ");
        out.push_str(value);
        out.push('\n');
    }
    out
}

/// Parse `Label: value` lines. Indented lines continue the previous value.
pub fn parse_tags(text: &str) -> BagResult<Vec<(String, String)>> {
    let mut fields: Vec<(String, String)> = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        if line.starts_with([' ', '\t']) {
            let Some((_, value)) = fields.last_mut() else {
                return Err(BagError::Format(format!("dangling continuation line: {line:?}")));
            };
            value.push(' ');
            value.push_str(line.trim());
            continue;
        }
        let (label, value) = line
            .split_once(':')
            .ok_or_else(|| BagError::Format(format!("invalid tag line: {line:?}")))?;
        fields.push((label.trim().to_string(), value.trim().to_string()));
    }
    Ok(fields)
}
