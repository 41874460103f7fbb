use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use aip_bag::{ArchiveFormat, BagConfig};
use aip_digest::DigestAlgorithm;
use aip_pack::PackOptions;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::restore::{RestoreMode, RestoreOptions};

pub const DEFAULT_GROUP: &str = "aip";

/// Replication settings, usually read from a TOML file:
///
/// ```toml
/// archive_format = "tar.zst"
/// digest = "sha512"
/// staging_dir = "/var/spool/aip"
/// content_filter = ["ORIGINAL", "LICENSE"]
///
/// [tags]
/// "bag-info.source-organization" = "Example University"
///
/// [restore.rebuild]
/// replace_mode = true
/// recursive_mode = true
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplicateConfig {
    pub archive_format: ArchiveFormat,
    pub digest: DigestAlgorithm,
    pub profile_identifier: Option<String>,
    /// Where packages are built before transfer and fetched into before
    /// restore.
    pub staging_dir: PathBuf,
    /// Replica store group packages are kept under.
    pub aip_group: String,
    /// Tag fields keyed `<tag-file-stem>.<field-name>`.
    pub tags: BTreeMap<String, String>,
    pub verify_on_read: bool,
    pub include_roles: bool,
    /// Item bundles to package. Absent means every bundle.
    pub content_filter: Option<Vec<String>>,
    /// Named restore profiles.
    pub restore: BTreeMap<String, RestoreProfile>,
}

impl Default for ReplicateConfig {
    fn default() -> Self {
        Self {
            archive_format: ArchiveFormat::default(),
            digest: DigestAlgorithm::default(),
            profile_identifier: None,
            staging_dir: std::env::temp_dir().join("aip-staging"),
            aip_group: DEFAULT_GROUP.to_string(),
            tags: BTreeMap::new(),
            verify_on_read: false,
            include_roles: true,
            content_filter: None,
            restore: BTreeMap::new(),
        }
    }
}

impl ReplicateConfig {
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> ConfigResult<Self> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Check every restore profile selects exactly one mode.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.aip_group.is_empty() {
            return Err(ConfigError::Invalid("aip_group must not be empty".into()));
        }
        for (name, profile) in &self.restore {
            profile.mode(name)?;
        }
        Ok(())
    }

    pub fn bag_config(&self) -> BagConfig {
        let mut bag = BagConfig::new(self.archive_format, self.digest);
        if let Some(profile) = &self.profile_identifier {
            bag.profile_identifier = profile.clone();
        }
        bag.tags = self.tags.clone();
        bag
    }

    pub fn pack_options(&self) -> PackOptions {
        PackOptions {
            bag: self.bag_config(),
            include_roles: self.include_roles,
            content_filter: self.content_filter.clone(),
            create_metadata_fields: false,
            verify_on_read: self.verify_on_read,
        }
    }

    /// Resolve a named restore profile.
    pub fn restore_options(&self, profile: &str) -> ConfigResult<RestoreOptions> {
        self.restore
            .get(profile)
            .ok_or_else(|| ConfigError::UnknownProfile(profile.to_string()))?
            .options(profile)
    }
}

/// One named restore operation as written in configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestoreProfile {
    pub restore_mode: bool,
    pub replace_mode: bool,
    pub keep_existing_mode: bool,
    pub recursive_mode: bool,
    pub create_metadata_fields: bool,
    pub skip_if_parent_missing: bool,
}

impl RestoreProfile {
    fn mode(&self, name: &str) -> ConfigResult<RestoreMode> {
        let enabled = [
            (self.restore_mode, RestoreMode::Restore),
            (self.replace_mode, RestoreMode::Replace),
            (self.keep_existing_mode, RestoreMode::KeepExisting),
        ];
        let mut modes = enabled.iter().filter(|(on, _)| *on).map(|(_, m)| *m);
        match (modes.next(), modes.next()) {
            (Some(mode), None) => Ok(mode),
            _ => Err(ConfigError::ModeCount {
                profile: name.to_string(),
                enabled: enabled.iter().filter(|(on, _)| *on).count(),
            }),
        }
    }

    pub fn options(&self, name: &str) -> ConfigResult<RestoreOptions> {
        Ok(RestoreOptions {
            mode: self.mode(name)?,
            recursive: self.recursive_mode,
            create_metadata_fields: self.create_metadata_fields,
            skip_if_parent_missing: self.skip_if_parent_missing,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_from_empty_file() {
        let config = ReplicateConfig::from_toml_str("").unwrap();
        assert_eq!(config.archive_format, ArchiveFormat::Zip);
        assert_eq!(config.digest, DigestAlgorithm::Sha256);
        assert_eq!(config.aip_group, DEFAULT_GROUP);
        assert!(config.include_roles);
        assert!(!config.verify_on_read);
    }

    #[test]
    fn full_file() {
        let config = ReplicateConfig::from_toml_str(
            r#"
            archive_format = "tar.zst"
            digest = "sha512"
            staging_dir = "/var/spool/aip"
            aip_group = "replicas"
            verify_on_read = true
            content_filter = ["ORIGINAL"]

            [tags]
            "bag-info.source-organization" = "Example University"
            "other-info.misc" = "x"

            [restore.rebuild]
            replace_mode = true
            recursive_mode = true
            skip_if_parent_missing = true
            "#,
        )
        .unwrap();
        assert_eq!(config.archive_format, ArchiveFormat::TarZst);
        assert_eq!(config.staging_dir, PathBuf::from("/var/spool/aip"));

        let bag = config.bag_config();
        assert_eq!(bag.digest, DigestAlgorithm::Sha512);
        assert_eq!(bag.tag_files().unwrap().len(), 2);

        let options = config.pack_options();
        assert!(options.verify_on_read);
        assert!(!options.accepts_bundle("THUMBNAIL"));

        let restore = config.restore_options("rebuild").unwrap();
        assert_eq!(restore.mode, RestoreMode::Replace);
        assert!(restore.recursive);
        assert!(restore.skip_if_parent_missing);
        assert!(!restore.create_metadata_fields);
    }

    #[test]
    fn profile_needs_exactly_one_mode() {
        let err = ReplicateConfig::from_toml_str(
            "[restore.both]\nrestore_mode = true\nreplace_mode = true\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::ModeCount { enabled: 2, .. }));

        let err = ReplicateConfig::from_toml_str("[restore.none]\nrecursive_mode = true\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::ModeCount { enabled: 0, .. }));
    }

    #[test]
    fn unknown_profile() {
        let config = ReplicateConfig::default();
        assert!(matches!(
            config.restore_options("missing"),
            Err(ConfigError::UnknownProfile(_))
        ));
    }

    #[test]
    fn load_reports_path() {
        let err = ReplicateConfig::load(Path::new("/nonexistent/aip.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
