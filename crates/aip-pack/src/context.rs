use std::fmt;
use std::path::Path;
use std::sync::Arc;

use aip_bag::{BagConfig, PackageReader};
use aip_roles::RoleService;
use aip_types::{DigitalObject, Handle};
use serde::{Deserialize, Serialize};

use crate::error::{PackResult, PackerError};
use crate::repository::Repository;

/// Settings that shape how packers build and apply packages.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackOptions {
    pub bag: BagConfig,
    /// Export a role graph into composite packages.
    pub include_roles: bool,
    /// Bundles packed for items. `None` packs every bundle.
    pub content_filter: Option<Vec<String>>,
    /// Register unknown metadata fields on restore instead of failing.
    pub create_metadata_fields: bool,
    /// Recompute every digest when a package is opened.
    pub verify_on_read: bool,
}

impl Default for PackOptions {
    fn default() -> Self {
        Self {
            bag: BagConfig::default(),
            include_roles: true,
            content_filter: None,
            create_metadata_fields: false,
            verify_on_read: false,
        }
    }
}

impl PackOptions {
    /// Whether payloads of `bundle` are packed.
    pub fn accepts_bundle(&self, bundle: &str) -> bool {
        match &self.content_filter {
            Some(bundles) => bundles.iter().any(|b| b == bundle),
            None => true,
        }
    }
}

/// Services and settings handed to every packer call.
#[derive(Clone)]
pub struct PackContext {
    pub repository: Arc<dyn Repository>,
    pub roles: Option<Arc<dyn RoleService>>,
    pub options: PackOptions,
}

impl PackContext {
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self {
            repository,
            roles: None,
            options: PackOptions::default(),
        }
    }

    pub fn with_roles(mut self, roles: Arc<dyn RoleService>) -> Self {
        self.roles = Some(roles);
        self
    }

    pub fn with_options(mut self, options: PackOptions) -> Self {
        self.options = options;
        self
    }

    /// Look up a live object, failing if it does not exist.
    pub fn require(&self, handle: &Handle) -> PackResult<DigitalObject> {
        self.repository
            .find(handle)?
            .ok_or_else(|| PackerError::NotFound(handle.clone()))
    }

    /// Open a package, verifying digests when configured to.
    pub fn open_package(&self, archive: &Path) -> PackResult<PackageReader> {
        let reader = if self.options.verify_on_read {
            PackageReader::open_verified(archive)?
        } else {
            PackageReader::open(archive)?
        };
        Ok(reader)
    }
}

impl fmt::Debug for PackContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PackContext")
            .field("roles", &self.roles.is_some())
            .field("options", &self.options)
            .finish()
    }
}
