//! Role graphs for archival packages.
//!
//! Composite objects carry the groups, people and role assignments scoped to
//! them in a `roles.xml` document. Export walks the host's access-control
//! services through the [`RoleService`] trait; import merges a document back
//! in keep-existing mode, so live records always win over packaged ones.

pub mod document;
pub mod error;
pub mod export;
pub mod graph;
pub mod import;
pub mod memory;
pub mod traits;

pub use document::{read_roles, roles_to_vec, write_roles, ROLES_XML};
pub use error::{RoleError, RoleResult};
pub use export::{export_roles, RoleScope};
pub use graph::{Association, Group, Person, Role, RoleGraph};
pub use import::{import_roles, ImportSummary};
pub use memory::InMemoryRoleService;
pub use traits::RoleService;
