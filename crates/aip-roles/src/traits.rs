use uuid::Uuid;

use crate::error::RoleResult;
use crate::graph::{Group, Person, Role};

/// Access-control services of the host repository.
///
/// Group names and email addresses are unique within a repository.
/// Implementations must reject duplicates with
/// [`RoleError::Duplicate`](crate::RoleError::Duplicate).
pub trait RoleService: Send + Sync {
    /// All groups, ordered by name.
    fn groups(&self) -> RoleResult<Vec<Group>>;

    fn group(&self, id: Uuid) -> RoleResult<Option<Group>>;

    fn group_by_name(&self, name: &str) -> RoleResult<Option<Group>>;

    /// Groups whose name starts with `prefix`, ordered by name.
    fn groups_with_prefix(&self, prefix: &str) -> RoleResult<Vec<Group>>;

    /// All people, ordered by email.
    fn people(&self) -> RoleResult<Vec<Person>>;

    fn person(&self, id: Uuid) -> RoleResult<Option<Person>>;

    fn person_by_email(&self, email: &str) -> RoleResult<Option<Person>>;

    /// Create an empty group and return it.
    fn create_group(&self, name: &str) -> RoleResult<Group>;

    /// Create a person from `template`, assigning a fresh id.
    fn create_person(&self, template: &Person) -> RoleResult<Person>;

    fn add_person_member(&self, group: Uuid, person: Uuid) -> RoleResult<()>;

    fn add_group_member(&self, group: Uuid, member: Uuid) -> RoleResult<()>;

    /// The group holding `role` on `object`, if any.
    fn role_group(&self, object: Uuid, role: Role) -> RoleResult<Option<Uuid>>;

    fn set_role_group(&self, object: Uuid, role: Role, group: Uuid) -> RoleResult<()>;
}
