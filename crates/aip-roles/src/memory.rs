use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use uuid::Uuid;

use crate::error::{RoleError, RoleResult};
use crate::graph::{Group, Person, Role};
use crate::traits::RoleService;

#[derive(Default)]
struct State {
    groups: BTreeMap<Uuid, Group>,
    people: BTreeMap<Uuid, Person>,
    roles: HashMap<(Uuid, Role), Uuid>,
}

/// In-memory access-control service for tests and embedding.
#[derive(Default)]
pub struct InMemoryRoleService {
    state: RwLock<State>,
}

impl InMemoryRoleService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a group as-is, keeping its id and memberships.
    pub fn insert_group(&self, group: Group) -> RoleResult<()> {
        let mut state = self.state.write().expect("lock poisoned");
        if state.groups.values().any(|g| g.name == group.name) {
            return Err(RoleError::Duplicate {
                kind: "group",
                name: group.name,
            });
        }
        state.groups.insert(group.id, group);
        Ok(())
    }

    /// Insert a person as-is, keeping their id.
    pub fn insert_person(&self, person: Person) -> RoleResult<()> {
        let mut state = self.state.write().expect("lock poisoned");
        if state.people.values().any(|p| p.email == person.email) {
            return Err(RoleError::Duplicate {
                kind: "person",
                name: person.email,
            });
        }
        state.people.insert(person.id, person);
        Ok(())
    }
}

impl RoleService for InMemoryRoleService {
    fn groups(&self) -> RoleResult<Vec<Group>> {
        let state = self.state.read().expect("lock poisoned");
        let mut groups: Vec<Group> = state.groups.values().cloned().collect();
        groups.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(groups)
    }

    fn group(&self, id: Uuid) -> RoleResult<Option<Group>> {
        let state = self.state.read().expect("lock poisoned");
        Ok(state.groups.get(&id).cloned())
    }

    fn group_by_name(&self, name: &str) -> RoleResult<Option<Group>> {
        let state = self.state.read().expect("lock poisoned");
        Ok(state.groups.values().find(|g| g.name == name).cloned())
    }

    fn groups_with_prefix(&self, prefix: &str) -> RoleResult<Vec<Group>> {
        Ok(self
            .groups()?
            .into_iter()
            .filter(|g| g.name.starts_with(prefix))
            .collect())
    }

    fn people(&self) -> RoleResult<Vec<Person>> {
        let state = self.state.read().expect("lock poisoned");
        let mut people: Vec<Person> = state.people.values().cloned().collect();
        people.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(people)
    }

    fn person(&self, id: Uuid) -> RoleResult<Option<Person>> {
        let state = self.state.read().expect("lock poisoned");
        Ok(state.people.get(&id).cloned())
    }

    fn person_by_email(&self, email: &str) -> RoleResult<Option<Person>> {
        let state = self.state.read().expect("lock poisoned");
        Ok(state.people.values().find(|p| p.email == email).cloned())
    }

    fn create_group(&self, name: &str) -> RoleResult<Group> {
        let group = Group::new(name);
        self.insert_group(group.clone())?;
        Ok(group)
    }

    fn create_person(&self, template: &Person) -> RoleResult<Person> {
        let person = Person {
            id: Uuid::new_v4(),
            ..template.clone()
        };
        self.insert_person(person.clone())?;
        Ok(person)
    }

    fn add_person_member(&self, group: Uuid, person: Uuid) -> RoleResult<()> {
        let mut state = self.state.write().expect("lock poisoned");
        if !state.people.contains_key(&person) {
            return Err(RoleError::PersonNotFound(person));
        }
        let entry = state
            .groups
            .get_mut(&group)
            .ok_or(RoleError::GroupNotFound(group))?;
        if !entry.people.contains(&person) {
            entry.people.push(person);
        }
        Ok(())
    }

    fn add_group_member(&self, group: Uuid, member: Uuid) -> RoleResult<()> {
        let mut state = self.state.write().expect("lock poisoned");
        if !state.groups.contains_key(&member) {
            return Err(RoleError::GroupNotFound(member));
        }
        let entry = state
            .groups
            .get_mut(&group)
            .ok_or(RoleError::GroupNotFound(group))?;
        if !entry.groups.contains(&member) {
            entry.groups.push(member);
        }
        Ok(())
    }

    fn role_group(&self, object: Uuid, role: Role) -> RoleResult<Option<Uuid>> {
        let state = self.state.read().expect("lock poisoned");
        Ok(state.roles.get(&(object, role)).copied())
    }

    fn set_role_group(&self, object: Uuid, role: Role, group: Uuid) -> RoleResult<()> {
        let mut state = self.state.write().expect("lock poisoned");
        if !state.groups.contains_key(&group) {
            return Err(RoleError::GroupNotFound(group));
        }
        state.roles.insert((object, role), group);
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryRoleService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read().expect("lock poisoned");
        f.debug_struct("InMemoryRoleService")
            .field("groups", &state.groups.len())
            .field("people", &state.people.len())
            .field("roles", &state.roles.len())
            .finish()
    }
}
