use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::RoleResult;
use crate::graph::RoleGraph;
use crate::traits::RoleService;

/// Counts of what an import changed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub people_created: usize,
    pub groups_created: usize,
    pub memberships_added: usize,
    pub roles_assigned: usize,
    /// Roles left alone because the live object already had a group for them.
    pub roles_kept: usize,
}

/// Merge `graph` into the live repository for object `target`.
///
/// Existing people (matched by email) and groups (matched by name) are kept
/// as they are. Missing records and memberships are added, and a role is
/// assigned only where the live object has none. Groups named after the
/// exported object are renamed after `target`.
pub fn import_roles(
    service: &dyn RoleService,
    target: Uuid,
    graph: &RoleGraph,
) -> RoleResult<ImportSummary> {
    let mut summary = ImportSummary::default();

    let mut people: HashMap<Uuid, Uuid> = HashMap::new();
    for person in &graph.people {
        let live = match service.person_by_email(&person.email)? {
            Some(existing) => existing,
            None => {
                summary.people_created += 1;
                service.create_person(person)?
            }
        };
        people.insert(person.id, live.id);
    }

    let mut groups: HashMap<Uuid, Uuid> = HashMap::new();
    for group in &graph.groups {
        let name = rename_scoped(&group.name, graph.source, target);
        let live = match service.group_by_name(&name)? {
            Some(existing) => existing,
            None => {
                summary.groups_created += 1;
                service.create_group(&name)?
            }
        };
        groups.insert(group.id, live.id);
    }

    for group in &graph.groups {
        let live_id = groups[&group.id];
        let Some(live) = service.group(live_id)? else {
            continue;
        };
        for person in &group.people {
            match people.get(person) {
                Some(id) if !live.people.contains(id) => {
                    service.add_person_member(live_id, *id)?;
                    summary.memberships_added += 1;
                }
                Some(_) => {}
                None => debug!(group = %group.name, %person, "member not in role document"),
            }
        }
        for nested in &group.groups {
            match groups.get(nested) {
                Some(id) if !live.groups.contains(id) => {
                    service.add_group_member(live_id, *id)?;
                    summary.memberships_added += 1;
                }
                Some(_) => {}
                None => debug!(group = %group.name, %nested, "member group not in role document"),
            }
        }
    }

    for association in &graph.associations {
        let Some(group) = groups.get(&association.group) else {
            debug!(role = %association.role, "association refers to unknown group");
            continue;
        };
        if service.role_group(target, association.role)?.is_some() {
            summary.roles_kept += 1;
            continue;
        }
        service.set_role_group(target, association.role, *group)?;
        summary.roles_assigned += 1;
    }

    info!(
        %target,
        people_created = summary.people_created,
        groups_created = summary.groups_created,
        roles_assigned = summary.roles_assigned,
        "imported roles"
    );
    Ok(summary)
}

/// Replace the exported object's id inside a scoped group name.
fn rename_scoped(name: &str, source: Option<Uuid>, target: Uuid) -> String {
    match source {
        Some(source) if source != target => {
            name.replace(&source.to_string(), &target.to_string())
        }
        _ => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::{export_roles, RoleScope};
    use crate::graph::{Group, Person, Role};
    use crate::memory::InMemoryRoleService;

    fn exported() -> (RoleGraph, Uuid) {
        let source = InMemoryRoleService::new();
        let collection = Uuid::new_v4();
        let alice = Person::new("alice@example.org").with_name("Alice", "Liddell");
        let bob = Person::new("bob@example.org");
        source.insert_person(alice.clone()).unwrap();
        source.insert_person(bob.clone()).unwrap();
        let reviewers = Group::new("Reviewers").with_person(bob.id);
        let admins = Group::new(format!("COLLECTION_{collection}_ADMIN"))
            .with_person(alice.id)
            .with_group(reviewers.id);
        source.insert_group(reviewers.clone()).unwrap();
        source.insert_group(admins.clone()).unwrap();
        source
            .set_role_group(collection, Role::Administrators, admins.id)
            .unwrap();
        source
            .set_role_group(collection, Role::WorkflowStep1, reviewers.id)
            .unwrap();
        (
            export_roles(&source, RoleScope::Collection(collection)).unwrap(),
            collection,
        )
    }

    #[test]
    fn import_into_empty_repository() {
        let (graph, _) = exported();
        let live = InMemoryRoleService::new();
        let target = Uuid::new_v4();

        let summary = import_roles(&live, target, &graph).unwrap();
        assert_eq!(summary.people_created, 2);
        assert_eq!(summary.groups_created, 2);
        assert_eq!(summary.memberships_added, 3);
        assert_eq!(summary.roles_assigned, 2);

        let admins = live
            .group_by_name(&format!("COLLECTION_{target}_ADMIN"))
            .unwrap()
            .expect("scoped group renamed after target");
        assert_eq!(live.role_group(target, Role::Administrators).unwrap(), Some(admins.id));
        let alice = live.person_by_email("alice@example.org").unwrap().unwrap();
        assert_eq!(admins.people, vec![alice.id]);
        assert_eq!(alice.first_name.as_deref(), Some("Alice"));
    }

    #[test]
    fn existing_records_are_kept() {
        let (graph, _) = exported();
        let live = InMemoryRoleService::new();
        let target = Uuid::new_v4();
        let mut existing = Person::new("alice@example.org");
        existing.first_name = Some("Alicia".into());
        live.insert_person(existing.clone()).unwrap();
        let current_admins = live.create_group("Current admins").unwrap();
        live.set_role_group(target, Role::Administrators, current_admins.id)
            .unwrap();

        let summary = import_roles(&live, target, &graph).unwrap();
        assert_eq!(summary.people_created, 1);
        assert_eq!(summary.roles_kept, 1);
        assert_eq!(summary.roles_assigned, 1);

        let alice = live.person_by_email("alice@example.org").unwrap().unwrap();
        assert_eq!(alice.id, existing.id);
        assert_eq!(alice.first_name.as_deref(), Some("Alicia"));
        assert_eq!(
            live.role_group(target, Role::Administrators).unwrap(),
            Some(current_admins.id)
        );
    }

    #[test]
    fn import_twice_changes_nothing() {
        let (graph, _) = exported();
        let live = InMemoryRoleService::new();
        let target = Uuid::new_v4();
        import_roles(&live, target, &graph).unwrap();

        let again = import_roles(&live, target, &graph).unwrap();
        assert_eq!(
            again,
            ImportSummary {
                roles_kept: 2,
                ..ImportSummary::default()
            }
        );
    }

    #[test]
    fn same_object_keeps_group_names() {
        let (graph, collection) = exported();
        let live = InMemoryRoleService::new();
        import_roles(&live, collection, &graph).unwrap();
        assert!(live
            .group_by_name(&format!("COLLECTION_{collection}_ADMIN"))
            .unwrap()
            .is_some());
    }
}
