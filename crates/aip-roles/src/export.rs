use std::collections::BTreeSet;

use tracing::debug;
use uuid::Uuid;

use crate::error::RoleResult;
use crate::graph::{Association, Role, RoleGraph};
use crate::traits::RoleService;

/// Which part of the access-control graph an export covers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoleScope {
    /// Every group and every person in the repository.
    Root,
    /// A container's administrators plus its `CONTAINER_<id>_` groups.
    Container(Uuid),
    /// A collection's administrators, submitters and workflow groups plus
    /// its `COLLECTION_<id>_` groups.
    Collection(Uuid),
}

impl RoleScope {
    pub fn object(&self) -> Option<Uuid> {
        match self {
            Self::Root => None,
            Self::Container(id) | Self::Collection(id) => Some(*id),
        }
    }

    /// Name prefix of groups owned by the scoped object.
    pub fn group_prefix(&self) -> Option<String> {
        match self {
            Self::Root => None,
            Self::Container(id) => Some(format!("CONTAINER_{id}_")),
            Self::Collection(id) => Some(format!("COLLECTION_{id}_")),
        }
    }

    fn roles(&self) -> &'static [Role] {
        match self {
            Self::Root => &[],
            Self::Container(_) => &[Role::Administrators],
            Self::Collection(_) => &Role::COLLECTION_ROLES,
        }
    }
}

/// Build the role graph for `scope`.
pub fn export_roles(service: &dyn RoleService, scope: RoleScope) -> RoleResult<RoleGraph> {
    let mut graph = RoleGraph {
        source: scope.object(),
        ..RoleGraph::default()
    };

    let Some(object) = scope.object() else {
        for group in service.groups()? {
            graph.add_group(group);
        }
        for person in service.people()? {
            graph.add_person(person);
        }
        debug!(
            groups = graph.groups.len(),
            people = graph.people.len(),
            "exported repository roles"
        );
        return Ok(graph);
    };

    for role in scope.roles() {
        let Some(group_id) = service.role_group(object, *role)? else {
            continue;
        };
        if let Some(group) = service.group(group_id)? {
            graph.add_group(group);
            graph.associations.push(Association {
                group: group_id,
                role: *role,
            });
        }
    }
    if let Some(prefix) = scope.group_prefix() {
        for group in service.groups_with_prefix(&prefix)? {
            graph.add_group(group);
        }
    }

    let members: BTreeSet<Uuid> = graph
        .groups
        .iter()
        .flat_map(|g| g.people.iter().copied())
        .collect();
    for id in members {
        if let Some(person) = service.person(id)? {
            graph.add_person(person);
        }
    }
    graph.people.sort_by(|a, b| a.email.cmp(&b.email));

    debug!(
        %object,
        groups = graph.groups.len(),
        people = graph.people.len(),
        "exported scoped roles"
    );
    Ok(graph)
}
