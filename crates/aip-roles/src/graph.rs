use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::RoleError;

/// A role an object can delegate to a group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    Administrators,
    Submitters,
    WorkflowStep1,
    WorkflowStep2,
    WorkflowStep3,
}

impl Role {
    pub const COLLECTION_ROLES: [Role; 5] = [
        Role::Administrators,
        Role::Submitters,
        Role::WorkflowStep1,
        Role::WorkflowStep2,
        Role::WorkflowStep3,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Administrators => "ADMIN",
            Self::Submitters => "SUBMIT",
            Self::WorkflowStep1 => "WORKFLOW_STEP_1",
            Self::WorkflowStep2 => "WORKFLOW_STEP_2",
            Self::WorkflowStep3 => "WORKFLOW_STEP_3",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = RoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(Self::Administrators),
            "SUBMIT" => Ok(Self::Submitters),
            "WORKFLOW_STEP_1" => Ok(Self::WorkflowStep1),
            "WORKFLOW_STEP_2" => Ok(Self::WorkflowStep2),
            "WORKFLOW_STEP_3" => Ok(Self::WorkflowStep3),
            other => Err(RoleError::UnknownRole(other.to_string())),
        }
    }
}

/// A group of people and nested groups.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: Uuid,
    /// Unique within a repository; the identity used when importing.
    pub name: String,
    pub people: Vec<Uuid>,
    pub groups: Vec<Uuid>,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            people: Vec::new(),
            groups: Vec::new(),
        }
    }

    pub fn with_person(mut self, person: Uuid) -> Self {
        self.people.push(person);
        self
    }

    pub fn with_group(mut self, group: Uuid) -> Self {
        self.groups.push(group);
        self
    }
}

/// An account. The email address is its identity across repositories.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: Uuid,
    pub email: String,
    pub netid: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub language: Option<String>,
    pub can_login: bool,
}

impl Person {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            netid: None,
            first_name: None,
            last_name: None,
            language: None,
            can_login: true,
        }
    }

    pub fn with_name(mut self, first: impl Into<String>, last: impl Into<String>) -> Self {
        self.first_name = Some(first.into());
        self.last_name = Some(last.into());
        self
    }
}

/// Ties a group to one role of the scoped object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Association {
    pub group: Uuid,
    pub role: Role,
}

/// Snapshot of the groups, people and role assignments relevant to one object.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleGraph {
    /// Internal id of the object the graph was exported for.
    pub source: Option<Uuid>,
    pub groups: Vec<Group>,
    pub people: Vec<Person>,
    pub associations: Vec<Association>,
}

impl RoleGraph {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty() && self.people.is_empty()
    }

    pub fn group(&self, id: Uuid) -> Option<&Group> {
        self.groups.iter().find(|g| g.id == id)
    }

    pub fn person(&self, id: Uuid) -> Option<&Person> {
        self.people.iter().find(|p| p.id == id)
    }

    /// Add a group unless one with the same id is already present.
    pub fn add_group(&mut self, group: Group) -> bool {
        if self.group(group.id).is_some() {
            return false;
        }
        self.groups.push(group);
        true
    }

    pub fn add_person(&mut self, person: Person) -> bool {
        if self.person(person.id).is_some() {
            return false;
        }
        self.people.push(person);
        true
    }
}
