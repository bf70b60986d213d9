//! Role-based access control.
//!
//! Two tables drive every check:
//!
//! - `includes`: which roles a role subsumes (a partial order). The closure
//!   is computed once, and every role always includes itself.
//! - `requirements`: for each [`Action`], the roles that may perform it. A
//!   caller is permitted when its role includes any of them.
//!
//! Both are read from the `[access]` config section. Entries present in the
//! config replace the default entry for that key.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::{Role, Session};
use crate::shared::errors::DomainError;

/// Operations guarded by the access policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    ReviewRegistrations,
    ManageUsers,
    ManageAllocations,
    RecordUat,
    RecordQuality,
    ViewAllRecords,
    ViewAudit,
}

impl Action {
    pub const ALL: [Action; 7] = [
        Action::ReviewRegistrations,
        Action::ManageUsers,
        Action::ManageAllocations,
        Action::RecordUat,
        Action::RecordQuality,
        Action::ViewAllRecords,
        Action::ViewAudit,
    ];
}

/// Raw, serializable form of the policy tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessTable {
    pub includes: HashMap<Role, Vec<Role>>,
    pub requirements: HashMap<Action, Vec<Role>>,
}

impl AccessTable {
    pub fn defaults() -> Self {
        let includes = HashMap::from([
            (Role::Superuser, vec![Role::Manager, Role::Admin, Role::User]),
            (Role::Manager, vec![Role::User]),
            (Role::Admin, vec![Role::User]),
            (Role::User, vec![]),
        ]);

        let requirements = HashMap::from([
            (Action::ReviewRegistrations, vec![Role::Admin]),
            (Action::ManageUsers, vec![Role::Admin]),
            (Action::ManageAllocations, vec![Role::Manager, Role::Admin]),
            (Action::RecordUat, vec![Role::User]),
            (Action::RecordQuality, vec![Role::User]),
            (Action::ViewAllRecords, vec![Role::Manager, Role::Admin]),
            (Action::ViewAudit, vec![Role::Admin]),
        ]);

        Self {
            includes,
            requirements,
        }
    }

    /// Overlay `other` on top of `self`, key by key.
    pub fn merged_with(mut self, other: &AccessTable) -> Self {
        for (role, included) in &other.includes {
            self.includes.insert(*role, included.clone());
        }
        for (action, roles) in &other.requirements {
            self.requirements.insert(*action, roles.clone());
        }
        self
    }
}

/// Resolved access policy.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    closure: HashMap<Role, HashSet<Role>>,
    requirements: HashMap<Action, Vec<Role>>,
}

impl AccessPolicy {
    /// Build a policy from the defaults overlaid with `overrides`.
    pub fn from_table(overrides: &AccessTable) -> Self {
        let table = AccessTable::defaults().merged_with(overrides);

        let closure = Role::ALL
            .iter()
            .map(|role| (*role, reachable_from(*role, &table.includes)))
            .collect();

        Self {
            closure,
            requirements: table.requirements,
        }
    }

    /// Whether `role` covers everything `required` may do.
    pub fn authorize(&self, role: Role, required: Role) -> bool {
        self.closure
            .get(&role)
            .is_some_and(|included| included.contains(&required))
    }

    pub fn permits(&self, role: Role, action: Action) -> bool {
        self.requirements
            .get(&action)
            .is_some_and(|required| required.iter().any(|r| self.authorize(role, *r)))
    }

    /// Fail with `Unauthorized` unless the session may perform `action`.
    pub fn require(&self, session: &Session, action: Action) -> Result<(), DomainError> {
        if self.permits(session.role, action) {
            Ok(())
        } else {
            Err(DomainError::Unauthorized(format!(
                "role '{}' may not perform {:?}",
                session.role, action
            )))
        }
    }
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::from_table(&AccessTable::default())
    }
}

fn reachable_from(start: Role, includes: &HashMap<Role, Vec<Role>>) -> HashSet<Role> {
    let mut seen = HashSet::from([start]);
    let mut stack = vec![start];
    while let Some(role) = stack.pop() {
        for next in includes.get(&role).into_iter().flatten() {
            if seen.insert(*next) {
                stack.push(*next);
            }
        }
    }
    seen
}
