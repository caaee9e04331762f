//! Role-assignment records and the query shapes used to select them.

use serde::{Deserialize, Serialize};

use crate::id::{GroupId, ProjectId, RealmId, RoleId, UserId};

/// Who holds a role.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Actor {
    User(UserId),
    Group(GroupId),
}

/// Where a role is held.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    Project(ProjectId),
    Realm(RealmId),
}

/// A single grant: `role` held by `actor` on `target`.
///
/// `inherited` marks grants that apply to the target's descendants rather than
/// to the target itself.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub role_id: RoleId,
    pub actor: Actor,
    pub target: Target,
    #[serde(default)]
    pub inherited: bool,
}

impl RoleAssignment {
    /// Direct (non-inherited) grant of a role to a user on a project.
    pub fn user_on_project(role_id: RoleId, user_id: UserId, project_id: ProjectId) -> Self {
        Self {
            role_id,
            actor: Actor::User(user_id),
            target: Target::Project(project_id),
            inherited: false,
        }
    }

    pub fn user_id(&self) -> Option<&UserId> {
        match &self.actor {
            Actor::User(id) => Some(id),
            Actor::Group(_) => None,
        }
    }

    pub fn project_id(&self) -> Option<&ProjectId> {
        match &self.target {
            Target::Project(id) => Some(id),
            Target::Realm(_) => None,
        }
    }
}

/// Selects the grants for exactly one actor/target pairing.
///
/// Used by the grant-level operations (list role ids, check, create, delete).
/// Absent fields do not constrain the match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantQuery {
    pub user: Option<UserId>,
    pub group: Option<GroupId>,
    pub realm: Option<RealmId>,
    pub project: Option<ProjectId>,
    #[serde(default)]
    pub inherited: bool,
}

impl GrantQuery {
    pub fn user_on_project(user: UserId, project: ProjectId) -> Self {
        Self {
            user: Some(user),
            project: Some(project),
            ..Self::default()
        }
    }

    pub fn group_on_project(group: GroupId, project: ProjectId) -> Self {
        Self {
            group: Some(group),
            project: Some(project),
            ..Self::default()
        }
    }

    pub fn user_on_realm(user: UserId, realm: RealmId) -> Self {
        Self {
            user: Some(user),
            realm: Some(realm),
            ..Self::default()
        }
    }

    pub fn inherited(mut self) -> Self {
        self.inherited = true;
        self
    }

    /// True when the query names a user on a project, directly, with no group
    /// or realm involved.
    pub fn is_direct_user_project(&self) -> bool {
        self.user.is_some()
            && self.project.is_some()
            && self.group.is_none()
            && self.realm.is_none()
            && !self.inherited
    }

    /// Whether `assignment` falls under this query.
    pub fn matches(&self, assignment: &RoleAssignment) -> bool {
        if assignment.inherited != self.inherited {
            return false;
        }

        let actor_ok = match &assignment.actor {
            Actor::User(id) => {
                self.group.is_none() && self.user.as_ref().is_none_or(|u| u == id)
            }
            Actor::Group(id) => {
                self.user.is_none() && self.group.as_ref().is_none_or(|g| g == id)
            }
        };

        let target_ok = match &assignment.target {
            Target::Project(id) => {
                self.realm.is_none() && self.project.as_ref().is_none_or(|p| p == id)
            }
            Target::Realm(id) => {
                self.project.is_none() && self.realm.as_ref().is_none_or(|r| r == id)
            }
        };

        actor_ok && target_ok
    }
}

impl core::fmt::Display for GrantQuery {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut parts: Vec<String> = Vec::new();
        if let Some(u) = &self.user {
            parts.push(format!("user={u}"));
        }
        if let Some(g) = &self.group {
            parts.push(format!("group={g}"));
        }
        if let Some(r) = &self.realm {
            parts.push(format!("realm={r}"));
        }
        if let Some(p) = &self.project {
            parts.push(format!("project={p}"));
        }
        if self.inherited {
            parts.push("inherited".to_string());
        }
        if parts.is_empty() {
            f.write_str("unscoped")
        } else {
            f.write_str(&parts.join(", "))
        }
    }
}

/// Filter for listing role assignments.
///
/// Actor filters (`user`, `groups`) combine as a union, as do target filters
/// (`realm`, `projects`); the role, actor, target and inheritance filters are
/// then intersected. An empty `groups` or `projects` list constrains nothing.
/// `inherited: None` accepts both direct and inherited grants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentFilter {
    pub role: Option<RoleId>,
    pub user: Option<UserId>,
    pub groups: Option<Vec<GroupId>>,
    pub realm: Option<RealmId>,
    pub projects: Option<Vec<ProjectId>>,
    pub inherited: Option<bool>,
}

impl AssignmentFilter {
    pub fn for_user(user: UserId) -> Self {
        Self {
            user: Some(user),
            ..Self::default()
        }
    }

    pub fn for_role(role: RoleId) -> Self {
        Self {
            role: Some(role),
            ..Self::default()
        }
    }

    pub fn for_projects(projects: Vec<ProjectId>) -> Self {
        Self {
            projects: Some(projects),
            ..Self::default()
        }
    }

    pub fn matches(&self, assignment: &RoleAssignment) -> bool {
        if let Some(role) = &self.role {
            if &assignment.role_id != role {
                return false;
            }
        }

        if let Some(inherited) = self.inherited {
            if assignment.inherited != inherited {
                return false;
            }
        }

        let groups = self.groups.as_deref().unwrap_or_default();
        let constrains_actor = self.user.is_some() || !groups.is_empty();
        if constrains_actor {
            let hit = match &assignment.actor {
                Actor::User(id) => self.user.as_ref() == Some(id),
                Actor::Group(id) => groups.contains(id),
            };
            if !hit {
                return false;
            }
        }

        let projects = self.projects.as_deref().unwrap_or_default();
        let constrains_target = self.realm.is_some() || !projects.is_empty();
        if constrains_target {
            let hit = match &assignment.target {
                Target::Project(id) => projects.contains(id),
                Target::Realm(id) => self.realm.as_ref() == Some(id),
            };
            if !hit {
                return false;
            }
        }

        true
    }
}
