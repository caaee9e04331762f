use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use overlay_core::{
    Actor, AssignmentBackend, AssignmentError, AssignmentFilter, AssignmentResult, GrantQuery,
    GroupId, ProjectId, RealmId, RoleAssignment, RoleId, Target, UserId,
};

/// Writable in-memory assignment backend.
///
/// Keeps grants in insertion order; listings return them in that order.
#[derive(Debug, Default)]
pub struct InMemoryAssignmentStore {
    assignments: RwLock<Vec<RoleAssignment>>,
}

impl InMemoryAssignmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_assignments(assignments: impl IntoIterator<Item = RoleAssignment>) -> Self {
        Self {
            assignments: RwLock::new(assignments.into_iter().collect()),
        }
    }

    pub fn len(&self) -> AssignmentResult<usize> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> AssignmentResult<bool> {
        Ok(self.read()?.is_empty())
    }

    fn read(&self) -> AssignmentResult<RwLockReadGuard<'_, Vec<RoleAssignment>>> {
        self.assignments
            .read()
            .map_err(|_| AssignmentError::Backend("lock poisoned".to_string()))
    }

    fn write(&self) -> AssignmentResult<RwLockWriteGuard<'_, Vec<RoleAssignment>>> {
        self.assignments
            .write()
            .map_err(|_| AssignmentError::Backend("lock poisoned".to_string()))
    }

    fn grant_from_query(role_id: &RoleId, query: &GrantQuery) -> AssignmentResult<RoleAssignment> {
        let actor = match (&query.user, &query.group) {
            (Some(user), None) => Actor::User(user.clone()),
            (None, Some(group)) => Actor::Group(group.clone()),
            _ => {
                return Err(AssignmentError::Validation(format!(
                    "grant requires exactly one of user or group ({query})"
                )));
            }
        };

        let target = match (&query.project, &query.realm) {
            (Some(project), None) => Target::Project(project.clone()),
            (None, Some(realm)) => Target::Realm(realm.clone()),
            _ => {
                return Err(AssignmentError::Validation(format!(
                    "grant requires exactly one of project or realm ({query})"
                )));
            }
        };

        Ok(RoleAssignment {
            role_id: role_id.clone(),
            actor,
            target,
            inherited: query.inherited,
        })
    }

    fn retain(&self, keep: impl Fn(&RoleAssignment) -> bool) -> AssignmentResult<()> {
        self.write()?.retain(|a| keep(a));
        Ok(())
    }
}

fn push_unique<T: PartialEq>(out: &mut Vec<T>, value: T) {
    if !out.contains(&value) {
        out.push(value);
    }
}

impl AssignmentBackend for InMemoryAssignmentStore {
    fn list_grant_role_ids(&self, query: &GrantQuery) -> AssignmentResult<Vec<RoleId>> {
        let assignments = self.read()?;
        let mut roles = Vec::new();
        for a in assignments.iter().filter(|a| query.matches(a)) {
            push_unique(&mut roles, a.role_id.clone());
        }
        Ok(roles)
    }

    fn check_grant_role_id(&self, role_id: &RoleId, query: &GrantQuery) -> AssignmentResult<()> {
        let assignments = self.read()?;
        if assignments
            .iter()
            .any(|a| &a.role_id == role_id && query.matches(a))
        {
            Ok(())
        } else {
            Err(AssignmentError::not_found(role_id, query.to_string()))
        }
    }

    fn list_role_assignments(
        &self,
        filter: &AssignmentFilter,
    ) -> AssignmentResult<Vec<RoleAssignment>> {
        let assignments = self.read()?;
        Ok(assignments
            .iter()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect())
    }

    fn list_project_ids_for_user(&self, user_id: &UserId) -> AssignmentResult<Vec<ProjectId>> {
        let assignments = self.read()?;
        let mut projects = Vec::new();
        for a in assignments.iter().filter(|a| !a.inherited) {
            if let (Some(user), Some(project)) = (a.user_id(), a.project_id()) {
                if user == user_id {
                    push_unique(&mut projects, project.clone());
                }
            }
        }
        Ok(projects)
    }

    fn list_user_ids_for_project(&self, project_id: &ProjectId) -> AssignmentResult<Vec<UserId>> {
        let assignments = self.read()?;
        let mut users = Vec::new();
        for a in assignments.iter().filter(|a| !a.inherited) {
            if let (Some(user), Some(project)) = (a.user_id(), a.project_id()) {
                if project == project_id {
                    push_unique(&mut users, user.clone());
                }
            }
        }
        Ok(users)
    }

    fn add_role_to_user_and_project(
        &self,
        user_id: &UserId,
        project_id: &ProjectId,
        role_id: &RoleId,
    ) -> AssignmentResult<()> {
        self.create_grant(
            role_id,
            &GrantQuery::user_on_project(user_id.clone(), project_id.clone()),
        )
    }

    fn remove_role_from_user_and_project(
        &self,
        user_id: &UserId,
        project_id: &ProjectId,
        role_id: &RoleId,
    ) -> AssignmentResult<()> {
        self.delete_grant(
            role_id,
            &GrantQuery::user_on_project(user_id.clone(), project_id.clone()),
        )
    }

    /// Granting an existing grant again is a no-op.
    fn create_grant(&self, role_id: &RoleId, query: &GrantQuery) -> AssignmentResult<()> {
        let grant = Self::grant_from_query(role_id, query)?;
        let mut assignments = self.write()?;
        push_unique(&mut *assignments, grant);
        Ok(())
    }

    fn delete_grant(&self, role_id: &RoleId, query: &GrantQuery) -> AssignmentResult<()> {
        let grant = Self::grant_from_query(role_id, query)?;
        let mut assignments = self.write()?;
        let before = assignments.len();
        assignments.retain(|a| a != &grant);
        if assignments.len() == before {
            return Err(AssignmentError::not_found(role_id, query.to_string()));
        }
        Ok(())
    }

    fn delete_project_assignments(&self, project_id: &ProjectId) -> AssignmentResult<()> {
        self.retain(|a| a.project_id() != Some(project_id))
    }

    fn delete_role_assignments(&self, role_id: &RoleId) -> AssignmentResult<()> {
        self.retain(|a| &a.role_id != role_id)
    }

    fn delete_user_assignments(&self, user_id: &UserId) -> AssignmentResult<()> {
        self.retain(|a| a.user_id() != Some(user_id))
    }

    fn delete_group_assignments(&self, group_id: &GroupId) -> AssignmentResult<()> {
        self.retain(|a| a.actor != Actor::Group(group_id.clone()))
    }

    fn delete_realm_assignments(&self, realm_id: &RealmId) -> AssignmentResult<()> {
        self.retain(|a| a.target != Target::Realm(realm_id.clone()))
    }
}
