use std::sync::Arc;

use crate::assignment::{AssignmentFilter, GrantQuery, RoleAssignment};
use crate::error::AssignmentResult;
use crate::id::{GroupId, ProjectId, RealmId, RoleId, UserId};

/// Generic role-assignment backend.
///
/// Answers "who holds what role on what target" and, for writable backends,
/// records and removes grants. Implementations must be safe to share across
/// threads; every method takes `&self`.
///
/// ## Read operations
///
/// - `list_grant_role_ids`: role ids granted for one actor/target pairing
/// - `check_grant_role_id`: `Ok(())` if the grant exists,
///   `Err(AssignmentError::RoleAssignmentNotFound)` otherwise
/// - `list_role_assignments`: every assignment matching a filter
/// - `list_project_ids_for_user`: projects a user holds any direct role on
/// - `list_user_ids_for_project`: users holding any direct role on a project
///
/// ## Write operations
///
/// Everything else. A backend that cannot be written returns
/// `AssignmentError::ReadOnly`.
pub trait AssignmentBackend: Send + Sync {
    fn list_grant_role_ids(&self, query: &GrantQuery) -> AssignmentResult<Vec<RoleId>>;

    fn check_grant_role_id(&self, role_id: &RoleId, query: &GrantQuery) -> AssignmentResult<()>;

    fn list_role_assignments(
        &self,
        filter: &AssignmentFilter,
    ) -> AssignmentResult<Vec<RoleAssignment>>;

    fn list_project_ids_for_user(&self, user_id: &UserId) -> AssignmentResult<Vec<ProjectId>>;

    fn list_user_ids_for_project(&self, project_id: &ProjectId) -> AssignmentResult<Vec<UserId>>;

    fn add_role_to_user_and_project(
        &self,
        user_id: &UserId,
        project_id: &ProjectId,
        role_id: &RoleId,
    ) -> AssignmentResult<()>;

    fn remove_role_from_user_and_project(
        &self,
        user_id: &UserId,
        project_id: &ProjectId,
        role_id: &RoleId,
    ) -> AssignmentResult<()>;

    fn create_grant(&self, role_id: &RoleId, query: &GrantQuery) -> AssignmentResult<()>;

    fn delete_grant(&self, role_id: &RoleId, query: &GrantQuery) -> AssignmentResult<()>;

    fn delete_project_assignments(&self, project_id: &ProjectId) -> AssignmentResult<()>;

    fn delete_role_assignments(&self, role_id: &RoleId) -> AssignmentResult<()>;

    fn delete_user_assignments(&self, user_id: &UserId) -> AssignmentResult<()>;

    fn delete_group_assignments(&self, group_id: &GroupId) -> AssignmentResult<()>;

    fn delete_realm_assignments(&self, realm_id: &RealmId) -> AssignmentResult<()>;
}

impl<S> AssignmentBackend for Arc<S>
where
    S: AssignmentBackend + ?Sized,
{
    fn list_grant_role_ids(&self, query: &GrantQuery) -> AssignmentResult<Vec<RoleId>> {
        (**self).list_grant_role_ids(query)
    }

    fn check_grant_role_id(&self, role_id: &RoleId, query: &GrantQuery) -> AssignmentResult<()> {
        (**self).check_grant_role_id(role_id, query)
    }

    fn list_role_assignments(
        &self,
        filter: &AssignmentFilter,
    ) -> AssignmentResult<Vec<RoleAssignment>> {
        (**self).list_role_assignments(filter)
    }

    fn list_project_ids_for_user(&self, user_id: &UserId) -> AssignmentResult<Vec<ProjectId>> {
        (**self).list_project_ids_for_user(user_id)
    }

    fn list_user_ids_for_project(&self, project_id: &ProjectId) -> AssignmentResult<Vec<UserId>> {
        (**self).list_user_ids_for_project(project_id)
    }

    fn add_role_to_user_and_project(
        &self,
        user_id: &UserId,
        project_id: &ProjectId,
        role_id: &RoleId,
    ) -> AssignmentResult<()> {
        (**self).add_role_to_user_and_project(user_id, project_id, role_id)
    }

    fn remove_role_from_user_and_project(
        &self,
        user_id: &UserId,
        project_id: &ProjectId,
        role_id: &RoleId,
    ) -> AssignmentResult<()> {
        (**self).remove_role_from_user_and_project(user_id, project_id, role_id)
    }

    fn create_grant(&self, role_id: &RoleId, query: &GrantQuery) -> AssignmentResult<()> {
        (**self).create_grant(role_id, query)
    }

    fn delete_grant(&self, role_id: &RoleId, query: &GrantQuery) -> AssignmentResult<()> {
        (**self).delete_grant(role_id, query)
    }

    fn delete_project_assignments(&self, project_id: &ProjectId) -> AssignmentResult<()> {
        (**self).delete_project_assignments(project_id)
    }

    fn delete_role_assignments(&self, role_id: &RoleId) -> AssignmentResult<()> {
        (**self).delete_role_assignments(role_id)
    }

    fn delete_user_assignments(&self, user_id: &UserId) -> AssignmentResult<()> {
        (**self).delete_user_assignments(user_id)
    }

    fn delete_group_assignments(&self, group_id: &GroupId) -> AssignmentResult<()> {
        (**self).delete_group_assignments(group_id)
    }

    fn delete_realm_assignments(&self, realm_id: &RealmId) -> AssignmentResult<()> {
        (**self).delete_realm_assignments(realm_id)
    }
}
