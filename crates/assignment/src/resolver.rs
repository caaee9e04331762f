//! Overlay assignment backend.
//!
//! Wraps a live [`AssignmentBackend`] and merges the static overlay into its
//! reads. Live results always come first, in the live store's order; overlay
//! contributions are appended after them. The overlay only ever adds grants:
//! a live grant is never hidden and a live error other than not-found is never
//! masked.
//!
//! Every write is rejected with [`AssignmentError::ReadOnly`] before reaching
//! the live store.

use overlay_core::{
    AssignmentBackend, AssignmentError, AssignmentFilter, AssignmentResult, GrantQuery, GroupId,
    ProjectId, RealmId, RoleAssignment, RoleId, UserId,
};

use crate::config::{OverlayConfig, OverlayListing};
use crate::loader::{LoadError, OverlayLoader, StaticOverlay};
use crate::lookup::LookupServices;
use crate::source::SourceMapping;

pub struct OverlayAssignmentBackend<S> {
    live: S,
    overlay: StaticOverlay,
    listing: OverlayListing,
}

impl<S> OverlayAssignmentBackend<S> {
    pub fn new(live: S, overlay: StaticOverlay) -> Self {
        Self {
            live,
            overlay,
            listing: OverlayListing::default(),
        }
    }

    pub fn with_listing(mut self, listing: OverlayListing) -> Self {
        self.listing = listing;
        self
    }

    /// Read the mapping file named by `config`, resolve it and wrap `live`.
    pub fn from_config(
        live: S,
        services: LookupServices<'_>,
        config: &OverlayConfig,
    ) -> Result<Self, LoadError> {
        let source = SourceMapping::from_path(&config.mapping_path)?;
        let overlay = OverlayLoader::new(services, config).load(&source)?;
        Ok(Self::new(live, overlay).with_listing(config.overlay_listing))
    }

    pub fn overlay(&self) -> &StaticOverlay {
        &self.overlay
    }

    pub fn live(&self) -> &S {
        &self.live
    }

    /// Whether the overlay alone grants its role for `query`.
    ///
    /// Only direct user-on-project queries can match; group, realm and
    /// inherited queries never consult the overlay.
    fn overlay_grants(&self, query: &GrantQuery) -> bool {
        if !query.is_direct_user_project() {
            return false;
        }
        match (&query.user, &query.project) {
            (Some(user), Some(project)) => self.overlay.index().grants(user, project),
            _ => false,
        }
    }

    fn synthesized(&self) -> impl Iterator<Item = RoleAssignment> + '_ {
        let role_id = self.overlay.role_id();
        self.overlay.index().iter().map(move |(user, project)| {
            RoleAssignment::user_on_project(role_id.clone(), user.clone(), project.clone())
        })
    }
}

impl<S> AssignmentBackend for OverlayAssignmentBackend<S>
where
    S: AssignmentBackend,
{
    /// The overlay role is appended without deduplicating against live roles.
    fn list_grant_role_ids(&self, query: &GrantQuery) -> AssignmentResult<Vec<RoleId>> {
        let mut roles = self.live.list_grant_role_ids(query)?;
        if self.overlay_grants(query) {
            roles.push(self.overlay.role_id().clone());
        }
        Ok(roles)
    }

    fn check_grant_role_id(&self, role_id: &RoleId, query: &GrantQuery) -> AssignmentResult<()> {
        match self.live.check_grant_role_id(role_id, query) {
            Err(err)
                if err.is_not_found()
                    && role_id == self.overlay.role_id()
                    && self.overlay_grants(query) =>
            {
                tracing::debug!(role = %role_id, scope = %query, "grant satisfied by static overlay");
                Ok(())
            }
            other => other,
        }
    }

    fn list_role_assignments(
        &self,
        filter: &AssignmentFilter,
    ) -> AssignmentResult<Vec<RoleAssignment>> {
        let mut assignments = self.live.list_role_assignments(filter)?;
        match self.listing {
            OverlayListing::Filtered => {
                assignments.extend(self.synthesized().filter(|a| filter.matches(a)))
            }
            OverlayListing::Unfiltered => assignments.extend(self.synthesized()),
        }
        Ok(assignments)
    }

    fn list_project_ids_for_user(&self, user_id: &UserId) -> AssignmentResult<Vec<ProjectId>> {
        let mut projects = self.live.list_project_ids_for_user(user_id)?;
        if let Some(extra) = self.overlay.index().projects_for(user_id) {
            for project in extra {
                if !projects.contains(project) {
                    projects.push(project.clone());
                }
            }
        }
        Ok(projects)
    }

    fn list_user_ids_for_project(&self, project_id: &ProjectId) -> AssignmentResult<Vec<UserId>> {
        let mut users = self.live.list_user_ids_for_project(project_id)?;
        for user in self.overlay.index().users_for(project_id) {
            if !users.contains(user) {
                users.push(user.clone());
            }
        }
        Ok(users)
    }

    fn add_role_to_user_and_project(
        &self,
        _user_id: &UserId,
        _project_id: &ProjectId,
        _role_id: &RoleId,
    ) -> AssignmentResult<()> {
        Err(AssignmentError::read_only("add_role_to_user_and_project"))
    }

    fn remove_role_from_user_and_project(
        &self,
        _user_id: &UserId,
        _project_id: &ProjectId,
        _role_id: &RoleId,
    ) -> AssignmentResult<()> {
        Err(AssignmentError::read_only("remove_role_from_user_and_project"))
    }

    fn create_grant(&self, _role_id: &RoleId, _query: &GrantQuery) -> AssignmentResult<()> {
        Err(AssignmentError::read_only("create_grant"))
    }

    fn delete_grant(&self, _role_id: &RoleId, _query: &GrantQuery) -> AssignmentResult<()> {
        Err(AssignmentError::read_only("delete_grant"))
    }

    fn delete_project_assignments(&self, _project_id: &ProjectId) -> AssignmentResult<()> {
        Err(AssignmentError::read_only("delete_project_assignments"))
    }

    fn delete_role_assignments(&self, _role_id: &RoleId) -> AssignmentResult<()> {
        Err(AssignmentError::read_only("delete_role_assignments"))
    }

    fn delete_user_assignments(&self, _user_id: &UserId) -> AssignmentResult<()> {
        Err(AssignmentError::read_only("delete_user_assignments"))
    }

    fn delete_group_assignments(&self, _group_id: &GroupId) -> AssignmentResult<()> {
        Err(AssignmentError::read_only("delete_group_assignments"))
    }

    fn delete_realm_assignments(&self, _realm_id: &RealmId) -> AssignmentResult<()> {
        Err(AssignmentError::read_only("delete_realm_assignments"))
    }
}
