use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use uuid::Uuid;

use overlay_core::{LocalId, LookupError, ProjectId, RealmId, RoleId};

use crate::lookup::{IdentityLookup, ProjectRecord, ResourceLookup, RoleLookup, RoleRecord, UserRecord};

/// In-memory resource, role and identity service.
///
/// Identifiers are derived from names, so two directories populated the same
/// way hand out the same ids.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    projects: Vec<ProjectRecord>,
    roles: Vec<RoleRecord>,
    users: HashMap<(String, String), UserRecord>,
    failing: HashSet<String>,
    project_lookups: AtomicUsize,
}

fn derived_id(kind: &str, scope: &str, name: &str, seq: usize) -> String {
    let key = format!("{kind}/{scope}/{name}/{seq}");
    Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes())
        .simple()
        .to_string()
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a realm (a top-level project).
    pub fn add_realm(&mut self, name: &str) -> RealmId {
        let id = ProjectId::new(derived_id("realm", "", name, 0));
        self.projects.push(ProjectRecord {
            id: id.clone(),
            name: name.to_string(),
            realm_id: None,
            is_realm: true,
        });
        RealmId::new(id.into_inner())
    }

    pub fn add_project(&mut self, name: &str, realm_id: &RealmId) -> ProjectId {
        let id = ProjectId::new(derived_id("project", realm_id.as_str(), name, 0));
        self.projects.push(ProjectRecord {
            id: id.clone(),
            name: name.to_string(),
            realm_id: Some(realm_id.clone()),
            is_realm: false,
        });
        id
    }

    /// Register a role. Names may repeat; each call yields a distinct id.
    pub fn add_role(&mut self, name: &str) -> RoleId {
        let seq = self.roles.iter().filter(|r| r.name == name).count();
        let id = RoleId::new(derived_id("role", "", name, seq));
        self.roles.push(RoleRecord {
            id: id.clone(),
            name: name.to_string(),
        });
        id
    }

    /// Register a user with the identity provider of `realm_name`.
    pub fn add_user(&mut self, name: &str, realm_name: &str) -> LocalId {
        let local_id = LocalId::new(derived_id("user", realm_name, name, 0));
        self.users.insert(
            (realm_name.to_string(), name.to_string()),
            UserRecord {
                local_id: local_id.clone(),
                name: name.to_string(),
            },
        );
        local_id
    }

    pub fn local_id(&self, name: &str, realm_name: &str) -> Option<LocalId> {
        self.users
            .get(&(realm_name.to_string(), name.to_string()))
            .map(|u| u.local_id.clone())
    }

    /// Make every lookup of `name` report the service as unavailable.
    pub fn fail_lookups_for(&mut self, name: &str) {
        self.failing.insert(name.to_string());
    }

    /// Number of project/realm lookups served so far.
    pub fn project_lookups(&self) -> usize {
        self.project_lookups.load(Ordering::Relaxed)
    }

    fn check_available(&self, name: &str) -> Result<(), LookupError> {
        if self.failing.contains(name) {
            return Err(LookupError::Unavailable(format!("lookup of '{name}' failed")));
        }
        Ok(())
    }
}

impl ResourceLookup for InMemoryDirectory {
    fn get_project_by_name(
        &self,
        name: &str,
        realm_id: Option<&RealmId>,
    ) -> Result<ProjectRecord, LookupError> {
        self.project_lookups.fetch_add(1, Ordering::Relaxed);
        self.check_available(name)?;

        self.projects
            .iter()
            .find(|p| p.name == name && p.realm_id.as_ref() == realm_id)
            .cloned()
            .ok_or_else(|| LookupError::not_found("project", name))
    }
}

impl RoleLookup for InMemoryDirectory {
    fn list_roles_by_name(&self, name: &str) -> Result<Vec<RoleRecord>, LookupError> {
        self.check_available(name)?;
        Ok(self.roles.iter().filter(|r| r.name == name).cloned().collect())
    }
}

impl IdentityLookup for InMemoryDirectory {
    fn get_user_by_name(&self, name: &str, realm_name: &str) -> Result<UserRecord, LookupError> {
        self.check_available(name)?;
        self.users
            .get(&(realm_name.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| LookupError::not_found("user", name))
    }
}
