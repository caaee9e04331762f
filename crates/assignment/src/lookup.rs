//! Lookup collaborators the overlay resolves names through.
//!
//! None of these are implemented here for production use; the overlay only
//! depends on their call contracts. In-memory versions live in
//! [`crate::memory`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use overlay_core::{EntityKind, LocalId, LookupError, ProjectId, RealmId, RoleId};

/// A project (or a realm, which is a top-level project) as returned by the
/// resource service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub id: ProjectId,
    pub name: String,
    /// Owning realm; `None` for realms themselves.
    pub realm_id: Option<RealmId>,
    #[serde(default)]
    pub is_realm: bool,
}

impl ProjectRecord {
    /// Reinterpret this record's identifier as a realm identifier.
    pub fn into_realm_id(self) -> RealmId {
        RealmId::new(self.id.into_inner())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRecord {
    pub id: RoleId,
    pub name: String,
}

/// A user as known to one identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub local_id: LocalId,
    pub name: String,
}

/// Key of the identifier-mapping service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocalIdentity {
    pub realm_id: RealmId,
    pub local_id: LocalId,
    pub entity_kind: EntityKind,
}

/// Resolves projects (and realms) by name.
pub trait ResourceLookup: Send + Sync {
    /// Look up a project by name inside `realm_id`, or a realm by name when
    /// `realm_id` is `None`.
    fn get_project_by_name(
        &self,
        name: &str,
        realm_id: Option<&RealmId>,
    ) -> Result<ProjectRecord, LookupError>;
}

/// Resolves roles by name.
pub trait RoleLookup: Send + Sync {
    /// All roles carrying `name`, in the service's natural order.
    fn list_roles_by_name(&self, name: &str) -> Result<Vec<RoleRecord>, LookupError>;
}

/// Identity provider driver for a single realm.
pub trait IdentityLookup: Send + Sync {
    fn get_user_by_name(&self, name: &str, realm_name: &str) -> Result<UserRecord, LookupError>;
}

/// Maps provider-local identifiers to stable public identifiers.
///
/// Assumed deterministic and already populated.
pub trait IdMapping: Send + Sync {
    fn get_public_id(&self, identity: &LocalIdentity) -> Result<String, LookupError>;
}

/// The collaborators the loader needs, borrowed for the duration of a load.
#[derive(Clone, Copy)]
pub struct LookupServices<'a> {
    pub resources: &'a dyn ResourceLookup,
    pub roles: &'a dyn RoleLookup,
    pub identities: &'a dyn IdentityLookup,
    pub id_mapping: &'a dyn IdMapping,
}

impl<'a> LookupServices<'a> {
    pub fn new(
        resources: &'a dyn ResourceLookup,
        roles: &'a dyn RoleLookup,
        identities: &'a dyn IdentityLookup,
        id_mapping: &'a dyn IdMapping,
    ) -> Self {
        Self {
            resources,
            roles,
            identities,
            id_mapping,
        }
    }
}

impl core::fmt::Debug for LookupServices<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LookupServices").finish_non_exhaustive()
    }
}

impl<S> ResourceLookup for Arc<S>
where
    S: ResourceLookup + ?Sized,
{
    fn get_project_by_name(
        &self,
        name: &str,
        realm_id: Option<&RealmId>,
    ) -> Result<ProjectRecord, LookupError> {
        (**self).get_project_by_name(name, realm_id)
    }
}

impl<S> RoleLookup for Arc<S>
where
    S: RoleLookup + ?Sized,
{
    fn list_roles_by_name(&self, name: &str) -> Result<Vec<RoleRecord>, LookupError> {
        (**self).list_roles_by_name(name)
    }
}

impl<S> IdentityLookup for Arc<S>
where
    S: IdentityLookup + ?Sized,
{
    fn get_user_by_name(&self, name: &str, realm_name: &str) -> Result<UserRecord, LookupError> {
        (**self).get_user_by_name(name, realm_name)
    }
}

impl<S> IdMapping for Arc<S>
where
    S: IdMapping + ?Sized,
{
    fn get_public_id(&self, identity: &LocalIdentity) -> Result<String, LookupError> {
        (**self).get_public_id(identity)
    }
}
