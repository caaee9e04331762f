//! Overlay loader: resolves the static source mapping into stable identifiers.
//!
//! Runs exactly once, before the overlay backend is reachable by callers.
//!
//! ## Failure policy
//!
//! - The overlay realm and the overlay role must resolve; otherwise loading
//!   fails and the backend is never constructed.
//! - A user whose identity or stable id cannot be resolved is skipped.
//! - A project that cannot be resolved is skipped for that user.
//!
//! Skips are logged and counted in [`LoadReport`]; loading continues. Every
//! lookup is attempted once per row, without retries.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use overlay_core::{EntityKind, LookupError, ProjectId, RealmId, RoleId, UserId};

use crate::config::{ConfigError, OverlayConfig};
use crate::index::StaticAssignmentIndex;
use crate::lookup::{LocalIdentity, LookupServices, ResourceLookup};
use crate::source::{SourceError, SourceMapping};

/// Construction failure. The overlay cannot serve without its realm and role.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("overlay realm '{0}' not found")]
    RealmNotFound(String),

    #[error("overlay role '{0}' not found")]
    RoleNotFound(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("failed to resolve overlay {what} '{name}': {source}")]
    Lookup {
        what: &'static str,
        name: String,
        #[source]
        source: LookupError,
    },
}

/// The realm all overlay users belong to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverlayRealm {
    pub name: String,
    pub id: RealmId,
}

/// The role every overlay grant carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverlayRole {
    pub name: String,
    pub id: RoleId,
}

/// Counters describing one load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub loaded_at: DateTime<Utc>,
    pub users_resolved: usize,
    pub users_skipped: usize,
    pub projects_resolved: usize,
    pub projects_skipped: usize,
    /// Project names answered from the per-load cache instead of a lookup.
    pub project_cache_hits: usize,
}

impl Default for LoadReport {
    fn default() -> Self {
        Self {
            loaded_at: Utc::now(),
            users_resolved: 0,
            users_skipped: 0,
            projects_resolved: 0,
            projects_skipped: 0,
            project_cache_hits: 0,
        }
    }
}

/// Everything the overlay backend needs, fully resolved.
#[derive(Debug, Clone)]
pub struct StaticOverlay {
    realm: OverlayRealm,
    role: OverlayRole,
    index: StaticAssignmentIndex,
    report: LoadReport,
}

impl StaticOverlay {
    pub fn new(realm: OverlayRealm, role: OverlayRole, index: StaticAssignmentIndex) -> Self {
        Self {
            realm,
            role,
            index,
            report: LoadReport::default(),
        }
    }

    pub fn realm(&self) -> &OverlayRealm {
        &self.realm
    }

    pub fn role(&self) -> &OverlayRole {
        &self.role
    }

    pub fn role_id(&self) -> &RoleId {
        &self.role.id
    }

    pub fn index(&self) -> &StaticAssignmentIndex {
        &self.index
    }

    pub fn report(&self) -> &LoadReport {
        &self.report
    }
}

/// Project name → id, scoped to a single load.
#[derive(Debug, Default)]
struct ProjectResolutionCache {
    resolved: HashMap<String, ProjectId>,
    hits: usize,
}

impl ProjectResolutionCache {
    fn resolve(
        &mut self,
        name: &str,
        realm_id: &RealmId,
        resources: &dyn ResourceLookup,
    ) -> Result<ProjectId, LookupError> {
        if let Some(id) = self.resolved.get(name) {
            self.hits += 1;
            tracing::debug!(project = name, "project resolved from cache");
            return Ok(id.clone());
        }

        let project = resources.get_project_by_name(name, Some(realm_id))?;
        self.resolved.insert(name.to_string(), project.id.clone());
        Ok(project.id)
    }
}

pub struct OverlayLoader<'a> {
    services: LookupServices<'a>,
    config: &'a OverlayConfig,
}

impl<'a> OverlayLoader<'a> {
    pub fn new(services: LookupServices<'a>, config: &'a OverlayConfig) -> Self {
        Self { services, config }
    }

    /// Resolve `source` into a [`StaticOverlay`].
    pub fn load(&self, source: &SourceMapping) -> Result<StaticOverlay, LoadError> {
        let realm = self.resolve_realm()?;
        let role = self.resolve_role()?;

        let mut index = StaticAssignmentIndex::default();
        let mut cache = ProjectResolutionCache::default();
        let mut report = LoadReport::default();

        for entry in source.entries() {
            let user_id = match self.resolve_user(&entry.user, &realm) {
                Ok(id) => id,
                Err(err) => {
                    tracing::warn!(user = %entry.user, error = %err, "skipping overlay user");
                    report.users_skipped += 1;
                    continue;
                }
            };
            report.users_resolved += 1;
            index.insert_user(user_id.clone());

            for project_name in &entry.projects {
                match cache.resolve(
                    project_name,
                    &self.config.default_project_realm,
                    self.services.resources,
                ) {
                    Ok(project_id) => {
                        index.insert(user_id.clone(), project_id);
                        report.projects_resolved += 1;
                    }
                    Err(err) => {
                        tracing::warn!(
                            user = %entry.user,
                            project = %project_name,
                            error = %err,
                            "skipping overlay project"
                        );
                        report.projects_skipped += 1;
                    }
                }
            }
        }

        report.project_cache_hits = cache.hits;
        report.loaded_at = Utc::now();

        tracing::info!(
            realm = %realm.name,
            role = %role.name,
            users = index.user_count(),
            grants = index.grant_count(),
            users_skipped = report.users_skipped,
            projects_skipped = report.projects_skipped,
            "static role overlay loaded"
        );

        Ok(StaticOverlay {
            realm,
            role,
            index,
            report,
        })
    }

    fn resolve_realm(&self) -> Result<OverlayRealm, LoadError> {
        let name = &self.config.realm_name;
        match self.services.resources.get_project_by_name(name, None) {
            Ok(record) => Ok(OverlayRealm {
                name: name.clone(),
                id: record.into_realm_id(),
            }),
            Err(LookupError::NotFound { .. }) => Err(LoadError::RealmNotFound(name.clone())),
            Err(source) => Err(LoadError::Lookup {
                what: "realm",
                name: name.clone(),
                source,
            }),
        }
    }

    fn resolve_role(&self) -> Result<OverlayRole, LoadError> {
        let name = self.config.role_name()?;
        let candidates = match self.services.roles.list_roles_by_name(name) {
            Ok(roles) => roles,
            Err(LookupError::NotFound { .. }) => Vec::new(),
            Err(source) => {
                return Err(LoadError::Lookup {
                    what: "role",
                    name: name.to_string(),
                    source,
                });
            }
        };

        if candidates.len() > 1 {
            tracing::warn!(
                role = name,
                candidates = candidates.len(),
                "role name is ambiguous; using the first match"
            );
        }

        candidates
            .into_iter()
            .next()
            .map(|record| OverlayRole {
                name: name.to_string(),
                id: record.id,
            })
            .ok_or_else(|| LoadError::RoleNotFound(name.to_string()))
    }

    fn resolve_user(&self, name: &str, realm: &OverlayRealm) -> Result<UserId, LookupError> {
        let user = self.services.identities.get_user_by_name(name, &realm.name)?;
        let public_id = self.services.id_mapping.get_public_id(&LocalIdentity {
            realm_id: realm.id.clone(),
            local_id: user.local_id,
            entity_kind: EntityKind::User,
        })?;
        Ok(UserId::new(public_id))
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::lookup::IdMapping;
    use crate::memory::{InMemoryDirectory, InMemoryIdMapping};

    struct Fixture {
        directory: InMemoryDirectory,
        id_mapping: InMemoryIdMapping,
        config: OverlayConfig,
        default_realm: RealmId,
    }

    impl Fixture {
        fn new() -> Self {
            let mut directory = InMemoryDirectory::new();
            let default_realm = directory.add_realm("Default");
            directory.add_realm("ldap_users");
            directory.add_role("Member");

            let config = OverlayConfig {
                default_project_realm: default_realm.clone(),
                ..OverlayConfig::default()
            };

            Self {
                directory,
                id_mapping: InMemoryIdMapping::new(),
                config,
                default_realm,
            }
        }

        fn services(&self) -> LookupServices<'_> {
            LookupServices::new(
                &self.directory,
                &self.directory,
                &self.directory,
                &self.id_mapping,
            )
        }

        fn load(&self, source: &SourceMapping) -> Result<StaticOverlay, LoadError> {
            OverlayLoader::new(self.services(), &self.config).load(source)
        }

        fn user_id(&self, name: &str) -> UserId {
            let realm = self
                .directory
                .get_project_by_name("ldap_users", None)
                .unwrap()
                .into_realm_id();
            let local = self.directory.local_id(name, "ldap_users").unwrap();
            UserId::new(
                self.id_mapping
                    .get_public_id(&LocalIdentity {
                        realm_id: realm,
                        local_id: local,
                        entity_kind: EntityKind::User,
                    })
                    .unwrap(),
            )
        }
    }

    fn mapping(pairs: Vec<(&str, Vec<&str>)>) -> SourceMapping {
        pairs.into_iter().collect()
    }

    #[test]
    fn resolves_users_projects_and_role() {
        let mut fx = Fixture::new();
        fx.directory.add_user("bob", "ldap_users");
        let default_realm = fx.default_realm.clone();
        let alpha = fx.directory.add_project("alpha", &default_realm);

        let overlay = fx.load(&mapping(vec![("bob", vec!["alpha"])])).unwrap();

        let bob = fx.user_id("bob");
        assert!(overlay.index().grants(&bob, &alpha));
        assert_eq!(overlay.index().grant_count(), 1);
        assert_eq!(overlay.role().name, "Member");
        assert_eq!(overlay.realm().name, "ldap_users");
        assert_eq!(overlay.report().users_resolved, 1);
    }

    #[test]
    fn unresolvable_project_is_skipped() {
        let mut fx = Fixture::new();
        fx.directory.add_user("alice", "ldap_users");
        let default_realm = fx.default_realm.clone();
        let ok = fx.directory.add_project("proj-ok", &default_realm);

        let overlay = fx
            .load(&mapping(vec![("alice", vec!["proj-ok", "proj-missing"])]))
            .unwrap();

        let alice = fx.user_id("alice");
        let projects: Vec<&ProjectId> = overlay.index().projects_for(&alice).unwrap().iter().collect();
        assert_eq!(projects, vec![&ok]);
        assert_eq!(overlay.report().projects_skipped, 1);
    }

    #[test]
    fn unavailable_project_lookup_is_skipped() {
        let mut fx = Fixture::new();
        fx.directory.add_user("alice", "ldap_users");
        let default_realm = fx.default_realm.clone();
        fx.directory.add_project("flaky", &default_realm);
        let steady = fx.directory.add_project("steady", &default_realm);
        fx.directory.fail_lookups_for("flaky");

        let overlay = fx.load(&mapping(vec![("alice", vec!["flaky", "steady"])])).unwrap();

        let alice = fx.user_id("alice");
        assert_eq!(overlay.index().projects_for(&alice).unwrap().len(), 1);
        assert!(overlay.index().grants(&alice, &steady));
    }

    #[test]
    fn projects_outside_default_realm_are_not_found() {
        let mut fx = Fixture::new();
        fx.directory.add_user("alice", "ldap_users");
        let other = fx.directory.add_realm("other");
        fx.directory.add_project("elsewhere", &other);

        let overlay = fx.load(&mapping(vec![("alice", vec!["elsewhere"])])).unwrap();
        assert!(overlay.index().is_empty());
        assert_eq!(overlay.report().projects_skipped, 1);
    }

    #[test]
    fn unknown_user_is_skipped() {
        let mut fx = Fixture::new();
        fx.directory.add_user("alice", "ldap_users");
        let default_realm = fx.default_realm.clone();
        fx.directory.add_project("web", &default_realm);

        let overlay = fx
            .load(&mapping(vec![("ghost", vec!["web"]), ("alice", vec!["web"])]))
            .unwrap();

        assert_eq!(overlay.index().user_count(), 1);
        assert_eq!(overlay.report().users_skipped, 1);
        assert!(overlay.index().contains_user(&fx.user_id("alice")));
    }

    #[test]
    fn user_in_another_realm_is_skipped() {
        let mut fx = Fixture::new();
        fx.directory.add_realm("corp");
        fx.directory.add_user("alice", "corp");

        let overlay = fx.load(&mapping(vec![("alice", vec![])])).unwrap();
        assert_eq!(overlay.index().user_count(), 0);
        assert_eq!(overlay.report().users_skipped, 1);
    }

    #[test]
    fn unmapped_user_is_skipped() {
        let mut fx = Fixture::new();
        let local = fx.directory.add_user("alice", "ldap_users");
        fx.id_mapping.deny(local);

        let overlay = fx.load(&mapping(vec![("alice", vec![])])).unwrap();
        assert_eq!(overlay.report().users_skipped, 1);
    }

    #[test]
    fn missing_realm_is_fatal() {
        let mut fx = Fixture::new();
        fx.config.realm_name = "nowhere".to_string();

        let err = fx.load(&SourceMapping::default()).unwrap_err();
        assert!(matches!(err, LoadError::RealmNotFound(name) if name == "nowhere"));
    }

    #[test]
    fn missing_role_is_fatal() {
        let mut fx = Fixture::new();
        fx.config.default_roles = vec!["admin".to_string()];

        let err = fx.load(&SourceMapping::default()).unwrap_err();
        assert!(matches!(err, LoadError::RoleNotFound(name) if name == "admin"));
    }

    #[test]
    fn unavailable_realm_lookup_is_fatal() {
        let mut fx = Fixture::new();
        fx.directory.add_user("bob", "ldap_users");
        fx.directory.fail_lookups_for("ldap_users");

        let err = fx.load(&mapping(vec![("bob", vec!["alpha"])])).unwrap_err();
        assert!(matches!(
            err,
            LoadError::Lookup { what: "realm", ref name, source: LookupError::Unavailable(_) }
                if name == "ldap_users"
        ));
        assert_eq!(fx.directory.project_lookups(), 1);
    }

    #[test]
    fn unavailable_role_lookup_is_fatal() {
        let mut fx = Fixture::new();
        fx.directory.add_user("bob", "ldap_users");
        let default_realm = fx.default_realm.clone();
        fx.directory.add_project("alpha", &default_realm);
        fx.directory.fail_lookups_for("Member");

        let err = fx.load(&mapping(vec![("bob", vec!["alpha"])])).unwrap_err();
        assert!(matches!(
            err,
            LoadError::Lookup { what: "role", ref name, source: LookupError::Unavailable(_) }
                if name == "Member"
        ));
        // Only the realm was looked up; no project was resolved.
        assert_eq!(fx.directory.project_lookups(), 1);
    }

    #[test]
    fn empty_role_list_is_fatal() {
        let mut fx = Fixture::new();
        fx.config.default_roles.clear();

        let err = fx.load(&SourceMapping::default()).unwrap_err();
        assert!(matches!(err, LoadError::Config(ConfigError::NoRoleConfigured)));
    }

    #[test]
    fn first_matching_role_wins() {
        let mut fx = Fixture::new();
        let first = fx.directory.add_role("Reader");
        let second = fx.directory.add_role("Reader");
        assert_ne!(first, second);
        fx.config.default_roles = vec!["Reader".to_string(), "Member".to_string()];

        let overlay = fx.load(&SourceMapping::default()).unwrap();
        assert_eq!(overlay.role_id(), &first);
    }

    #[test]
    fn project_lookups_are_cached_within_a_load() {
        let mut fx = Fixture::new();
        fx.directory.add_user("alice", "ldap_users");
        fx.directory.add_user("bob", "ldap_users");
        let default_realm = fx.default_realm.clone();
        fx.directory.add_project("shared", &default_realm);

        let before = fx.directory.project_lookups();
        let overlay = fx
            .load(&mapping(vec![("alice", vec!["shared"]), ("bob", vec!["shared"])]))
            .unwrap();

        // One lookup for the realm, one for the project.
        assert_eq!(fx.directory.project_lookups() - before, 2);
        assert_eq!(overlay.report().project_cache_hits, 1);
        assert_eq!(overlay.index().grant_count(), 2);
    }

    #[test]
    fn duplicate_projects_collapse_in_index() {
        let mut fx = Fixture::new();
        fx.directory.add_user("alice", "ldap_users");
        let default_realm = fx.default_realm.clone();
        fx.directory.add_project("web", &default_realm);

        let overlay = fx.load(&mapping(vec![("alice", vec!["web", "web"])])).unwrap();
        assert_eq!(overlay.index().grant_count(), 1);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64,
            ..ProptestConfig::default()
        })]

        /// Property: the index depends only on the user → project sets, not on
        /// the order projects are listed in or on repeated loads.
        #[test]
        fn index_is_independent_of_project_order(
            assignments in prop::collection::btree_map(
                0usize..6,
                prop::collection::vec(0usize..8, 0..10),
                0..6,
            ),
            seed in any::<u64>(),
        ) {
            let mut fx = Fixture::new();
            for u in 0..6 {
                fx.directory.add_user(&format!("user-{u}"), "ldap_users");
            }
            let default_realm = fx.default_realm.clone();
            for p in 0..6 {
                fx.directory.add_project(&format!("proj-{p}"), &default_realm);
            }

            let forward: SourceMapping = assignments
                .iter()
                .map(|(u, ps)| (format!("user-{u}"), ps.iter().map(|p| format!("proj-{p}")).collect::<Vec<_>>()))
                .collect();

            let shuffled: SourceMapping = assignments
                .iter()
                .rev()
                .map(|(u, ps)| {
                    let mut ps: Vec<String> = ps.iter().map(|p| format!("proj-{p}")).collect();
                    let len = ps.len();
                    if len > 1 {
                        ps.rotate_left((seed as usize) % len);
                    }
                    ps.reverse();
                    (format!("user-{u}"), ps)
                })
                .collect();

            let a = fx.load(&forward).unwrap();
            let b = fx.load(&forward).unwrap();
            let c = fx.load(&shuffled).unwrap();

            prop_assert_eq!(a.index(), b.index());
            prop_assert_eq!(a.index(), c.index());
        }
    }
}
