use std::collections::{BTreeMap, BTreeSet};

use overlay_core::{ProjectId, UserId};

/// Stable user id → stable project ids granted by the overlay.
///
/// Built once by the loader and never mutated afterwards, so shared reads need
/// no synchronisation. Iteration is ordered by id, which keeps synthesized
/// listings stable between calls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticAssignmentIndex {
    grants: BTreeMap<UserId, BTreeSet<ProjectId>>,
}

impl StaticAssignmentIndex {
    pub(crate) fn insert_user(&mut self, user: UserId) {
        self.grants.entry(user).or_default();
    }

    /// Returns `false` if the pairing was already present.
    pub(crate) fn insert(&mut self, user: UserId, project: ProjectId) -> bool {
        self.grants.entry(user).or_default().insert(project)
    }

    pub fn contains_user(&self, user: &UserId) -> bool {
        self.grants.contains_key(user)
    }

    /// Whether the overlay grants its role to `user` on `project`.
    pub fn grants(&self, user: &UserId, project: &ProjectId) -> bool {
        self.grants
            .get(user)
            .is_some_and(|projects| projects.contains(project))
    }

    pub fn projects_for(&self, user: &UserId) -> Option<&BTreeSet<ProjectId>> {
        self.grants.get(user)
    }

    pub fn users_for<'a>(&'a self, project: &'a ProjectId) -> impl Iterator<Item = &'a UserId> + 'a {
        self.grants
            .iter()
            .filter(move |(_, projects)| projects.contains(project))
            .map(|(user, _)| user)
    }

    /// Every `(user, project)` pairing.
    pub fn iter(&self) -> impl Iterator<Item = (&UserId, &ProjectId)> + '_ {
        self.grants
            .iter()
            .flat_map(|(user, projects)| projects.iter().map(move |p| (user, p)))
    }

    pub fn user_count(&self) -> usize {
        self.grants.len()
    }

    pub fn grant_count(&self) -> usize {
        self.grants.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.grant_count() == 0
    }
}

impl FromIterator<(UserId, ProjectId)> for StaticAssignmentIndex {
    fn from_iter<T: IntoIterator<Item = (UserId, ProjectId)>>(iter: T) -> Self {
        let mut index = Self::default();
        for (user, project) in iter {
            index.insert(user, project);
        }
        index
    }
}
