use std::collections::HashSet;

use uuid::Uuid;

use overlay_core::{LocalId, LookupError};

use crate::lookup::{IdMapping, LocalIdentity};

/// Namespace for public ids handed out by [`InMemoryIdMapping`].
const PUBLIC_ID_NAMESPACE: Uuid = Uuid::from_u128(0x6d1b_5a0c_3f44_4f7e_9a62_0c8e_4b1d_7e21);

/// Deterministic identifier mapping.
///
/// The public id is a UUIDv5 over `(realm, local id, entity kind)`, so the
/// same identity always maps to the same stable id.
#[derive(Debug, Default)]
pub struct InMemoryIdMapping {
    denied: HashSet<LocalId>,
}

impl InMemoryIdMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Treat `local_id` as having no mapping entry.
    pub fn deny(&mut self, local_id: LocalId) {
        self.denied.insert(local_id);
    }
}

impl IdMapping for InMemoryIdMapping {
    fn get_public_id(&self, identity: &LocalIdentity) -> Result<String, LookupError> {
        if self.denied.contains(&identity.local_id) {
            return Err(LookupError::not_found(
                "id mapping",
                identity.local_id.as_str(),
            ));
        }

        let key = format!(
            "{}:{}:{}",
            identity.realm_id, identity.local_id, identity.entity_kind
        );
        Ok(Uuid::new_v5(&PUBLIC_ID_NAMESPACE, key.as_bytes())
            .simple()
            .to_string())
    }
}

#[cfg(test)]
mod tests {
    use overlay_core::EntityKind;

    use super::*;

    fn identity(local: &str, kind: EntityKind) -> LocalIdentity {
        LocalIdentity {
            realm_id: "realm-1".into(),
            local_id: local.into(),
            entity_kind: kind,
        }
    }

    #[test]
    fn mapping_is_deterministic_and_kind_sensitive() {
        let mapping = InMemoryIdMapping::new();

        let a = mapping.get_public_id(&identity("cn=alice", EntityKind::User)).unwrap();
        let b = mapping.get_public_id(&identity("cn=alice", EntityKind::User)).unwrap();
        let g = mapping.get_public_id(&identity("cn=alice", EntityKind::Group)).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, g);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn denied_identities_are_not_found() {
        let mut mapping = InMemoryIdMapping::new();
        mapping.deny("cn=bob".into());

        let err = mapping
            .get_public_id(&identity("cn=bob", EntityKind::User))
            .unwrap_err();
        assert!(matches!(err, LookupError::NotFound { kind: "id mapping", .. }));
    }
}
