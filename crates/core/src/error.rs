//! Assignment error model.

use thiserror::Error;

use crate::id::RoleId;

/// Result type used by assignment backends.
pub type AssignmentResult<T> = Result<T, AssignmentError>;

/// Error returned by an [`AssignmentBackend`](crate::AssignmentBackend).
///
/// Callers branch on the variant: a rejected write (`ReadOnly`), an operation
/// the backend does not offer (`NotImplemented`) and a missing grant
/// (`RoleAssignmentNotFound`) are different outcomes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AssignmentError {
    /// The requested grant does not exist.
    #[error("role assignment not found: role {role_id} ({scope})")]
    RoleAssignmentNotFound { role_id: RoleId, scope: String },

    /// The request is malformed (e.g. a grant without an actor).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The backend does not implement this operation.
    #[error("not implemented: {0}")]
    NotImplemented(String),

    /// The backend refuses every mutation.
    #[error("this assignment backend is read-only ({operation})")]
    ReadOnly { operation: &'static str },

    /// Storage or transport failure inside the backend.
    #[error("assignment backend failure: {0}")]
    Backend(String),
}

impl AssignmentError {
    pub fn not_found(role_id: &RoleId, scope: impl Into<String>) -> Self {
        Self::RoleAssignmentNotFound {
            role_id: role_id.clone(),
            scope: scope.into(),
        }
    }

    pub fn read_only(operation: &'static str) -> Self {
        Self::ReadOnly { operation }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::RoleAssignmentNotFound { .. })
    }
}

/// Error returned by a name/identifier lookup collaborator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// Nothing with that name exists in the requested scope.
    #[error("{kind} '{name}' not found")]
    NotFound { kind: &'static str, name: String },

    /// The lookup service could not answer.
    #[error("lookup service unavailable: {0}")]
    Unavailable(String),
}

impl LookupError {
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }
}
