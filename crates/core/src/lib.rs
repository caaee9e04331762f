//! `overlay-core`: role-assignment model shared by every backend.
//!
//! Identifiers, assignment records, query shapes and the backend contract.
//! No lookups, no I/O.

pub mod assignment;
pub mod backend;
pub mod error;
pub mod id;

pub use assignment::{Actor, AssignmentFilter, GrantQuery, RoleAssignment, Target};
pub use backend::AssignmentBackend;
pub use error::{AssignmentError, AssignmentResult, LookupError};
pub use id::{EntityKind, GroupId, LocalId, ProjectId, RealmId, RoleId, UserId};
