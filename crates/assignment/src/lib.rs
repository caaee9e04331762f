//! `overlay-assignment`: read-only role-assignment overlay.
//!
//! A statically configured map of user names to project names is resolved
//! once, at construction, into stable identifiers. The resulting grants of a
//! single role are merged into every read of a live assignment backend; every
//! write is rejected.
//!
//! ```text
//! SourceMapping ──► OverlayLoader ──► StaticOverlay ──┐
//!                      │                              ▼
//!            LookupServices               OverlayAssignmentBackend<S> ──► S (live store)
//! ```

pub mod config;
pub mod index;
pub mod loader;
pub mod lookup;
pub mod memory;
pub mod resolver;
pub mod source;

pub use config::{ConfigError, OverlayConfig, OverlayListing};
pub use index::StaticAssignmentIndex;
pub use loader::{LoadError, LoadReport, OverlayLoader, OverlayRealm, OverlayRole, StaticOverlay};
pub use lookup::{
    IdMapping, IdentityLookup, LocalIdentity, LookupServices, ProjectRecord, ResourceLookup,
    RoleLookup, RoleRecord, UserRecord,
};
pub use resolver::OverlayAssignmentBackend;
pub use source::{SourceEntry, SourceError, SourceMapping};
