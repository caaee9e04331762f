//! In-memory collaborators and live store.
//!
//! Intended for tests/dev. Not optimized for performance.

pub mod directory;
pub mod id_mapping;
pub mod store;

pub use directory::InMemoryDirectory;
pub use id_mapping::InMemoryIdMapping;
pub use store::InMemoryAssignmentStore;
