//! Durable per-tenant policy storage.
//!
//! The raw stores only move [`PersistedPolicy`] documents around. Turning
//! those numeric ids back into users and roles needs the platform, and lives
//! in [`PolicyRepository`].

pub mod file;
pub mod in_memory;
pub mod repository;
pub mod r#trait;

pub use file::FilePolicyStore;
pub use in_memory::InMemoryPolicyStore;
pub use r#trait::{PersistedPolicy, PolicyStore, PolicyStoreError};
pub use repository::PolicyRepository;
