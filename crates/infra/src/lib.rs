//! Infrastructure layer: policy storage, the platform boundary, config.

pub mod config;
pub mod platform;
pub mod policy_store;

pub use config::{ConfigError, WardenConfig};
pub use platform::{InMemoryPlatform, Platform, PlatformError, SentMessage, UserProfile};
pub use policy_store::{
    FilePolicyStore, InMemoryPolicyStore, PersistedPolicy, PolicyRepository, PolicyStore,
    PolicyStoreError,
};
