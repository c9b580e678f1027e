//! Per-tenant command handling: module registry, tenant contexts, routing,
//! and the built-in admin and safety modules.

pub mod bootstrap;
pub mod context;
pub mod error;
pub mod module;
pub mod modules;
pub mod router;
pub mod serve;
pub mod services;

pub use context::{CommandContext, TenantContext};
pub use error::{CommandError, CompositionError, DispatchError};
pub use module::{CommandSpec, Module, ModuleCatalog, ModuleHandle, ModuleRegistry};
pub use router::TenantRouter;
pub use serve::serve;
pub use services::Services;
