//! Built-in modules.

mod admin;
mod safety;
mod utility;

pub use admin::AdminModule;
pub use safety::{SAFETY_MODULE, SafetyModule};
pub use utility::{UTILITY_MODULE, UtilityModule};
