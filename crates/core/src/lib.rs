//! `warden-core` — identifiers and the shared domain error.
//!
//! This crate has no IO and no async; every other crate builds on it.

pub mod error;
pub mod id;

pub use error::DomainError;
pub use id::{ChannelId, MessageId, RoleId, TenantId, UserId};
