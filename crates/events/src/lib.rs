//! Inbound chat events and command invocations.
//!
//! Everything the gateway hands us is normalized into an [`InboundEvent`]
//! before it reaches the router. The transport itself lives elsewhere.

pub mod envelope;
pub mod invocation;
pub mod tenant;

pub use envelope::{Author, ChannelKind, InboundEvent};
pub use invocation::{Invocation, InvocationError};
pub use tenant::TenantScoped;
