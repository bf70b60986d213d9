//! Roles, sessions and the configurable access policy.

mod policy;
mod role;
mod session;

pub use policy::{AccessPolicy, AccessTable, Action};
pub use role::Role;
pub use session::Session;
