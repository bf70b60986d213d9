//! Identity & access: authentication, sessions and user management.

pub mod service;

pub use service::{AuthResult, IdentityService};
