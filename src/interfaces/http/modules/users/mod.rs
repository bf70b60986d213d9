//! User administration: listing, approval decisions, roles, activation

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
