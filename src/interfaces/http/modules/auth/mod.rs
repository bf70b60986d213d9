//! Authentication: login, registration, password reset and profile

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
