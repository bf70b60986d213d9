//! UAT rounds recorded against allocations

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
