//! Engineer allocations to trials

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
