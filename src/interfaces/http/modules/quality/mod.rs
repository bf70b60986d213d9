//! Trial quality matrix records and statistics

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
