//! Resource modules. Each pairs request/response DTOs with its handlers.

pub mod allocations;
pub mod audit;
pub mod auth;
pub mod health;
pub mod metrics;
pub mod quality;
pub mod uat;
pub mod users;
