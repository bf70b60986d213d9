//! HTTP REST API
//!
//! - `common`: response envelope, pagination and the validating extractor
//! - `error`: `DomainError` to status code mapping
//! - `middleware`: bearer-token authentication
//! - `modules`: one module per resource (dto + handlers)
//! - `router`: route table and Swagger documentation

pub mod common;
pub mod error;
pub mod middleware;
pub mod modules;
pub mod router;

pub use router::{create_api_router, ApiDoc, ApiState};
