//! # Test Engineer Portal
//!
//! Back end for a test team: engineers register and wait for approval,
//! managers allocate them to trials and record UAT rounds, and every change
//! lands in an append-only audit trail.
//!
//! ## Architecture
//!
//! - **domain**: entities, state machines, repository traits, access policy
//! - **application**: use-case services (identity, approval, tracking, audit)
//! - **infrastructure**: SeaORM storage, password hashing, JWT, mail
//! - **interfaces**: REST API with Swagger documentation
//! - **server**: runtime bootstrap and graceful shutdown

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod server;
pub mod shared;

pub use application::PortalServices;
pub use config::{default_config_path, AppConfig};
pub use infrastructure::{init_database, run_migrations, SeaOrmRepositoryProvider};
pub use interfaces::http::create_api_router;
pub use server::{init_tracing, ServerHandle, ServerOptions};
