//! Infrastructure layer - external concerns

pub mod crypto;
pub mod database;
pub mod mail;

pub use database::repositories::SeaOrmRepositoryProvider;
pub use database::{init_database, run_migrations};
pub use mail::LogMailer;
