//! Database repository implementations
//!
//! Per-aggregate SeaORM repositories + unified RepositoryProvider. Every
//! mutating method writes its audit entry inside the same transaction.

pub mod allocation_repository;
pub mod audit_repository;
pub mod quality_repository;
pub mod repository_provider;
pub mod reset_token_repository;
pub mod uat_repository;
pub mod user_repository;

pub use repository_provider::SeaOrmRepositoryProvider;
