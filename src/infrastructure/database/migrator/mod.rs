//! Database migrations module

pub use sea_orm_migration::prelude::*;

mod m20240601_000001_create_users;
mod m20240601_000002_create_allocations;
mod m20240601_000003_create_uat_records;
mod m20240601_000004_create_audit_entries;
mod m20240601_000005_create_password_reset_tokens;
mod m20240601_000006_create_quality_records;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240601_000001_create_users::Migration),
            Box::new(m20240601_000002_create_allocations::Migration),
            Box::new(m20240601_000003_create_uat_records::Migration),
            Box::new(m20240601_000004_create_audit_entries::Migration),
            Box::new(m20240601_000005_create_password_reset_tokens::Migration),
            Box::new(m20240601_000006_create_quality_records::Migration),
        ]
    }
}
