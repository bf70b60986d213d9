//! Create audit_entries table
//!
//! Append-only. Reads page through `(timestamp, id)`.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AuditEntries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AuditEntries::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AuditEntries::ActorId).string().not_null())
                    .col(ColumnDef::new(AuditEntries::ActorUsername).string_len(50).not_null())
                    .col(ColumnDef::new(AuditEntries::Action).string_len(50).not_null())
                    .col(ColumnDef::new(AuditEntries::TargetKind).string_len(20).not_null())
                    .col(ColumnDef::new(AuditEntries::TargetId).string().not_null())
                    .col(ColumnDef::new(AuditEntries::Description).text().not_null())
                    .col(
                        ColumnDef::new(AuditEntries::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_audit_entries_timestamp_id")
                    .table(AuditEntries::Table)
                    .col(AuditEntries::Timestamp)
                    .col(AuditEntries::Id)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_audit_entries_target")
                    .table(AuditEntries::Table)
                    .col(AuditEntries::TargetKind)
                    .col(AuditEntries::TargetId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AuditEntries::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum AuditEntries {
    Table,
    Id,
    ActorId,
    ActorUsername,
    Action,
    TargetKind,
    TargetId,
    Description,
    Timestamp,
}
