//! Create allocations table migration

use sea_orm_migration::prelude::*;

use super::m20240601_000001_create_users::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Allocations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Allocations::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Allocations::EngineerId).string().not_null())
                    .col(ColumnDef::new(Allocations::TrialId).string_len(100).not_null())
                    .col(ColumnDef::new(Allocations::System).string_len(100).null())
                    .col(ColumnDef::new(Allocations::AllocationRole).string_len(50).null())
                    .col(ColumnDef::new(Allocations::StartDate).date().not_null())
                    .col(ColumnDef::new(Allocations::EndDate).date().not_null())
                    .col(
                        ColumnDef::new(Allocations::Status)
                            .string_len(20)
                            .not_null()
                            .default("active"),
                    )
                    .col(ColumnDef::new(Allocations::CreatedBy).string().not_null())
                    .col(
                        ColumnDef::new(Allocations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Allocations::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Allocations::ClosedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_allocations_engineer")
                            .from(Allocations::Table, Allocations::EngineerId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_allocations_engineer")
                    .table(Allocations::Table)
                    .col(Allocations::EngineerId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_allocations_trial")
                    .table(Allocations::Table)
                    .col(Allocations::TrialId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Allocations::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Allocations {
    Table,
    Id,
    EngineerId,
    TrialId,
    System,
    AllocationRole,
    StartDate,
    EndDate,
    Status,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
    ClosedAt,
}
