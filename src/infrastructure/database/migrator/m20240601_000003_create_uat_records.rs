//! Create uat_records table
//!
//! One row per UAT round. `(allocation_id, round)` is unique.

use sea_orm_migration::prelude::*;

use super::m20240601_000002_create_allocations::Allocations;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UatRecords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UatRecords::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(UatRecords::AllocationId).string().not_null())
                    .col(ColumnDef::new(UatRecords::Round).integer().not_null())
                    .col(ColumnDef::new(UatRecords::Category).string_len(20).not_null())
                    .col(
                        ColumnDef::new(UatRecords::Result)
                            .string_len(20)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(UatRecords::Notes).text().null())
                    .col(ColumnDef::new(UatRecords::RecordedBy).string().not_null())
                    .col(
                        ColumnDef::new(UatRecords::RecordedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(UatRecords::FinalizedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_uat_records_allocation")
                            .from(UatRecords::Table, UatRecords::AllocationId)
                            .to(Allocations::Table, Allocations::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_uat_records_allocation_round")
                    .table(UatRecords::Table)
                    .col(UatRecords::AllocationId)
                    .col(UatRecords::Round)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UatRecords::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum UatRecords {
    Table,
    Id,
    AllocationId,
    Round,
    Category,
    Result,
    Notes,
    RecordedBy,
    RecordedAt,
    FinalizedAt,
}
