//! Create quality_records table migration

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
                    .table(QualityRecords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(QualityRecords::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(QualityRecords::TrialId).string_len(100).not_null())
                    .col(ColumnDef::new(QualityRecords::Phase).string_len(100).not_null())
                    .col(ColumnDef::new(QualityRecords::NoOfUatPlans).integer().not_null())
                    .col(ColumnDef::new(QualityRecords::NoOfRounds).integer().not_null())
                    .col(ColumnDef::new(QualityRecords::RequirementType).string_len(20).not_null())
                    .col(ColumnDef::new(QualityRecords::Round).integer().not_null())
                    .col(ColumnDef::new(QualityRecords::TotalRequirements).integer().not_null())
                    .col(ColumnDef::new(QualityRecords::TotalFailures).integer().not_null())
                    .col(ColumnDef::new(QualityRecords::SpecIssue).integer().not_null().default(0))
                    .col(ColumnDef::new(QualityRecords::MockCrfIssue).integer().not_null().default(0))
                    .col(ColumnDef::new(QualityRecords::ProgrammingIssue).integer().not_null().default(0))
                    .col(ColumnDef::new(QualityRecords::ScriptingIssue).integer().not_null().default(0))
                    .col(ColumnDef::new(QualityRecords::DocumentationIssues).text().null())
                    .col(ColumnDef::new(QualityRecords::TimelineAdherence).text().null())
                    .col(ColumnDef::new(QualityRecords::SystemDeploymentDelays).text().null())
                    .col(ColumnDef::new(QualityRecords::CreatedBy).string().not_null())
                    .col(
                        ColumnDef::new(QualityRecords::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(QualityRecords::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_quality_records_creator")
                            .from(QualityRecords::Table, QualityRecords::CreatedBy)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_quality_records_trial_round")
                    .table(QualityRecords::Table)
                    .col(QualityRecords::TrialId)
                    .col(QualityRecords::Round)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(QualityRecords::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum QualityRecords {
    Table,
    Id,
    TrialId,
    Phase,
    NoOfUatPlans,
    NoOfRounds,
    RequirementType,
    Round,
    TotalRequirements,
    TotalFailures,
    SpecIssue,
    MockCrfIssue,
    ProgrammingIssue,
    ScriptingIssue,
    DocumentationIssues,
    TimelineAdherence,
    SystemDeploymentDelays,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}
