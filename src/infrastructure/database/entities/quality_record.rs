//! Quality record entity for database

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum RequirementType {
    #[sea_orm(string_value = "forms")]
    Forms,
    #[sea_orm(string_value = "editchecks")]
    Editchecks,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "quality_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub trial_id: String,
    pub phase: String,
    pub no_of_uat_plans: i32,
    pub no_of_rounds: i32,
    pub requirement_type: RequirementType,
    pub round: i32,
    pub total_requirements: i32,
    pub total_failures: i32,
    pub spec_issue: i32,
    pub mock_crf_issue: i32,
    pub programming_issue: i32,
    pub scripting_issue: i32,
    pub documentation_issues: Option<String>,
    pub timeline_adherence: Option<String>,
    pub system_deployment_delays: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::CreatedBy",
        to = "super::user::Column::Id"
    )]
    Creator,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Creator.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
