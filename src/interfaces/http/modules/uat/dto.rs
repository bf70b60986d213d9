//! UAT DTOs

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::domain::uat::UatStats;
use crate::domain::UatRecord;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UatRecordDto {
    pub id: String,
    pub allocation_id: String,
    pub round: i32,
    /// build or change_request
    pub category: String,
    /// pending, pass or fail
    pub result: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub recorded_by: String,
    pub recorded_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finalized_at: Option<DateTime<Utc>>,
}

impl From<UatRecord> for UatRecordDto {
    fn from(r: UatRecord) -> Self {
        Self {
            id: r.id,
            allocation_id: r.allocation_id,
            round: r.round,
            category: r.category.to_string(),
            result: r.result.to_string(),
            notes: r.notes,
            recorded_by: r.recorded_by,
            recorded_at: r.recorded_at,
            finalized_at: r.finalized_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RecordUatRequest {
    #[validate(range(min = 1, message = "round must be at least 1"))]
    pub round: i32,
    /// build or change_request
    pub category: String,
    /// pending, pass or fail
    pub result: String,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct FinalizeUatRequest {
    /// pass or fail
    #[validate(length(min = 1, message = "result is required"))]
    pub result: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UatStatsDto {
    pub total: u64,
    pub by_result: BTreeMap<String, u64>,
    pub by_category: BTreeMap<String, u64>,
    /// Passed share of finalized rounds, in percent
    pub pass_rate: f64,
}

impl From<UatStats> for UatStatsDto {
    fn from(s: UatStats) -> Self {
        Self {
            total: s.total,
            by_result: s.by_result.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
            by_category: s.by_category.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
            pass_rate: s.pass_rate,
        }
    }
}
