//! Allocation DTOs

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::application::NewAllocation;
use crate::domain::allocation::{AllocationChanges, AllocationStats};
use crate::domain::{Allocation, AllocationFilter, DomainError};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AllocationDto {
    pub id: String,
    pub engineer_id: String,
    pub trial_id: String,
    pub system: Option<String>,
    pub allocation_role: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// active or closed
    pub status: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
}

impl From<Allocation> for AllocationDto {
    fn from(a: Allocation) -> Self {
        Self {
            id: a.id,
            engineer_id: a.engineer_id,
            trial_id: a.trial_id,
            system: a.system,
            allocation_role: a.allocation_role,
            start_date: a.start_date,
            end_date: a.end_date,
            status: a.status.to_string(),
            created_by: a.created_by,
            created_at: a.created_at,
            updated_at: a.updated_at,
            closed_at: a.closed_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateAllocationRequest {
    #[validate(length(min = 1, message = "engineer_id is required"))]
    pub engineer_id: String,
    #[validate(length(min = 1, max = 64, message = "trial_id must be 1-64 characters"))]
    pub trial_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[validate(length(max = 64))]
    pub system: Option<String>,
    #[validate(length(max = 64))]
    pub allocation_role: Option<String>,
}

impl From<CreateAllocationRequest> for NewAllocation {
    fn from(r: CreateAllocationRequest) -> Self {
        Self {
            engineer_id: r.engineer_id,
            trial_id: r.trial_id,
            start_date: r.start_date,
            end_date: r.end_date,
            system: r.system,
            allocation_role: r.allocation_role,
        }
    }
}

/// Partial update. Omitted fields are left unchanged.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateAllocationRequest {
    #[validate(length(min = 1, max = 64))]
    pub trial_id: Option<String>,
    #[validate(length(max = 64))]
    pub system: Option<String>,
    #[validate(length(max = 64))]
    pub allocation_role: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl From<UpdateAllocationRequest> for AllocationChanges {
    fn from(r: UpdateAllocationRequest) -> Self {
        Self {
            trial_id: r.trial_id,
            system: r.system,
            allocation_role: r.allocation_role,
            start_date: r.start_date,
            end_date: r.end_date,
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListAllocationsParams {
    pub engineer_id: Option<String>,
    pub trial_id: Option<String>,
    /// active or closed
    pub status: Option<String>,
    /// Only allocations whose period ends on or after this date
    pub from: Option<NaiveDate>,
    /// Only allocations whose period starts on or before this date
    pub to: Option<NaiveDate>,
}

impl ListAllocationsParams {
    pub fn filter(self) -> Result<AllocationFilter, DomainError> {
        Ok(AllocationFilter {
            engineer_id: self.engineer_id,
            trial_id: self.trial_id,
            status: self.status.as_deref().map(str::parse).transpose()?,
            from: self.from,
            to: self.to,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AllocationStatsDto {
    pub total: u64,
    pub by_status: BTreeMap<String, u64>,
    pub by_system: BTreeMap<String, u64>,
    pub by_engineer: BTreeMap<String, u64>,
}

impl From<AllocationStats> for AllocationStatsDto {
    fn from(s: AllocationStats) -> Self {
        Self {
            total: s.total,
            by_status: s.by_status.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
            by_system: s.by_system,
            by_engineer: s.by_engineer,
        }
    }
}
