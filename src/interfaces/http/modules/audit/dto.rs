//! Audit DTOs

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::application::{ComplianceReport, UserActivityReport};
use crate::domain::audit::{AuditCursor, AuditStats};
use crate::domain::{AuditEntry, AuditFilter, DomainError};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuditEntryDto {
    pub id: i64,
    pub actor_id: String,
    pub actor_username: String,
    pub action: String,
    pub target_kind: String,
    pub target_id: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
}

impl From<AuditEntry> for AuditEntryDto {
    fn from(e: AuditEntry) -> Self {
        Self {
            id: e.id,
            actor_id: e.actor_id,
            actor_username: e.actor_username,
            action: e.action.to_string(),
            target_kind: e.target.kind.as_str().to_string(),
            target_id: e.target.id,
            description: e.description,
            timestamp: e.timestamp,
        }
    }
}

/// Resume point for the next page
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
pub struct AuditCursorDto {
    pub after_timestamp: DateTime<Utc>,
    pub after_id: i64,
}

impl From<AuditCursor> for AuditCursorDto {
    fn from(c: AuditCursor) -> Self {
        Self {
            after_timestamp: c.timestamp,
            after_id: c.id,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuditPageDto {
    pub items: Vec<AuditEntryDto>,
    /// Present when more entries may follow
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<AuditCursorDto>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct AuditQueryParams {
    pub actor_id: Option<String>,
    /// e.g. approve, record_uat, create_allocation
    pub action: Option<String>,
    /// user, allocation, uat_record or quality_record
    pub target_kind: Option<String>,
    pub target_id: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    /// Continue after this position (from a previous page's `next`)
    pub after_timestamp: Option<DateTime<Utc>>,
    pub after_id: Option<i64>,
}

impl AuditQueryParams {
    pub fn filter(&self) -> Result<AuditFilter, DomainError> {
        Ok(AuditFilter {
            actor_id: self.actor_id.clone(),
            action: self.action.as_deref().map(str::parse).transpose()?,
            target_kind: self.target_kind.as_deref().map(str::parse).transpose()?,
            target_id: self.target_id.clone(),
            from: self.from,
            to: self.to,
        })
    }

    pub fn cursor(&self) -> Result<Option<AuditCursor>, DomainError> {
        match (self.after_timestamp, self.after_id) {
            (Some(timestamp), Some(id)) => Ok(Some(AuditCursor { timestamp, id })),
            (None, None) => Ok(None),
            _ => Err(DomainError::Validation(
                "after_timestamp and after_id must be given together".into(),
            )),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuditStatsDto {
    pub total: u64,
    pub by_action: BTreeMap<String, u64>,
    pub by_actor: BTreeMap<String, u64>,
}

impl From<AuditStats> for AuditStatsDto {
    fn from(s: AuditStats) -> Self {
        Self {
            total: s.total,
            by_action: s.by_action.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
            by_actor: s.by_actor,
        }
    }
}

/// Compliance report window. Defaults to the last 30 days.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ComplianceParams {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl ComplianceParams {
    pub fn window(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let to = self.to.unwrap_or(now);
        let from = self.from.unwrap_or(to - Duration::days(30));
        (from, to)
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ComplianceReportDto {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub total_entries: u64,
    pub active_users: u64,
    pub unique_actions: u64,
    pub security_events: u64,
    pub by_action: BTreeMap<String, u64>,
    pub by_target: BTreeMap<String, u64>,
    pub by_actor: BTreeMap<String, u64>,
    pub by_date: BTreeMap<NaiveDate, u64>,
}

impl From<ComplianceReport> for ComplianceReportDto {
    fn from(r: ComplianceReport) -> Self {
        Self {
            from: r.from,
            to: r.to,
            total_entries: r.total_entries,
            active_users: r.active_users,
            unique_actions: r.unique_actions,
            security_events: r.security_events,
            by_action: r.by_action.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
            by_target: r.by_target.into_iter().map(|(k, v)| (k.as_str().to_string(), v)).collect(),
            by_actor: r.by_actor,
            by_date: r.by_date,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct UserActivityParams {
    /// Look-back window, 1-365 (default 30)
    #[serde(default = "default_activity_days")]
    pub days: u32,
}

fn default_activity_days() -> u32 {
    30
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserActivityDto {
    pub user_id: String,
    pub days: u32,
    pub total_activities: u64,
    pub average_daily: f64,
    pub by_action: BTreeMap<String, u64>,
    pub by_target: BTreeMap<String, u64>,
    pub by_date: BTreeMap<NaiveDate, u64>,
    /// Hour of day (UTC)
    pub by_hour: BTreeMap<u32, u64>,
    /// Newest first
    pub recent: Vec<AuditEntryDto>,
}

impl From<UserActivityReport> for UserActivityDto {
    fn from(r: UserActivityReport) -> Self {
        Self {
            user_id: r.user_id,
            days: r.days,
            total_activities: r.total_activities,
            average_daily: r.average_daily,
            by_action: r.by_action.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
            by_target: r.by_target.into_iter().map(|(k, v)| (k.as_str().to_string(), v)).collect(),
            by_date: r.by_date,
            by_hour: r.by_hour,
            recent: r.recent.into_iter().map(AuditEntryDto::from).collect(),
        }
    }
}
