use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::errors::DomainError;
use crate::shared::validations::{validate_date_range, validate_required};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllocationStatus {
    Active,
    Closed,
}

impl AllocationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AllocationStatus::Active => "active",
            AllocationStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for AllocationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AllocationStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "active" => Ok(AllocationStatus::Active),
            "closed" => Ok(AllocationStatus::Closed),
            other => Err(DomainError::Validation(format!("Unknown allocation status '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    pub id: String,
    pub engineer_id: String,
    pub trial_id: String,
    /// Clinical system under test (INFORM, VEEVA, ...)
    pub system: Option<String>,
    /// Engineer's role on the trial (TE1, Lead, ...)
    pub allocation_role: Option<String>,
    pub start_date: NaiveDate,
    /// Inclusive
    pub end_date: NaiveDate,
    pub status: AllocationStatus,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Allocation {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        engineer_id: impl Into<String>,
        trial_id: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
        system: Option<String>,
        allocation_role: Option<String>,
        created_by: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let trial_id = trial_id.into();
        validate_required(&trial_id, "Trial ID")?;
        validate_date_range(start_date, end_date)?;

        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            engineer_id: engineer_id.into(),
            trial_id: trial_id.trim().to_string(),
            system,
            allocation_role,
            start_date,
            end_date,
            status: AllocationStatus::Active,
            created_by: created_by.into(),
            created_at: now,
            updated_at: now,
            closed_at: None,
        })
    }

    pub fn is_closed(&self) -> bool {
        self.status == AllocationStatus::Closed
    }

    pub fn ensure_open(&self) -> Result<(), DomainError> {
        if self.is_closed() {
            return Err(DomainError::Validation(format!(
                "Allocation {} is closed",
                self.id
            )));
        }
        Ok(())
    }

    pub fn apply(&mut self, changes: AllocationChanges, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.ensure_open()?;

        let start = changes.start_date.unwrap_or(self.start_date);
        let end = changes.end_date.unwrap_or(self.end_date);
        validate_date_range(start, end)?;

        if let Some(trial_id) = changes.trial_id {
            validate_required(&trial_id, "Trial ID")?;
            self.trial_id = trial_id.trim().to_string();
        }
        if let Some(system) = changes.system {
            self.system = Some(system);
        }
        if let Some(role) = changes.allocation_role {
            self.allocation_role = Some(role);
        }
        self.start_date = start;
        self.end_date = end;
        self.updated_at = now;
        Ok(())
    }

    pub fn close(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.ensure_open()?;
        self.status = AllocationStatus::Closed;
        self.closed_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Whether the allocation's period intersects `[from, to]`. Open bounds
    /// are unbounded.
    pub fn overlaps(&self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> bool {
        from.map_or(true, |f| self.end_date >= f) && to.map_or(true, |t| self.start_date <= t)
    }
}

#[derive(Debug, Clone, Default)]
pub struct AllocationChanges {
    pub trial_id: Option<String>,
    pub system: Option<String>,
    pub allocation_role: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl AllocationChanges {
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(t) = &self.trial_id {
            parts.push(format!("trial_id={}", t));
        }
        if let Some(s) = &self.system {
            parts.push(format!("system={}", s));
        }
        if let Some(r) = &self.allocation_role {
            parts.push(format!("role={}", r));
        }
        if let Some(d) = self.start_date {
            parts.push(format!("start_date={}", d));
        }
        if let Some(d) = self.end_date {
            parts.push(format!("end_date={}", d));
        }
        if parts.is_empty() {
            "no changes".to_string()
        } else {
            parts.join(", ")
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AllocationFilter {
    pub engineer_id: Option<String>,
    pub trial_id: Option<String>,
    pub status: Option<AllocationStatus>,
    /// Period overlap lower bound
    pub from: Option<NaiveDate>,
    /// Period overlap upper bound
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AllocationStats {
    pub total: u64,
    pub by_status: BTreeMap<AllocationStatus, u64>,
    pub by_system: BTreeMap<String, u64>,
    pub by_engineer: BTreeMap<String, u64>,
}

impl AllocationStats {
    pub fn from_allocations<'a>(allocations: impl IntoIterator<Item = &'a Allocation>) -> Self {
        let mut stats = AllocationStats::default();
        for a in allocations {
            stats.total += 1;
            *stats.by_status.entry(a.status).or_default() += 1;
            let system = a.system.clone().unwrap_or_else(|| "Unknown".to_string());
            *stats.by_system.entry(system).or_default() += 1;
            *stats.by_engineer.entry(a.engineer_id.clone()).or_default() += 1;
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn allocation() -> Allocation {
        Allocation::new(
            "eng-1",
            "NN-1234",
            date(2024, 1, 1),
            date(2024, 3, 31),
            Some("INFORM".into()),
            Some("TE1".into()),
            "mgr-1",
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn rejects_inverted_range_and_blank_trial() {
        let now = Utc::now();
        assert!(Allocation::new("e", "T", date(2024, 2, 1), date(2024, 1, 1), None, None, "m", now).is_err());
        assert!(Allocation::new("e", "  ", date(2024, 1, 1), date(2024, 2, 1), None, None, "m", now).is_err());
    }

    #[test]
    fn closed_allocation_is_read_only() {
        let mut a = allocation();
        a.close(Utc::now()).unwrap();
        assert!(a.is_closed());
        assert!(a.closed_at.is_some());

        assert!(a.close(Utc::now()).is_err());
        let changes = AllocationChanges {
            trial_id: Some("NN-9999".into()),
            ..Default::default()
        };
        assert!(a.apply(changes, Utc::now()).is_err());
        assert_eq!(a.trial_id, "NN-1234");
    }

    #[test]
    fn apply_validates_combined_range() {
        let mut a = allocation();
        let changes = AllocationChanges {
            end_date: Some(date(2023, 12, 31)),
            ..Default::default()
        };
        assert!(a.apply(changes, Utc::now()).is_err());

        let changes = AllocationChanges {
            end_date: Some(date(2024, 6, 30)),
            allocation_role: Some("Lead".into()),
            ..Default::default()
        };
        a.apply(changes, Utc::now()).unwrap();
        assert_eq!(a.end_date, date(2024, 6, 30));
        assert_eq!(a.allocation_role.as_deref(), Some("Lead"));
    }

    #[test]
    fn overlap_is_inclusive() {
        let a = allocation();
        assert!(a.overlaps(None, None));
        assert!(a.overlaps(Some(date(2024, 3, 31)), None));
        assert!(a.overlaps(None, Some(date(2024, 1, 1))));
        assert!(!a.overlaps(Some(date(2024, 4, 1)), None));
        assert!(!a.overlaps(None, Some(date(2023, 12, 31))));
    }

    #[test]
    fn stats_count_by_dimension() {
        let a = allocation();
        let mut b = allocation();
        b.system = None;
        b.close(Utc::now()).unwrap();

        let stats = AllocationStats::from_allocations([&a, &b]);
        assert_eq!(stats.total, 2);
        assert_eq!(stats.by_status[&AllocationStatus::Active], 1);
        assert_eq!(stats.by_status[&AllocationStatus::Closed], 1);
        assert_eq!(stats.by_system["INFORM"], 1);
        assert_eq!(stats.by_system["Unknown"], 1);
        assert_eq!(stats.by_engineer["eng-1"], 2);
    }
}
