use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::errors::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UatCategory {
    Build,
    ChangeRequest,
}

impl UatCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            UatCategory::Build => "build",
            UatCategory::ChangeRequest => "change_request",
        }
    }
}

impl fmt::Display for UatCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UatCategory {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "build" => Ok(UatCategory::Build),
            "change_request" | "cr" => Ok(UatCategory::ChangeRequest),
            other => Err(DomainError::Validation(format!("Unknown UAT category '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UatResult {
    Pending,
    Pass,
    Fail,
}

impl UatResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            UatResult::Pending => "pending",
            UatResult::Pass => "pass",
            UatResult::Fail => "fail",
        }
    }

    pub fn is_final(&self) -> bool {
        !matches!(self, UatResult::Pending)
    }
}

impl fmt::Display for UatResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UatResult {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(UatResult::Pending),
            "pass" => Ok(UatResult::Pass),
            "fail" => Ok(UatResult::Fail),
            other => Err(DomainError::Validation(format!("Unknown UAT result '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UatRecord {
    pub id: String,
    pub allocation_id: String,
    /// 1-based, strictly increasing per allocation
    pub round: i32,
    pub category: UatCategory,
    pub result: UatResult,
    pub notes: Option<String>,
    pub recorded_by: String,
    pub recorded_at: DateTime<Utc>,
    pub finalized_at: Option<DateTime<Utc>>,
}

impl UatRecord {
    pub fn new(
        allocation_id: impl Into<String>,
        round: i32,
        category: UatCategory,
        result: UatResult,
        notes: Option<String>,
        recorded_by: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            allocation_id: allocation_id.into(),
            round,
            category,
            result,
            notes,
            recorded_by: recorded_by.into(),
            recorded_at: now,
            finalized_at: result.is_final().then_some(now),
        }
    }

    /// Set the outcome of a pending round. A round is finalized once.
    pub fn finalize(&mut self, result: UatResult, now: DateTime<Utc>) -> Result<(), DomainError> {
        if self.result.is_final() {
            return Err(DomainError::AlreadyFinalized { round: self.round });
        }
        if !result.is_final() {
            return Err(DomainError::Validation(
                "A round can only be finalized as pass or fail".into(),
            ));
        }
        self.result = result;
        self.finalized_at = Some(now);
        Ok(())
    }
}

/// Decide whether `round` may be recorded next, given the allocation's
/// existing rounds.
///
/// A finalized record for the same round is reported as `AlreadyFinalized`
/// before the ordering check, so retrying a settled round says so.
pub fn admit_round(history: &[UatRecord], round: i32) -> Result<(), DomainError> {
    if round < 1 {
        return Err(DomainError::Validation("UAT round must be at least 1".into()));
    }

    if history.iter().any(|r| r.round == round && r.result.is_final()) {
        return Err(DomainError::AlreadyFinalized { round });
    }

    match history.iter().map(|r| r.round).max() {
        Some(last) if round <= last => Err(DomainError::OutOfOrderRound { round, last }),
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, Default)]
pub struct UatFilter {
    /// Restrict to these allocations; `None` means all
    pub allocation_ids: Option<Vec<String>>,
    pub category: Option<UatCategory>,
    pub result: Option<UatResult>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UatStats {
    pub total: u64,
    pub by_result: BTreeMap<UatResult, u64>,
    pub by_category: BTreeMap<UatCategory, u64>,
    /// Passed share of finalized rounds, in percent
    pub pass_rate: f64,
}

impl UatStats {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a UatRecord>) -> Self {
        let mut stats = UatStats::default();
        for r in records {
            stats.total += 1;
            *stats.by_result.entry(r.result).or_default() += 1;
            *stats.by_category.entry(r.category).or_default() += 1;
        }

        let passed = stats.by_result.get(&UatResult::Pass).copied().unwrap_or(0);
        let failed = stats.by_result.get(&UatResult::Fail).copied().unwrap_or(0);
        if passed + failed > 0 {
            stats.pass_rate = passed as f64 * 100.0 / (passed + failed) as f64;
        }
        stats
    }
}
