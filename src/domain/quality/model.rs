use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::errors::DomainError;
use crate::shared::validations::validate_required;

/// What a quality record measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequirementType {
    Forms,
    Editchecks,
}

impl RequirementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequirementType::Forms => "forms",
            RequirementType::Editchecks => "editchecks",
        }
    }
}

impl fmt::Display for RequirementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequirementType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "forms" => Ok(RequirementType::Forms),
            "editchecks" => Ok(RequirementType::Editchecks),
            other => Err(DomainError::Validation(format!("Unknown requirement type '{}'", other))),
        }
    }
}

/// Failures of one round broken down by root cause.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReasons {
    pub spec_issue: i32,
    pub mock_crf_issue: i32,
    pub programming_issue: i32,
    pub scripting_issue: i32,
}

impl FailureReasons {
    pub fn total(&self) -> i64 {
        [self.spec_issue, self.mock_crf_issue, self.programming_issue, self.scripting_issue]
            .iter()
            .map(|n| i64::from(*n))
            .sum()
    }

    fn has_negative(&self) -> bool {
        [self.spec_issue, self.mock_crf_issue, self.programming_issue, self.scripting_issue]
            .iter()
            .any(|n| *n < 0)
    }

    fn add(&mut self, other: &FailureReasons) {
        self.spec_issue += other.spec_issue;
        self.mock_crf_issue += other.mock_crf_issue;
        self.programming_issue += other.programming_issue;
        self.scripting_issue += other.scripting_issue;
    }
}

/// Fields supplied when a quality record is created.
#[derive(Debug, Clone)]
pub struct QualityDraft {
    pub trial_id: String,
    /// "Phase 1 & NIS", "Phase 2", "Phase 3" or free text
    pub phase: String,
    pub no_of_uat_plans: i32,
    pub no_of_rounds: i32,
    pub requirement_type: RequirementType,
    pub round: i32,
    pub total_requirements: i32,
    pub total_failures: i32,
    pub reasons: FailureReasons,
    pub documentation_issues: Option<String>,
    pub timeline_adherence: Option<String>,
    pub system_deployment_delays: Option<String>,
}

/// Requirement and failure counts for one UAT round of a trial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualityRecord {
    pub id: String,
    pub trial_id: String,
    pub phase: String,
    pub no_of_uat_plans: i32,
    pub no_of_rounds: i32,
    pub requirement_type: RequirementType,
    pub round: i32,
    pub total_requirements: i32,
    pub total_failures: i32,
    pub reasons: FailureReasons,
    pub documentation_issues: Option<String>,
    pub timeline_adherence: Option<String>,
    pub system_deployment_delays: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl QualityRecord {
    pub fn new(draft: QualityDraft, created_by: impl Into<String>, now: DateTime<Utc>) -> Result<Self, DomainError> {
        let record = Self {
            id: uuid::Uuid::new_v4().to_string(),
            trial_id: draft.trial_id.trim().to_string(),
            phase: draft.phase.trim().to_string(),
            no_of_uat_plans: draft.no_of_uat_plans,
            no_of_rounds: draft.no_of_rounds,
            requirement_type: draft.requirement_type,
            round: draft.round,
            total_requirements: draft.total_requirements,
            total_failures: draft.total_failures,
            reasons: draft.reasons,
            documentation_issues: non_blank(draft.documentation_issues),
            timeline_adherence: non_blank(draft.timeline_adherence),
            system_deployment_delays: non_blank(draft.system_deployment_delays),
            created_by: created_by.into(),
            created_at: now,
            updated_at: now,
        };
        record.validate()?;
        Ok(record)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        validate_required(&self.trial_id, "Trial ID")?;
        validate_required(&self.phase, "Phase")?;
        if self.no_of_uat_plans < 0 {
            return Err(DomainError::Validation("No. of UAT plans cannot be negative".into()));
        }
        if self.no_of_rounds < 1 {
            return Err(DomainError::Validation("No. of rounds must be greater than 0".into()));
        }
        if !(1..=self.no_of_rounds).contains(&self.round) {
            return Err(DomainError::Validation(format!(
                "Round must be between 1 and {}",
                self.no_of_rounds
            )));
        }
        if self.total_requirements < 1 {
            return Err(DomainError::Validation("Total requirements must be greater than 0".into()));
        }
        if self.total_failures < 0 || self.total_failures > self.total_requirements {
            return Err(DomainError::Validation(
                "Total failures must be between 0 and total requirements".into(),
            ));
        }
        if self.reasons.has_negative() {
            return Err(DomainError::Validation("Failure reasons cannot be negative".into()));
        }
        if self.reasons.total() > i64::from(self.total_failures) {
            return Err(DomainError::Validation(format!(
                "Sum of failure reasons ({}) cannot exceed total failures ({})",
                self.reasons.total(),
                self.total_failures
            )));
        }
        Ok(())
    }

    /// Failures per hundred requirements.
    pub fn defect_density(&self) -> f64 {
        if self.total_requirements <= 0 {
            return 0.0;
        }
        f64::from(self.total_failures) / f64::from(self.total_requirements) * 100.0
    }

    /// Apply `changes` all-or-nothing: the record is untouched when the
    /// result would not validate.
    pub fn apply(&mut self, changes: QualityChanges, now: DateTime<Utc>) -> Result<(), DomainError> {
        let mut next = self.clone();
        if let Some(phase) = changes.phase {
            next.phase = phase.trim().to_string();
        }
        if let Some(t) = changes.requirement_type {
            next.requirement_type = t;
        }
        if let Some(round) = changes.round {
            next.round = round;
        }
        if let Some(n) = changes.total_requirements {
            next.total_requirements = n;
        }
        if let Some(n) = changes.total_failures {
            next.total_failures = n;
        }
        if let Some(reasons) = changes.reasons {
            next.reasons = reasons;
        }
        if let Some(text) = changes.documentation_issues {
            next.documentation_issues = non_blank(Some(text));
        }
        if let Some(text) = changes.timeline_adherence {
            next.timeline_adherence = non_blank(Some(text));
        }
        if let Some(text) = changes.system_deployment_delays {
            next.system_deployment_delays = non_blank(Some(text));
        }
        next.validate()?;
        next.updated_at = now;
        *self = next;
        Ok(())
    }
}

fn non_blank(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

/// Partial update. A blank free-text value clears the field.
#[derive(Debug, Clone, Default)]
pub struct QualityChanges {
    pub phase: Option<String>,
    pub requirement_type: Option<RequirementType>,
    pub round: Option<i32>,
    pub total_requirements: Option<i32>,
    pub total_failures: Option<i32>,
    pub reasons: Option<FailureReasons>,
    pub documentation_issues: Option<String>,
    pub timeline_adherence: Option<String>,
    pub system_deployment_delays: Option<String>,
}

impl QualityChanges {
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(p) = &self.phase {
            parts.push(format!("phase={}", p));
        }
        if let Some(t) = self.requirement_type {
            parts.push(format!("type={}", t));
        }
        if let Some(r) = self.round {
            parts.push(format!("round={}", r));
        }
        if let Some(n) = self.total_requirements {
            parts.push(format!("total_requirements={}", n));
        }
        if let Some(n) = self.total_failures {
            parts.push(format!("total_failures={}", n));
        }
        if self.reasons.is_some() {
            parts.push("failure_reasons".to_string());
        }
        if self.documentation_issues.is_some()
            || self.timeline_adherence.is_some()
            || self.system_deployment_delays.is_some()
        {
            parts.push("notes".to_string());
        }
        if parts.is_empty() {
            "no changes".to_string()
        } else {
            parts.join(", ")
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct QualityFilter {
    pub trial_id: Option<String>,
    pub phase: Option<String>,
    pub requirement_type: Option<RequirementType>,
    pub created_by: Option<String>,
    pub round: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QualityStats {
    pub total_records: u64,
    pub unique_trials: u64,
    /// Requirements counted once per trial: every requirement of the first
    /// round, then only what each later round adds beyond the previous
    /// round's failures.
    pub total_requirements: i64,
    pub total_failures: i64,
    /// Mean density over each trial's latest round, two decimals.
    pub avg_defect_density: f64,
    pub failure_reasons: FailureReasons,
    pub by_type: BTreeMap<RequirementType, u64>,
    pub by_phase: BTreeMap<String, u64>,
    pub by_round: BTreeMap<i32, u64>,
}

impl QualityStats {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a QualityRecord>) -> Self {
        let mut stats = QualityStats::default();
        let mut trials: BTreeMap<&str, Vec<&QualityRecord>> = BTreeMap::new();

        for r in records {
            stats.total_records += 1;
            stats.total_failures += i64::from(r.total_failures);
            stats.failure_reasons.add(&r.reasons);
            *stats.by_type.entry(r.requirement_type).or_default() += 1;
            *stats.by_phase.entry(r.phase.clone()).or_default() += 1;
            *stats.by_round.entry(r.round).or_default() += 1;
            trials.entry(r.trial_id.as_str()).or_default().push(r);
        }

        stats.unique_trials = trials.len() as u64;
        let mut density_sum = 0.0;
        for rounds in trials.values_mut() {
            rounds.sort_by_key(|r| (r.round, r.created_at));

            let mut previous_failures: Option<i32> = None;
            for r in rounds.iter() {
                let added = match previous_failures {
                    None => r.total_requirements,
                    Some(carried) => (r.total_requirements - carried).max(0),
                };
                stats.total_requirements += i64::from(added);
                previous_failures = Some(r.total_failures);
            }
            if let Some(latest) = rounds.last() {
                density_sum += latest.defect_density();
            }
        }
        if !trials.is_empty() {
            let avg = density_sum / trials.len() as f64;
            stats.avg_defect_density = (avg * 100.0).round() / 100.0;
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(trial: &str, round: i32, requirements: i32, failures: i32) -> QualityDraft {
        QualityDraft {
            trial_id: trial.into(),
            phase: "Phase 2".into(),
            no_of_uat_plans: 2,
            no_of_rounds: 3,
            requirement_type: RequirementType::Forms,
            round,
            total_requirements: requirements,
            total_failures: failures,
            reasons: FailureReasons::default(),
            documentation_issues: None,
            timeline_adherence: Some("  ".into()),
            system_deployment_delays: None,
        }
    }

    fn record(trial: &str, round: i32, requirements: i32, failures: i32) -> QualityRecord {
        QualityRecord::new(draft(trial, round, requirements, failures), "erin", Utc::now()).unwrap()
    }

    #[test]
    fn new_validates_counts() {
        let now = Utc::now();
        assert!(QualityRecord::new(draft("NN-1", 1, 0, 0), "e", now).is_err());
        assert!(QualityRecord::new(draft("NN-1", 1, 10, 11), "e", now).is_err());
        assert!(QualityRecord::new(draft("NN-1", 4, 10, 1), "e", now).is_err());
        assert!(QualityRecord::new(draft("NN-1", 0, 10, 1), "e", now).is_err());
        assert!(QualityRecord::new(draft(" ", 1, 10, 1), "e", now).is_err());

        let mut too_many_reasons = draft("NN-1", 1, 10, 2);
        too_many_reasons.reasons = FailureReasons {
            spec_issue: 2,
            scripting_issue: 1,
            ..Default::default()
        };
        assert!(QualityRecord::new(too_many_reasons, "e", now).is_err());

        let r = record("NN-1", 1, 10, 2);
        assert_eq!(r.timeline_adherence, None);
    }

    #[test]
    fn density_is_a_percentage() {
        assert_eq!(record("NN-1", 1, 50, 10).defect_density(), 20.0);
        assert_eq!(record("NN-1", 1, 8, 0).defect_density(), 0.0);
    }

    #[test]
    fn rejected_changes_leave_record_untouched() {
        let mut r = record("NN-1", 1, 10, 2);
        let before = r.clone();
        let changes = QualityChanges {
            total_requirements: Some(1),
            ..Default::default()
        };
        assert!(r.apply(changes, Utc::now()).is_err());
        assert_eq!(r, before);

        let changes = QualityChanges {
            total_failures: Some(5),
            documentation_issues: Some("late mock CRF".into()),
            ..Default::default()
        };
        r.apply(changes, Utc::now()).unwrap();
        assert_eq!(r.total_failures, 5);
        assert_eq!(r.defect_density(), 50.0);
        assert_eq!(r.documentation_issues.as_deref(), Some("late mock CRF"));
    }

    #[test]
    fn requirements_accumulate_across_rounds() {
        // round 2 retests 10 failures and adds 2 new requirements
        let r1 = record("NN-1", 1, 50, 10);
        let r2 = record("NN-1", 2, 12, 0);
        let other = record("NN-2", 1, 20, 5);

        let stats = QualityStats::from_records([&r2, &other, &r1]);
        assert_eq!(stats.total_records, 3);
        assert_eq!(stats.unique_trials, 2);
        assert_eq!(stats.total_requirements, 52 + 20);
        assert_eq!(stats.total_failures, 15);
        // latest rounds: NN-1 round 2 (0%), NN-2 round 1 (25%)
        assert_eq!(stats.avg_defect_density, 12.5);
        assert_eq!(stats.by_round[&1], 2);
        assert_eq!(stats.by_round[&2], 1);
        assert_eq!(stats.by_phase["Phase 2"], 3);
        assert_eq!(stats.by_type[&RequirementType::Forms], 3);
    }

    #[test]
    fn retest_of_fewer_requirements_adds_nothing() {
        let r1 = record("NN-1", 1, 40, 10);
        let r2 = record("NN-1", 2, 6, 1);
        let stats = QualityStats::from_records([&r1, &r2]);
        assert_eq!(stats.total_requirements, 40);
    }

    #[test]
    fn empty_stats_are_zero() {
        let stats = QualityStats::from_records(std::iter::empty());
        assert_eq!(stats, QualityStats::default());
    }

    #[test]
    fn requirement_type_parses_case_insensitively() {
        assert_eq!("Editchecks".parse::<RequirementType>().unwrap(), RequirementType::Editchecks);
        assert!("listings".parse::<RequirementType>().is_err());
    }
}
