//! Quality record DTOs

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::domain::quality::{
    FailureReasons, QualityChanges, QualityDraft, QualityFilter, QualityRecord, QualityStats,
};
use crate::domain::DomainError;

/// Failure counts by root cause
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct FailureReasonsDto {
    #[validate(range(min = 0))]
    pub spec_issue: i32,
    #[validate(range(min = 0))]
    pub mock_crf_issue: i32,
    #[validate(range(min = 0))]
    pub programming_issue: i32,
    #[validate(range(min = 0))]
    pub scripting_issue: i32,
}

impl From<FailureReasons> for FailureReasonsDto {
    fn from(r: FailureReasons) -> Self {
        Self {
            spec_issue: r.spec_issue,
            mock_crf_issue: r.mock_crf_issue,
            programming_issue: r.programming_issue,
            scripting_issue: r.scripting_issue,
        }
    }
}

impl From<FailureReasonsDto> for FailureReasons {
    fn from(r: FailureReasonsDto) -> Self {
        Self {
            spec_issue: r.spec_issue,
            mock_crf_issue: r.mock_crf_issue,
            programming_issue: r.programming_issue,
            scripting_issue: r.scripting_issue,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct QualityRecordDto {
    pub id: String,
    pub trial_id: String,
    pub phase: String,
    pub no_of_uat_plans: i32,
    pub no_of_rounds: i32,
    /// forms or editchecks
    pub requirement_type: String,
    pub round: i32,
    pub total_requirements: i32,
    pub total_failures: i32,
    /// Failures per hundred requirements, two decimals
    pub defect_density: f64,
    pub failure_reasons: FailureReasonsDto,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation_issues: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeline_adherence: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_deployment_delays: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<QualityRecord> for QualityRecordDto {
    fn from(r: QualityRecord) -> Self {
        let defect_density = (r.defect_density() * 100.0).round() / 100.0;
        Self {
            id: r.id,
            trial_id: r.trial_id,
            phase: r.phase,
            no_of_uat_plans: r.no_of_uat_plans,
            no_of_rounds: r.no_of_rounds,
            requirement_type: r.requirement_type.to_string(),
            round: r.round,
            total_requirements: r.total_requirements,
            total_failures: r.total_failures,
            defect_density,
            failure_reasons: r.reasons.into(),
            documentation_issues: r.documentation_issues,
            timeline_adherence: r.timeline_adherence,
            system_deployment_delays: r.system_deployment_delays,
            created_by: r.created_by,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateQualityRequest {
    #[validate(length(min = 1, max = 64, message = "trial_id must be 1-64 characters"))]
    pub trial_id: String,
    /// "Phase 1 & NIS", "Phase 2", "Phase 3" or free text
    #[validate(length(min = 1, max = 100, message = "phase must be 1-100 characters"))]
    pub phase: String,
    #[validate(range(min = 0))]
    pub no_of_uat_plans: i32,
    #[validate(range(min = 1, message = "no_of_rounds must be at least 1"))]
    pub no_of_rounds: i32,
    /// forms or editchecks
    pub requirement_type: String,
    #[validate(range(min = 1))]
    pub round: i32,
    #[validate(range(min = 1, message = "total_requirements must be at least 1"))]
    pub total_requirements: i32,
    #[validate(range(min = 0))]
    pub total_failures: i32,
    #[serde(default)]
    #[validate(nested)]
    pub failure_reasons: FailureReasonsDto,
    #[validate(length(max = 2000))]
    pub documentation_issues: Option<String>,
    #[validate(length(max = 500))]
    pub timeline_adherence: Option<String>,
    #[validate(length(max = 500))]
    pub system_deployment_delays: Option<String>,
}

impl CreateQualityRequest {
    pub fn into_draft(self) -> Result<QualityDraft, DomainError> {
        Ok(QualityDraft {
            trial_id: self.trial_id,
            phase: self.phase,
            no_of_uat_plans: self.no_of_uat_plans,
            no_of_rounds: self.no_of_rounds,
            requirement_type: self.requirement_type.parse()?,
            round: self.round,
            total_requirements: self.total_requirements,
            total_failures: self.total_failures,
            reasons: self.failure_reasons.into(),
            documentation_issues: self.documentation_issues,
            timeline_adherence: self.timeline_adherence,
            system_deployment_delays: self.system_deployment_delays,
        })
    }
}

/// Partial update. Omitted fields are left unchanged; an empty note clears it.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateQualityRequest {
    #[validate(length(min = 1, max = 100))]
    pub phase: Option<String>,
    /// forms or editchecks
    pub requirement_type: Option<String>,
    #[validate(range(min = 1))]
    pub round: Option<i32>,
    #[validate(range(min = 1))]
    pub total_requirements: Option<i32>,
    #[validate(range(min = 0))]
    pub total_failures: Option<i32>,
    #[validate(nested)]
    pub failure_reasons: Option<FailureReasonsDto>,
    #[validate(length(max = 2000))]
    pub documentation_issues: Option<String>,
    #[validate(length(max = 500))]
    pub timeline_adherence: Option<String>,
    #[validate(length(max = 500))]
    pub system_deployment_delays: Option<String>,
}

impl UpdateQualityRequest {
    pub fn into_changes(self) -> Result<QualityChanges, DomainError> {
        Ok(QualityChanges {
            phase: self.phase,
            requirement_type: self.requirement_type.as_deref().map(str::parse).transpose()?,
            round: self.round,
            total_requirements: self.total_requirements,
            total_failures: self.total_failures,
            reasons: self.failure_reasons.map(Into::into),
            documentation_issues: self.documentation_issues,
            timeline_adherence: self.timeline_adherence,
            system_deployment_delays: self.system_deployment_delays,
        })
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListQualityParams {
    pub trial_id: Option<String>,
    pub phase: Option<String>,
    /// forms or editchecks
    pub requirement_type: Option<String>,
    /// Creator's user ID; ignored for callers who only see their own
    pub created_by: Option<String>,
    pub round: Option<i32>,
}

impl ListQualityParams {
    pub fn filter(self) -> Result<QualityFilter, DomainError> {
        Ok(QualityFilter {
            trial_id: self.trial_id,
            phase: self.phase,
            requirement_type: self.requirement_type.as_deref().map(str::parse).transpose()?,
            created_by: self.created_by,
            round: self.round,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QualityStatsDto {
    pub total_records: u64,
    pub unique_trials: u64,
    pub total_requirements: i64,
    pub total_failures: i64,
    pub avg_defect_density: f64,
    pub failure_reasons: BTreeMap<String, i64>,
    pub by_type: BTreeMap<String, u64>,
    pub by_phase: BTreeMap<String, u64>,
    /// Keyed "Round N"
    pub by_round: BTreeMap<String, u64>,
}

impl From<QualityStats> for QualityStatsDto {
    fn from(s: QualityStats) -> Self {
        let reasons = s.failure_reasons;
        Self {
            total_records: s.total_records,
            unique_trials: s.unique_trials,
            total_requirements: s.total_requirements,
            total_failures: s.total_failures,
            avg_defect_density: s.avg_defect_density,
            failure_reasons: BTreeMap::from([
                ("spec_issue".to_string(), i64::from(reasons.spec_issue)),
                ("mock_crf_issue".to_string(), i64::from(reasons.mock_crf_issue)),
                ("programming_issue".to_string(), i64::from(reasons.programming_issue)),
                ("scripting_issue".to_string(), i64::from(reasons.scripting_issue)),
            ]),
            by_type: s.by_type.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
            by_phase: s.by_phase,
            by_round: s.by_round.into_iter().map(|(k, v)| (format!("Round {}", k), v)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::quality::RequirementType;

    #[test]
    fn unknown_requirement_type_is_rejected() {
        let params = ListQualityParams {
            requirement_type: Some("listings".into()),
            ..Default::default()
        };
        assert!(matches!(params.filter(), Err(DomainError::Validation(_))));

        let update = UpdateQualityRequest {
            requirement_type: Some("Editchecks".into()),
            ..Default::default()
        };
        assert_eq!(
            update.into_changes().unwrap().requirement_type,
            Some(RequirementType::Editchecks)
        );
    }

    #[test]
    fn negative_reason_fails_validation() {
        let reasons = FailureReasonsDto {
            spec_issue: -1,
            ..Default::default()
        };
        assert!(reasons.validate().is_err());
    }

    #[test]
    fn stats_label_rounds() {
        let mut stats = QualityStats::default();
        stats.by_round.insert(2, 3);
        let dto = QualityStatsDto::from(stats);
        assert_eq!(dto.by_round["Round 2"], 3);
        assert_eq!(dto.failure_reasons["spec_issue"], 0);
    }
}
