use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::domain::audit::{AuditAction, EntityRef, NewAuditEntry};
use crate::domain::quality::{QualityChanges, QualityDraft, QualityFilter, QualityRecord, QualityStats};
use crate::domain::{AccessPolicy, Action, DomainError, DomainResult, RepositoryProvider, Session};

/// Trial quality matrix. Engineers keep their own records; holders of
/// `ManageAllocations` may correct or remove anyone's.
pub struct QualityService {
    repos: Arc<dyn RepositoryProvider>,
    policy: Arc<AccessPolicy>,
}

impl QualityService {
    pub fn new(repos: Arc<dyn RepositoryProvider>, policy: Arc<AccessPolicy>) -> Self {
        Self { repos, policy }
    }

    pub async fn create_record(&self, session: &Session, draft: QualityDraft) -> DomainResult<QualityRecord> {
        self.policy.require(session, Action::RecordQuality)?;

        let record = QualityRecord::new(draft, session.user_id.clone(), Utc::now())?;
        let audit = NewAuditEntry::by(
            session,
            AuditAction::CreateQualityRecord,
            EntityRef::quality_record(&record.id),
            format!(
                "Quality record for trial {} round {} ({}, density {:.2}%)",
                record.trial_id,
                record.round,
                record.phase,
                record.defect_density()
            ),
        );
        let record = self.repos.quality().insert(record, audit).await?;

        metrics::counter!("portal_quality_records_total", "type" => record.requirement_type.as_str()).increment(1);
        info!(record_id = %record.id, trial_id = %record.trial_id, round = record.round, by = %session.username, "Quality record created");
        Ok(record)
    }

    pub async fn get_record(&self, session: &Session, id: &str) -> DomainResult<QualityRecord> {
        let record = self
            .repos
            .quality()
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("QualityRecord", "id", id))?;
        if !session.is(&record.created_by) {
            self.policy.require(session, Action::ViewAllRecords)?;
        }
        Ok(record)
    }

    pub async fn update_record(
        &self,
        session: &Session,
        id: &str,
        changes: QualityChanges,
    ) -> DomainResult<QualityRecord> {
        self.policy.require(session, Action::RecordQuality)?;

        let actor = session.clone();
        let may_edit_any = self.policy.permits(session.role, Action::ManageAllocations);
        let record = self
            .repos
            .quality()
            .update(
                id,
                Box::new(move |r: &mut QualityRecord| -> DomainResult<NewAuditEntry> {
                    ensure_editable(&actor, r, may_edit_any)?;
                    let summary = changes.describe();
                    r.apply(changes, Utc::now())?;
                    Ok(NewAuditEntry::by(
                        &actor,
                        AuditAction::UpdateQualityRecord,
                        EntityRef::quality_record(&r.id),
                        format!("Updated quality record: {}", summary),
                    ))
                }),
            )
            .await?;

        info!(record_id = %record.id, by = %session.username, "Quality record updated");
        Ok(record)
    }

    pub async fn delete_record(&self, session: &Session, id: &str) -> DomainResult<QualityRecord> {
        self.policy.require(session, Action::RecordQuality)?;

        let actor = session.clone();
        let may_edit_any = self.policy.permits(session.role, Action::ManageAllocations);
        let record = self
            .repos
            .quality()
            .delete(
                id,
                Box::new(move |r: &QualityRecord| -> DomainResult<NewAuditEntry> {
                    ensure_editable(&actor, r, may_edit_any)?;
                    Ok(NewAuditEntry::by(
                        &actor,
                        AuditAction::DeleteQualityRecord,
                        EntityRef::quality_record(&r.id),
                        format!("Deleted quality record for trial {} ({})", r.trial_id, r.phase),
                    ))
                }),
            )
            .await?;

        info!(record_id = %record.id, by = %session.username, "Quality record deleted");
        Ok(record)
    }

    /// Records matching `filter`. Callers without `ViewAllRecords` only
    /// ever see their own.
    pub async fn list_records(&self, session: &Session, mut filter: QualityFilter) -> DomainResult<Vec<QualityRecord>> {
        if !self.policy.permits(session.role, Action::ViewAllRecords) {
            filter.created_by = Some(session.user_id.clone());
        }
        self.repos.quality().list(&filter).await
    }

    pub async fn quality_stats(&self, session: &Session, filter: QualityFilter) -> DomainResult<QualityStats> {
        let records = self.list_records(session, filter).await?;
        Ok(QualityStats::from_records(&records))
    }
}

fn ensure_editable(actor: &Session, record: &QualityRecord, may_edit_any: bool) -> DomainResult<()> {
    if may_edit_any || actor.is(&record.created_by) {
        Ok(())
    } else {
        Err(DomainError::Unauthorized(format!(
            "quality record {} belongs to another user",
            record.id
        )))
    }
}
