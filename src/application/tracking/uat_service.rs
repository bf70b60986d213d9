use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::application::ports::{params, EmailTemplate, Notifier};
use crate::domain::allocation::{Allocation, AllocationFilter};
use crate::domain::audit::{AuditAction, EntityRef, NewAuditEntry};
use crate::domain::uat::{UatCategory, UatFilter, UatRecord, UatResult, UatStats};
use crate::domain::{AccessPolicy, Action, DomainError, DomainResult, RepositoryProvider, Session};

pub struct UatService {
    repos: Arc<dyn RepositoryProvider>,
    policy: Arc<AccessPolicy>,
    notifier: Notifier,
}

impl UatService {
    pub fn new(repos: Arc<dyn RepositoryProvider>, policy: Arc<AccessPolicy>, notifier: Notifier) -> Self {
        Self {
            repos,
            policy,
            notifier,
        }
    }

    /// Record the next UAT round of an allocation.
    ///
    /// Engineers record on their own allocations; recording on someone
    /// else's needs `ManageAllocations`.
    pub async fn record_uat_result(
        &self,
        session: &Session,
        allocation_id: &str,
        round: i32,
        category: UatCategory,
        result: UatResult,
        notes: Option<String>,
    ) -> DomainResult<UatRecord> {
        self.policy.require(session, Action::RecordUat)?;
        let allocation = self.load_allocation(allocation_id).await?;
        self.ensure_can_record(session, &allocation)?;

        let notes = notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
        let record = UatRecord::new(
            allocation_id,
            round,
            category,
            result,
            notes,
            session.user_id.clone(),
            Utc::now(),
        );
        let audit = NewAuditEntry::by(
            session,
            AuditAction::RecordUat,
            EntityRef::uat_record(&record.id),
            format!(
                "Recorded {} round {} on trial {} as {}",
                category, round, allocation.trial_id, result
            ),
        );
        let record = self.repos.uat().append_round(record, audit).await?;

        metrics::counter!("portal_uat_rounds_total", "result" => result.as_str()).increment(1);
        info!(allocation_id, round, result = %result, by = %session.username, "UAT round recorded");

        self.notifier
            .notify_admin(
                EmailTemplate::UatRecorded,
                params([
                    ("allocation_id", allocation.id.clone()),
                    ("trial_id", allocation.trial_id.clone()),
                    ("round", round.to_string()),
                    ("category", category.to_string()),
                    ("result", result.to_string()),
                    ("recorded_by", session.username.clone()),
                ]),
            )
            .await;

        Ok(record)
    }

    /// Settle a pending round as pass or fail.
    pub async fn finalize_uat_round(
        &self,
        session: &Session,
        allocation_id: &str,
        round: i32,
        result: UatResult,
    ) -> DomainResult<UatRecord> {
        self.policy.require(session, Action::RecordUat)?;
        let allocation = self.load_allocation(allocation_id).await?;
        self.ensure_can_record(session, &allocation)?;
        allocation.ensure_open()?;

        let actor = session.clone();
        let record = self
            .repos
            .uat()
            .update_round(
                allocation_id,
                round,
                Box::new(move |r: &mut UatRecord| -> DomainResult<NewAuditEntry> {
                    r.finalize(result, Utc::now())?;
                    Ok(NewAuditEntry::by(
                        &actor,
                        AuditAction::FinalizeUat,
                        EntityRef::uat_record(&r.id),
                        format!("Round {} finalized as {}", r.round, result),
                    ))
                }),
            )
            .await?;

        info!(allocation_id, round, result = %result, by = %session.username, "UAT round finalized");
        Ok(record)
    }

    /// Rounds of one allocation, ascending.
    pub async fn uat_history(&self, session: &Session, allocation_id: &str) -> DomainResult<Vec<UatRecord>> {
        let allocation = self.load_allocation(allocation_id).await?;
        if !session.is(&allocation.engineer_id) {
            self.policy.require(session, Action::ViewAllRecords)?;
        }
        self.repos.uat().history(allocation_id).await
    }

    /// Counts by result and category, over every allocation the caller can
    /// see.
    pub async fn uat_stats(&self, session: &Session) -> DomainResult<UatStats> {
        let mut filter = UatFilter::default();
        if !self.policy.permits(session.role, Action::ViewAllRecords) {
            let own = AllocationFilter {
                engineer_id: Some(session.user_id.clone()),
                ..Default::default()
            };
            let ids = self
                .repos
                .allocations()
                .list(&own)
                .await?
                .into_iter()
                .map(|a| a.id)
                .collect();
            filter.allocation_ids = Some(ids);
        }
        let records = self.repos.uat().list(&filter).await?;
        Ok(UatStats::from_records(&records))
    }

    async fn load_allocation(&self, id: &str) -> DomainResult<Allocation> {
        self.repos
            .allocations()
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Allocation", "id", id))
    }

    fn ensure_can_record(&self, session: &Session, allocation: &Allocation) -> DomainResult<()> {
        if session.is(&allocation.engineer_id) {
            return Ok(());
        }
        if self.policy.permits(session.role, Action::ManageAllocations) {
            return Ok(());
        }
        Err(DomainError::Unauthorized(
            "UAT results can only be recorded on your own allocations".into(),
        ))
    }
}
