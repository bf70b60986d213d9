use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::info;

use crate::application::ports::{params, EmailTemplate, Notifier};
use crate::domain::allocation::{Allocation, AllocationChanges, AllocationFilter, AllocationStats};
use crate::domain::audit::{AuditAction, EntityRef, NewAuditEntry};
use crate::domain::{AccessPolicy, Action, DomainError, DomainResult, RepositoryProvider, Session};

#[derive(Debug, Clone)]
pub struct NewAllocation {
    pub engineer_id: String,
    pub trial_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub system: Option<String>,
    pub allocation_role: Option<String>,
}

pub struct AllocationService {
    repos: Arc<dyn RepositoryProvider>,
    policy: Arc<AccessPolicy>,
    notifier: Notifier,
}

fn allocation_params(a: &Allocation) -> crate::application::ports::EmailParams {
    params([
        ("allocation_id", a.id.clone()),
        ("trial_id", a.trial_id.clone()),
        ("engineer_id", a.engineer_id.clone()),
        ("system", a.system.clone().unwrap_or_default()),
        ("start_date", a.start_date.to_string()),
        ("end_date", a.end_date.to_string()),
    ])
}

impl AllocationService {
    pub fn new(repos: Arc<dyn RepositoryProvider>, policy: Arc<AccessPolicy>, notifier: Notifier) -> Self {
        Self {
            repos,
            policy,
            notifier,
        }
    }

    pub async fn create_allocation(&self, session: &Session, input: NewAllocation) -> DomainResult<Allocation> {
        self.policy.require(session, Action::ManageAllocations)?;

        let engineer = self.repos.users().find_by_id(&input.engineer_id).await?;
        if !engineer.as_ref().is_some_and(|u| u.is_approved()) {
            return Err(DomainError::EngineerNotApproved(input.engineer_id));
        }

        let allocation = Allocation::new(
            input.engineer_id,
            input.trial_id,
            input.start_date,
            input.end_date,
            input.system,
            input.allocation_role,
            session.user_id.clone(),
            Utc::now(),
        )?;

        let audit = NewAuditEntry::by(
            session,
            AuditAction::CreateAllocation,
            EntityRef::allocation(&allocation.id),
            format!(
                "Allocated {} to trial {} ({} to {})",
                allocation.engineer_id, allocation.trial_id, allocation.start_date, allocation.end_date
            ),
        );
        let allocation = self.repos.allocations().insert(allocation, audit).await?;

        metrics::counter!("portal_allocations_created_total").increment(1);
        info!(allocation_id = %allocation.id, trial_id = %allocation.trial_id, by = %session.username, "Allocation created");

        if self.notifier.settings().notify_on_create {
            self.notifier
                .notify_admin(EmailTemplate::AllocationCreated, allocation_params(&allocation))
                .await;
        }
        Ok(allocation)
    }

    pub async fn get_allocation(&self, session: &Session, id: &str) -> DomainResult<Allocation> {
        let allocation = self.load(id).await?;
        self.ensure_visible(session, &allocation)?;
        Ok(allocation)
    }

    pub async fn update_allocation(
        &self,
        session: &Session,
        id: &str,
        changes: AllocationChanges,
    ) -> DomainResult<Allocation> {
        self.policy.require(session, Action::ManageAllocations)?;

        let actor = session.clone();
        let allocation = self
            .repos
            .allocations()
            .update(
                id,
                Box::new(move |a: &mut Allocation| -> DomainResult<NewAuditEntry> {
                    let summary = changes.describe();
                    a.apply(changes, Utc::now())?;
                    Ok(NewAuditEntry::by(
                        &actor,
                        AuditAction::UpdateAllocation,
                        EntityRef::allocation(&a.id),
                        format!("Updated allocation: {}", summary),
                    ))
                }),
            )
            .await?;

        info!(allocation_id = %allocation.id, by = %session.username, "Allocation updated");

        if self.notifier.settings().notify_on_update {
            self.notifier
                .notify_admin(EmailTemplate::AllocationUpdated, allocation_params(&allocation))
                .await;
        }
        Ok(allocation)
    }

    pub async fn close_allocation(&self, session: &Session, id: &str) -> DomainResult<Allocation> {
        self.policy.require(session, Action::ManageAllocations)?;

        let actor = session.clone();
        let allocation = self
            .repos
            .allocations()
            .update(
                id,
                Box::new(move |a: &mut Allocation| -> DomainResult<NewAuditEntry> {
                    a.close(Utc::now())?;
                    Ok(NewAuditEntry::by(
                        &actor,
                        AuditAction::CloseAllocation,
                        EntityRef::allocation(&a.id),
                        format!("Closed allocation for trial {}", a.trial_id),
                    ))
                }),
            )
            .await?;

        info!(allocation_id = %allocation.id, by = %session.username, "Allocation closed");
        Ok(allocation)
    }

    /// Allocations matching `filter`. Callers without `ViewAllRecords` only
    /// ever see their own.
    pub async fn list_allocations(
        &self,
        session: &Session,
        mut filter: AllocationFilter,
    ) -> DomainResult<Vec<Allocation>> {
        if !self.policy.permits(session.role, Action::ViewAllRecords) {
            filter.engineer_id = Some(session.user_id.clone());
        }
        self.repos.allocations().list(&filter).await
    }

    pub async fn allocation_stats(
        &self,
        session: &Session,
        filter: AllocationFilter,
    ) -> DomainResult<AllocationStats> {
        let allocations = self.list_allocations(session, filter).await?;
        Ok(AllocationStats::from_allocations(&allocations))
    }

    async fn load(&self, id: &str) -> DomainResult<Allocation> {
        self.repos
            .allocations()
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Allocation", "id", id))
    }

    fn ensure_visible(&self, session: &Session, allocation: &Allocation) -> DomainResult<()> {
        if session.is(&allocation.engineer_id) {
            return Ok(());
        }
        self.policy.require(session, Action::ViewAllRecords)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::{date, new_allocation, TestPortal};
    use crate::domain::allocation::AllocationStatus;
    use crate::domain::Role;

    #[tokio::test]
    async fn unapproved_engineer_cannot_be_allocated() {
        let portal = TestPortal::new().await;
        let manager = portal.seed("mia", Role::Manager).await;
        let pending = portal.seed_pending("pat").await;
        let allocations = &portal.services.allocations;

        assert_eq!(
            allocations
                .create_allocation(&manager, new_allocation(&pending.user_id))
                .await
                .unwrap_err(),
            DomainError::EngineerNotApproved(pending.user_id.clone())
        );
        assert!(matches!(
            allocations.create_allocation(&manager, new_allocation("missing")).await,
            Err(DomainError::EngineerNotApproved(_))
        ));
        assert!(allocations
            .list_allocations(&manager, AllocationFilter::default())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn create_requires_manage_allocations() {
        let portal = TestPortal::new().await;
        let erin = portal.seed("erin", Role::User).await;

        assert!(matches!(
            portal
                .services
                .allocations
                .create_allocation(&erin, new_allocation(&erin.user_id))
                .await,
            Err(DomainError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn create_validates_and_notifies() {
        let portal = TestPortal::new().await;
        let manager = portal.seed("mia", Role::Manager).await;
        let erin = portal.seed("erin", Role::User).await;
        let allocations = &portal.services.allocations;

        let backwards = NewAllocation {
            start_date: date(2024, 5, 1),
            end_date: date(2024, 4, 1),
            ..new_allocation(&erin.user_id)
        };
        assert!(matches!(
            allocations.create_allocation(&manager, backwards).await,
            Err(DomainError::Validation(_))
        ));

        let allocation = portal.allocate(&manager, &erin).await;
        assert_eq!(allocation.status, AllocationStatus::Active);
        assert_eq!(allocation.created_by, manager.user_id);

        let mail = portal.mailer.last(EmailTemplate::AllocationCreated).unwrap();
        assert_eq!(mail.params["trial_id"], "NN-1234");
        assert_eq!(mail.params["allocation_id"], allocation.id);
    }

    #[tokio::test]
    async fn update_and_close() {
        let portal = TestPortal::new().await;
        let manager = portal.seed("mia", Role::Manager).await;
        let erin = portal.seed("erin", Role::User).await;
        let allocations = &portal.services.allocations;
        let allocation = portal.allocate(&manager, &erin).await;

        let changes = AllocationChanges {
            system: Some("RAVE".into()),
            end_date: Some(date(2024, 6, 30)),
            ..Default::default()
        };
        let updated = allocations
            .update_allocation(&manager, &allocation.id, changes)
            .await
            .unwrap();
        assert_eq!(updated.system.as_deref(), Some("RAVE"));
        assert_eq!(updated.end_date, date(2024, 6, 30));
        assert!(portal.mailer.last(EmailTemplate::AllocationUpdated).is_some());

        let closed = allocations.close_allocation(&manager, &allocation.id).await.unwrap();
        assert!(closed.is_closed());
        assert!(matches!(
            allocations.close_allocation(&manager, &allocation.id).await,
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            allocations
                .update_allocation(&manager, &allocation.id, AllocationChanges::default())
                .await,
            Err(DomainError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn engineers_only_see_their_own() {
        let portal = TestPortal::new().await;
        let manager = portal.seed("mia", Role::Manager).await;
        let erin = portal.seed("erin", Role::User).await;
        let sam = portal.seed("sam", Role::User).await;
        let allocations = &portal.services.allocations;

        let erins = portal.allocate(&manager, &erin).await;
        let sams = portal.allocate(&manager, &sam).await;

        let seen = allocations
            .list_allocations(&erin, AllocationFilter::default())
            .await
            .unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].id, erins.id);

        // asking for someone else's is overridden
        let filter = AllocationFilter {
            engineer_id: Some(sam.user_id.clone()),
            ..Default::default()
        };
        let seen = allocations.list_allocations(&erin, filter).await.unwrap();
        assert!(seen.iter().all(|a| a.engineer_id == erin.user_id));

        assert!(allocations.get_allocation(&erin, &erins.id).await.is_ok());
        assert!(matches!(
            allocations.get_allocation(&erin, &sams.id).await,
            Err(DomainError::Unauthorized(_))
        ));
        assert!(allocations.get_allocation(&manager, &sams.id).await.is_ok());

        let stats = allocations
            .allocation_stats(&manager, AllocationFilter::default())
            .await
            .unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.by_system["INFORM"], 2);
    }
}
