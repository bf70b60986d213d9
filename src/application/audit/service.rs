use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use super::reports::{ComplianceReport, UserActivityReport};
use super::AuditStream;
use crate::domain::audit::{AuditAction, AuditEntry, AuditFilter, AuditStats, EntityRef, NewAuditEntry};
use crate::domain::{AccessPolicy, Action, DomainError, DomainResult, RepositoryProvider, Session};

/// Longest window a user activity report may cover
pub const MAX_ACTIVITY_DAYS: u32 = 365;

/// Append and query the audit trail. Entries are never changed or removed.
pub struct AuditService {
    repos: Arc<dyn RepositoryProvider>,
    policy: Arc<AccessPolicy>,
    page_size: u64,
}

impl AuditService {
    pub fn new(repos: Arc<dyn RepositoryProvider>, policy: Arc<AccessPolicy>, page_size: u64) -> Self {
        Self {
            repos,
            policy,
            page_size,
        }
    }

    /// Append a standalone entry. Mutating services write theirs inside
    /// their own transaction instead.
    pub async fn record(
        &self,
        actor: &Session,
        action: AuditAction,
        target: EntityRef,
        description: impl Into<String>,
    ) -> DomainResult<AuditEntry> {
        let entry = self
            .repos
            .audit()
            .append(NewAuditEntry::by(actor, action, target, description))
            .await?;
        debug!(audit_id = entry.id, action = %entry.action, "Audit entry recorded");
        Ok(entry)
    }

    pub async fn query(&self, session: &Session, filter: AuditFilter) -> DomainResult<AuditStream> {
        self.policy.require(session, Action::ViewAudit)?;
        Ok(AuditStream::new(self.repos.clone(), filter, self.page_size))
    }

    pub async fn statistics(&self, session: &Session, filter: &AuditFilter) -> DomainResult<AuditStats> {
        self.policy.require(session, Action::ViewAudit)?;
        self.repos.audit().stats(filter).await
    }

    /// Summarize every entry in `[from, to]`.
    pub async fn compliance_report(
        &self,
        session: &Session,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DomainResult<ComplianceReport> {
        if from > to {
            return Err(DomainError::Validation("Report start must not be after its end".into()));
        }
        let filter = AuditFilter {
            from: Some(from),
            to: Some(to),
            ..Default::default()
        };
        let mut stream = self.query(session, filter).await?;

        let mut report = ComplianceReport::new(from, to);
        while let Some(entry) = stream.next().await? {
            report.add(&entry);
        }
        debug!(entries = report.total_entries, by = %session.username, "Compliance report built");
        Ok(report)
    }

    /// What `user_id` did over the last `days` days.
    pub async fn user_activity(
        &self,
        session: &Session,
        user_id: &str,
        days: u32,
    ) -> DomainResult<UserActivityReport> {
        if !(1..=MAX_ACTIVITY_DAYS).contains(&days) {
            return Err(DomainError::Validation(format!(
                "days must be between 1 and {}",
                MAX_ACTIVITY_DAYS
            )));
        }
        let filter = AuditFilter {
            actor_id: Some(user_id.to_string()),
            from: Some(Utc::now() - Duration::days(i64::from(days))),
            ..Default::default()
        };
        let entries = self.query(session, filter).await?.collect_remaining().await?;
        Ok(UserActivityReport::from_entries(user_id, days, entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::{TestPortal, PASSWORD};
    use crate::domain::audit::EntityKind;
    use crate::domain::{DomainError, Role};

    #[tokio::test]
    async fn reading_the_trail_needs_view_audit() {
        let portal = TestPortal::new().await;
        let manager = portal.seed("mia", Role::Manager).await;
        let audit = &portal.services.audit;

        assert!(matches!(
            audit.query(&manager, AuditFilter::default()).await,
            Err(DomainError::Unauthorized(_))
        ));
        assert!(matches!(
            audit.statistics(&manager, &AuditFilter::default()).await,
            Err(DomainError::Unauthorized(_))
        ));
        assert!(matches!(
            audit.user_activity(&manager, &manager.user_id, 30).await,
            Err(DomainError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn record_appends_standalone_entry() {
        let portal = TestPortal::new().await;
        let admin = portal.seed("admin", Role::Admin).await;
        let audit = &portal.services.audit;

        let entry = audit
            .record(&admin, AuditAction::Login, EntityRef::user(&admin.user_id), "manual")
            .await
            .unwrap();
        assert_eq!(entry.actor_username, "admin");

        let filter = AuditFilter {
            action: Some(AuditAction::Login),
            ..Default::default()
        };
        let mut stream = audit.query(&admin, filter).await.unwrap();
        let all = stream.collect_remaining().await.unwrap();
        assert_eq!(all, vec![entry]);
    }

    #[tokio::test]
    async fn every_mutation_leaves_a_trace() {
        let portal = TestPortal::new().await;
        let admin = portal.seed("admin", Role::Admin).await;
        let manager = portal.seed("mia", Role::Manager).await;
        let erin = portal.seed("erin", Role::User).await;
        let allocation = portal.allocate(&manager, &erin).await;
        portal
            .services
            .allocations
            .close_allocation(&manager, &allocation.id)
            .await
            .unwrap();

        let filter = AuditFilter {
            target_kind: Some(EntityKind::Allocation),
            target_id: Some(allocation.id.clone()),
            ..Default::default()
        };
        let stats = portal.services.audit.statistics(&admin, &filter).await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.by_action[&AuditAction::CreateAllocation], 1);
        assert_eq!(stats.by_action[&AuditAction::CloseAllocation], 1);

        let mut stream = portal.services.audit.query(&admin, filter).await.unwrap();
        let actions: Vec<_> = stream
            .collect_remaining()
            .await
            .unwrap()
            .into_iter()
            .map(|e| (e.action, e.actor_id))
            .collect();
        assert_eq!(
            actions,
            vec![
                (AuditAction::CreateAllocation, manager.user_id.clone()),
                (AuditAction::CloseAllocation, manager.user_id.clone()),
            ]
        );
    }

    #[tokio::test]
    async fn compliance_report_walks_the_whole_window() {
        let portal = TestPortal::new().await;
        let admin = portal.seed("admin", Role::Admin).await;
        let erin = portal.seed("erin", Role::User).await;
        portal.services.identity.login("erin", PASSWORD).await.unwrap();
        let _ = portal.services.identity.login("erin", "wrong-password").await;

        let audit = &portal.services.audit;
        let now = Utc::now();
        // more entries than one page
        let report = audit
            .compliance_report(&admin, now - Duration::hours(1), now + Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(report.total_entries, 4);
        assert_eq!(report.by_action[&AuditAction::CreateUser], 2);
        assert_eq!(report.security_events, 2);
        assert!(report.by_actor.contains_key("erin"));
        assert_eq!(report.active_users, 2);

        assert!(matches!(
            audit.compliance_report(&admin, now, now - Duration::days(1)).await,
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            audit.compliance_report(&erin, now - Duration::days(1), now).await,
            Err(DomainError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn user_activity_covers_only_that_user() {
        let portal = TestPortal::new().await;
        let admin = portal.seed("admin", Role::Admin).await;
        let erin = portal.seed("erin", Role::User).await;
        portal.services.identity.login("erin", PASSWORD).await.unwrap();
        portal.services.identity.login("admin", PASSWORD).await.unwrap();

        let audit = &portal.services.audit;
        let report = audit.user_activity(&admin, &erin.user_id, 7).await.unwrap();
        assert_eq!(report.total_activities, 2);
        assert_eq!(report.by_action[&AuditAction::Login], 1);
        assert_eq!(report.recent[0].action, AuditAction::Login);
        assert!(report.recent.iter().all(|e| e.actor_id == erin.user_id));

        assert!(matches!(
            audit.user_activity(&admin, &erin.user_id, 0).await,
            Err(DomainError::Validation(_))
        ));
    }
}
