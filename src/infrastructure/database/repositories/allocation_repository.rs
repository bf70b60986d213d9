//! SeaORM implementation of AllocationRepository

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use tracing::debug;

use super::audit_repository::insert_entry;
use super::user_repository::user_model_to_domain;
use crate::domain::allocation::{
    Allocation, AllocationFilter, AllocationMutation, AllocationRepository, AllocationStatus,
};
use crate::domain::audit::NewAuditEntry;
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::{allocation, user};

pub struct SeaOrmAllocationRepository {
    db: DatabaseConnection,
}

impl SeaOrmAllocationRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn status_to_entity(status: AllocationStatus) -> allocation::AllocationStatus {
    match status {
        AllocationStatus::Active => allocation::AllocationStatus::Active,
        AllocationStatus::Closed => allocation::AllocationStatus::Closed,
    }
}

fn status_to_domain(status: allocation::AllocationStatus) -> AllocationStatus {
    match status {
        allocation::AllocationStatus::Active => AllocationStatus::Active,
        allocation::AllocationStatus::Closed => AllocationStatus::Closed,
    }
}

pub(crate) fn allocation_model_to_domain(m: allocation::Model) -> Allocation {
    Allocation {
        id: m.id,
        engineer_id: m.engineer_id,
        trial_id: m.trial_id,
        system: m.system,
        allocation_role: m.allocation_role,
        start_date: m.start_date,
        end_date: m.end_date,
        status: status_to_domain(m.status),
        created_by: m.created_by,
        created_at: m.created_at,
        updated_at: m.updated_at,
        closed_at: m.closed_at,
    }
}

fn to_active_model(a: &Allocation) -> allocation::ActiveModel {
    allocation::ActiveModel {
        id: Set(a.id.clone()),
        engineer_id: Set(a.engineer_id.clone()),
        trial_id: Set(a.trial_id.clone()),
        system: Set(a.system.clone()),
        allocation_role: Set(a.allocation_role.clone()),
        start_date: Set(a.start_date),
        end_date: Set(a.end_date),
        status: Set(status_to_entity(a.status)),
        created_by: Set(a.created_by.clone()),
        created_at: Set(a.created_at),
        updated_at: Set(a.updated_at),
        closed_at: Set(a.closed_at),
    }
}

/// Fails with `EngineerNotApproved` unless `engineer_id` names an
/// approved, active user.
async fn ensure_engineer_approved<C: ConnectionTrait>(conn: &C, engineer_id: &str) -> DomainResult<()> {
    let engineer = user::Entity::find_by_id(engineer_id.to_string())
        .one(conn)
        .await?
        .map(user_model_to_domain);

    match engineer {
        Some(u) if u.is_approved() => Ok(()),
        _ => Err(DomainError::EngineerNotApproved(engineer_id.to_string())),
    }
}

// ── AllocationRepository impl ───────────────────────────────────

#[async_trait]
impl AllocationRepository for SeaOrmAllocationRepository {
    async fn insert(&self, a: Allocation, audit: NewAuditEntry) -> DomainResult<Allocation> {
        debug!(allocation_id = %a.id, engineer_id = %a.engineer_id, "Inserting allocation");
        let txn = self.db.begin().await?;

        ensure_engineer_approved(&txn, &a.engineer_id).await?;
        let model = to_active_model(&a).insert(&txn).await?;
        insert_entry(&txn, audit).await?;

        txn.commit().await?;
        Ok(allocation_model_to_domain(model))
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Allocation>> {
        let model = allocation::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await?;
        Ok(model.map(allocation_model_to_domain))
    }

    async fn list(&self, filter: &AllocationFilter) -> DomainResult<Vec<Allocation>> {
        let mut query = allocation::Entity::find();

        if let Some(engineer) = &filter.engineer_id {
            query = query.filter(allocation::Column::EngineerId.eq(engineer.as_str()));
        }
        if let Some(trial) = &filter.trial_id {
            query = query.filter(allocation::Column::TrialId.eq(trial.as_str()));
        }
        if let Some(status) = filter.status {
            query = query.filter(allocation::Column::Status.eq(status_to_entity(status)));
        }
        // period overlap
        if let Some(from) = filter.from {
            query = query.filter(allocation::Column::EndDate.gte(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(allocation::Column::StartDate.lte(to));
        }

        let models = query
            .order_by_asc(allocation::Column::StartDate)
            .order_by_asc(allocation::Column::CreatedAt)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(allocation_model_to_domain).collect())
    }

    async fn update(&self, id: &str, mutation: AllocationMutation) -> DomainResult<Allocation> {
        let txn = self.db.begin().await?;

        let model = allocation::Entity::find_by_id(id.to_string())
            .one(&txn)
            .await?
            .ok_or_else(|| DomainError::not_found("Allocation", "id", id))?;

        let mut a = allocation_model_to_domain(model);
        let audit = mutation(&mut a)?;
        let saved = to_active_model(&a).update(&txn).await?;
        insert_entry(&txn, audit).await?;

        txn.commit().await?;
        Ok(allocation_model_to_domain(saved))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};

    use super::*;
    use crate::domain::audit::{AuditAction, EntityRef};
    use crate::domain::user::{ApprovalState, User, UserRepository};
    use crate::domain::Role;
    use crate::infrastructure::database::repositories::user_repository::SeaOrmUserRepository;
    use crate::infrastructure::database::test_database;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    fn audit(target: &str) -> NewAuditEntry {
        NewAuditEntry::new("mgr", "manager", AuditAction::CreateAllocation, EntityRef::allocation(target), "created")
    }

    async fn engineer(db: &DatabaseConnection, name: &str, approved: bool) -> User {
        let mut u = User::pending(name, format!("{}@example.com", name), "hash", Role::User, Utc::now());
        if approved {
            u.decide(ApprovalState::Approved, "admin", Utc::now()).unwrap();
        }
        let a = NewAuditEntry::new(&u.id, &u.username, AuditAction::Register, EntityRef::user(&u.id), "seed");
        SeaOrmUserRepository::new(db.clone()).insert(u, a).await.unwrap()
    }

    fn allocation(engineer_id: &str, trial: &str, start: NaiveDate, end: NaiveDate) -> Allocation {
        Allocation::new(engineer_id, trial, start, end, Some("INFORM".into()), None, "mgr", Utc::now()).unwrap()
    }

    #[tokio::test]
    async fn insert_requires_approved_engineer() {
        let db = test_database().await;
        let repo = SeaOrmAllocationRepository::new(db.clone());
        let pending = engineer(&db, "pat", false).await;
        let a = allocation(&pending.id, "NN-1", date(1, 1), date(2, 1));
        let err = repo.insert(a, audit("x")).await.unwrap_err();
        assert_eq!(err, DomainError::EngineerNotApproved(pending.id.clone()));

        let a = allocation("ghost", "NN-1", date(1, 1), date(2, 1));
        assert!(matches!(
            repo.insert(a, audit("x")).await,
            Err(DomainError::EngineerNotApproved(_))
        ));
    }

    #[tokio::test]
    async fn list_filters_by_overlap_and_orders_by_start() {
        let db = test_database().await;
        let repo = SeaOrmAllocationRepository::new(db.clone());
        let eng = engineer(&db, "erin", true).await;

        for (trial, start, end) in [
            ("NN-2", date(3, 1), date(3, 31)),
            ("NN-1", date(1, 1), date(1, 31)),
            ("NN-3", date(5, 1), date(6, 30)),
        ] {
            let a = allocation(&eng.id, trial, start, end);
            let id = a.id.clone();
            repo.insert(a, audit(&id)).await.unwrap();
        }

        let all = repo.list(&AllocationFilter::default()).await.unwrap();
        let trials: Vec<_> = all.iter().map(|a| a.trial_id.as_str()).collect();
        assert_eq!(trials, ["NN-1", "NN-2", "NN-3"]);

        let filter = AllocationFilter {
            from: Some(date(1, 31)),
            to: Some(date(3, 1)),
            ..Default::default()
        };
        let hit = repo.list(&filter).await.unwrap();
        let trials: Vec<_> = hit.iter().map(|a| a.trial_id.as_str()).collect();
        assert_eq!(trials, ["NN-1", "NN-2"]);

        let filter = AllocationFilter {
            trial_id: Some("NN-3".into()),
            ..Default::default()
        };
        assert_eq!(repo.list(&filter).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_applies_mutation() {
        let db = test_database().await;
        let repo = SeaOrmAllocationRepository::new(db.clone());
        let eng = engineer(&db, "erin", true).await;
        let a = allocation(&eng.id, "NN-1", date(1, 1), date(1, 31));
        let id = a.id.clone();
        repo.insert(a, audit(&id)).await.unwrap();

        let closed = repo
            .update(
                &id,
                Box::new(|a: &mut Allocation| -> DomainResult<NewAuditEntry> {
                    a.close(Utc::now())?;
                    Ok(NewAuditEntry::new("mgr", "manager", AuditAction::CloseAllocation, EntityRef::allocation(&a.id), "closed"))
                }),
            )
            .await
            .unwrap();
        assert!(closed.is_closed());
        assert!(repo.find_by_id(&id).await.unwrap().unwrap().is_closed());
    }
}
