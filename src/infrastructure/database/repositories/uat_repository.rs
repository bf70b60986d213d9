//! SeaORM implementation of UatRepository

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use tracing::debug;

use super::allocation_repository::allocation_model_to_domain;
use super::audit_repository::insert_entry;
use crate::domain::audit::NewAuditEntry;
use crate::domain::uat::{
    admit_round, UatCategory, UatFilter, UatMutation, UatRecord, UatRepository, UatResult,
};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::{allocation, uat_record};

pub struct SeaOrmUatRepository {
    db: DatabaseConnection,
}

impl SeaOrmUatRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn category_to_entity(c: UatCategory) -> uat_record::UatCategory {
    match c {
        UatCategory::Build => uat_record::UatCategory::Build,
        UatCategory::ChangeRequest => uat_record::UatCategory::ChangeRequest,
    }
}

fn category_to_domain(c: uat_record::UatCategory) -> UatCategory {
    match c {
        uat_record::UatCategory::Build => UatCategory::Build,
        uat_record::UatCategory::ChangeRequest => UatCategory::ChangeRequest,
    }
}

fn result_to_entity(r: UatResult) -> uat_record::UatResult {
    match r {
        UatResult::Pending => uat_record::UatResult::Pending,
        UatResult::Pass => uat_record::UatResult::Pass,
        UatResult::Fail => uat_record::UatResult::Fail,
    }
}

fn result_to_domain(r: uat_record::UatResult) -> UatResult {
    match r {
        uat_record::UatResult::Pending => UatResult::Pending,
        uat_record::UatResult::Pass => UatResult::Pass,
        uat_record::UatResult::Fail => UatResult::Fail,
    }
}

fn model_to_domain(m: uat_record::Model) -> UatRecord {
    UatRecord {
        id: m.id,
        allocation_id: m.allocation_id,
        round: m.round,
        category: category_to_domain(m.category),
        result: result_to_domain(m.result),
        notes: m.notes,
        recorded_by: m.recorded_by,
        recorded_at: m.recorded_at,
        finalized_at: m.finalized_at,
    }
}

fn to_active_model(r: &UatRecord) -> uat_record::ActiveModel {
    uat_record::ActiveModel {
        id: Set(r.id.clone()),
        allocation_id: Set(r.allocation_id.clone()),
        round: Set(r.round),
        category: Set(category_to_entity(r.category)),
        result: Set(result_to_entity(r.result)),
        notes: Set(r.notes.clone()),
        recorded_by: Set(r.recorded_by.clone()),
        recorded_at: Set(r.recorded_at),
        finalized_at: Set(r.finalized_at),
    }
}

async fn rounds_of<C: ConnectionTrait>(conn: &C, allocation_id: &str) -> DomainResult<Vec<UatRecord>> {
    let models = uat_record::Entity::find()
        .filter(uat_record::Column::AllocationId.eq(allocation_id))
        .order_by_asc(uat_record::Column::Round)
        .all(conn)
        .await?;
    Ok(models.into_iter().map(model_to_domain).collect())
}

// ── UatRepository impl ──────────────────────────────────────────

#[async_trait]
impl UatRepository for SeaOrmUatRepository {
    async fn append_round(&self, record: UatRecord, audit: NewAuditEntry) -> DomainResult<UatRecord> {
        debug!(allocation_id = %record.allocation_id, round = record.round, "Appending UAT round");
        let txn = self.db.begin().await?;

        let allocation = allocation::Entity::find_by_id(record.allocation_id.clone())
            .one(&txn)
            .await?
            .map(allocation_model_to_domain)
            .ok_or_else(|| DomainError::not_found("Allocation", "id", record.allocation_id.clone()))?;
        allocation.ensure_open()?;

        let history = rounds_of(&txn, &record.allocation_id).await?;
        admit_round(&history, record.round)?;

        let model = to_active_model(&record).insert(&txn).await?;
        insert_entry(&txn, audit).await?;

        txn.commit().await?;
        Ok(model_to_domain(model))
    }

    async fn find_round(&self, allocation_id: &str, round: i32) -> DomainResult<Option<UatRecord>> {
        let model = uat_record::Entity::find()
            .filter(uat_record::Column::AllocationId.eq(allocation_id))
            .filter(uat_record::Column::Round.eq(round))
            .one(&self.db)
            .await?;
        Ok(model.map(model_to_domain))
    }

    async fn history(&self, allocation_id: &str) -> DomainResult<Vec<UatRecord>> {
        rounds_of(&self.db, allocation_id).await
    }

    async fn update_round(
        &self,
        allocation_id: &str,
        round: i32,
        mutation: UatMutation,
    ) -> DomainResult<UatRecord> {
        let txn = self.db.begin().await?;

        let model = uat_record::Entity::find()
            .filter(uat_record::Column::AllocationId.eq(allocation_id))
            .filter(uat_record::Column::Round.eq(round))
            .one(&txn)
            .await?
            .ok_or_else(|| {
                DomainError::not_found("UatRecord", "round", format!("{}#{}", allocation_id, round))
            })?;

        let mut record = model_to_domain(model);
        let audit = mutation(&mut record)?;
        let saved = to_active_model(&record).update(&txn).await?;
        insert_entry(&txn, audit).await?;

        txn.commit().await?;
        Ok(model_to_domain(saved))
    }

    async fn list(&self, filter: &UatFilter) -> DomainResult<Vec<UatRecord>> {
        let mut query = uat_record::Entity::find();

        if let Some(ids) = &filter.allocation_ids {
            query = query.filter(uat_record::Column::AllocationId.is_in(ids.iter().cloned()));
        }
        if let Some(category) = filter.category {
            query = query.filter(uat_record::Column::Category.eq(category_to_entity(category)));
        }
        if let Some(result) = filter.result {
            query = query.filter(uat_record::Column::Result.eq(result_to_entity(result)));
        }

        let models = query
            .order_by_asc(uat_record::Column::AllocationId)
            .order_by_asc(uat_record::Column::Round)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(model_to_domain).collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};

    use super::*;
    use crate::domain::allocation::{Allocation, AllocationRepository};
    use crate::domain::audit::{AuditAction, AuditFilter, AuditRepository, EntityRef};
    use crate::domain::user::{ApprovalState, User, UserRepository};
    use crate::domain::Role;
    use crate::infrastructure::database::repositories::{
        allocation_repository::SeaOrmAllocationRepository, audit_repository::SeaOrmAuditRepository,
        user_repository::SeaOrmUserRepository,
    };
    use crate::infrastructure::database::test_database;

    fn note(action: AuditAction, id: &str) -> NewAuditEntry {
        NewAuditEntry::new("eng", "erin", action, EntityRef::uat_record(id), "uat")
    }

    async fn open_allocation(db: &DatabaseConnection) -> Allocation {
        let mut u = User::pending("erin", "erin@example.com", "hash", Role::User, Utc::now());
        u.decide(ApprovalState::Approved, "admin", Utc::now()).unwrap();
        let a = NewAuditEntry::new(&u.id, &u.username, AuditAction::Register, EntityRef::user(&u.id), "seed");
        let u = SeaOrmUserRepository::new(db.clone()).insert(u, a).await.unwrap();

        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let alloc = Allocation::new(&u.id, "NN-1", start, end, None, None, "mgr", Utc::now()).unwrap();
        let a = NewAuditEntry::new("mgr", "manager", AuditAction::CreateAllocation, EntityRef::allocation(&alloc.id), "seed");
        SeaOrmAllocationRepository::new(db.clone()).insert(alloc, a).await.unwrap()
    }

    fn round(allocation_id: &str, round: i32, result: UatResult) -> UatRecord {
        UatRecord::new(allocation_id, round, UatCategory::Build, result, None, "eng", Utc::now())
    }

    #[tokio::test]
    async fn rounds_are_admitted_in_order() {
        let db = test_database().await;
        let repo = SeaOrmUatRepository::new(db.clone());
        let alloc = open_allocation(&db).await;

        let r1 = round(&alloc.id, 1, UatResult::Pass);
        repo.append_round(r1.clone(), note(AuditAction::RecordUat, &r1.id)).await.unwrap();

        let again = round(&alloc.id, 1, UatResult::Fail);
        assert_eq!(
            repo.append_round(again.clone(), note(AuditAction::RecordUat, &again.id)).await,
            Err(DomainError::AlreadyFinalized { round: 1 })
        );

        let r3 = round(&alloc.id, 3, UatResult::Pending);
        repo.append_round(r3.clone(), note(AuditAction::RecordUat, &r3.id)).await.unwrap();

        let r2 = round(&alloc.id, 2, UatResult::Pass);
        assert_eq!(
            repo.append_round(r2.clone(), note(AuditAction::RecordUat, &r2.id)).await,
            Err(DomainError::OutOfOrderRound { round: 2, last: 3 })
        );

        let rounds: Vec<_> = repo.history(&alloc.id).await.unwrap().iter().map(|r| r.round).collect();
        assert_eq!(rounds, [1, 3]);

        // only the two admitted rounds were audited
        let filter = AuditFilter {
            action: Some(AuditAction::RecordUat),
            ..Default::default()
        };
        let audited = SeaOrmAuditRepository::new(db).stats(&filter).await.unwrap();
        assert_eq!(audited.total, 2);
    }

    #[tokio::test]
    async fn closed_or_missing_allocation_rejects_rounds() {
        let db = test_database().await;
        let repo = SeaOrmUatRepository::new(db.clone());
        let alloc = open_allocation(&db).await;

        SeaOrmAllocationRepository::new(db.clone())
            .update(
                &alloc.id,
                Box::new(|a: &mut Allocation| -> DomainResult<NewAuditEntry> {
                    a.close(Utc::now())?;
                    Ok(NewAuditEntry::new("mgr", "manager", AuditAction::CloseAllocation, EntityRef::allocation(&a.id), "closed"))
                }),
            )
            .await
            .unwrap();

        let r1 = round(&alloc.id, 1, UatResult::Pass);
        assert!(matches!(
            repo.append_round(r1.clone(), note(AuditAction::RecordUat, &r1.id)).await,
            Err(DomainError::Validation(_))
        ));

        let orphan = round("missing", 1, UatResult::Pass);
        assert!(matches!(
            repo.append_round(orphan.clone(), note(AuditAction::RecordUat, &orphan.id)).await,
            Err(DomainError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn pending_round_is_finalized_once() {
        let db = test_database().await;
        let repo = SeaOrmUatRepository::new(db.clone());
        let alloc = open_allocation(&db).await;

        let r1 = round(&alloc.id, 1, UatResult::Pending);
        repo.append_round(r1.clone(), note(AuditAction::RecordUat, &r1.id)).await.unwrap();

        let finalize = |result: UatResult| -> UatMutation {
            Box::new(move |r: &mut UatRecord| -> DomainResult<NewAuditEntry> {
                r.finalize(result, Utc::now())?;
                Ok(NewAuditEntry::new("eng", "erin", AuditAction::FinalizeUat, EntityRef::uat_record(&r.id), "final"))
            })
        };

        let done = repo.update_round(&alloc.id, 1, finalize(UatResult::Pass)).await.unwrap();
        assert_eq!(done.result, UatResult::Pass);
        assert_eq!(
            repo.update_round(&alloc.id, 1, finalize(UatResult::Fail)).await,
            Err(DomainError::AlreadyFinalized { round: 1 })
        );
        assert!(matches!(
            repo.update_round(&alloc.id, 9, finalize(UatResult::Fail)).await,
            Err(DomainError::NotFound { .. })
        ));

        let stored = repo.find_round(&alloc.id, 1).await.unwrap().unwrap();
        assert_eq!(stored.result, UatResult::Pass);

        let filter = UatFilter {
            allocation_ids: Some(vec![alloc.id.clone()]),
            result: Some(UatResult::Pass),
            ..Default::default()
        };
        assert_eq!(repo.list(&filter).await.unwrap().len(), 1);
    }
}
