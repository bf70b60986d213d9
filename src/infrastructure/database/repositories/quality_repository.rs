//! SeaORM implementation of QualityRepository

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use tracing::debug;

use super::audit_repository::insert_entry;
use crate::domain::audit::NewAuditEntry;
use crate::domain::quality::{
    FailureReasons, QualityDeletion, QualityFilter, QualityMutation, QualityRecord,
    QualityRepository, RequirementType,
};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::quality_record;

pub struct SeaOrmQualityRepository {
    db: DatabaseConnection,
}

impl SeaOrmQualityRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn type_to_entity(t: RequirementType) -> quality_record::RequirementType {
    match t {
        RequirementType::Forms => quality_record::RequirementType::Forms,
        RequirementType::Editchecks => quality_record::RequirementType::Editchecks,
    }
}

fn type_to_domain(t: quality_record::RequirementType) -> RequirementType {
    match t {
        quality_record::RequirementType::Forms => RequirementType::Forms,
        quality_record::RequirementType::Editchecks => RequirementType::Editchecks,
    }
}

fn model_to_domain(m: quality_record::Model) -> QualityRecord {
    QualityRecord {
        id: m.id,
        trial_id: m.trial_id,
        phase: m.phase,
        no_of_uat_plans: m.no_of_uat_plans,
        no_of_rounds: m.no_of_rounds,
        requirement_type: type_to_domain(m.requirement_type),
        round: m.round,
        total_requirements: m.total_requirements,
        total_failures: m.total_failures,
        reasons: FailureReasons {
            spec_issue: m.spec_issue,
            mock_crf_issue: m.mock_crf_issue,
            programming_issue: m.programming_issue,
            scripting_issue: m.scripting_issue,
        },
        documentation_issues: m.documentation_issues,
        timeline_adherence: m.timeline_adherence,
        system_deployment_delays: m.system_deployment_delays,
        created_by: m.created_by,
        created_at: m.created_at,
        updated_at: m.updated_at,
    }
}

fn to_active_model(r: &QualityRecord) -> quality_record::ActiveModel {
    quality_record::ActiveModel {
        id: Set(r.id.clone()),
        trial_id: Set(r.trial_id.clone()),
        phase: Set(r.phase.clone()),
        no_of_uat_plans: Set(r.no_of_uat_plans),
        no_of_rounds: Set(r.no_of_rounds),
        requirement_type: Set(type_to_entity(r.requirement_type)),
        round: Set(r.round),
        total_requirements: Set(r.total_requirements),
        total_failures: Set(r.total_failures),
        spec_issue: Set(r.reasons.spec_issue),
        mock_crf_issue: Set(r.reasons.mock_crf_issue),
        programming_issue: Set(r.reasons.programming_issue),
        scripting_issue: Set(r.reasons.scripting_issue),
        documentation_issues: Set(r.documentation_issues.clone()),
        timeline_adherence: Set(r.timeline_adherence.clone()),
        system_deployment_delays: Set(r.system_deployment_delays.clone()),
        created_by: Set(r.created_by.clone()),
        created_at: Set(r.created_at),
        updated_at: Set(r.updated_at),
    }
}

// ── QualityRepository impl ──────────────────────────────────────

#[async_trait]
impl QualityRepository for SeaOrmQualityRepository {
    async fn insert(&self, r: QualityRecord, audit: NewAuditEntry) -> DomainResult<QualityRecord> {
        debug!(record_id = %r.id, trial_id = %r.trial_id, round = r.round, "Inserting quality record");
        let txn = self.db.begin().await?;

        let model = to_active_model(&r).insert(&txn).await?;
        insert_entry(&txn, audit).await?;

        txn.commit().await?;
        Ok(model_to_domain(model))
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<QualityRecord>> {
        let model = quality_record::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await?;
        Ok(model.map(model_to_domain))
    }

    async fn list(&self, filter: &QualityFilter) -> DomainResult<Vec<QualityRecord>> {
        let mut query = quality_record::Entity::find();

        if let Some(trial) = &filter.trial_id {
            query = query.filter(quality_record::Column::TrialId.eq(trial.as_str()));
        }
        if let Some(phase) = &filter.phase {
            query = query.filter(quality_record::Column::Phase.eq(phase.as_str()));
        }
        if let Some(t) = filter.requirement_type {
            query = query.filter(quality_record::Column::RequirementType.eq(type_to_entity(t)));
        }
        if let Some(creator) = &filter.created_by {
            query = query.filter(quality_record::Column::CreatedBy.eq(creator.as_str()));
        }
        if let Some(round) = filter.round {
            query = query.filter(quality_record::Column::Round.eq(round));
        }

        let models = query
            .order_by_asc(quality_record::Column::TrialId)
            .order_by_asc(quality_record::Column::Round)
            .order_by_asc(quality_record::Column::CreatedAt)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(model_to_domain).collect())
    }

    async fn update(&self, id: &str, mutation: QualityMutation) -> DomainResult<QualityRecord> {
        let txn = self.db.begin().await?;

        let model = quality_record::Entity::find_by_id(id.to_string())
            .one(&txn)
            .await?
            .ok_or_else(|| DomainError::not_found("QualityRecord", "id", id))?;

        let mut r = model_to_domain(model);
        let audit = mutation(&mut r)?;
        let saved = to_active_model(&r).update(&txn).await?;
        insert_entry(&txn, audit).await?;

        txn.commit().await?;
        Ok(model_to_domain(saved))
    }

    async fn delete(&self, id: &str, deletion: QualityDeletion) -> DomainResult<QualityRecord> {
        let txn = self.db.begin().await?;

        let model = quality_record::Entity::find_by_id(id.to_string())
            .one(&txn)
            .await?
            .ok_or_else(|| DomainError::not_found("QualityRecord", "id", id))?;

        let record = model_to_domain(model.clone());
        let audit = deletion(&record)?;
        model.delete(&txn).await?;
        insert_entry(&txn, audit).await?;

        txn.commit().await?;
        debug!(record_id = %record.id, "Quality record deleted");
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use sea_orm::PaginatorTrait;

    use super::*;
    use crate::domain::audit::{AuditAction, AuditFilter, AuditRepository, EntityRef};
    use crate::domain::quality::QualityDraft;
    use crate::domain::user::{User, UserRepository};
    use crate::domain::Role;
    use crate::infrastructure::database::entities::audit_entry;
    use crate::infrastructure::database::repositories::audit_repository::SeaOrmAuditRepository;
    use crate::infrastructure::database::repositories::user_repository::SeaOrmUserRepository;
    use crate::infrastructure::database::test_database;

    async fn creator(db: &DatabaseConnection) -> User {
        let u = User::pending("erin", "erin@example.com", "hash", Role::User, Utc::now());
        let a = NewAuditEntry::new(&u.id, &u.username, AuditAction::Register, EntityRef::user(&u.id), "seed");
        SeaOrmUserRepository::new(db.clone()).insert(u, a).await.unwrap()
    }

    fn record(created_by: &str, trial: &str, round: i32) -> QualityRecord {
        let draft = QualityDraft {
            trial_id: trial.into(),
            phase: "Phase 3".into(),
            no_of_uat_plans: 1,
            no_of_rounds: 3,
            requirement_type: RequirementType::Editchecks,
            round,
            total_requirements: 40,
            total_failures: 4,
            reasons: FailureReasons {
                programming_issue: 3,
                ..Default::default()
            },
            documentation_issues: None,
            timeline_adherence: None,
            system_deployment_delays: Some("UAT env late".into()),
        };
        QualityRecord::new(draft, created_by, Utc::now()).unwrap()
    }

    fn audit(action: AuditAction, id: &str) -> NewAuditEntry {
        NewAuditEntry::new("u", "erin", action, EntityRef::quality_record(id), "quality")
    }

    #[tokio::test]
    async fn insert_round_trips_every_column() {
        let db = test_database().await;
        let repo = SeaOrmQualityRepository::new(db.clone());
        let user = creator(&db).await;

        let r = record(&user.id, "NN-1", 1);
        let id = r.id.clone();
        let stored = repo.insert(r.clone(), audit(AuditAction::CreateQualityRecord, &id)).await.unwrap();
        assert_eq!(stored.reasons, r.reasons);
        assert_eq!(stored.requirement_type, RequirementType::Editchecks);
        assert_eq!(
            repo.find_by_id(&id).await.unwrap().unwrap().system_deployment_delays.as_deref(),
            Some("UAT env late")
        );
    }

    #[tokio::test]
    async fn list_filters_and_orders_by_trial_then_round() {
        let db = test_database().await;
        let repo = SeaOrmQualityRepository::new(db.clone());
        let user = creator(&db).await;

        for (trial, round) in [("NN-2", 1), ("NN-1", 2), ("NN-1", 1)] {
            let r = record(&user.id, trial, round);
            let id = r.id.clone();
            repo.insert(r, audit(AuditAction::CreateQualityRecord, &id)).await.unwrap();
        }

        let all = repo.list(&QualityFilter::default()).await.unwrap();
        let order: Vec<_> = all.iter().map(|r| (r.trial_id.as_str(), r.round)).collect();
        assert_eq!(order, [("NN-1", 1), ("NN-1", 2), ("NN-2", 1)]);

        let filter = QualityFilter {
            round: Some(1),
            ..Default::default()
        };
        assert_eq!(repo.list(&filter).await.unwrap().len(), 2);

        let filter = QualityFilter {
            requirement_type: Some(RequirementType::Forms),
            ..Default::default()
        };
        assert!(repo.list(&filter).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_mutation_writes_nothing() {
        let db = test_database().await;
        let repo = SeaOrmQualityRepository::new(db.clone());
        let user = creator(&db).await;
        let r = record(&user.id, "NN-1", 1);
        let id = r.id.clone();
        repo.insert(r, audit(AuditAction::CreateQualityRecord, &id)).await.unwrap();
        let entries_before = audit_entry::Entity::find().count(&db).await.unwrap();

        let err = repo
            .update(
                &id,
                Box::new(|_: &mut QualityRecord| -> DomainResult<NewAuditEntry> {
                    Err(DomainError::Validation("nope".into()))
                }),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(audit_entry::Entity::find().count(&db).await.unwrap(), entries_before);
    }

    #[tokio::test]
    async fn delete_removes_record_and_audits() {
        let db = test_database().await;
        let repo = SeaOrmQualityRepository::new(db.clone());
        let user = creator(&db).await;
        let r = record(&user.id, "NN-1", 1);
        let id = r.id.clone();
        repo.insert(r, audit(AuditAction::CreateQualityRecord, &id)).await.unwrap();

        let deleted = repo
            .delete(
                &id,
                Box::new(|r: &QualityRecord| -> DomainResult<NewAuditEntry> {
                    Ok(audit(AuditAction::DeleteQualityRecord, &r.id))
                }),
            )
            .await
            .unwrap();
        assert_eq!(deleted.trial_id, "NN-1");
        assert!(repo.find_by_id(&id).await.unwrap().is_none());

        let filter = AuditFilter {
            action: Some(AuditAction::DeleteQualityRecord),
            ..Default::default()
        };
        let stats = SeaOrmAuditRepository::new(db.clone()).stats(&filter).await.unwrap();
        assert_eq!(stats.total, 1);

        let missing = repo
            .delete(
                &id,
                Box::new(|r: &QualityRecord| -> DomainResult<NewAuditEntry> {
                    Ok(audit(AuditAction::DeleteQualityRecord, &r.id))
                }),
            )
            .await;
        assert!(matches!(missing, Err(DomainError::NotFound { .. })));
    }
}
