//! SeaORM implementation of AuditRepository

use std::collections::BTreeMap;

use async_trait::async_trait;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    NotSet, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Set,
};

use crate::domain::audit::{
    AuditCursor, AuditEntry, AuditFilter, AuditRepository, AuditStats, EntityRef, NewAuditEntry,
};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::audit_entry;

pub struct SeaOrmAuditRepository {
    db: DatabaseConnection,
}

impl SeaOrmAuditRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn model_to_domain(m: audit_entry::Model) -> DomainResult<AuditEntry> {
    let corrupt = |what: &str| {
        DomainError::StorageUnavailable(format!("audit entry {} has an unknown {}", m.id, what))
    };
    let action = m.action.parse().map_err(|_| corrupt("action"))?;
    let kind = m.target_kind.parse().map_err(|_| corrupt("target kind"))?;

    Ok(AuditEntry {
        id: m.id,
        actor_id: m.actor_id,
        actor_username: m.actor_username,
        action,
        target: EntityRef { kind, id: m.target_id },
        description: m.description,
        timestamp: m.timestamp,
    })
}

fn apply_filter(
    mut query: Select<audit_entry::Entity>,
    filter: &AuditFilter,
) -> Select<audit_entry::Entity> {
    if let Some(actor) = &filter.actor_id {
        query = query.filter(audit_entry::Column::ActorId.eq(actor.as_str()));
    }
    if let Some(action) = filter.action {
        query = query.filter(audit_entry::Column::Action.eq(action.as_str()));
    }
    if let Some(kind) = filter.target_kind {
        query = query.filter(audit_entry::Column::TargetKind.eq(kind.as_str()));
    }
    if let Some(target) = &filter.target_id {
        query = query.filter(audit_entry::Column::TargetId.eq(target.as_str()));
    }
    if let Some(from) = filter.from {
        query = query.filter(audit_entry::Column::Timestamp.gte(from));
    }
    if let Some(to) = filter.to {
        query = query.filter(audit_entry::Column::Timestamp.lte(to));
    }
    query
}

/// Insert an entry on any connection, including an open transaction.
pub(crate) async fn insert_entry<C: ConnectionTrait>(
    conn: &C,
    entry: NewAuditEntry,
) -> DomainResult<AuditEntry> {
    let model = audit_entry::ActiveModel {
        id: NotSet,
        actor_id: Set(entry.actor_id),
        actor_username: Set(entry.actor_username),
        action: Set(entry.action.as_str().to_string()),
        target_kind: Set(entry.target.kind.as_str().to_string()),
        target_id: Set(entry.target.id),
        description: Set(entry.description),
        timestamp: Set(entry.timestamp),
    }
    .insert(conn)
    .await?;

    model_to_domain(model)
}

// ── AuditRepository impl ────────────────────────────────────────

#[async_trait]
impl AuditRepository for SeaOrmAuditRepository {
    async fn append(&self, entry: NewAuditEntry) -> DomainResult<AuditEntry> {
        insert_entry(&self.db, entry).await
    }

    async fn find_by_id(&self, id: i64) -> DomainResult<Option<AuditEntry>> {
        audit_entry::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(model_to_domain)
            .transpose()
    }

    async fn page_after(
        &self,
        filter: &AuditFilter,
        after: Option<AuditCursor>,
        limit: u64,
    ) -> DomainResult<Vec<AuditEntry>> {
        let mut query = apply_filter(audit_entry::Entity::find(), filter);

        if let Some(cursor) = after {
            query = query.filter(
                Condition::any()
                    .add(audit_entry::Column::Timestamp.gt(cursor.timestamp))
                    .add(
                        Condition::all()
                            .add(audit_entry::Column::Timestamp.eq(cursor.timestamp))
                            .add(audit_entry::Column::Id.gt(cursor.id)),
                    ),
            );
        }

        query
            .order_by_asc(audit_entry::Column::Timestamp)
            .order_by_asc(audit_entry::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await?
            .into_iter()
            .map(model_to_domain)
            .collect()
    }

    async fn stats(&self, filter: &AuditFilter) -> DomainResult<AuditStats> {
        let base = apply_filter(audit_entry::Entity::find(), filter);
        let total = base.clone().count(&self.db).await?;

        let by_action: Vec<(String, i64)> = base
            .clone()
            .select_only()
            .column(audit_entry::Column::Action)
            .column_as(Expr::col(audit_entry::Column::Id).count(), "count")
            .group_by(audit_entry::Column::Action)
            .into_tuple()
            .all(&self.db)
            .await?;

        let by_actor: Vec<(String, i64)> = base
            .select_only()
            .column(audit_entry::Column::ActorUsername)
            .column_as(Expr::col(audit_entry::Column::Id).count(), "count")
            .group_by(audit_entry::Column::ActorUsername)
            .into_tuple()
            .all(&self.db)
            .await?;

        let mut stats = AuditStats {
            total,
            by_action: BTreeMap::new(),
            by_actor: by_actor
                .into_iter()
                .map(|(actor, n)| (actor, n as u64))
                .collect(),
        };
        for (action, n) in by_action {
            if let Ok(action) = action.parse() {
                stats.by_action.insert(action, n as u64);
            }
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::domain::audit::{AuditAction, EntityKind};
    use crate::infrastructure::database::test_database;

    fn entry(actor: &str, action: AuditAction, target: &str) -> NewAuditEntry {
        NewAuditEntry::new(
            format!("{}-id", actor),
            actor,
            action,
            EntityRef::user(target),
            format!("{} on {}", action, target),
        )
    }

    #[tokio::test]
    async fn stored_entry_reads_back_unchanged() {
        let repo = SeaOrmAuditRepository::new(test_database().await);
        let new = entry("admin", AuditAction::Approve, "u1");
        let stored = repo.append(new.clone()).await.unwrap();

        let loaded = repo.find_by_id(stored.id).await.unwrap().unwrap();
        assert_eq!(loaded, stored);
        assert_eq!(loaded.actor_username, new.actor_username);
        assert_eq!(loaded.action, new.action);
        assert_eq!(loaded.target, new.target);
        assert_eq!(loaded.description, new.description);
        assert_eq!(loaded.timestamp, new.timestamp);
    }

    #[tokio::test]
    async fn pages_follow_timestamp_then_id() {
        let repo = SeaOrmAuditRepository::new(test_database().await);
        let base = Utc::now();

        // inserted out of chronological order, two sharing a timestamp
        for (offset, target) in [(2, "c"), (0, "a"), (1, "b1"), (1, "b2")] {
            let mut e = entry("admin", AuditAction::Approve, target);
            e.timestamp = base + Duration::seconds(offset);
            repo.append(e).await.unwrap();
        }

        let filter = AuditFilter::default();
        let first = repo.page_after(&filter, None, 2).await.unwrap();
        let targets: Vec<_> = first.iter().map(|e| e.target.id.as_str()).collect();
        assert_eq!(targets, ["a", "b1"]);

        let second = repo
            .page_after(&filter, first.last().map(|e| e.cursor()), 2)
            .await
            .unwrap();
        let targets: Vec<_> = second.iter().map(|e| e.target.id.as_str()).collect();
        assert_eq!(targets, ["b2", "c"]);

        let rest = repo
            .page_after(&filter, second.last().map(|e| e.cursor()), 2)
            .await
            .unwrap();
        assert!(rest.is_empty());
    }

    #[tokio::test]
    async fn filters_and_stats() {
        let repo = SeaOrmAuditRepository::new(test_database().await);
        repo.append(entry("admin", AuditAction::Approve, "u1")).await.unwrap();
        repo.append(entry("admin", AuditAction::Reject, "u2")).await.unwrap();
        repo.append(entry("alice", AuditAction::Login, "alice-id")).await.unwrap();

        let filter = AuditFilter {
            action: Some(AuditAction::Reject),
            ..Default::default()
        };
        let rows = repo.page_after(&filter, None, 10).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].target.id, "u2");

        let filter = AuditFilter {
            target_kind: Some(EntityKind::User),
            target_id: Some("u1".into()),
            ..Default::default()
        };
        assert_eq!(repo.page_after(&filter, None, 10).await.unwrap().len(), 1);

        let stats = repo.stats(&AuditFilter::default()).await.unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.by_actor["admin"], 2);
        assert_eq!(stats.by_action[&AuditAction::Login], 1);
    }
}
