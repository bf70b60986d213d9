//! SeaORM implementation of UserRepository

use std::collections::BTreeMap;

use async_trait::async_trait;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::debug;

use super::audit_repository::insert_entry;
use crate::domain::audit::NewAuditEntry;
use crate::domain::user::{ApprovalState, User, UserFilter, UserMutation, UserRepository, UserStats};
use crate::domain::{DomainError, DomainResult, Role};
use crate::infrastructure::database::entities::user;
use crate::shared::{PageRequest, PaginatedResult};

pub struct SeaOrmUserRepository {
    db: DatabaseConnection,
}

impl SeaOrmUserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn entity_role_to_domain(role: user::UserRole) -> Role {
    match role {
        user::UserRole::Superuser => Role::Superuser,
        user::UserRole::Manager => Role::Manager,
        user::UserRole::Admin => Role::Admin,
        user::UserRole::User => Role::User,
    }
}

fn domain_role_to_entity(role: Role) -> user::UserRole {
    match role {
        Role::Superuser => user::UserRole::Superuser,
        Role::Manager => user::UserRole::Manager,
        Role::Admin => user::UserRole::Admin,
        Role::User => user::UserRole::User,
    }
}

fn entity_state_to_domain(state: user::ApprovalStatus) -> ApprovalState {
    match state {
        user::ApprovalStatus::Pending => ApprovalState::Pending,
        user::ApprovalStatus::Approved => ApprovalState::Approved,
        user::ApprovalStatus::Rejected => ApprovalState::Rejected,
    }
}

fn domain_state_to_entity(state: ApprovalState) -> user::ApprovalStatus {
    match state {
        ApprovalState::Pending => user::ApprovalStatus::Pending,
        ApprovalState::Approved => user::ApprovalStatus::Approved,
        ApprovalState::Rejected => user::ApprovalStatus::Rejected,
    }
}

pub(crate) fn user_model_to_domain(model: user::Model) -> User {
    User {
        id: model.id,
        username: model.username,
        email: model.email,
        password_hash: model.password_hash,
        role: entity_role_to_domain(model.role),
        approval_state: entity_state_to_domain(model.approval_state),
        is_active: model.is_active,
        reviewed_by: model.reviewed_by,
        reviewed_at: model.reviewed_at,
        created_at: model.created_at,
        updated_at: model.updated_at,
        last_login_at: model.last_login_at,
    }
}

pub(crate) fn user_to_active_model(u: &User) -> user::ActiveModel {
    user::ActiveModel {
        id: Set(u.id.clone()),
        username: Set(u.username.clone()),
        email: Set(u.email.clone()),
        password_hash: Set(u.password_hash.clone()),
        role: Set(domain_role_to_entity(u.role)),
        approval_state: Set(domain_state_to_entity(u.approval_state)),
        is_active: Set(u.is_active),
        reviewed_by: Set(u.reviewed_by.clone()),
        reviewed_at: Set(u.reviewed_at),
        created_at: Set(u.created_at),
        updated_at: Set(u.updated_at),
        last_login_at: Set(u.last_login_at),
    }
}

/// Load a user inside `txn`, apply `mutation`, save it and write the audit
/// entry the mutation produced. Does not commit.
pub(crate) async fn mutate_user_in<C: sea_orm::ConnectionTrait>(
    conn: &C,
    id: &str,
    mutation: UserMutation,
) -> DomainResult<User> {
    let model = user::Entity::find_by_id(id.to_string())
        .one(conn)
        .await?
        .ok_or_else(|| DomainError::not_found("User", "id", id))?;

    let mut user = user_model_to_domain(model);
    let audit = mutation(&mut user)?;
    let saved = user_to_active_model(&user).update(conn).await?;
    insert_entry(conn, audit).await?;
    Ok(user_model_to_domain(saved))
}

// ── UserRepository impl ─────────────────────────────────────────

#[async_trait]
impl UserRepository for SeaOrmUserRepository {
    async fn insert(&self, u: User, audit: NewAuditEntry) -> DomainResult<User> {
        debug!(user_id = %u.id, username = %u.username, "Inserting user");
        let txn = self.db.begin().await?;

        let model = user_to_active_model(&u).insert(&txn).await.map_err(|e| {
            match DomainError::from(e) {
                DomainError::Conflict(_) => {
                    DomainError::Conflict("Username or email already exists".to_string())
                }
                other => other,
            }
        })?;
        insert_entry(&txn, audit).await?;

        txn.commit().await?;
        Ok(user_model_to_domain(model))
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<User>> {
        let model = user::Entity::find_by_id(id.to_string()).one(&self.db).await?;
        Ok(model.map(user_model_to_domain))
    }

    async fn find_by_username(&self, username: &str) -> DomainResult<Option<User>> {
        let model = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await?;
        Ok(model.map(user_model_to_domain))
    }

    async fn find_by_email(&self, email: &str) -> DomainResult<Option<User>> {
        let model = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await?;
        Ok(model.map(user_model_to_domain))
    }

    async fn list(&self, filter: UserFilter, page: PageRequest) -> DomainResult<PaginatedResult<User>> {
        let mut query = user::Entity::find();

        if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
            query = query.filter(
                user::Column::Username
                    .contains(search)
                    .or(user::Column::Email.contains(search)),
            );
        }
        if let Some(role) = filter.role {
            query = query.filter(user::Column::Role.eq(domain_role_to_entity(role)));
        }
        if let Some(state) = filter.approval_state {
            query = query.filter(user::Column::ApprovalState.eq(domain_state_to_entity(state)));
        }
        if let Some(active) = filter.is_active {
            query = query.filter(user::Column::IsActive.eq(active));
        }

        let total = query.clone().count(&self.db).await?;

        let items = query
            .order_by_desc(user::Column::CreatedAt)
            .offset(page.offset())
            .limit(page.limit)
            .all(&self.db)
            .await?
            .into_iter()
            .map(user_model_to_domain)
            .collect();

        Ok(PaginatedResult::new(items, total, page))
    }

    async fn list_pending(&self) -> DomainResult<Vec<User>> {
        let models = user::Entity::find()
            .filter(user::Column::ApprovalState.eq(user::ApprovalStatus::Pending))
            .order_by_asc(user::Column::CreatedAt)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(user_model_to_domain).collect())
    }

    async fn update(&self, id: &str, mutation: UserMutation) -> DomainResult<User> {
        let txn = self.db.begin().await?;
        let user = mutate_user_in(&txn, id, mutation).await?;
        txn.commit().await?;
        Ok(user)
    }

    async fn count(&self) -> DomainResult<u64> {
        Ok(user::Entity::find().count(&self.db).await?)
    }

    async fn stats(&self) -> DomainResult<UserStats> {
        let total = user::Entity::find().count(&self.db).await?;

        let by_role: Vec<(user::UserRole, i64)> = user::Entity::find()
            .select_only()
            .column(user::Column::Role)
            .column_as(Expr::col(user::Column::Id).count(), "count")
            .group_by(user::Column::Role)
            .into_tuple()
            .all(&self.db)
            .await?;

        let by_state: Vec<(user::ApprovalStatus, i64)> = user::Entity::find()
            .select_only()
            .column(user::Column::ApprovalState)
            .column_as(Expr::col(user::Column::Id).count(), "count")
            .group_by(user::Column::ApprovalState)
            .into_tuple()
            .all(&self.db)
            .await?;

        let inactive = user::Entity::find()
            .filter(user::Column::IsActive.eq(false))
            .count(&self.db)
            .await?;

        Ok(UserStats {
            total,
            by_role: by_role
                .into_iter()
                .map(|(r, n)| (entity_role_to_domain(r), n as u64))
                .collect::<BTreeMap<_, _>>(),
            by_approval_state: by_state
                .into_iter()
                .map(|(s, n)| (entity_state_to_domain(s), n as u64))
                .collect(),
            inactive,
        })
    }
}
