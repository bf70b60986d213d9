//! SeaORM implementation of ResetTokenRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};

use super::audit_repository::insert_entry;
use super::user_repository::mutate_user_in;
use crate::domain::audit::NewAuditEntry;
use crate::domain::user::{PasswordResetToken, ResetTokenRepository, User, UserMutation};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::password_reset_token;

pub struct SeaOrmResetTokenRepository {
    db: DatabaseConnection,
}

impl SeaOrmResetTokenRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn model_to_domain(m: password_reset_token::Model) -> PasswordResetToken {
    PasswordResetToken {
        id: m.id,
        user_id: m.user_id,
        token_hash: m.token_hash,
        expires_at: m.expires_at,
        used_at: m.used_at,
        created_at: m.created_at,
    }
}

#[async_trait]
impl ResetTokenRepository for SeaOrmResetTokenRepository {
    async fn insert(&self, token: PasswordResetToken, audit: NewAuditEntry) -> DomainResult<()> {
        let txn = self.db.begin().await?;

        password_reset_token::ActiveModel {
            id: Set(token.id),
            user_id: Set(token.user_id),
            token_hash: Set(token.token_hash),
            expires_at: Set(token.expires_at),
            used_at: Set(token.used_at),
            created_at: Set(token.created_at),
        }
        .insert(&txn)
        .await?;
        insert_entry(&txn, audit).await?;

        txn.commit().await?;
        Ok(())
    }

    async fn redeem(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
        mutation: UserMutation,
    ) -> DomainResult<User> {
        let txn = self.db.begin().await?;

        let model = password_reset_token::Entity::find()
            .filter(password_reset_token::Column::TokenHash.eq(token_hash))
            .one(&txn)
            .await?
            .ok_or(DomainError::InvalidCredentials)?;

        let token = model_to_domain(model.clone());
        if !token.is_redeemable(now) {
            return Err(DomainError::InvalidCredentials);
        }

        let mut active: password_reset_token::ActiveModel = model.into();
        active.used_at = Set(Some(now));
        active.update(&txn).await?;

        let user = mutate_user_in(&txn, &token.user_id, mutation).await?;

        txn.commit().await?;
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::domain::audit::{AuditAction, EntityRef};
    use crate::domain::user::UserRepository;
    use crate::domain::Role;
    use crate::infrastructure::database::repositories::user_repository::SeaOrmUserRepository;
    use crate::infrastructure::database::test_database;

    fn set_password(hash: &'static str) -> UserMutation {
        Box::new(move |u: &mut User| -> DomainResult<NewAuditEntry> {
            u.password_hash = hash.to_string();
            Ok(NewAuditEntry::new(&u.id, &u.username, AuditAction::PasswordReset, EntityRef::user(&u.id), "reset"))
        })
    }

    #[tokio::test]
    async fn token_is_single_use_and_expires() {
        let db = test_database().await;
        let users = SeaOrmUserRepository::new(db.clone());
        let tokens = SeaOrmResetTokenRepository::new(db);

        let u = User::pending("alice", "alice@example.com", "old", Role::User, Utc::now());
        let a = NewAuditEntry::new(&u.id, &u.username, AuditAction::Register, EntityRef::user(&u.id), "seed");
        let u = users.insert(u, a).await.unwrap();

        let now = Utc::now();
        let issue = |hash: &str| {
            let t = PasswordResetToken::issue(&u.id, hash, Duration::minutes(30), now);
            let a = NewAuditEntry::new(&u.id, &u.username, AuditAction::PasswordResetRequested, EntityRef::user(&u.id), "requested");
            (t, a)
        };

        let (t, a) = issue("h1");
        tokens.insert(t, a).await.unwrap();

        let updated = tokens.redeem("h1", now, set_password("new")).await.unwrap();
        assert_eq!(updated.password_hash, "new");

        assert_eq!(
            tokens.redeem("h1", now, set_password("again")).await,
            Err(DomainError::InvalidCredentials)
        );
        assert_eq!(
            tokens.redeem("unknown", now, set_password("again")).await,
            Err(DomainError::InvalidCredentials)
        );

        let (t, a) = issue("h2");
        tokens.insert(t, a).await.unwrap();
        assert_eq!(
            tokens.redeem("h2", now + Duration::minutes(31), set_password("late")).await,
            Err(DomainError::InvalidCredentials)
        );
        assert_eq!(users.find_by_id(&u.id).await.unwrap().unwrap().password_hash, "new");
    }
}
