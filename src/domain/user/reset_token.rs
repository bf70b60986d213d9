use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use super::{User, UserMutation};
use crate::domain::audit::NewAuditEntry;
use crate::domain::DomainResult;

/// Stored form of a password reset token. Only the hash of the raw token
/// is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordResetToken {
    pub id: String,
    pub user_id: String,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl PasswordResetToken {
    pub fn issue(user_id: impl Into<String>, token_hash: impl Into<String>, ttl: Duration, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            token_hash: token_hash.into(),
            expires_at: now + ttl,
            used_at: None,
            created_at: now,
        }
    }

    pub fn is_redeemable(&self, now: DateTime<Utc>) -> bool {
        self.used_at.is_none() && now < self.expires_at
    }
}

#[async_trait]
pub trait ResetTokenRepository: Send + Sync {
    async fn insert(&self, token: PasswordResetToken, audit: NewAuditEntry) -> DomainResult<()>;

    /// Consume the token with `token_hash` and apply `mutation` to its user,
    /// all in one transaction. Fails with `InvalidCredentials` when the
    /// token is unknown, used or expired.
    async fn redeem(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
        mutation: UserMutation,
    ) -> DomainResult<User>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_expires_and_is_single_use() {
        let now = Utc::now();
        let mut token = PasswordResetToken::issue("u1", "abc", Duration::minutes(30), now);
        assert!(token.is_redeemable(now));
        assert!(!token.is_redeemable(now + Duration::minutes(31)));

        token.used_at = Some(now);
        assert!(!token.is_redeemable(now));
    }
}
