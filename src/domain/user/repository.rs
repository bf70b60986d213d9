use async_trait::async_trait;

use super::{User, UserFilter, UserStats};
use crate::domain::audit::NewAuditEntry;
use crate::domain::DomainResult;
use crate::shared::{PageRequest, PaginatedResult};

/// In-place change applied to a user inside a storage transaction. Returns
/// the audit entry that is committed together with the change.
pub type UserMutation = Box<dyn FnOnce(&mut User) -> DomainResult<NewAuditEntry> + Send>;

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user and its audit entry atomically.
    async fn insert(&self, user: User, audit: NewAuditEntry) -> DomainResult<User>;

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<User>>;
    async fn find_by_username(&self, username: &str) -> DomainResult<Option<User>>;
    async fn find_by_email(&self, email: &str) -> DomainResult<Option<User>>;

    async fn list(&self, filter: UserFilter, page: PageRequest)
        -> DomainResult<PaginatedResult<User>>;

    /// Pending registrations, oldest first.
    async fn list_pending(&self) -> DomainResult<Vec<User>>;

    /// Load, mutate and save a user in one transaction. Fails with
    /// `NotFound` when the id does not exist; nothing is written when the
    /// mutation returns an error.
    async fn update(&self, id: &str, mutation: UserMutation) -> DomainResult<User>;

    async fn count(&self) -> DomainResult<u64>;
    async fn stats(&self) -> DomainResult<UserStats>;
}
