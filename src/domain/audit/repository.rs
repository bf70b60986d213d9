use async_trait::async_trait;

use super::{AuditCursor, AuditEntry, AuditFilter, AuditStats, NewAuditEntry};
use crate::domain::DomainResult;

/// Append-only audit storage.
#[async_trait]
pub trait AuditRepository: Send + Sync {
    async fn append(&self, entry: NewAuditEntry) -> DomainResult<AuditEntry>;

    async fn find_by_id(&self, id: i64) -> DomainResult<Option<AuditEntry>>;

    /// Up to `limit` entries matching `filter`, ordered by (timestamp, id),
    /// strictly after `after` when given.
    async fn page_after(
        &self,
        filter: &AuditFilter,
        after: Option<AuditCursor>,
        limit: u64,
    ) -> DomainResult<Vec<AuditEntry>>;

    async fn stats(&self, filter: &AuditFilter) -> DomainResult<AuditStats>;
}
