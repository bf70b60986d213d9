use async_trait::async_trait;

use super::{QualityFilter, QualityRecord};
use crate::domain::audit::NewAuditEntry;
use crate::domain::DomainResult;

/// In-place change applied inside a storage transaction; returns the audit
/// entry committed with it.
pub type QualityMutation =
    Box<dyn FnOnce(&mut QualityRecord) -> DomainResult<NewAuditEntry> + Send>;

/// Check run against the stored record before it is removed.
pub type QualityDeletion = Box<dyn FnOnce(&QualityRecord) -> DomainResult<NewAuditEntry> + Send>;

#[async_trait]
pub trait QualityRepository: Send + Sync {
    async fn insert(&self, record: QualityRecord, audit: NewAuditEntry) -> DomainResult<QualityRecord>;

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<QualityRecord>>;

    /// Matching records ordered by trial, round, then creation time.
    async fn list(&self, filter: &QualityFilter) -> DomainResult<Vec<QualityRecord>>;

    async fn update(&self, id: &str, mutation: QualityMutation) -> DomainResult<QualityRecord>;

    /// Remove the record and return it as it was.
    async fn delete(&self, id: &str, deletion: QualityDeletion) -> DomainResult<QualityRecord>;
}
