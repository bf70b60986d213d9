use async_trait::async_trait;

use super::{Allocation, AllocationFilter};
use crate::domain::audit::NewAuditEntry;
use crate::domain::DomainResult;

/// In-place change applied inside a storage transaction; returns the audit
/// entry committed with it.
pub type AllocationMutation =
    Box<dyn FnOnce(&mut Allocation) -> DomainResult<NewAuditEntry> + Send>;

#[async_trait]
pub trait AllocationRepository: Send + Sync {
    async fn insert(&self, allocation: Allocation, audit: NewAuditEntry) -> DomainResult<Allocation>;

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Allocation>>;

    /// Matching allocations ordered by start date, then creation time.
    async fn list(&self, filter: &AllocationFilter) -> DomainResult<Vec<Allocation>>;

    async fn update(&self, id: &str, mutation: AllocationMutation) -> DomainResult<Allocation>;
}
