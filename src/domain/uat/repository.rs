use async_trait::async_trait;

use super::{UatFilter, UatRecord};
use crate::domain::audit::NewAuditEntry;
use crate::domain::DomainResult;

pub type UatMutation = Box<dyn FnOnce(&mut UatRecord) -> DomainResult<NewAuditEntry> + Send>;

#[async_trait]
pub trait UatRepository: Send + Sync {
    /// Admit and insert a new round in one transaction.
    ///
    /// The allocation must exist and be open, and the round must pass
    /// [`admit_round`](super::admit_round) against the rounds already stored.
    async fn append_round(&self, record: UatRecord, audit: NewAuditEntry) -> DomainResult<UatRecord>;

    async fn find_round(&self, allocation_id: &str, round: i32) -> DomainResult<Option<UatRecord>>;

    /// Rounds of one allocation, ascending.
    async fn history(&self, allocation_id: &str) -> DomainResult<Vec<UatRecord>>;

    async fn update_round(
        &self,
        allocation_id: &str,
        round: i32,
        mutation: UatMutation,
    ) -> DomainResult<UatRecord>;

    async fn list(&self, filter: &UatFilter) -> DomainResult<Vec<UatRecord>>;
}
