//! Repository access for the domain layer
//!
//! `RepositoryProvider` hands out the per-aggregate repositories. Services
//! hold an `Arc<dyn RepositoryProvider>` and ask only for what they need:
//!
//! ```ignore
//! let user = repos.users().find_by_id(&id).await?;
//! let rounds = repos.uat().history(&allocation_id).await?;
//! ```

use super::allocation::AllocationRepository;
use super::audit::AuditRepository;
use super::quality::QualityRepository;
use super::uat::UatRepository;
use super::user::{ResetTokenRepository, UserRepository};
use crate::shared::errors::DomainError;

/// Result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

pub trait RepositoryProvider: Send + Sync {
    fn users(&self) -> &dyn UserRepository;
    fn allocations(&self) -> &dyn AllocationRepository;
    fn uat(&self) -> &dyn UatRepository;
    fn quality(&self) -> &dyn QualityRepository;
    fn audit(&self) -> &dyn AuditRepository;
    fn reset_tokens(&self) -> &dyn ResetTokenRepository;
}
