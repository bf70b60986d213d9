//! Domain layer
//!
//! Entities, state machines, repository traits and the access policy.
//! Nothing in here knows about SeaORM or axum.

pub mod access;
pub mod allocation;
pub mod audit;
pub mod quality;
pub mod repositories;
pub mod uat;
pub mod user;

pub use access::{AccessPolicy, AccessTable, Action, Role, Session};
pub use allocation::{Allocation, AllocationFilter, AllocationRepository, AllocationStatus};
pub use audit::{AuditAction, AuditEntry, AuditFilter, AuditRepository, EntityKind, NewAuditEntry};
pub use quality::{QualityRecord, QualityRepository, RequirementType};
pub use repositories::{DomainResult, RepositoryProvider};
pub use uat::{UatCategory, UatRecord, UatRepository, UatResult};
pub use user::{ApprovalState, User, UserRepository};

pub use crate::shared::errors::DomainError;
