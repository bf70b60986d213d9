//! Audit trail aggregate: append-only entries and their query types.

pub mod model;
pub mod repository;

pub use model::{
    AuditAction, AuditCursor, AuditEntry, AuditFilter, AuditStats, EntityKind, EntityRef,
    NewAuditEntry,
};
pub use repository::AuditRepository;
