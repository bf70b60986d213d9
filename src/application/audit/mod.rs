//! Audit trail: recording and read-only querying.

pub mod reports;
pub mod service;
pub mod stream;

pub use reports::{ComplianceReport, UserActivityReport};
pub use service::AuditService;
pub use stream::AuditStream;
