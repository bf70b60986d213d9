//! Database entities module

pub mod allocation;
pub mod audit_entry;
pub mod password_reset_token;
pub mod quality_record;
pub mod uat_record;
pub mod user;

pub use allocation::Entity as Allocation;
pub use audit_entry::Entity as AuditEntry;
pub use password_reset_token::Entity as PasswordResetToken;
pub use quality_record::Entity as QualityRecord;
pub use uat_record::Entity as UatRecord;
pub use user::Entity as User;
