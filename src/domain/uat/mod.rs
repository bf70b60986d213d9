//! UAT (User Acceptance Testing) rounds recorded against an allocation.

pub mod model;
pub mod repository;

pub use model::{admit_round, UatCategory, UatFilter, UatRecord, UatResult, UatStats};
pub use repository::{UatMutation, UatRepository};
