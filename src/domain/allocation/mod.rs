//! Allocation aggregate: a test engineer assigned to a trial for a period.

pub mod model;
pub mod repository;

pub use model::{Allocation, AllocationChanges, AllocationFilter, AllocationStats, AllocationStatus};
pub use repository::{AllocationMutation, AllocationRepository};
