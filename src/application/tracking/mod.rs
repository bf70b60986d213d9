//! Allocation, UAT and trial quality tracking.

pub mod allocation_service;
pub mod quality_service;
pub mod uat_service;

pub use allocation_service::{AllocationService, NewAllocation};
pub use quality_service::QualityService;
pub use uat_service::UatService;
