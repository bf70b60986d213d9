//! Trial quality matrix: requirement and failure counts per UAT round.

pub mod model;
pub mod repository;

pub use model::{
    FailureReasons, QualityChanges, QualityDraft, QualityFilter, QualityRecord, QualityStats,
    RequirementType,
};
pub use repository::{QualityDeletion, QualityMutation, QualityRepository};
