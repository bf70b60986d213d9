//! SeaORM implementation of RepositoryProvider

use sea_orm::DatabaseConnection;

use crate::domain::allocation::AllocationRepository;
use crate::domain::audit::AuditRepository;
use crate::domain::quality::QualityRepository;
use crate::domain::repositories::RepositoryProvider;
use crate::domain::uat::UatRepository;
use crate::domain::user::{ResetTokenRepository, UserRepository};

use super::allocation_repository::SeaOrmAllocationRepository;
use super::audit_repository::SeaOrmAuditRepository;
use super::quality_repository::SeaOrmQualityRepository;
use super::reset_token_repository::SeaOrmResetTokenRepository;
use super::uat_repository::SeaOrmUatRepository;
use super::user_repository::SeaOrmUserRepository;

/// Unified repository provider backed by SeaORM.
///
/// Holds one connection pool and exposes per-aggregate repository accessors.
pub struct SeaOrmRepositoryProvider {
    users: SeaOrmUserRepository,
    allocations: SeaOrmAllocationRepository,
    uat: SeaOrmUatRepository,
    quality: SeaOrmQualityRepository,
    audit: SeaOrmAuditRepository,
    reset_tokens: SeaOrmResetTokenRepository,
}

impl SeaOrmRepositoryProvider {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            users: SeaOrmUserRepository::new(db.clone()),
            allocations: SeaOrmAllocationRepository::new(db.clone()),
            uat: SeaOrmUatRepository::new(db.clone()),
            quality: SeaOrmQualityRepository::new(db.clone()),
            audit: SeaOrmAuditRepository::new(db.clone()),
            reset_tokens: SeaOrmResetTokenRepository::new(db),
        }
    }
}

impl RepositoryProvider for SeaOrmRepositoryProvider {
    fn users(&self) -> &dyn UserRepository {
        &self.users
    }

    fn allocations(&self) -> &dyn AllocationRepository {
        &self.allocations
    }

    fn uat(&self) -> &dyn UatRepository {
        &self.uat
    }

    fn quality(&self) -> &dyn QualityRepository {
        &self.quality
    }

    fn audit(&self) -> &dyn AuditRepository {
        &self.audit
    }

    fn reset_tokens(&self) -> &dyn ResetTokenRepository {
        &self.reset_tokens
    }
}
