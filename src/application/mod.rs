//! Application layer
//!
//! Use-case services over the domain repositories. Every call takes an
//! explicit [`Session`](crate::domain::Session) except registration, login
//! and password reset.

pub mod approval;
pub mod audit;
pub mod identity;
pub mod ports;
pub mod tracking;

#[cfg(test)]
pub(crate) mod test_support;

use std::sync::Arc;

pub use approval::{ApprovalService, Registration};
pub use audit::{AuditService, AuditStream, ComplianceReport, UserActivityReport};
pub use identity::{AuthResult, IdentityService};
pub use ports::{EmailTemplate, Mailer, Notifier};
pub use tracking::{AllocationService, NewAllocation, QualityService, UatService};

use crate::config::AppConfig;
use crate::domain::{AccessPolicy, RepositoryProvider};

/// All application services, wired from one repository provider.
#[derive(Clone)]
pub struct PortalServices {
    pub identity: Arc<IdentityService>,
    pub approval: Arc<ApprovalService>,
    pub allocations: Arc<AllocationService>,
    pub uat: Arc<UatService>,
    pub quality: Arc<QualityService>,
    pub audit: Arc<AuditService>,
}

impl PortalServices {
    pub fn new(repos: Arc<dyn RepositoryProvider>, config: &AppConfig, mailer: Arc<dyn Mailer>) -> Self {
        let policy = Arc::new(AccessPolicy::from_table(&config.access));
        let notifier = Notifier::new(mailer, config.email.clone());

        Self {
            identity: Arc::new(IdentityService::new(
                repos.clone(),
                policy.clone(),
                config.security.clone(),
            )),
            approval: Arc::new(ApprovalService::new(
                repos.clone(),
                policy.clone(),
                notifier.clone(),
                config.security.clone(),
            )),
            allocations: Arc::new(AllocationService::new(
                repos.clone(),
                policy.clone(),
                notifier.clone(),
            )),
            uat: Arc::new(UatService::new(repos.clone(), policy.clone(), notifier)),
            quality: Arc::new(QualityService::new(repos.clone(), policy.clone())),
            audit: Arc::new(AuditService::new(repos, policy, config.audit.page_size)),
        }
    }
}
