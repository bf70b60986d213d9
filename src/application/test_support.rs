//! Shared fixtures for service tests: a migrated in-memory database, the
//! full service bundle and recording mailers.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};

use super::ports::{EmailParams, EmailTemplate, MailError, Mailer};
use super::{NewAllocation, PortalServices};
use crate::config::AppConfig;
use crate::domain::audit::{AuditAction, EntityRef, NewAuditEntry};
use crate::domain::quality::{FailureReasons, QualityDraft, RequirementType};
use crate::domain::user::{ApprovalState, User};
use crate::domain::{Allocation, RepositoryProvider, Role, Session};
use crate::infrastructure::crypto::password::hash_password;
use crate::infrastructure::database::test_database;
use crate::infrastructure::SeaOrmRepositoryProvider;

pub const PASSWORD: &str = "password123";

#[derive(Debug, Clone)]
pub struct SentEmail {
    pub recipient: String,
    pub template: EmailTemplate,
    pub params: EmailParams,
}

#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<SentEmail>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn last(&self, template: EmailTemplate) -> Option<SentEmail> {
        self.sent().into_iter().rev().find(|m| m.template == template)
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_email(
        &self,
        recipient: &str,
        template: EmailTemplate,
        params: &EmailParams,
    ) -> Result<(), MailError> {
        self.sent.lock().unwrap().push(SentEmail {
            recipient: recipient.to_string(),
            template,
            params: params.clone(),
        });
        Ok(())
    }
}

pub struct FailingMailer;

#[async_trait]
impl Mailer for FailingMailer {
    async fn send_email(&self, _: &str, _: EmailTemplate, _: &EmailParams) -> Result<(), MailError> {
        Err(MailError::Transport("connection refused".into()))
    }
}

pub fn test_config() -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.security.bcrypt_cost = 4;
    cfg.security.jwt_secret = "test-secret".into();
    cfg.email.enabled = true;
    cfg.email.admin_email = "qa-admin@example.com".into();
    cfg.email.notify_on_update = true;
    cfg.audit.page_size = 2;
    cfg
}

pub struct TestPortal {
    pub repos: Arc<dyn RepositoryProvider>,
    pub services: PortalServices,
    pub mailer: Arc<RecordingMailer>,
}

impl TestPortal {
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    pub async fn with_config(config: AppConfig) -> Self {
        let mailer = Arc::new(RecordingMailer::default());
        let (repos, services) = build(&config, mailer.clone()).await;
        Self {
            repos,
            services,
            mailer,
        }
    }

    /// Services wired to a mailer that always fails.
    pub async fn with_failing_mailer() -> (Arc<dyn RepositoryProvider>, PortalServices) {
        build(&test_config(), Arc::new(FailingMailer)).await
    }

    /// Insert an approved user directly and return their session.
    pub async fn seed(&self, username: &str, role: Role) -> Session {
        seed_user(&self.repos, username, role, ApprovalState::Approved).await
    }

    pub async fn seed_pending(&self, username: &str) -> Session {
        seed_user(&self.repos, username, Role::User, ApprovalState::Pending).await
    }

    pub async fn allocate(&self, manager: &Session, engineer: &Session) -> Allocation {
        self.services
            .allocations
            .create_allocation(manager, new_allocation(&engineer.user_id))
            .await
            .unwrap()
    }
}

async fn build(config: &AppConfig, mailer: Arc<dyn Mailer>) -> (Arc<dyn RepositoryProvider>, PortalServices) {
    let repos: Arc<dyn RepositoryProvider> = Arc::new(SeaOrmRepositoryProvider::new(test_database().await));
    let services = PortalServices::new(repos.clone(), config, mailer);
    (repos, services)
}

pub async fn seed_user(
    repos: &Arc<dyn RepositoryProvider>,
    username: &str,
    role: Role,
    state: ApprovalState,
) -> Session {
    let hash = hash_password(PASSWORD, 4).unwrap();
    let mut user = User::pending(username, format!("{}@example.com", username), hash, role, Utc::now());
    user.approval_state = state;
    let audit = NewAuditEntry::new(&user.id, &user.username, AuditAction::CreateUser, EntityRef::user(&user.id), "seeded");
    let user = repos.users().insert(user, audit).await.unwrap();
    Session::new(user.id, user.username, user.role)
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn new_allocation(engineer_id: &str) -> NewAllocation {
    NewAllocation {
        engineer_id: engineer_id.to_string(),
        trial_id: "NN-1234".into(),
        start_date: date(2024, 1, 1),
        end_date: date(2024, 3, 31),
        system: Some("INFORM".into()),
        allocation_role: Some("TE1".into()),
    }
}

pub fn quality_draft(trial_id: &str, round: i32) -> QualityDraft {
    QualityDraft {
        trial_id: trial_id.to_string(),
        phase: "Phase 2".into(),
        no_of_uat_plans: 2,
        no_of_rounds: 3,
        requirement_type: RequirementType::Forms,
        round,
        total_requirements: 40,
        total_failures: 4,
        reasons: FailureReasons {
            spec_issue: 1,
            programming_issue: 2,
            ..Default::default()
        },
        documentation_issues: None,
        timeline_adherence: Some("on time".into()),
        system_deployment_delays: None,
    }
}
