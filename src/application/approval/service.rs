//! Approval workflow service
//!
//! Registration creates a pending user. Reviewers move it to approved or
//! rejected exactly once. Password resets go through single-use tokens
//! delivered by email.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, info};

use crate::application::ports::{params, EmailTemplate, Notifier};
use crate::config::SecurityConfig;
use crate::domain::audit::{AuditAction, EntityRef, NewAuditEntry};
use crate::domain::user::{ApprovalState, PasswordResetToken, User};
use crate::domain::{AccessPolicy, Action, DomainError, DomainResult, RepositoryProvider, Role, Session};
use crate::infrastructure::crypto::password::hash_password;
use crate::infrastructure::crypto::reset_token::{generate_reset_token, hash_reset_token};
use crate::shared::validations::{validate_email, validate_password, validate_username};

/// Self-service registration request
#[derive(Debug, Clone)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
}

pub struct ApprovalService {
    repos: Arc<dyn RepositoryProvider>,
    policy: Arc<AccessPolicy>,
    notifier: Notifier,
    security: SecurityConfig,
}

impl ApprovalService {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        policy: Arc<AccessPolicy>,
        notifier: Notifier,
        security: SecurityConfig,
    ) -> Self {
        Self {
            repos,
            policy,
            notifier,
            security,
        }
    }

    // ── Registration ────────────────────────────────────────────

    pub async fn register(&self, candidate: Registration) -> DomainResult<User> {
        let username = candidate.username.trim();
        let email = candidate.email.trim().to_lowercase();

        validate_username(username)?;
        validate_email(&email)?;
        validate_password(&candidate.password, self.security.min_password_length)?;

        let users = self.repos.users();
        if users.find_by_username(username).await?.is_some() {
            return Err(DomainError::Conflict("Username already exists".into()));
        }
        if users.find_by_email(&email).await?.is_some() {
            return Err(DomainError::Conflict("Email already exists".into()));
        }

        let password_hash = hash_password(&candidate.password, self.security.bcrypt_cost)?;

        let user = User::pending(username, email, password_hash, Role::User, Utc::now());
        let audit = NewAuditEntry::new(
            &user.id,
            &user.username,
            AuditAction::Register,
            EntityRef::user(&user.id),
            format!("Registration submitted by {}", user.username),
        );
        let user = users.insert(user, audit).await?;

        metrics::counter!("portal_registrations_total").increment(1);
        info!(user_id = %user.id, username = %user.username, "New user registered");

        self.notifier
            .notify_admin(
                EmailTemplate::RegistrationReceived,
                params([
                    ("username", user.username.clone()),
                    ("email", user.email.clone()),
                ]),
            )
            .await;

        Ok(user)
    }

    /// Pending registrations, oldest first.
    pub async fn list_pending(&self, session: &Session) -> DomainResult<Vec<User>> {
        self.policy.require(session, Action::ReviewRegistrations)?;
        self.repos.users().list_pending().await
    }

    /// Approve a pending registration, optionally granting a role other
    /// than the one requested. Only a superuser may grant superuser.
    pub async fn approve(&self, session: &Session, target_id: &str, role: Option<Role>) -> DomainResult<User> {
        if role == Some(Role::Superuser) && session.role != Role::Superuser {
            return Err(DomainError::Unauthorized(
                "Only a superuser may grant the superuser role".into(),
            ));
        }
        self.decide(session, target_id, ApprovalState::Approved, role).await
    }

    pub async fn reject(&self, session: &Session, target_id: &str) -> DomainResult<User> {
        self.decide(session, target_id, ApprovalState::Rejected, None).await
    }

    async fn decide(
        &self,
        session: &Session,
        target_id: &str,
        to: ApprovalState,
        role: Option<Role>,
    ) -> DomainResult<User> {
        self.policy.require(session, Action::ReviewRegistrations)?;

        let actor = session.clone();
        let user = self
            .repos
            .users()
            .update(
                target_id,
                Box::new(move |u: &mut User| -> DomainResult<NewAuditEntry> {
                    u.decide(to, &actor.user_id, Utc::now())?;
                    let action = match to {
                        ApprovalState::Approved => AuditAction::Approve,
                        _ => AuditAction::Reject,
                    };
                    let mut description = format!("Registration of {} {}", u.username, to);
                    if let Some(role) = role {
                        u.role = role;
                        description.push_str(&format!(" as {}", role));
                    }
                    Ok(NewAuditEntry::by(&actor, action, EntityRef::user(&u.id), description))
                }),
            )
            .await?;

        metrics::counter!("portal_registration_decisions_total", "decision" => to.as_str()).increment(1);
        info!(user_id = %user.id, decision = %to, by = %session.username, "Registration decided");

        let template = match to {
            ApprovalState::Approved => EmailTemplate::RegistrationApproved,
            _ => EmailTemplate::RegistrationRejected,
        };
        self.notifier
            .notify(&user.email, template, params([("username", user.username.clone())]))
            .await;

        Ok(user)
    }

    // ── Password reset ──────────────────────────────────────────

    /// Email a reset token to the account behind `identifier`.
    ///
    /// Succeeds without doing anything when the identifier is unknown or
    /// the account cannot sign in, so callers cannot discover accounts.
    pub async fn reset_password(&self, identifier: &str) -> DomainResult<()> {
        let identifier = identifier.trim();
        let users = self.repos.users();
        let user = match users.find_by_username(identifier).await? {
            Some(u) => Some(u),
            None => users.find_by_email(&identifier.to_lowercase()).await?,
        };

        let Some(user) = user.filter(User::is_approved) else {
            debug!("Password reset requested for unknown or inactive account");
            return Ok(());
        };

        let now = Utc::now();
        let generated = generate_reset_token();
        let token = PasswordResetToken::issue(
            &user.id,
            generated.token_hash,
            Duration::minutes(self.security.reset_token_ttl_minutes),
            now,
        );
        let expires_at = token.expires_at;

        let audit = NewAuditEntry::new(
            &user.id,
            &user.username,
            AuditAction::PasswordResetRequested,
            EntityRef::user(&user.id),
            "Password reset requested",
        );
        self.repos.reset_tokens().insert(token, audit).await?;

        info!(user_id = %user.id, "Password reset token issued");
        self.notifier
            .notify(
                &user.email,
                EmailTemplate::PasswordReset,
                params([
                    ("username", user.username.clone()),
                    ("token", generated.token),
                    ("expires_at", expires_at.to_rfc3339()),
                ]),
            )
            .await;

        Ok(())
    }

    /// Redeem a reset token and set a new password.
    pub async fn complete_password_reset(&self, token: &str, new_password: &str) -> DomainResult<()> {
        validate_password(new_password, self.security.min_password_length)?;

        let new_hash = hash_password(new_password, self.security.bcrypt_cost)?;

        let user = self
            .repos
            .reset_tokens()
            .redeem(
                &hash_reset_token(token),
                Utc::now(),
                Box::new(move |u: &mut User| -> DomainResult<NewAuditEntry> {
                    u.password_hash = new_hash;
                    u.updated_at = Utc::now();
                    Ok(NewAuditEntry::new(
                        &u.id,
                        &u.username,
                        AuditAction::PasswordReset,
                        EntityRef::user(&u.id),
                        "Password reset with emailed token",
                    ))
                }),
            )
            .await?;

        info!(user_id = %user.id, "Password reset completed");
        Ok(())
    }
}
