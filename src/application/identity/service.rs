//! Identity service: authentication, sessions, role checks and user
//! management.
//!
//! HTTP handlers stay thin and delegate here.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::config::{AdminConfig, SecurityConfig};
use crate::domain::audit::{AuditAction, EntityRef, NewAuditEntry};
use crate::domain::user::{ApprovalState, User, UserFilter, UserStats};
use crate::domain::{
    AccessPolicy, Action, DomainError, DomainResult, RepositoryProvider, Role, Session,
};
use crate::infrastructure::crypto::jwt::{create_token, verify_token, JwtConfig};
use crate::infrastructure::crypto::password::{hash_password, verify_password};
use crate::shared::validations::validate_password;
use crate::shared::{PageRequest, PaginatedResult};

/// Returned after a successful login
#[derive(Debug, Clone)]
pub struct AuthResult {
    pub token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: User,
}

pub struct IdentityService {
    repos: Arc<dyn RepositoryProvider>,
    policy: Arc<AccessPolicy>,
    jwt: JwtConfig,
    security: SecurityConfig,
}

impl IdentityService {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        policy: Arc<AccessPolicy>,
        security: SecurityConfig,
    ) -> Self {
        Self {
            repos,
            policy,
            jwt: JwtConfig::from_security(&security),
            security,
        }
    }

    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    // ── Authentication ──────────────────────────────────────────

    async fn find_by_identifier(&self, identifier: &str) -> DomainResult<Option<User>> {
        let users = self.repos.users();
        match users.find_by_username(identifier).await? {
            Some(user) => Ok(Some(user)),
            None => users.find_by_email(&identifier.to_lowercase()).await,
        }
    }

    /// Verify credentials. Only approved, active users get through.
    ///
    /// The password is checked before the approval state, so a caller
    /// without the password learns nothing about the account.
    pub async fn authenticate(&self, identifier: &str, credential: &str) -> DomainResult<User> {
        let Some(user) = self.find_by_identifier(identifier.trim()).await? else {
            metrics::counter!("portal_logins_total", "outcome" => "unknown_user").increment(1);
            return Err(DomainError::InvalidCredentials);
        };

        let valid = verify_password(credential, &user.password_hash).unwrap_or(false);
        if !valid {
            warn!(user_id = %user.id, username = %user.username, "Failed login attempt");
            metrics::counter!("portal_logins_total", "outcome" => "bad_password").increment(1);
            self.repos
                .audit()
                .append(NewAuditEntry::new(
                    &user.id,
                    &user.username,
                    AuditAction::LoginFailed,
                    EntityRef::user(&user.id),
                    "Invalid password",
                ))
                .await?;
            return Err(DomainError::InvalidCredentials);
        }

        if !user.is_approved() {
            metrics::counter!("portal_logins_total", "outcome" => "not_approved").increment(1);
            return Err(DomainError::NotApproved);
        }

        let user = self
            .repos
            .users()
            .update(
                &user.id,
                Box::new(|u: &mut User| -> DomainResult<NewAuditEntry> {
                    u.last_login_at = Some(Utc::now());
                    Ok(NewAuditEntry::new(
                        &u.id,
                        &u.username,
                        AuditAction::Login,
                        EntityRef::user(&u.id),
                        "User logged in",
                    ))
                }),
            )
            .await?;

        metrics::counter!("portal_logins_total", "outcome" => "success").increment(1);
        info!(user_id = %user.id, username = %user.username, "User authenticated");
        Ok(user)
    }

    /// Authenticate and issue a session token.
    pub async fn login(&self, identifier: &str, credential: &str) -> DomainResult<AuthResult> {
        let user = self.authenticate(identifier, credential).await?;

        let token = create_token(&user.id, &user.username, user.role.as_str(), &self.jwt)
            .map_err(|e| DomainError::Internal(format!("Failed to create token: {}", e)))?;

        Ok(AuthResult {
            token,
            token_type: "Bearer".into(),
            expires_in: self.jwt.expires_in_seconds(),
            user,
        })
    }

    /// Resolve a bearer token to a session.
    ///
    /// The account is re-read so that deactivation and role changes take
    /// effect before the token expires.
    pub async fn session_from_token(&self, token: &str) -> DomainResult<Session> {
        let claims = verify_token(token, &self.jwt)
            .map_err(|e| DomainError::Unauthorized(format!("Invalid token: {}", e)))?;

        let user = self
            .repos
            .users()
            .find_by_id(&claims.sub)
            .await?
            .filter(User::is_approved)
            .ok_or_else(|| DomainError::Unauthorized("Account is not active".into()))?;

        Ok(Session::new(user.id, user.username, user.role))
    }

    pub fn authorize(&self, user_role: Role, required_role: Role) -> bool {
        self.policy.authorize(user_role, required_role)
    }

    pub fn permits(&self, role: Role, action: Action) -> bool {
        self.policy.permits(role, action)
    }

    // ── Queries ─────────────────────────────────────────────────

    pub async fn current_user(&self, session: &Session) -> DomainResult<User> {
        self.load(&session.user_id).await
    }

    pub async fn get_user(&self, session: &Session, id: &str) -> DomainResult<User> {
        if !session.is(id) {
            self.policy.require(session, Action::ManageUsers)?;
        }
        self.load(id).await
    }

    pub async fn list_users(
        &self,
        session: &Session,
        filter: UserFilter,
        page: PageRequest,
    ) -> DomainResult<PaginatedResult<User>> {
        self.policy.require(session, Action::ManageUsers)?;
        self.repos.users().list(filter, page).await
    }

    pub async fn user_stats(&self, session: &Session) -> DomainResult<UserStats> {
        self.policy.require(session, Action::ManageUsers)?;
        self.repos.users().stats().await
    }

    // ── Commands ────────────────────────────────────────────────

    /// Change the caller's own password. Verifies the current one first.
    pub async fn change_password(
        &self,
        session: &Session,
        current_password: &str,
        new_password: &str,
    ) -> DomainResult<()> {
        validate_password(new_password, self.security.min_password_length)?;

        let user = self.load(&session.user_id).await?;
        if !verify_password(current_password, &user.password_hash).unwrap_or(false) {
            return Err(DomainError::InvalidCredentials);
        }

        let new_hash = self.hash(new_password)?;
        let actor = session.clone();
        self.repos
            .users()
            .update(
                &user.id,
                Box::new(move |u: &mut User| -> DomainResult<NewAuditEntry> {
                    u.password_hash = new_hash;
                    u.updated_at = Utc::now();
                    Ok(NewAuditEntry::by(
                        &actor,
                        AuditAction::PasswordChanged,
                        EntityRef::user(&u.id),
                        "Password changed",
                    ))
                }),
            )
            .await?;

        info!(user_id = %session.user_id, "Password changed");
        Ok(())
    }

    /// Change a user's role. Only a superuser may grant or revoke the
    /// superuser role.
    pub async fn set_role(&self, session: &Session, target_id: &str, role: Role) -> DomainResult<User> {
        self.policy.require(session, Action::ManageUsers)?;

        let target = self.load(target_id).await?;
        let touches_superuser = role == Role::Superuser || target.role == Role::Superuser;
        if touches_superuser && session.role != Role::Superuser {
            return Err(DomainError::Unauthorized(
                "Only a superuser may grant or revoke the superuser role".into(),
            ));
        }
        if session.is(target_id) {
            return Err(DomainError::Validation("You cannot change your own role".into()));
        }

        let actor = session.clone();
        let user = self
            .repos
            .users()
            .update(
                target_id,
                Box::new(move |u: &mut User| -> DomainResult<NewAuditEntry> {
                    let previous = u.role;
                    u.role = role;
                    u.updated_at = Utc::now();
                    Ok(NewAuditEntry::by(
                        &actor,
                        AuditAction::RoleChanged,
                        EntityRef::user(&u.id),
                        format!("Role of {} changed from {} to {}", u.username, previous, role),
                    ))
                }),
            )
            .await?;

        info!(target_id, role = %role, by = %session.username, "User role changed");
        Ok(user)
    }

    pub async fn deactivate(&self, session: &Session, target_id: &str) -> DomainResult<User> {
        self.set_active(session, target_id, false).await
    }

    pub async fn reactivate(&self, session: &Session, target_id: &str) -> DomainResult<User> {
        self.set_active(session, target_id, true).await
    }

    async fn set_active(&self, session: &Session, target_id: &str, active: bool) -> DomainResult<User> {
        self.policy.require(session, Action::ManageUsers)?;
        if session.is(target_id) {
            return Err(DomainError::Validation("You cannot change your own activation".into()));
        }

        let target = self.load(target_id).await?;
        if target.role == Role::Superuser && session.role != Role::Superuser {
            return Err(DomainError::Unauthorized(
                "Only a superuser may change another superuser".into(),
            ));
        }

        let actor = session.clone();
        let user = self
            .repos
            .users()
            .update(
                target_id,
                Box::new(move |u: &mut User| -> DomainResult<NewAuditEntry> {
                    if u.is_active == active {
                        return Err(DomainError::Validation(format!(
                            "User {} is already {}",
                            u.username,
                            if active { "active" } else { "inactive" }
                        )));
                    }
                    u.is_active = active;
                    u.updated_at = Utc::now();
                    let (action, verb) = if active {
                        (AuditAction::Reactivate, "reactivated")
                    } else {
                        (AuditAction::Deactivate, "deactivated")
                    };
                    Ok(NewAuditEntry::by(
                        &actor,
                        action,
                        EntityRef::user(&u.id),
                        format!("User {} {}", u.username, verb),
                    ))
                }),
            )
            .await?;

        info!(target_id, active, by = %session.username, "User activation changed");
        Ok(user)
    }

    /// Create the configured superuser when no users exist yet.
    pub async fn bootstrap_superuser(&self, admin: &AdminConfig) -> DomainResult<Option<User>> {
        if self.repos.users().count().await? > 0 {
            return Ok(None);
        }

        info!(username = %admin.username, "Creating default superuser");
        let now = Utc::now();
        let mut user = User::pending(
            admin.username.clone(),
            admin.email.clone(),
            self.hash(&admin.password)?,
            Role::Superuser,
            now,
        );
        user.approval_state = ApprovalState::Approved;
        user.reviewed_at = Some(now);

        let audit = NewAuditEntry::new(
            &user.id,
            &user.username,
            AuditAction::CreateUser,
            EntityRef::user(&user.id),
            "Default superuser created at startup",
        );
        let user = self.repos.users().insert(user, audit).await?;

        warn!("⚠️  Default superuser created - change the password after first login!");
        Ok(Some(user))
    }

    // ── Helpers ─────────────────────────────────────────────────

    async fn load(&self, id: &str) -> DomainResult<User> {
        self.repos
            .users()
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("User", "id", id))
    }

    fn hash(&self, password: &str) -> DomainResult<String> {
        Ok(hash_password(password, self.security.bcrypt_cost)?)
    }
}
