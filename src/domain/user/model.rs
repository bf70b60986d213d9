use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::access::Role;
use crate::shared::errors::DomainError;

/// Registration approval state.
///
/// ```text
/// Pending ──approve──► Approved
///    └─────reject────► Rejected
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalState {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalState::Pending => "pending",
            ApprovalState::Approved => "approved",
            ApprovalState::Rejected => "rejected",
        }
    }

    /// Guarded transition. Only a pending registration can be decided.
    pub fn transition(self, to: ApprovalState) -> Result<ApprovalState, DomainError> {
        match (self, to) {
            (ApprovalState::Pending, ApprovalState::Approved)
            | (ApprovalState::Pending, ApprovalState::Rejected) => Ok(to),
            (from, to) => Err(DomainError::Validation(format!(
                "Cannot move registration from {} to {}",
                from, to
            ))),
        }
    }
}

impl fmt::Display for ApprovalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApprovalState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(ApprovalState::Pending),
            "approved" => Ok(ApprovalState::Approved),
            "rejected" => Ok(ApprovalState::Rejected),
            other => Err(DomainError::Validation(format!("Unknown approval state '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub approval_state: ApprovalState,
    /// Soft-disable flag. Users are never deleted.
    pub is_active: bool,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl User {
    /// A freshly registered, pending user.
    pub fn pending(
        username: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
        role: Role,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            username: username.into(),
            email: email.into(),
            password_hash: password_hash.into(),
            role,
            approval_state: ApprovalState::Pending,
            is_active: true,
            reviewed_by: None,
            reviewed_at: None,
            created_at: now,
            updated_at: now,
            last_login_at: None,
        }
    }

    /// Approved and not disabled.
    pub fn is_approved(&self) -> bool {
        self.approval_state == ApprovalState::Approved && self.is_active
    }

    pub fn decide(
        &mut self,
        to: ApprovalState,
        reviewer_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.approval_state = self.approval_state.transition(to)?;
        self.reviewed_by = Some(reviewer_id.to_string());
        self.reviewed_at = Some(now);
        self.updated_at = now;
        Ok(())
    }
}

/// List filter for users.
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    /// Substring match on username or email
    pub search: Option<String>,
    pub role: Option<Role>,
    pub approval_state: Option<ApprovalState>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserStats {
    pub total: u64,
    pub by_role: BTreeMap<Role, u64>,
    pub by_approval_state: BTreeMap<ApprovalState, u64>,
    pub inactive: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User::pending("alice", "alice@example.com", "hash", Role::User, Utc::now())
    }

    #[test]
    fn pending_user_cannot_authenticate() {
        let u = user();
        assert_eq!(u.approval_state, ApprovalState::Pending);
        assert!(!u.is_approved());
    }

    #[test]
    fn approve_then_reject_is_refused() {
        let mut u = user();
        u.decide(ApprovalState::Approved, "admin-1", Utc::now()).unwrap();
        assert!(u.is_approved());
        assert_eq!(u.reviewed_by.as_deref(), Some("admin-1"));

        let err = u
            .decide(ApprovalState::Rejected, "admin-1", Utc::now())
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(u.approval_state, ApprovalState::Approved);
    }

    #[test]
    fn transitions_out_of_pending_only() {
        use ApprovalState::*;
        assert_eq!(Pending.transition(Approved).unwrap(), Approved);
        assert_eq!(Pending.transition(Rejected).unwrap(), Rejected);
        assert!(Pending.transition(Pending).is_err());
        assert!(Rejected.transition(Approved).is_err());
        assert!(Approved.transition(Approved).is_err());
    }

    #[test]
    fn approval_state_parses_its_label() {
        for state in [ApprovalState::Pending, ApprovalState::Approved, ApprovalState::Rejected] {
            assert_eq!(state.as_str().parse::<ApprovalState>().unwrap(), state);
        }
        assert!("archived".parse::<ApprovalState>().is_err());
    }

    #[test]
    fn disabled_user_is_not_approved() {
        let mut u = user();
        u.decide(ApprovalState::Approved, "admin-1", Utc::now()).unwrap();
        u.is_active = false;
        assert!(!u.is_approved());
    }
}
