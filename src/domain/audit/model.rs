use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::access::Session;
use crate::shared::errors::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Login,
    LoginFailed,
    Register,
    CreateUser,
    Approve,
    Reject,
    PasswordResetRequested,
    PasswordReset,
    PasswordChanged,
    RoleChanged,
    Deactivate,
    Reactivate,
    CreateAllocation,
    UpdateAllocation,
    CloseAllocation,
    RecordUat,
    FinalizeUat,
    CreateQualityRecord,
    UpdateQualityRecord,
    DeleteQualityRecord,
}

impl AuditAction {
    pub const ALL: [AuditAction; 20] = [
        AuditAction::Login,
        AuditAction::LoginFailed,
        AuditAction::Register,
        AuditAction::CreateUser,
        AuditAction::Approve,
        AuditAction::Reject,
        AuditAction::PasswordResetRequested,
        AuditAction::PasswordReset,
        AuditAction::PasswordChanged,
        AuditAction::RoleChanged,
        AuditAction::Deactivate,
        AuditAction::Reactivate,
        AuditAction::CreateAllocation,
        AuditAction::UpdateAllocation,
        AuditAction::CloseAllocation,
        AuditAction::RecordUat,
        AuditAction::FinalizeUat,
        AuditAction::CreateQualityRecord,
        AuditAction::UpdateQualityRecord,
        AuditAction::DeleteQualityRecord,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Login => "login",
            AuditAction::LoginFailed => "login_failed",
            AuditAction::Register => "register",
            AuditAction::CreateUser => "create_user",
            AuditAction::Approve => "approve",
            AuditAction::Reject => "reject",
            AuditAction::PasswordResetRequested => "password_reset_requested",
            AuditAction::PasswordReset => "password_reset",
            AuditAction::PasswordChanged => "password_changed",
            AuditAction::RoleChanged => "role_changed",
            AuditAction::Deactivate => "deactivate",
            AuditAction::Reactivate => "reactivate",
            AuditAction::CreateAllocation => "create_allocation",
            AuditAction::UpdateAllocation => "update_allocation",
            AuditAction::CloseAllocation => "close_allocation",
            AuditAction::RecordUat => "record_uat",
            AuditAction::FinalizeUat => "finalize_uat",
            AuditAction::CreateQualityRecord => "create_quality_record",
            AuditAction::UpdateQualityRecord => "update_quality_record",
            AuditAction::DeleteQualityRecord => "delete_quality_record",
        }
    }

    /// Actions a compliance review looks at first.
    pub fn is_security_event(&self) -> bool {
        matches!(
            self,
            AuditAction::Login
                | AuditAction::LoginFailed
                | AuditAction::Reject
                | AuditAction::PasswordResetRequested
                | AuditAction::PasswordReset
                | AuditAction::PasswordChanged
                | AuditAction::RoleChanged
                | AuditAction::Deactivate
                | AuditAction::Reactivate
                | AuditAction::DeleteQualityRecord
        )
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AuditAction::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| DomainError::Validation(format!("Unknown audit action '{}'", s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    User,
    Allocation,
    UatRecord,
    QualityRecord,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::User => "user",
            EntityKind::Allocation => "allocation",
            EntityKind::UatRecord => "uat_record",
            EntityKind::QualityRecord => "quality_record",
        }
    }
}

impl FromStr for EntityKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(EntityKind::User),
            "allocation" => Ok(EntityKind::Allocation),
            "uat_record" => Ok(EntityKind::UatRecord),
            "quality_record" => Ok(EntityKind::QualityRecord),
            other => Err(DomainError::Validation(format!("Unknown entity kind '{}'", other))),
        }
    }
}

/// Reference to the entity an audit entry is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: String,
}

impl EntityRef {
    pub fn user(id: impl Into<String>) -> Self {
        Self {
            kind: EntityKind::User,
            id: id.into(),
        }
    }

    pub fn allocation(id: impl Into<String>) -> Self {
        Self {
            kind: EntityKind::Allocation,
            id: id.into(),
        }
    }

    pub fn uat_record(id: impl Into<String>) -> Self {
        Self {
            kind: EntityKind::UatRecord,
            id: id.into(),
        }
    }

    pub fn quality_record(id: impl Into<String>) -> Self {
        Self {
            kind: EntityKind::QualityRecord,
            id: id.into(),
        }
    }
}

/// An audit entry before it has been stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAuditEntry {
    pub actor_id: String,
    pub actor_username: String,
    pub action: AuditAction,
    pub target: EntityRef,
    pub description: String,
    pub timestamp: DateTime<Utc>,
}

impl NewAuditEntry {
    pub fn new(
        actor_id: impl Into<String>,
        actor_username: impl Into<String>,
        action: AuditAction,
        target: EntityRef,
        description: impl Into<String>,
    ) -> Self {
        Self {
            actor_id: actor_id.into(),
            actor_username: actor_username.into(),
            action,
            target,
            description: description.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn by(
        session: &Session,
        action: AuditAction,
        target: EntityRef,
        description: impl Into<String>,
    ) -> Self {
        Self::new(
            session.user_id.clone(),
            session.username.clone(),
            action,
            target,
            description,
        )
    }
}

/// A stored audit entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditEntry {
    pub id: i64,
    pub actor_id: String,
    pub actor_username: String,
    pub action: AuditAction,
    pub target: EntityRef,
    pub description: String,
    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    pub fn cursor(&self) -> AuditCursor {
        AuditCursor {
            timestamp: self.timestamp,
            id: self.id,
        }
    }
}

/// Position in the (timestamp, id) ordering of the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditCursor {
    pub timestamp: DateTime<Utc>,
    pub id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditFilter {
    pub actor_id: Option<String>,
    pub action: Option<AuditAction>,
    pub target_kind: Option<EntityKind>,
    pub target_id: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuditStats {
    pub total: u64,
    pub by_action: BTreeMap<AuditAction, u64>,
    pub by_actor: BTreeMap<String, u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_labels_parse_back() {
        for action in AuditAction::ALL {
            assert_eq!(action.as_str().parse::<AuditAction>().unwrap(), action);
        }
        assert!("delete_everything".parse::<AuditAction>().is_err());
    }

    #[test]
    fn serde_matches_storage_label() {
        let json = serde_json::to_string(&AuditAction::PasswordResetRequested).unwrap();
        assert_eq!(json, "\"password_reset_requested\"");
        assert_eq!("uat_record".parse::<EntityKind>().unwrap(), EntityKind::UatRecord);
        assert_eq!("quality_record".parse::<EntityKind>().unwrap(), EntityKind::QualityRecord);
    }
}
