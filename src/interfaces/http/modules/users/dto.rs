//! User DTOs

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::domain::user::{UserFilter, UserStats};
use crate::domain::{DomainError, User};

/// User API representation. The password hash never leaves the server.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserDto {
    pub id: String,
    pub username: String,
    pub email: String,
    /// superuser, manager, admin or user
    pub role: String,
    /// pending, approved or rejected
    pub approval_state: String,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<DateTime<Utc>>,
}

impl From<User> for UserDto {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
            role: u.role.to_string(),
            approval_state: u.approval_state.to_string(),
            is_active: u.is_active,
            reviewed_by: u.reviewed_by,
            reviewed_at: u.reviewed_at,
            created_at: u.created_at,
            updated_at: u.updated_at,
            last_login_at: u.last_login_at,
        }
    }
}

/// List users query parameters
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListUsersParams {
    /// Substring of username or email
    pub search: Option<String>,
    /// superuser, manager, admin or user
    pub role: Option<String>,
    /// pending, approved or rejected
    pub approval_state: Option<String>,
    pub is_active: Option<bool>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

impl ListUsersParams {
    pub fn filter(&self) -> Result<UserFilter, DomainError> {
        Ok(UserFilter {
            search: self.search.clone().filter(|s| !s.trim().is_empty()),
            role: self.role.as_deref().map(str::parse).transpose()?,
            approval_state: self.approval_state.as_deref().map(str::parse).transpose()?,
            is_active: self.is_active,
        })
    }
}

/// Approve query parameters
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ApproveParams {
    /// Role granted on approval; the requested role is kept when absent
    pub role: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ChangeRoleRequest {
    #[validate(length(min = 1, message = "role is required"))]
    pub role: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserStatsDto {
    pub total: u64,
    pub by_role: BTreeMap<String, u64>,
    pub by_approval_state: BTreeMap<String, u64>,
    pub inactive: u64,
}

impl From<UserStats> for UserStatsDto {
    fn from(s: UserStats) -> Self {
        Self {
            total: s.total,
            by_role: s.by_role.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
            by_approval_state: s
                .by_approval_state
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            inactive: s.inactive,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ApprovalState, Role};

    #[test]
    fn list_params_parse_into_filter() {
        let params = ListUsersParams {
            role: Some("Manager".into()),
            approval_state: Some("pending".into()),
            search: Some("  ".into()),
            ..Default::default()
        };
        let filter = params.filter().unwrap();
        assert_eq!(filter.role, Some(Role::Manager));
        assert_eq!(filter.approval_state, Some(ApprovalState::Pending));
        assert!(filter.search.is_none());

        let bad = ListUsersParams {
            role: Some("root".into()),
            ..Default::default()
        };
        assert!(matches!(bad.filter(), Err(DomainError::Validation(_))));
    }
}
