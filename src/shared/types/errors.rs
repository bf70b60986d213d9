use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account is not approved")]
    NotApproved,

    #[error("Engineer {0} is not an approved, active user")]
    EngineerNotApproved(String),

    #[error("UAT round {round} is out of order (last recorded round is {last})")]
    OutOfOrderRound { round: i32, last: i32 },

    #[error("UAT round {round} already has a final result")]
    AlreadyFinalized { round: i32 },

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Not found: {entity} with {field}={value}")]
    NotFound {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("Validation: {0}")]
    Validation(String),

    #[error("Already exists: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn not_found(entity: &'static str, field: &'static str, value: impl Into<String>) -> Self {
        DomainError::NotFound {
            entity,
            field,
            value: value.into(),
        }
    }

    /// Every error except a storage outage or an internal failure is
    /// surfaced to the caller as a rejected action.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, DomainError::StorageUnavailable(_) | DomainError::Internal(_))
    }
}

impl From<sea_orm::DbErr> for DomainError {
    fn from(e: sea_orm::DbErr) -> Self {
        let msg = e.to_string();
        if msg.contains("UNIQUE") || msg.contains("duplicate") {
            DomainError::Conflict(msg)
        } else {
            DomainError::StorageUnavailable(msg)
        }
    }
}

impl From<bcrypt::BcryptError> for DomainError {
    fn from(e: bcrypt::BcryptError) -> Self {
        DomainError::Internal(format!("password hashing failed: {}", e))
    }
}

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("Config error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_and_internal_failures_are_fatal() {
        assert!(!DomainError::StorageUnavailable("down".into()).is_recoverable());
        assert!(DomainError::InvalidCredentials.is_recoverable());
        assert!(DomainError::OutOfOrderRound { round: 1, last: 2 }.is_recoverable());
        assert!(DomainError::AlreadyFinalized { round: 1 }.is_recoverable());
        assert!(!DomainError::Internal("boom".into()).is_recoverable());
    }

    #[test]
    fn hashing_failure_is_internal_not_validation() {
        let err: DomainError = bcrypt::hash("secret", 2).unwrap_err().into();
        assert!(matches!(err, DomainError::Internal(_)));
    }

    #[test]
    fn unique_violation_maps_to_conflict() {
        let err: DomainError =
            sea_orm::DbErr::Custom("UNIQUE constraint failed: users.username".into()).into();
        assert!(matches!(err, DomainError::Conflict(_)));

        let err: DomainError = sea_orm::DbErr::Custom("connection refused".into()).into();
        assert!(matches!(err, DomainError::StorageUnavailable(_)));
    }
}
