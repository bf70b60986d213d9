//! Input validation shared by the application services.

use chrono::NaiveDate;
use validator::ValidateEmail;

use super::DomainError;

pub fn validate_username(username: &str) -> Result<(), DomainError> {
    if username.len() < 3 || username.len() > 50 {
        return Err(DomainError::Validation(
            "Username must be 3-50 characters".into(),
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(DomainError::Validation(
            "Username can only contain letters, numbers, and underscores".into(),
        ));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), DomainError> {
    if !email.validate_email() {
        return Err(DomainError::Validation("Invalid email address".into()));
    }
    Ok(())
}

pub fn validate_password(password: &str, min_length: usize) -> Result<(), DomainError> {
    if password.chars().count() < min_length {
        return Err(DomainError::Validation(format!(
            "Password must be at least {} characters",
            min_length
        )));
    }
    Ok(())
}

pub fn validate_date_range(start: NaiveDate, end: NaiveDate) -> Result<(), DomainError> {
    if end < start {
        return Err(DomainError::Validation(
            "End date must not be before start date".into(),
        ));
    }
    Ok(())
}

pub fn validate_required(value: &str, field: &str) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::Validation(format!("{} is required", field)));
    }
    Ok(())
}
