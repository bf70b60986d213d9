//! Mapping of domain errors onto HTTP responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::error;

use super::common::ApiResponse;
use crate::shared::errors::DomainError;

/// Handler error. Wraps a [`DomainError`] and renders it as an
/// [`ApiResponse`] with the matching status.
#[derive(Debug)]
pub struct ApiError(pub DomainError);

pub type ApiResult<T> = Result<T, ApiError>;

impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        ApiError(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            DomainError::Unauthorized(_) => StatusCode::FORBIDDEN,
            DomainError::InvalidCredentials | DomainError::NotApproved => StatusCode::UNAUTHORIZED,
            DomainError::EngineerNotApproved(_)
            | DomainError::OutOfOrderRound { .. }
            | DomainError::AlreadyFinalized { .. }
            | DomainError::Conflict(_) => StatusCode::CONFLICT,
            DomainError::Validation(_) => StatusCode::BAD_REQUEST,
            DomainError::NotFound { .. } => StatusCode::NOT_FOUND,
            DomainError::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            DomainError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self.0 {
            DomainError::StorageUnavailable(detail) => {
                error!(error = %detail, "Storage unavailable");
                "Storage unavailable".to_string()
            }
            DomainError::Internal(detail) => {
                error!(error = %detail, "Internal error");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(ApiResponse::<()>::error(message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        let cases = [
            (DomainError::Unauthorized("x".into()), StatusCode::FORBIDDEN),
            (DomainError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (DomainError::NotApproved, StatusCode::UNAUTHORIZED),
            (DomainError::EngineerNotApproved("e".into()), StatusCode::CONFLICT),
            (DomainError::OutOfOrderRound { round: 1, last: 2 }, StatusCode::CONFLICT),
            (DomainError::AlreadyFinalized { round: 1 }, StatusCode::CONFLICT),
            (DomainError::Conflict("dup".into()), StatusCode::CONFLICT),
            (DomainError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (DomainError::not_found("User", "id", "u1"), StatusCode::NOT_FOUND),
            (DomainError::StorageUnavailable("down".into()), StatusCode::SERVICE_UNAVAILABLE),
            (DomainError::Internal("bcrypt".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError(err).status(), status);
        }
    }

    #[test]
    fn storage_detail_is_not_leaked() {
        let resp = ApiError(DomainError::StorageUnavailable("disk I/O error at /var/x".into())).into_response();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
