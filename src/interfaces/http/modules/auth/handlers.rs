//! Authentication API handlers

use axum::{extract::State, http::StatusCode, Extension, Json};

use super::dto::{
    ChangePasswordRequest, ForgotPasswordRequest, LoginRequest, LoginResponse, MessageResponse,
    RegisterRequest, ResetPasswordRequest,
};
use crate::application::{PortalServices, Registration};
use crate::domain::Session;
use crate::interfaces::http::common::{ApiResponse, ValidatedJson};
use crate::interfaces::http::error::ApiResult;
use crate::interfaces::http::modules::users::UserDto;

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "Authentication",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Successful login", body = ApiResponse<LoginResponse>),
        (status = 401, description = "Invalid credentials or account not approved")
    )
)]
pub async fn login(
    State(services): State<PortalServices>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> ApiResult<Json<ApiResponse<LoginResponse>>> {
    let auth = services.identity.login(&request.username, &request.password).await?;
    Ok(Json(ApiResponse::success(auth.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "Authentication",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registration submitted for approval", body = ApiResponse<UserDto>),
        (status = 400, description = "Validation error"),
        (status = 409, description = "Username or email already exists")
    )
)]
pub async fn register(
    State(services): State<PortalServices>,
    ValidatedJson(request): ValidatedJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<UserDto>>)> {
    let user = services
        .approval
        .register(Registration {
            username: request.username,
            email: request.email,
            password: request.password,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(user.into()))))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/forgot-password",
    tag = "Authentication",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Reset email sent if the account exists", body = ApiResponse<MessageResponse>)
    )
)]
pub async fn forgot_password(
    State(services): State<PortalServices>,
    ValidatedJson(request): ValidatedJson<ForgotPasswordRequest>,
) -> ApiResult<Json<ApiResponse<MessageResponse>>> {
    services.approval.reset_password(&request.identifier).await?;
    Ok(Json(ApiResponse::success(MessageResponse::new(
        "If the account exists, a reset link has been sent",
    ))))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/reset-password",
    tag = "Authentication",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password reset", body = ApiResponse<MessageResponse>),
        (status = 401, description = "Token invalid, expired or already used")
    )
)]
pub async fn reset_password(
    State(services): State<PortalServices>,
    ValidatedJson(request): ValidatedJson<ResetPasswordRequest>,
) -> ApiResult<Json<ApiResponse<MessageResponse>>> {
    services
        .approval
        .complete_password_reset(&request.token, &request.new_password)
        .await?;
    Ok(Json(ApiResponse::success(MessageResponse::new("Password has been reset"))))
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "Authentication",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user", body = ApiResponse<UserDto>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn get_current_user(
    State(services): State<PortalServices>,
    Extension(session): Extension<Session>,
) -> ApiResult<Json<ApiResponse<UserDto>>> {
    let user = services.identity.current_user(&session).await?;
    Ok(Json(ApiResponse::success(user.into())))
}

#[utoipa::path(
    put,
    path = "/api/v1/auth/change-password",
    tag = "Authentication",
    security(("bearer_auth" = [])),
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = ApiResponse<MessageResponse>),
        (status = 401, description = "Current password is wrong")
    )
)]
pub async fn change_password(
    State(services): State<PortalServices>,
    Extension(session): Extension<Session>,
    ValidatedJson(request): ValidatedJson<ChangePasswordRequest>,
) -> ApiResult<Json<ApiResponse<MessageResponse>>> {
    services
        .identity
        .change_password(&session, &request.current_password, &request.new_password)
        .await?;
    Ok(Json(ApiResponse::success(MessageResponse::new("Password changed"))))
}
