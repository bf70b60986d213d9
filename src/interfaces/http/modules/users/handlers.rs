//! User administration handlers

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};

use super::dto::{ApproveParams, ChangeRoleRequest, ListUsersParams, UserDto, UserStatsDto};
use crate::application::PortalServices;
use crate::domain::{Role, Session};
use crate::interfaces::http::common::{ApiResponse, PaginatedResponse, ValidatedJson};
use crate::interfaces::http::error::ApiResult;
use crate::shared::PageRequest;

#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(ListUsersParams),
    responses(
        (status = 200, description = "User list", body = ApiResponse<PaginatedResponse<UserDto>>),
        (status = 403, description = "Missing permission")
    )
)]
pub async fn list_users(
    State(services): State<PortalServices>,
    Extension(session): Extension<Session>,
    Query(params): Query<ListUsersParams>,
) -> ApiResult<Json<ApiResponse<PaginatedResponse<UserDto>>>> {
    let filter = params.filter()?;
    let page = PageRequest::new(params.page, params.limit);
    let result = services.identity.list_users(&session, filter, page).await?;
    Ok(Json(ApiResponse::success(PaginatedResponse::from_result(result))))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/stats",
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "User counts by role and approval state", body = ApiResponse<UserStatsDto>),
        (status = 403, description = "Missing permission")
    )
)]
pub async fn user_stats(
    State(services): State<PortalServices>,
    Extension(session): Extension<Session>,
) -> ApiResult<Json<ApiResponse<UserStatsDto>>> {
    let stats = services.identity.user_stats(&session).await?;
    Ok(Json(ApiResponse::success(stats.into())))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/pending",
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Pending registrations, oldest first", body = ApiResponse<Vec<UserDto>>),
        (status = 403, description = "Missing permission")
    )
)]
pub async fn list_pending(
    State(services): State<PortalServices>,
    Extension(session): Extension<Session>,
) -> ApiResult<Json<ApiResponse<Vec<UserDto>>>> {
    let users = services.approval.list_pending(&session).await?;
    Ok(Json(ApiResponse::success(users.into_iter().map(UserDto::from).collect())))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "User details", body = ApiResponse<UserDto>),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_user(
    State(services): State<PortalServices>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<UserDto>>> {
    let user = services.identity.get_user(&session, &id).await?;
    Ok(Json(ApiResponse::success(user.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/users/{id}/approve",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "User ID"), ApproveParams),
    responses(
        (status = 200, description = "Registration approved", body = ApiResponse<UserDto>),
        (status = 400, description = "Registration already decided"),
        (status = 403, description = "Missing permission")
    )
)]
pub async fn approve_user(
    State(services): State<PortalServices>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    Query(params): Query<ApproveParams>,
) -> ApiResult<Json<ApiResponse<UserDto>>> {
    let role: Option<Role> = params.role.as_deref().map(str::parse).transpose()?;
    let user = services.approval.approve(&session, &id, role).await?;
    Ok(Json(ApiResponse::success(user.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/users/{id}/reject",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "Registration rejected", body = ApiResponse<UserDto>),
        (status = 400, description = "Registration already decided"),
        (status = 403, description = "Missing permission")
    )
)]
pub async fn reject_user(
    State(services): State<PortalServices>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<UserDto>>> {
    let user = services.approval.reject(&session, &id).await?;
    Ok(Json(ApiResponse::success(user.into())))
}

#[utoipa::path(
    put,
    path = "/api/v1/users/{id}/role",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "User ID")),
    request_body = ChangeRoleRequest,
    responses(
        (status = 200, description = "Role changed", body = ApiResponse<UserDto>),
        (status = 400, description = "Unknown role"),
        (status = 403, description = "Missing permission")
    )
)]
pub async fn change_role(
    State(services): State<PortalServices>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<ChangeRoleRequest>,
) -> ApiResult<Json<ApiResponse<UserDto>>> {
    let role: Role = request.role.parse()?;
    let user = services.identity.set_role(&session, &id, role).await?;
    Ok(Json(ApiResponse::success(user.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/users/{id}/deactivate",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "User deactivated", body = ApiResponse<UserDto>),
        (status = 403, description = "Missing permission")
    )
)]
pub async fn deactivate_user(
    State(services): State<PortalServices>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<UserDto>>> {
    let user = services.identity.deactivate(&session, &id).await?;
    Ok(Json(ApiResponse::success(user.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/users/{id}/reactivate",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "User reactivated", body = ApiResponse<UserDto>),
        (status = 403, description = "Missing permission")
    )
)]
pub async fn reactivate_user(
    State(services): State<PortalServices>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<UserDto>>> {
    let user = services.identity.reactivate(&session, &id).await?;
    Ok(Json(ApiResponse::success(user.into())))
}
