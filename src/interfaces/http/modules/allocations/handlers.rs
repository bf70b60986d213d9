//! Allocation handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};

use super::dto::{
    AllocationDto, AllocationStatsDto, CreateAllocationRequest, ListAllocationsParams,
    UpdateAllocationRequest,
};
use crate::application::PortalServices;
use crate::domain::Session;
use crate::interfaces::http::common::{ApiResponse, ValidatedJson};
use crate::interfaces::http::error::ApiResult;

#[utoipa::path(
    get,
    path = "/api/v1/allocations",
    tag = "Allocations",
    security(("bearer_auth" = [])),
    params(ListAllocationsParams),
    responses(
        (status = 200, description = "Allocations visible to the caller", body = ApiResponse<Vec<AllocationDto>>)
    )
)]
pub async fn list_allocations(
    State(services): State<PortalServices>,
    Extension(session): Extension<Session>,
    Query(params): Query<ListAllocationsParams>,
) -> ApiResult<Json<ApiResponse<Vec<AllocationDto>>>> {
    let allocations = services
        .allocations
        .list_allocations(&session, params.filter()?)
        .await?;
    Ok(Json(ApiResponse::success(
        allocations.into_iter().map(AllocationDto::from).collect(),
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/allocations",
    tag = "Allocations",
    security(("bearer_auth" = [])),
    request_body = CreateAllocationRequest,
    responses(
        (status = 201, description = "Allocation created", body = ApiResponse<AllocationDto>),
        (status = 400, description = "Invalid period or trial"),
        (status = 403, description = "Missing permission"),
        (status = 409, description = "Engineer is not an approved, active user")
    )
)]
pub async fn create_allocation(
    State(services): State<PortalServices>,
    Extension(session): Extension<Session>,
    ValidatedJson(request): ValidatedJson<CreateAllocationRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<AllocationDto>>)> {
    let allocation = services
        .allocations
        .create_allocation(&session, request.into())
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(allocation.into()))))
}

#[utoipa::path(
    get,
    path = "/api/v1/allocations/stats",
    tag = "Allocations",
    security(("bearer_auth" = [])),
    params(ListAllocationsParams),
    responses(
        (status = 200, description = "Allocation counts", body = ApiResponse<AllocationStatsDto>)
    )
)]
pub async fn allocation_stats(
    State(services): State<PortalServices>,
    Extension(session): Extension<Session>,
    Query(params): Query<ListAllocationsParams>,
) -> ApiResult<Json<ApiResponse<AllocationStatsDto>>> {
    let stats = services
        .allocations
        .allocation_stats(&session, params.filter()?)
        .await?;
    Ok(Json(ApiResponse::success(stats.into())))
}

#[utoipa::path(
    get,
    path = "/api/v1/allocations/{id}",
    tag = "Allocations",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Allocation ID")),
    responses(
        (status = 200, description = "Allocation", body = ApiResponse<AllocationDto>),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_allocation(
    State(services): State<PortalServices>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<AllocationDto>>> {
    let allocation = services.allocations.get_allocation(&session, &id).await?;
    Ok(Json(ApiResponse::success(allocation.into())))
}

#[utoipa::path(
    put,
    path = "/api/v1/allocations/{id}",
    tag = "Allocations",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Allocation ID")),
    request_body = UpdateAllocationRequest,
    responses(
        (status = 200, description = "Allocation updated", body = ApiResponse<AllocationDto>),
        (status = 400, description = "Closed allocation or invalid period"),
        (status = 404, description = "Not found")
    )
)]
pub async fn update_allocation(
    State(services): State<PortalServices>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<UpdateAllocationRequest>,
) -> ApiResult<Json<ApiResponse<AllocationDto>>> {
    let allocation = services
        .allocations
        .update_allocation(&session, &id, request.into())
        .await?;
    Ok(Json(ApiResponse::success(allocation.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/allocations/{id}/close",
    tag = "Allocations",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Allocation ID")),
    responses(
        (status = 200, description = "Allocation closed", body = ApiResponse<AllocationDto>),
        (status = 400, description = "Already closed"),
        (status = 404, description = "Not found")
    )
)]
pub async fn close_allocation(
    State(services): State<PortalServices>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<AllocationDto>>> {
    let allocation = services.allocations.close_allocation(&session, &id).await?;
    Ok(Json(ApiResponse::success(allocation.into())))
}
