//! UAT handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};

use super::dto::{FinalizeUatRequest, RecordUatRequest, UatRecordDto, UatStatsDto};
use crate::application::PortalServices;
use crate::domain::{Session, UatCategory, UatResult};
use crate::interfaces::http::common::{ApiResponse, ValidatedJson};
use crate::interfaces::http::error::ApiResult;

#[utoipa::path(
    get,
    path = "/api/v1/allocations/{id}/uat",
    tag = "UAT",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Allocation ID")),
    responses(
        (status = 200, description = "Rounds in ascending order", body = ApiResponse<Vec<UatRecordDto>>),
        (status = 404, description = "Allocation not found")
    )
)]
pub async fn uat_history(
    State(services): State<PortalServices>,
    Extension(session): Extension<Session>,
    Path(allocation_id): Path<String>,
) -> ApiResult<Json<ApiResponse<Vec<UatRecordDto>>>> {
    let records = services.uat.uat_history(&session, &allocation_id).await?;
    Ok(Json(ApiResponse::success(
        records.into_iter().map(UatRecordDto::from).collect(),
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/allocations/{id}/uat",
    tag = "UAT",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Allocation ID")),
    request_body = RecordUatRequest,
    responses(
        (status = 201, description = "Round recorded", body = ApiResponse<UatRecordDto>),
        (status = 400, description = "Invalid round or closed allocation"),
        (status = 409, description = "Round out of order or already finalized")
    )
)]
pub async fn record_uat(
    State(services): State<PortalServices>,
    Extension(session): Extension<Session>,
    Path(allocation_id): Path<String>,
    ValidatedJson(request): ValidatedJson<RecordUatRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<UatRecordDto>>)> {
    let category: UatCategory = request.category.parse()?;
    let result: UatResult = request.result.parse()?;
    let record = services
        .uat
        .record_uat_result(&session, &allocation_id, request.round, category, result, request.notes)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(record.into()))))
}

#[utoipa::path(
    put,
    path = "/api/v1/allocations/{id}/uat/{round}",
    tag = "UAT",
    security(("bearer_auth" = [])),
    params(
        ("id" = String, Path, description = "Allocation ID"),
        ("round" = i32, Path, description = "Round number")
    ),
    request_body = FinalizeUatRequest,
    responses(
        (status = 200, description = "Round finalized", body = ApiResponse<UatRecordDto>),
        (status = 404, description = "Round not found"),
        (status = 409, description = "Round already finalized")
    )
)]
pub async fn finalize_uat(
    State(services): State<PortalServices>,
    Extension(session): Extension<Session>,
    Path((allocation_id, round)): Path<(String, i32)>,
    ValidatedJson(request): ValidatedJson<FinalizeUatRequest>,
) -> ApiResult<Json<ApiResponse<UatRecordDto>>> {
    let result: UatResult = request.result.parse()?;
    let record = services
        .uat
        .finalize_uat_round(&session, &allocation_id, round, result)
        .await?;
    Ok(Json(ApiResponse::success(record.into())))
}

#[utoipa::path(
    get,
    path = "/api/v1/uat/stats",
    tag = "UAT",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "UAT counts over visible allocations", body = ApiResponse<UatStatsDto>)
    )
)]
pub async fn uat_stats(
    State(services): State<PortalServices>,
    Extension(session): Extension<Session>,
) -> ApiResult<Json<ApiResponse<UatStatsDto>>> {
    let stats = services.uat.uat_stats(&session).await?;
    Ok(Json(ApiResponse::success(stats.into())))
}
