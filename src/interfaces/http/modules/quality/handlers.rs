//! Quality record handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};

use super::dto::{
    CreateQualityRequest, ListQualityParams, QualityRecordDto, QualityStatsDto,
    UpdateQualityRequest,
};
use crate::application::PortalServices;
use crate::domain::Session;
use crate::interfaces::http::common::{ApiResponse, ValidatedJson};
use crate::interfaces::http::error::ApiResult;

#[utoipa::path(
    get,
    path = "/api/v1/quality",
    tag = "Quality",
    security(("bearer_auth" = [])),
    params(ListQualityParams),
    responses(
        (status = 200, description = "Quality records visible to the caller", body = ApiResponse<Vec<QualityRecordDto>>)
    )
)]
pub async fn list_quality_records(
    State(services): State<PortalServices>,
    Extension(session): Extension<Session>,
    Query(params): Query<ListQualityParams>,
) -> ApiResult<Json<ApiResponse<Vec<QualityRecordDto>>>> {
    let records = services.quality.list_records(&session, params.filter()?).await?;
    Ok(Json(ApiResponse::success(
        records.into_iter().map(QualityRecordDto::from).collect(),
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/quality",
    tag = "Quality",
    security(("bearer_auth" = [])),
    request_body = CreateQualityRequest,
    responses(
        (status = 201, description = "Quality record created", body = ApiResponse<QualityRecordDto>),
        (status = 400, description = "Inconsistent counts or unknown requirement type"),
        (status = 403, description = "Missing permission")
    )
)]
pub async fn create_quality_record(
    State(services): State<PortalServices>,
    Extension(session): Extension<Session>,
    ValidatedJson(request): ValidatedJson<CreateQualityRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<QualityRecordDto>>)> {
    let record = services
        .quality
        .create_record(&session, request.into_draft()?)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(record.into()))))
}

#[utoipa::path(
    get,
    path = "/api/v1/quality/stats",
    tag = "Quality",
    security(("bearer_auth" = [])),
    params(ListQualityParams),
    responses(
        (status = 200, description = "Quality matrix statistics", body = ApiResponse<QualityStatsDto>)
    )
)]
pub async fn quality_stats(
    State(services): State<PortalServices>,
    Extension(session): Extension<Session>,
    Query(params): Query<ListQualityParams>,
) -> ApiResult<Json<ApiResponse<QualityStatsDto>>> {
    let stats = services.quality.quality_stats(&session, params.filter()?).await?;
    Ok(Json(ApiResponse::success(stats.into())))
}

#[utoipa::path(
    get,
    path = "/api/v1/quality/{id}",
    tag = "Quality",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Quality record ID")),
    responses(
        (status = 200, description = "Quality record", body = ApiResponse<QualityRecordDto>),
        (status = 403, description = "Record belongs to another user"),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_quality_record(
    State(services): State<PortalServices>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<QualityRecordDto>>> {
    let record = services.quality.get_record(&session, &id).await?;
    Ok(Json(ApiResponse::success(record.into())))
}

#[utoipa::path(
    put,
    path = "/api/v1/quality/{id}",
    tag = "Quality",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Quality record ID")),
    request_body = UpdateQualityRequest,
    responses(
        (status = 200, description = "Quality record updated", body = ApiResponse<QualityRecordDto>),
        (status = 400, description = "Inconsistent counts"),
        (status = 403, description = "Record belongs to another user"),
        (status = 404, description = "Not found")
    )
)]
pub async fn update_quality_record(
    State(services): State<PortalServices>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<UpdateQualityRequest>,
) -> ApiResult<Json<ApiResponse<QualityRecordDto>>> {
    let record = services
        .quality
        .update_record(&session, &id, request.into_changes()?)
        .await?;
    Ok(Json(ApiResponse::success(record.into())))
}

#[utoipa::path(
    delete,
    path = "/api/v1/quality/{id}",
    tag = "Quality",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Quality record ID")),
    responses(
        (status = 200, description = "Quality record deleted", body = ApiResponse<QualityRecordDto>),
        (status = 403, description = "Record belongs to another user"),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete_quality_record(
    State(services): State<PortalServices>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<QualityRecordDto>>> {
    let record = services.quality.delete_record(&session, &id).await?;
    Ok(Json(ApiResponse::success(record.into())))
}
