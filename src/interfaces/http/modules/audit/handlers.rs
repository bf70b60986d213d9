//! Audit trail handlers

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::Utc;

use super::dto::{
    AuditEntryDto, AuditPageDto, AuditQueryParams, AuditStatsDto, ComplianceParams,
    ComplianceReportDto, UserActivityDto, UserActivityParams,
};
use crate::application::PortalServices;
use crate::domain::Session;
use crate::interfaces::http::common::ApiResponse;
use crate::interfaces::http::error::ApiResult;

#[utoipa::path(
    get,
    path = "/api/v1/audit",
    tag = "Audit",
    security(("bearer_auth" = [])),
    params(AuditQueryParams),
    responses(
        (status = 200, description = "One page of entries ordered by time", body = ApiResponse<AuditPageDto>),
        (status = 403, description = "Missing permission")
    )
)]
pub async fn list_audit(
    State(services): State<PortalServices>,
    Extension(session): Extension<Session>,
    Query(params): Query<AuditQueryParams>,
) -> ApiResult<Json<ApiResponse<AuditPageDto>>> {
    let cursor = params.cursor()?;
    let mut stream = services.audit.query(&session, params.filter()?).await?;
    if let Some(cursor) = cursor {
        stream.resume_after(cursor);
    }

    let entries = stream.next_page().await?;
    let next = if entries.is_empty() {
        None
    } else {
        stream.position().map(Into::into)
    };

    Ok(Json(ApiResponse::success(AuditPageDto {
        items: entries.into_iter().map(AuditEntryDto::from).collect(),
        next,
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/audit/stats",
    tag = "Audit",
    security(("bearer_auth" = [])),
    params(AuditQueryParams),
    responses(
        (status = 200, description = "Counts by action and actor", body = ApiResponse<AuditStatsDto>),
        (status = 403, description = "Missing permission")
    )
)]
pub async fn audit_stats(
    State(services): State<PortalServices>,
    Extension(session): Extension<Session>,
    Query(params): Query<AuditQueryParams>,
) -> ApiResult<Json<ApiResponse<AuditStatsDto>>> {
    let stats = services.audit.statistics(&session, &params.filter()?).await?;
    Ok(Json(ApiResponse::success(stats.into())))
}

#[utoipa::path(
    get,
    path = "/api/v1/audit/reports/compliance",
    tag = "Audit",
    security(("bearer_auth" = [])),
    params(ComplianceParams),
    responses(
        (status = 200, description = "Trail activity over the window", body = ApiResponse<ComplianceReportDto>),
        (status = 400, description = "Window start after its end"),
        (status = 403, description = "Missing permission")
    )
)]
pub async fn compliance_report(
    State(services): State<PortalServices>,
    Extension(session): Extension<Session>,
    Query(params): Query<ComplianceParams>,
) -> ApiResult<Json<ApiResponse<ComplianceReportDto>>> {
    let (from, to) = params.window(Utc::now());
    let report = services.audit.compliance_report(&session, from, to).await?;
    Ok(Json(ApiResponse::success(report.into())))
}

#[utoipa::path(
    get,
    path = "/api/v1/audit/reports/users/{id}",
    tag = "Audit",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "User ID"), UserActivityParams),
    responses(
        (status = 200, description = "The user's recent activity", body = ApiResponse<UserActivityDto>),
        (status = 400, description = "days outside 1-365"),
        (status = 403, description = "Missing permission")
    )
)]
pub async fn user_activity(
    State(services): State<PortalServices>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    Query(params): Query<UserActivityParams>,
) -> ApiResult<Json<ApiResponse<UserActivityDto>>> {
    let report = services.audit.user_activity(&session, &id, params.days).await?;
    Ok(Json(ApiResponse::success(report.into())))
}
