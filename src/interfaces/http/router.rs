//! API Router with Swagger UI

use axum::{
    extract::FromRef,
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use sea_orm::DatabaseConnection;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use super::common::{ApiResponse, EmptyData, PaginatedResponse};
use super::middleware::{auth_middleware, AuthState};
use super::modules::metrics::{http_metrics_middleware, prometheus_metrics, MetricsState};
use super::modules::{allocations, audit, auth, health, quality, uat, users};
use crate::application::PortalServices;

/// Router state. Handlers pick their part through `FromRef`.
#[derive(Clone)]
pub struct ApiState {
    pub services: PortalServices,
    pub health: health::HealthState,
}

impl FromRef<ApiState> for PortalServices {
    fn from_ref(s: &ApiState) -> Self {
        s.services.clone()
    }
}

impl FromRef<ApiState> for health::HealthState {
    fn from_ref(s: &ApiState) -> Self {
        s.health.clone()
    }
}

/// Security scheme modifier for OpenAPI
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("JWT Bearer token from /api/v1/auth/login"))
                        .build(),
                ),
            );
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        // Health
        health::health_check,
        // Auth
        auth::login,
        auth::register,
        auth::forgot_password,
        auth::reset_password,
        auth::get_current_user,
        auth::change_password,
        // Users
        users::list_users,
        users::user_stats,
        users::list_pending,
        users::get_user,
        users::approve_user,
        users::reject_user,
        users::change_role,
        users::deactivate_user,
        users::reactivate_user,
        // Allocations
        allocations::list_allocations,
        allocations::create_allocation,
        allocations::allocation_stats,
        allocations::get_allocation,
        allocations::update_allocation,
        allocations::close_allocation,
        // UAT
        uat::uat_history,
        uat::record_uat,
        uat::finalize_uat,
        uat::uat_stats,
        // Quality
        quality::list_quality_records,
        quality::create_quality_record,
        quality::quality_stats,
        quality::get_quality_record,
        quality::update_quality_record,
        quality::delete_quality_record,
        // Audit
        audit::list_audit,
        audit::audit_stats,
        audit::compliance_report,
        audit::user_activity,
    ),
    components(
        schemas(
            ApiResponse<String>,
            EmptyData,
            PaginatedResponse<users::UserDto>,
            health::HealthResponse,
            health::ComponentHealth,
            auth::LoginRequest,
            auth::LoginResponse,
            auth::RegisterRequest,
            auth::ForgotPasswordRequest,
            auth::ResetPasswordRequest,
            auth::ChangePasswordRequest,
            auth::MessageResponse,
            users::UserDto,
            users::UserStatsDto,
            users::ChangeRoleRequest,
            allocations::AllocationDto,
            allocations::AllocationStatsDto,
            allocations::CreateAllocationRequest,
            allocations::UpdateAllocationRequest,
            uat::UatRecordDto,
            uat::UatStatsDto,
            uat::RecordUatRequest,
            uat::FinalizeUatRequest,
            quality::QualityRecordDto,
            quality::FailureReasonsDto,
            quality::CreateQualityRequest,
            quality::UpdateQualityRequest,
            quality::QualityStatsDto,
            audit::AuditEntryDto,
            audit::AuditCursorDto,
            audit::AuditPageDto,
            audit::AuditStatsDto,
            audit::ComplianceReportDto,
            audit::UserActivityDto,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Service health"),
        (name = "Authentication", description = "Login, registration, password reset and profile"),
        (name = "Users", description = "Registration review, roles and activation"),
        (name = "Allocations", description = "Engineer allocations to trials"),
        (name = "UAT", description = "UAT rounds per allocation"),
        (name = "Quality", description = "Trial quality matrix"),
        (name = "Audit", description = "Append-only audit trail"),
    ),
    info(
        title = "Test Engineer Portal API",
        version = "1.0.0",
        description = "Allocations, UAT tracking, user approval and audit trail for test engineers"
    )
)]
pub struct ApiDoc;

/// Create the API router with all routes.
///
/// `/metrics` is only mounted when a Prometheus handle is given.
pub fn create_api_router(
    services: PortalServices,
    db: DatabaseConnection,
    prometheus: Option<PrometheusHandle>,
) -> Router {
    let auth_state = AuthState {
        identity: services.identity.clone(),
    };
    let state = ApiState {
        services,
        health: health::HealthState::new(db),
    };

    // Auth routes (public)
    let public_routes = Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/register", post(auth::register))
        .route("/auth/forgot-password", post(auth::forgot_password))
        .route("/auth/reset-password", post(auth::reset_password));

    let protected_routes = Router::new()
        .route("/auth/me", get(auth::get_current_user))
        .route("/auth/change-password", put(auth::change_password))
        // Users
        .route("/users", get(users::list_users))
        .route("/users/stats", get(users::user_stats))
        .route("/users/pending", get(users::list_pending))
        .route("/users/{id}", get(users::get_user))
        .route("/users/{id}/approve", post(users::approve_user))
        .route("/users/{id}/reject", post(users::reject_user))
        .route("/users/{id}/role", put(users::change_role))
        .route("/users/{id}/deactivate", post(users::deactivate_user))
        .route("/users/{id}/reactivate", post(users::reactivate_user))
        // Allocations
        .route(
            "/allocations",
            get(allocations::list_allocations).post(allocations::create_allocation),
        )
        .route("/allocations/stats", get(allocations::allocation_stats))
        .route(
            "/allocations/{id}",
            get(allocations::get_allocation).put(allocations::update_allocation),
        )
        .route("/allocations/{id}/close", post(allocations::close_allocation))
        // UAT
        .route(
            "/allocations/{id}/uat",
            get(uat::uat_history).post(uat::record_uat),
        )
        .route("/allocations/{id}/uat/{round}", put(uat::finalize_uat))
        .route("/uat/stats", get(uat::uat_stats))
        // Quality
        .route(
            "/quality",
            get(quality::list_quality_records).post(quality::create_quality_record),
        )
        .route("/quality/stats", get(quality::quality_stats))
        .route(
            "/quality/{id}",
            get(quality::get_quality_record)
                .put(quality::update_quality_record)
                .delete(quality::delete_quality_record),
        )
        // Audit
        .route("/audit", get(audit::list_audit))
        .route("/audit/stats", get(audit::audit_stats))
        .route("/audit/reports/compliance", get(audit::compliance_report))
        .route("/audit/reports/users/{id}", get(audit::user_activity))
        .route_layer(middleware::from_fn_with_state(auth_state, auth_middleware));

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut router = Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/v1", public_routes.merge(protected_routes))
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));

    if let Some(handle) = prometheus {
        router = router.merge(
            Router::new()
                .route("/metrics", get(prometheus_metrics))
                .with_state(MetricsState { handle }),
        );
    }

    router
        .layer(middleware::from_fn(http_metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::Service;

    use super::*;
    use crate::application::test_support::{seed_user, test_config, RecordingMailer, PASSWORD};
    use crate::domain::{ApprovalState, RepositoryProvider, Role};
    use crate::infrastructure::database::test_database;
    use crate::infrastructure::SeaOrmRepositoryProvider;

    struct TestApi {
        router: Router,
        repos: Arc<dyn RepositoryProvider>,
        services: PortalServices,
    }

    impl TestApi {
        async fn new() -> Self {
            let db = test_database().await;
            let repos: Arc<dyn RepositoryProvider> = Arc::new(SeaOrmRepositoryProvider::new(db.clone()));
            let services = PortalServices::new(
                repos.clone(),
                &test_config(),
                Arc::new(RecordingMailer::default()),
            );
            let router = create_api_router(services.clone(), db, None);
            Self {
                router,
                repos,
                services,
            }
        }

        /// Seed an approved user and return (user id, bearer token).
        async fn user(&self, username: &str, role: Role) -> (String, String) {
            let session = seed_user(&self.repos, username, role, ApprovalState::Approved).await;
            let auth = self.services.identity.login(username, PASSWORD).await.unwrap();
            (session.user_id, auth.token)
        }

        async fn send(
            &self,
            method: &str,
            uri: &str,
            token: Option<&str>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(token) = token {
                builder = builder.header("authorization", format!("Bearer {}", token));
            }
            let req = match body {
                Some(body) => builder
                    .header("content-type", "application/json")
                    .body(Body::from(serde_json::to_vec(&body).unwrap()))
                    .unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            };

            let mut svc = self.router.clone().into_service();
            let resp = svc.call(req).await.unwrap();
            let status = resp.status();
            let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
            let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
            (status, json)
        }
    }

    #[tokio::test]
    async fn health_is_public() {
        let api = TestApi::new().await;
        let (status, body) = api.send("GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["database"]["status"], "ok");
    }

    #[tokio::test]
    async fn protected_routes_need_a_valid_token() {
        let api = TestApi::new().await;

        let (status, body) = api.send("GET", "/api/v1/auth/me", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);

        let (status, _) = api.send("GET", "/api/v1/auth/me", Some("garbage"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (_, token) = api.user("erin", Role::User).await;
        let (status, body) = api.send("GET", "/api/v1/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["username"], "erin");
        assert!(body["data"].get("password_hash").is_none());
    }

    #[tokio::test]
    async fn register_approve_login_over_http() {
        let api = TestApi::new().await;
        let (_, admin) = api.user("admin", Role::Admin).await;

        let registration = json!({
            "username": "alice",
            "email": "alice@example.com",
            "password": "s3cure-pass"
        });
        let (status, body) = api
            .send("POST", "/api/v1/auth/register", None, Some(registration.clone()))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["approval_state"], "pending");
        let alice_id = body["data"]["id"].as_str().unwrap().to_string();

        let (status, _) = api
            .send("POST", "/api/v1/auth/register", None, Some(registration))
            .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let login = json!({"username": "alice", "password": "s3cure-pass"});
        let (status, _) = api
            .send("POST", "/api/v1/auth/login", None, Some(login.clone()))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = api
            .send("POST", &format!("/api/v1/users/{}/approve?role=wizard", alice_id), Some(&admin), None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = api
            .send("POST", &format!("/api/v1/users/{}/approve?role=manager", alice_id), Some(&admin), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["approval_state"], "approved");
        assert_eq!(body["data"]["role"], "manager");

        let (status, body) = api.send("POST", "/api/v1/auth/login", None, Some(login)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["token_type"], "Bearer");
    }

    #[tokio::test]
    async fn invalid_body_is_unprocessable() {
        let api = TestApi::new().await;
        let (status, body) = api
            .send(
                "POST",
                "/api/v1/auth/register",
                None,
                Some(json!({"username": "al", "email": "nope", "password": "s3cure-pass"})),
            )
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn allocation_and_uat_errors_map_to_conflict() {
        let api = TestApi::new().await;
        let (_, manager) = api.user("mia", Role::Manager).await;
        let (erin_id, erin) = api.user("erin", Role::User).await;
        let pending = seed_user(&api.repos, "pat", Role::User, ApprovalState::Pending).await;

        let allocation = |engineer_id: &str| {
            json!({
                "engineer_id": engineer_id,
                "trial_id": "NN-1234",
                "start_date": "2024-01-01",
                "end_date": "2024-03-31",
                "system": "INFORM"
            })
        };

        let (status, _) = api
            .send("POST", "/api/v1/allocations", Some(&manager), Some(allocation(&pending.user_id)))
            .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = api
            .send("POST", "/api/v1/allocations", Some(&erin), Some(allocation(&erin_id)))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = api
            .send("POST", "/api/v1/allocations", Some(&manager), Some(allocation(&erin_id)))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["data"]["id"].as_str().unwrap().to_string();
        let uat_uri = format!("/api/v1/allocations/{}/uat", id);

        let round = json!({"round": 1, "category": "build", "result": "pass"});
        let (status, body) = api.send("POST", &uat_uri, Some(&erin), Some(round.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["result"], "pass");

        let (status, body) = api.send("POST", &uat_uri, Some(&erin), Some(round)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["error"].as_str().unwrap().contains("already has a final result"));

        let (status, body) = api.send("GET", &uat_uri, Some(&erin), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 1);

        let (status, _) = api
            .send(
                "POST",
                &uat_uri,
                Some(&erin),
                Some(json!({"round": 2, "category": "nightly", "result": "pass"})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn audit_is_admin_only_and_pages() {
        let api = TestApi::new().await;
        let (_, admin) = api.user("admin", Role::Admin).await;
        let (_, manager) = api.user("mia", Role::Manager).await;

        let (status, _) = api.send("GET", "/api/v1/audit", Some(&manager), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        // admin seed + login, then mia seed + login; page size is 2
        let (status, body) = api.send("GET", "/api/v1/audit", Some(&admin), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["items"].as_array().unwrap().len(), 2);
        let next = &body["data"]["next"];
        let uri = format!(
            "/api/v1/audit?after_timestamp={}&after_id={}",
            next["after_timestamp"].as_str().unwrap().replace('+', "%2B"),
            next["after_id"]
        );

        let (status, body) = api.send("GET", &uri, Some(&admin), None).await;
        assert_eq!(status, StatusCode::OK);
        let items = body["data"]["items"].as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["action"], "create_user");
        assert_eq!(items[0]["actor_username"], "mia");
        assert_eq!(items[1]["action"], "login");

        let (status, body) = api.send("GET", "/api/v1/audit/stats", Some(&admin), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["total"], 4);
    }

    #[tokio::test]
    async fn quality_records_over_http() {
        let api = TestApi::new().await;
        let (_, manager) = api.user("mia", Role::Manager).await;
        let (_, erin) = api.user("erin", Role::User).await;
        let (_, sam) = api.user("sam", Role::User).await;

        let record = json!({
            "trial_id": "NN-1234",
            "phase": "Phase 2",
            "no_of_uat_plans": 2,
            "no_of_rounds": 3,
            "requirement_type": "forms",
            "round": 1,
            "total_requirements": 40,
            "total_failures": 4,
            "failure_reasons": {"spec_issue": 1, "programming_issue": 3}
        });
        let (status, body) = api
            .send("POST", "/api/v1/quality", Some(&erin), Some(record.clone()))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["defect_density"], 10.0);
        let uri = format!("/api/v1/quality/{}", body["data"]["id"].as_str().unwrap());

        let mut listings = record.clone();
        listings["requirement_type"] = json!("listings");
        let (status, _) = api.send("POST", "/api/v1/quality", Some(&erin), Some(listings)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let mut overcounted = record;
        overcounted["total_failures"] = json!(41);
        let (status, _) = api.send("POST", "/api/v1/quality", Some(&erin), Some(overcounted)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = api.send("GET", &uri, Some(&sam), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = api.send("DELETE", &uri, Some(&sam), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = api
            .send("PUT", &uri, Some(&erin), Some(json!({"timeline_adherence": "two weeks late"})))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["timeline_adherence"], "two weeks late");

        let (status, body) = api.send("GET", "/api/v1/quality/stats", Some(&manager), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["total_records"], 1);
        assert_eq!(body["data"]["by_round"]["Round 1"], 1);
        assert_eq!(body["data"]["failure_reasons"]["programming_issue"], 3);

        let (status, body) = api.send("GET", "/api/v1/quality", Some(&sam), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["data"].as_array().unwrap().is_empty());

        let (status, _) = api.send("DELETE", &uri, Some(&manager), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = api.send("GET", &uri, Some(&erin), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn audit_reports_over_http() {
        let api = TestApi::new().await;
        let (admin_id, admin) = api.user("admin", Role::Admin).await;
        let (_, manager) = api.user("mia", Role::Manager).await;

        let (status, _) = api
            .send("GET", "/api/v1/audit/reports/compliance", Some(&manager), None)
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        // admin seed + login, mia seed + login
        let (status, body) = api
            .send("GET", "/api/v1/audit/reports/compliance", Some(&admin), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["total_entries"], 4);
        assert_eq!(body["data"]["active_users"], 2);
        assert_eq!(body["data"]["security_events"], 2);
        assert_eq!(body["data"]["by_action"]["login"], 2);

        let activity = format!("/api/v1/audit/reports/users/{}", admin_id);
        let (status, _) = api
            .send("GET", &format!("{}?days=0", activity), Some(&admin), None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = api.send("GET", &activity, Some(&admin), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["days"], 30);
        assert_eq!(body["data"]["total_activities"], 2);
        assert_eq!(body["data"]["recent"][0]["action"], "login");
    }
}
