// src/routes.rs

use axum::{
    Json, Router,
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use utoipa::OpenApi;

use crate::{
    handlers::{attempts, auth, catalog, certificate, profile, results},
    models::{
        certificate::CertificateData,
        organization::{CertificateTemplate, Exam, ExamProductCategory, Organization, RecommendedBook},
        question::PublicQuestion,
        session::{ExamPrice, LoginRequest, Session},
        test_result::{
            AttemptResponse, PullSummary, ReviewItem, SubmitAttemptRequest, SubmitAttemptResponse,
            TestResult, UserAnswer,
        },
        user::{UpdateNameRequest, User},
    },
    state::AppState,
    utils::jwt::session_middleware,
};

#[derive(OpenApi)]
#[openapi(
    info(title = "Exam Portal API"),
    components(schemas(
        AttemptResponse,
        CertificateData,
        CertificateTemplate,
        Exam,
        ExamPrice,
        ExamProductCategory,
        LoginRequest,
        Organization,
        PublicQuestion,
        PullSummary,
        RecommendedBook,
        ReviewItem,
        Session,
        SubmitAttemptRequest,
        SubmitAttemptResponse,
        TestResult,
        UpdateNameRequest,
        User,
        UserAnswer,
    ))
)]
pub struct ApiDoc;

/// Assembles the main application router.
///
/// * Public: login, logout, catalog, sample certificate, OpenAPI document.
/// * Everything else sits behind the session guard.
/// * Applies global middleware (Trace, CORS) and, when configured, serves
///   the UI bundle for any other path.
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    let public_routes = Router::new()
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/catalog", get(catalog::get_catalog))
        .route(
            "/api/orgs/{org_id}/certificates/sample",
            get(certificate::get_sample_certificate),
        )
        .route("/api/openapi.json", get(|| async { Json(ApiDoc::openapi()) }));

    let session_routes = Router::new()
        .route("/api/auth/session", get(auth::current_session))
        .route("/api/auth/refresh", post(auth::refresh))
        .route("/api/catalog/reload", post(catalog::reload_catalog))
        .route(
            "/api/orgs/{org_id}/exams/{exam_id}/attempts",
            post(attempts::start),
        )
        .route("/api/attempts/{attempt_id}/submit", post(attempts::submit))
        .route("/api/results", get(results::list_results))
        .route("/api/results/latest", get(results::latest_results))
        .route("/api/results/sync", post(results::pull_results))
        .route("/api/results/{test_id}", get(results::get_result))
        .route(
            "/api/results/{test_id}/sync",
            get(results::sync_status).post(results::retry_sync),
        )
        .route(
            "/api/orgs/{org_id}/certificates/{test_id}",
            get(certificate::get_org_certificate),
        )
        .route(
            "/api/certificates/{test_id}/remote",
            get(certificate::get_remote_certificate),
        )
        .route("/api/profile/name", post(profile::update_name))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            session_middleware,
        ));

    let mut app = Router::new().merge(public_routes).merge(session_routes);

    if let Some(dir) = &state.config.static_dir {
        tracing::info!("Serving UI assets from {}", dir);
        app = app.fallback_service(ServeDir::new(dir));
    }

    app
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
