use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
    middleware,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod config;
pub mod gate;
pub mod handlers;
pub mod identity;
pub mod models;
pub mod repository;
pub mod session;

// Module for routing segregation (Public, Auth flow, Authenticated, Admin).
pub mod routes;
use routes::{admin, auth, authenticated, public};

// --- Public Re-exports ---

// Makes core state types easily accessible to the main application entry point (main.rs).
pub use config::AppConfig;
pub use gate::{Actor, GateDecision, RouteClass};
pub use identity::{IdentityState, MockIdentity, SupabaseIdentity};
pub use repository::{PostgresRepository, RepositoryState};

/// ApiDoc
///
/// This struct auto-generates the OpenAPI documentation (Swagger JSON) for the application.
/// It aggregates all API paths and data schemas that have been decorated with
/// the `#[utoipa::path]` and `#[derive(utoipa::ToSchema)]` macros.
/// The resulting JSON is served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    // List all public handler functions here for documentation generation.
    paths(
        handlers::auth_callback, handlers::sign_out, handlers::auth_code_error,
        handlers::get_courses, handlers::get_course_details, handlers::get_course_reviews,
        handlers::get_profile, handlers::update_settings, handlers::get_my_reviews,
        handlers::get_my_claims, handlers::create_course, handlers::write_review,
        handlers::submit_claim, handlers::get_admin_stats, handlers::get_admin_reviews,
        handlers::moderate_review, handlers::get_admin_claims, handlers::moderate_claim,
        handlers::get_admin_users, handlers::set_user_role, handlers::delete_user
    ),
    // List all models (schemas) used in the request/response bodies.
    components(
        schemas(
            models::Profile, models::Course, models::Review, models::Claim,
            models::CreateCourseRequest, models::CreateReviewRequest,
            models::CreateClaimRequest, models::UpdateProfileRequest,
            models::ModerationRequest, models::SetRoleRequest,
            models::AdminDashboardStats, models::UserProfile,
        )
    ),
    tags(
        (name = "review-portal", description = "Course Review Marketplace API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Implements the **Unified State Pattern**. This is the single, thread-safe, and immutable
/// container holding all essential application services and configuration.
/// The application state is shared across all incoming requests.
#[derive(Clone)]
pub struct AppState {
    /// Repository Layer: profile store and marketplace persistence.
    pub repo: RepositoryState,
    /// Identity Layer: the hosted identity provider's auth REST client.
    pub identity: IdentityState,
    /// Configuration: the loaded, immutable environment configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// These implementations allow handlers to selectively pull components from the shared AppState.
// This is critical for dependency injection and adhering to the Clean Architecture boundaries.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for IdentityState {
    fn from_ref(app_state: &AppState) -> IdentityState {
        app_state.identity.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the application's entire routing structure, applies global and scoped middleware,
/// and registers the application state.
///
/// The Access Gate wraps the whole router: every request (public, protected,
/// admin, even unrouted 404s) is classified and policy-checked before any
/// handler runs.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        // Documentation: Serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Public Routes: marketplace listings and entry pages.
        .merge(public::public_routes())
        // Auth Flow Routes: callback, sign-out, error page.
        .merge(auth::auth_routes())
        // Authenticated Routes: handlers enforce the session via CurrentUser.
        .merge(authenticated::authenticated_routes())
        // Admin Routes: nested under '/admin'. The Actor check is performed
        // both by the gate (redirect) and inside the handlers (403).
        .nest("/admin", admin::admin_routes())
        // Apply the Unified State to all routes.
        .with_state(state.clone());

    // 3. The Access Gate (applied inside the observability stack, so every
    // decision, redirects included, is traced and correlated).
    let gated_router = base_router.layer(middleware::from_fn_with_state(state, gate::access_gate));

    // 4. Observability and Correlation Layers (Applied outermost/first)
    // This section implements the Production Observability Stack.
    gated_router
        .layer(
            ServiceBuilder::new()
                // 4a. Request ID Generation: Generates a unique UUID for every incoming request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 4b. Request Tracing: Wraps the entire request/response lifecycle in a tracing span.
                // Uses the `trace_span_logger` to include the generated request ID.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 4c. Request ID Propagation: Ensures the generated x-request-id header is
                // returned to the client and injected into subsequent service calls.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 5. CORS Layer (Applied last, allowing all traffic in/out after processing)
        .layer(cors)
}

/// trace_span_logger
///
/// Helper function used by `TraceLayer` to customize the tracing span creation.
/// It extracts the `x-request-id` header (if present) and includes it in the
/// structured logging metadata alongside the HTTP method and URI.
///
/// *Goal*: Ensure every log line for a single request is correlated by a unique ID.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    // The structured log format used by the tracing macros.
    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
