use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
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
pub mod auth;
pub mod config;
pub mod handlers;
pub mod mailer;
pub mod models;
pub mod repository;
pub mod storage;

// Module for routing segregation (Public, Authenticated, Admin).
pub mod routes;
use auth::AuthUser; // The resolved authenticated user identity.
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

// Makes core state types easily accessible to the main application entry point (main.rs).
pub use config::AppConfig;
pub use mailer::{MailerState, MockMailer, SmtpMailer};
pub use repository::{PostgresRepository, RepositoryState};
pub use storage::{MockStorageService, S3StorageClient, StorageState};

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
        handlers::get_google_auth_url, handlers::login_google, handlers::get_items,
        handlers::get_recent_items, handlers::get_item_details, handlers::get_success_stories,
        handlers::get_me, handlers::get_my_items, handlers::create_item, handlers::update_item,
        handlers::delete_item, handlers::complete_item, handlers::get_presigned_url,
        handlers::send_message, handlers::reply_message, handlers::get_inbox,
        handlers::get_thread, handlers::mark_message_read, handlers::delete_thread,
        handlers::create_claim, handlers::get_item_claims, handlers::get_notifications,
        handlers::mark_notification_read, handlers::get_admin_stats, handlers::get_admin_items,
        handlers::update_item_status, handlers::archive_item, handlers::restore_item,
        handlers::delete_item_admin, handlers::get_admin_claims, handlers::resolve_claim,
        handlers::get_admin_users, handlers::update_user_role, handlers::set_user_verified
    ),
    // List all models (schemas) used in the request/response bodies.
    components(
        schemas(
            models::User, models::Item, models::Message, models::ThreadSummary, models::Claim,
            models::CreateItemRequest, models::UpdateItemRequest, models::CompleteItemRequest,
            models::UpdateItemStatusRequest, models::ArchiveItemRequest,
            models::GoogleLoginRequest, models::LoginResponse, models::SendMessageRequest,
            models::ReplyMessageRequest, models::CreateClaimRequest, models::ResolveClaimRequest,
            models::UpdateUserRoleRequest, models::SetVerifiedRequest,
            models::PresignedUrlRequest, models::PresignedUrlResponse,
            models::AdminDashboardStats, models::RecentItemsResponse,
            models::NotificationResponse,
        )
    ),
    tags(
        (name = "hanapp", description = "PalSU HanApp Lost & Found API")
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
    /// Repository Layer: Abstracts database access via the PgPool connection.
    pub repo: RepositoryState,
    /// Storage Layer: Abstracts S3/MinIO access and presigned URL generation.
    pub storage: StorageState,
    /// Mailer Layer: Abstracts outgoing SMTP notification email.
    pub mailer: MailerState,
    /// Configuration: The loaded, immutable environment configuration.
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

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for MailerState {
    fn from_ref(app_state: &AppState) -> MailerState {
        app_state.mailer.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// A middleware function that enforces authentication for the `authenticated_routes`.
///
/// *Mechanism*: It attempts to extract `AuthUser` from the request. Since `AuthUser`
/// implements `FromRequestParts`, if authentication (JWT validation, DB lookup) fails,
/// the extractor immediately rejects the request with a 401 Unauthorized status,
/// preventing execution of the handler. If successful, it allows the request to proceed.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the application's entire routing structure, applies global and scoped middleware,
/// and registers the application state.
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

        // Public Routes: No middleware applied.
        .merge(public::public_routes())

        // Authenticated Routes: Protected by the `auth_middleware`.
        // This implements the first layer of Defense-in-Depth for these routes.
        .merge(
            authenticated::authenticated_routes()
                .route_layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware
                ))
        )

        // Admin Routes: Nested under '/admin' and protected by the same
        // authentication layer. The 'admin' role check is performed *inside* the
        // handlers after the request passes the authentication layer above.
        .nest(
            "/admin",
            admin::admin_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )

        // Apply the Unified State to all routes.
        .with_state(state);

    // 3. Observability and Correlation Layers (Applied outermost/first)
    // This section implements the Production Observability Stack.
    base_router
        .layer(
             ServiceBuilder::new()
                 // 3a. Request ID Generation: Generates a unique UUID for every incoming request.
                 .layer(SetRequestIdLayer::new(
                     x_request_id.clone(),
                     MakeRequestUuid,
                 ))
                 // 3b. Request Tracing: Wraps the entire request/response lifecycle in a tracing span.
                 // Uses the `trace_span_logger` to include the generated request ID.
                 .layer(
                     TraceLayer::new_for_http()
                         .make_span_with(trace_span_logger)
                         .on_response(
                             DefaultOnResponse::new()
                                 .level(Level::INFO)
                                 .latency_unit(tower_http::LatencyUnit::Millis)
                         )
                 )
                 // 3c. Request ID Propagation: Ensures the generated x-request-id header is
                 // returned to the client and injected into subsequent service calls.
                 .layer(PropagateRequestIdLayer::new(x_request_id))
        )
        // 4. CORS Layer (Applied last, allowing all traffic in/out after processing)
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
