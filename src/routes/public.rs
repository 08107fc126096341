use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Defines endpoints that are **unauthenticated** and accessible to any client
/// (anonymous or logged-in). These routes primarily handle read-only data access
/// that has been explicitly approved for public visibility, and the OAuth gateway.
///
/// Security Mandate:
/// All data retrieval handlers in this module (i.e., `/items/*`) must enforce
/// the visibility invariant (approved and not archived) at the Repository level.
/// This prevents anonymous or unauthorized viewing of items pending review,
/// rejected submissions or archived content.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // A simple, unauthenticated endpoint used for monitoring and load balancer checks.
        // Returns "ok" immediately to verify the service is running and responsive.
        .route("/health", get(|| async { "ok" }))
        // GET /auth/google/url
        // Returns the Google consent URL built from the configured OAuth client,
        // keeping client credentials out of frontend configuration.
        .route("/auth/google/url", get(handlers::get_google_auth_url))
        // POST /auth/google
        // OAuth code exchange and institutional email gate. Creates/refreshes the
        // local account and returns a session JWT.
        .route("/auth/google", post(handlers::login_google))
        // GET /items?item_type=...&category=...&search=...
        // The active browse list, supporting type/category filters and full-text search.
        // Critical enforcement of the visibility invariant occurs in the Repository query.
        .route("/items", get(handlers::get_items))
        // GET /items/recent
        // Home-page payload: newest approved lost/found items plus latest success stories.
        .route("/items/recent", get(handlers::get_recent_items))
        // GET /items/success-stories
        // Completed items remain publicly browsable as success stories.
        .route(
            "/items/success-stories",
            get(handlers::get_success_stories),
        )
        // GET /items/{id}
        // Retrieves the detailed view of a single item.
        // Requires a repository-level check that the item is approved and not archived.
        .route("/items/{id}", get(handlers::get_item_details))
}
