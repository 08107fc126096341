use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get, post, put},
};

/// Admin Router Module
///
/// Defines the routes exclusively accessible to users with the 'admin' role.
/// These endpoints provide moderation, archiving, claim resolution, user
/// management and statistical access.
///
/// Access Control:
/// This entire router is mounted behind the authentication middleware, and every
/// handler additionally re-checks `role='admin'` before touching the repository.
/// This two-step check prevents any unauthorized access to critical moderation
/// functions even if the router nesting changes.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin/stats
        // Retrieves core dashboard metrics (items by type, pending queue depth,
        // success stories, archived count, total users).
        .route("/stats", get(handlers::get_admin_stats))
        // GET /admin/items?status=...
        // Lists items regardless of visibility, pending first. `?status=pending`
        // is the moderation queue; `?status=archived` is the archive browser.
        .route("/items", get(handlers::get_admin_items))
        // PUT /admin/items/{id}/status
        // The moderation verdict: approve or reject an item still in `pending`.
        // This is the only transition out of the moderation queue.
        .route("/items/{id}/status", put(handlers::update_item_status))
        // POST /admin/items/{id}/archive
        // Takes an item down from any state, with a mandatory reason code.
        .route("/items/{id}/archive", post(handlers::archive_item))
        // POST /admin/items/{id}/restore
        // Returns an archived item to its prior moderation/completion state.
        .route("/items/{id}/restore", post(handlers::restore_item))
        // DELETE /admin/items/{id}
        // Force-deletes any item (no ownership or completion check).
        .route("/items/{id}", delete(handlers::delete_item_admin))
        // GET /admin/claims?status=...
        // The claims resolution queue.
        .route("/claims", get(handlers::get_admin_claims))
        // PUT /admin/claims/{id}
        // Resolves a pending claim; approval also marks the item claimed.
        .route("/claims/{id}", put(handlers::resolve_claim))
        // GET /admin/users
        // The user directory for role management.
        .route("/users", get(handlers::get_admin_users))
        // PUT /admin/users/{id}/role
        // Role management; elevated roles require an institutional email.
        .route("/users/{id}/role", put(handlers::update_user_role))
        // PUT /admin/users/{id}/verify
        // Toggles the email verification flag.
        .route("/users/{id}/verify", put(handlers::set_user_verified))
}
