use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get, post, put},
};

/// Authenticated Router Module
///
/// Defines the routes accessible to any user who has successfully passed the authentication layer.
/// This module implements all core application features for a signed-in user,
/// including item submission, completion, messaging, claims and image upload.
///
/// Access Control Strategy:
/// Every handler in this module relies on the `AuthUser` extractor middleware being present
/// on the router layer above this module. This guarantees that all handlers receive a
/// validated `AuthUser` struct containing the user's ID, role and verification flag,
/// which is then used for all Owner-Only authorization checks (e.g., in `update_item`
/// and `delete_item`) and the verified-poster gate on submissions.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // POST /upload/presigned
        // Initiates the secure image upload pipeline. Generates a short-lived (10-minute)
        // presigned S3 URL which allows the client to upload the item/message photo
        // directly to the storage service (S3/MinIO), bypassing the application server.
        .route("/upload/presigned", post(handlers::get_presigned_url))
        // GET /me
        // Retrieves the currently authenticated user's profile record.
        .route("/me", get(handlers::get_me))
        // GET /me/items
        // Lists all items owned by the authenticated user, including those still
        // pending review, rejected, or archived.
        .route("/me/items", get(handlers::get_my_items))
        // --- Item Submission & Lifecycle ---
        // POST /items
        // Submits a new listing into the moderation queue. Restricted to verified posters.
        .route("/items", post(handlers::create_item))
        // PUT/DELETE /items/{id}
        // Allows the poster to modify or remove their own listing.
        // Strict ownership check is enforced within the repository layer; completed
        // items (success stories) cannot be deleted.
        .route(
            "/items/{id}",
            put(handlers::update_item).delete(handlers::delete_item),
        )
        // POST /items/{id}/complete
        // Marks an approved item claimed/recovered (owner or admin). The state
        // machine guard lives in the repository WHERE clause.
        .route("/items/{id}/complete", post(handlers::complete_item))
        // --- Messaging System ---
        // POST /items/{id}/messages
        // Opens a thread with the poster of a publicly visible item. Triggers an
        // in-app notification and an email notice to the recipient.
        .route("/items/{id}/messages", post(handlers::send_message))
        // POST /messages/{id}/reply
        // Replies within a thread; participants only.
        .route("/messages/{id}/reply", post(handlers::reply_message))
        // GET /messages
        // The caller's inbox: thread roots with unread counts.
        .route("/messages", get(handlers::get_inbox))
        // GET /messages/{id}/thread
        // The full conversation; visible only to participants or an admin.
        .route("/messages/{id}/thread", get(handlers::get_thread))
        // POST /messages/{id}/read
        // Recipient-only read receipt.
        .route("/messages/{id}/read", post(handlers::mark_message_read))
        // DELETE /messages/{id}
        // Soft-deletes a thread from the caller's view only.
        .route("/messages/{id}", delete(handlers::delete_thread))
        // --- Claims ---
        // POST/GET /items/{id}/claims
        // Files a claim on a visible, open item (one claim per user per item,
        // enforced by the composite unique key on the `claims` table), or lists
        // the claims for the poster/an admin.
        .route(
            "/items/{id}/claims",
            post(handlers::create_claim).get(handlers::get_item_claims),
        )
        // --- Notification System ---
        // GET /notifications
        // Retrieves all pending and past notifications for the authenticated user.
        .route("/notifications", get(handlers::get_notifications))
        // PATCH /notifications/{id}/read
        // Marks a specific notification as processed (`is_read=true`). Uses PATCH for partial update.
        .route(
            "/notifications/{id}/read",
            axum::routing::patch(handlers::mark_notification_read),
        )
}
