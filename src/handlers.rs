use crate::{
    AppState,
    auth::{AuthUser, issue_token},
    mailer::{
        self, item_approved_email, item_completed_email, item_pending_email, item_rejected_email,
        new_message_email,
    },
    models::{
        self, AdminDashboardStats, ArchiveItemRequest, Claim, CompleteItemRequest,
        CreateClaimRequest, CreateItemRequest, GoogleLoginRequest, Item, LoginResponse, Message,
        NewMessage, NotificationResponse, PresignedUrlRequest, PresignedUrlResponse,
        RecentItemsResponse, ReplyMessageRequest, ResolveClaimRequest, SendMessageRequest,
        SetVerifiedRequest, ThreadSummary, UpdateItemRequest, UpdateItemStatusRequest,
        UpdateUserRoleRequest, User, email_in_domain,
    },
    storage::is_allowed_image_type,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

// --- Filter Structs ---

/// ItemFilter
///
/// Accepted query parameters for the public browse endpoint (GET /items).
/// Used by Axum's Query extractor to safely bind HTTP query parameters.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct ItemFilter {
    /// Optional filter: 'lost' or 'found'.
    pub item_type: Option<String>,
    /// Optional category filter.
    pub category: Option<String>,
    /// Optional search string matched against title/description/location.
    pub search: Option<String>,
}

/// StoryFilter
///
/// Query parameters for the success stories listing.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct StoryFilter {
    pub category: Option<String>,
    pub search: Option<String>,
}

/// StatusFilter
///
/// Status filter shared by the admin item and claim queues.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct StatusFilter {
    pub status: Option<String>,
}

// --- Google OAuth Wire Structs ---

/// Minimal struct to deserialize Google's token endpoint response; only the
/// access token is needed for the userinfo lookup.
#[derive(Deserialize)]
struct GoogleTokenResponse {
    access_token: String,
}

/// The subset of Google's userinfo payload the portal cares about.
#[derive(Deserialize)]
struct GoogleUserInfo {
    email: String,
    name: Option<String>,
    picture: Option<String>,
}

// --- Auth Handlers ---

/// get_google_auth_url
///
/// [Public Route] Returns the Google consent URL the frontend should redirect to.
/// Centralizing the URL construction keeps the client id and redirect URL out of
/// frontend configuration.
#[utoipa::path(
    get,
    path = "/auth/google/url",
    responses((status = 200, description = "Consent URL"))
)]
pub async fn get_google_auth_url(State(state): State<AppState>) -> Json<serde_json::Value> {
    let url = reqwest::Url::parse_with_params(
        "https://accounts.google.com/o/oauth2/v2/auth",
        &[
            ("client_id", state.config.google_client_id.as_str()),
            ("redirect_uri", state.config.oauth_redirect_url.as_str()),
            ("response_type", "code"),
            ("scope", "openid email profile"),
        ],
    )
    .map(|u| u.to_string())
    .unwrap_or_default();

    Json(serde_json::json!({ "auth_url": url }))
}

/// login_google
///
/// [Public Route] Completes the institutional sign-in flow via Google OAuth.
///
/// *Flow*: Exchanges the authorization code at Google's token endpoint, fetches the
/// user's profile from the userinfo endpoint, and enforces the **institutional email
/// gate** before creating/refreshing the local account and issuing a session JWT.
/// The OAuth protocol itself is entirely Google's; this handler is only the glue.
#[utoipa::path(
    post,
    path = "/auth/google",
    request_body = GoogleLoginRequest,
    responses(
        (status = 200, description = "Signed in", body = LoginResponse),
        (status = 400, description = "Code rejected by Google"),
        (status = 401, description = "Email outside the institutional domain")
    )
)]
pub async fn login_google(
    State(state): State<AppState>,
    Json(payload): Json<GoogleLoginRequest>,
) -> Result<Json<LoginResponse>, StatusCode> {
    let client = reqwest::Client::new();

    // Step 1: Exchange the authorization code for an access token.
    let token_response = client
        .post("https://oauth2.googleapis.com/token")
        .form(&[
            ("client_id", state.config.google_client_id.as_str()),
            ("client_secret", state.config.google_client_secret.as_str()),
            ("code", payload.code.as_str()),
            ("grant_type", "authorization_code"),
            ("redirect_uri", state.config.oauth_redirect_url.as_str()),
        ])
        .send()
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    if !token_response.status().is_success() {
        // Google rejects expired, reused or forged codes.
        return Err(StatusCode::BAD_REQUEST);
    }

    let token = token_response
        .json::<GoogleTokenResponse>()
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    // Step 2: Resolve the account identity from the userinfo endpoint.
    let userinfo = client
        .get("https://www.googleapis.com/oauth2/v3/userinfo")
        .bearer_auth(&token.access_token)
        .send()
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .json::<GoogleUserInfo>()
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    // Step 3: Institutional email gate. Outsiders never get an account.
    if !email_in_domain(&userinfo.email, &state.config.allowed_email_domain) {
        tracing::warn!("Rejected sign-in from non-institutional email");
        return Err(StatusCode::UNAUTHORIZED);
    }

    // Step 4: Mirror the account locally. Institutional members arrive verified.
    let user = state
        .repo
        .upsert_oauth_user(
            &userinfo.email,
            userinfo.name.as_deref().unwrap_or(&userinfo.email),
            userinfo.picture,
            "verified",
            true,
        )
        .await;

    // Step 5: Issue the portal's own session token.
    let token = issue_token(user.id, &state.config.jwt_secret)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(LoginResponse { token, user }))
}

// --- Public Item Handlers ---

/// get_items
///
/// [Public Route] The active browse list with filtering and search.
///
/// *Security*: The repository applies the visibility invariant **unconditionally**
/// (approved, not archived, still open) to prevent data leakage to anonymous users,
/// ensuring Defense-in-Depth.
#[utoipa::path(
    get,
    path = "/items",
    params(ItemFilter),
    responses((status = 200, description = "List filtered items", body = [Item]))
)]
pub async fn get_items(
    State(state): State<AppState>,
    Query(filter): Query<ItemFilter>,
) -> Json<Vec<models::Item>> {
    let items = state
        .repo
        .get_items(filter.item_type, filter.category, filter.search)
        .await;
    Json(items)
}

/// get_recent_items
///
/// [Public Route] Home-page payload: the newest approved listings of each type
/// plus the most recent success stories.
#[utoipa::path(
    get,
    path = "/items/recent",
    responses((status = 200, description = "Recent items", body = RecentItemsResponse))
)]
pub async fn get_recent_items(State(state): State<AppState>) -> Json<RecentItemsResponse> {
    Json(state.repo.get_recent_items().await)
}

/// get_item_details
///
/// [Public Route] Retrieves a single item by ID. The repository only releases
/// approved, non-archived rows on this path.
#[utoipa::path(
    get,
    path = "/items/{id}",
    params(("id" = Uuid, Path, description = "Item ID")),
    responses((status = 200, description = "Found", body = Item))
)]
pub async fn get_item_details(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<models::Item>, StatusCode> {
    match state.repo.get_public_item(id).await {
        Some(item) => Ok(Json(item)),
        // Not found OR not publicly visible — indistinguishable on purpose.
        None => Err(StatusCode::NOT_FOUND),
    }
}

/// get_success_stories
///
/// [Public Route] Completed items (claimed/recovered), newest resolution first.
#[utoipa::path(
    get,
    path = "/items/success-stories",
    params(StoryFilter),
    responses((status = 200, description = "Success stories", body = [Item]))
)]
pub async fn get_success_stories(
    State(state): State<AppState>,
    Query(filter): Query<StoryFilter>,
) -> Json<Vec<models::Item>> {
    let items = state
        .repo
        .get_success_stories(filter.category, filter.search)
        .await;
    Json(items)
}

// --- Authenticated User Handlers ---

/// get_me
///
/// [Authenticated Route] Provides the authenticated user's full profile record.
#[utoipa::path(
    get,
    path = "/me",
    responses((status = 200, description = "Profile", body = User))
)]
pub async fn get_me(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<User>, StatusCode> {
    state
        .repo
        .get_user(id)
        .await
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

/// get_my_items
///
/// [Authenticated Route] Lists all items owned by the requesting user,
/// including pending, rejected and archived ones.
#[utoipa::path(
    get,
    path = "/me/items",
    responses((status = 200, description = "My Items", body = [Item]))
)]
pub async fn get_my_items(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Json<Vec<models::Item>> {
    let items = state.repo.get_my_items(id).await;
    Json(items)
}

/// create_item
///
/// [Authenticated Route] Handles the submission of a new lost/found listing.
/// The item enters the moderation queue (`status = pending`); a confirmation
/// email is dispatched to the poster in the background.
///
/// *Authorization*: posting is reserved for verified institutional accounts.
#[utoipa::path(
    post,
    path = "/items",
    request_body = CreateItemRequest,
    responses(
        (status = 200, description = "Submitted", body = Item),
        (status = 403, description = "Not a verified user"),
        (status = 422, description = "Invalid field values")
    )
)]
pub async fn create_item(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<models::CreateItemRequest>,
) -> Result<Json<models::Item>, StatusCode> {
    if !auth.can_post_items() {
        return Err(StatusCode::FORBIDDEN);
    }

    if !models::is_valid_item_type(&payload.item_type)
        || !models::is_valid_category(&payload.category)
        || payload.title.trim().is_empty()
        || payload.description.trim().is_empty()
        || payload.location.trim().is_empty()
    {
        return Err(StatusCode::UNPROCESSABLE_ENTITY);
    }

    // The lost/found date cannot be in the future.
    if payload.date > chrono::Utc::now().date_naive() {
        return Err(StatusCode::UNPROCESSABLE_ENTITY);
    }

    let item = state.repo.create_item(payload, auth.id).await;

    let (subject, body) = item_pending_email(&item, &auth.email);
    mailer::send_in_background(state.mailer.clone(), auth.email.clone(), subject, body);

    Ok(Json(item))
}

/// update_item
///
/// [Authenticated Route] Allows a poster to modify their own listing.
///
/// *Authorization*: the repository enforces the **Owner-Only** check and refuses
/// edits to archived items. Returns 404 whether the item is missing, not owned,
/// or archived.
#[utoipa::path(
    put,
    path = "/items/{id}",
    request_body = UpdateItemRequest,
    responses((status = 200, description = "Updated", body = Item))
)]
pub async fn update_item(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateItemRequest>,
) -> Result<Json<models::Item>, StatusCode> {
    if let Some(category) = &payload.category {
        if !models::is_valid_category(category) {
            return Err(StatusCode::UNPROCESSABLE_ENTITY);
        }
    }
    if let Some(date) = payload.date {
        if date > chrono::Utc::now().date_naive() {
            return Err(StatusCode::UNPROCESSABLE_ENTITY);
        }
    }

    match state.repo.update_item(id, user_id, payload).await {
        Some(item) => Ok(Json(item)),
        None => Err(StatusCode::NOT_FOUND),
    }
}

/// delete_item
///
/// [Authenticated Route] Allows a poster to delete their own listing.
/// Completed items are success stories and must remain on record, so the
/// request is rejected with 409 for them.
#[utoipa::path(
    delete,
    path = "/items/{id}",
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found or Not Owner"),
        (status = 409, description = "Completed items cannot be deleted")
    )
)]
pub async fn delete_item(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> StatusCode {
    // Distinguish "protected success story" from "not yours/not found" so the
    // client can explain the refusal.
    if let Some(item) = state.repo.get_item(id).await {
        if item.posted_by == user_id && !item.can_be_deleted() {
            return StatusCode::CONFLICT;
        }
    }

    if state.repo.delete_item(id, user_id).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

/// complete_item
///
/// [Authenticated Route] Marks an approved item claimed/recovered, turning it
/// into a success story and removing it from the active browse list.
///
/// *Authorization*: owner or admin. The repository's WHERE clause enforces the
/// state machine guard (approved, still open, not archived); a request that
/// loses the race affects zero rows and returns 409.
#[utoipa::path(
    post,
    path = "/items/{id}/complete",
    request_body = CompleteItemRequest,
    responses(
        (status = 200, description = "Completed", body = Item),
        (status = 403, description = "Not owner or admin"),
        (status = 409, description = "Item not in a completable state"),
        (status = 422, description = "Invalid completion state")
    )
)]
pub async fn complete_item(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CompleteItemRequest>,
) -> Result<Json<models::Item>, StatusCode> {
    if !models::is_valid_completion(&payload.completion) {
        return Err(StatusCode::UNPROCESSABLE_ENTITY);
    }

    let item = state
        .repo
        .get_item(id)
        .await
        .ok_or(StatusCode::NOT_FOUND)?;

    if item.posted_by != auth.id && !auth.is_admin() {
        return Err(StatusCode::FORBIDDEN);
    }

    // When the claimant's email maps to a portal account, link it so their
    // profile shows up next to the success story.
    let claimed_by = match payload.completion_email.as_deref() {
        Some(email) => state.repo.get_user_by_email(email).await.map(|u| u.id),
        None => None,
    };

    let completed = state
        .repo
        .complete_item(
            id,
            &payload.completion,
            payload.completion_name,
            payload.completion_email,
            claimed_by,
        )
        .await
        .ok_or(StatusCode::CONFLICT)?;

    // Status-change email to the poster, fire-and-forget.
    if let Some(poster) = state.repo.get_user(completed.posted_by).await {
        let (subject, body) = item_completed_email(&completed, &poster.full_name);
        mailer::send_in_background(state.mailer.clone(), poster.email, subject, body);
    }

    Ok(Json(completed))
}

/// get_presigned_url
///
/// [Authenticated Route] Generates a temporary, secure URL for direct
/// client-to-cloud image upload.
///
/// *Security*: The URL is short-lived (10 minutes max), constrained to the
/// specified `file_type`, and uses a unique, cryptographically secure object key
/// (UUID). Only the image MIME types of the posting guidelines are accepted; GIF
/// uploads are rejected even when renamed, since the content type is enforced by
/// the signature.
#[utoipa::path(
    post,
    path = "/upload/presigned",
    request_body = PresignedUrlRequest,
    responses(
        (status = 200, description = "URL", body = PresignedUrlResponse),
        (status = 415, description = "Unsupported image type")
    )
)]
pub async fn get_presigned_url(
    AuthUser { id: _user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<PresignedUrlRequest>,
) -> impl IntoResponse {
    if !is_allowed_image_type(&payload.file_type) {
        return (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "Only JPEG, PNG, WebP and AVIF images are allowed",
        )
            .into_response();
    }

    // Generate a unique, structured object key (e.g., 'uploads/UUID.ext').
    let extension = std::path::Path::new(&payload.filename)
        .extension()
        .and_then(std::ffi::OsStr::to_str)
        .unwrap_or("bin");
    let unique_id = Uuid::new_v4();
    let object_key = format!("uploads/{}.{}", unique_id, extension);

    match state
        .storage
        // Delegate key generation and mime-type constraint application to the Storage Service.
        .get_presigned_upload_url(&object_key, &payload.file_type)
        .await
    {
        Ok(url) => {
            let response = PresignedUrlResponse {
                upload_url: url,
                resource_key: object_key,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => {
            // Log the underlying storage error for debugging but return a generic internal error.
            tracing::error!("Storage Error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed").into_response()
        }
    }
}

// --- Messaging Handlers ---

/// send_message
///
/// [Authenticated Route] Opens a message thread with the poster of a publicly
/// visible item. Dispatches both an in-app notification and an email notice to
/// the recipient.
#[utoipa::path(
    post,
    path = "/items/{id}/messages",
    request_body = SendMessageRequest,
    responses(
        (status = 200, description = "Sent", body = Message),
        (status = 400, description = "Cannot message yourself"),
        (status = 404, description = "Item not visible"),
        (status = 422, description = "Empty subject or body")
    )
)]
pub async fn send_message(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(item_id): Path<Uuid>,
    Json(payload): Json<SendMessageRequest>,
) -> Result<Json<models::Message>, StatusCode> {
    // Threads can only start on publicly visible items.
    let item = state
        .repo
        .get_public_item(item_id)
        .await
        .ok_or(StatusCode::NOT_FOUND)?;

    if item.posted_by == auth.id {
        return Err(StatusCode::BAD_REQUEST);
    }

    if payload.subject.trim().is_empty() || payload.body.trim().is_empty() {
        return Err(StatusCode::UNPROCESSABLE_ENTITY);
    }

    let message = state
        .repo
        .create_message(NewMessage {
            item_id,
            sender_id: auth.id,
            recipient_id: item.posted_by,
            subject: payload.subject,
            body: payload.body,
            sender_phone: payload.sender_phone.unwrap_or_default(),
            image_key: payload.image_key,
            parent_id: None,
        })
        .await;

    state
        .repo
        .add_notification(
            item.posted_by,
            auth.id,
            item_id,
            "message_received",
            &format!("New message about \"{}\"", item.title),
        )
        .await;

    if let Some(recipient) = state.repo.get_user(item.posted_by).await {
        let (subject, body) = new_message_email(
            &item.title,
            &auth.email,
            &message.subject,
            &state.config.base_url,
        );
        mailer::send_in_background(state.mailer.clone(), recipient.email, subject, body);
    }

    Ok(Json(message))
}

/// reply_message
///
/// [Authenticated Route] Replies within an existing thread. The recipient is
/// always the other participant; replying to a reply is normalized onto the
/// thread root.
#[utoipa::path(
    post,
    path = "/messages/{id}/reply",
    request_body = ReplyMessageRequest,
    responses(
        (status = 200, description = "Sent", body = Message),
        (status = 403, description = "Not a participant"),
        (status = 404, description = "Thread not found")
    )
)]
pub async fn reply_message(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
    Json(payload): Json<ReplyMessageRequest>,
) -> Result<Json<models::Message>, StatusCode> {
    let target = state
        .repo
        .get_message(message_id)
        .await
        .ok_or(StatusCode::NOT_FOUND)?;

    // Both participants are identical across the thread, so the targeted
    // message is sufficient for the access check.
    if target.sender_id != auth.id && target.recipient_id != auth.id {
        return Err(StatusCode::FORBIDDEN);
    }

    if payload.body.trim().is_empty() {
        return Err(StatusCode::UNPROCESSABLE_ENTITY);
    }

    let root_id = target.parent_id.unwrap_or(target.id);
    let recipient_id = if target.sender_id == auth.id {
        target.recipient_id
    } else {
        target.sender_id
    };

    let message = state
        .repo
        .create_message(NewMessage {
            item_id: target.item_id,
            sender_id: auth.id,
            recipient_id,
            subject: format!("Re: {}", target.subject),
            body: payload.body,
            sender_phone: String::new(),
            image_key: payload.image_key,
            parent_id: Some(root_id),
        })
        .await;

    if let Some(item) = state.repo.get_item(target.item_id).await {
        state
            .repo
            .add_notification(
                recipient_id,
                auth.id,
                item.id,
                "message_received",
                &format!("New reply about \"{}\"", item.title),
            )
            .await;

        if let Some(recipient) = state.repo.get_user(recipient_id).await {
            let (subject, body) = new_message_email(
                &item.title,
                &auth.email,
                &message.subject,
                &state.config.base_url,
            );
            mailer::send_in_background(state.mailer.clone(), recipient.email, subject, body);
        }
    }

    Ok(Json(message))
}

/// get_inbox
///
/// [Authenticated Route] The caller's message threads with unread counts,
/// excluding threads they soft-deleted.
#[utoipa::path(
    get,
    path = "/messages",
    responses((status = 200, description = "Inbox", body = [ThreadSummary]))
)]
pub async fn get_inbox(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Json<Vec<ThreadSummary>> {
    Json(state.repo.get_inbox(id).await)
}

/// get_thread
///
/// [Authenticated Route] The full conversation for a thread.
///
/// *Authorization*: a thread is visible only to its two participants or an admin.
#[utoipa::path(
    get,
    path = "/messages/{id}/thread",
    responses(
        (status = 200, description = "Thread", body = [Message]),
        (status = 403, description = "Not a participant")
    )
)]
pub async fn get_thread(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
) -> Result<Json<Vec<models::Message>>, StatusCode> {
    let target = state
        .repo
        .get_message(message_id)
        .await
        .ok_or(StatusCode::NOT_FOUND)?;

    if target.sender_id != auth.id && target.recipient_id != auth.id && !auth.is_admin() {
        return Err(StatusCode::FORBIDDEN);
    }

    let root_id = target.parent_id.unwrap_or(target.id);
    Ok(Json(state.repo.get_thread(root_id).await))
}

/// mark_message_read
///
/// [Authenticated Route] Recipient-only read receipt.
#[utoipa::path(
    post,
    path = "/messages/{id}/read",
    responses(
        (status = 200, description = "Marked as read"),
        (status = 404, description = "Not Found or Not the Recipient")
    )
)]
pub async fn mark_message_read(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> StatusCode {
    if state.repo.mark_message_read(id, user_id).await {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    }
}

/// delete_thread
///
/// [Authenticated Route] Soft-deletes a thread from the caller's inbox only;
/// the other participant keeps their copy.
#[utoipa::path(
    delete,
    path = "/messages/{id}",
    responses(
        (status = 204, description = "Deleted from your view"),
        (status = 404, description = "Not Found or Not a Participant")
    )
)]
pub async fn delete_thread(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> StatusCode {
    if state.repo.delete_thread_for_user(id, user_id).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

// --- Claim Handlers ---

/// create_claim
///
/// [Authenticated Route] Files a claim on a visible, still-open item.
///
/// *Idempotency*: the (item, claimant) unique key enforces **one claim per user
/// per item**; a duplicate returns 409 Conflict.
#[utoipa::path(
    post,
    path = "/items/{id}/claims",
    request_body = CreateClaimRequest,
    responses(
        (status = 200, description = "Claim filed", body = Claim),
        (status = 400, description = "Cannot claim your own item"),
        (status = 403, description = "Not a verified user"),
        (status = 409, description = "Duplicate claim or item no longer open")
    )
)]
pub async fn create_claim(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(item_id): Path<Uuid>,
    Json(payload): Json<CreateClaimRequest>,
) -> Result<Json<models::Claim>, StatusCode> {
    if !auth.can_post_items() {
        return Err(StatusCode::FORBIDDEN);
    }

    let item = state
        .repo
        .get_public_item(item_id)
        .await
        .ok_or(StatusCode::NOT_FOUND)?;

    if item.posted_by == auth.id {
        return Err(StatusCode::BAD_REQUEST);
    }
    if item.is_success_story() {
        return Err(StatusCode::CONFLICT);
    }
    if payload.claim_message.trim().is_empty() {
        return Err(StatusCode::UNPROCESSABLE_ENTITY);
    }

    let claim = state
        .repo
        .create_claim(item_id, auth.id, payload)
        .await
        // None means the unique key fired: this user already claimed this item.
        .ok_or(StatusCode::CONFLICT)?;

    state
        .repo
        .add_notification(
            item.posted_by,
            auth.id,
            item_id,
            "claim_received",
            &format!("New claim received on \"{}\"", item.title),
        )
        .await;

    Ok(Json(claim))
}

/// get_item_claims
///
/// [Authenticated Route] Claims filed against an item, restricted to the item's
/// poster or an admin.
#[utoipa::path(
    get,
    path = "/items/{id}/claims",
    responses(
        (status = 200, description = "Claims", body = [Claim]),
        (status = 403, description = "Not owner or admin")
    )
)]
pub async fn get_item_claims(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(item_id): Path<Uuid>,
) -> Result<Json<Vec<models::Claim>>, StatusCode> {
    let item = state
        .repo
        .get_item(item_id)
        .await
        .ok_or(StatusCode::NOT_FOUND)?;

    if item.posted_by != auth.id && !auth.is_admin() {
        return Err(StatusCode::FORBIDDEN);
    }

    Ok(Json(state.repo.get_item_claims(item_id).await))
}

// --- Notification Handlers ---

/// get_notifications
///
/// [Authenticated Route] Retrieves the recipient user's list of notifications.
#[utoipa::path(
    get,
    path = "/notifications",
    responses((status = 200, description = "My Notifications", body = [NotificationResponse]))
)]
pub async fn get_notifications(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Json<Vec<models::NotificationResponse>> {
    let notifs = state.repo.get_notifications(id).await;
    Json(notifs)
}

/// mark_notification_read
///
/// [Authenticated Route] Marks a specific notification as `is_read=true`.
///
/// *Ownership*: The repository method ensures the notification belongs to the authenticated user.
#[utoipa::path(
    patch,
    path = "/notifications/{id}/read",
    params(("id" = Uuid, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Marked as read"),
        (status = 404, description = "Not Found or Not Yours")
    )
)]
pub async fn mark_notification_read(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> StatusCode {
    if state.repo.mark_notification_read(id, user_id).await {
        StatusCode::OK
    } else {
        // 404 indicates the notification did not exist or did not belong to the user.
        StatusCode::NOT_FOUND
    }
}

// --- Admin Handlers ---

/// get_admin_stats
///
/// [Admin Route] Retrieves core application statistics for the dashboard.
///
/// *Authorization*: Explicitly checks that the `role` is "admin".
#[utoipa::path(
    get,
    path = "/admin/stats",
    responses((status = 200, description = "Stats", body = AdminDashboardStats))
)]
pub async fn get_admin_stats(
    AuthUser { role, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<AdminDashboardStats>, StatusCode> {
    if role != "admin" {
        return Err(StatusCode::FORBIDDEN);
    }
    Ok(Json(state.repo.get_stats().await))
}

/// get_admin_items
///
/// [Admin Route] Retrieves items regardless of visibility, pending first.
/// `?status=pending` is the moderation queue; `?status=archived` is the archive.
#[utoipa::path(
    get,
    path = "/admin/items",
    params(StatusFilter),
    responses((status = 200, description = "All items", body = [Item]))
)]
pub async fn get_admin_items(
    AuthUser { role, .. }: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<StatusFilter>,
) -> Result<Json<Vec<models::Item>>, StatusCode> {
    if role != "admin" {
        return Err(StatusCode::FORBIDDEN);
    }
    Ok(Json(state.repo.get_all_items(filter.status).await))
}

/// update_item_status
///
/// [Admin Route] The moderation verdict: approve or reject a pending item.
///
/// *RBAC*: strict enforcement of the "admin" role before calling the repository.
/// The pending-only guard lives in the repository WHERE clause; verdicts on
/// already-moderated items return 409.
#[utoipa::path(
    put,
    path = "/admin/items/{id}/status",
    params(("id" = Uuid, Path, description = "Item ID")),
    request_body = UpdateItemStatusRequest,
    responses(
        (status = 200, description = "Moderated", body = Item),
        (status = 409, description = "Item is not pending")
    )
)]
pub async fn update_item_status(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateItemStatusRequest>,
) -> Result<Json<models::Item>, StatusCode> {
    if !auth.is_admin() {
        return Err(StatusCode::FORBIDDEN);
    }

    let status = if payload.approve {
        models::STATUS_APPROVED
    } else {
        models::STATUS_REJECTED
    };

    let item = match state.repo.set_item_status(id, status, auth.id).await {
        Some(item) => item,
        None => {
            // Zero rows: either the item is gone or it already left `pending`.
            return match state.repo.get_item(id).await {
                Some(_) => Err(StatusCode::CONFLICT),
                None => Err(StatusCode::NOT_FOUND),
            };
        }
    };

    let notification_type = if payload.approve {
        "item_approved"
    } else {
        "item_rejected"
    };
    state
        .repo
        .add_notification(
            item.posted_by,
            auth.id,
            item.id,
            notification_type,
            &format!("Your item \"{}\" has been {}", item.title, status),
        )
        .await;

    if let Some(poster) = state.repo.get_user(item.posted_by).await {
        let (subject, body) = if payload.approve {
            item_approved_email(&item, &poster.full_name, &state.config.base_url)
        } else {
            item_rejected_email(&item, &poster.full_name)
        };
        mailer::send_in_background(state.mailer.clone(), poster.email, subject, body);
    }

    Ok(Json(item))
}

/// archive_item
///
/// [Admin Route] Archives an item from any state with a mandatory reason code.
/// Archived items disappear from every public surface until restored.
#[utoipa::path(
    post,
    path = "/admin/items/{id}/archive",
    request_body = ArchiveItemRequest,
    responses(
        (status = 200, description = "Archived", body = Item),
        (status = 409, description = "Already archived"),
        (status = 422, description = "Unknown reason code")
    )
)]
pub async fn archive_item(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ArchiveItemRequest>,
) -> Result<Json<models::Item>, StatusCode> {
    if !auth.is_admin() {
        return Err(StatusCode::FORBIDDEN);
    }
    if !models::is_valid_archive_reason(&payload.reason) {
        return Err(StatusCode::UNPROCESSABLE_ENTITY);
    }

    let notes = payload.notes.unwrap_or_default();
    let item = match state
        .repo
        .archive_item(id, auth.id, &payload.reason, &notes)
        .await
    {
        Some(item) => item,
        None => {
            return match state.repo.get_item(id).await {
                Some(_) => Err(StatusCode::CONFLICT),
                None => Err(StatusCode::NOT_FOUND),
            };
        }
    };

    state
        .repo
        .add_notification(
            item.posted_by,
            auth.id,
            item.id,
            "item_archived",
            &format!("Your item \"{}\" has been archived", item.title),
        )
        .await;

    Ok(Json(item))
}

/// restore_item
///
/// [Admin Route] Clears the archive flag; the item resumes its prior moderation
/// and completion state.
#[utoipa::path(
    post,
    path = "/admin/items/{id}/restore",
    responses(
        (status = 200, description = "Restored", body = Item),
        (status = 409, description = "Item is not archived")
    )
)]
pub async fn restore_item(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<models::Item>, StatusCode> {
    if !auth.is_admin() {
        return Err(StatusCode::FORBIDDEN);
    }

    match state.repo.restore_item(id).await {
        Some(item) => Ok(Json(item)),
        None => match state.repo.get_item(id).await {
            Some(_) => Err(StatusCode::CONFLICT),
            None => Err(StatusCode::NOT_FOUND),
        },
    }
}

/// delete_item_admin
///
/// [Admin Route] Force-deletes any item, ignoring ownership and completion.
#[utoipa::path(
    delete,
    path = "/admin/items/{id}",
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_item_admin(
    AuthUser { role, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> StatusCode {
    if role != "admin" {
        return StatusCode::FORBIDDEN;
    }
    if state.repo.delete_item_admin(id).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

/// get_admin_claims
///
/// [Admin Route] The claims queue, optionally filtered by status.
#[utoipa::path(
    get,
    path = "/admin/claims",
    params(StatusFilter),
    responses((status = 200, description = "Claims", body = [Claim]))
)]
pub async fn get_admin_claims(
    AuthUser { role, .. }: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<StatusFilter>,
) -> Result<Json<Vec<models::Claim>>, StatusCode> {
    if role != "admin" {
        return Err(StatusCode::FORBIDDEN);
    }
    Ok(Json(state.repo.get_claims(filter.status).await))
}

/// resolve_claim
///
/// [Admin Route] Resolves a pending claim. Approval also marks the item claimed
/// (recording the claimant) and notifies both sides; rejection notifies the
/// claimant only.
#[utoipa::path(
    put,
    path = "/admin/claims/{id}",
    request_body = ResolveClaimRequest,
    responses(
        (status = 200, description = "Resolved", body = Claim),
        (status = 409, description = "Claim already resolved")
    )
)]
pub async fn resolve_claim(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<models::ResolveClaimRequest>,
) -> Result<Json<models::Claim>, StatusCode> {
    if !auth.is_admin() {
        return Err(StatusCode::FORBIDDEN);
    }

    let claim = match state.repo.resolve_claim(id, auth.id, payload.approve).await {
        Some(claim) => claim,
        None => {
            return match state.repo.get_claim(id).await {
                Some(_) => Err(StatusCode::CONFLICT),
                None => Err(StatusCode::NOT_FOUND),
            };
        }
    };

    if payload.approve {
        let claimant = state.repo.get_user(claim.claimed_by).await;
        let completion_email = claimant.as_ref().map(|u| u.email.clone());
        let completion_name = claimant.as_ref().map(|u| u.full_name.clone());

        // Approved claim drives the item's completion transition.
        let completed = state
            .repo
            .complete_item(
                claim.item_id,
                models::COMPLETION_CLAIMED,
                completion_name,
                completion_email,
                Some(claim.claimed_by),
            )
            .await;

        state
            .repo
            .add_notification(
                claim.claimed_by,
                auth.id,
                claim.item_id,
                "claim_approved",
                "Your claim has been approved",
            )
            .await;

        if let Some(item) = completed {
            if let Some(poster) = state.repo.get_user(item.posted_by).await {
                let (subject, body) = item_completed_email(&item, &poster.full_name);
                mailer::send_in_background(state.mailer.clone(), poster.email, subject, body);
            }
        }
    } else {
        state
            .repo
            .add_notification(
                claim.claimed_by,
                auth.id,
                claim.item_id,
                "claim_rejected",
                "Your claim has been rejected",
            )
            .await;
    }

    Ok(Json(claim))
}

/// get_admin_users
///
/// [Admin Route] The user directory for role management.
#[utoipa::path(
    get,
    path = "/admin/users",
    responses((status = 200, description = "Users", body = [User]))
)]
pub async fn get_admin_users(
    AuthUser { role, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<User>>, StatusCode> {
    if role != "admin" {
        return Err(StatusCode::FORBIDDEN);
    }
    Ok(Json(state.repo.get_users().await))
}

/// update_user_role
///
/// [Admin Route] Changes a user's role. The verified/admin roles are reserved
/// for institutional-domain accounts.
#[utoipa::path(
    put,
    path = "/admin/users/{id}/role",
    request_body = UpdateUserRoleRequest,
    responses(
        (status = 200, description = "Updated", body = User),
        (status = 422, description = "Unknown role or non-institutional email")
    )
)]
pub async fn update_user_role(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRoleRequest>,
) -> Result<Json<User>, StatusCode> {
    if !auth.is_admin() {
        return Err(StatusCode::FORBIDDEN);
    }
    if !models::is_valid_role(&payload.role) {
        return Err(StatusCode::UNPROCESSABLE_ENTITY);
    }

    let target = state.repo.get_user(id).await.ok_or(StatusCode::NOT_FOUND)?;

    // Elevated roles require an institutional email.
    if matches!(payload.role.as_str(), "verified" | "admin")
        && !email_in_domain(&target.email, &state.config.allowed_email_domain)
    {
        return Err(StatusCode::UNPROCESSABLE_ENTITY);
    }

    state
        .repo
        .set_user_role(id, &payload.role)
        .await
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

/// set_user_verified
///
/// [Admin Route] Toggles the email verification flag on an account.
#[utoipa::path(
    put,
    path = "/admin/users/{id}/verify",
    request_body = SetVerifiedRequest,
    responses((status = 200, description = "Updated", body = User))
)]
pub async fn set_user_verified(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetVerifiedRequest>,
) -> Result<Json<User>, StatusCode> {
    if !auth.is_admin() {
        return Err(StatusCode::FORBIDDEN);
    }

    state
        .repo
        .set_user_verified(id, payload.is_verified)
        .await
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}
