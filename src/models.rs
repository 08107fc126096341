use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Status Vocabulary ---

// Moderation states for an item. New submissions always start as `pending`.
pub const STATUS_PENDING: &str = "pending";
pub const STATUS_APPROVED: &str = "approved";
pub const STATUS_REJECTED: &str = "rejected";

// Completion states. `open` items are actively browsable; `claimed`/`found`
// items are success stories and terminal except for archiving.
pub const COMPLETION_OPEN: &str = "open";
pub const COMPLETION_CLAIMED: &str = "claimed";
pub const COMPLETION_FOUND: &str = "found";

pub const ITEM_CATEGORIES: &[&str] = &[
    "electronics",
    "accessories",
    "documents",
    "clothing",
    "bags",
    "keys",
    "books",
    "sports",
    "other",
];

pub const ARCHIVE_REASONS: &[&str] = &["spam", "inappropriate", "duplicate", "resolved", "other"];

pub const USER_ROLES: &[&str] = &["public", "verified", "admin"];

pub fn is_valid_item_type(value: &str) -> bool {
    matches!(value, "lost" | "found")
}

pub fn is_valid_category(value: &str) -> bool {
    ITEM_CATEGORIES.contains(&value)
}

pub fn is_valid_archive_reason(value: &str) -> bool {
    ARCHIVE_REASONS.contains(&value)
}

/// Valid *target* completion states for the mark-complete operation.
pub fn is_valid_completion(value: &str) -> bool {
    matches!(value, COMPLETION_CLAIMED | COMPLETION_FOUND)
}

pub fn is_valid_role(value: &str) -> bool {
    USER_ROLES.contains(&value)
}

/// email_in_domain
///
/// Checks that `email` belongs to the configured institutional domain
/// (e.g. `psu.palawan.edu.ph`). This is the single gate used both at the
/// OAuth callback and when an admin promotes an account.
pub fn email_in_domain(email: &str, domain: &str) -> bool {
    email
        .rsplit_once('@')
        .map(|(_, d)| d.eq_ignore_ascii_case(domain))
        .unwrap_or(false)
}

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// Represents the user's canonical identity record stored in the `users` table.
/// Accounts are created and refreshed by the Google OAuth callback; the RBAC
/// `role` field and the `is_verified` flag together decide posting rights.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    // The user's primary identifier (institutional email for verified users).
    pub email: String,
    pub full_name: String,
    // The RBAC field: 'public', 'verified' or 'admin'.
    pub role: String,
    pub is_verified: bool,
    pub phone_number: String,
    pub student_id: String,
    // Profile picture URL supplied by Google, if any.
    pub picture_url: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Posting is reserved for verified members of the institution (or admins).
    pub fn can_post_items(&self) -> bool {
        self.is_verified && matches!(self.role.as_str(), "verified" | "admin")
    }

    pub fn is_admin_user(&self) -> bool {
        self.role == "admin"
    }
}

/// Item
///
/// A lost or found listing from the `items` table. This is the primary data
/// structure for the moderation workflow: `status` tracks the moderation
/// state, `completion` tracks the claim/recovery outcome, and the archive
/// fields record admin takedowns. An item is publicly visible only when
/// `status = approved` and it is not archived.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Item {
    pub id: Uuid,
    // FK to users.id (Owner/Poster).
    pub posted_by: Uuid,
    // 'lost' or 'found'.
    pub item_type: String,
    pub title: String,
    pub description: String,
    pub category: String,
    // Where the item was lost or found.
    pub location: String,
    // When the item was lost or found. Never in the future.
    #[ts(type = "string")]
    pub date: NaiveDate,
    // S3 key for the optional photo.
    pub image_key: Option<String>,
    pub contact_number: Option<String>,
    // Whether the poster's name is shown publicly (anonymity flag).
    pub display_name: bool,

    // Moderation state: 'pending', 'approved' or 'rejected'.
    pub status: String,
    // Completion state: 'open', 'claimed' or 'found'.
    pub completion: String,

    pub approved_by: Option<Uuid>,
    #[ts(type = "string | null")]
    pub approved_at: Option<DateTime<Utc>>,

    // Account of whoever claimed the item, when known.
    pub claimed_by: Option<Uuid>,
    // Free-text identity of the claimant/returner for walk-in resolutions.
    pub completion_name: String,
    pub completion_email: String,
    #[ts(type = "string | null")]
    pub completed_at: Option<DateTime<Utc>>,

    // Stamped whenever the poster edits the listing content.
    #[ts(type = "string | null")]
    pub content_updated_at: Option<DateTime<Utc>>,

    // Admin archive record, embedded in the row so a restore simply clears
    // the flag and the item resumes its prior state.
    pub is_archived: bool,
    pub archived_by: Option<Uuid>,
    #[ts(type = "string | null")]
    pub archived_at: Option<DateTime<Utc>>,
    pub archive_reason: String,
    pub archive_notes: String,

    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

impl Item {
    pub fn is_publicly_visible(&self) -> bool {
        self.status == STATUS_APPROVED && !self.is_archived
    }

    pub fn is_success_story(&self) -> bool {
        matches!(
            self.completion.as_str(),
            COMPLETION_CLAIMED | COMPLETION_FOUND
        )
    }

    /// Completed items are success stories and must remain on record.
    pub fn can_be_deleted(&self) -> bool {
        !self.is_success_story()
    }
}

/// Message
///
/// A single item-scoped message from the `messages` table. A thread is a root
/// message (`parent_id` is NULL) plus every reply pointing at that root,
/// ordered by creation time. Each participant can soft-delete the thread from
/// their own view without affecting the other side.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Message {
    pub id: Uuid,
    pub item_id: Uuid,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub subject: String,
    pub body: String,
    pub sender_phone: String,
    pub image_key: Option<String>,
    // Root message of the thread, NULL for thread roots themselves.
    pub parent_id: Option<Uuid>,
    pub is_read: bool,
    pub deleted_by_sender: bool,
    pub deleted_by_recipient: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    // Loaded via a JOIN in the repository query.
    #[sqlx(default)]
    pub sender_email: Option<String>,
}

/// NewMessage
///
/// Internal insert payload assembled by the messaging handlers once the
/// recipient and thread root have been resolved. Never exposed over HTTP.
#[derive(Debug, Clone, Default)]
pub struct NewMessage {
    pub item_id: Uuid,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub subject: String,
    pub body: String,
    pub sender_phone: String,
    pub image_key: Option<String>,
    pub parent_id: Option<Uuid>,
}

/// ThreadSummary
///
/// Inbox row: one entry per thread the user participates in, enriched with the
/// item title, the counterpart's email and the unread count (a join/aggregate
/// in the repository).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct ThreadSummary {
    pub id: Uuid,
    pub item_id: Uuid,
    pub item_title: String,
    pub subject: String,
    pub counterpart_email: String,
    pub unread_count: i64,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub last_message_at: DateTime<Utc>,
}

/// Claim
///
/// A formal claim filed against a found item, from the `claims` table.
/// One claim per user per item; resolution is an admin action.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Claim {
    pub id: Uuid,
    pub item_id: Uuid,
    pub claimed_by: Uuid,
    pub claim_message: String,
    pub contact_info: String,
    // 'pending', 'approved' or 'rejected'.
    pub status: String,
    pub resolved_by: Option<Uuid>,
    #[ts(type = "string | null")]
    pub resolved_at: Option<DateTime<Utc>>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
    // Loaded via a JOIN in the repository query.
    #[sqlx(default)]
    pub claimant_email: Option<String>,
}

/// --- Request Payloads (Input Schemas) ---

/// CreateItemRequest
///
/// Input payload for submitting a new lost/found listing (POST /items).
/// The image key is provided after the client completes the presigned upload.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateItemRequest {
    pub item_type: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub location: String,
    #[ts(type = "string")]
    pub date: NaiveDate,
    pub image_key: Option<String>,
    pub contact_number: Option<String>,
    pub display_name: bool,
}

/// UpdateItemRequest
///
/// Partial update payload for a poster editing their listing (PUT /items/{id}).
///
/// Uses `Option<T>` for all fields and `#[serde(skip_serializing_if = "Option::is_none")]`
/// so only provided fields are included in the JSON payload.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateItemRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(type = "string | null")]
    pub date: Option<NaiveDate>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_key: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_number: Option<String>,
}

/// CompleteItemRequest
///
/// Input payload for marking an approved item claimed/recovered.
/// The optional name/email record who picked the item up when the
/// claimant has no account.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CompleteItemRequest {
    // Target state: 'claimed' or 'found'.
    pub completion: String,
    pub completion_name: Option<String>,
    pub completion_email: Option<String>,
}

/// UpdateItemStatusRequest
///
/// Admin moderation verdict for a pending item.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateItemStatusRequest {
    pub approve: bool,
}

/// ArchiveItemRequest
///
/// Admin archive action: a reason code is mandatory, notes are free-form.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ArchiveItemRequest {
    pub reason: String,
    pub notes: Option<String>,
}

/// GoogleLoginRequest
///
/// Authorization code returned by Google's consent screen, posted by the
/// frontend to complete the sign-in flow.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct GoogleLoginRequest {
    pub code: String,
}

/// LoginResponse
///
/// Session token plus the resolved user record.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

/// SendMessageRequest
///
/// Input payload for opening a message thread with an item's poster.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct SendMessageRequest {
    pub subject: String,
    pub body: String,
    pub sender_phone: Option<String>,
    pub image_key: Option<String>,
}

/// ReplyMessageRequest
///
/// Input payload for replying within an existing thread.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ReplyMessageRequest {
    pub body: String,
    pub image_key: Option<String>,
}

/// CreateClaimRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateClaimRequest {
    // Why the claimant believes this is their item.
    pub claim_message: String,
    pub contact_info: String,
}

/// ResolveClaimRequest
///
/// Admin verdict on a pending claim. Approval also marks the item claimed.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ResolveClaimRequest {
    pub approve: bool,
}

/// UpdateUserRoleRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateUserRoleRequest {
    pub role: String,
}

/// SetVerifiedRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct SetVerifiedRequest {
    pub is_verified: bool,
}

/// PresignedUrlRequest
///
/// Input payload for requesting a short-lived S3 upload URL (POST /upload/presigned).
/// The server uses these fields to set security constraints on the generated URL.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, TS, Default)]
#[ts(export)]
pub struct PresignedUrlRequest {
    /// The original filename, used to derive the file extension.
    #[schema(example = "blue_backpack.jpg")]
    pub filename: String,
    /// The MIME type, used to constrain the S3 upload to the allowed type (security).
    #[schema(example = "image/jpeg")]
    pub file_type: String,
}

/// PresignedUrlResponse
///
/// Output schema containing the secure, temporary URL for client-to-cloud file transfer.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS, Default)]
#[ts(export)]
pub struct PresignedUrlResponse {
    /// The time-limited URL for the PUT request.
    pub upload_url: String,
    /// The S3 object key where the file will be stored (referenced by items/messages).
    pub resource_key: String,
}

/// --- Dashboard & Listing Schemas (Output) ---

/// AdminDashboardStats
///
/// Output schema for the administrative statistics dashboard (GET /admin/stats).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AdminDashboardStats {
    pub total_items: i64,
    pub lost_items: i64,
    pub found_items: i64,
    /// Items still sitting in the moderation queue.
    pub pending_review: i64,
    pub success_stories: i64,
    pub archived_items: i64,
    pub total_users: i64,
}

/// RecentItemsResponse
///
/// Home-page payload: the newest approved listings of each type plus the
/// latest success stories.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RecentItemsResponse {
    pub recent_lost: Vec<Item>,
    pub recent_found: Vec<Item>,
    pub recent_success: Vec<Item>,
}

/// --- Notification System Schemas ---

/// Notification
///
/// Raw Database Row (Internal Use). Directly maps to the `notifications` table.
/// This structure is used internally by the Repository before being transformed
/// into the `NotificationResponse`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default)]
pub struct Notification {
    pub id: Uuid,
    // Recipient.
    pub user_id: Uuid,
    // Trigger (admin, claimant, message sender).
    pub actor_id: Uuid,
    pub item_id: Uuid,

    // 'type' is a reserved keyword in Rust, so we rename it for internal Rust use.
    #[sqlx(rename = "type")]
    pub notification_type: String,

    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// NotificationResponse
///
/// Enriched response structure for the Frontend (UI Ready).
/// This is the result of joining the internal `Notification` row with user and
/// item details.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct NotificationResponse {
    pub id: Uuid,

    // Who triggered it? (e.g., the moderating admin, a claimant)
    pub actor_email: String,

    pub item_id: Uuid,
    pub item_title: String,

    // Type: "item_approved" | "item_rejected" | "item_archived" |
    //       "claim_received" | "claim_approved" | "claim_rejected" |
    //       "message_received"
    // Sent as "type" in JSON for API compatibility, read as `notification_type` in Rust.
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub notification_type: String,

    pub message: String,
    pub is_read: bool,

    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}
