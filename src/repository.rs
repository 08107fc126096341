use crate::models::{
    AdminDashboardStats, Claim, CreateClaimRequest, CreateItemRequest, Item, Message, NewMessage,
    NotificationResponse, RecentItemsResponse, ThreadSummary, UpdateItemRequest, User,
};
use async_trait::async_trait;
use sqlx::{PgPool, query_builder::QueryBuilder};
use std::sync::Arc;
use uuid::Uuid;

// Shared column lists so every query hydrates the full FromRow structs.
const ITEM_COLS: &str = "id, posted_by, item_type, title, description, category, location, date, \
     image_key, contact_number, display_name, status, completion, approved_by, approved_at, \
     claimed_by, completion_name, completion_email, completed_at, content_updated_at, \
     is_archived, archived_by, archived_at, archive_reason, archive_notes, created_at, updated_at";

const USER_COLS: &str =
    "id, email, full_name, role, is_verified, phone_number, student_id, picture_url, \
     created_at, updated_at";

const MESSAGE_COLS: &str = "id, item_id, sender_id, recipient_id, subject, body, sender_phone, \
     image_key, parent_id, is_read, deleted_by_sender, deleted_by_recipient, created_at";

const CLAIM_COLS: &str = "id, item_id, claimed_by, claim_message, contact_info, status, \
     resolved_by, resolved_at, created_at, updated_at";

/// Repository Trait
///
/// Defines the abstract contract for all persistence operations. This is the core
/// of the Repository Abstraction pattern, allowing the handlers to interact with
/// the data layer without knowing the specific implementation (Postgres, Mock, etc.).
///
/// **Send + Sync + async_trait** are required to make the trait object (`Arc<dyn Repository>`)
/// safely shareable and usable across Axum's asynchronous task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Item Retrieval ---
    // Active public browse list. Must enforce status=approved, not archived, open.
    async fn get_items(
        &self,
        item_type: Option<String>,
        category: Option<String>,
        search: Option<String>,
    ) -> Vec<Item>;
    // Completed items (success stories), newest resolution first.
    async fn get_success_stories(
        &self,
        category: Option<String>,
        search: Option<String>,
    ) -> Vec<Item>;
    // Home-page payload: newest approved lost/found plus latest success stories.
    async fn get_recent_items(&self) -> RecentItemsResponse;
    // Admin access: retrieves items regardless of visibility. `status` may be a
    // moderation state or the special value "archived".
    async fn get_all_items(&self, status: Option<String>) -> Vec<Item>;

    // Retrieval methods with specific visibility rules.
    async fn get_item(&self, id: Uuid) -> Option<Item>;
    async fn get_public_item(&self, id: Uuid) -> Option<Item>;
    async fn get_my_items(&self, user_id: Uuid) -> Vec<Item>;

    // --- Item Actions ---
    async fn create_item(&self, req: CreateItemRequest, user_id: Uuid) -> Item;
    // Owner-Only: updates only if posted_by matches and the item is not archived.
    async fn update_item(&self, id: Uuid, user_id: Uuid, req: UpdateItemRequest) -> Option<Item>;
    // Owner-Only: deletes only open (non-completed) items owned by the user.
    async fn delete_item(&self, id: Uuid, user_id: Uuid) -> bool;
    /// Admin Override: delete ANY item by ID (no ownership check).
    async fn delete_item_admin(&self, id: Uuid) -> bool;
    // Completion transition, guarded to approved/open/not-archived rows.
    async fn complete_item(
        &self,
        id: Uuid,
        completion: &str,
        completion_name: Option<String>,
        completion_email: Option<String>,
        claimed_by: Option<Uuid>,
    ) -> Option<Item>;
    // Moderation verdict, guarded to pending rows only.
    async fn set_item_status(&self, id: Uuid, status: &str, admin_id: Uuid) -> Option<Item>;
    async fn archive_item(
        &self,
        id: Uuid,
        admin_id: Uuid,
        reason: &str,
        notes: &str,
    ) -> Option<Item>;
    // Clears the archive flag; the item resumes its prior state.
    async fn restore_item(&self, id: Uuid) -> Option<Item>;

    // --- Users/Auth ---
    async fn get_user(&self, id: Uuid) -> Option<User>;
    async fn get_user_by_email(&self, email: &str) -> Option<User>;
    // Creates or refreshes the account mirrored from the OAuth provider.
    async fn upsert_oauth_user(
        &self,
        email: &str,
        full_name: &str,
        picture_url: Option<String>,
        role: &str,
        is_verified: bool,
    ) -> User;
    async fn get_users(&self) -> Vec<User>;
    async fn set_user_role(&self, id: Uuid, role: &str) -> Option<User>;
    async fn set_user_verified(&self, id: Uuid, is_verified: bool) -> Option<User>;
    async fn get_stats(&self) -> AdminDashboardStats;

    // --- Messaging ---
    async fn create_message(&self, msg: NewMessage) -> Message;
    async fn get_message(&self, id: Uuid) -> Option<Message>;
    // Root plus replies, oldest first, enriched with sender emails.
    async fn get_thread(&self, root_id: Uuid) -> Vec<Message>;
    async fn get_inbox(&self, user_id: Uuid) -> Vec<ThreadSummary>;
    // Recipient-only read receipt.
    async fn mark_message_read(&self, id: Uuid, recipient_id: Uuid) -> bool;
    // Per-participant soft delete of a thread root.
    async fn delete_thread_for_user(&self, root_id: Uuid, user_id: Uuid) -> bool;

    // --- Claims ---
    // Returns None when the (item, user) pair already has a claim.
    async fn create_claim(
        &self,
        item_id: Uuid,
        user_id: Uuid,
        req: CreateClaimRequest,
    ) -> Option<Claim>;
    async fn get_item_claims(&self, item_id: Uuid) -> Vec<Claim>;
    async fn get_claims(&self, status: Option<String>) -> Vec<Claim>;
    async fn get_claim(&self, id: Uuid) -> Option<Claim>;
    // Admin verdict, guarded to pending claims only.
    async fn resolve_claim(&self, id: Uuid, admin_id: Uuid, approve: bool) -> Option<Claim>;

    // --- Notifications ---
    async fn add_notification(
        &self,
        user_id: Uuid,
        actor_id: Uuid,
        item_id: Uuid,
        notification_type: &str,
        message: &str,
    );
    // Retrieves enriched notification responses for the recipient (user_id).
    async fn get_notifications(&self, user_id: Uuid) -> Vec<NotificationResponse>;
    // Marks a notification as read, enforced by ownership check (`user_id`).
    async fn mark_notification_read(&self, notification_id: Uuid, user_id: Uuid) -> bool;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer access across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by the PostgreSQL database.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    /// get_items
    ///
    /// Implements flexible search/filtering using QueryBuilder for safe parameterization,
    /// adhering to the **"No SQL Injection Risk"** mandate.
    /// **Security**: Strictly enforces the visibility invariant in the base query:
    /// approved, not archived, and still open.
    async fn get_items(
        &self,
        item_type: Option<String>,
        category: Option<String>,
        search: Option<String>,
    ) -> Vec<Item> {
        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(format!(
            "SELECT {ITEM_COLS} FROM items \
             WHERE status = 'approved' AND is_archived = false AND completion = 'open' "
        ));

        if let Some(t) = item_type {
            builder.push(" AND item_type = ");
            builder.push_bind(t);
        }

        if let Some(c) = category {
            builder.push(" AND category = ");
            builder.push_bind(c);
        }

        if let Some(s) = search {
            // Case-insensitive search across title, description and location.
            let search_pattern = format!("%{}%", s);
            builder.push(" AND (title ILIKE ");
            builder.push_bind(search_pattern.clone());
            builder.push(" OR description ILIKE ");
            builder.push_bind(search_pattern.clone());
            builder.push(" OR location ILIKE ");
            builder.push_bind(search_pattern);
            builder.push(")");
        }

        builder.push(" ORDER BY created_at DESC");

        let query = builder.build_query_as::<Item>();

        match query.fetch_all(&self.pool).await {
            Ok(items) => items,
            Err(e) => {
                tracing::error!("get_items error: {:?}", e);
                vec![]
            }
        }
    }

    /// get_success_stories
    ///
    /// Completed items stay publicly visible as success stories unless archived.
    async fn get_success_stories(
        &self,
        category: Option<String>,
        search: Option<String>,
    ) -> Vec<Item> {
        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(format!(
            "SELECT {ITEM_COLS} FROM items \
             WHERE completion IN ('claimed', 'found') AND is_archived = false "
        ));

        if let Some(c) = category {
            builder.push(" AND category = ");
            builder.push_bind(c);
        }

        if let Some(s) = search {
            let search_pattern = format!("%{}%", s);
            builder.push(" AND (title ILIKE ");
            builder.push_bind(search_pattern.clone());
            builder.push(" OR description ILIKE ");
            builder.push_bind(search_pattern);
            builder.push(")");
        }

        builder.push(" ORDER BY completed_at DESC NULLS LAST, created_at DESC");

        match builder.build_query_as::<Item>().fetch_all(&self.pool).await {
            Ok(items) => items,
            Err(e) => {
                tracing::error!("get_success_stories error: {:?}", e);
                vec![]
            }
        }
    }

    /// get_recent_items
    ///
    /// Home view: 3 newest approved lost, 3 newest approved found, 5 newest resolutions.
    async fn get_recent_items(&self) -> RecentItemsResponse {
        let recent_sql = format!(
            "SELECT {ITEM_COLS} FROM items \
             WHERE item_type = $1 AND status = 'approved' \
               AND is_archived = false AND completion = 'open' \
             ORDER BY created_at DESC LIMIT 3"
        );

        let recent_lost = sqlx::query_as::<_, Item>(&recent_sql)
            .bind("lost")
            .fetch_all(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_recent_items lost error: {:?}", e);
                vec![]
            });

        let recent_found = sqlx::query_as::<_, Item>(&recent_sql)
            .bind("found")
            .fetch_all(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_recent_items found error: {:?}", e);
                vec![]
            });

        let recent_success = sqlx::query_as::<_, Item>(&format!(
            "SELECT {ITEM_COLS} FROM items \
             WHERE completion IN ('claimed', 'found') AND is_archived = false \
             ORDER BY completed_at DESC NULLS LAST LIMIT 5"
        ))
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_recent_items success error: {:?}", e);
            vec![]
        });

        RecentItemsResponse {
            recent_lost,
            recent_found,
            recent_success,
        }
    }

    /// get_all_items
    ///
    /// Administrative listing. **Note**: does *not* apply the public visibility
    /// restriction. Pending items are surfaced first so the moderation queue is
    /// always at the top of the dashboard.
    async fn get_all_items(&self, status: Option<String>) -> Vec<Item> {
        let mut builder: QueryBuilder<sqlx::Postgres> =
            QueryBuilder::new(format!("SELECT {ITEM_COLS} FROM items "));

        match status.as_deref() {
            // "archived" is a queue of its own rather than a moderation state.
            Some("archived") => {
                builder.push(" WHERE is_archived = true ");
            }
            Some(s) => {
                builder.push(" WHERE is_archived = false AND status = ");
                builder.push_bind(s.to_string());
            }
            None => {}
        }

        builder.push(" ORDER BY (status = 'pending') DESC, created_at DESC");

        match builder.build_query_as::<Item>().fetch_all(&self.pool).await {
            Ok(items) => items,
            Err(e) => {
                tracing::error!("get_all_items error: {:?}", e);
                vec![]
            }
        }
    }

    /// get_item
    ///
    /// Simple retrieval of any item by ID (no visibility check). Primarily for internal
    /// use when visibility has already been determined by the calling handler (e.g., admin
    /// or ownership paths).
    async fn get_item(&self, id: Uuid) -> Option<Item> {
        sqlx::query_as::<_, Item>(&format!("SELECT {ITEM_COLS} FROM items WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_item error: {:?}", e);
                None
            })
    }

    /// get_public_item
    ///
    /// Retrieves an item *only* if it is approved and not archived. Used by the
    /// public detail handler.
    async fn get_public_item(&self, id: Uuid) -> Option<Item> {
        sqlx::query_as::<_, Item>(&format!(
            "SELECT {ITEM_COLS} FROM items \
             WHERE id = $1 AND status = 'approved' AND is_archived = false"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_public_item error: {:?}", e);
            None
        })
    }

    /// get_my_items
    ///
    /// Retrieves all items owned by the authenticated user, including pending,
    /// rejected and archived ones.
    async fn get_my_items(&self, user_id: Uuid) -> Vec<Item> {
        sqlx::query_as::<_, Item>(&format!(
            "SELECT {ITEM_COLS} FROM items WHERE posted_by = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_my_items error: {:?}", e);
            vec![]
        })
    }

    /// create_item
    ///
    /// Inserts a new listing. All new items enter the moderation queue with
    /// `status = 'pending'`, requiring administrative approval before public visibility.
    async fn create_item(&self, req: CreateItemRequest, user_id: Uuid) -> Item {
        let new_id = Uuid::new_v4();
        sqlx::query_as::<_, Item>(&format!(
            "INSERT INTO items \
             (id, posted_by, item_type, title, description, category, location, date, \
              image_key, contact_number, display_name, status, completion, \
              completion_name, completion_email, archive_reason, archive_notes, \
              created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 'pending', 'open', \
                     '', '', '', '', NOW(), NOW()) \
             RETURNING {ITEM_COLS}"
        ))
        .bind(new_id)
        .bind(user_id)
        .bind(req.item_type)
        .bind(req.title)
        .bind(req.description)
        .bind(req.category)
        .bind(req.location)
        .bind(req.date)
        .bind(req.image_key)
        .bind(req.contact_number)
        .bind(req.display_name)
        .fetch_one(&self.pool)
        .await
        .expect("Failed to insert item")
    }

    /// update_item
    ///
    /// Updates a listing only if the provided `user_id` matches the poster and the
    /// item has not been archived by an admin. Uses the PostgreSQL `COALESCE`
    /// function to efficiently handle `Option<T>` fields, only updating a column
    /// if the corresponding field in `req` is `Some`.
    async fn update_item(&self, id: Uuid, user_id: Uuid, req: UpdateItemRequest) -> Option<Item> {
        sqlx::query_as::<_, Item>(&format!(
            "UPDATE items \
             SET title = COALESCE($3, title), \
                 description = COALESCE($4, description), \
                 category = COALESCE($5, category), \
                 location = COALESCE($6, location), \
                 date = COALESCE($7, date), \
                 image_key = COALESCE($8, image_key), \
                 contact_number = COALESCE($9, contact_number), \
                 content_updated_at = NOW(), \
                 updated_at = NOW() \
             WHERE id = $1 AND posted_by = $2 AND is_archived = false \
             RETURNING {ITEM_COLS}"
        ))
        .bind(id)
        .bind(user_id)
        .bind(req.title)
        .bind(req.description)
        .bind(req.category)
        .bind(req.location)
        .bind(req.date)
        .bind(req.image_key)
        .bind(req.contact_number)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("update_item error: {:?}", e);
            None
        })
    }

    /// delete_item
    ///
    /// Deletes a listing only if the provided `user_id` matches the poster.
    /// Completed items (success stories) are protected at the SQL level.
    async fn delete_item(&self, id: Uuid, user_id: Uuid) -> bool {
        match sqlx::query(
            "DELETE FROM items WHERE id = $1 AND posted_by = $2 AND completion = 'open'",
        )
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("delete_item error: {:?}", e);
                false
            }
        }
    }

    /// delete_item_admin
    ///
    /// **Admin Override**: deletes an item without checking ownership or completion.
    async fn delete_item_admin(&self, id: Uuid) -> bool {
        match sqlx::query("DELETE FROM items WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
        {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("delete_item_admin error: {:?}", e);
                false
            }
        }
    }

    /// complete_item
    ///
    /// The completion transition. The WHERE clause encodes the state machine
    /// guard: only approved, still-open, non-archived items can be resolved, so a
    /// stale or duplicate request affects zero rows and returns None.
    async fn complete_item(
        &self,
        id: Uuid,
        completion: &str,
        completion_name: Option<String>,
        completion_email: Option<String>,
        claimed_by: Option<Uuid>,
    ) -> Option<Item> {
        sqlx::query_as::<_, Item>(&format!(
            "UPDATE items \
             SET completion = $2, \
                 completion_name = COALESCE($3, completion_name), \
                 completion_email = COALESCE($4, completion_email), \
                 claimed_by = COALESCE($5, claimed_by), \
                 completed_at = NOW(), \
                 updated_at = NOW() \
             WHERE id = $1 AND status = 'approved' AND completion = 'open' \
               AND is_archived = false \
             RETURNING {ITEM_COLS}"
        ))
        .bind(id)
        .bind(completion)
        .bind(completion_name)
        .bind(completion_email)
        .bind(claimed_by)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("complete_item error: {:?}", e);
            None
        })
    }

    /// set_item_status
    ///
    /// The moderation verdict. Guarded to `status = 'pending'` so approve/reject
    /// can never re-run on an already-moderated item.
    async fn set_item_status(&self, id: Uuid, status: &str, admin_id: Uuid) -> Option<Item> {
        sqlx::query_as::<_, Item>(&format!(
            "UPDATE items \
             SET status = $2, approved_by = $3, approved_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status = 'pending' \
             RETURNING {ITEM_COLS}"
        ))
        .bind(id)
        .bind(status)
        .bind(admin_id)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("set_item_status error: {:?}", e);
            None
        })
    }

    /// archive_item
    ///
    /// Admin takedown from any state. The prior moderation/completion state is
    /// left untouched so a restore resumes exactly where the item left off.
    async fn archive_item(
        &self,
        id: Uuid,
        admin_id: Uuid,
        reason: &str,
        notes: &str,
    ) -> Option<Item> {
        sqlx::query_as::<_, Item>(&format!(
            "UPDATE items \
             SET is_archived = true, archived_by = $2, archived_at = NOW(), \
                 archive_reason = $3, archive_notes = $4, updated_at = NOW() \
             WHERE id = $1 AND is_archived = false \
             RETURNING {ITEM_COLS}"
        ))
        .bind(id)
        .bind(admin_id)
        .bind(reason)
        .bind(notes)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("archive_item error: {:?}", e);
            None
        })
    }

    /// restore_item
    async fn restore_item(&self, id: Uuid) -> Option<Item> {
        sqlx::query_as::<_, Item>(&format!(
            "UPDATE items \
             SET is_archived = false, archived_by = NULL, archived_at = NULL, \
                 archive_reason = '', archive_notes = '', updated_at = NOW() \
             WHERE id = $1 AND is_archived = true \
             RETURNING {ITEM_COLS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("restore_item error: {:?}", e);
            None
        })
    }

    /// get_user
    ///
    /// Retrieves the user record needed for authentication and authorization.
    async fn get_user(&self, id: Uuid) -> Option<User> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or(None)
    }

    /// get_user_by_email
    async fn get_user_by_email(&self, email: &str) -> Option<User> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or(None)
    }

    /// upsert_oauth_user
    ///
    /// Creates the local account after a successful OAuth exchange, or refreshes
    /// the profile fields on subsequent sign-ins. Role and verification are
    /// deliberately NOT overwritten on conflict: those are admin-managed once
    /// the account exists.
    async fn upsert_oauth_user(
        &self,
        email: &str,
        full_name: &str,
        picture_url: Option<String>,
        role: &str,
        is_verified: bool,
    ) -> User {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users \
             (id, email, full_name, role, is_verified, phone_number, student_id, picture_url, \
              created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, '', '', $6, NOW(), NOW()) \
             ON CONFLICT (email) DO UPDATE \
             SET full_name = EXCLUDED.full_name, \
                 picture_url = EXCLUDED.picture_url, \
                 updated_at = NOW() \
             RETURNING {USER_COLS}"
        ))
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(full_name)
        .bind(role)
        .bind(is_verified)
        .bind(picture_url)
        .fetch_one(&self.pool)
        .await
        .expect("Failed to upsert user")
    }

    /// get_users
    async fn get_users(&self) -> Vec<User> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLS} FROM users ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_users error: {:?}", e);
            vec![]
        })
    }

    /// set_user_role
    async fn set_user_role(&self, id: Uuid, role: &str) -> Option<User> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET role = $2, updated_at = NOW() WHERE id = $1 RETURNING {USER_COLS}"
        ))
        .bind(id)
        .bind(role)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("set_user_role error: {:?}", e);
            None
        })
    }

    /// set_user_verified
    async fn set_user_verified(&self, id: Uuid, is_verified: bool) -> Option<User> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET is_verified = $2, updated_at = NOW() WHERE id = $1 \
             RETURNING {USER_COLS}"
        ))
        .bind(id)
        .bind(is_verified)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("set_user_verified error: {:?}", e);
            None
        })
    }

    /// get_stats
    ///
    /// Compiles all necessary counters for the administrative dashboard in a single call.
    async fn get_stats(&self) -> AdminDashboardStats {
        let total_items = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM items")
            .fetch_one(&self.pool)
            .await
            .unwrap_or(0);
        let lost_items =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM items WHERE item_type = 'lost'")
                .fetch_one(&self.pool)
                .await
                .unwrap_or(0);
        let found_items =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM items WHERE item_type = 'found'")
                .fetch_one(&self.pool)
                .await
                .unwrap_or(0);
        let pending_review = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM items WHERE status = 'pending' AND is_archived = false",
        )
        .fetch_one(&self.pool)
        .await
        .unwrap_or(0);
        let success_stories = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM items WHERE completion IN ('claimed', 'found')",
        )
        .fetch_one(&self.pool)
        .await
        .unwrap_or(0);
        let archived_items =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM items WHERE is_archived = true")
                .fetch_one(&self.pool)
                .await
                .unwrap_or(0);
        let total_users = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .unwrap_or(0);

        AdminDashboardStats {
            total_items,
            lost_items,
            found_items,
            pending_review,
            success_stories,
            archived_items,
            total_users,
        }
    }

    // --- MESSAGING ---

    /// create_message
    ///
    /// Inserts a message and immediately joins with `users` to return the enriched
    /// row including the sender's email. Uses a CTE (Common Table Expression) to
    /// perform the insert and subsequent join in one query.
    async fn create_message(&self, msg: NewMessage) -> Message {
        sqlx::query_as::<_, Message>(
            "WITH inserted AS ( \
                INSERT INTO messages \
                (id, item_id, sender_id, recipient_id, subject, body, sender_phone, image_key, \
                 parent_id, is_read, deleted_by_sender, deleted_by_recipient, created_at) \
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, false, false, false, NOW()) \
                RETURNING * \
             ) \
             SELECT i.id, i.item_id, i.sender_id, i.recipient_id, i.subject, i.body, \
                    i.sender_phone, i.image_key, i.parent_id, i.is_read, \
                    i.deleted_by_sender, i.deleted_by_recipient, i.created_at, \
                    u.email AS sender_email \
             FROM inserted i JOIN users u ON i.sender_id = u.id",
        )
        .bind(Uuid::new_v4())
        .bind(msg.item_id)
        .bind(msg.sender_id)
        .bind(msg.recipient_id)
        .bind(msg.subject)
        .bind(msg.body)
        .bind(msg.sender_phone)
        .bind(msg.image_key)
        .bind(msg.parent_id)
        .fetch_one(&self.pool)
        .await
        .expect("Failed to insert message")
    }

    /// get_message
    async fn get_message(&self, id: Uuid) -> Option<Message> {
        sqlx::query_as::<_, Message>(&format!(
            "SELECT {MESSAGE_COLS} FROM messages WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_message error: {:?}", e);
            None
        })
    }

    /// get_thread
    ///
    /// The root message and every reply pointing at it, ordered by creation time.
    async fn get_thread(&self, root_id: Uuid) -> Vec<Message> {
        sqlx::query_as::<_, Message>(
            "SELECT m.id, m.item_id, m.sender_id, m.recipient_id, m.subject, m.body, \
                    m.sender_phone, m.image_key, m.parent_id, m.is_read, \
                    m.deleted_by_sender, m.deleted_by_recipient, m.created_at, \
                    u.email AS sender_email \
             FROM messages m \
             JOIN users u ON m.sender_id = u.id \
             WHERE m.id = $1 OR m.parent_id = $1 \
             ORDER BY m.created_at ASC",
        )
        .bind(root_id)
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_thread error: {:?}", e);
            vec![]
        })
    }

    /// get_inbox
    ///
    /// One row per thread root where the user participates and has not soft-deleted
    /// the thread, with the counterpart's email and an unread count aggregated over
    /// the whole thread.
    async fn get_inbox(&self, user_id: Uuid) -> Vec<ThreadSummary> {
        sqlx::query_as::<_, ThreadSummary>(
            "SELECT m.id, m.item_id, i.title AS item_title, m.subject, \
                    CASE WHEN m.sender_id = $1 THEN ru.email ELSE su.email END AS counterpart_email, \
                    (SELECT COUNT(*) FROM messages t \
                     WHERE (t.id = m.id OR t.parent_id = m.id) \
                       AND t.recipient_id = $1 AND t.is_read = false) AS unread_count, \
                    m.created_at, \
                    (SELECT MAX(t.created_at) FROM messages t \
                     WHERE t.id = m.id OR t.parent_id = m.id) AS last_message_at \
             FROM messages m \
             JOIN items i ON m.item_id = i.id \
             JOIN users su ON m.sender_id = su.id \
             JOIN users ru ON m.recipient_id = ru.id \
             WHERE m.parent_id IS NULL \
               AND ((m.sender_id = $1 AND m.deleted_by_sender = false) \
                 OR (m.recipient_id = $1 AND m.deleted_by_recipient = false)) \
             ORDER BY last_message_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_inbox error: {:?}", e);
            vec![]
        })
    }

    /// mark_message_read
    ///
    /// Read receipts are recipient-only; a sender cannot mark their own message read.
    async fn mark_message_read(&self, id: Uuid, recipient_id: Uuid) -> bool {
        match sqlx::query("UPDATE messages SET is_read = true WHERE id = $1 AND recipient_id = $2")
            .bind(id)
            .bind(recipient_id)
            .execute(&self.pool)
            .await
        {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("mark_message_read error: {:?}", e);
                false
            }
        }
    }

    /// delete_thread_for_user
    ///
    /// Soft delete on the thread root, flipping only the flag belonging to the
    /// calling participant. The other participant keeps their copy.
    async fn delete_thread_for_user(&self, root_id: Uuid, user_id: Uuid) -> bool {
        match sqlx::query(
            "UPDATE messages \
             SET deleted_by_sender = \
                   CASE WHEN sender_id = $2 THEN true ELSE deleted_by_sender END, \
                 deleted_by_recipient = \
                   CASE WHEN recipient_id = $2 THEN true ELSE deleted_by_recipient END \
             WHERE id = $1 AND parent_id IS NULL \
               AND (sender_id = $2 OR recipient_id = $2)",
        )
        .bind(root_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("delete_thread_for_user error: {:?}", e);
                false
            }
        }
    }

    // --- CLAIMS ---

    /// create_claim
    ///
    /// Uses `ON CONFLICT DO NOTHING` against the (item_id, claimed_by) unique key
    /// to enforce **one claim per user per item**; a duplicate insert affects zero
    /// rows and the CTE yields no result.
    async fn create_claim(
        &self,
        item_id: Uuid,
        user_id: Uuid,
        req: CreateClaimRequest,
    ) -> Option<Claim> {
        sqlx::query_as::<_, Claim>(
            "WITH inserted AS ( \
                INSERT INTO claims \
                (id, item_id, claimed_by, claim_message, contact_info, status, \
                 created_at, updated_at) \
                VALUES ($1, $2, $3, $4, $5, 'pending', NOW(), NOW()) \
                ON CONFLICT (item_id, claimed_by) DO NOTHING \
                RETURNING * \
             ) \
             SELECT i.id, i.item_id, i.claimed_by, i.claim_message, i.contact_info, i.status, \
                    i.resolved_by, i.resolved_at, i.created_at, i.updated_at, \
                    u.email AS claimant_email \
             FROM inserted i JOIN users u ON i.claimed_by = u.id",
        )
        .bind(Uuid::new_v4())
        .bind(item_id)
        .bind(user_id)
        .bind(req.claim_message)
        .bind(req.contact_info)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("create_claim error: {:?}", e);
            None
        })
    }

    /// get_item_claims
    async fn get_item_claims(&self, item_id: Uuid) -> Vec<Claim> {
        sqlx::query_as::<_, Claim>(
            "SELECT c.id, c.item_id, c.claimed_by, c.claim_message, c.contact_info, c.status, \
                    c.resolved_by, c.resolved_at, c.created_at, c.updated_at, \
                    u.email AS claimant_email \
             FROM claims c JOIN users u ON c.claimed_by = u.id \
             WHERE c.item_id = $1 \
             ORDER BY c.created_at DESC",
        )
        .bind(item_id)
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_item_claims error: {:?}", e);
            vec![]
        })
    }

    /// get_claims
    ///
    /// Administrative claims queue, optionally filtered by status.
    async fn get_claims(&self, status: Option<String>) -> Vec<Claim> {
        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(
            "SELECT c.id, c.item_id, c.claimed_by, c.claim_message, c.contact_info, c.status, \
             c.resolved_by, c.resolved_at, c.created_at, c.updated_at, \
             u.email AS claimant_email \
             FROM claims c JOIN users u ON c.claimed_by = u.id ",
        );

        if let Some(s) = status {
            builder.push(" WHERE c.status = ");
            builder.push_bind(s);
        }

        builder.push(" ORDER BY c.created_at DESC");

        match builder.build_query_as::<Claim>().fetch_all(&self.pool).await {
            Ok(claims) => claims,
            Err(e) => {
                tracing::error!("get_claims error: {:?}", e);
                vec![]
            }
        }
    }

    /// get_claim
    async fn get_claim(&self, id: Uuid) -> Option<Claim> {
        sqlx::query_as::<_, Claim>(&format!("SELECT {CLAIM_COLS} FROM claims WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_claim error: {:?}", e);
                None
            })
    }

    /// resolve_claim
    ///
    /// Admin verdict on a claim. The `status = 'pending'` guard makes resolution
    /// single-shot even under concurrent admin sessions.
    async fn resolve_claim(&self, id: Uuid, admin_id: Uuid, approve: bool) -> Option<Claim> {
        let status = if approve { "approved" } else { "rejected" };
        sqlx::query_as::<_, Claim>(&format!(
            "UPDATE claims \
             SET status = $2, resolved_by = $3, resolved_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status = 'pending' \
             RETURNING {CLAIM_COLS}"
        ))
        .bind(id)
        .bind(status)
        .bind(admin_id)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("resolve_claim error: {:?}", e);
            None
        })
    }

    // --- NOTIFICATIONS ---

    /// add_notification
    ///
    /// Inserts an in-app notification row. Failures are logged and swallowed;
    /// a lost notification must never fail the triggering request.
    async fn add_notification(
        &self,
        user_id: Uuid,
        actor_id: Uuid,
        item_id: Uuid,
        notification_type: &str,
        message: &str,
    ) {
        if let Err(e) = sqlx::query(
            "INSERT INTO notifications (id, user_id, actor_id, item_id, type, message, \
             is_read, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, false, NOW())",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(actor_id)
        .bind(item_id)
        .bind(notification_type)
        .bind(message)
        .execute(&self.pool)
        .await
        {
            tracing::error!("add_notification error: {:?}", e);
        }
    }

    /// get_notifications
    ///
    /// Retrieves all notifications for a user, performing necessary JOINs to enrich
    /// the payload with the `actor_email` and `item_title` required by the
    /// `NotificationResponse` model.
    async fn get_notifications(&self, user_id: Uuid) -> Vec<NotificationResponse> {
        sqlx::query_as::<_, NotificationResponse>(
            "SELECT n.id, u.email AS actor_email, n.item_id, i.title AS item_title, \
                    n.type, n.message, n.is_read, n.created_at \
             FROM notifications n \
             JOIN users u ON n.actor_id = u.id \
             JOIN items i ON n.item_id = i.id \
             WHERE n.user_id = $1 \
             ORDER BY n.created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Failed to fetch notifications: {:?}", e);
            vec![]
        })
    }

    /// mark_notification_read
    ///
    /// Sets `is_read = true` for a notification, enforced by an **ownership check** (`user_id`).
    async fn mark_notification_read(&self, notification_id: Uuid, user_id: Uuid) -> bool {
        let result =
            sqlx::query("UPDATE notifications SET is_read = true WHERE id = $1 AND user_id = $2")
                .bind(notification_id)
                .bind(user_id)
                .execute(&self.pool)
                .await;

        match result {
            Ok(r) => r.rows_affected() > 0,
            Err(e) => {
                tracing::error!("Failed to mark notification read: {:?}", e);
                false
            }
        }
    }
}
