use chrono::Utc;
use hanapp_portal::{
    models::{CreateClaimRequest, CreateItemRequest, Item, NewMessage, UpdateItemRequest, User},
    repository::{PostgresRepository, Repository},
};
use sqlx::PgPool;
use tokio::test;
use uuid::Uuid;

// --- Test Context and Setup ---

/// A simple structure to hold the database pool for testing
struct DbTestContext {
    pool: PgPool,
}

impl DbTestContext {
    async fn setup() -> Self {
        dotenv::dotenv().ok();

        let db_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set to run integration tests");

        let pool = PgPool::connect(&db_url)
            .await
            .expect("Failed to connect to database for integration tests.");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run database migrations.");

        DbTestContext { pool }
    }

    fn repository(&self) -> PostgresRepository {
        PostgresRepository::new(self.pool.clone())
    }
}

// --- Test Data Helpers ---

/// Inserts a mock user with a unique institutional email.
async fn create_test_user(pool: &PgPool, role: &str) -> User {
    let id = Uuid::new_v4();
    let email = format!("{}.{}@psu.palawan.edu.ph", role, id.simple());

    sqlx::query_as::<_, User>(
        "INSERT INTO users (id, email, full_name, role, is_verified, phone_number, student_id, \
         picture_url, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, true, '', '', NULL, NOW(), NOW()) \
         RETURNING id, email, full_name, role, is_verified, phone_number, student_id, \
                   picture_url, created_at, updated_at",
    )
    .bind(id)
    .bind(email)
    .bind("Test User")
    .bind(role)
    .fetch_one(pool)
    .await
    .expect("Failed to create test user")
}

fn item_request(item_type: &str, title: &str, category: &str) -> CreateItemRequest {
    CreateItemRequest {
        item_type: item_type.to_string(),
        title: title.to_string(),
        description: "Integration test item".to_string(),
        category: category.to_string(),
        location: "University Library".to_string(),
        date: Utc::now().date_naive(),
        image_key: None,
        contact_number: None,
        display_name: false,
    }
}

/// Creates an item through the repository and immediately approves it.
async fn create_approved_item(
    repo: &PostgresRepository,
    poster: &User,
    admin: &User,
    item_type: &str,
    title: &str,
    category: &str,
) -> Item {
    let item = repo
        .create_item(item_request(item_type, title, category), poster.id)
        .await;
    repo.set_item_status(item.id, "approved", admin.id)
        .await
        .expect("approval should succeed on a pending item")
}

// --- Tests ---

#[test]
async fn test_create_item_enters_moderation_queue() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let user = create_test_user(&ctx.pool, "verified").await;

    let created = repo
        .create_item(item_request("lost", "Pending Phone", "electronics"), user.id)
        .await;

    assert_eq!(created.status, "pending");
    assert_eq!(created.completion, "open");
    assert_eq!(created.posted_by, user.id);

    // Pending items are invisible on every public surface
    assert!(repo.get_public_item(created.id).await.is_none());
    let listed = repo.get_items(None, None, None).await;
    assert!(listed.iter().all(|i| i.id != created.id));

    // But the owner still sees it
    let mine = repo.get_my_items(user.id).await;
    assert!(mine.iter().any(|i| i.id == created.id));
}

#[test]
async fn test_moderation_verdict_is_single_shot() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let user = create_test_user(&ctx.pool, "verified").await;
    let admin = create_test_user(&ctx.pool, "admin").await;

    let item = repo
        .create_item(item_request("found", "Car Keys", "keys"), user.id)
        .await;

    // First verdict succeeds and stamps the moderator
    let approved = repo.set_item_status(item.id, "approved", admin.id).await;
    assert!(approved.is_some());
    let approved = approved.unwrap();
    assert_eq!(approved.status, "approved");
    assert_eq!(approved.approved_by, Some(admin.id));
    assert!(approved.approved_at.is_some());

    // Now visible publicly
    assert!(repo.get_public_item(item.id).await.is_some());

    // A second verdict finds no pending row
    let again = repo.set_item_status(item.id, "rejected", admin.id).await;
    assert!(again.is_none(), "Verdicts must only apply to pending items");
}

#[test]
async fn test_get_items_with_filters() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let user = create_test_user(&ctx.pool, "verified").await;
    let admin = create_test_user(&ctx.pool, "admin").await;

    create_approved_item(&repo, &user, &admin, "lost", "Black Umbrella", "other").await;
    create_approved_item(&repo, &user, &admin, "found", "Umbrella Stand", "other").await;
    create_approved_item(&repo, &user, &admin, "lost", "Scientific Calculator", "electronics")
        .await;
    // This one stays pending and must never show up
    repo.create_item(item_request("lost", "Hidden Umbrella", "other"), user.id)
        .await;

    // Test 1: No filter (only approved items of this user)
    let all = repo.get_items(None, None, None).await;
    let ours: Vec<_> = all.iter().filter(|i| i.posted_by == user.id).collect();
    assert_eq!(ours.len(), 3, "Should find 3 approved items for this user");

    // Test 2: Filter by item type
    let lost = repo
        .get_items(Some("lost".to_string()), None, None)
        .await;
    let ours_lost: Vec<_> = lost.iter().filter(|i| i.posted_by == user.id).collect();
    assert_eq!(ours_lost.len(), 2);

    // Test 3: Filter by search term
    let umbrellas = repo
        .get_items(None, None, Some("umbrella".to_string()))
        .await;
    let ours_umbrellas: Vec<_> = umbrellas.iter().filter(|i| i.posted_by == user.id).collect();
    assert_eq!(ours_umbrellas.len(), 2, "Search is case-insensitive");

    // Test 4: Type and category combined
    let filtered = repo
        .get_items(Some("lost".to_string()), Some("electronics".to_string()), None)
        .await;
    let ours_filtered: Vec<_> = filtered.iter().filter(|i| i.posted_by == user.id).collect();
    assert_eq!(ours_filtered.len(), 1);
}

#[test]
async fn test_update_and_delete_item_ownership() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let owner = create_test_user(&ctx.pool, "verified").await;
    let non_owner = create_test_user(&ctx.pool, "verified").await;

    let item = repo
        .create_item(item_request("lost", "To Update", "books"), owner.id)
        .await;

    // Test 1: Update by Non-Owner (Should fail)
    let update_req = UpdateItemRequest {
        title: Some("New Title".to_string()),
        ..UpdateItemRequest::default()
    };
    let updated_fail = repo
        .update_item(item.id, non_owner.id, update_req.clone())
        .await;
    assert!(updated_fail.is_none(), "Non-owner should not be able to update.");

    // Test 2: Update by Owner (Should succeed and stamp the edit)
    let updated = repo.update_item(item.id, owner.id, update_req).await;
    assert!(updated.is_some());
    let updated = updated.unwrap();
    assert_eq!(updated.title, "New Title");
    assert!(updated.content_updated_at.is_some());

    // Test 3: Delete by Non-Owner (Should fail)
    let delete_fail = repo.delete_item(item.id, non_owner.id).await;
    assert!(!delete_fail, "Non-owner should not be able to delete.");

    // Test 4: Delete by Owner (Should succeed)
    let delete_success = repo.delete_item(item.id, owner.id).await;
    assert!(delete_success, "Owner should be able to delete.");

    // Verify deletion
    assert!(repo.get_item(item.id).await.is_none());
}

#[test]
async fn test_completion_state_machine() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let owner = create_test_user(&ctx.pool, "verified").await;
    let admin = create_test_user(&ctx.pool, "admin").await;

    let item = repo
        .create_item(item_request("found", "Wallet", "accessories"), owner.id)
        .await;

    // Pending items cannot be completed
    let premature = repo
        .complete_item(item.id, "claimed", None, None, None)
        .await;
    assert!(premature.is_none(), "Completion requires an approved item");

    repo.set_item_status(item.id, "approved", admin.id)
        .await
        .unwrap();

    // Approved and open: the transition succeeds
    let completed = repo
        .complete_item(
            item.id,
            "claimed",
            Some("Maria Clara".to_string()),
            Some("maria@psu.palawan.edu.ph".to_string()),
            None,
        )
        .await;
    assert!(completed.is_some());
    let completed = completed.unwrap();
    assert_eq!(completed.completion, "claimed");
    assert!(completed.completed_at.is_some());
    assert_eq!(completed.completion_name, "Maria Clara");

    // Success stories leave the active browse list
    let active = repo.get_items(None, None, None).await;
    assert!(active.iter().all(|i| i.id != item.id));

    // ...and surface in the success stories listing
    let stories = repo.get_success_stories(None, None).await;
    assert!(stories.iter().any(|i| i.id == item.id));

    // Terminal: a second completion affects zero rows
    let again = repo.complete_item(item.id, "found", None, None, None).await;
    assert!(again.is_none());

    // The owner can no longer delete the success story
    let delete = repo.delete_item(item.id, owner.id).await;
    assert!(!delete, "Completed items must remain on record");
}

#[test]
async fn test_archive_restore_roundtrip() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let owner = create_test_user(&ctx.pool, "verified").await;
    let admin = create_test_user(&ctx.pool, "admin").await;

    let item = create_approved_item(&repo, &owner, &admin, "lost", "Spam Item", "other").await;

    // Archive from the approved state
    let archived = repo
        .archive_item(item.id, admin.id, "spam", "obvious spam posting")
        .await;
    assert!(archived.is_some());
    let archived = archived.unwrap();
    assert!(archived.is_archived);
    assert_eq!(archived.archive_reason, "spam");
    // The prior moderation state is untouched underneath the flag
    assert_eq!(archived.status, "approved");

    // Archived items are gone from all public surfaces
    assert!(repo.get_public_item(item.id).await.is_none());
    let listed = repo.get_items(None, None, None).await;
    assert!(listed.iter().all(|i| i.id != item.id));

    // ...but appear in the admin archive queue
    let archive_queue = repo.get_all_items(Some("archived".to_string())).await;
    assert!(archive_queue.iter().any(|i| i.id == item.id));

    // Double-archive affects zero rows
    assert!(repo.archive_item(item.id, admin.id, "spam", "").await.is_none());

    // Restore returns the item to its prior state
    let restored = repo.restore_item(item.id).await;
    assert!(restored.is_some());
    let restored = restored.unwrap();
    assert!(!restored.is_archived);
    assert_eq!(restored.status, "approved", "Restore resumes the prior state");
    assert!(repo.get_public_item(item.id).await.is_some());

    // Restoring a live item affects zero rows
    assert!(repo.restore_item(item.id).await.is_none());
}

#[test]
async fn test_message_thread_lifecycle() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let poster = create_test_user(&ctx.pool, "verified").await;
    let admin = create_test_user(&ctx.pool, "admin").await;
    let inquirer = create_test_user(&ctx.pool, "verified").await;

    let item = create_approved_item(&repo, &poster, &admin, "found", "Thread Item", "other").await;

    // Inquirer opens the thread
    let root = repo
        .create_message(NewMessage {
            item_id: item.id,
            sender_id: inquirer.id,
            recipient_id: poster.id,
            subject: "Is this my bag?".to_string(),
            body: "It looks exactly like mine".to_string(),
            sender_phone: "09170000000".to_string(),
            image_key: None,
            parent_id: None,
        })
        .await;
    assert!(root.parent_id.is_none());
    assert_eq!(root.sender_email.as_deref(), Some(inquirer.email.as_str()));

    // Poster replies
    let reply = repo
        .create_message(NewMessage {
            item_id: item.id,
            sender_id: poster.id,
            recipient_id: inquirer.id,
            subject: "Re: Is this my bag?".to_string(),
            body: "Can you describe the contents?".to_string(),
            sender_phone: String::new(),
            image_key: None,
            parent_id: Some(root.id),
        })
        .await;

    // The thread is ordered oldest-first
    let thread = repo.get_thread(root.id).await;
    assert_eq!(thread.len(), 2);
    assert_eq!(thread[0].id, root.id);
    assert_eq!(thread[1].id, reply.id);

    // Both participants see the thread; the inquirer has one unread reply
    let inquirer_inbox = repo.get_inbox(inquirer.id).await;
    let entry = inquirer_inbox.iter().find(|t| t.id == root.id).unwrap();
    assert_eq!(entry.unread_count, 1);
    assert_eq!(entry.counterpart_email, poster.email);
    assert_eq!(entry.item_title, "Thread Item");

    // Read receipts are recipient-only
    assert!(!repo.mark_message_read(reply.id, poster.id).await);
    assert!(repo.mark_message_read(reply.id, inquirer.id).await);
    let inquirer_inbox = repo.get_inbox(inquirer.id).await;
    let entry = inquirer_inbox.iter().find(|t| t.id == root.id).unwrap();
    assert_eq!(entry.unread_count, 0);

    // Soft delete hides the thread for one side only
    assert!(repo.delete_thread_for_user(root.id, poster.id).await);
    let poster_inbox = repo.get_inbox(poster.id).await;
    assert!(poster_inbox.iter().all(|t| t.id != root.id));
    let inquirer_inbox = repo.get_inbox(inquirer.id).await;
    assert!(inquirer_inbox.iter().any(|t| t.id == root.id));
}

#[test]
async fn test_claim_uniqueness_and_resolution() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let poster = create_test_user(&ctx.pool, "verified").await;
    let admin = create_test_user(&ctx.pool, "admin").await;
    let claimant = create_test_user(&ctx.pool, "verified").await;

    let item = create_approved_item(&repo, &poster, &admin, "found", "Claimed Item", "documents")
        .await;

    let req = CreateClaimRequest {
        claim_message: "Student ID with my name on it".to_string(),
        contact_info: "09170000000".to_string(),
    };

    // First claim succeeds, enriched with the claimant's email
    let claim = repo.create_claim(item.id, claimant.id, req.clone()).await;
    assert!(claim.is_some());
    let claim = claim.unwrap();
    assert_eq!(claim.status, "pending");
    assert_eq!(claim.claimant_email.as_deref(), Some(claimant.email.as_str()));

    // One claim per user per item
    let duplicate = repo.create_claim(item.id, claimant.id, req).await;
    assert!(duplicate.is_none(), "Duplicate claims must be refused");

    let listed = repo.get_item_claims(item.id).await;
    assert_eq!(listed.len(), 1);

    // Resolution is single-shot
    let resolved = repo.resolve_claim(claim.id, admin.id, true).await;
    assert!(resolved.is_some());
    let resolved = resolved.unwrap();
    assert_eq!(resolved.status, "approved");
    assert_eq!(resolved.resolved_by, Some(admin.id));

    let again = repo.resolve_claim(claim.id, admin.id, false).await;
    assert!(again.is_none(), "Resolved claims cannot be re-resolved");
}

#[test]
async fn test_notification_and_read_status() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let recipient = create_test_user(&ctx.pool, "verified").await;
    let admin = create_test_user(&ctx.pool, "admin").await;

    let item = create_approved_item(&repo, &recipient, &admin, "lost", "Notif Item", "other").await;

    repo.add_notification(
        recipient.id,
        admin.id,
        item.id,
        "item_approved",
        "Your item \"Notif Item\" has been approved",
    )
    .await;

    // 1. Get notifications (enriched with actor email and item title)
    let notifs = repo.get_notifications(recipient.id).await;
    assert!(!notifs.is_empty());
    let notif = notifs
        .iter()
        .find(|n| n.item_id == item.id)
        .expect("notification should reference the item");
    assert!(!notif.is_read);
    assert_eq!(notif.item_title, item.title);
    assert_eq!(notif.actor_email, admin.email);
    assert_eq!(notif.notification_type, "item_approved");

    // 2. Mark as read, enforced by ownership
    assert!(!repo.mark_notification_read(notif.id, admin.id).await);
    assert!(repo.mark_notification_read(notif.id, recipient.id).await);

    // 3. Verify read status (direct SQL check)
    let is_read: bool = sqlx::query_scalar("SELECT is_read FROM notifications WHERE id = $1")
        .bind(notif.id)
        .fetch_one(&ctx.pool)
        .await
        .expect("Failed to fetch notification read status");

    assert!(is_read);
}
