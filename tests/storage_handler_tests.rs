use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use hanapp_portal::{
    AppConfig, AppState, create_router,
    mailer::MockMailer,
    models::{
        AdminDashboardStats, Claim, CreateClaimRequest, CreateItemRequest, Item, Message,
        NewMessage, NotificationResponse, PresignedUrlRequest, PresignedUrlResponse,
        RecentItemsResponse, ThreadSummary, UpdateItemRequest, User,
    },
    repository::{Repository, RepositoryState},
    storage::MockStorageService,
};
use std::sync::Arc;
use tower::util::ServiceExt;
use uuid::Uuid;

struct StubRepository;

#[async_trait]
impl Repository for StubRepository {
    async fn get_items(
        &self,
        _t: Option<String>,
        _c: Option<String>,
        _s: Option<String>,
    ) -> Vec<Item> {
        vec![]
    }
    async fn get_success_stories(&self, _c: Option<String>, _s: Option<String>) -> Vec<Item> {
        vec![]
    }
    async fn get_recent_items(&self) -> RecentItemsResponse {
        RecentItemsResponse::default()
    }
    async fn get_all_items(&self, _status: Option<String>) -> Vec<Item> {
        vec![]
    }
    async fn get_item(&self, _id: Uuid) -> Option<Item> {
        None
    }
    async fn get_public_item(&self, _id: Uuid) -> Option<Item> {
        None
    }
    async fn get_my_items(&self, _user_id: Uuid) -> Vec<Item> {
        vec![]
    }
    async fn create_item(&self, _r: CreateItemRequest, _u: Uuid) -> Item {
        panic!("Stub called")
    }
    async fn update_item(&self, _id: Uuid, _u: Uuid, _r: UpdateItemRequest) -> Option<Item> {
        None
    }
    async fn delete_item(&self, _id: Uuid, _u: Uuid) -> bool {
        false
    }
    async fn delete_item_admin(&self, _id: Uuid) -> bool {
        false
    }
    async fn complete_item(
        &self,
        _id: Uuid,
        _completion: &str,
        _name: Option<String>,
        _email: Option<String>,
        _claimed_by: Option<Uuid>,
    ) -> Option<Item> {
        None
    }
    async fn set_item_status(&self, _id: Uuid, _status: &str, _admin: Uuid) -> Option<Item> {
        None
    }
    async fn archive_item(
        &self,
        _id: Uuid,
        _admin: Uuid,
        _reason: &str,
        _notes: &str,
    ) -> Option<Item> {
        None
    }
    async fn restore_item(&self, _id: Uuid) -> Option<Item> {
        None
    }
    async fn get_user(&self, id: Uuid) -> Option<User> {
        // Return a valid verified test user for any UUID (dev bypass lookups)
        Some(User {
            id,
            email: "test@psu.palawan.edu.ph".to_string(),
            full_name: "Stub User".to_string(),
            role: "verified".to_string(),
            is_verified: true,
            ..User::default()
        })
    }
    async fn get_user_by_email(&self, _email: &str) -> Option<User> {
        None
    }
    async fn upsert_oauth_user(
        &self,
        _email: &str,
        _name: &str,
        _pic: Option<String>,
        _role: &str,
        _verified: bool,
    ) -> User {
        panic!("Stub called")
    }
    async fn get_users(&self) -> Vec<User> {
        vec![]
    }
    async fn set_user_role(&self, _id: Uuid, _role: &str) -> Option<User> {
        None
    }
    async fn set_user_verified(&self, _id: Uuid, _v: bool) -> Option<User> {
        None
    }
    async fn get_stats(&self) -> AdminDashboardStats {
        AdminDashboardStats::default()
    }
    async fn create_message(&self, _m: NewMessage) -> Message {
        panic!("Stub called")
    }
    async fn get_message(&self, _id: Uuid) -> Option<Message> {
        None
    }
    async fn get_thread(&self, _root: Uuid) -> Vec<Message> {
        vec![]
    }
    async fn get_inbox(&self, _u: Uuid) -> Vec<ThreadSummary> {
        vec![]
    }
    async fn mark_message_read(&self, _id: Uuid, _r: Uuid) -> bool {
        false
    }
    async fn delete_thread_for_user(&self, _root: Uuid, _u: Uuid) -> bool {
        false
    }
    async fn create_claim(&self, _i: Uuid, _u: Uuid, _r: CreateClaimRequest) -> Option<Claim> {
        None
    }
    async fn get_item_claims(&self, _i: Uuid) -> Vec<Claim> {
        vec![]
    }
    async fn get_claims(&self, _s: Option<String>) -> Vec<Claim> {
        vec![]
    }
    async fn get_claim(&self, _id: Uuid) -> Option<Claim> {
        None
    }
    async fn resolve_claim(&self, _id: Uuid, _a: Uuid, _approve: bool) -> Option<Claim> {
        None
    }
    async fn add_notification(
        &self,
        _user: Uuid,
        _actor: Uuid,
        _item: Uuid,
        _type: &str,
        _message: &str,
    ) {
    }
    async fn get_notifications(&self, _u: Uuid) -> Vec<NotificationResponse> {
        vec![]
    }
    async fn mark_notification_read(&self, _n: Uuid, _u: Uuid) -> bool {
        false
    }
}

fn app(mock_storage: MockStorageService) -> axum::Router {
    let repo = Arc::new(StubRepository) as RepositoryState;
    let storage = Arc::new(mock_storage);
    let mailer = Arc::new(MockMailer::new());
    // Default config is Env::Local, which enables the x-user-id dev bypass.
    let config = AppConfig::default();

    let state = AppState {
        repo,
        storage,
        mailer,
        config,
    };
    create_router(state)
}

#[tokio::test]
async fn test_presigned_url_success() {
    let app = app(MockStorageService::new());
    let user_id = Uuid::new_v4();

    let payload = PresignedUrlRequest {
        filename: "item_photo.jpg".to_string(),
        file_type: "image/jpeg".to_string(),
    };

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/upload/presigned")
                .header("Content-Type", "application/json")
                .header("x-user-id", user_id.to_string())
                .body(Body::from(serde_json::to_string(&payload).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body_json: PresignedUrlResponse = serde_json::from_slice(&body_bytes).unwrap();

    assert!(body_json.upload_url.contains("signature=fake"));
    assert!(body_json.resource_key.ends_with(".jpg"));
    assert!(body_json.resource_key.starts_with("uploads/"));
}

#[tokio::test]
async fn test_presigned_url_sanitization() {
    let app = app(MockStorageService::new());
    let user_id = Uuid::new_v4();

    let payload = PresignedUrlRequest {
        filename: "../../etc/passwd.png".to_string(),
        file_type: "image/png".to_string(),
    };

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/upload/presigned")
                .header("Content-Type", "application/json")
                .header("x-user-id", user_id.to_string())
                .body(Body::from(serde_json::to_string(&payload).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body_json: PresignedUrlResponse = serde_json::from_slice(&body_bytes).unwrap();

    // The handler derives only the extension; traversal never reaches the key.
    assert!(body_json.resource_key.ends_with(".png"));
    assert!(!body_json.resource_key.contains(".."));
}

#[tokio::test]
async fn test_presigned_url_rejects_disallowed_types() {
    let app = app(MockStorageService::new());
    let user_id = Uuid::new_v4();

    // GIFs are banned even when the filename looks innocent
    let payload = PresignedUrlRequest {
        filename: "definitely_a_photo.jpg".to_string(),
        file_type: "image/gif".to_string(),
    };

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/upload/presigned")
                .header("Content-Type", "application/json")
                .header("x-user-id", user_id.to_string())
                .body(Body::from(serde_json::to_string(&payload).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn test_presigned_url_storage_failure() {
    let app = app(MockStorageService::new_failing());
    let user_id = Uuid::new_v4();

    let payload = PresignedUrlRequest {
        filename: "valid.webp".to_string(),
        file_type: "image/webp".to_string(),
    };

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/upload/presigned")
                .header("Content-Type", "application/json")
                .header("x-user-id", user_id.to_string())
                .body(Body::from(serde_json::to_string(&payload).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
