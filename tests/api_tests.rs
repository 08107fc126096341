use hanapp_portal::{
    AppConfig, AppState, MockMailer, MockStorageService, create_router,
    models::Item,
    repository::{PostgresRepository, RepositoryState},
    storage::StorageState,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use uuid::Uuid;

#[derive(Debug)]
pub struct TestApp {
    pub address: String,
    pub pool: sqlx::PgPool,
}

async fn spawn_app() -> TestApp {
    dotenv::dotenv().ok();

    let db_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set to run API tests");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await
        .expect("Failed to connect to Postgres in tests");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    let repo = Arc::new(PostgresRepository::new(pool.clone())) as RepositoryState;
    let storage = Arc::new(MockStorageService::new()) as StorageState;
    let mailer = Arc::new(MockMailer::new());
    let config = AppConfig::load();

    let state = AppState {
        repo,
        storage,
        mailer,
        config,
    };
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp { address, pool }
}

/// Seeds a user directly and returns its id (the 'x-user-id' dev bypass header
/// authenticates these in local mode).
async fn seed_user(pool: &sqlx::PgPool, role: &str) -> Uuid {
    let id = Uuid::new_v4();
    let email = format!("{}.{}@psu.palawan.edu.ph", role, id.simple());
    sqlx::query(
        "INSERT INTO users (id, email, full_name, role, is_verified) \
         VALUES ($1, $2, $3, $4, true) ON CONFLICT DO NOTHING",
    )
    .bind(id)
    .bind(email)
    .bind("Seeded User")
    .bind(role)
    .execute(pool)
    .await
    .unwrap();
    id
}

fn item_payload(item_type: &str, title: &str) -> serde_json::Value {
    serde_json::json!({
        "item_type": item_type,
        "title": title,
        "description": "Black, slightly scratched",
        "category": "electronics",
        "location": "Student Center",
        "date": chrono::Utc::now().date_naive().to_string(),
        "display_name": true
    })
}

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let response = client
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("req fail");
    assert!(response.status().is_success());
}

#[tokio::test]
async fn test_unauthenticated_submission_rejected() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/items", app.address))
        .json(&item_payload("lost", "No Auth Phone"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_admin_routes_forbidden_for_students() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let student_id = seed_user(&app.pool, "verified").await;
    let admin_id = seed_user(&app.pool, "admin").await;

    let response = client
        .get(format!("{}/admin/stats", app.address))
        .header("x-user-id", student_id.to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    let response = client
        .get(format!("{}/admin/stats", app.address))
        .header("x-user-id", admin_id.to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_full_moderation_scenario() {
    // The canonical workflow: post -> moderate -> contact -> complete.
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let poster_id = seed_user(&app.pool, "verified").await;
    let admin_id = seed_user(&app.pool, "admin").await;
    let inquirer_id = seed_user(&app.pool, "verified").await;

    // 1. A verified user posts a found item; it enters the moderation queue.
    let response = client
        .post(format!("{}/items", app.address))
        .header("x-user-id", poster_id.to_string())
        .json(&item_payload("found", "Scenario Powerbank"))
        .send()
        .await
        .expect("post fail");
    assert_eq!(response.status(), 200);
    let item: Item = response.json().await.unwrap();
    assert_eq!(item.status, "pending");

    // 2. Verify NOT in the public browse list
    let list: Vec<Item> = client
        .get(format!("{}/items", app.address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(
        list.iter().all(|i| i.id != item.id),
        "Pending item should not be listed"
    );

    // 3. Admin approves the item
    let response = client
        .put(format!("{}/admin/items/{}/status", app.address, item.id))
        .header("x-user-id", admin_id.to_string())
        .json(&serde_json::json!({ "approve": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let approved: Item = response.json().await.unwrap();
    assert_eq!(approved.status, "approved");

    // 4. Verify IS in the public browse list now
    let list: Vec<Item> = client
        .get(format!("{}/items", app.address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(list.iter().any(|i| i.id == item.id));

    // 5. A second user messages the poster about the item
    let response = client
        .post(format!("{}/items/{}/messages", app.address, item.id))
        .header("x-user-id", inquirer_id.to_string())
        .json(&serde_json::json!({
            "subject": "I think that's mine",
            "body": "Lost one exactly like it yesterday"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    // 6. The poster marks the item claimed
    let response = client
        .post(format!("{}/items/{}/complete", app.address, item.id))
        .header("x-user-id", poster_id.to_string())
        .json(&serde_json::json!({ "completion": "claimed" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    // 7. The item leaves the active browse list and joins the success stories
    let list: Vec<Item> = client
        .get(format!("{}/items", app.address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(list.iter().all(|i| i.id != item.id));

    let stories: Vec<Item> = client
        .get(format!("{}/items/success-stories", app.address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(stories.iter().any(|i| i.id == item.id));
}
