use std::sync::Arc;
use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use tokio::sync::mpsc;
use uuid::Uuid;

use stockledger_api::auth::{AuthConfig, AuthService};
use stockledger_api::entities::{item, stock_movement};
use stockledger_api::events::{process_events, EventSender};
use stockledger_api::handlers::AppServices;
use stockledger_api::migrator::Migrator;
use stockledger_api::services::items::CreateItemInput;
use stockledger_api::services::users::RegisterInput;

pub const TEST_JWT_SECRET: &str =
    "integration_test_secret_key_that_is_long_enough_for_hs256_signing_03";

pub struct TestApp {
    pub db: Arc<DatabaseConnection>,
    pub services: AppServices,
    pub auth: Arc<AuthService>,
}

/// Boots the service stack against an in-memory SQLite database. The pool is
/// pinned to one connection so every task observes the same database.
pub async fn spawn_app() -> TestApp {
    let mut opt = ConnectOptions::new("sqlite::memory:".to_owned());
    opt.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(opt).await.expect("db connect");
    Migrator::up(&db, None).await.expect("migrations");

    let db = Arc::new(db);
    let (tx, rx) = mpsc::channel(256);
    let event_sender = EventSender::new(tx);
    tokio::spawn(process_events(rx));

    let auth = Arc::new(AuthService::new(AuthConfig::new(
        TEST_JWT_SECRET.to_string(),
        "stockledger-api".to_string(),
        "stockledger-clients".to_string(),
        Duration::from_secs(3600),
    )));
    let services = AppServices::new(db.clone(), event_sender, auth.clone());

    TestApp { db, services, auth }
}

pub async fn register_owner(app: &TestApp, email: &str) -> Uuid {
    app.services
        .users
        .register(RegisterInput {
            email: email.to_string(),
            password: "pass-word-123".to_string(),
            display_name: "Test Owner".to_string(),
        })
        .await
        .expect("register owner")
        .user
        .id
}

pub async fn create_item(
    app: &TestApp,
    owner_id: Uuid,
    sku: &str,
    quantity: i32,
) -> item::Model {
    let (created, _initial) = app
        .services
        .items
        .create_item(
            owner_id,
            CreateItemInput {
                name: format!("Item {}", sku),
                sku: Some(sku.to_string()),
                quantity,
                low_stock_threshold: 0,
                supplier_name: None,
            },
        )
        .await
        .expect("create item");
    created
}

pub async fn fetch_item(app: &TestApp, owner_id: Uuid, item_id: Uuid) -> item::Model {
    app.services
        .items
        .get_item(owner_id, item_id)
        .await
        .expect("fetch item")
}

pub async fn movements_for_item(app: &TestApp, item_id: Uuid) -> Vec<stock_movement::Model> {
    use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};

    stock_movement::Entity::find()
        .filter(stock_movement::Column::ItemId.eq(item_id))
        .order_by_desc(stock_movement::Column::CreatedAt)
        .all(&*app.db)
        .await
        .expect("fetch movements")
}
