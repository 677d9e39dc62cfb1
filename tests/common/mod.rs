// Not every test binary touches every helper.
#![allow(dead_code)]

use sea_orm::DatabaseConnection;
use std::sync::Arc;
use stockledger_api::{
    config::AppConfig,
    db,
    entities::stock_item,
    events::{process_events, ChangeFeed, EventSender},
    handlers::AppServices,
    services::catalog::CreateItemInput,
};
use tokio::sync::mpsc;
use uuid::Uuid;

pub struct TestApp {
    pub db: Arc<DatabaseConnection>,
    pub services: AppServices,
    pub feed: ChangeFeed,
    pub owner: Uuid,
}

/// Boots an in-memory database with the embedded migrations and wires the
/// services the way `main` does.
pub async fn setup() -> TestApp {
    // A single pooled connection keeps the in-memory database alive for the
    // whole test and serializes writers the way a real backend's row locks
    // would.
    let db_cfg = db::DbConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        min_connections: 1,
        ..Default::default()
    };
    let pool = db::establish_connection_with_config(&db_cfg)
        .await
        .expect("db connect");
    db::run_migrations(&pool).await.expect("migrations");

    let db_arc = Arc::new(pool);
    let (tx, rx) = mpsc::channel(256);
    let sender = EventSender::new(tx);
    let feed = ChangeFeed::new();
    tokio::spawn(process_events(rx, feed.clone()));

    let cfg = AppConfig::new(
        "sqlite::memory:".to_string(),
        "a_sufficiently_long_test_secret_value_0123456789".to_string(),
        "127.0.0.1".to_string(),
        0,
        "test".to_string(),
    );
    let services = AppServices::new(db_arc.clone(), sender, &cfg);

    TestApp {
        db: db_arc,
        services,
        feed,
        owner: Uuid::new_v4(),
    }
}

pub async fn create_item(
    app: &TestApp,
    name: &str,
    unit: &str,
    low_stock_threshold: i32,
) -> stock_item::Model {
    app.services
        .catalog
        .create_item(
            app.owner,
            CreateItemInput {
                name: name.to_string(),
                unit: unit.to_string(),
                low_stock_threshold,
                sku: None,
                urgent_note: None,
            },
        )
        .await
        .expect("create item")
}
