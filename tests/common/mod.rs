#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, Set};
use tokio::sync::mpsc;

use storeroom_api::config::AppConfig;
use storeroom_api::entities::{category, department, item, staff, user};
use storeroom_api::events::{self, EventSender};
use storeroom_api::{db, AppState};

/// Boots an in-memory SQLite database with migrations applied.
///
/// The pool is capped at one connection so every task sees the same
/// in-memory database; concurrent transactions serialize on acquire, which
/// is also how SQLite's single-writer model behaves.
pub async fn setup_state() -> AppState {
    let mut opt = ConnectOptions::new("sqlite::memory:".to_owned());
    opt.max_connections(1).sqlx_logging(false);

    let conn = Database::connect(opt).await.expect("db connect");
    db::run_migrations(&conn).await.expect("migrations");

    let (tx, rx) = mpsc::channel(256);
    let event_sender = EventSender::new(tx);
    tokio::spawn(events::process_events(rx));

    let cfg = AppConfig::new(
        "sqlite::memory:".into(),
        "127.0.0.1".into(),
        0,
        "test".into(),
    );

    AppState::new(Arc::new(conn), cfg, event_sender)
}

pub async fn seed_user(state: &AppState, username: &str, full_name: &str) -> user::Model {
    user::ActiveModel {
        username: Set(username.to_string()),
        full_name: Set(full_name.to_string()),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&*state.db)
    .await
    .expect("seed user")
}

pub async fn seed_department(state: &AppState, name: &str) -> department::Model {
    department::ActiveModel {
        name: Set(name.to_string()),
        ..Default::default()
    }
    .insert(&*state.db)
    .await
    .expect("seed department")
}

pub async fn seed_category(state: &AppState, name: &str) -> category::Model {
    category::ActiveModel {
        name: Set(name.to_string()),
        ..Default::default()
    }
    .insert(&*state.db)
    .await
    .expect("seed category")
}

pub async fn seed_staff(
    state: &AppState,
    staff_code: &str,
    name: &str,
    department_id: Option<i64>,
) -> staff::Model {
    staff::ActiveModel {
        staff_code: Set(staff_code.to_string()),
        name: Set(name.to_string()),
        department_id: Set(department_id),
        job_role: Set("store-keeper".to_string()),
        ..Default::default()
    }
    .insert(&*state.db)
    .await
    .expect("seed staff")
}

pub async fn seed_item(
    state: &AppState,
    name: &str,
    category_id: i64,
    quantity: i32,
    reorder_level: i32,
) -> item::Model {
    item::ActiveModel {
        name: Set(name.to_string()),
        category_id: Set(category_id),
        quantity: Set(quantity),
        description: Set(None),
        unit_of_measurement: Set("pcs".to_string()),
        reorder_level: Set(reorder_level),
        created_at: Set(Utc::now()),
        updated_at: Set(None),
        ..Default::default()
    }
    .insert(&*state.db)
    .await
    .expect("seed item")
}

/// Rereads an item's current quantity.
pub async fn quantity_of(state: &AppState, item_id: i64) -> i32 {
    state.items.get(item_id).await.expect("item exists").quantity
}
