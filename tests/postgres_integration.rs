//! PostgreSQL integration tests
//!
//! These tests require a running PostgreSQL instance. They are ignored by default.
//! To run them:
//!
//! ```sh
//! # Set environment variables (optional, defaults shown)
//! export POSTGRES_HOST=localhost
//! export POSTGRES_USER=postgres
//! export POSTGRES_PASSWORD=postgres
//! export POSTGRES_DB=mealtrack_test
//!
//! # Run the ignored tests
//! cargo test --features postgres --test postgres_integration -- --ignored
//! ```

#![cfg(feature = "postgres")]

use std::env;

use mealtrack_migrate::prelude::*;
use mealtrack_migrate::revisions;
use postgres::{Client, NoTls};

const TABLES: &[&str] = &[
    "chat_messages",
    "chat_threads",
    "food_items",
    "meals",
    "notification_preferences",
    "subscriptions",
    "users",
    "schema_version",
];

fn connection_string() -> String {
    let host = env::var("POSTGRES_HOST").unwrap_or_else(|_| "localhost".to_string());
    let user = env::var("POSTGRES_USER").unwrap_or_else(|_| "postgres".to_string());
    let password = env::var("POSTGRES_PASSWORD").unwrap_or_else(|_| "postgres".to_string());
    let dbname = env::var("POSTGRES_DB").unwrap_or_else(|_| "mealtrack_test".to_string());

    format!(
        "host={} user={} password={} dbname={}",
        host, user, password, dbname
    )
}

fn get_test_client() -> Option<Client> {
    Client::connect(&connection_string(), NoTls).ok()
}

fn cleanup_tables(client: &mut Client) {
    for table in TABLES {
        let _ = client.batch_execute(&format!("DROP TABLE IF EXISTS {} CASCADE", table));
    }
}

fn fresh_store() -> Option<PostgresStore> {
    let mut client = get_test_client()?;
    cleanup_tables(&mut client);
    PostgresStore::new(client).ok()
}

#[test]
#[ignore = "requires postgres connection"]
fn upgrade_head_then_downgrade_base() {
    let Some(store) = fresh_store() else {
        eprintln!("Skipping test: could not connect to PostgreSQL");
        return;
    };
    let chain = revisions::chain().unwrap();
    let mut engine = Engine::new(&chain, store);

    let reports = engine.with_lock(|e| e.upgrade(&Target::Head)).unwrap();
    assert_eq!(reports.len(), chain.len());
    assert_eq!(engine.current().unwrap().as_deref(), Some("008"));
    assert!(engine.store_mut().column_exists("users", "timezone").unwrap());
    assert!(engine
        .store_mut()
        .index_exists("meals", "idx_meals_logged_at")
        .unwrap());

    engine.downgrade(&Target::Base).unwrap();
    assert_eq!(engine.current().unwrap(), None);
    for table in TABLES.iter().filter(|t| **t != "schema_version") {
        assert!(!engine.store_mut().table_exists(table).unwrap(), "{table} left behind");
    }

    cleanup_tables(engine.into_store().client());
}

#[test]
#[ignore = "requires postgres connection"]
fn failed_step_is_rolled_back() {
    let Some(store) = fresh_store() else {
        eprintln!("Skipping test: could not connect to PostgreSQL");
        return;
    };

    let mut registry = RevisionRegistry::new();
    registry.register(
        Revision::new("a")
            .message("create users")
            .operation(CreateTable::new("users").add_column(Column::id())),
    );
    registry.register(
        Revision::new("b")
            .down_revision("a")
            .message("broken")
            .operation(CreateTable::new("meals").add_column(Column::id()))
            .operation(RunSql::new("SELECT * FROM missing_table")),
    );
    let chain = registry.into_chain().unwrap();
    let mut engine = Engine::new(&chain, store);

    let err = engine.upgrade(&Target::Head).unwrap_err();
    assert!(matches!(err, EngineError::ActionExecution { .. }));
    assert_eq!(engine.current().unwrap().as_deref(), Some("a"));
    assert!(engine.store_mut().table_exists("users").unwrap());
    assert!(!engine.store_mut().table_exists("meals").unwrap());

    cleanup_tables(engine.into_store().client());
}

#[test]
#[ignore = "requires postgres connection"]
fn partial_apply_is_resumed() {
    let Some(mut store) = fresh_store() else {
        eprintln!("Skipping test: could not connect to PostgreSQL");
        return;
    };
    let chain = revisions::chain().unwrap();

    for sql in chain.get("001").unwrap().forward_sql(&Postgres) {
        store.execute(&sql).unwrap();
    }

    let mut engine = Engine::new(&chain, store);
    let reports = engine
        .upgrade(&Target::Revision("002".to_string()))
        .unwrap();

    assert_eq!(reports[0].revision, "001");
    assert_eq!(reports[0].executed(), 0);
    assert_eq!(reports[1].skipped(), 0);
    assert_eq!(engine.current().unwrap().as_deref(), Some("002"));

    cleanup_tables(engine.into_store().client());
}

#[test]
#[ignore = "requires postgres connection"]
fn open_store_from_url() {
    if get_test_client().is_none() {
        eprintln!("Skipping test: could not connect to PostgreSQL");
        return;
    }

    let host = env::var("POSTGRES_HOST").unwrap_or_else(|_| "localhost".to_string());
    let user = env::var("POSTGRES_USER").unwrap_or_else(|_| "postgres".to_string());
    let password = env::var("POSTGRES_PASSWORD").unwrap_or_else(|_| "postgres".to_string());
    let dbname = env::var("POSTGRES_DB").unwrap_or_else(|_| "mealtrack_test".to_string());
    let url = format!("postgres://{}:{}@{}/{}", user, password, host, dbname);

    let settings = Settings::new(Some(url), Some("meal_schema_test".to_string())).unwrap();
    let mut store = open_store(&settings).unwrap();
    assert_eq!(store.dialect().name(), "postgres");
    assert!(store.table_exists("meal_schema_test").unwrap());
    store.execute("DROP TABLE meal_schema_test").unwrap();
}
