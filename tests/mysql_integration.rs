//! MySQL integration tests
//!
//! These tests require a running MySQL instance. They are ignored by default.
//! To run them:
//!
//! ```sh
//! # Set environment variables (optional, defaults shown)
//! export MYSQL_HOST=localhost
//! export MYSQL_USER=root
//! export MYSQL_PASSWORD=root
//! export MYSQL_DB=mealtrack_test
//!
//! # Run the ignored tests
//! cargo test --features mysql --test mysql_integration -- --ignored
//! ```

#![cfg(feature = "mysql")]

use std::env;

use mealtrack_migrate::prelude::*;
use mealtrack_migrate::revisions;
use mysql::prelude::*;
use mysql::{Conn, Opts};

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

fn test_url() -> String {
    let host = env::var("MYSQL_HOST").unwrap_or_else(|_| "localhost".to_string());
    let user = env::var("MYSQL_USER").unwrap_or_else(|_| "root".to_string());
    let password = env::var("MYSQL_PASSWORD").unwrap_or_else(|_| "root".to_string());
    let dbname = env::var("MYSQL_DB").unwrap_or_else(|_| "mealtrack_test".to_string());

    format!("mysql://{}:{}@{}/{}", user, password, host, dbname)
}

fn get_test_conn() -> Option<Conn> {
    let opts = Opts::from_url(&test_url()).ok()?;
    Conn::new(opts).ok()
}

fn cleanup_tables(conn: &mut Conn) {
    let _ = conn.query_drop("SET FOREIGN_KEY_CHECKS = 0");
    for table in TABLES {
        let _ = conn.query_drop(format!("DROP TABLE IF EXISTS {}", table));
    }
    let _ = conn.query_drop("SET FOREIGN_KEY_CHECKS = 1");
}

fn fresh_store() -> Option<MySqlStore> {
    let mut conn = get_test_conn()?;
    cleanup_tables(&mut conn);
    MySqlStore::new(conn).ok()
}

#[test]
#[ignore = "requires mysql connection"]
fn upgrade_head_then_downgrade_base() {
    let Some(store) = fresh_store() else {
        eprintln!("Skipping test: could not connect to MySQL");
        return;
    };
    let chain = revisions::chain().unwrap();
    let mut engine = Engine::new(&chain, store);

    let reports = engine.with_lock(|e| e.upgrade(&Target::Head)).unwrap();
    assert_eq!(reports.len(), chain.len());
    assert_eq!(engine.current().unwrap().as_deref(), Some("008"));
    assert!(engine.store_mut().column_exists("meals", "image_url").unwrap());

    engine.downgrade(&Target::Base).unwrap();
    assert_eq!(engine.current().unwrap(), None);
    assert!(!engine.store_mut().table_exists("users").unwrap());

    cleanup_tables(engine.into_store().conn());
}

#[test]
#[ignore = "requires mysql connection"]
fn failed_step_keeps_previous_marker() {
    let Some(store) = fresh_store() else {
        eprintln!("Skipping test: could not connect to MySQL");
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

    // DDL auto-commits on MySQL; the probe lets a rerun pick up where it stopped.
    assert!(engine.store_mut().table_exists("meals").unwrap());

    cleanup_tables(engine.into_store().conn());
}

#[test]
#[ignore = "requires mysql connection"]
fn rerun_after_partial_step_skips_applied_actions() {
    let Some(mut store) = fresh_store() else {
        eprintln!("Skipping test: could not connect to MySQL");
        return;
    };
    let chain = revisions::chain().unwrap();

    for sql in chain.get("001").unwrap().forward_sql(&MySql) {
        store.execute(&sql).unwrap();
    }

    let mut engine = Engine::new(&chain, store);
    let reports = engine
        .upgrade(&Target::Revision("001".to_string()))
        .unwrap();

    assert_eq!(reports[0].skipped(), 2);
    assert_eq!(engine.current().unwrap().as_deref(), Some("001"));

    cleanup_tables(engine.into_store().conn());
}

#[test]
#[ignore = "requires mysql connection"]
fn lock_is_exclusive() {
    let (Some(mut first), Some(conn)) = (fresh_store(), get_test_conn()) else {
        eprintln!("Skipping test: could not connect to MySQL");
        return;
    };
    let mut second = MySqlStore::new(conn).unwrap();

    first.acquire_lock().unwrap();
    assert!(matches!(
        second.acquire_lock(),
        Err(StoreError::LockUnavailable(_))
    ));
    first.release_lock().unwrap();
    second.acquire_lock().unwrap();
    second.release_lock().unwrap();

    cleanup_tables(first.conn());
}
