#![cfg(feature = "sqlite")]

use mealtrack_migrate::prelude::*;
use mealtrack_migrate::revisions;

fn tables(store: &SqliteStore) -> Vec<String> {
    let conn = store.connection();
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
        .unwrap();
    stmt.query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<Vec<String>, _>>()
        .unwrap()
}

fn version_rows(store: &SqliteStore) -> i64 {
    store
        .connection()
        .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
        .unwrap()
}

#[test]
fn upgrade_head_creates_schema() {
    let chain = revisions::chain().unwrap();
    let mut engine = Engine::new(&chain, SqliteStore::open_in_memory().unwrap());

    let reports = engine.upgrade(&Target::Head).unwrap();
    assert_eq!(reports.len(), chain.len());
    assert!(reports.iter().all(|r| r.skipped() == 0));

    assert_eq!(
        tables(engine.store()),
        vec![
            "chat_messages",
            "chat_threads",
            "food_items",
            "meals",
            "notification_preferences",
            "schema_version",
            "subscriptions",
            "users",
        ]
    );
    assert_eq!(engine.current().unwrap().as_deref(), Some("008"));
    assert_eq!(version_rows(engine.store()), 1);
}

#[test]
fn upgrade_at_head_is_a_noop() {
    let chain = revisions::chain().unwrap();
    let mut engine = Engine::new(&chain, SqliteStore::open_in_memory().unwrap());

    engine.upgrade(&Target::Head).unwrap();
    let reports = engine.upgrade(&Target::Head).unwrap();

    assert!(reports.is_empty());
    assert_eq!(engine.current().unwrap().as_deref(), Some("008"));
}

#[test]
fn round_trip_restores_schema() {
    let chain = revisions::chain().unwrap();
    let mut engine = Engine::new(&chain, SqliteStore::open_in_memory().unwrap());

    engine.upgrade(&Target::Head).unwrap();
    let reports = engine.downgrade(&Target::Base).unwrap();

    let reverted: Vec<&str> = reports.iter().map(|r| r.revision.as_str()).collect();
    assert_eq!(
        reverted,
        vec!["008", "007", "006", "005", "004", "003", "002", "001"]
    );
    assert_eq!(tables(engine.store()), vec!["schema_version"]);
    assert_eq!(engine.current().unwrap(), None);
    assert_eq!(version_rows(engine.store()), 0);
}

#[test]
fn downgrade_is_inclusive_of_target() {
    let chain = revisions::chain().unwrap();
    let mut engine = Engine::new(&chain, SqliteStore::open_in_memory().unwrap());

    engine.upgrade(&Target::Head).unwrap();
    engine
        .downgrade(&Target::Revision("007".to_string()))
        .unwrap();

    assert_eq!(engine.current().unwrap().as_deref(), Some("006"));
    let mut store = engine.into_store();
    assert!(!store.column_exists("users", "timezone").unwrap());
    assert!(!store.column_exists("meals", "image_url").unwrap());
    assert!(store.table_exists("notification_preferences").unwrap());
}

#[test]
fn apply_skips_work_already_in_schema() {
    let chain = revisions::chain().unwrap();
    let mut store = SqliteStore::open_in_memory().unwrap();

    // A previous run created the table and index but died before advancing the marker.
    let users = chain.get("001").unwrap();
    for sql in users.forward_sql(&Sqlite) {
        store.execute(&sql).unwrap();
    }

    let mut engine = Engine::new(&chain, store);
    let reports = engine
        .upgrade(&Target::Revision("001".to_string()))
        .unwrap();

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].executed(), 0);
    assert_eq!(reports[0].skipped(), 2);
    assert_eq!(engine.current().unwrap().as_deref(), Some("001"));
}

#[test]
fn stamp_adopts_existing_schema() {
    let chain = revisions::chain().unwrap();
    let mut store = SqliteStore::open_in_memory().unwrap();

    for revision in chain.iter().take(3) {
        for sql in revision.forward_sql(&Sqlite) {
            store.execute(&sql).unwrap();
        }
    }

    let mut engine = Engine::new(&chain, store);
    engine.stamp(&Target::Revision("003".to_string())).unwrap();
    assert_eq!(engine.current().unwrap().as_deref(), Some("003"));

    let reports = engine.upgrade(&Target::Head).unwrap();
    let applied: Vec<&str> = reports.iter().map(|r| r.revision.as_str()).collect();
    assert_eq!(applied, vec!["004", "005", "006", "007", "008"]);
    assert!(reports.iter().all(|r| r.skipped() == 0));
}

#[test]
fn stamp_base_clears_marker() {
    let chain = revisions::chain().unwrap();
    let mut engine = Engine::new(&chain, SqliteStore::open_in_memory().unwrap());

    engine.stamp(&Target::Head).unwrap();
    assert_eq!(engine.current().unwrap().as_deref(), Some("008"));

    engine.stamp(&Target::Base).unwrap();
    assert_eq!(engine.current().unwrap(), None);
    assert_eq!(tables(engine.store()), vec!["schema_version"]);
}

#[test]
fn data_survives_and_defaults_apply() {
    let chain = revisions::chain().unwrap();
    let mut engine = Engine::new(&chain, SqliteStore::open_in_memory().unwrap());
    engine.upgrade(&Target::Head).unwrap();

    let conn = engine.store().connection();
    conn.execute_batch("PRAGMA foreign_keys = ON").unwrap();
    conn.execute(
        "INSERT INTO users (email, hashed_password) VALUES ('a@example.com', 'x')",
        [],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO meals (user_id, name) VALUES (1, 'Oatmeal')",
        [],
    )
    .unwrap();

    let timezone: String = conn
        .query_row("SELECT timezone FROM users WHERE id = 1", [], |row| row.get(0))
        .unwrap();
    assert_eq!(timezone, "UTC");

    conn.execute("DELETE FROM users WHERE id = 1", []).unwrap();
    let meals: i64 = conn
        .query_row("SELECT COUNT(*) FROM meals", [], |row| row.get(0))
        .unwrap();
    assert_eq!(meals, 0);
}

#[test]
fn notification_backfill_covers_existing_users() {
    let chain = revisions::chain().unwrap();
    let mut engine = Engine::new(&chain, SqliteStore::open_in_memory().unwrap());
    engine
        .upgrade(&Target::Revision("005".to_string()))
        .unwrap();

    engine
        .store()
        .connection()
        .execute_batch(
            "INSERT INTO users (email, hashed_password) VALUES ('a@example.com', 'x');
             INSERT INTO users (email, hashed_password) VALUES ('b@example.com', 'y');",
        )
        .unwrap();

    engine.upgrade(&Target::Relative(1)).unwrap();

    let prefs: i64 = engine
        .store()
        .connection()
        .query_row("SELECT COUNT(*) FROM notification_preferences", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(prefs, 2);
}

#[test]
fn failed_step_rolls_back_and_keeps_marker() {
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
            .operation(RunSql::new("INSERT INTO missing_table VALUES (1)")),
    );
    let chain = registry.into_chain().unwrap();
    let mut engine = Engine::new(&chain, SqliteStore::open_in_memory().unwrap());

    let err = engine.upgrade(&Target::Head).unwrap_err();
    match err {
        EngineError::ActionExecution {
            revision,
            completed,
            ..
        } => {
            assert_eq!(revision, "b");
            assert_eq!(completed, vec!["a"]);
        }
        other => panic!("unexpected error: {other}"),
    }

    assert_eq!(engine.current().unwrap().as_deref(), Some("a"));
    assert_eq!(tables(engine.store()), vec!["schema_version", "users"]);
}

#[test]
fn forked_chain_runs_nothing() {
    let mut registry = revisions::registry();
    registry.register(
        Revision::new("008b")
            .down_revision("007")
            .message("parallel branch")
            .operation(CreateTable::new("streaks").add_column(Column::id())),
    );

    let err = registry.into_chain().unwrap_err();
    assert!(matches!(err, ChainIntegrityError::Fork { ref parent, .. } if parent == "007"));
}

#[test]
fn unknown_marker_is_rejected() {
    let chain = revisions::chain().unwrap();
    let mut store = SqliteStore::open_in_memory().unwrap();
    store.write_marker(Some("zzz")).unwrap();

    let mut engine = Engine::new(&chain, store);
    assert!(matches!(
        engine.upgrade(&Target::Head),
        Err(EngineError::UnknownMarker { .. })
    ));
    assert_eq!(tables(engine.store()), vec!["schema_version"]);
}

#[test]
fn offline_sql_leaves_schema_untouched() {
    let chain = revisions::chain().unwrap();
    let mut engine = Engine::new(&chain, SqliteStore::open_in_memory().unwrap());

    let steps = engine.upgrade_sql(&Target::Head).unwrap();
    assert_eq!(steps.len(), chain.len());
    assert!(steps[0].1.iter().any(|s| s.contains("CREATE TABLE \"users\"")));
    assert!(steps[0].1.iter().any(|s| s.contains("INSERT INTO \"schema_version\"")));

    assert_eq!(tables(engine.store()), vec!["schema_version"]);
    assert_eq!(engine.current().unwrap(), None);
}

#[test]
fn custom_version_table() {
    let chain = revisions::chain().unwrap();
    let conn = rusqlite::Connection::open_in_memory().unwrap();
    let store = SqliteStore::with_version_table(conn, "meal_schema").unwrap();
    let mut engine = Engine::new(&chain, store);

    engine.upgrade(&Target::Relative(2)).unwrap();

    let marker: String = engine
        .store()
        .connection()
        .query_row("SELECT version_num FROM meal_schema", [], |row| row.get(0))
        .unwrap();
    assert_eq!(marker, "002");
}
