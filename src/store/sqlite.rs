use std::path::Path;

use rusqlite::Connection;

use crate::dialect::{Dialect, Sqlite};
use crate::error::StoreError;
use crate::probe::SchemaInspector;
use crate::store::{select_marker_sql, single_marker, StoreDriver, DEFAULT_VERSION_TABLE};

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::driver(err)
    }
}

/// SQLite store. Concurrent writers are serialized by SQLite's own file
/// lock, so the advisory lock is a no-op.
pub struct SqliteStore {
    conn: Connection,
    version_table: String,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::new(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::new(Connection::open_in_memory()?)
    }

    pub fn new(conn: Connection) -> Result<Self, StoreError> {
        Self::with_version_table(conn, DEFAULT_VERSION_TABLE)
    }

    pub fn with_version_table(conn: Connection, version_table: &str) -> Result<Self, StoreError> {
        let store = Self {
            conn,
            version_table: version_table.to_string(),
        };
        store.ensure_table()?;
        Ok(store)
    }

    fn ensure_table(&self) -> Result<(), StoreError> {
        self.conn
            .execute_batch(&Sqlite.version_table_sql(&self.version_table))?;
        Ok(())
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn into_connection(self) -> Connection {
        self.conn
    }
}

impl SchemaInspector for SqliteStore {
    fn table_exists(&mut self, table: &str) -> Result<bool, StoreError> {
        let found = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
            [table],
            |row| row.get(0),
        )?;
        Ok(found)
    }

    fn column_exists(&mut self, table: &str, column: &str) -> Result<bool, StoreError> {
        let found = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM pragma_table_info(?1) WHERE name = ?2)",
            [table, column],
            |row| row.get(0),
        )?;
        Ok(found)
    }

    fn index_exists(&mut self, table: &str, index: &str) -> Result<bool, StoreError> {
        let found = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master
             WHERE type = 'index' AND tbl_name = ?1 AND name = ?2)",
            [table, index],
            |row| row.get(0),
        )?;
        Ok(found)
    }
}

impl StoreDriver for SqliteStore {
    fn dialect(&self) -> &'static dyn Dialect {
        &Sqlite
    }

    fn version_table(&self) -> &str {
        &self.version_table
    }

    fn execute(&mut self, sql: &str) -> Result<(), StoreError> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    fn begin(&mut self) -> Result<(), StoreError> {
        self.conn.execute_batch("BEGIN")?;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), StoreError> {
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }

    fn read_marker(&mut self) -> Result<Option<String>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(&select_marker_sql(&Sqlite, &self.version_table))?;
        let rows = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;

        single_marker(&self.version_table, rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_version_table_on_init() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        assert!(store.table_exists("schema_version").unwrap());
        assert!(store.column_exists("schema_version", "version_num").unwrap());
        assert_eq!(store.read_marker().unwrap(), None);
    }

    #[test]
    fn custom_version_table() {
        let conn = Connection::open_in_memory().unwrap();
        let mut store = SqliteStore::with_version_table(conn, "mealtrack_version").unwrap();
        assert!(store.table_exists("mealtrack_version").unwrap());
        assert!(!store.table_exists("schema_version").unwrap());
    }

    #[test]
    fn marker_round_trip() {
        let mut store = SqliteStore::open_in_memory().unwrap();

        store.write_marker(Some("003")).unwrap();
        assert_eq!(store.read_marker().unwrap(), Some("003".to_string()));

        store.write_marker(Some("004")).unwrap();
        assert_eq!(store.read_marker().unwrap(), Some("004".to_string()));

        store.write_marker(None).unwrap();
        assert_eq!(store.read_marker().unwrap(), None);
    }

    #[test]
    fn extra_marker_rows_are_corruption() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store
            .execute("INSERT INTO schema_version (version_num) VALUES ('001'), ('002')")
            .unwrap();

        assert!(matches!(
            store.read_marker(),
            Err(StoreError::CorruptMarker { rows: 2, .. })
        ));
    }

    #[test]
    fn inspects_schema() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store
            .execute("CREATE TABLE meals (id INTEGER PRIMARY KEY, user_id INTEGER)")
            .unwrap();
        store
            .execute("CREATE INDEX idx_meals_user_id ON meals (user_id)")
            .unwrap();

        assert!(store.table_exists("meals").unwrap());
        assert!(!store.table_exists("food_items").unwrap());
        assert!(store.column_exists("meals", "user_id").unwrap());
        assert!(!store.column_exists("meals", "image_url").unwrap());
        assert!(!store.column_exists("food_items", "name").unwrap());
        assert!(store.index_exists("meals", "idx_meals_user_id").unwrap());
        assert!(!store.index_exists("meals", "idx_meals_logged_at").unwrap());
    }

    #[test]
    fn rollback_discards_changes() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.begin().unwrap();
        store.execute("CREATE TABLE users (id INTEGER)").unwrap();
        store.write_marker(Some("001")).unwrap();
        store.rollback().unwrap();

        assert!(!store.table_exists("users").unwrap());
        assert_eq!(store.read_marker().unwrap(), None);
    }
}
