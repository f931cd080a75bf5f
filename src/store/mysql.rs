use mysql::prelude::*;
use mysql::{Conn, Opts};

use crate::dialect::{Dialect, MySql};
use crate::error::StoreError;
use crate::probe::SchemaInspector;
use crate::store::{select_marker_sql, single_marker, StoreDriver, DEFAULT_VERSION_TABLE};

const LOCK_NAME: &str = "mealtrack_migrate";
const LOCK_TIMEOUT_SECS: u32 = 30;

impl From<mysql::Error> for StoreError {
    fn from(err: mysql::Error) -> Self {
        StoreError::driver(err)
    }
}

impl From<mysql::UrlError> for StoreError {
    fn from(err: mysql::UrlError) -> Self {
        StoreError::driver(err)
    }
}

/// MySQL store. DDL commits implicitly, so the engine uses `begin`/`commit`
/// only around the marker write; idempotence of the DDL rests on the probes.
pub struct MySqlStore {
    conn: Conn,
    version_table: String,
}

impl MySqlStore {
    pub fn connect(url: &str) -> Result<Self, StoreError> {
        let opts = Opts::from_url(url)?;
        Self::new(Conn::new(opts)?)
    }

    pub fn new(conn: Conn) -> Result<Self, StoreError> {
        Self::with_version_table(conn, DEFAULT_VERSION_TABLE)
    }

    pub fn with_version_table(conn: Conn, version_table: &str) -> Result<Self, StoreError> {
        let mut store = Self {
            conn,
            version_table: version_table.to_string(),
        };
        store.ensure_table()?;
        Ok(store)
    }

    fn ensure_table(&mut self) -> Result<(), StoreError> {
        self.conn
            .query_drop(MySql.version_table_sql(&self.version_table))?;
        Ok(())
    }

    pub fn conn(&mut self) -> &mut Conn {
        &mut self.conn
    }
}

impl SchemaInspector for MySqlStore {
    fn table_exists(&mut self, table: &str) -> Result<bool, StoreError> {
        let found: Option<bool> = self.conn.exec_first(
            "SELECT EXISTS(SELECT 1 FROM information_schema.tables
             WHERE table_schema = DATABASE() AND table_name = ?)",
            (table,),
        )?;
        Ok(found.unwrap_or(false))
    }

    fn column_exists(&mut self, table: &str, column: &str) -> Result<bool, StoreError> {
        let found: Option<bool> = self.conn.exec_first(
            "SELECT EXISTS(SELECT 1 FROM information_schema.columns
             WHERE table_schema = DATABASE() AND table_name = ? AND column_name = ?)",
            (table, column),
        )?;
        Ok(found.unwrap_or(false))
    }

    fn index_exists(&mut self, table: &str, index: &str) -> Result<bool, StoreError> {
        let found: Option<bool> = self.conn.exec_first(
            "SELECT EXISTS(SELECT 1 FROM information_schema.statistics
             WHERE table_schema = DATABASE() AND table_name = ? AND index_name = ?)",
            (table, index),
        )?;
        Ok(found.unwrap_or(false))
    }
}

impl StoreDriver for MySqlStore {
    fn dialect(&self) -> &'static dyn Dialect {
        &MySql
    }

    fn version_table(&self) -> &str {
        &self.version_table
    }

    fn execute(&mut self, sql: &str) -> Result<(), StoreError> {
        self.conn.query_drop(sql)?;
        Ok(())
    }

    fn begin(&mut self) -> Result<(), StoreError> {
        self.conn.query_drop("START TRANSACTION")?;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        self.conn.query_drop("COMMIT")?;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), StoreError> {
        self.conn.query_drop("ROLLBACK")?;
        Ok(())
    }

    fn read_marker(&mut self) -> Result<Option<String>, StoreError> {
        let rows: Vec<String> = self
            .conn
            .query(select_marker_sql(&MySql, &self.version_table))?;

        single_marker(&self.version_table, rows)
    }

    fn acquire_lock(&mut self) -> Result<(), StoreError> {
        let acquired: Option<Option<i64>> = self
            .conn
            .exec_first("SELECT GET_LOCK(?, ?)", (LOCK_NAME, LOCK_TIMEOUT_SECS))?;
        match acquired.flatten() {
            Some(1) => Ok(()),
            _ => Err(StoreError::LockUnavailable(LOCK_NAME.to_string())),
        }
    }

    fn release_lock(&mut self) -> Result<(), StoreError> {
        self.conn
            .exec_drop("SELECT RELEASE_LOCK(?)", (LOCK_NAME,))?;
        Ok(())
    }
}
