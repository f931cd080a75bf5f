//! Persistent stores the engine migrates.
//!
//! A [`StoreDriver`] executes statements, brackets them in transactions,
//! answers schema probes through [`SchemaInspector`] and owns the single-row
//! version table holding the applied marker. Each driver creates its version
//! table when constructed.

mod memory;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(feature = "postgres")]
mod postgres;

#[cfg(feature = "mysql")]
mod mysql;

pub use memory::{MemoryStore, TransactionEvent};

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

#[cfg(feature = "postgres")]
pub use self::postgres::PostgresStore;

#[cfg(feature = "mysql")]
pub use self::mysql::MySqlStore;

use crate::dialect::Dialect;
use crate::error::StoreError;
use crate::probe::SchemaInspector;

pub const DEFAULT_VERSION_TABLE: &str = "schema_version";

pub trait StoreDriver: SchemaInspector {
    fn dialect(&self) -> &'static dyn Dialect;

    fn version_table(&self) -> &str;

    fn execute(&mut self, sql: &str) -> Result<(), StoreError>;

    fn begin(&mut self) -> Result<(), StoreError>;

    fn commit(&mut self) -> Result<(), StoreError>;

    fn rollback(&mut self) -> Result<(), StoreError>;

    /// The applied marker, `None` on a fresh store.
    fn read_marker(&mut self) -> Result<Option<String>, StoreError>;

    /// Replace the marker row; `None` clears it.
    fn write_marker(&mut self, revision: Option<&str>) -> Result<(), StoreError> {
        let table = self.version_table().to_string();
        for sql in self.dialect().marker_update_sql(&table, revision) {
            self.execute(&sql)?;
        }
        Ok(())
    }

    /// Serialize concurrent runs against the same database.
    fn acquire_lock(&mut self) -> Result<(), StoreError> {
        Ok(())
    }

    fn release_lock(&mut self) -> Result<(), StoreError> {
        Ok(())
    }
}

impl<T: SchemaInspector + ?Sized> SchemaInspector for Box<T> {
    fn table_exists(&mut self, table: &str) -> Result<bool, StoreError> {
        (**self).table_exists(table)
    }

    fn column_exists(&mut self, table: &str, column: &str) -> Result<bool, StoreError> {
        (**self).column_exists(table, column)
    }

    fn index_exists(&mut self, table: &str, index: &str) -> Result<bool, StoreError> {
        (**self).index_exists(table, index)
    }
}

impl<T: StoreDriver + ?Sized> StoreDriver for Box<T> {
    fn dialect(&self) -> &'static dyn Dialect {
        (**self).dialect()
    }

    fn version_table(&self) -> &str {
        (**self).version_table()
    }

    fn execute(&mut self, sql: &str) -> Result<(), StoreError> {
        (**self).execute(sql)
    }

    fn begin(&mut self) -> Result<(), StoreError> {
        (**self).begin()
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        (**self).commit()
    }

    fn rollback(&mut self) -> Result<(), StoreError> {
        (**self).rollback()
    }

    fn read_marker(&mut self) -> Result<Option<String>, StoreError> {
        (**self).read_marker()
    }

    fn write_marker(&mut self, revision: Option<&str>) -> Result<(), StoreError> {
        (**self).write_marker(revision)
    }

    fn acquire_lock(&mut self) -> Result<(), StoreError> {
        (**self).acquire_lock()
    }

    fn release_lock(&mut self) -> Result<(), StoreError> {
        (**self).release_lock()
    }
}

/// Collapse the rows of the version table into the marker.
pub(crate) fn single_marker(table: &str, rows: Vec<String>) -> Result<Option<String>, StoreError> {
    match rows.len() {
        0 | 1 => Ok(rows.into_iter().next()),
        n => Err(StoreError::CorruptMarker {
            table: table.to_string(),
            rows: n,
        }),
    }
}

pub(crate) fn select_marker_sql(dialect: &dyn Dialect, table: &str) -> String {
    format!(
        "SELECT {} FROM {}",
        dialect.quote_identifier(crate::dialect::VERSION_COLUMN),
        dialect.quote_identifier(table)
    )
}
