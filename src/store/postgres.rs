use postgres::{Client, NoTls};

use crate::dialect::{Dialect, Postgres};
use crate::error::StoreError;
use crate::probe::SchemaInspector;
use crate::store::{select_marker_sql, single_marker, StoreDriver, DEFAULT_VERSION_TABLE};

/// Key for `pg_advisory_lock`, shared by every mealtrack-migrate process.
const ADVISORY_LOCK_KEY: i64 = 0x6d65_616c_7472_6b;

impl From<postgres::Error> for StoreError {
    fn from(err: postgres::Error) -> Self {
        StoreError::driver(err)
    }
}

pub struct PostgresStore {
    client: Client,
    version_table: String,
}

impl PostgresStore {
    /// Connect with a `postgres://` URL or a key/value connection string.
    pub fn connect(params: &str) -> Result<Self, StoreError> {
        Self::new(Client::connect(params, NoTls)?)
    }

    pub fn new(client: Client) -> Result<Self, StoreError> {
        Self::with_version_table(client, DEFAULT_VERSION_TABLE)
    }

    pub fn with_version_table(client: Client, version_table: &str) -> Result<Self, StoreError> {
        let mut store = Self {
            client,
            version_table: version_table.to_string(),
        };
        store.ensure_table()?;
        Ok(store)
    }

    fn ensure_table(&mut self) -> Result<(), StoreError> {
        self.client
            .batch_execute(&Postgres.version_table_sql(&self.version_table))?;
        Ok(())
    }

    pub fn client(&mut self) -> &mut Client {
        &mut self.client
    }
}

impl SchemaInspector for PostgresStore {
    fn table_exists(&mut self, table: &str) -> Result<bool, StoreError> {
        let row = self.client.query_one(
            "SELECT EXISTS(SELECT 1 FROM information_schema.tables
             WHERE table_schema = current_schema() AND table_name = $1)",
            &[&table],
        )?;
        Ok(row.try_get(0)?)
    }

    fn column_exists(&mut self, table: &str, column: &str) -> Result<bool, StoreError> {
        let row = self.client.query_one(
            "SELECT EXISTS(SELECT 1 FROM information_schema.columns
             WHERE table_schema = current_schema() AND table_name = $1 AND column_name = $2)",
            &[&table, &column],
        )?;
        Ok(row.try_get(0)?)
    }

    fn index_exists(&mut self, table: &str, index: &str) -> Result<bool, StoreError> {
        let row = self.client.query_one(
            "SELECT EXISTS(SELECT 1 FROM pg_indexes
             WHERE schemaname = current_schema() AND tablename = $1 AND indexname = $2)",
            &[&table, &index],
        )?;
        Ok(row.try_get(0)?)
    }
}

impl StoreDriver for PostgresStore {
    fn dialect(&self) -> &'static dyn Dialect {
        &Postgres
    }

    fn version_table(&self) -> &str {
        &self.version_table
    }

    fn execute(&mut self, sql: &str) -> Result<(), StoreError> {
        self.client.batch_execute(sql)?;
        Ok(())
    }

    fn begin(&mut self) -> Result<(), StoreError> {
        self.client.batch_execute("BEGIN")?;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        self.client.batch_execute("COMMIT")?;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), StoreError> {
        self.client.batch_execute("ROLLBACK")?;
        Ok(())
    }

    fn read_marker(&mut self) -> Result<Option<String>, StoreError> {
        let sql = select_marker_sql(&Postgres, &self.version_table);
        let rows = self.client.query(sql.as_str(), &[])?;
        let markers = rows
            .iter()
            .map(|row| row.try_get(0))
            .collect::<Result<Vec<String>, _>>()?;

        single_marker(&self.version_table, markers)
    }

    fn acquire_lock(&mut self) -> Result<(), StoreError> {
        self.client
            .execute("SELECT pg_advisory_lock($1)", &[&ADVISORY_LOCK_KEY])?;
        Ok(())
    }

    fn release_lock(&mut self) -> Result<(), StoreError> {
        self.client
            .execute("SELECT pg_advisory_unlock($1)", &[&ADVISORY_LOCK_KEY])?;
        Ok(())
    }
}
