use std::collections::{BTreeMap, BTreeSet};

use crate::dialect::{Dialect, Sqlite};
use crate::error::StoreError;
use crate::probe::SchemaInspector;
use crate::store::{StoreDriver, DEFAULT_VERSION_TABLE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionEvent {
    Begin,
    Commit,
    Rollback,
}

#[derive(Debug, Clone, Default)]
struct Schema {
    tables: BTreeMap<String, BTreeSet<String>>,
    indexes: BTreeSet<(String, String)>,
    marker: Option<String>,
}

/// In-memory store for tests.
///
/// Every statement is recorded. The DDL shapes the dialects emit with
/// double-quoted identifiers (create/drop/rename table, add/drop/rename
/// column, create/drop index) are also applied to an in-memory schema so
/// probes observe them; anything else is only recorded. `rollback` restores
/// the schema and marker saved at the last `begin`.
pub struct MemoryStore {
    dialect: &'static dyn Dialect,
    version_table: String,
    schema: Schema,
    saved: Option<Schema>,
    executed: Vec<String>,
    transactions: Vec<TransactionEvent>,
    fail_on: Option<String>,
    fail_marker_writes: bool,
    marker_statements: bool,
    locked: bool,
    lock_acquisitions: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            dialect: &Sqlite,
            version_table: DEFAULT_VERSION_TABLE.to_string(),
            schema: Schema::default(),
            saved: None,
            executed: Vec::new(),
            transactions: Vec::new(),
            fail_on: None,
            fail_marker_writes: false,
            marker_statements: false,
            locked: false,
            lock_acquisitions: 0,
        }
    }

    pub fn with_dialect(mut self, dialect: &'static dyn Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn with_version_table(mut self, table: impl Into<String>) -> Self {
        self.version_table = table.into();
        self
    }

    pub fn with_table(mut self, table: &str, columns: &[&str]) -> Self {
        self.schema.tables.insert(
            table.to_string(),
            columns.iter().map(|c| c.to_string()).collect(),
        );
        self
    }

    pub fn with_index(mut self, table: &str, index: &str) -> Self {
        self.schema
            .indexes
            .insert((table.to_string(), index.to_string()));
        self
    }

    pub fn with_marker(mut self, revision: &str) -> Self {
        self.schema.marker = Some(revision.to_string());
        self
    }

    /// Fail any statement containing `fragment`.
    pub fn fail_on(mut self, fragment: impl Into<String>) -> Self {
        self.fail_on = Some(fragment.into());
        self
    }

    pub fn fail_marker_writes(mut self) -> Self {
        self.fail_marker_writes = true;
        self
    }

    /// Write the marker through the dialect's DELETE/INSERT pair via
    /// `execute`, the way the database drivers do.
    pub fn marker_statements(mut self) -> Self {
        self.marker_statements = true;
        self
    }

    pub fn executed(&self) -> &[String] {
        &self.executed
    }

    pub fn transactions(&self) -> &[TransactionEvent] {
        &self.transactions
    }

    pub fn marker(&self) -> Option<&str> {
        self.schema.marker.as_deref()
    }

    pub fn tables(&self) -> Vec<&str> {
        self.schema.tables.keys().map(String::as_str).collect()
    }

    pub fn columns(&self, table: &str) -> Vec<&str> {
        self.schema
            .tables
            .get(table)
            .map(|columns| columns.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    fn apply_marker_dml(&mut self, sql: &str) -> bool {
        let upper = sql.trim_start().to_ascii_uppercase();
        if !sql.contains(self.version_table.as_str()) {
            return false;
        }

        if upper.starts_with("DELETE FROM") {
            self.schema.marker = None;
            true
        } else if upper.starts_with("INSERT INTO") {
            self.schema.marker = sql
                .rsplit_once("('")
                .and_then(|(_, rest)| rest.split_once("')"))
                .map(|(value, _)| value.to_string());
            true
        } else {
            false
        }
    }

    fn apply_ddl(&mut self, sql: &str) {
        let upper = sql.trim_start().to_ascii_uppercase();
        let idents = quoted_identifiers(sql);
        let schema = &mut self.schema;

        if upper.starts_with("CREATE TABLE") {
            if let Some(table) = idents.first() {
                schema
                    .tables
                    .entry(table.clone())
                    .or_insert_with(|| table_columns(sql));
            }
        } else if upper.starts_with("DROP TABLE") {
            if let Some(table) = idents.first() {
                schema.tables.remove(table);
                schema.indexes.retain(|(t, _)| t != table);
            }
        } else if upper.starts_with("ALTER TABLE") {
            let [table, rest @ ..] = idents.as_slice() else {
                return;
            };
            if upper.contains(" ADD COLUMN ") {
                if let (Some(columns), Some(column)) = (schema.tables.get_mut(table), rest.first()) {
                    columns.insert(column.clone());
                }
            } else if upper.contains(" DROP COLUMN ") {
                if let (Some(columns), Some(column)) = (schema.tables.get_mut(table), rest.first()) {
                    columns.remove(column);
                }
            } else if upper.contains(" RENAME COLUMN ") {
                if let (Some(columns), [from, to, ..]) = (schema.tables.get_mut(table), rest) {
                    if columns.remove(from) {
                        columns.insert(to.clone());
                    }
                }
            } else if upper.contains(" RENAME TO ") {
                if let (Some(columns), Some(to)) = (schema.tables.remove(table), rest.first()) {
                    schema.tables.insert(to.clone(), columns);
                    schema.indexes = std::mem::take(&mut schema.indexes)
                        .into_iter()
                        .map(|(t, i)| if &t == table { (to.clone(), i) } else { (t, i) })
                        .collect();
                }
            }
        } else if upper.starts_with("CREATE INDEX") || upper.starts_with("CREATE UNIQUE INDEX") {
            if let [index, table, ..] = idents.as_slice() {
                schema.indexes.insert((table.clone(), index.clone()));
            }
        } else if upper.starts_with("DROP INDEX") {
            if let Some(index) = idents.first() {
                schema.indexes.retain(|(_, i)| i != index);
            }
        }
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn lock_acquisitions(&self) -> usize {
        self.lock_acquisitions
    }
}

impl SchemaInspector for MemoryStore {
    fn table_exists(&mut self, table: &str) -> Result<bool, StoreError> {
        Ok(self.schema.tables.contains_key(table))
    }

    fn column_exists(&mut self, table: &str, column: &str) -> Result<bool, StoreError> {
        Ok(self
            .schema
            .tables
            .get(table)
            .is_some_and(|columns| columns.contains(column)))
    }

    fn index_exists(&mut self, table: &str, index: &str) -> Result<bool, StoreError> {
        Ok(self
            .schema
            .indexes
            .contains(&(table.to_string(), index.to_string())))
    }
}

impl StoreDriver for MemoryStore {
    fn dialect(&self) -> &'static dyn Dialect {
        self.dialect
    }

    fn version_table(&self) -> &str {
        &self.version_table
    }

    fn execute(&mut self, sql: &str) -> Result<(), StoreError> {
        if let Some(ref fragment) = self.fail_on {
            if sql.contains(fragment.as_str()) {
                return Err(StoreError::Other(format!("injected failure on: {}", sql)));
            }
        }
        if !self.apply_marker_dml(sql) {
            self.apply_ddl(sql);
        }
        self.executed.push(sql.to_string());
        Ok(())
    }

    fn begin(&mut self) -> Result<(), StoreError> {
        self.saved = Some(self.schema.clone());
        self.transactions.push(TransactionEvent::Begin);
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        self.saved = None;
        self.transactions.push(TransactionEvent::Commit);
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), StoreError> {
        if let Some(schema) = self.saved.take() {
            self.schema = schema;
        }
        self.transactions.push(TransactionEvent::Rollback);
        Ok(())
    }

    fn read_marker(&mut self) -> Result<Option<String>, StoreError> {
        Ok(self.schema.marker.clone())
    }

    fn write_marker(&mut self, revision: Option<&str>) -> Result<(), StoreError> {
        if self.fail_marker_writes {
            return Err(StoreError::Other("marker write rejected".to_string()));
        }
        if self.marker_statements {
            let table = self.version_table.clone();
            for sql in self.dialect.marker_update_sql(&table, revision) {
                self.execute(&sql)?;
            }
            return Ok(());
        }
        self.schema.marker = revision.map(str::to_string);
        Ok(())
    }

    fn acquire_lock(&mut self) -> Result<(), StoreError> {
        if self.locked {
            return Err(StoreError::LockUnavailable("memory".to_string()));
        }
        self.locked = true;
        self.lock_acquisitions += 1;
        Ok(())
    }

    fn release_lock(&mut self) -> Result<(), StoreError> {
        self.locked = false;
        Ok(())
    }
}

/// Double-quoted identifiers in statement order, with `""` unescaped.
fn quoted_identifiers(sql: &str) -> Vec<String> {
    let mut idents = Vec::new();
    let mut chars = sql.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '"' {
            continue;
        }
        let mut ident = String::new();
        while let Some(c) = chars.next() {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    ident.push('"');
                } else {
                    break;
                }
            } else {
                ident.push(c);
            }
        }
        idents.push(ident);
    }
    idents
}

/// Column names of a `CREATE TABLE` body; table constraints are skipped.
fn table_columns(sql: &str) -> BTreeSet<String> {
    let (Some(open), Some(close)) = (sql.find('('), sql.rfind(')')) else {
        return BTreeSet::new();
    };
    if close <= open {
        return BTreeSet::new();
    }

    let body = &sql[open + 1..close];
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in body.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&body[start..]);

    parts
        .iter()
        .map(|part| part.trim())
        .filter(|part| part.starts_with('"'))
        .filter_map(|part| quoted_identifiers(part).into_iter().next())
        .collect()
}
