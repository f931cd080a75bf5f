//! Live-schema predicates used to keep actions idempotent.
//!
//! Every additive or corrective operation names the schema state its
//! statements produce. Before running those statements the engine asks the
//! store's [`SchemaInspector`] whether that state is already present; if it
//! is, the statements are skipped and the skip is logged.

use std::fmt;

use crate::error::StoreError;

/// Typed existence queries against the live schema.
pub trait SchemaInspector {
    fn table_exists(&mut self, table: &str) -> Result<bool, StoreError>;
    fn column_exists(&mut self, table: &str, column: &str) -> Result<bool, StoreError>;
    fn index_exists(&mut self, table: &str, index: &str) -> Result<bool, StoreError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    TableExists(String),
    TableAbsent(String),
    ColumnExists { table: String, column: String },
    ColumnAbsent { table: String, column: String },
    IndexExists { table: String, index: String },
    IndexAbsent { table: String, index: String },
    /// Satisfied only when every member is.
    All(Vec<Probe>),
}

impl Probe {
    pub fn table_exists(table: impl Into<String>) -> Self {
        Probe::TableExists(table.into())
    }

    pub fn table_absent(table: impl Into<String>) -> Self {
        Probe::TableAbsent(table.into())
    }

    pub fn column_exists(table: impl Into<String>, column: impl Into<String>) -> Self {
        Probe::ColumnExists {
            table: table.into(),
            column: column.into(),
        }
    }

    pub fn column_absent(table: impl Into<String>, column: impl Into<String>) -> Self {
        Probe::ColumnAbsent {
            table: table.into(),
            column: column.into(),
        }
    }

    pub fn index_exists(table: impl Into<String>, index: impl Into<String>) -> Self {
        Probe::IndexExists {
            table: table.into(),
            index: index.into(),
        }
    }

    pub fn index_absent(table: impl Into<String>, index: impl Into<String>) -> Self {
        Probe::IndexAbsent {
            table: table.into(),
            index: index.into(),
        }
    }

    pub fn and(self, other: Probe) -> Self {
        match self {
            Probe::All(mut probes) => {
                probes.push(other);
                Probe::All(probes)
            }
            probe => Probe::All(vec![probe, other]),
        }
    }

    pub fn is_satisfied(&self, inspector: &mut dyn SchemaInspector) -> Result<bool, StoreError> {
        match self {
            Probe::TableExists(table) => inspector.table_exists(table),
            Probe::TableAbsent(table) => inspector.table_exists(table).map(|found| !found),
            Probe::ColumnExists { table, column } => inspector.column_exists(table, column),
            Probe::ColumnAbsent { table, column } => {
                inspector.column_exists(table, column).map(|found| !found)
            }
            Probe::IndexExists { table, index } => inspector.index_exists(table, index),
            Probe::IndexAbsent { table, index } => {
                inspector.index_exists(table, index).map(|found| !found)
            }
            Probe::All(probes) => {
                for probe in probes {
                    if !probe.is_satisfied(inspector)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
        }
    }
}

impl fmt::Display for Probe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Probe::TableExists(table) => write!(f, "table {} exists", table),
            Probe::TableAbsent(table) => write!(f, "table {} absent", table),
            Probe::ColumnExists { table, column } => {
                write!(f, "column {}.{} exists", table, column)
            }
            Probe::ColumnAbsent { table, column } => {
                write!(f, "column {}.{} absent", table, column)
            }
            Probe::IndexExists { table, index } => write!(f, "index {} on {} exists", index, table),
            Probe::IndexAbsent { table, index } => write!(f, "index {} on {} absent", index, table),
            Probe::All(probes) => {
                let parts: Vec<String> = probes.iter().map(|p| p.to_string()).collect();
                write!(f, "{}", parts.join(" and "))
            }
        }
    }
}
