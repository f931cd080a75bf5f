use std::collections::HashMap;

use crate::dialect::Dialect;
use crate::operation::Operation;
use crate::probe::Probe;

#[derive(Debug, Clone)]
enum SqlSource {
    Static {
        sql: Vec<String>,
        only_dialects: Option<Vec<String>>,
    },
    ByDialect(HashMap<String, Vec<String>>),
}

impl SqlSource {
    fn resolve(&self, dialect: &dyn Dialect) -> Option<Vec<String>> {
        match self {
            SqlSource::Static { sql, only_dialects } => {
                if let Some(ref only) = only_dialects {
                    if !only.iter().any(|d| d == dialect.name()) {
                        return Some(vec![]);
                    }
                }
                Some(sql.clone())
            }
            SqlSource::ByDialect(map) => map.get(dialect.name()).cloned(),
        }
    }
}

/// Raw SQL, typically data backfills. Statements are not probed unless a
/// guard is attached with [`RunSql::skip_if`] / [`RunSql::skip_reverse_if`],
/// so unguarded statements must be idempotent on their own.
#[derive(Debug, Clone)]
pub struct RunSql {
    forward: SqlSource,
    backward: Option<SqlSource>,
    forward_guard: Option<Probe>,
    backward_guard: Option<Probe>,
    description: String,
}

impl RunSql {
    pub fn new(sql: impl Into<String>) -> Self {
        Self::multiple(vec![sql.into()])
    }

    pub fn multiple(sqls: Vec<String>) -> Self {
        Self {
            forward: SqlSource::Static {
                sql: sqls,
                only_dialects: None,
            },
            backward: None,
            forward_guard: None,
            backward_guard: None,
            description: "Run custom SQL".to_string(),
        }
    }

    pub fn reversible(forward: impl Into<String>, backward: impl Into<String>) -> Self {
        Self::new(forward).with_reverse(backward)
    }

    /// SQL that differs per dialect; add each one with [`RunSql::for_dialect`].
    /// Planning rejects the operation on dialects with no SQL configured.
    pub fn portable() -> Self {
        Self {
            forward: SqlSource::ByDialect(HashMap::new()),
            backward: None,
            forward_guard: None,
            backward_guard: None,
            description: "Run portable SQL".to_string(),
        }
    }

    pub fn for_dialect(mut self, dialect: &str, sql: impl Into<String>) -> Self {
        if let SqlSource::ByDialect(ref mut map) = self.forward {
            map.insert(dialect.to_string(), vec![sql.into()]);
        }
        self
    }

    pub fn for_dialect_reversible(
        mut self,
        dialect: &str,
        forward: impl Into<String>,
        backward: impl Into<String>,
    ) -> Self {
        if let SqlSource::ByDialect(ref mut map) = self.forward {
            map.insert(dialect.to_string(), vec![forward.into()]);
        }
        let mut backward_map = match self.backward {
            Some(SqlSource::ByDialect(map)) => map,
            _ => HashMap::new(),
        };
        backward_map.insert(dialect.to_string(), vec![backward.into()]);
        self.backward = Some(SqlSource::ByDialect(backward_map));
        self
    }

    /// Restrict to the named dialects; elsewhere the operation emits nothing.
    pub fn only_for(mut self, dialects: &[&str]) -> Self {
        let names: Vec<String> = dialects.iter().map(|s| s.to_string()).collect();
        if let SqlSource::Static {
            ref mut only_dialects,
            ..
        } = self.forward
        {
            *only_dialects = Some(names.clone());
        }
        if let Some(SqlSource::Static {
            ref mut only_dialects,
            ..
        }) = self.backward
        {
            *only_dialects = Some(names);
        }
        self
    }

    pub fn with_reverse(self, sql: impl Into<String>) -> Self {
        self.with_reverse_multiple(vec![sql.into()])
    }

    pub fn with_reverse_multiple(mut self, sqls: Vec<String>) -> Self {
        let only_dialects = match self.forward {
            SqlSource::Static {
                ref only_dialects, ..
            } => only_dialects.clone(),
            SqlSource::ByDialect(_) => None,
        };
        self.backward = Some(SqlSource::Static {
            sql: sqls,
            only_dialects,
        });
        self
    }

    /// Skip the forward statements when `probe` holds.
    pub fn skip_if(mut self, probe: Probe) -> Self {
        self.forward_guard = Some(probe);
        self
    }

    /// Skip the reverse statements when `probe` holds.
    pub fn skip_reverse_if(mut self, probe: Probe) -> Self {
        self.backward_guard = Some(probe);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

impl Operation for RunSql {
    fn forward(&self, dialect: &dyn Dialect) -> Vec<String> {
        self.forward.resolve(dialect).unwrap_or_default()
    }

    fn backward(&self, dialect: &dyn Dialect) -> Option<Vec<String>> {
        self.backward.as_ref().and_then(|b| b.resolve(dialect))
    }

    fn describe(&self) -> String {
        self.description.clone()
    }

    fn is_reversible(&self) -> bool {
        self.backward.is_some()
    }

    fn forward_probe(&self) -> Option<Probe> {
        self.forward_guard.clone()
    }

    fn backward_probe(&self) -> Option<Probe> {
        self.backward_guard.clone()
    }

    fn supported_by(&self, dialect: &dyn Dialect) -> bool {
        self.forward.resolve(dialect).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{Postgres, Sqlite};

    #[test]
    fn run_sql_forward() {
        let op = RunSql::new("UPDATE meals SET meal_type = 'snack' WHERE meal_type IS NULL");

        let sql = op.forward(&Sqlite);
        assert_eq!(sql.len(), 1);
        assert!(sql[0].starts_with("UPDATE meals"));
        assert!(!op.is_reversible());
        assert!(op.backward(&Sqlite).is_none());
    }

    #[test]
    fn run_sql_reversible() {
        let op = RunSql::reversible(
            "INSERT INTO notification_preferences (user_id) SELECT id FROM users",
            "DELETE FROM notification_preferences",
        );

        assert!(op.is_reversible());
        assert_eq!(
            op.backward(&Sqlite).unwrap(),
            vec!["DELETE FROM notification_preferences".to_string()]
        );
    }

    #[test]
    fn run_sql_multiple() {
        let op = RunSql::multiple(vec![
            "UPDATE users SET timezone = 'UTC' WHERE timezone = ''".to_string(),
            "UPDATE meals SET calories = 0 WHERE calories IS NULL".to_string(),
        ])
        .with_description("Normalize defaults");

        assert_eq!(op.forward(&Sqlite).len(), 2);
        assert_eq!(Operation::describe(&op), "Normalize defaults");
    }

    #[test]
    fn run_sql_only_for() {
        let op = RunSql::new("VACUUM").only_for(&["sqlite"]).with_reverse("SELECT 1");

        assert_eq!(op.forward(&Sqlite), vec!["VACUUM".to_string()]);
        assert!(op.forward(&Postgres).is_empty());
        assert_eq!(op.backward(&Sqlite).unwrap().len(), 1);
        assert!(op.backward(&Postgres).unwrap().is_empty());
    }

    #[test]
    fn run_sql_portable() {
        let op = RunSql::portable()
            .for_dialect("postgres", "ANALYZE meals")
            .for_dialect("sqlite", "ANALYZE");

        assert_eq!(op.forward(&Sqlite), vec!["ANALYZE".to_string()]);
        assert_eq!(op.forward(&Postgres), vec!["ANALYZE meals".to_string()]);
    }

    #[test]
    fn run_sql_portable_missing_dialect_is_unsupported() {
        let op = RunSql::portable().for_dialect("postgres", "CLUSTER meals");

        assert!(op.supported_by(&Postgres));
        assert!(!op.supported_by(&Sqlite));
        assert!(op.forward(&Sqlite).is_empty());
    }

    #[test]
    fn run_sql_portable_reversible() {
        let op = RunSql::portable()
            .for_dialect_reversible("sqlite", "CREATE INDEX i ON meals(name)", "DROP INDEX i")
            .for_dialect_reversible(
                "postgres",
                "CREATE INDEX CONCURRENTLY i ON meals(name)",
                "DROP INDEX CONCURRENTLY i",
            );

        assert!(op.is_reversible());
        assert_eq!(op.backward(&Sqlite).unwrap(), vec!["DROP INDEX i".to_string()]);
    }

    #[test]
    fn run_sql_guards() {
        let op = RunSql::reversible("INSERT INTO t VALUES (1)", "DELETE FROM t")
            .skip_reverse_if(Probe::table_absent("t"));

        assert!(op.forward_probe().is_none());
        assert_eq!(op.backward_probe(), Some(Probe::table_absent("t")));

        let op = RunSql::new("UPDATE t SET x = 1").skip_if(Probe::column_absent("t", "x"));
        assert_eq!(op.forward_probe(), Some(Probe::column_absent("t", "x")));
    }
}
