use crate::column::{Column, ColumnChanges, ColumnType};
use crate::dialect::Dialect;
use crate::operation::Operation;
use crate::probe::Probe;

#[derive(Debug, Clone)]
pub struct AddColumn {
    pub table: String,
    pub column: Column,
}

impl AddColumn {
    pub fn new(table: impl Into<String>, column: Column) -> Self {
        Self {
            table: table.into(),
            column,
        }
    }
}

impl Operation for AddColumn {
    fn forward(&self, dialect: &dyn Dialect) -> Vec<String> {
        dialect.add_column_sql(&self.table, &self.column)
    }

    fn backward(&self, dialect: &dyn Dialect) -> Option<Vec<String>> {
        if dialect.supports_drop_column() {
            Some(dialect.drop_column_sql(&self.table, &self.column.name))
        } else {
            None
        }
    }

    fn describe(&self) -> String {
        format!("Add column {} to {}", self.column.name, self.table)
    }

    fn forward_probe(&self) -> Option<Probe> {
        Some(Probe::column_exists(&self.table, &self.column.name))
    }

    fn backward_probe(&self) -> Option<Probe> {
        Some(Probe::column_absent(&self.table, &self.column.name))
    }
}

#[derive(Debug, Clone)]
pub struct DropColumn {
    pub table: String,
    pub name: String,
    pub column: Option<Column>,
}

impl DropColumn {
    pub fn new(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            name: name.into(),
            column: None,
        }
    }

    pub fn with_definition(mut self, column: Column) -> Self {
        self.column = Some(column);
        self
    }
}

impl Operation for DropColumn {
    fn forward(&self, dialect: &dyn Dialect) -> Vec<String> {
        dialect.drop_column_sql(&self.table, &self.name)
    }

    fn backward(&self, dialect: &dyn Dialect) -> Option<Vec<String>> {
        self.column
            .as_ref()
            .map(|column| dialect.add_column_sql(&self.table, column))
    }

    fn describe(&self) -> String {
        format!("Drop column {} from {}", self.name, self.table)
    }

    fn is_reversible(&self) -> bool {
        self.column.is_some()
    }

    fn forward_probe(&self) -> Option<Probe> {
        Some(Probe::column_absent(&self.table, &self.name))
    }

    fn backward_probe(&self) -> Option<Probe> {
        Some(Probe::column_exists(&self.table, &self.name))
    }

    fn supported_by(&self, dialect: &dyn Dialect) -> bool {
        dialect.supports_drop_column()
    }
}

#[derive(Debug, Clone)]
pub struct RenameColumn {
    pub table: String,
    pub old_name: String,
    pub new_name: String,
}

impl RenameColumn {
    pub fn new(
        table: impl Into<String>,
        old_name: impl Into<String>,
        new_name: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            old_name: old_name.into(),
            new_name: new_name.into(),
        }
    }
}

impl Operation for RenameColumn {
    fn forward(&self, dialect: &dyn Dialect) -> Vec<String> {
        dialect.rename_column_sql(&self.table, &self.old_name, &self.new_name)
    }

    fn backward(&self, dialect: &dyn Dialect) -> Option<Vec<String>> {
        Some(dialect.rename_column_sql(&self.table, &self.new_name, &self.old_name))
    }

    fn describe(&self) -> String {
        format!(
            "Rename column {} to {} on {}",
            self.old_name, self.new_name, self.table
        )
    }

    fn forward_probe(&self) -> Option<Probe> {
        Some(
            Probe::column_absent(&self.table, &self.old_name)
                .and(Probe::column_exists(&self.table, &self.new_name)),
        )
    }

    fn backward_probe(&self) -> Option<Probe> {
        Some(
            Probe::column_absent(&self.table, &self.new_name)
                .and(Probe::column_exists(&self.table, &self.old_name)),
        )
    }
}

/// Changes a column's type, nullability or default. Runs unconditionally:
/// existence probes cannot tell whether the new definition is in place.
#[derive(Debug, Clone)]
pub struct AlterColumn {
    pub table: String,
    pub name: String,
    pub changes: ColumnChanges,
    pub reverse_changes: Option<ColumnChanges>,
}

impl AlterColumn {
    pub fn new(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            name: name.into(),
            changes: ColumnChanges::new(),
            reverse_changes: None,
        }
    }

    pub fn set_type(mut self, column_type: ColumnType) -> Self {
        self.changes.column_type = Some(column_type);
        self
    }

    pub fn set_nullable(mut self, nullable: bool) -> Self {
        self.changes.nullable = Some(nullable);
        self
    }

    pub fn set_default(mut self, default: Option<String>) -> Self {
        self.changes.default = Some(default);
        self
    }

    pub fn with_reverse(mut self, reverse_changes: ColumnChanges) -> Self {
        self.reverse_changes = Some(reverse_changes);
        self
    }
}

impl Operation for AlterColumn {
    fn forward(&self, dialect: &dyn Dialect) -> Vec<String> {
        dialect.alter_column_sql(&self.table, &self.name, &self.changes)
    }

    fn backward(&self, dialect: &dyn Dialect) -> Option<Vec<String>> {
        self.reverse_changes
            .as_ref()
            .map(|changes| dialect.alter_column_sql(&self.table, &self.name, changes))
    }

    fn describe(&self) -> String {
        format!("Alter column {} on {}", self.name, self.table)
    }

    fn is_reversible(&self) -> bool {
        self.reverse_changes.is_some()
    }

    fn supported_by(&self, dialect: &dyn Dialect) -> bool {
        dialect.supports_alter_column()
    }
}
