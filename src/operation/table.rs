use crate::column::{Column, ColumnType};
use crate::dialect::Dialect;
use crate::operation::Operation;
use crate::probe::Probe;

#[derive(Debug, Clone)]
pub struct CreateTable {
    pub name: String,
    pub columns: Vec<Column>,
}

impl CreateTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    pub fn column(mut self, name: impl Into<String>, column_type: ColumnType) -> Self {
        self.columns.push(Column::new(name, column_type));
        self
    }

    pub fn add_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }
}

impl Operation for CreateTable {
    fn forward(&self, dialect: &dyn Dialect) -> Vec<String> {
        dialect.create_table_sql(&self.name, &self.columns)
    }

    fn backward(&self, dialect: &dyn Dialect) -> Option<Vec<String>> {
        Some(vec![dialect.drop_table_sql(&self.name)])
    }

    fn describe(&self) -> String {
        format!("Create table {}", self.name)
    }

    fn forward_probe(&self) -> Option<Probe> {
        Some(Probe::table_exists(&self.name))
    }

    fn backward_probe(&self) -> Option<Probe> {
        Some(Probe::table_absent(&self.name))
    }
}

#[derive(Debug, Clone)]
pub struct DropTable {
    pub name: String,
    pub columns: Option<Vec<Column>>,
}

impl DropTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: None,
        }
    }

    /// Records the dropped definition so the drop can be reversed.
    pub fn with_columns(mut self, columns: Vec<Column>) -> Self {
        self.columns = Some(columns);
        self
    }
}

impl Operation for DropTable {
    fn forward(&self, dialect: &dyn Dialect) -> Vec<String> {
        vec![dialect.drop_table_sql(&self.name)]
    }

    fn backward(&self, dialect: &dyn Dialect) -> Option<Vec<String>> {
        self.columns
            .as_ref()
            .map(|columns| dialect.create_table_sql(&self.name, columns))
    }

    fn describe(&self) -> String {
        format!("Drop table {}", self.name)
    }

    fn is_reversible(&self) -> bool {
        self.columns.is_some()
    }

    fn forward_probe(&self) -> Option<Probe> {
        Some(Probe::table_absent(&self.name))
    }

    fn backward_probe(&self) -> Option<Probe> {
        Some(Probe::table_exists(&self.name))
    }
}

#[derive(Debug, Clone)]
pub struct RenameTable {
    pub old_name: String,
    pub new_name: String,
}

impl RenameTable {
    pub fn new(old_name: impl Into<String>, new_name: impl Into<String>) -> Self {
        Self {
            old_name: old_name.into(),
            new_name: new_name.into(),
        }
    }
}

impl Operation for RenameTable {
    fn forward(&self, dialect: &dyn Dialect) -> Vec<String> {
        vec![dialect.rename_table_sql(&self.old_name, &self.new_name)]
    }

    fn backward(&self, dialect: &dyn Dialect) -> Option<Vec<String>> {
        Some(vec![dialect.rename_table_sql(&self.new_name, &self.old_name)])
    }

    fn describe(&self) -> String {
        format!("Rename table {} to {}", self.old_name, self.new_name)
    }

    fn forward_probe(&self) -> Option<Probe> {
        Some(Probe::table_absent(&self.old_name).and(Probe::table_exists(&self.new_name)))
    }

    fn backward_probe(&self) -> Option<Probe> {
        Some(Probe::table_absent(&self.new_name).and(Probe::table_exists(&self.old_name)))
    }
}
