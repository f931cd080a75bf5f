use crate::dialect::Dialect;
use crate::operation::Operation;
use crate::probe::Probe;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum IndexOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone)]
pub struct Index {
    pub name: String,
    pub columns: Vec<(String, IndexOrder)>,
    pub unique: bool,
    pub where_clause: Option<String>,
}

impl Index {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            unique: false,
            where_clause: None,
        }
    }

    pub fn column(mut self, name: impl Into<String>) -> Self {
        self.columns.push((name.into(), IndexOrder::Asc));
        self
    }

    pub fn column_desc(mut self, name: impl Into<String>) -> Self {
        self.columns.push((name.into(), IndexOrder::Desc));
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Partial index condition, e.g. `.filter("status = 'active'")`.
    pub fn filter(mut self, condition: impl Into<String>) -> Self {
        self.where_clause = Some(condition.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct AddIndex {
    pub table: String,
    pub index: Index,
}

impl AddIndex {
    pub fn new(table: impl Into<String>, index: Index) -> Self {
        Self {
            table: table.into(),
            index,
        }
    }
}

impl Operation for AddIndex {
    fn forward(&self, dialect: &dyn Dialect) -> Vec<String> {
        vec![dialect.add_index_sql(&self.table, &self.index)]
    }

    fn backward(&self, dialect: &dyn Dialect) -> Option<Vec<String>> {
        Some(vec![dialect.drop_index_sql(&self.table, &self.index.name)])
    }

    fn describe(&self) -> String {
        format!("Add index {} on {}", self.index.name, self.table)
    }

    fn forward_probe(&self) -> Option<Probe> {
        Some(Probe::index_exists(&self.table, &self.index.name))
    }

    fn backward_probe(&self) -> Option<Probe> {
        Some(Probe::index_absent(&self.table, &self.index.name))
    }
}

#[derive(Debug, Clone)]
pub struct DropIndex {
    pub table: String,
    pub name: String,
    pub index: Option<Index>,
}

impl DropIndex {
    pub fn new(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            name: name.into(),
            index: None,
        }
    }

    pub fn with_definition(mut self, index: Index) -> Self {
        self.index = Some(index);
        self
    }
}

impl Operation for DropIndex {
    fn forward(&self, dialect: &dyn Dialect) -> Vec<String> {
        vec![dialect.drop_index_sql(&self.table, &self.name)]
    }

    fn backward(&self, dialect: &dyn Dialect) -> Option<Vec<String>> {
        self.index
            .as_ref()
            .map(|index| vec![dialect.add_index_sql(&self.table, index)])
    }

    fn describe(&self) -> String {
        format!("Drop index {} from {}", self.name, self.table)
    }

    fn is_reversible(&self) -> bool {
        self.index.is_some()
    }

    fn forward_probe(&self) -> Option<Probe> {
        Some(Probe::index_absent(&self.table, &self.name))
    }

    fn backward_probe(&self) -> Option<Probe> {
        Some(Probe::index_exists(&self.table, &self.name))
    }
}
