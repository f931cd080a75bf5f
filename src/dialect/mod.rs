//! SQL rendering per database.
//!
//! A [`Dialect`] turns schema operations into statements for one database
//! engine. Statement construction goes through `sea-query`; the dialect only
//! names its [`Builder`] and reports the capabilities the engine checks when
//! planning: transactional DDL, column alteration and column removal.

mod mysql;
mod postgres;
mod sqlite;

pub use mysql::MySql;
pub use postgres::Postgres;
pub use sqlite::Sqlite;

use sea_query::{
    Alias, ColumnDef, ForeignKey as SeaForeignKey, ForeignKeyAction, Index as SeaIndex,
    MysqlQueryBuilder, PostgresQueryBuilder, Query, QueryStatementWriter, SchemaStatementBuilder,
    SqliteQueryBuilder, Table,
};

use crate::column::{Column, ColumnChanges, ColumnType, ReferentialAction};
use crate::operation::{Index, IndexOrder};

/// Name of the single column in the version table.
pub const VERSION_COLUMN: &str = "version_num";

/// The `sea-query` backend a dialect renders statements with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builder {
    Sqlite,
    Postgres,
    MySql,
}

impl Builder {
    pub fn schema<S: SchemaStatementBuilder>(self, stmt: &S) -> String {
        match self {
            Builder::Sqlite => stmt.to_string(SqliteQueryBuilder),
            Builder::Postgres => stmt.to_string(PostgresQueryBuilder),
            Builder::MySql => stmt.to_string(MysqlQueryBuilder),
        }
    }

    pub fn query<Q: QueryStatementWriter>(self, stmt: &Q) -> String {
        match self {
            Builder::Sqlite => stmt.to_string(SqliteQueryBuilder),
            Builder::Postgres => stmt.to_string(PostgresQueryBuilder),
            Builder::MySql => stmt.to_string(MysqlQueryBuilder),
        }
    }
}

pub trait Dialect: Send + Sync {
    fn name(&self) -> &'static str;
    fn builder(&self) -> Builder;

    fn supports_alter_column(&self) -> bool;
    fn supports_drop_column(&self) -> bool;
    fn supports_transactional_ddl(&self) -> bool;

    fn quote_identifier(&self, name: &str) -> String;

    fn create_table_sql(&self, name: &str, columns: &[Column]) -> Vec<String> {
        let mut stmt = Table::create();
        stmt.table(Alias::new(name));

        for column in columns {
            stmt.col(column_def(column));
        }

        for column in columns {
            if let Some(ref fk) = column.references {
                stmt.foreign_key(
                    SeaForeignKey::create()
                        .from_col(Alias::new(&column.name))
                        .to_tbl(Alias::new(&fk.table))
                        .to_col(Alias::new(&fk.column))
                        .on_delete(referential_action(&fk.on_delete))
                        .on_update(referential_action(&fk.on_update)),
                );
            }
        }

        vec![self.builder().schema(&stmt)]
    }

    fn drop_table_sql(&self, name: &str) -> String {
        let stmt = Table::drop().table(Alias::new(name)).to_owned();
        self.builder().schema(&stmt)
    }

    fn rename_table_sql(&self, old_name: &str, new_name: &str) -> String {
        let stmt = Table::rename()
            .table(Alias::new(old_name), Alias::new(new_name))
            .to_owned();
        self.builder().schema(&stmt)
    }

    fn add_column_sql(&self, table: &str, column: &Column) -> Vec<String> {
        let stmt = Table::alter()
            .table(Alias::new(table))
            .add_column(column_def(column))
            .to_owned();
        vec![self.builder().schema(&stmt)]
    }

    fn drop_column_sql(&self, table: &str, column: &str) -> Vec<String> {
        let stmt = Table::alter()
            .table(Alias::new(table))
            .drop_column(Alias::new(column))
            .to_owned();
        vec![self.builder().schema(&stmt)]
    }

    fn rename_column_sql(&self, table: &str, old_name: &str, new_name: &str) -> Vec<String> {
        let stmt = Table::alter()
            .table(Alias::new(table))
            .rename_column(Alias::new(old_name), Alias::new(new_name))
            .to_owned();
        vec![self.builder().schema(&stmt)]
    }

    fn alter_column_sql(&self, table: &str, column: &str, changes: &ColumnChanges) -> Vec<String> {
        let mut col = ColumnDef::new(Alias::new(column));

        if let Some(ref column_type) = changes.column_type {
            apply_column_type(&mut col, column_type);
        }

        if let Some(nullable) = changes.nullable {
            if nullable {
                col.null();
            } else {
                col.not_null();
            }
        }

        if let Some(Some(ref default)) = changes.default {
            col.default(sea_query::Expr::cust(default));
        }

        let stmt = Table::alter()
            .table(Alias::new(table))
            .modify_column(col)
            .to_owned();

        vec![self.builder().schema(&stmt)]
    }

    fn add_index_sql(&self, table: &str, index: &Index) -> String {
        let mut stmt = SeaIndex::create();
        stmt.name(&index.name).table(Alias::new(table));

        if index.unique {
            stmt.unique();
        }

        for (column, order) in &index.columns {
            match order {
                IndexOrder::Asc => stmt.col(Alias::new(column)),
                IndexOrder::Desc => stmt.col((Alias::new(column), sea_query::IndexOrder::Desc)),
            };
        }

        let sql = self.builder().schema(&stmt);
        match index.where_clause {
            Some(ref condition) => format!("{} WHERE {}", sql, condition),
            None => sql,
        }
    }

    fn drop_index_sql(&self, table: &str, index: &str) -> String {
        let stmt = SeaIndex::drop()
            .name(index)
            .table(Alias::new(table))
            .to_owned();
        self.builder().schema(&stmt)
    }

    /// DDL for the single-row version table holding the applied marker.
    fn version_table_sql(&self, table: &str) -> String {
        let mut version = ColumnDef::new(Alias::new(VERSION_COLUMN));
        version.string_len(64).not_null().primary_key();

        let stmt = Table::create()
            .table(Alias::new(table))
            .if_not_exists()
            .col(version)
            .to_owned();
        self.builder().schema(&stmt)
    }

    /// Statements replacing the marker row. `None` clears it (back to base).
    fn marker_update_sql(&self, table: &str, revision: Option<&str>) -> Vec<String> {
        let builder = self.builder();
        let clear = Query::delete().from_table(Alias::new(table)).to_owned();
        let mut sql = vec![builder.query(&clear)];

        if let Some(revision) = revision {
            let insert = Query::insert()
                .into_table(Alias::new(table))
                .columns([Alias::new(VERSION_COLUMN)])
                .values_panic([revision.into()])
                .to_owned();
            sql.push(builder.query(&insert));
        }

        sql
    }
}

fn column_def(column: &Column) -> ColumnDef {
    let mut col = ColumnDef::new(Alias::new(&column.name));

    apply_column_type(&mut col, &column.column_type);

    if column.primary_key {
        col.primary_key();
        if column.column_type.is_serial() {
            col.auto_increment();
        }
    }

    if !column.nullable && !column.primary_key {
        col.not_null();
    }

    if column.unique && !column.primary_key {
        col.unique_key();
    }

    if let Some(ref default) = column.default {
        col.default(sea_query::Expr::cust(default));
    }

    col
}

fn apply_column_type(col: &mut ColumnDef, column_type: &ColumnType) {
    match column_type {
        ColumnType::Serial | ColumnType::Integer => {
            col.integer();
        }
        ColumnType::BigSerial | ColumnType::BigInt => {
            col.big_integer();
        }
        ColumnType::SmallInt => {
            col.small_integer();
        }
        ColumnType::Text => {
            col.text();
        }
        ColumnType::VarChar(len) => {
            col.string_len(*len as u32);
        }
        ColumnType::Boolean => {
            col.boolean();
        }
        ColumnType::Timestamp => {
            col.timestamp();
        }
        ColumnType::TimestampTz => {
            col.timestamp_with_time_zone();
        }
        ColumnType::Date => {
            col.date();
        }
        ColumnType::Time => {
            col.time();
        }
        ColumnType::Uuid => {
            col.uuid();
        }
        ColumnType::Json => {
            col.json();
        }
        ColumnType::JsonB => {
            col.json_binary();
        }
        ColumnType::Real => {
            col.float();
        }
        ColumnType::DoublePrecision => {
            col.double();
        }
        ColumnType::Decimal { precision, scale } => {
            col.decimal_len(*precision as u32, *scale as u32);
        }
    }
}

fn referential_action(action: &ReferentialAction) -> ForeignKeyAction {
    match action {
        ReferentialAction::NoAction => ForeignKeyAction::NoAction,
        ReferentialAction::Restrict => ForeignKeyAction::Restrict,
        ReferentialAction::Cascade => ForeignKeyAction::Cascade,
        ReferentialAction::SetNull => ForeignKeyAction::SetNull,
        ReferentialAction::SetDefault => ForeignKeyAction::SetDefault,
    }
}
