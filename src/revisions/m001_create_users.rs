use crate::column::{Column, ColumnType};
use crate::operation::{AddIndex, CreateTable, Index};
use crate::revision::Revision;

pub fn revision() -> Revision {
    Revision::new("001")
        .message("create users")
        .operation(
            CreateTable::new("users")
                .add_column(Column::id())
                .add_column(Column::new("email", ColumnType::VarChar(255)).not_null())
                .add_column(Column::new("hashed_password", ColumnType::VarChar(255)).not_null())
                .add_column(Column::new("full_name", ColumnType::VarChar(255)))
                .add_column(
                    Column::new("is_active", ColumnType::Boolean)
                        .not_null()
                        .default("TRUE"),
                )
                .add_column(
                    Column::new("created_at", ColumnType::Timestamp)
                        .not_null()
                        .default("CURRENT_TIMESTAMP"),
                )
                .add_column(Column::new("updated_at", ColumnType::Timestamp)),
        )
        .operation(AddIndex::new(
            "users",
            Index::new("idx_users_email").column("email").unique(),
        ))
}
