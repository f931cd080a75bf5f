use crate::column::{Column, ColumnType, ReferentialAction};
use crate::operation::{AddIndex, CreateTable, Index};
use crate::revision::Revision;

pub fn revision() -> Revision {
    Revision::new("002")
        .down_revision("001")
        .message("create meals")
        .operation(
            CreateTable::new("meals")
                .add_column(Column::id())
                .add_column(
                    Column::new("user_id", ColumnType::Integer)
                        .not_null()
                        .references("users", "id")
                        .on_delete(ReferentialAction::Cascade),
                )
                .add_column(Column::new("name", ColumnType::VarChar(255)).not_null())
                .add_column(Column::new("meal_type", ColumnType::VarChar(32)))
                .add_column(Column::new("calories", ColumnType::Integer))
                .add_column(Column::new("notes", ColumnType::Text))
                .add_column(
                    Column::new("logged_at", ColumnType::Timestamp)
                        .not_null()
                        .default("CURRENT_TIMESTAMP"),
                )
                .add_column(
                    Column::new("created_at", ColumnType::Timestamp)
                        .not_null()
                        .default("CURRENT_TIMESTAMP"),
                ),
        )
        .operation(AddIndex::new(
            "meals",
            Index::new("idx_meals_user_id").column("user_id"),
        ))
}
