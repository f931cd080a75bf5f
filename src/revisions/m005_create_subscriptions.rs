use crate::column::{Column, ColumnType, ReferentialAction};
use crate::operation::{AddIndex, CreateTable, Index};
use crate::revision::Revision;

pub fn revision() -> Revision {
    Revision::new("005")
        .down_revision("004")
        .message("create subscriptions")
        .operation(
            CreateTable::new("subscriptions")
                .add_column(Column::id())
                .add_column(
                    Column::new("user_id", ColumnType::Integer)
                        .not_null()
                        .references("users", "id")
                        .on_delete(ReferentialAction::Cascade),
                )
                .add_column(
                    Column::new("plan", ColumnType::VarChar(32))
                        .not_null()
                        .default("'free'"),
                )
                .add_column(
                    Column::new("status", ColumnType::VarChar(32))
                        .not_null()
                        .default("'active'"),
                )
                .add_column(Column::new("current_period_end", ColumnType::Timestamp))
                .add_column(
                    Column::new("created_at", ColumnType::Timestamp)
                        .not_null()
                        .default("CURRENT_TIMESTAMP"),
                ),
        )
        // One subscription row per user.
        .operation(AddIndex::new(
            "subscriptions",
            Index::new("idx_subscriptions_user_id")
                .column("user_id")
                .unique(),
        ))
}
