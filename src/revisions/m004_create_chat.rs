use crate::column::{Column, ColumnType, ReferentialAction};
use crate::operation::{AddIndex, CreateTable, Index};
use crate::revision::Revision;

pub fn revision() -> Revision {
    Revision::new("004")
        .down_revision("003")
        .message("create chat_threads and chat_messages")
        .operation(
            CreateTable::new("chat_threads")
                .add_column(Column::id())
                .add_column(
                    Column::new("user_id", ColumnType::Integer)
                        .not_null()
                        .references("users", "id")
                        .on_delete(ReferentialAction::Cascade),
                )
                .add_column(Column::new("title", ColumnType::VarChar(255)))
                .add_column(
                    Column::new("created_at", ColumnType::Timestamp)
                        .not_null()
                        .default("CURRENT_TIMESTAMP"),
                )
                .add_column(Column::new("updated_at", ColumnType::Timestamp)),
        )
        .operation(
            CreateTable::new("chat_messages")
                .add_column(Column::id())
                .add_column(
                    Column::new("thread_id", ColumnType::Integer)
                        .not_null()
                        .references("chat_threads", "id")
                        .on_delete(ReferentialAction::Cascade),
                )
                .add_column(Column::new("role", ColumnType::VarChar(16)).not_null())
                .add_column(Column::new("content", ColumnType::Text).not_null())
                .add_column(
                    Column::new("created_at", ColumnType::Timestamp)
                        .not_null()
                        .default("CURRENT_TIMESTAMP"),
                ),
        )
        .operation(AddIndex::new(
            "chat_threads",
            Index::new("idx_chat_threads_user_id").column("user_id"),
        ))
        .operation(AddIndex::new(
            "chat_messages",
            Index::new("idx_chat_messages_thread_id")
                .column("thread_id")
                .column("created_at"),
        ))
}
