use crate::column::{Column, ColumnType, ReferentialAction};
use crate::operation::{AddIndex, CreateTable, Index, RunSql};
use crate::probe::Probe;
use crate::revision::Revision;

pub fn revision() -> Revision {
    Revision::new("006")
        .down_revision("005")
        .message("create notification_preferences")
        .operation(
            CreateTable::new("notification_preferences")
                .add_column(Column::id())
                .add_column(
                    Column::new("user_id", ColumnType::Integer)
                        .not_null()
                        .references("users", "id")
                        .on_delete(ReferentialAction::Cascade),
                )
                .add_column(
                    Column::new("push_enabled", ColumnType::Boolean)
                        .not_null()
                        .default("TRUE"),
                )
                .add_column(
                    Column::new("email_enabled", ColumnType::Boolean)
                        .not_null()
                        .default("FALSE"),
                )
                .add_column(
                    Column::new("meal_reminders", ColumnType::Boolean)
                        .not_null()
                        .default("TRUE"),
                )
                .add_column(Column::new("updated_at", ColumnType::Timestamp)),
        )
        .operation(AddIndex::new(
            "notification_preferences",
            Index::new("idx_notification_preferences_user_id")
                .column("user_id")
                .unique(),
        ))
        // Existing users get default preferences; the NOT IN keeps reruns harmless.
        .operation(
            RunSql::reversible(
                "INSERT INTO notification_preferences (user_id) \
                 SELECT id FROM users \
                 WHERE id NOT IN (SELECT user_id FROM notification_preferences)",
                "DELETE FROM notification_preferences",
            )
            .skip_reverse_if(Probe::table_absent("notification_preferences"))
            .with_description("Backfill notification preferences"),
        )
}
