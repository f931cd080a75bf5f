use crate::column::{Column, ColumnType};
use crate::operation::{AddColumn, AddIndex, Index};
use crate::revision::Revision;

pub fn revision() -> Revision {
    Revision::new("008")
        .down_revision("007")
        .message("add meals.image_url and logged_at index")
        .operation(AddColumn::new(
            "meals",
            Column::new("image_url", ColumnType::VarChar(512)),
        ))
        .operation(AddIndex::new(
            "meals",
            Index::new("idx_meals_logged_at")
                .column("user_id")
                .column_desc("logged_at"),
        ))
}
