use crate::column::{Column, ColumnType};
use crate::operation::AddColumn;
use crate::revision::Revision;

pub fn revision() -> Revision {
    Revision::new("007")
        .down_revision("006")
        .message("add users.timezone")
        .operation(AddColumn::new(
            "users",
            Column::new("timezone", ColumnType::VarChar(64))
                .not_null()
                .default("'UTC'"),
        ))
}
