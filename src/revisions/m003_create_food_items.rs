use crate::column::{Column, ColumnType, ReferentialAction};
use crate::operation::{AddIndex, CreateTable, Index};
use crate::revision::Revision;

pub fn revision() -> Revision {
    Revision::new("003")
        .down_revision("002")
        .message("create food_items")
        .operation(
            CreateTable::new("food_items")
                .add_column(Column::id())
                .add_column(
                    Column::new("meal_id", ColumnType::Integer)
                        .not_null()
                        .references("meals", "id")
                        .on_delete(ReferentialAction::Cascade),
                )
                .add_column(Column::new("name", ColumnType::VarChar(255)).not_null())
                .add_column(Column::new("quantity", ColumnType::Real))
                .add_column(Column::new("unit", ColumnType::VarChar(32)))
                .add_column(Column::new("calories", ColumnType::Integer))
                .add_column(Column::new("protein_g", ColumnType::Real))
                .add_column(Column::new("carbs_g", ColumnType::Real))
                .add_column(Column::new("fat_g", ColumnType::Real)),
        )
        .operation(AddIndex::new(
            "food_items",
            Index::new("idx_food_items_meal_id").column("meal_id"),
        ))
}
