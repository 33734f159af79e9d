use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Sea-ORM entity for the inventory_logs table.
///
/// Rows are append-only: they are inserted by the stock-mutation scripts and
/// deleted only when their product is deleted.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_logs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub product_id: i32,
    pub previous_stock: i32,
    pub new_stock: i32,
    pub change_amount: i32,
    pub user_source: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id",
        on_delete = "Cascade"
    )]
    Product,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

// Conversion from Sea-ORM Model to domain InventoryLog
impl From<Model> for crate::models::InventoryLog {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            product_id: model.product_id,
            previous_stock: model.previous_stock,
            new_stock: model.new_stock,
            change_amount: model.change_amount,
            user_source: model.user_source,
            created_at: model.created_at.into(),
        }
    }
}
