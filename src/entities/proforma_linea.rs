use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One product line inside a proforma. Each line owns exactly one stock
/// reservation for its quantity.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "proforma_lineas")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub proforma_id: Uuid,
    pub producto_id: Uuid,
    pub cantidad: i32,
    pub precio_unitario: Decimal,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::proforma::Entity",
        from = "Column::ProformaId",
        to = "super::proforma::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Proforma,
}

impl Related<super::proforma::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Proforma.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
