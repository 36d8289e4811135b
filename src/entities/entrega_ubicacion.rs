use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// GPS ping recorded while a delivery is under way.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "entrega_ubicaciones")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub entrega_id: Uuid,
    #[sea_orm(column_type = "Double")]
    pub latitud: f64,
    #[sea_orm(column_type = "Double")]
    pub longitud: f64,
    pub registrada_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::entrega::Entity",
        from = "Column::EntregaId",
        to = "super::entrega::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Entrega,
}

impl Related<super::entrega::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Entrega.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
