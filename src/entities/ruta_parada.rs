use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One stop of a route. `posicion_orden` is unique within the route and
/// defines the traversal sequence; `estado_entrega` mirrors the delivery's
/// status so route listings never fan out into per-stop lookups.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ruta_paradas")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub ruta_id: Uuid,
    #[sea_orm(unique)]
    pub entrega_id: Uuid,
    pub posicion_orden: i32,
    pub estado_entrega: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::ruta::Entity",
        from = "Column::RutaId",
        to = "super::ruta::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Ruta,
    #[sea_orm(
        belongs_to = "super::entrega::Entity",
        from = "Column::EntregaId",
        to = "super::entrega::Column::Id"
    )]
    Entrega,
}

impl Related<super::ruta::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ruta.def()
    }
}

impl Related<super::entrega::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Entrega.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
