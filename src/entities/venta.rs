use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Confirmed sale, produced only by converting a proforma whose stock holds
/// were all still vigentes.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ventas")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub numero: String,
    pub proforma_id: Uuid,
    pub cliente_id: Uuid,
    pub total: Decimal,
    pub estado: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::proforma::Entity",
        from = "Column::ProformaId",
        to = "super::proforma::Column::Id"
    )]
    Proforma,
    #[sea_orm(has_many = "super::entrega::Entity")]
    Entregas,
}

impl Related<super::proforma::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Proforma.def()
    }
}

impl Related<super::entrega::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Entregas.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
