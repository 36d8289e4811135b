use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status for a proforma (sales quote holding stock).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EstadoProforma {
    Pendiente,
    Convertida,
    Anulada,
}

impl EstadoProforma {
    pub fn as_str(&self) -> &'static str {
        match self {
            EstadoProforma::Pendiente => "pendiente",
            EstadoProforma::Convertida => "convertida",
            EstadoProforma::Anulada => "anulada",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pendiente" => Some(EstadoProforma::Pendiente),
            "convertida" => Some(EstadoProforma::Convertida),
            "anulada" => Some(EstadoProforma::Anulada),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "proformas")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub numero: String,
    pub cliente_id: Uuid,
    pub total: Decimal,
    pub estado: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::proforma_linea::Entity")]
    Lineas,
    #[sea_orm(has_many = "super::reserva::Entity")]
    Reservas,
}

impl Related<super::proforma_linea::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lineas.def()
    }
}

impl Related<super::reserva::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reservas.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
