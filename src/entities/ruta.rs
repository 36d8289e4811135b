use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EstadoRuta {
    Planificada,
    EnEjecucion,
    Completada,
    Cancelada,
}

impl EstadoRuta {
    pub fn as_str(&self) -> &'static str {
        match self {
            EstadoRuta::Planificada => "planificada",
            EstadoRuta::EnEjecucion => "en_ejecucion",
            EstadoRuta::Completada => "completada",
            EstadoRuta::Cancelada => "cancelada",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "planificada" => Some(EstadoRuta::Planificada),
            "en_ejecucion" => Some(EstadoRuta::EnEjecucion),
            "completada" => Some(EstadoRuta::Completada),
            "cancelada" => Some(EstadoRuta::Cancelada),
            _ => None,
        }
    }
}

/// Ordered batch of deliveries assigned to one driver/vehicle for a
/// zone and date.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "rutas")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub numero: String,
    pub zona: String,
    pub fecha: NaiveDate,
    pub conductor_id: Option<Uuid>,
    pub vehiculo_id: Option<Uuid>,
    pub estado: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::ruta_parada::Entity")]
    Paradas,
}

impl Related<super::ruta_parada::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Paradas.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
