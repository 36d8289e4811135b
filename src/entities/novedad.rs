use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Incident category reported against an in-progress delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TipoNovedad {
    Falta,
    Danio,
    DireccionIncorrecta,
    ClienteRechaza,
    Otra,
}

impl TipoNovedad {
    pub fn as_str(&self) -> &'static str {
        match self {
            TipoNovedad::Falta => "falta",
            TipoNovedad::Danio => "danio",
            TipoNovedad::DireccionIncorrecta => "direccion_incorrecta",
            TipoNovedad::ClienteRechaza => "cliente_rechaza",
            TipoNovedad::Otra => "otra",
        }
    }

    /// Accepts the accented legacy spelling for damage reports.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "falta" => Some(TipoNovedad::Falta),
            "danio" | "daño" => Some(TipoNovedad::Danio),
            "direccion_incorrecta" => Some(TipoNovedad::DireccionIncorrecta),
            "cliente_rechaza" => Some(TipoNovedad::ClienteRechaza),
            "otra" => Some(TipoNovedad::Otra),
            _ => None,
        }
    }
}

impl fmt::Display for TipoNovedad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolution workflow for an incident, forward-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EstadoNovedad {
    Abierta,
    EnProceso,
    Resuelta,
}

impl EstadoNovedad {
    pub fn as_str(&self) -> &'static str {
        match self {
            EstadoNovedad::Abierta => "abierta",
            EstadoNovedad::EnProceso => "en_proceso",
            EstadoNovedad::Resuelta => "resuelta",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "abierta" => Some(EstadoNovedad::Abierta),
            "en_proceso" => Some(EstadoNovedad::EnProceso),
            "resuelta" => Some(EstadoNovedad::Resuelta),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "novedades")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub entrega_id: Uuid,
    pub tipo: String,
    pub descripcion: String,
    pub reportado_por: String,
    pub estado: String,
    pub foto_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
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
