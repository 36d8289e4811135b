use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Delivery status progression.
///
/// Linear happy path `programado -> asignada -> preparacion_carga ->
/// en_carga -> listo_para_entrega -> en_transito -> entregado`, with
/// `rechazado`/`cancelada` branches from `asignada` onward and a
/// non-terminal `novedad` detour from `en_transito`. Terminal states
/// (`entregado`, `rechazado`, `cancelada`) accept no further transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EstadoEntrega {
    Programado,
    Asignada,
    PreparacionCarga,
    EnCarga,
    ListoParaEntrega,
    EnTransito,
    Entregado,
    Rechazado,
    Novedad,
    Cancelada,
}

impl EstadoEntrega {
    pub fn as_str(&self) -> &'static str {
        match self {
            EstadoEntrega::Programado => "programado",
            EstadoEntrega::Asignada => "asignada",
            EstadoEntrega::PreparacionCarga => "preparacion_carga",
            EstadoEntrega::EnCarga => "en_carga",
            EstadoEntrega::ListoParaEntrega => "listo_para_entrega",
            EstadoEntrega::EnTransito => "en_transito",
            EstadoEntrega::Entregado => "entregado",
            EstadoEntrega::Rechazado => "rechazado",
            EstadoEntrega::Novedad => "novedad",
            EstadoEntrega::Cancelada => "cancelada",
        }
    }

    /// Parses a stored or client-supplied status value.
    ///
    /// Accepts the legacy synonyms `en_camino` and `llego` kept for
    /// backward compatibility on read paths; both normalize to their
    /// canonical states.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "programado" => Some(EstadoEntrega::Programado),
            "asignada" => Some(EstadoEntrega::Asignada),
            "preparacion_carga" => Some(EstadoEntrega::PreparacionCarga),
            "en_carga" => Some(EstadoEntrega::EnCarga),
            "listo_para_entrega" => Some(EstadoEntrega::ListoParaEntrega),
            "en_transito" | "en_camino" => Some(EstadoEntrega::EnTransito),
            "entregado" | "llego" => Some(EstadoEntrega::Entregado),
            "rechazado" => Some(EstadoEntrega::Rechazado),
            "novedad" => Some(EstadoEntrega::Novedad),
            "cancelada" => Some(EstadoEntrega::Cancelada),
            _ => None,
        }
    }

    /// Terminal states are final: no further transition is permitted.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EstadoEntrega::Entregado | EstadoEntrega::Rechazado | EstadoEntrega::Cancelada
        )
    }
}

impl fmt::Display for EstadoEntrega {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delivery task for one sale. Referenced by at most one route stop.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "entregas")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub numero: String,
    pub venta_id: Uuid,
    pub conductor_id: Option<Uuid>,
    pub vehiculo_id: Option<Uuid>,
    pub estado: String,
    pub fecha_programada: DateTime<Utc>,
    pub iniciada_at: Option<DateTime<Utc>>,
    pub completada_at: Option<DateTime<Utc>>,
    pub motivo_rechazo: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::venta::Entity",
        from = "Column::VentaId",
        to = "super::venta::Column::Id"
    )]
    Venta,
    #[sea_orm(has_many = "super::entrega_ubicacion::Entity")]
    Ubicaciones,
    #[sea_orm(has_many = "super::novedad::Entity")]
    Novedades,
}

impl Related<super::venta::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Venta.def()
    }
}

impl Related<super::entrega_ubicacion::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ubicaciones.def()
    }
}

impl Related<super::novedad::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Novedades.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn estado_actual(&self) -> Option<EstadoEntrega> {
        EstadoEntrega::from_str(&self.estado)
    }
}
