use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Lifecycle state of a stock hold.
///
/// `activa` holds allocatable stock; `consumida` means the proforma converted
/// to a sale before the hold lapsed; `liberada` means the hold lapsed (or was
/// released) and the stock went back to the allocatable pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EstadoReserva {
    Activa,
    Liberada,
    Consumida,
}

impl EstadoReserva {
    pub fn as_str(&self) -> &'static str {
        match self {
            EstadoReserva::Activa => "activa",
            EstadoReserva::Liberada => "liberada",
            EstadoReserva::Consumida => "consumida",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "activa" => Some(EstadoReserva::Activa),
            "liberada" => Some(EstadoReserva::Liberada),
            "consumida" => Some(EstadoReserva::Consumida),
            _ => None,
        }
    }
}

impl fmt::Display for EstadoReserva {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reservas")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub proforma_id: Uuid,
    pub proforma_linea_id: Uuid,
    pub producto_id: Uuid,
    pub cantidad: i32,
    pub estado: String,
    pub renovaciones: i32,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
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
    #[sea_orm(
        belongs_to = "super::producto::Entity",
        from = "Column::ProductoId",
        to = "super::producto::Column::Id"
    )]
    Producto,
}

impl Related<super::proforma::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Proforma.def()
    }
}

impl Related<super::producto::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Producto.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Whether the hold still counts toward allocatable stock at `now`.
    ///
    /// An `activa` hold past its expiry that the background sweep has not
    /// reached yet is already treated as lapsed by every read path.
    pub fn esta_vigente(&self, now: DateTime<Utc>) -> bool {
        EstadoReserva::from_str(&self.estado) == Some(EstadoReserva::Activa) && self.expires_at > now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn reserva(estado: EstadoReserva, expires_at: DateTime<Utc>) -> Model {
        let now = Utc::now();
        Model {
            id: Uuid::new_v4(),
            proforma_id: Uuid::new_v4(),
            proforma_linea_id: Uuid::new_v4(),
            producto_id: Uuid::new_v4(),
            cantidad: 5,
            estado: estado.as_str().to_string(),
            renovaciones: 0,
            expires_at,
            created_at: now,
            updated_at: None,
        }
    }

    #[test]
    fn vigente_requires_activa_and_future_expiry() {
        let now = Utc::now();
        assert!(reserva(EstadoReserva::Activa, now + Duration::days(1)).esta_vigente(now));
        assert!(!reserva(EstadoReserva::Activa, now - Duration::hours(1)).esta_vigente(now));
        assert!(!reserva(EstadoReserva::Liberada, now + Duration::days(1)).esta_vigente(now));
        assert!(!reserva(EstadoReserva::Consumida, now + Duration::days(1)).esta_vigente(now));
    }

    #[test]
    fn estado_round_trips_through_strings() {
        for estado in [
            EstadoReserva::Activa,
            EstadoReserva::Liberada,
            EstadoReserva::Consumida,
        ] {
            assert_eq!(EstadoReserva::from_str(estado.as_str()), Some(estado));
        }
        assert_eq!(EstadoReserva::from_str("pendiente"), None);
    }
}
