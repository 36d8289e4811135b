//! Proforma lifecycle: creation with stock holds, lookup, and the guarded
//! conversion into a confirmed sale.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::entities::proforma::{self, Entity as ProformaEntity, EstadoProforma};
use crate::entities::proforma_linea::{self, Entity as ProformaLineaEntity};
use crate::entities::reserva::{self, Entity as ReservaEntity, EstadoReserva};
use crate::entities::venta;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::reservas::{ReservaSummary, ReservationService};
use crate::services::stock;
use crate::services::ventas::VentaResponse;

/// Bounded retries when an optimistic stock check loses the race.
const MAX_CONFLICT_RETRIES: usize = 3;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LineaProformaRequest {
    pub producto_id: Uuid,
    pub cantidad: i32,
    pub precio_unitario: Decimal,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateProformaRequest {
    #[validate(length(min = 1, max = 50, message = "Numero is required"))]
    pub numero: String,
    pub cliente_id: Uuid,
    #[validate(
        length(min = 1, message = "At least one linea is required"),
        custom = "validate_lineas"
    )]
    pub lineas: Vec<LineaProformaRequest>,
}

fn validate_lineas(lineas: &[LineaProformaRequest]) -> Result<(), validator::ValidationError> {
    if lineas.iter().any(|l| l.cantidad < 1) {
        return Err(validator::ValidationError::new("cantidad_invalida"));
    }
    Ok(())
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProformaResponse {
    pub id: Uuid,
    pub numero: String,
    pub cliente_id: Uuid,
    pub total: Decimal,
    pub estado: String,
    pub created_at: chrono::DateTime<Utc>,
}

impl From<proforma::Model> for ProformaResponse {
    fn from(model: proforma::Model) -> Self {
        Self {
            id: model.id,
            numero: model.numero,
            cliente_id: model.cliente_id,
            total: model.total,
            estado: model.estado,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LineaResponse {
    pub id: Uuid,
    pub producto_id: Uuid,
    pub cantidad: i32,
    pub precio_unitario: Decimal,
}

impl From<proforma_linea::Model> for LineaResponse {
    fn from(model: proforma_linea::Model) -> Self {
        Self {
            id: model.id,
            producto_id: model.producto_id,
            cantidad: model.cantidad,
            precio_unitario: model.precio_unitario,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProformaDetail {
    pub proforma: ProformaResponse,
    pub lineas: Vec<LineaResponse>,
    pub reservas: Vec<ReservaSummary>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProformaListResponse {
    pub proformas: Vec<ProformaResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Total of a quote: sum of quantity times unit price per line.
fn calcular_total(lineas: &[LineaProformaRequest]) -> Decimal {
    lineas
        .iter()
        .map(|l| Decimal::from(l.cantidad) * l.precio_unitario)
        .sum()
}

/// Service for managing proformas and their conversion into sales.
#[derive(Clone)]
pub struct ProformaService {
    db_pool: Arc<DatabaseConnection>,
    event_sender: Option<Arc<EventSender>>,
    reservations: ReservationService,
}

impl ProformaService {
    pub fn new(
        db_pool: Arc<DatabaseConnection>,
        event_sender: Option<Arc<EventSender>>,
        reservations: ReservationService,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            reservations,
        }
    }

    /// Creates a proforma with its lines and one stock hold per line, all in
    /// one transaction. Insufficient stock on any line aborts the whole
    /// creation.
    #[instrument(skip(self, request), fields(numero = %request.numero, cliente_id = %request.cliente_id))]
    pub async fn create_proforma(
        &self,
        request: CreateProformaRequest,
    ) -> Result<ProformaDetail, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let mut intento = 0;
        loop {
            match self.try_create_proforma(&request).await {
                Err(ServiceError::ConcurrentModification(id))
                    if intento + 1 < MAX_CONFLICT_RETRIES =>
                {
                    intento += 1;
                    warn!(producto_id = %id, intento = intento, "Stock conflict creating proforma, retrying");
                }
                other => return other,
            }
        }
    }

    async fn try_create_proforma(
        &self,
        request: &CreateProformaRequest,
    ) -> Result<ProformaDetail, ServiceError> {
        let db = &*self.db_pool;
        let now = Utc::now();
        let proforma_id = Uuid::new_v4();

        let txn = db.begin().await?;

        let proforma_model = proforma::ActiveModel {
            id: Set(proforma_id),
            numero: Set(request.numero.clone()),
            cliente_id: Set(request.cliente_id),
            total: Set(calcular_total(&request.lineas)),
            estado: Set(EstadoProforma::Pendiente.as_str().to_string()),
            created_at: Set(now),
            updated_at: Set(None),
        }
        .insert(&txn)
        .await?;

        let mut lineas = Vec::with_capacity(request.lineas.len());
        for linea in &request.lineas {
            let model = proforma_linea::ActiveModel {
                id: Set(Uuid::new_v4()),
                proforma_id: Set(proforma_id),
                producto_id: Set(linea.producto_id),
                cantidad: Set(linea.cantidad),
                precio_unitario: Set(linea.precio_unitario),
            }
            .insert(&txn)
            .await?;
            lineas.push(model);
        }

        let reservas = self
            .reservations
            .create_for_proforma(&txn, proforma_id, &lineas, now)
            .await?;

        txn.commit().await?;

        info!(proforma_id = %proforma_id, lineas = lineas.len(), "Proforma created with stock holds");

        Ok(ProformaDetail {
            proforma: ProformaResponse::from(proforma_model),
            lineas: lineas.into_iter().map(LineaResponse::from).collect(),
            reservas: reservas.into_iter().map(ReservaSummary::from).collect(),
        })
    }

    /// Retrieves a proforma with its lines and holds.
    #[instrument(skip(self), fields(proforma_id = %proforma_id))]
    pub async fn get_proforma(
        &self,
        proforma_id: Uuid,
    ) -> Result<Option<ProformaDetail>, ServiceError> {
        let db = &*self.db_pool;

        let Some(proforma_model) = ProformaEntity::find_by_id(proforma_id).one(db).await? else {
            return Ok(None);
        };

        let lineas = ProformaLineaEntity::find()
            .filter(proforma_linea::Column::ProformaId.eq(proforma_id))
            .all(db)
            .await?;

        let reservas = ReservaEntity::find()
            .filter(reserva::Column::ProformaId.eq(proforma_id))
            .order_by_asc(reserva::Column::CreatedAt)
            .all(db)
            .await?;

        Ok(Some(ProformaDetail {
            proforma: ProformaResponse::from(proforma_model),
            lineas: lineas.into_iter().map(LineaResponse::from).collect(),
            reservas: reservas.into_iter().map(ReservaSummary::from).collect(),
        }))
    }

    /// Lists proformas with pagination and optional estado filter.
    #[instrument(skip(self))]
    pub async fn list_proformas(
        &self,
        page: u64,
        per_page: u64,
        estado_filter: Option<&str>,
    ) -> Result<ProformaListResponse, ServiceError> {
        let db = &*self.db_pool;

        let mut query = ProformaEntity::find();
        if let Some(estado) = estado_filter {
            if EstadoProforma::from_str(estado).is_none() {
                return Err(ServiceError::ValidationError(format!(
                    "Estado de proforma desconocido: {}",
                    estado
                )));
            }
            query = query.filter(proforma::Column::Estado.eq(estado));
        }

        let paginator = query
            .order_by_desc(proforma::Column::CreatedAt)
            .paginate(db, per_page);

        let total = paginator.num_items().await?;
        let proformas = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok(ProformaListResponse {
            proformas: proformas.into_iter().map(ProformaResponse::from).collect(),
            total,
            page,
            per_page,
        })
    }

    /// Converts a proforma into a confirmed sale.
    ///
    /// All of the proforma's holds must still be vigentes at the instant of
    /// conversion; otherwise the operation fails with the renewable
    /// `ReservasExpiradas` signal and neither stock nor holds are touched.
    /// On success the holds transition to `consumida` and stock decrements
    /// exactly once per line, atomically with the sale row.
    #[instrument(skip(self), fields(proforma_id = %proforma_id))]
    pub async fn convertir_a_venta(
        &self,
        proforma_id: Uuid,
    ) -> Result<VentaResponse, ServiceError> {
        let mut intento = 0;
        let venta = loop {
            match self.try_convertir(proforma_id).await {
                Err(ServiceError::ConcurrentModification(id))
                    if intento + 1 < MAX_CONFLICT_RETRIES =>
                {
                    intento += 1;
                    warn!(producto_id = %id, intento = intento, "Stock conflict converting proforma, retrying");
                }
                other => break other?,
            }
        };

        info!(proforma_id = %proforma_id, venta_id = %venta.id, "Proforma converted to venta");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender
                .send(Event::VentaCreada {
                    venta_id: venta.id,
                    numero: venta.numero.clone(),
                    cliente_id: venta.cliente_id,
                    total: venta.total,
                    estado: venta.estado.clone(),
                    timestamp: venta.created_at,
                })
                .await
            {
                warn!(error = %e, venta_id = %venta.id, "Failed to send venta creada event");
            }
        }

        Ok(venta)
    }

    async fn try_convertir(&self, proforma_id: Uuid) -> Result<VentaResponse, ServiceError> {
        let db = &*self.db_pool;
        let now = Utc::now();

        let txn = db.begin().await?;

        let proforma_model = ProformaEntity::find_by_id(proforma_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Proforma {} not found", proforma_id)))?;

        if EstadoProforma::from_str(&proforma_model.estado) != Some(EstadoProforma::Pendiente) {
            return Err(ServiceError::InvalidOperation(format!(
                "La proforma {} no admite conversion en estado {}",
                proforma_id, proforma_model.estado
            )));
        }

        let reservas = ReservaEntity::find()
            .filter(reserva::Column::ProformaId.eq(proforma_id))
            .all(&txn)
            .await?;

        if reservas.is_empty() {
            return Err(ServiceError::InvalidOperation(format!(
                "La proforma {} no tiene reservas",
                proforma_id
            )));
        }

        let policy = self.reservations.policy();
        let expiradas = reservas
            .iter()
            .filter(|r| policy.is_expired(r, now))
            .count() as u32;

        if expiradas > 0 {
            return Err(ServiceError::ReservasExpiradas {
                proforma_id,
                reservas_expiradas: expiradas,
            });
        }

        let venta_model = venta::ActiveModel {
            id: Set(Uuid::new_v4()),
            numero: Set(format!("V-{}", proforma_model.numero)),
            proforma_id: Set(proforma_id),
            cliente_id: Set(proforma_model.cliente_id),
            total: Set(proforma_model.total),
            estado: Set("confirmada".to_string()),
            created_at: Set(now),
        }
        .insert(&txn)
        .await?;

        for r in reservas {
            stock::consumir_stock(&txn, r.producto_id, r.cantidad).await?;

            let mut active: reserva::ActiveModel = r.into();
            active.estado = Set(EstadoReserva::Consumida.as_str().to_string());
            active.updated_at = Set(Some(now));
            active.update(&txn).await?;
        }

        let mut proforma_active: proforma::ActiveModel = proforma_model.into();
        proforma_active.estado = Set(EstadoProforma::Convertida.as_str().to_string());
        proforma_active.updated_at = Set(Some(now));
        proforma_active.update(&txn).await?;

        txn.commit().await?;

        Ok(VentaResponse::from(venta_model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn linea(cantidad: i32, precio: Decimal) -> LineaProformaRequest {
        LineaProformaRequest {
            producto_id: Uuid::new_v4(),
            cantidad,
            precio_unitario: precio,
        }
    }

    #[test]
    fn total_sums_quantity_times_unit_price() {
        let lineas = vec![linea(2, dec!(10.50)), linea(3, dec!(1.10))];
        assert_eq!(calcular_total(&lineas), dec!(24.30));
    }

    #[test]
    fn request_without_lineas_fails_validation() {
        let request = CreateProformaRequest {
            numero: "P-0001".into(),
            cliente_id: Uuid::new_v4(),
            lineas: vec![],
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn request_with_zero_cantidad_fails_validation() {
        let request = CreateProformaRequest {
            numero: "P-0002".into(),
            cliente_id: Uuid::new_v4(),
            lineas: vec![linea(0, dec!(5.00))],
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn valid_request_passes_validation() {
        let request = CreateProformaRequest {
            numero: "P-0003".into(),
            cliente_id: Uuid::new_v4(),
            lineas: vec![linea(1, dec!(5.00))],
        };
        assert!(request.validate().is_ok());
    }
}
