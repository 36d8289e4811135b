//! Reservation ledger: one stock hold per proforma line, with time-bounded
//! validity, renewal and a periodic expiry sweep.

use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::proforma::{Entity as ProformaEntity, EstadoProforma};
use crate::entities::proforma_linea;
use crate::entities::reserva::{self, Entity as ReservaEntity, EstadoReserva};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::stock;

/// Validity windows for stock holds.
///
/// A fresh hold lives 3 days; each renewal grants a fresh 7-day window from
/// the moment of renewal (never added to the previous expiry), up to
/// `max_renovaciones` times.
#[derive(Debug, Clone, Copy)]
pub struct ExpiryPolicy {
    pub vigencia_inicial: Duration,
    pub vigencia_renovacion: Duration,
    pub max_renovaciones: i32,
}

impl Default for ExpiryPolicy {
    fn default() -> Self {
        Self {
            vigencia_inicial: Duration::days(3),
            vigencia_renovacion: Duration::days(7),
            max_renovaciones: 3,
        }
    }
}

impl ExpiryPolicy {
    pub fn from_dias(inicial: i64, renovacion: i64, max_renovaciones: i32) -> Self {
        Self {
            vigencia_inicial: Duration::days(inicial),
            vigencia_renovacion: Duration::days(renovacion),
            max_renovaciones,
        }
    }

    pub fn vencimiento_inicial(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + self.vigencia_inicial
    }

    /// A hold counts as expired once it is `liberada`, or once an `activa`
    /// hold passes its expiry even if the sweep has not reached it yet.
    pub fn is_expired(&self, reserva: &reserva::Model, now: DateTime<Utc>) -> bool {
        match EstadoReserva::from_str(&reserva.estado) {
            Some(EstadoReserva::Activa) => reserva.expires_at <= now,
            Some(EstadoReserva::Liberada) => true,
            Some(EstadoReserva::Consumida) | None => false,
        }
    }

    /// New expiry granted by a renewal at `now`.
    pub fn renovar(
        &self,
        reserva: &reserva::Model,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, ServiceError> {
        if reserva.renovaciones >= self.max_renovaciones {
            return Err(ServiceError::RenovacionesAgotadas {
                reserva_id: reserva.id,
                renovaciones: reserva.renovaciones,
            });
        }
        Ok(now + self.vigencia_renovacion)
    }
}

/// Summary of a reservation for API responses.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReservaSummary {
    pub id: Uuid,
    pub proforma_id: Uuid,
    pub producto_id: Uuid,
    pub cantidad: i32,
    pub estado: String,
    pub renovaciones: i32,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub vencida: bool,
}

impl From<reserva::Model> for ReservaSummary {
    fn from(model: reserva::Model) -> Self {
        let vencida = !model.esta_vigente(Utc::now())
            && EstadoReserva::from_str(&model.estado) != Some(EstadoReserva::Consumida);
        Self {
            id: model.id,
            proforma_id: model.proforma_id,
            producto_id: model.producto_id,
            cantidad: model.cantidad,
            estado: model.estado,
            renovaciones: model.renovaciones,
            expires_at: model.expires_at,
            created_at: model.created_at,
            vencida,
        }
    }
}

/// Result of renewing a proforma's reservations.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RenovacionResult {
    pub proforma_id: Uuid,
    pub renovadas: u32,
    pub nuevo_vencimiento: DateTime<Utc>,
}

/// Result of a single expiry sweep pass.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SweepResult {
    pub liberadas: u64,
    pub swept_at: DateTime<Utc>,
}

/// Reservation counters for the operations dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReservaStats {
    pub total: u64,
    pub activas: u64,
    pub vencidas_sin_liberar: u64,
    pub por_vencer_24h: u64,
    pub stats_at: DateTime<Utc>,
}

/// Service owning the reservation ledger.
#[derive(Clone)]
pub struct ReservationService {
    db_pool: Arc<DatabaseConnection>,
    event_sender: Option<Arc<EventSender>>,
    policy: ExpiryPolicy,
}

impl ReservationService {
    pub fn new(
        db_pool: Arc<DatabaseConnection>,
        event_sender: Option<Arc<EventSender>>,
        policy: ExpiryPolicy,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            policy,
        }
    }

    pub fn policy(&self) -> &ExpiryPolicy {
        &self.policy
    }

    /// Creates one `activa` hold per proforma line, reserving stock for
    /// each. Runs on the caller's connection so the proforma, its lines and
    /// its holds commit or roll back together.
    pub(crate) async fn create_for_proforma<C: ConnectionTrait>(
        &self,
        conn: &C,
        proforma_id: Uuid,
        lineas: &[proforma_linea::Model],
        now: DateTime<Utc>,
    ) -> Result<Vec<reserva::Model>, ServiceError> {
        let expires_at = self.policy.vencimiento_inicial(now);
        let mut reservas = Vec::with_capacity(lineas.len());

        for linea in lineas {
            stock::reservar_stock(conn, linea.producto_id, linea.cantidad).await?;

            let active = reserva::ActiveModel {
                id: Set(Uuid::new_v4()),
                proforma_id: Set(proforma_id),
                proforma_linea_id: Set(linea.id),
                producto_id: Set(linea.producto_id),
                cantidad: Set(linea.cantidad),
                estado: Set(EstadoReserva::Activa.as_str().to_string()),
                renovaciones: Set(0),
                expires_at: Set(expires_at),
                created_at: Set(now),
                updated_at: Set(None),
            };
            reservas.push(active.insert(conn).await?);
        }

        Ok(reservas)
    }

    /// Renews every non-consumed hold of the proforma: active holds get a
    /// fresh window, lapsed (`liberada`) holds are revived only if their
    /// stock is still allocatable. All lines renew atomically.
    #[instrument(skip(self), fields(proforma_id = %proforma_id))]
    pub async fn renovar_reservas(
        &self,
        proforma_id: Uuid,
    ) -> Result<RenovacionResult, ServiceError> {
        let db = &*self.db_pool;
        let now = Utc::now();

        let txn = db.begin().await?;

        let proforma = ProformaEntity::find_by_id(proforma_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Proforma {} not found", proforma_id)))?;

        if EstadoProforma::from_str(&proforma.estado) != Some(EstadoProforma::Pendiente) {
            return Err(ServiceError::InvalidOperation(format!(
                "La proforma {} no admite renovacion en estado {}",
                proforma_id, proforma.estado
            )));
        }

        let reservas = ReservaEntity::find()
            .filter(reserva::Column::ProformaId.eq(proforma_id))
            .filter(reserva::Column::Estado.ne(EstadoReserva::Consumida.as_str()))
            .all(&txn)
            .await?;

        if reservas.is_empty() {
            return Err(ServiceError::InvalidOperation(format!(
                "La proforma {} no tiene reservas renovables",
                proforma_id
            )));
        }

        let mut renovadas = 0u32;
        let mut nuevo_vencimiento = now;

        for r in reservas {
            let vencimiento = self.policy.renovar(&r, now)?;
            nuevo_vencimiento = vencimiento;

            // A lapsed hold gave its stock back; reviving it must re-check
            // availability because the stock may be held elsewhere by now.
            if EstadoReserva::from_str(&r.estado) == Some(EstadoReserva::Liberada) {
                stock::reservar_stock(&txn, r.producto_id, r.cantidad).await?;
            }

            let mut active: reserva::ActiveModel = r.into();
            active.estado = Set(EstadoReserva::Activa.as_str().to_string());
            active.expires_at = Set(vencimiento);
            active.renovaciones = Set(active.renovaciones.unwrap() + 1);
            active.updated_at = Set(Some(now));
            active.update(&txn).await?;

            renovadas += 1;
        }

        txn.commit().await?;

        info!(proforma_id = %proforma_id, renovadas = renovadas, "Reservas renovadas");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender
                .send(Event::ReservasRenovadas {
                    proforma_id,
                    renovadas,
                    nuevo_vencimiento,
                })
                .await
            {
                warn!(error = %e, proforma_id = %proforma_id, "Failed to send reservas renovadas event");
            }
        }

        Ok(RenovacionResult {
            proforma_id,
            renovadas,
            nuevo_vencimiento,
        })
    }

    /// Lapses every `activa` hold past its expiry, returning its stock to
    /// the allocatable pool. Called by the background sweep and exposed for
    /// manual triggering. Each hold lapses in its own transaction so one
    /// conflicting row never stalls the rest of the pass.
    #[instrument(skip(self))]
    pub async fn liberar_expiradas(&self) -> Result<SweepResult, ServiceError> {
        let db = &*self.db_pool;
        let now = Utc::now();

        let expiradas = ReservaEntity::find()
            .filter(reserva::Column::Estado.eq(EstadoReserva::Activa.as_str()))
            .filter(reserva::Column::ExpiresAt.lte(now))
            .all(db)
            .await?;

        let mut liberadas = 0u64;

        for r in expiradas {
            let reserva_id = r.id;
            let producto_id = r.producto_id;
            let cantidad = r.cantidad;

            let resultado: Result<(), ServiceError> = async {
                let txn = db.begin().await?;
                stock::liberar_stock(&txn, producto_id, cantidad).await?;

                let mut active: reserva::ActiveModel = r.into();
                active.estado = Set(EstadoReserva::Liberada.as_str().to_string());
                active.updated_at = Set(Some(now));
                active.update(&txn).await?;

                txn.commit().await?;
                Ok(())
            }
            .await;

            match resultado {
                Ok(()) => {
                    liberadas += 1;
                    info!(
                        reserva_id = %reserva_id,
                        producto_id = %producto_id,
                        "Reserva liberada por vencimiento"
                    );

                    if let Some(event_sender) = &self.event_sender {
                        if let Err(e) = event_sender
                            .send(Event::ReservaLiberada {
                                reserva_id,
                                producto_id,
                                cantidad,
                            })
                            .await
                        {
                            warn!(error = %e, reserva_id = %reserva_id, "Failed to send reserva liberada event");
                        }
                    }
                }
                Err(e) => {
                    warn!(reserva_id = %reserva_id, error = %e, "Failed to lapse reservation");
                }
            }
        }

        info!(liberadas = liberadas, "Expiry sweep completed");

        Ok(SweepResult {
            liberadas,
            swept_at: now,
        })
    }

    /// Lists reservations with pagination and optional filters.
    #[instrument(skip(self))]
    pub async fn list_reservas(
        &self,
        page: u64,
        limit: u64,
        estado_filter: Option<&str>,
        producto_filter: Option<Uuid>,
    ) -> Result<(Vec<ReservaSummary>, u64), ServiceError> {
        if limit == 0 || limit > 1000 {
            return Err(ServiceError::ValidationError(
                "Limit must be between 1 and 1000".to_string(),
            ));
        }

        let db = &*self.db_pool;

        let mut query = ReservaEntity::find();

        if let Some(estado) = estado_filter {
            if EstadoReserva::from_str(estado).is_none() {
                return Err(ServiceError::ValidationError(format!(
                    "Estado de reserva desconocido: {}",
                    estado
                )));
            }
            query = query.filter(reserva::Column::Estado.eq(estado));
        }

        if let Some(producto_id) = producto_filter {
            query = query.filter(reserva::Column::ProductoId.eq(producto_id));
        }

        let paginator = query
            .order_by_desc(reserva::Column::CreatedAt)
            .paginate(db, limit);

        let total = paginator.num_items().await?;
        let models = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((models.into_iter().map(ReservaSummary::from).collect(), total))
    }

    /// Lists the reservations backing one proforma.
    #[instrument(skip(self))]
    pub async fn list_por_proforma(
        &self,
        proforma_id: Uuid,
    ) -> Result<Vec<ReservaSummary>, ServiceError> {
        let db = &*self.db_pool;

        let reservas = ReservaEntity::find()
            .filter(reserva::Column::ProformaId.eq(proforma_id))
            .order_by_asc(reserva::Column::CreatedAt)
            .all(db)
            .await?;

        Ok(reservas.into_iter().map(ReservaSummary::from).collect())
    }

    /// Gets counters about the ledger.
    #[instrument(skip(self))]
    pub async fn stats(&self) -> Result<ReservaStats, ServiceError> {
        let db = &*self.db_pool;
        let now = Utc::now();

        let total = ReservaEntity::find().count(db).await?;

        let activas = ReservaEntity::find()
            .filter(reserva::Column::Estado.eq(EstadoReserva::Activa.as_str()))
            .filter(reserva::Column::ExpiresAt.gt(now))
            .count(db)
            .await?;

        let vencidas_sin_liberar = ReservaEntity::find()
            .filter(reserva::Column::Estado.eq(EstadoReserva::Activa.as_str()))
            .filter(reserva::Column::ExpiresAt.lte(now))
            .count(db)
            .await?;

        let por_vencer_24h = ReservaEntity::find()
            .filter(reserva::Column::Estado.eq(EstadoReserva::Activa.as_str()))
            .filter(reserva::Column::ExpiresAt.gt(now))
            .filter(reserva::Column::ExpiresAt.lt(now + Duration::hours(24)))
            .count(db)
            .await?;

        Ok(ReservaStats {
            total,
            activas,
            vencidas_sin_liberar,
            por_vencer_24h,
            stats_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn reserva_con(
        estado: EstadoReserva,
        renovaciones: i32,
        expires_at: DateTime<Utc>,
    ) -> reserva::Model {
        let now = Utc::now();
        reserva::Model {
            id: Uuid::new_v4(),
            proforma_id: Uuid::new_v4(),
            proforma_linea_id: Uuid::new_v4(),
            producto_id: Uuid::new_v4(),
            cantidad: 5,
            estado: estado.as_str().to_string(),
            renovaciones,
            expires_at,
            created_at: now,
            updated_at: None,
        }
    }

    #[test]
    fn initial_expiry_is_three_days_out() {
        let policy = ExpiryPolicy::default();
        let now = Utc::now();
        assert_eq!(policy.vencimiento_inicial(now), now + Duration::days(3));
    }

    #[test]
    fn renewal_window_is_seven_days_from_renewal_time() {
        let policy = ExpiryPolicy::default();
        let now = Utc::now();

        // Renewal happens 4 days after the original 3-day expiry lapsed;
        // the new window counts from now, not from the old expiry.
        let lapsed = reserva_con(EstadoReserva::Activa, 0, now - Duration::days(1));
        let nuevo = policy.renovar(&lapsed, now).unwrap();
        assert_eq!(nuevo, now + Duration::days(7));

        // Same result for a hold that is still vigente.
        let vigente = reserva_con(EstadoReserva::Activa, 1, now + Duration::days(2));
        assert_eq!(policy.renovar(&vigente, now).unwrap(), now + Duration::days(7));
    }

    #[test]
    fn renewals_are_capped() {
        let policy = ExpiryPolicy::default();
        let now = Utc::now();

        let agotada = reserva_con(EstadoReserva::Activa, 3, now + Duration::days(1));
        assert_matches!(
            policy.renovar(&agotada, now),
            Err(ServiceError::RenovacionesAgotadas { renovaciones: 3, .. })
        );
    }

    #[test]
    fn lazy_expiry_counts_unswept_holds_as_expired() {
        let policy = ExpiryPolicy::default();
        let now = Utc::now();

        // Activa but past its expiry: the sweep has not run, yet every read
        // must already treat it as expired.
        let lapsed = reserva_con(EstadoReserva::Activa, 0, now - Duration::seconds(1));
        assert!(policy.is_expired(&lapsed, now));

        let vigente = reserva_con(EstadoReserva::Activa, 0, now + Duration::days(1));
        assert!(!policy.is_expired(&vigente, now));

        let liberada = reserva_con(EstadoReserva::Liberada, 0, now + Duration::days(1));
        assert!(policy.is_expired(&liberada, now));

        let consumida = reserva_con(EstadoReserva::Consumida, 0, now - Duration::days(1));
        assert!(!policy.is_expired(&consumida, now));
    }

    #[test]
    fn from_dias_builds_custom_windows() {
        let policy = ExpiryPolicy::from_dias(1, 2, 5);
        assert_eq!(policy.vigencia_inicial, Duration::days(1));
        assert_eq!(policy.vigencia_renovacion, Duration::days(2));
        assert_eq!(policy.max_renovaciones, 5);
    }
}
