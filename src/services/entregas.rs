//! Delivery lifecycle: creation per sale, driver/vehicle assignment, the
//! status state machine and the GPS trail.

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::entrega::{self, Entity as EntregaEntity, EstadoEntrega};
use crate::entities::entrega_ubicacion::{self, Entity as UbicacionEntity};
use crate::entities::ruta_parada::{self, Entity as RutaParadaEntity};
use crate::entities::venta::Entity as VentaEntity;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

/// Whether the delivery state machine admits `de -> a`.
///
/// Linear progression with branch points: rejection/cancellation become
/// available once a driver is assigned, and `novedad` is a resumable detour
/// from `en_transito`. Terminal states admit nothing.
pub fn is_valid_transition(de: EstadoEntrega, a: EstadoEntrega) -> bool {
    use EstadoEntrega::*;

    if de.is_terminal() {
        return false;
    }

    match (de, a) {
        (Programado, Asignada) => true,
        (Asignada, PreparacionCarga) => true,
        (PreparacionCarga, EnCarga) => true,
        (EnCarga, ListoParaEntrega) => true,
        (ListoParaEntrega, EnTransito) => true,
        (EnTransito, Entregado) => true,
        (EnTransito, Novedad) => true,
        // An incident is advisory: the delivery resumes or resolves.
        (Novedad, EnTransito) => true,
        (Novedad, Entregado) => true,
        (
            Asignada | PreparacionCarga | EnCarga | ListoParaEntrega | EnTransito | Novedad,
            Rechazado | Cancelada,
        ) => true,
        _ => false,
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateEntregaRequest {
    pub fecha_programada: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AsignarEntregaRequest {
    pub conductor_id: Uuid,
    pub vehiculo_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CambiarEstadoRequest {
    pub estado: String,
    pub motivo: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegistrarUbicacionRequest {
    pub latitud: f64,
    pub longitud: f64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EntregaSummary {
    pub id: Uuid,
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
}

impl From<entrega::Model> for EntregaSummary {
    fn from(model: entrega::Model) -> Self {
        Self {
            id: model.id,
            numero: model.numero,
            venta_id: model.venta_id,
            conductor_id: model.conductor_id,
            vehiculo_id: model.vehiculo_id,
            estado: model.estado,
            fecha_programada: model.fecha_programada,
            iniciada_at: model.iniciada_at,
            completada_at: model.completada_at,
            motivo_rechazo: model.motivo_rechazo,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UbicacionResponse {
    pub latitud: f64,
    pub longitud: f64,
    pub registrada_at: DateTime<Utc>,
}

impl From<entrega_ubicacion::Model> for UbicacionResponse {
    fn from(model: entrega_ubicacion::Model) -> Self {
        Self {
            latitud: model.latitud,
            longitud: model.longitud,
            registrada_at: model.registrada_at,
        }
    }
}

/// Service for managing deliveries.
#[derive(Clone)]
pub struct EntregaService {
    db_pool: Arc<DatabaseConnection>,
    event_sender: Option<Arc<EventSender>>,
}

impl EntregaService {
    pub fn new(db_pool: Arc<DatabaseConnection>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Creates a delivery for a confirmed sale, starting at `programado`.
    #[instrument(skip(self, request), fields(venta_id = %venta_id))]
    pub async fn create_for_venta(
        &self,
        venta_id: Uuid,
        request: CreateEntregaRequest,
    ) -> Result<EntregaSummary, ServiceError> {
        let db = &*self.db_pool;
        let now = Utc::now();

        let venta_model = VentaEntity::find_by_id(venta_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Venta {} not found", venta_id)))?;

        let existentes = EntregaEntity::find()
            .filter(entrega::Column::VentaId.eq(venta_id))
            .count(db)
            .await?;

        let active = entrega::ActiveModel {
            id: Set(Uuid::new_v4()),
            numero: Set(format!("{}-E{}", venta_model.numero, existentes + 1)),
            venta_id: Set(venta_id),
            conductor_id: Set(None),
            vehiculo_id: Set(None),
            estado: Set(EstadoEntrega::Programado.as_str().to_string()),
            fecha_programada: Set(request.fecha_programada),
            iniciada_at: Set(None),
            completada_at: Set(None),
            motivo_rechazo: Set(None),
            created_at: Set(now),
            updated_at: Set(None),
        };

        let created = active.insert(db).await?;

        info!(entrega_id = %created.id, numero = %created.numero, "Entrega created");

        Ok(EntregaSummary::from(created))
    }

    /// Assigns driver and vehicle, moving `programado -> asignada`.
    #[instrument(skip(self, request), fields(entrega_id = %entrega_id))]
    pub async fn asignar(
        &self,
        entrega_id: Uuid,
        request: AsignarEntregaRequest,
    ) -> Result<EntregaSummary, ServiceError> {
        let db = &*self.db_pool;
        let now = Utc::now();

        let txn = db.begin().await?;

        let entrega_model = EntregaEntity::find_by_id(entrega_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Entrega {} not found", entrega_id)))?;

        let actual = self.estado_of(&entrega_model)?;
        if !is_valid_transition(actual, EstadoEntrega::Asignada) {
            return Err(ServiceError::TransicionInvalida {
                de: actual.as_str().to_string(),
                a: EstadoEntrega::Asignada.as_str().to_string(),
            });
        }

        let mut active: entrega::ActiveModel = entrega_model.into();
        active.conductor_id = Set(Some(request.conductor_id));
        active.vehiculo_id = Set(Some(request.vehiculo_id));
        active.estado = Set(EstadoEntrega::Asignada.as_str().to_string());
        active.updated_at = Set(Some(now));

        let updated = active.update(&txn).await?;

        RutaParadaEntity::update_many()
            .col_expr(
                ruta_parada::Column::EstadoEntrega,
                Expr::value(EstadoEntrega::Asignada.as_str()),
            )
            .filter(ruta_parada::Column::EntregaId.eq(entrega_id))
            .exec(&txn)
            .await?;

        txn.commit().await?;

        info!(
            entrega_id = %entrega_id,
            conductor_id = %request.conductor_id,
            vehiculo_id = %request.vehiculo_id,
            "Entrega asignada"
        );

        self.emit_estado_cambiado(entrega_id, actual, EstadoEntrega::Asignada)
            .await;

        Ok(EntregaSummary::from(updated))
    }

    /// Applies a status transition, validating it against the state machine.
    ///
    /// `rechazado` demands a motivo. Rejected transitions mutate nothing.
    /// The new status is mirrored into any route stop referencing this
    /// delivery so route listings stay coherent.
    #[instrument(skip(self, request), fields(entrega_id = %entrega_id, nuevo = %request.estado))]
    pub async fn cambiar_estado(
        &self,
        entrega_id: Uuid,
        request: CambiarEstadoRequest,
    ) -> Result<EntregaSummary, ServiceError> {
        let nuevo = EstadoEntrega::from_str(&request.estado).ok_or_else(|| {
            ServiceError::ValidationError(format!("Estado de entrega desconocido: {}", request.estado))
        })?;

        if nuevo == EstadoEntrega::Rechazado
            && request.motivo.as_deref().map_or(true, |m| m.trim().is_empty())
        {
            return Err(ServiceError::ValidationError(
                "El rechazo requiere un motivo".to_string(),
            ));
        }

        let db = &*self.db_pool;
        let now = Utc::now();

        let txn = db.begin().await?;

        let entrega_model = EntregaEntity::find_by_id(entrega_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Entrega {} not found", entrega_id)))?;

        let actual = self.estado_of(&entrega_model)?;
        if !is_valid_transition(actual, nuevo) {
            return Err(ServiceError::TransicionInvalida {
                de: actual.as_str().to_string(),
                a: nuevo.as_str().to_string(),
            });
        }

        let mut active: entrega::ActiveModel = entrega_model.into();
        active.estado = Set(nuevo.as_str().to_string());
        active.updated_at = Set(Some(now));

        if nuevo == EstadoEntrega::EnTransito && actual != EstadoEntrega::Novedad {
            active.iniciada_at = Set(Some(now));
        }
        if nuevo.is_terminal() {
            active.completada_at = Set(Some(now));
        }
        if nuevo == EstadoEntrega::Rechazado {
            active.motivo_rechazo = Set(request.motivo.clone());
        }

        let updated = active.update(&txn).await?;

        // Keep the route stop snapshot in sync with the live status.
        RutaParadaEntity::update_many()
            .col_expr(
                ruta_parada::Column::EstadoEntrega,
                Expr::value(nuevo.as_str()),
            )
            .filter(ruta_parada::Column::EntregaId.eq(entrega_id))
            .exec(&txn)
            .await?;

        txn.commit().await?;

        info!(
            entrega_id = %entrega_id,
            de = %actual,
            a = %nuevo,
            "Entrega estado cambiado"
        );

        self.emit_estado_cambiado(entrega_id, actual, nuevo).await;

        Ok(EntregaSummary::from(updated))
    }

    /// Records a GPS ping for an in-progress delivery.
    #[instrument(skip(self, request), fields(entrega_id = %entrega_id))]
    pub async fn registrar_ubicacion(
        &self,
        entrega_id: Uuid,
        request: RegistrarUbicacionRequest,
    ) -> Result<UbicacionResponse, ServiceError> {
        if !(-90.0..=90.0).contains(&request.latitud)
            || !(-180.0..=180.0).contains(&request.longitud)
        {
            return Err(ServiceError::ValidationError(
                "Coordenadas fuera de rango".to_string(),
            ));
        }

        let db = &*self.db_pool;

        let entrega_model = EntregaEntity::find_by_id(entrega_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Entrega {} not found", entrega_id)))?;

        let actual = self.estado_of(&entrega_model)?;
        if actual.is_terminal() {
            return Err(ServiceError::InvalidOperation(format!(
                "La entrega {} ya finalizo; no admite ubicaciones",
                entrega_id
            )));
        }

        let active = entrega_ubicacion::ActiveModel {
            id: Set(Uuid::new_v4()),
            entrega_id: Set(entrega_id),
            latitud: Set(request.latitud),
            longitud: Set(request.longitud),
            registrada_at: Set(Utc::now()),
        };

        let created = active.insert(db).await?;

        Ok(UbicacionResponse::from(created))
    }

    /// Returns the GPS trail of a delivery, oldest ping first.
    #[instrument(skip(self), fields(entrega_id = %entrega_id))]
    pub async fn ubicaciones(
        &self,
        entrega_id: Uuid,
    ) -> Result<Vec<UbicacionResponse>, ServiceError> {
        let db = &*self.db_pool;

        let pings = UbicacionEntity::find()
            .filter(entrega_ubicacion::Column::EntregaId.eq(entrega_id))
            .order_by_asc(entrega_ubicacion::Column::RegistradaAt)
            .all(db)
            .await?;

        Ok(pings.into_iter().map(UbicacionResponse::from).collect())
    }

    #[instrument(skip(self), fields(entrega_id = %entrega_id))]
    pub async fn get_entrega(
        &self,
        entrega_id: Uuid,
    ) -> Result<Option<EntregaSummary>, ServiceError> {
        let db = &*self.db_pool;
        let entrega_model = EntregaEntity::find_by_id(entrega_id).one(db).await?;
        Ok(entrega_model.map(EntregaSummary::from))
    }

    /// Lists deliveries with pagination and optional estado filter. The
    /// filter accepts the legacy synonyms and matches on the canonical state.
    #[instrument(skip(self))]
    pub async fn list_entregas(
        &self,
        page: u64,
        per_page: u64,
        estado_filter: Option<&str>,
    ) -> Result<(Vec<EntregaSummary>, u64), ServiceError> {
        let db = &*self.db_pool;

        let mut query = EntregaEntity::find();
        if let Some(raw) = estado_filter {
            let estado = EstadoEntrega::from_str(raw).ok_or_else(|| {
                ServiceError::ValidationError(format!("Estado de entrega desconocido: {}", raw))
            })?;
            query = query.filter(entrega::Column::Estado.eq(estado.as_str()));
        }

        let paginator = query
            .order_by_desc(entrega::Column::CreatedAt)
            .paginate(db, per_page);

        let total = paginator.num_items().await?;
        let entregas = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((
            entregas.into_iter().map(EntregaSummary::from).collect(),
            total,
        ))
    }

    fn estado_of(&self, model: &entrega::Model) -> Result<EstadoEntrega, ServiceError> {
        model.estado_actual().ok_or_else(|| {
            ServiceError::InternalError(format!(
                "Entrega {} tiene un estado corrupto: {}",
                model.id, model.estado
            ))
        })
    }

    async fn emit_estado_cambiado(
        &self,
        entrega_id: Uuid,
        anterior: EstadoEntrega,
        nuevo: EstadoEntrega,
    ) {
        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender
                .send(Event::EntregaEstadoCambiado {
                    entrega_id,
                    estado_anterior: anterior.as_str().to_string(),
                    estado_nuevo: nuevo.as_str().to_string(),
                })
                .await
            {
                warn!(error = %e, entrega_id = %entrega_id, "Failed to send entrega estado cambiado event");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use EstadoEntrega::*;

    #[rstest]
    #[case(Programado, Asignada)]
    #[case(Asignada, PreparacionCarga)]
    #[case(PreparacionCarga, EnCarga)]
    #[case(EnCarga, ListoParaEntrega)]
    #[case(ListoParaEntrega, EnTransito)]
    #[case(EnTransito, Entregado)]
    #[case(EnTransito, Novedad)]
    #[case(Novedad, EnTransito)]
    #[case(Novedad, Entregado)]
    #[case(Asignada, Rechazado)]
    #[case(Asignada, Cancelada)]
    #[case(EnCarga, Rechazado)]
    #[case(EnTransito, Cancelada)]
    #[case(Novedad, Rechazado)]
    fn valid_transitions(#[case] de: EstadoEntrega, #[case] a: EstadoEntrega) {
        assert!(is_valid_transition(de, a), "{:?} -> {:?} should be valid", de, a);
    }

    #[rstest]
    // Skipping steps of the linear progression
    #[case(Programado, EnCarga)]
    #[case(Asignada, EnTransito)]
    #[case(PreparacionCarga, Entregado)]
    // Rejection/cancellation before assignment
    #[case(Programado, Rechazado)]
    #[case(Programado, Cancelada)]
    // Incidents only arise in transit
    #[case(EnCarga, Novedad)]
    #[case(Programado, Novedad)]
    // Going backwards
    #[case(EnTransito, ListoParaEntrega)]
    #[case(Asignada, Programado)]
    // Same-state no-ops are not transitions
    #[case(EnTransito, EnTransito)]
    fn invalid_transitions(#[case] de: EstadoEntrega, #[case] a: EstadoEntrega) {
        assert!(!is_valid_transition(de, a), "{:?} -> {:?} should be invalid", de, a);
    }

    #[rstest]
    #[case(Entregado)]
    #[case(Rechazado)]
    #[case(Cancelada)]
    fn terminal_states_reject_everything(#[case] de: EstadoEntrega) {
        for a in [
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
        ] {
            assert!(!is_valid_transition(de, a), "{:?} -> {:?} must be rejected", de, a);
        }
    }
}
