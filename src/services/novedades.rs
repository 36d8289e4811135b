//! Incident reporting against in-progress deliveries, and the forward-only
//! resolution workflow.

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
use validator::Validate;

use crate::entities::entrega::{self, Entity as EntregaEntity, EstadoEntrega};
use crate::entities::novedad::{self, Entity as NovedadEntity, EstadoNovedad, TipoNovedad};
use crate::entities::ruta_parada::{self, Entity as RutaParadaEntity};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct ReportarNovedadRequest {
    pub tipo: String,
    #[validate(length(min = 1, max = 1000, message = "Descripcion is required"))]
    pub descripcion: String,
    #[validate(length(min = 1, max = 100, message = "Reportado por is required"))]
    pub reportado_por: String,
    #[validate(url(message = "Foto URL must be a valid URL"))]
    pub foto_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CambiarEstadoNovedadRequest {
    pub estado: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NovedadResponse {
    pub id: Uuid,
    pub entrega_id: Uuid,
    pub tipo: String,
    pub descripcion: String,
    pub reportado_por: String,
    pub estado: String,
    pub foto_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<novedad::Model> for NovedadResponse {
    fn from(model: novedad::Model) -> Self {
        Self {
            id: model.id,
            entrega_id: model.entrega_id,
            tipo: model.tipo,
            descripcion: model.descripcion,
            reportado_por: model.reportado_por,
            estado: model.estado,
            foto_url: model.foto_url,
            created_at: model.created_at,
        }
    }
}

/// The resolution workflow only ever moves forward.
fn is_valid_transition(de: EstadoNovedad, a: EstadoNovedad) -> bool {
    matches!(
        (de, a),
        (EstadoNovedad::Abierta, EstadoNovedad::EnProceso)
            | (EstadoNovedad::EnProceso, EstadoNovedad::Resuelta)
    )
}

/// Service for managing delivery incidents.
#[derive(Clone)]
pub struct NovedadService {
    db_pool: Arc<DatabaseConnection>,
    event_sender: Option<Arc<EventSender>>,
}

impl NovedadService {
    pub fn new(db_pool: Arc<DatabaseConnection>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Reports an incident against a delivery in transit.
    ///
    /// The delivery moves to `novedad` (advisory, non-terminal) if it was
    /// still `en_transito`; further incidents can pile onto an already
    /// flagged delivery.
    #[instrument(skip(self, request), fields(entrega_id = %entrega_id, tipo = %request.tipo))]
    pub async fn reportar(
        &self,
        entrega_id: Uuid,
        request: ReportarNovedadRequest,
    ) -> Result<NovedadResponse, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let tipo = TipoNovedad::from_str(&request.tipo).ok_or_else(|| {
            ServiceError::ValidationError(format!("Tipo de novedad desconocido: {}", request.tipo))
        })?;

        let db = &*self.db_pool;
        let now = Utc::now();

        let txn = db.begin().await?;

        let entrega_model = EntregaEntity::find_by_id(entrega_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Entrega {} not found", entrega_id)))?;

        let estado_entrega = EstadoEntrega::from_str(&entrega_model.estado).ok_or_else(|| {
            ServiceError::InternalError(format!(
                "Entrega {} tiene un estado corrupto: {}",
                entrega_id, entrega_model.estado
            ))
        })?;

        if !matches!(
            estado_entrega,
            EstadoEntrega::EnTransito | EstadoEntrega::Novedad
        ) {
            return Err(ServiceError::NovedadFueraDeTransito {
                entrega_id,
                estado: entrega_model.estado.clone(),
            });
        }

        let entrega_numero = entrega_model.numero.clone();

        let created = novedad::ActiveModel {
            id: Set(Uuid::new_v4()),
            entrega_id: Set(entrega_id),
            tipo: Set(tipo.as_str().to_string()),
            descripcion: Set(request.descripcion.clone()),
            reportado_por: Set(request.reportado_por.clone()),
            estado: Set(EstadoNovedad::Abierta.as_str().to_string()),
            foto_url: Set(request.foto_url.clone()),
            created_at: Set(now),
            updated_at: Set(None),
        }
        .insert(&txn)
        .await?;

        // First incident flags the delivery; its route stop mirrors along.
        if estado_entrega == EstadoEntrega::EnTransito {
            let mut active: entrega::ActiveModel = entrega_model.into();
            active.estado = Set(EstadoEntrega::Novedad.as_str().to_string());
            active.updated_at = Set(Some(now));
            active.update(&txn).await?;

            RutaParadaEntity::update_many()
                .col_expr(
                    ruta_parada::Column::EstadoEntrega,
                    Expr::value(EstadoEntrega::Novedad.as_str()),
                )
                .filter(ruta_parada::Column::EntregaId.eq(entrega_id))
                .exec(&txn)
                .await?;
        }

        txn.commit().await?;

        info!(novedad_id = %created.id, entrega_id = %entrega_id, "Novedad reportada");

        if let Some(event_sender) = &self.event_sender {
            if estado_entrega == EstadoEntrega::EnTransito {
                if let Err(e) = event_sender
                    .send(Event::EntregaEstadoCambiado {
                        entrega_id,
                        estado_anterior: EstadoEntrega::EnTransito.as_str().to_string(),
                        estado_nuevo: EstadoEntrega::Novedad.as_str().to_string(),
                    })
                    .await
                {
                    warn!(error = %e, entrega_id = %entrega_id, "Failed to send entrega estado cambiado event");
                }
            }

            if let Err(e) = event_sender
                .send(Event::NovedadReportada {
                    novedad_id: created.id,
                    entrega_id,
                    entrega_numero,
                    tipo: created.tipo.clone(),
                    descripcion: created.descripcion.clone(),
                    reportado_por: created.reportado_por.clone(),
                    reportado_en: created.created_at,
                    foto_url: created.foto_url.clone(),
                })
                .await
            {
                warn!(error = %e, novedad_id = %created.id, "Failed to send novedad reportada event");
            }
        }

        Ok(NovedadResponse::from(created))
    }

    /// Advances the incident through `abierta -> en_proceso -> resuelta`.
    #[instrument(skip(self, request), fields(novedad_id = %novedad_id, nuevo = %request.estado))]
    pub async fn cambiar_estado(
        &self,
        novedad_id: Uuid,
        request: CambiarEstadoNovedadRequest,
    ) -> Result<NovedadResponse, ServiceError> {
        let nuevo = EstadoNovedad::from_str(&request.estado).ok_or_else(|| {
            ServiceError::ValidationError(format!(
                "Estado de novedad desconocido: {}",
                request.estado
            ))
        })?;

        let db = &*self.db_pool;

        let novedad_model = NovedadEntity::find_by_id(novedad_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Novedad {} not found", novedad_id)))?;

        let actual = EstadoNovedad::from_str(&novedad_model.estado).ok_or_else(|| {
            ServiceError::InternalError(format!(
                "Novedad {} tiene un estado corrupto: {}",
                novedad_id, novedad_model.estado
            ))
        })?;

        if !is_valid_transition(actual, nuevo) {
            return Err(ServiceError::TransicionInvalida {
                de: actual.as_str().to_string(),
                a: nuevo.as_str().to_string(),
            });
        }

        let mut active: novedad::ActiveModel = novedad_model.into();
        active.estado = Set(nuevo.as_str().to_string());
        active.updated_at = Set(Some(Utc::now()));

        let updated = active.update(db).await?;

        info!(novedad_id = %novedad_id, de = %actual.as_str(), a = %nuevo.as_str(), "Novedad estado cambiado");

        Ok(NovedadResponse::from(updated))
    }

    /// Lists the incidents reported against one delivery, newest first.
    #[instrument(skip(self), fields(entrega_id = %entrega_id))]
    pub async fn list_por_entrega(
        &self,
        entrega_id: Uuid,
    ) -> Result<Vec<NovedadResponse>, ServiceError> {
        let db = &*self.db_pool;

        let novedades = NovedadEntity::find()
            .filter(novedad::Column::EntregaId.eq(entrega_id))
            .order_by_desc(novedad::Column::CreatedAt)
            .all(db)
            .await?;

        Ok(novedades.into_iter().map(NovedadResponse::from).collect())
    }

    /// Lists incidents with pagination and optional estado/tipo filters.
    #[instrument(skip(self))]
    pub async fn list_novedades(
        &self,
        page: u64,
        per_page: u64,
        estado_filter: Option<&str>,
        tipo_filter: Option<&str>,
    ) -> Result<(Vec<NovedadResponse>, u64), ServiceError> {
        let db = &*self.db_pool;

        let mut query = NovedadEntity::find();

        if let Some(raw) = estado_filter {
            let estado = EstadoNovedad::from_str(raw).ok_or_else(|| {
                ServiceError::ValidationError(format!("Estado de novedad desconocido: {}", raw))
            })?;
            query = query.filter(novedad::Column::Estado.eq(estado.as_str()));
        }

        if let Some(raw) = tipo_filter {
            let tipo = TipoNovedad::from_str(raw).ok_or_else(|| {
                ServiceError::ValidationError(format!("Tipo de novedad desconocido: {}", raw))
            })?;
            query = query.filter(novedad::Column::Tipo.eq(tipo.as_str()));
        }

        let paginator = query
            .order_by_desc(novedad::Column::CreatedAt)
            .paginate(db, per_page);

        let total = paginator.num_items().await?;
        let novedades = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((
            novedades.into_iter().map(NovedadResponse::from).collect(),
            total,
        ))
    }
}
