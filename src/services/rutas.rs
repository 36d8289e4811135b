//! Route building: grouping deliveries into an ordered batch for one
//! driver/vehicle/zone/date.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::entities::entrega::{self, Entity as EntregaEntity};
use crate::entities::ruta::{self, Entity as RutaEntity, EstadoRuta};
use crate::entities::ruta_parada::{self, Entity as RutaParadaEntity};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateRutaRequest {
    #[validate(length(min = 1, max = 100, message = "Zona is required"))]
    pub zona: String,
    pub fecha: NaiveDate,
    /// Stops in traversal order. The caller controls the sequence; the
    /// service assigns position indices as supplied.
    #[validate(length(min = 1, message = "At least one entrega is required"))]
    pub entrega_ids: Vec<Uuid>,
    pub conductor_id: Option<Uuid>,
    pub vehiculo_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RutaResponse {
    pub id: Uuid,
    pub numero: String,
    pub zona: String,
    pub fecha: NaiveDate,
    pub conductor_id: Option<Uuid>,
    pub vehiculo_id: Option<Uuid>,
    pub estado: String,
    pub created_at: DateTime<Utc>,
}

impl From<ruta::Model> for RutaResponse {
    fn from(model: ruta::Model) -> Self {
        Self {
            id: model.id,
            numero: model.numero,
            zona: model.zona,
            fecha: model.fecha,
            conductor_id: model.conductor_id,
            vehiculo_id: model.vehiculo_id,
            estado: model.estado,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ParadaResponse {
    pub posicion_orden: i32,
    pub entrega_id: Uuid,
    pub entrega_numero: String,
    pub estado_entrega: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RutaDetail {
    pub ruta: RutaResponse,
    pub paradas: Vec<ParadaResponse>,
}

fn has_duplicates(ids: &[Uuid]) -> bool {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().any(|id| !seen.insert(id))
}

/// Service for building and reading delivery routes.
#[derive(Clone)]
pub struct RutaService {
    db_pool: Arc<DatabaseConnection>,
    event_sender: Option<Arc<EventSender>>,
}

impl RutaService {
    pub fn new(db_pool: Arc<DatabaseConnection>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Creates a route from an ordered list of deliveries.
    ///
    /// Input validation (empty or duplicated delivery list) fails before
    /// anything is persisted. Every delivery must exist and not already
    /// belong to another route.
    #[instrument(skip(self, request), fields(zona = %request.zona, fecha = %request.fecha))]
    pub async fn crear_ruta(&self, request: CreateRutaRequest) -> Result<RutaDetail, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        if has_duplicates(&request.entrega_ids) {
            return Err(ServiceError::ValidationError(
                "La lista de entregas contiene duplicados".to_string(),
            ));
        }

        let db = &*self.db_pool;
        let now = Utc::now();
        let ruta_id = Uuid::new_v4();

        let txn = db.begin().await?;

        let numero = format!(
            "R-{}-{}",
            request.fecha.format("%Y%m%d"),
            &ruta_id.simple().to_string()[..6]
        );

        let ruta_model = ruta::ActiveModel {
            id: Set(ruta_id),
            numero: Set(numero),
            zona: Set(request.zona.clone()),
            fecha: Set(request.fecha),
            conductor_id: Set(request.conductor_id),
            vehiculo_id: Set(request.vehiculo_id),
            estado: Set(EstadoRuta::Planificada.as_str().to_string()),
            created_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let mut paradas = Vec::with_capacity(request.entrega_ids.len());

        for (indice, entrega_id) in request.entrega_ids.iter().enumerate() {
            let entrega_model = EntregaEntity::find_by_id(*entrega_id)
                .one(&txn)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Entrega {} not found", entrega_id))
                })?;

            if let Some(existente) = RutaParadaEntity::find()
                .filter(ruta_parada::Column::EntregaId.eq(*entrega_id))
                .one(&txn)
                .await?
            {
                return Err(ServiceError::EntregaYaEnRuta {
                    entrega_id: *entrega_id,
                    ruta_id: existente.ruta_id,
                });
            }

            let parada = ruta_parada::ActiveModel {
                id: Set(Uuid::new_v4()),
                ruta_id: Set(ruta_id),
                entrega_id: Set(*entrega_id),
                posicion_orden: Set(indice as i32 + 1),
                estado_entrega: Set(entrega_model.estado.clone()),
                created_at: Set(now),
            }
            .insert(&txn)
            .await?;

            paradas.push(ParadaResponse {
                posicion_orden: parada.posicion_orden,
                entrega_id: parada.entrega_id,
                entrega_numero: entrega_model.numero,
                estado_entrega: parada.estado_entrega,
            });
        }

        txn.commit().await?;

        info!(ruta_id = %ruta_id, paradas = paradas.len(), "Ruta created");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender
                .send(Event::RutaCreada {
                    ruta_id,
                    zona: request.zona,
                    paradas: paradas.len() as u32,
                })
                .await
            {
                warn!(error = %e, ruta_id = %ruta_id, "Failed to send ruta creada event");
            }
        }

        Ok(RutaDetail {
            ruta: RutaResponse::from(ruta_model),
            paradas,
        })
    }

    /// Retrieves a route with its stops in traversal order, each carrying
    /// the delivery's live status.
    #[instrument(skip(self), fields(ruta_id = %ruta_id))]
    pub async fn get_ruta(&self, ruta_id: Uuid) -> Result<Option<RutaDetail>, ServiceError> {
        let db = &*self.db_pool;

        let Some(ruta_model) = RutaEntity::find_by_id(ruta_id).one(db).await? else {
            return Ok(None);
        };

        let paradas = RutaParadaEntity::find()
            .filter(ruta_parada::Column::RutaId.eq(ruta_id))
            .order_by_asc(ruta_parada::Column::PosicionOrden)
            .all(db)
            .await?;

        // One lookup for all stop deliveries instead of a query per stop.
        let entrega_ids: Vec<Uuid> = paradas.iter().map(|p| p.entrega_id).collect();
        let entregas: HashMap<Uuid, entrega::Model> = EntregaEntity::find()
            .filter(entrega::Column::Id.is_in(entrega_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|e| (e.id, e))
            .collect();

        let paradas = paradas
            .into_iter()
            .map(|p| {
                let entrega_model = entregas.get(&p.entrega_id);
                ParadaResponse {
                    posicion_orden: p.posicion_orden,
                    entrega_id: p.entrega_id,
                    entrega_numero: entrega_model
                        .map(|e| e.numero.clone())
                        .unwrap_or_default(),
                    estado_entrega: entrega_model
                        .map(|e| e.estado.clone())
                        .unwrap_or(p.estado_entrega),
                }
            })
            .collect();

        Ok(Some(RutaDetail {
            ruta: RutaResponse::from(ruta_model),
            paradas,
        }))
    }

    /// Lists routes with pagination and optional fecha/zona filters.
    #[instrument(skip(self))]
    pub async fn list_rutas(
        &self,
        page: u64,
        per_page: u64,
        fecha_filter: Option<NaiveDate>,
        zona_filter: Option<&str>,
    ) -> Result<(Vec<RutaResponse>, u64), ServiceError> {
        let db = &*self.db_pool;

        let mut query = RutaEntity::find();
        if let Some(fecha) = fecha_filter {
            query = query.filter(ruta::Column::Fecha.eq(fecha));
        }
        if let Some(zona) = zona_filter {
            query = query.filter(ruta::Column::Zona.eq(zona));
        }

        let paginator = query
            .order_by_desc(ruta::Column::CreatedAt)
            .paginate(db, per_page);

        let total = paginator.num_items().await?;
        let rutas = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((rutas.into_iter().map(RutaResponse::from).collect(), total))
    }
}
