use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::venta::{self, Entity as VentaEntity};
use crate::errors::ServiceError;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VentaResponse {
    pub id: Uuid,
    pub numero: String,
    pub proforma_id: Uuid,
    pub cliente_id: Uuid,
    pub total: Decimal,
    pub estado: String,
    pub created_at: DateTime<Utc>,
}

impl From<venta::Model> for VentaResponse {
    fn from(model: venta::Model) -> Self {
        Self {
            id: model.id,
            numero: model.numero,
            proforma_id: model.proforma_id,
            cliente_id: model.cliente_id,
            total: model.total,
            estado: model.estado,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VentaListResponse {
    pub ventas: Vec<VentaResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Read-side service over confirmed sales. Sales are only ever written by
/// the proforma conversion path.
#[derive(Clone)]
pub struct VentaService {
    db_pool: Arc<DatabaseConnection>,
}

impl VentaService {
    pub fn new(db_pool: Arc<DatabaseConnection>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self), fields(venta_id = %venta_id))]
    pub async fn get_venta(&self, venta_id: Uuid) -> Result<Option<VentaResponse>, ServiceError> {
        let db = &*self.db_pool;
        let venta = VentaEntity::find_by_id(venta_id).one(db).await?;
        Ok(venta.map(VentaResponse::from))
    }

    #[instrument(skip(self))]
    pub async fn list_ventas(
        &self,
        page: u64,
        per_page: u64,
        cliente_filter: Option<Uuid>,
    ) -> Result<VentaListResponse, ServiceError> {
        let db = &*self.db_pool;

        let mut query = VentaEntity::find();
        if let Some(cliente_id) = cliente_filter {
            query = query.filter(venta::Column::ClienteId.eq(cliente_id));
        }

        let paginator = query
            .order_by_desc(venta::Column::CreatedAt)
            .paginate(db, per_page);

        let total = paginator.num_items().await?;
        let ventas = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok(VentaListResponse {
            ventas: ventas.into_iter().map(VentaResponse::from).collect(),
            total,
            page,
            per_page,
        })
    }
}
