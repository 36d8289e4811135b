use crate::{
    entities::producto,
    errors::ServiceError,
    services::stock::CreateProductoRequest,
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Default, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductoListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize, ToSchema)]
#[schema(example = json!({
    "id": "550e8400-e29b-41d4-a716-446655440000",
    "sku": "ACE-1L",
    "nombre": "Aceite vegetal 1L",
    "disponible": 120,
    "reservado": 15,
    "asignable": 105,
    "created_at": "2024-06-01T10:30:00Z"
}))]
pub struct ProductoSummary {
    /// Product UUID
    pub id: Uuid,
    /// Stock keeping unit
    #[schema(example = "ACE-1L")]
    pub sku: String,
    pub nombre: String,
    /// Physical on-hand stock
    pub disponible: i32,
    /// Units held by active reservations
    pub reservado: i32,
    /// Stock still allocatable to new reservations
    pub asignable: i32,
    pub created_at: DateTime<Utc>,
}

impl From<producto::Model> for ProductoSummary {
    fn from(model: producto::Model) -> Self {
        let asignable = model.asignable();
        Self {
            id: model.id,
            sku: model.sku,
            nombre: model.nombre,
            disponible: model.disponible,
            reservado: model.reservado,
            asignable,
            created_at: model.created_at,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/productos",
    params(ProductoListQuery),
    responses(
        (status = 200, description = "Productos listed", body = ApiResponse<PaginatedResponse<ProductoSummary>>)
    ),
    tag = "productos"
)]
pub async fn list_productos(
    State(state): State<AppState>,
    Query(query): Query<ProductoListQuery>,
) -> ApiResult<PaginatedResponse<ProductoSummary>> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).clamp(1, 100);

    let (records, total) = state.services.stock.list_productos(page, limit).await?;

    let items: Vec<ProductoSummary> = records.into_iter().map(ProductoSummary::from).collect();
    let total_pages = (total + limit - 1) / limit;

    Ok(Json(ApiResponse::success(PaginatedResponse {
        items,
        total,
        page,
        limit,
        total_pages,
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/productos/:id",
    params(
        ("id" = Uuid, Path, description = "Producto ID")
    ),
    responses(
        (status = 200, description = "Producto fetched", body = ApiResponse<ProductoSummary>),
        (status = 404, description = "Producto not found", body = crate::errors::ErrorResponse)
    ),
    tag = "productos"
)]
pub async fn get_producto(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ProductoSummary> {
    match state.services.stock.get_producto(id).await? {
        Some(model) => Ok(Json(ApiResponse::success(ProductoSummary::from(model)))),
        None => Err(ServiceError::NotFound(format!("Producto {} not found", id))),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/productos",
    request_body = CreateProductoRequest,
    responses(
        (status = 200, description = "Producto created", body = ApiResponse<ProductoSummary>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    ),
    tag = "productos"
)]
pub async fn create_producto(
    State(state): State<AppState>,
    Json(payload): Json<CreateProductoRequest>,
) -> ApiResult<ProductoSummary> {
    payload
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let created = state.services.stock.create_producto(payload).await?;

    Ok(Json(ApiResponse::success(ProductoSummary::from(created))))
}
