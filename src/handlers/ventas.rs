use crate::{
    errors::ServiceError,
    services::entregas::{CreateEntregaRequest, EntregaSummary},
    services::ventas::{VentaListResponse, VentaResponse},
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Deserialize, Default, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct VentaListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub cliente_id: Option<Uuid>,
}

#[utoipa::path(
    get,
    path = "/api/v1/ventas",
    params(VentaListQuery),
    responses(
        (status = 200, description = "Ventas listed", body = ApiResponse<VentaListResponse>)
    ),
    tag = "ventas"
)]
pub async fn list_ventas(
    State(state): State<AppState>,
    Query(query): Query<VentaListQuery>,
) -> ApiResult<VentaListResponse> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).clamp(1, 100);

    let response = state
        .services
        .ventas
        .list_ventas(page, limit, query.cliente_id)
        .await?;

    Ok(Json(ApiResponse::success(response)))
}

#[utoipa::path(
    get,
    path = "/api/v1/ventas/:id",
    params(
        ("id" = Uuid, Path, description = "Venta ID")
    ),
    responses(
        (status = 200, description = "Venta fetched", body = ApiResponse<VentaResponse>),
        (status = 404, description = "Venta not found", body = crate::errors::ErrorResponse)
    ),
    tag = "ventas"
)]
pub async fn get_venta(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<VentaResponse> {
    match state.services.ventas.get_venta(id).await? {
        Some(venta) => Ok(Json(ApiResponse::success(venta))),
        None => Err(ServiceError::NotFound(format!("Venta {} not found", id))),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/ventas/:id/entregas",
    params(
        ("id" = Uuid, Path, description = "Venta ID")
    ),
    request_body = CreateEntregaRequest,
    responses(
        (status = 200, description = "Entrega created for the venta", body = ApiResponse<EntregaSummary>),
        (status = 404, description = "Venta not found", body = crate::errors::ErrorResponse)
    ),
    tag = "ventas"
)]
pub async fn create_entrega(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateEntregaRequest>,
) -> ApiResult<EntregaSummary> {
    let entrega = state.services.entregas.create_for_venta(id, payload).await?;
    Ok(Json(ApiResponse::success(entrega)))
}
