use crate::{
    services::novedades::{CambiarEstadoNovedadRequest, NovedadResponse},
    ApiResponse, ApiResult, AppState, PaginatedResponse,
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
pub struct NovedadListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Filter by estado: abierta, en_proceso or resuelta
    pub estado: Option<String>,
    /// Filter by tipo: falta, danio, direccion_incorrecta, cliente_rechaza, otra
    pub tipo: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/novedades",
    params(NovedadListQuery),
    responses(
        (status = 200, description = "Novedades listed", body = ApiResponse<PaginatedResponse<NovedadResponse>>)
    ),
    tag = "novedades"
)]
pub async fn list_novedades(
    State(state): State<AppState>,
    Query(query): Query<NovedadListQuery>,
) -> ApiResult<PaginatedResponse<NovedadResponse>> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).clamp(1, 100);

    let (items, total) = state
        .services
        .novedades
        .list_novedades(page, limit, query.estado.as_deref(), query.tipo.as_deref())
        .await?;

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
    put,
    path = "/api/v1/novedades/:id/estado",
    params(
        ("id" = Uuid, Path, description = "Novedad ID")
    ),
    request_body = CambiarEstadoNovedadRequest,
    responses(
        (status = 200, description = "Estado updated", body = ApiResponse<NovedadResponse>),
        (status = 404, description = "Novedad not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Invalid transition", body = crate::errors::ErrorResponse)
    ),
    tag = "novedades"
)]
pub async fn cambiar_estado(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CambiarEstadoNovedadRequest>,
) -> ApiResult<NovedadResponse> {
    let novedad = state.services.novedades.cambiar_estado(id, payload).await?;
    Ok(Json(ApiResponse::success(novedad)))
}
