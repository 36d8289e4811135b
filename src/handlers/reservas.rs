use crate::{
    services::reservas::{ReservaStats, ReservaSummary, SweepResult},
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};
use axum::{
    extract::{Query, State},
    response::Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Deserialize, Default, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReservaListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Filter by estado: activa, liberada or consumida
    pub estado: Option<String>,
    pub producto_id: Option<Uuid>,
}

#[utoipa::path(
    get,
    path = "/api/v1/reservas",
    params(ReservaListQuery),
    responses(
        (status = 200, description = "Reservas listed", body = ApiResponse<PaginatedResponse<ReservaSummary>>)
    ),
    tag = "reservas"
)]
pub async fn list_reservas(
    State(state): State<AppState>,
    Query(query): Query<ReservaListQuery>,
) -> ApiResult<PaginatedResponse<ReservaSummary>> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).clamp(1, 100);

    let (items, total) = state
        .services
        .reservas
        .list_reservas(page, limit, query.estado.as_deref(), query.producto_id)
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
    get,
    path = "/api/v1/reservas/stats",
    responses(
        (status = 200, description = "Reservation ledger counters", body = ApiResponse<ReservaStats>)
    ),
    tag = "reservas"
)]
pub async fn reserva_stats(State(state): State<AppState>) -> ApiResult<ReservaStats> {
    let stats = state.services.reservas.stats().await?;
    Ok(Json(ApiResponse::success(stats)))
}

#[utoipa::path(
    post,
    path = "/api/v1/reservas/liberar-expiradas",
    responses(
        (status = 200, description = "Expiry sweep executed", body = ApiResponse<SweepResult>)
    ),
    tag = "reservas"
)]
pub async fn liberar_expiradas(State(state): State<AppState>) -> ApiResult<SweepResult> {
    let result = state.services.reservas.liberar_expiradas().await?;
    Ok(Json(ApiResponse::success(result)))
}
