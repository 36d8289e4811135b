use crate::{
    errors::ServiceError,
    services::entregas::{
        AsignarEntregaRequest, CambiarEstadoRequest, EntregaSummary, RegistrarUbicacionRequest,
        UbicacionResponse,
    },
    services::novedades::{NovedadResponse, ReportarNovedadRequest},
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
pub struct EntregaListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Filter by estado; accepts the legacy synonyms en_camino and llego
    pub estado: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/entregas",
    params(EntregaListQuery),
    responses(
        (status = 200, description = "Entregas listed", body = ApiResponse<PaginatedResponse<EntregaSummary>>)
    ),
    tag = "entregas"
)]
pub async fn list_entregas(
    State(state): State<AppState>,
    Query(query): Query<EntregaListQuery>,
) -> ApiResult<PaginatedResponse<EntregaSummary>> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).clamp(1, 100);

    let (items, total) = state
        .services
        .entregas
        .list_entregas(page, limit, query.estado.as_deref())
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
    path = "/api/v1/entregas/:id",
    params(
        ("id" = Uuid, Path, description = "Entrega ID")
    ),
    responses(
        (status = 200, description = "Entrega fetched", body = ApiResponse<EntregaSummary>),
        (status = 404, description = "Entrega not found", body = crate::errors::ErrorResponse)
    ),
    tag = "entregas"
)]
pub async fn get_entrega(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<EntregaSummary> {
    match state.services.entregas.get_entrega(id).await? {
        Some(entrega) => Ok(Json(ApiResponse::success(entrega))),
        None => Err(ServiceError::NotFound(format!("Entrega {} not found", id))),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/entregas/:id/asignar",
    params(
        ("id" = Uuid, Path, description = "Entrega ID")
    ),
    request_body = AsignarEntregaRequest,
    responses(
        (status = 200, description = "Conductor and vehiculo assigned", body = ApiResponse<EntregaSummary>),
        (status = 404, description = "Entrega not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Entrega not in programado", body = crate::errors::ErrorResponse)
    ),
    tag = "entregas"
)]
pub async fn asignar_entrega(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AsignarEntregaRequest>,
) -> ApiResult<EntregaSummary> {
    let entrega = state.services.entregas.asignar(id, payload).await?;
    Ok(Json(ApiResponse::success(entrega)))
}

#[utoipa::path(
    put,
    path = "/api/v1/entregas/:id/estado",
    params(
        ("id" = Uuid, Path, description = "Entrega ID")
    ),
    request_body = CambiarEstadoRequest,
    responses(
        (status = 200, description = "Estado updated", body = ApiResponse<EntregaSummary>),
        (status = 404, description = "Entrega not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Invalid transition", body = crate::errors::ErrorResponse)
    ),
    tag = "entregas"
)]
pub async fn cambiar_estado(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CambiarEstadoRequest>,
) -> ApiResult<EntregaSummary> {
    let entrega = state.services.entregas.cambiar_estado(id, payload).await?;
    Ok(Json(ApiResponse::success(entrega)))
}

#[utoipa::path(
    post,
    path = "/api/v1/entregas/:id/ubicaciones",
    params(
        ("id" = Uuid, Path, description = "Entrega ID")
    ),
    request_body = RegistrarUbicacionRequest,
    responses(
        (status = 200, description = "GPS ping recorded", body = ApiResponse<UbicacionResponse>),
        (status = 404, description = "Entrega not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Entrega already finalized", body = crate::errors::ErrorResponse)
    ),
    tag = "entregas"
)]
pub async fn registrar_ubicacion(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RegistrarUbicacionRequest>,
) -> ApiResult<UbicacionResponse> {
    let ubicacion = state
        .services
        .entregas
        .registrar_ubicacion(id, payload)
        .await?;
    Ok(Json(ApiResponse::success(ubicacion)))
}

#[utoipa::path(
    get,
    path = "/api/v1/entregas/:id/ubicaciones",
    params(
        ("id" = Uuid, Path, description = "Entrega ID")
    ),
    responses(
        (status = 200, description = "GPS trail, oldest first", body = ApiResponse<Vec<UbicacionResponse>>)
    ),
    tag = "entregas"
)]
pub async fn ubicaciones(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<UbicacionResponse>> {
    let pings = state.services.entregas.ubicaciones(id).await?;
    Ok(Json(ApiResponse::success(pings)))
}

#[utoipa::path(
    post,
    path = "/api/v1/entregas/:id/novedades",
    params(
        ("id" = Uuid, Path, description = "Entrega ID")
    ),
    request_body = ReportarNovedadRequest,
    responses(
        (status = 200, description = "Novedad reported", body = ApiResponse<NovedadResponse>),
        (status = 404, description = "Entrega not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Entrega not in transit", body = crate::errors::ErrorResponse)
    ),
    tag = "entregas"
)]
pub async fn reportar_novedad(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReportarNovedadRequest>,
) -> ApiResult<NovedadResponse> {
    let novedad = state.services.novedades.reportar(id, payload).await?;
    Ok(Json(ApiResponse::success(novedad)))
}

#[utoipa::path(
    get,
    path = "/api/v1/entregas/:id/novedades",
    params(
        ("id" = Uuid, Path, description = "Entrega ID")
    ),
    responses(
        (status = 200, description = "Incidents for the entrega", body = ApiResponse<Vec<NovedadResponse>>)
    ),
    tag = "entregas"
)]
pub async fn novedades_de_entrega(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<NovedadResponse>> {
    let novedades = state.services.novedades.list_por_entrega(id).await?;
    Ok(Json(ApiResponse::success(novedades)))
}
