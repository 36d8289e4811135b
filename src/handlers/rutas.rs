use crate::{
    errors::ServiceError,
    services::rutas::{CreateRutaRequest, RutaDetail, RutaResponse},
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Deserialize, Default, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RutaListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub fecha: Option<NaiveDate>,
    pub zona: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/v1/rutas",
    request_body = CreateRutaRequest,
    responses(
        (status = 200, description = "Ruta created with ordered stops", body = ApiResponse<RutaDetail>),
        (status = 400, description = "Empty or duplicated entrega list", body = crate::errors::ErrorResponse),
        (status = 422, description = "An entrega already belongs to a ruta", body = crate::errors::ErrorResponse)
    ),
    tag = "rutas"
)]
pub async fn create_ruta(
    State(state): State<AppState>,
    Json(payload): Json<CreateRutaRequest>,
) -> ApiResult<RutaDetail> {
    let detail = state.services.rutas.crear_ruta(payload).await?;
    Ok(Json(ApiResponse::success(detail)))
}

#[utoipa::path(
    get,
    path = "/api/v1/rutas",
    params(RutaListQuery),
    responses(
        (status = 200, description = "Rutas listed", body = ApiResponse<PaginatedResponse<RutaResponse>>)
    ),
    tag = "rutas"
)]
pub async fn list_rutas(
    State(state): State<AppState>,
    Query(query): Query<RutaListQuery>,
) -> ApiResult<PaginatedResponse<RutaResponse>> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).clamp(1, 100);

    let (items, total) = state
        .services
        .rutas
        .list_rutas(page, limit, query.fecha, query.zona.as_deref())
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
    path = "/api/v1/rutas/:id",
    params(
        ("id" = Uuid, Path, description = "Ruta ID")
    ),
    responses(
        (status = 200, description = "Ruta fetched with ordered stops", body = ApiResponse<RutaDetail>),
        (status = 404, description = "Ruta not found", body = crate::errors::ErrorResponse)
    ),
    tag = "rutas"
)]
pub async fn get_ruta(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<RutaDetail> {
    match state.services.rutas.get_ruta(id).await? {
        Some(detail) => Ok(Json(ApiResponse::success(detail))),
        None => Err(ServiceError::NotFound(format!("Ruta {} not found", id))),
    }
}
