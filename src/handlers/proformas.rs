use crate::{
    errors::ServiceError,
    services::proformas::{CreateProformaRequest, ProformaDetail, ProformaListResponse},
    services::reservas::RenovacionResult,
    services::ventas::VentaResponse,
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Default, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProformaListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Filter by estado: pendiente, convertida or anulada
    pub estado: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/v1/proformas",
    request_body = CreateProformaRequest,
    responses(
        (status = 200, description = "Proforma created with stock holds", body = ApiResponse<ProformaDetail>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock for a line", body = crate::errors::ErrorResponse)
    ),
    tag = "proformas"
)]
pub async fn create_proforma(
    State(state): State<AppState>,
    Json(payload): Json<CreateProformaRequest>,
) -> ApiResult<ProformaDetail> {
    payload
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let detail = state.services.proformas.create_proforma(payload).await?;

    Ok(Json(ApiResponse::success(detail)))
}

#[utoipa::path(
    get,
    path = "/api/v1/proformas",
    params(ProformaListQuery),
    responses(
        (status = 200, description = "Proformas listed", body = ApiResponse<ProformaListResponse>)
    ),
    tag = "proformas"
)]
pub async fn list_proformas(
    State(state): State<AppState>,
    Query(query): Query<ProformaListQuery>,
) -> ApiResult<ProformaListResponse> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).clamp(1, 100);

    let response = state
        .services
        .proformas
        .list_proformas(page, limit, query.estado.as_deref())
        .await?;

    Ok(Json(ApiResponse::success(response)))
}

#[utoipa::path(
    get,
    path = "/api/v1/proformas/:id",
    params(
        ("id" = Uuid, Path, description = "Proforma ID")
    ),
    responses(
        (status = 200, description = "Proforma fetched with lineas and reservas", body = ApiResponse<ProformaDetail>),
        (status = 404, description = "Proforma not found", body = crate::errors::ErrorResponse)
    ),
    tag = "proformas"
)]
pub async fn get_proforma(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ProformaDetail> {
    match state.services.proformas.get_proforma(id).await? {
        Some(detail) => Ok(Json(ApiResponse::success(detail))),
        None => Err(ServiceError::NotFound(format!("Proforma {} not found", id))),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/proformas/:id/convertir",
    params(
        ("id" = Uuid, Path, description = "Proforma ID")
    ),
    responses(
        (status = 200, description = "Proforma converted to venta", body = ApiResponse<VentaResponse>),
        (status = 404, description = "Proforma not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Expired reservations; renew and retry", body = crate::errors::ErrorResponse)
    ),
    tag = "proformas"
)]
pub async fn convertir_proforma(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<VentaResponse> {
    let venta = state.services.proformas.convertir_a_venta(id).await?;
    Ok(Json(ApiResponse::success(venta)))
}

#[utoipa::path(
    post,
    path = "/api/v1/proformas/:id/renovar-reservas",
    params(
        ("id" = Uuid, Path, description = "Proforma ID")
    ),
    responses(
        (status = 200, description = "Reservas renewed", body = ApiResponse<RenovacionResult>),
        (status = 404, description = "Proforma not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Renewal cap reached or stock reallocated", body = crate::errors::ErrorResponse)
    ),
    tag = "proformas"
)]
pub async fn renovar_reservas(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<RenovacionResult> {
    let result = state.services.reservas.renovar_reservas(id).await?;
    Ok(Json(ApiResponse::success(result)))
}
