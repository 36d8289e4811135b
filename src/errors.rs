use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::error::DbErr;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

/// Error body returned for domain-rule and validation failures.
///
/// Mirrors the envelope used by successful responses (`success`/`message`)
/// plus a structured `errors` map with the failure-specific payload.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "success": false,
    "message": "Stock insuficiente para el producto",
    "errors": {
        "producto_id": "550e8400-e29b-41d4-a716-446655440000",
        "disponible": 3,
        "solicitado": 5
    }
}))]
pub struct ErrorResponse {
    /// Always `false` for error responses
    pub success: bool,
    /// Human-readable error description
    pub message: String,
    /// Structured, failure-specific payload
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub errors: Option<serde_json::Value>,
}

pub trait IntoDbErr {
    fn into_db_err(self) -> DbErr;
}

impl IntoDbErr for DbErr {
    fn into_db_err(self) -> DbErr {
        self
    }
}

impl IntoDbErr for String {
    fn into_db_err(self) -> DbErr {
        DbErr::Custom(self)
    }
}

impl IntoDbErr for &str {
    fn into_db_err(self) -> DbErr {
        DbErr::Custom(self.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::error::DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Event error: {0}")]
    EventError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Concurrent modification: {0}")]
    ConcurrentModification(Uuid),

    #[error("Stock insuficiente para el producto {producto_id}: disponible {disponible}, solicitado {solicitado}")]
    StockInsuficiente {
        producto_id: Uuid,
        disponible: i32,
        solicitado: i32,
    },

    /// Renewable failure raised when converting a proforma whose
    /// reservations have lapsed. Carries remediation metadata so the caller
    /// can renew and retry instead of treating this as a hard fault.
    #[error("La proforma {proforma_id} tiene {reservas_expiradas} reserva(s) expirada(s)")]
    ReservasExpiradas {
        proforma_id: Uuid,
        reservas_expiradas: u32,
    },

    #[error("Transicion de estado invalida: {de} -> {a}")]
    TransicionInvalida { de: String, a: String },

    #[error("La reserva {reserva_id} agoto sus renovaciones ({renovaciones})")]
    RenovacionesAgotadas { reserva_id: Uuid, renovaciones: i32 },

    #[error("La entrega {entrega_id} no esta en transito (estado actual: {estado})")]
    NovedadFueraDeTransito { entrega_id: Uuid, estado: String },

    #[error("La entrega {entrega_id} ya pertenece a la ruta {ruta_id}")]
    EntregaYaEnRuta { entrega_id: Uuid, ruta_id: Uuid },

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl ServiceError {
    /// Generic constructor that normalizes any supported database error input.
    pub fn db_error<E: IntoDbErr>(error: E) -> Self {
        ServiceError::DatabaseError(error.into_db_err())
    }

    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) | Self::ConcurrentModification(_) => StatusCode::CONFLICT,
            Self::StockInsuficiente { .. }
            | Self::ReservasExpiradas { .. }
            | Self::TransicionInvalida { .. }
            | Self::RenovacionesAgotadas { .. }
            | Self::NovedadFueraDeTransito { .. }
            | Self::EntregaYaEnRuta { .. }
            | Self::InvalidOperation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::DatabaseError(_)
            | Self::EventError(_)
            | Self::InternalError(_)
            | Self::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Internal errors return generic messages to avoid leaking implementation details.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::EventError(_) | Self::InternalError(_) | Self::Other(_) => {
                "Internal server error".to_string()
            }
            Self::ConcurrentModification(id) => {
                format!("Concurrent modification for ID {}", id)
            }
            _ => self.to_string(),
        }
    }

    /// Structured payload for the `errors` field of the response body.
    /// Only domain-rule failures carry one.
    pub fn error_details(&self) -> Option<serde_json::Value> {
        match self {
            Self::StockInsuficiente {
                producto_id,
                disponible,
                solicitado,
            } => Some(json!({
                "producto_id": producto_id,
                "disponible": disponible,
                "solicitado": solicitado,
            })),
            Self::ReservasExpiradas {
                proforma_id,
                reservas_expiradas,
            } => Some(json!({
                "proforma_id": proforma_id,
                "reservas_expiradas": reservas_expiradas,
                "accion_sugerida": "renovar_reservas",
                "endpoint_renovacion": format!("/api/v1/proformas/{}/renovar-reservas", proforma_id),
            })),
            Self::TransicionInvalida { de, a } => Some(json!({
                "de": de,
                "a": a,
            })),
            Self::RenovacionesAgotadas {
                reserva_id,
                renovaciones,
            } => Some(json!({
                "reserva_id": reserva_id,
                "renovaciones": renovaciones,
            })),
            Self::NovedadFueraDeTransito { entrega_id, estado } => Some(json!({
                "entrega_id": entrega_id,
                "estado": estado,
            })),
            Self::EntregaYaEnRuta {
                entrega_id,
                ruta_id,
            } => Some(json!({
                "entrega_id": entrega_id,
                "ruta_id": ruta_id,
            })),
            _ => None,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = ErrorResponse {
            success: false,
            message: self.response_message(),
            errors: self.error_details(),
        };

        (status, Json(body)).into_response()
    }
}

// Result extension for easier error handling at service boundaries
pub trait ResultExt<T> {
    fn map_err_to_service(self) -> Result<T, ServiceError>;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: Into<ServiceError>,
{
    fn map_err_to_service(self) -> Result<T, ServiceError> {
        self.map_err(|e| e.into())
    }
}
