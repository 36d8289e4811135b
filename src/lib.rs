//! Distribuidora API Library
//!
//! Core functionality for the distribution-company backend: proforma stock
//! reservations with expiry, conversion into sales, deliveries, routes and
//! incident tracking.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod openapi;
pub mod services;

use axum::{
    extract::State,
    response::Json,
    routing::{get, post, put},
    Router,
};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use utoipa::ToSchema;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
}

// Common query parameters for list endpoints
#[derive(Debug, Deserialize, ToSchema)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

fn default_page() -> u64 {
    1
}
fn default_limit() -> u64 {
    20
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub errors: Option<Value>,
}

#[derive(Serialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            errors: None,
        }
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

// Versioned API routes
pub fn api_v1_routes() -> Router<AppState> {
    let productos = Router::new()
        .route(
            "/productos",
            get(handlers::productos::list_productos).post(handlers::productos::create_producto),
        )
        .route("/productos/:id", get(handlers::productos::get_producto));

    let proformas = Router::new()
        .route(
            "/proformas",
            get(handlers::proformas::list_proformas).post(handlers::proformas::create_proforma),
        )
        .route("/proformas/:id", get(handlers::proformas::get_proforma))
        .route(
            "/proformas/:id/convertir",
            post(handlers::proformas::convertir_proforma),
        )
        .route(
            "/proformas/:id/renovar-reservas",
            post(handlers::proformas::renovar_reservas),
        );

    let ventas = Router::new()
        .route("/ventas", get(handlers::ventas::list_ventas))
        .route("/ventas/:id", get(handlers::ventas::get_venta))
        .route("/ventas/:id/entregas", post(handlers::ventas::create_entrega));

    let reservas = Router::new()
        .route("/reservas", get(handlers::reservas::list_reservas))
        .route("/reservas/stats", get(handlers::reservas::reserva_stats))
        .route(
            "/reservas/liberar-expiradas",
            post(handlers::reservas::liberar_expiradas),
        );

    let entregas = Router::new()
        .route("/entregas", get(handlers::entregas::list_entregas))
        .route("/entregas/:id", get(handlers::entregas::get_entrega))
        .route(
            "/entregas/:id/asignar",
            post(handlers::entregas::asignar_entrega),
        )
        .route(
            "/entregas/:id/estado",
            put(handlers::entregas::cambiar_estado),
        )
        .route(
            "/entregas/:id/ubicaciones",
            get(handlers::entregas::ubicaciones).post(handlers::entregas::registrar_ubicacion),
        )
        .route(
            "/entregas/:id/novedades",
            get(handlers::entregas::novedades_de_entrega)
                .post(handlers::entregas::reportar_novedad),
        );

    let novedades = Router::new()
        .route("/novedades", get(handlers::novedades::list_novedades))
        .route(
            "/novedades/:id/estado",
            put(handlers::novedades::cambiar_estado),
        );

    let rutas = Router::new()
        .route(
            "/rutas",
            get(handlers::rutas::list_rutas).post(handlers::rutas::create_ruta),
        )
        .route("/rutas/:id", get(handlers::rutas::get_ruta));

    Router::new()
        // Status and health endpoints
        .route("/status", get(api_status))
        .route("/health", get(health_check))
        .merge(productos)
        .merge(proformas)
        .merge(ventas)
        .merge(reservas)
        .merge(entregas)
        .merge(novedades)
        .merge(rutas)
}

async fn api_status() -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let version = env!("CARGO_PKG_VERSION");
    let status_data = json!({
        "status": "ok",
        "version": version,
        "service": "distribuidora-api",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "environment": std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
    });

    Ok(Json(ApiResponse::success(status_data)))
}

async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let db_status = match state.db.ping().await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    let health_data = json!({
        "status": db_status,
        "checks": {
            "database": db_status,
        },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(health_data)))
}

#[cfg(test)]
mod response_tests {
    use super::*;

    #[test]
    fn success_response_wraps_data() {
        let response = ApiResponse::success("ok");
        assert!(response.success);
        assert_eq!(response.data, Some("ok"));
        assert!(response.message.is_none());
    }

    #[test]
    fn error_response_carries_message() {
        let response = ApiResponse::<()>::error("oops".into());
        assert!(!response.success);
        assert!(response.data.is_none());
        assert_eq!(response.message.as_deref(), Some("oops"));
    }

    #[test]
    fn success_envelope_serializes_with_success_flag() {
        let body = serde_json::to_value(ApiResponse::success(json!({"x": 1}))).unwrap();
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["data"]["x"], json!(1));
    }
}
