use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Distribuidora API",
        version = "0.3.0",
        description = r#"
# Distribuidora API

Backend for distribution-company operations.

## Features

- **Proformas**: sales quotes that hold stock through time-bounded reservations
- **Reservas**: reservation ledger with 3-day validity, renewals and expiry sweep
- **Ventas**: guarded conversion of proformas into confirmed sales
- **Entregas**: delivery lifecycle with driver/vehicle assignment and GPS trail
- **Rutas**: ordered delivery batches per driver/vehicle/zone/date
- **Novedades**: incident reporting against in-progress deliveries

## Error Handling

Domain-rule failures return HTTP 422 with a structured body:

```json
{
  "success": false,
  "message": "La proforma tiene 2 reserva(s) expirada(s)",
  "errors": {
    "proforma_id": "...",
    "reservas_expiradas": 2,
    "accion_sugerida": "renovar_reservas",
    "endpoint_renovacion": "/api/v1/proformas/.../renovar-reservas"
  }
}
```

Input-validation failures return HTTP 400 before anything is persisted.
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "productos", description = "Product stock records"),
        (name = "proformas", description = "Quotes with stock reservations"),
        (name = "reservas", description = "Reservation ledger"),
        (name = "ventas", description = "Confirmed sales"),
        (name = "entregas", description = "Delivery lifecycle"),
        (name = "novedades", description = "Delivery incidents"),
        (name = "rutas", description = "Delivery routes")
    ),
    paths(
        // Productos
        crate::handlers::productos::list_productos,
        crate::handlers::productos::get_producto,
        crate::handlers::productos::create_producto,
        // Proformas
        crate::handlers::proformas::create_proforma,
        crate::handlers::proformas::list_proformas,
        crate::handlers::proformas::get_proforma,
        crate::handlers::proformas::convertir_proforma,
        crate::handlers::proformas::renovar_reservas,
        // Ventas
        crate::handlers::ventas::list_ventas,
        crate::handlers::ventas::get_venta,
        crate::handlers::ventas::create_entrega,
        // Reservas
        crate::handlers::reservas::list_reservas,
        crate::handlers::reservas::reserva_stats,
        crate::handlers::reservas::liberar_expiradas,
        // Entregas
        crate::handlers::entregas::list_entregas,
        crate::handlers::entregas::get_entrega,
        crate::handlers::entregas::asignar_entrega,
        crate::handlers::entregas::cambiar_estado,
        crate::handlers::entregas::registrar_ubicacion,
        crate::handlers::entregas::ubicaciones,
        crate::handlers::entregas::reportar_novedad,
        crate::handlers::entregas::novedades_de_entrega,
        // Novedades
        crate::handlers::novedades::list_novedades,
        crate::handlers::novedades::cambiar_estado,
        // Rutas
        crate::handlers::rutas::create_ruta,
        crate::handlers::rutas::list_rutas,
        crate::handlers::rutas::get_ruta,
    ),
    components(schemas(
        crate::errors::ErrorResponse,
        crate::handlers::productos::ProductoSummary,
        crate::services::stock::CreateProductoRequest,
        crate::services::proformas::CreateProformaRequest,
        crate::services::proformas::LineaProformaRequest,
        crate::services::proformas::ProformaResponse,
        crate::services::proformas::LineaResponse,
        crate::services::proformas::ProformaDetail,
        crate::services::proformas::ProformaListResponse,
        crate::services::reservas::ReservaSummary,
        crate::services::reservas::RenovacionResult,
        crate::services::reservas::SweepResult,
        crate::services::reservas::ReservaStats,
        crate::services::ventas::VentaResponse,
        crate::services::ventas::VentaListResponse,
        crate::services::entregas::CreateEntregaRequest,
        crate::services::entregas::AsignarEntregaRequest,
        crate::services::entregas::CambiarEstadoRequest,
        crate::services::entregas::RegistrarUbicacionRequest,
        crate::services::entregas::EntregaSummary,
        crate::services::entregas::UbicacionResponse,
        crate::services::novedades::ReportarNovedadRequest,
        crate::services::novedades::CambiarEstadoNovedadRequest,
        crate::services::novedades::NovedadResponse,
        crate::services::rutas::CreateRutaRequest,
        crate::services::rutas::RutaResponse,
        crate::services::rutas::ParadaResponse,
        crate::services::rutas::RutaDetail,
    ))
)]
pub struct ApiDoc;

/// Swagger UI router serving the OpenAPI document.
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi())
}
