//! Delivery lifecycle against a real (SQLite) database: assignment, the
//! status state machine, terminal-state finality, GPS trail and incidents.

mod common;

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use rust_decimal_macros::dec;
use uuid::Uuid;

use distribuidora_api::errors::ServiceError;
use distribuidora_api::services::entregas::{
    AsignarEntregaRequest, CambiarEstadoRequest, CreateEntregaRequest, EntregaSummary,
    RegistrarUbicacionRequest,
};
use distribuidora_api::services::novedades::{CambiarEstadoNovedadRequest, ReportarNovedadRequest};

async fn seed_venta(ctx: &common::TestContext, numero: &str) -> Uuid {
    let producto_id = common::seed_producto(ctx, &format!("SKU-{}", numero), 50).await;
    let detail = common::crear_proforma(ctx, numero, producto_id, 2, dec!(10.00)).await;
    ctx.services
        .proformas
        .convertir_a_venta(detail.proforma.id)
        .await
        .expect("conversion")
        .id
}

async fn seed_entrega(ctx: &common::TestContext, numero: &str) -> EntregaSummary {
    let venta_id = seed_venta(ctx, numero).await;
    ctx.services
        .entregas
        .create_for_venta(
            venta_id,
            CreateEntregaRequest {
                fecha_programada: Utc::now() + Duration::days(1),
            },
        )
        .await
        .expect("create entrega")
}

async fn avanzar(ctx: &common::TestContext, entrega_id: Uuid, estado: &str) -> EntregaSummary {
    ctx.services
        .entregas
        .cambiar_estado(
            entrega_id,
            CambiarEstadoRequest {
                estado: estado.to_string(),
                motivo: None,
            },
        )
        .await
        .unwrap_or_else(|e| panic!("transition to {} failed: {}", estado, e))
}

#[tokio::test]
async fn happy_path_reaches_entregado_and_becomes_final() {
    let ctx = common::setup().await;
    let entrega = seed_entrega(&ctx, "P-1001").await;
    assert_eq!(entrega.estado, "programado");

    let asignada = ctx
        .services
        .entregas
        .asignar(
            entrega.id,
            AsignarEntregaRequest {
                conductor_id: Uuid::new_v4(),
                vehiculo_id: Uuid::new_v4(),
            },
        )
        .await
        .expect("asignar");
    assert_eq!(asignada.estado, "asignada");
    assert!(asignada.conductor_id.is_some());
    assert!(asignada.vehiculo_id.is_some());

    avanzar(&ctx, entrega.id, "preparacion_carga").await;
    avanzar(&ctx, entrega.id, "en_carga").await;
    avanzar(&ctx, entrega.id, "listo_para_entrega").await;

    let en_transito = avanzar(&ctx, entrega.id, "en_transito").await;
    assert!(en_transito.iniciada_at.is_some());

    // GPS pings only while under way.
    ctx.services
        .entregas
        .registrar_ubicacion(
            entrega.id,
            RegistrarUbicacionRequest {
                latitud: -0.1807,
                longitud: -78.4678,
            },
        )
        .await
        .expect("ubicacion");

    let entregado = avanzar(&ctx, entrega.id, "entregado").await;
    assert!(entregado.completada_at.is_some());

    // Terminal: every further transition is refused without mutation.
    for intento in ["en_transito", "cancelada", "programado"] {
        let err = ctx
            .services
            .entregas
            .cambiar_estado(
                entrega.id,
                CambiarEstadoRequest {
                    estado: intento.to_string(),
                    motivo: None,
                },
            )
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::TransicionInvalida { .. });
    }

    let actual = ctx
        .services
        .entregas
        .get_entrega(entrega.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(actual.estado, "entregado");

    // No pings after a terminal state either.
    let err = ctx
        .services
        .entregas
        .registrar_ubicacion(
            entrega.id,
            RegistrarUbicacionRequest {
                latitud: 0.0,
                longitud: 0.0,
            },
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidOperation(_));

    let pings = ctx.services.entregas.ubicaciones(entrega.id).await.unwrap();
    assert_eq!(pings.len(), 1);
}

#[tokio::test]
async fn skipping_states_is_rejected_without_mutation() {
    let ctx = common::setup().await;
    let entrega = seed_entrega(&ctx, "P-1002").await;

    let err = ctx
        .services
        .entregas
        .cambiar_estado(
            entrega.id,
            CambiarEstadoRequest {
                estado: "en_transito".to_string(),
                motivo: None,
            },
        )
        .await
        .unwrap_err();
    assert_matches!(
        err,
        ServiceError::TransicionInvalida { ref de, ref a }
            if de == "programado" && a == "en_transito"
    );

    let actual = ctx
        .services
        .entregas
        .get_entrega(entrega.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(actual.estado, "programado");
}

#[tokio::test]
async fn rejection_requires_a_motivo() {
    let ctx = common::setup().await;
    let entrega = seed_entrega(&ctx, "P-1003").await;
    ctx.services
        .entregas
        .asignar(
            entrega.id,
            AsignarEntregaRequest {
                conductor_id: Uuid::new_v4(),
                vehiculo_id: Uuid::new_v4(),
            },
        )
        .await
        .unwrap();

    let err = ctx
        .services
        .entregas
        .cambiar_estado(
            entrega.id,
            CambiarEstadoRequest {
                estado: "rechazado".to_string(),
                motivo: None,
            },
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));

    let rechazada = ctx
        .services
        .entregas
        .cambiar_estado(
            entrega.id,
            CambiarEstadoRequest {
                estado: "rechazado".to_string(),
                motivo: Some("Cliente ausente".to_string()),
            },
        )
        .await
        .expect("rechazo con motivo");
    assert_eq!(rechazada.estado, "rechazado");
    assert_eq!(rechazada.motivo_rechazo.as_deref(), Some("Cliente ausente"));
    assert!(rechazada.completada_at.is_some());
}

#[tokio::test]
async fn legacy_synonyms_are_accepted_on_write_and_filter() {
    let ctx = common::setup().await;
    let entrega = seed_entrega(&ctx, "P-1004").await;
    ctx.services
        .entregas
        .asignar(
            entrega.id,
            AsignarEntregaRequest {
                conductor_id: Uuid::new_v4(),
                vehiculo_id: Uuid::new_v4(),
            },
        )
        .await
        .unwrap();
    avanzar(&ctx, entrega.id, "preparacion_carga").await;
    avanzar(&ctx, entrega.id, "en_carga").await;
    avanzar(&ctx, entrega.id, "listo_para_entrega").await;

    // Legacy "en_camino" normalizes to the canonical en_transito.
    let en_transito = avanzar(&ctx, entrega.id, "en_camino").await;
    assert_eq!(en_transito.estado, "en_transito");

    // Legacy "llego" normalizes to entregado.
    let entregado = avanzar(&ctx, entrega.id, "llego").await;
    assert_eq!(entregado.estado, "entregado");

    // Filtering by the legacy alias finds the canonical rows.
    let (items, total) = ctx
        .services
        .entregas
        .list_entregas(1, 20, Some("llego"))
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(items[0].estado, "entregado");
}

#[tokio::test]
async fn incidents_flag_the_delivery_and_resolve_forward_only() {
    let ctx = common::setup().await;
    let entrega = seed_entrega(&ctx, "P-1005").await;
    ctx.services
        .entregas
        .asignar(
            entrega.id,
            AsignarEntregaRequest {
                conductor_id: Uuid::new_v4(),
                vehiculo_id: Uuid::new_v4(),
            },
        )
        .await
        .unwrap();
    avanzar(&ctx, entrega.id, "preparacion_carga").await;
    avanzar(&ctx, entrega.id, "en_carga").await;
    avanzar(&ctx, entrega.id, "listo_para_entrega").await;
    avanzar(&ctx, entrega.id, "en_transito").await;

    let novedad = ctx
        .services
        .novedades
        .reportar(
            entrega.id,
            ReportarNovedadRequest {
                tipo: "daño".to_string(),
                descripcion: "Caja aplastada en el reparto".to_string(),
                reportado_por: "conductor-7".to_string(),
                foto_url: None,
            },
        )
        .await
        .expect("reportar novedad");

    assert_eq!(novedad.tipo, "danio");
    assert_eq!(novedad.estado, "abierta");

    // The delivery is flagged but not terminal.
    let flagged = ctx
        .services
        .entregas
        .get_entrega(entrega.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(flagged.estado, "novedad");

    // Forward-only resolution; skipping a step is refused.
    let err = ctx
        .services
        .novedades
        .cambiar_estado(
            novedad.id,
            CambiarEstadoNovedadRequest {
                estado: "resuelta".to_string(),
            },
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::TransicionInvalida { .. });

    ctx.services
        .novedades
        .cambiar_estado(
            novedad.id,
            CambiarEstadoNovedadRequest {
                estado: "en_proceso".to_string(),
            },
        )
        .await
        .unwrap();
    let resuelta = ctx
        .services
        .novedades
        .cambiar_estado(
            novedad.id,
            CambiarEstadoNovedadRequest {
                estado: "resuelta".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(resuelta.estado, "resuelta");

    // The flagged delivery still resolves to a terminal state.
    let entregado = avanzar(&ctx, entrega.id, "entregado").await;
    assert_eq!(entregado.estado, "entregado");
}

#[tokio::test]
async fn incidents_outside_transit_are_refused() {
    let ctx = common::setup().await;
    let entrega = seed_entrega(&ctx, "P-1006").await;

    let err = ctx
        .services
        .novedades
        .reportar(
            entrega.id,
            ReportarNovedadRequest {
                tipo: "falta".to_string(),
                descripcion: "Faltan dos cajas".to_string(),
                reportado_por: "bodeguero-2".to_string(),
                foto_url: None,
            },
        )
        .await
        .unwrap_err();

    assert_matches!(
        err,
        ServiceError::NovedadFueraDeTransito { estado, .. } if estado == "programado"
    );

    let novedades = ctx
        .services
        .novedades
        .list_por_entrega(entrega.id)
        .await
        .unwrap();
    assert!(novedades.is_empty());
}
