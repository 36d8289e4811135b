//! Route building against a real (SQLite) database: ordered stops, input
//! validation before persistence, and stop snapshots tracking delivery
//! status.

mod common;

use assert_matches::assert_matches;
use chrono::{Duration, NaiveDate, Utc};
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use uuid::Uuid;

use distribuidora_api::entities::{ruta, ruta_parada};
use distribuidora_api::errors::ServiceError;
use distribuidora_api::services::entregas::{AsignarEntregaRequest, CreateEntregaRequest};
use distribuidora_api::services::rutas::CreateRutaRequest;

async fn seed_entrega(ctx: &common::TestContext, numero: &str) -> Uuid {
    let producto_id = common::seed_producto(ctx, &format!("SKU-{}", numero), 50).await;
    let detail = common::crear_proforma(ctx, numero, producto_id, 1, dec!(10.00)).await;
    let venta = ctx
        .services
        .proformas
        .convertir_a_venta(detail.proforma.id)
        .await
        .expect("conversion");

    ctx.services
        .entregas
        .create_for_venta(
            venta.id,
            CreateEntregaRequest {
                fecha_programada: Utc::now() + Duration::days(1),
            },
        )
        .await
        .expect("create entrega")
        .id
}

fn fecha() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
}

#[tokio::test]
async fn stops_keep_the_supplied_order() {
    let ctx = common::setup().await;
    let e1 = seed_entrega(&ctx, "P-2001").await;
    let e2 = seed_entrega(&ctx, "P-2002").await;
    let e3 = seed_entrega(&ctx, "P-2003").await;

    let detail = ctx
        .services
        .rutas
        .crear_ruta(CreateRutaRequest {
            zona: "Norte".to_string(),
            fecha: fecha(),
            entrega_ids: vec![e2, e3, e1],
            conductor_id: Some(Uuid::new_v4()),
            vehiculo_id: Some(Uuid::new_v4()),
        })
        .await
        .expect("crear ruta");

    assert_eq!(detail.ruta.estado, "planificada");
    assert_eq!(detail.paradas.len(), 3);

    let ordenadas: Vec<(i32, Uuid)> = detail
        .paradas
        .iter()
        .map(|p| (p.posicion_orden, p.entrega_id))
        .collect();
    assert_eq!(ordenadas, vec![(1, e2), (2, e3), (3, e1)]);
}

#[tokio::test]
async fn empty_delivery_list_fails_before_persistence() {
    let ctx = common::setup().await;

    let err = ctx
        .services
        .rutas
        .crear_ruta(CreateRutaRequest {
            zona: "Sur".to_string(),
            fecha: fecha(),
            entrega_ids: vec![],
            conductor_id: None,
            vehiculo_id: None,
        })
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));

    // No row was written.
    let total = ruta::Entity::find().count(&*ctx.db).await.unwrap();
    assert_eq!(total, 0);
}

#[tokio::test]
async fn a_delivery_joins_at_most_one_route() {
    let ctx = common::setup().await;
    let e1 = seed_entrega(&ctx, "P-2004").await;

    let primera = ctx
        .services
        .rutas
        .crear_ruta(CreateRutaRequest {
            zona: "Centro".to_string(),
            fecha: fecha(),
            entrega_ids: vec![e1],
            conductor_id: None,
            vehiculo_id: None,
        })
        .await
        .expect("primera ruta");

    let err = ctx
        .services
        .rutas
        .crear_ruta(CreateRutaRequest {
            zona: "Centro".to_string(),
            fecha: fecha(),
            entrega_ids: vec![e1],
            conductor_id: None,
            vehiculo_id: None,
        })
        .await
        .unwrap_err();

    assert_matches!(
        err,
        ServiceError::EntregaYaEnRuta { entrega_id, ruta_id }
            if entrega_id == e1 && ruta_id == primera.ruta.id
    );
}

#[tokio::test]
async fn unknown_delivery_aborts_route_creation() {
    let ctx = common::setup().await;
    let e1 = seed_entrega(&ctx, "P-2005").await;

    let err = ctx
        .services
        .rutas
        .crear_ruta(CreateRutaRequest {
            zona: "Valle".to_string(),
            fecha: fecha(),
            entrega_ids: vec![e1, Uuid::new_v4()],
            conductor_id: None,
            vehiculo_id: None,
        })
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));

    // The partial stop list rolled back with the route.
    let paradas = ruta_parada::Entity::find().count(&*ctx.db).await.unwrap();
    assert_eq!(paradas, 0);
}

#[tokio::test]
async fn stop_snapshot_follows_delivery_status() {
    let ctx = common::setup().await;
    let e1 = seed_entrega(&ctx, "P-2006").await;

    ctx.services
        .rutas
        .crear_ruta(CreateRutaRequest {
            zona: "Norte".to_string(),
            fecha: fecha(),
            entrega_ids: vec![e1],
            conductor_id: None,
            vehiculo_id: None,
        })
        .await
        .expect("crear ruta");

    let snapshot = ruta_parada::Entity::find()
        .filter(ruta_parada::Column::EntregaId.eq(e1))
        .one(&*ctx.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(snapshot.estado_entrega, "programado");

    ctx.services
        .entregas
        .asignar(
            e1,
            AsignarEntregaRequest {
                conductor_id: Uuid::new_v4(),
                vehiculo_id: Uuid::new_v4(),
            },
        )
        .await
        .unwrap();

    ctx.services
        .entregas
        .cambiar_estado(
            e1,
            distribuidora_api::services::entregas::CambiarEstadoRequest {
                estado: "preparacion_carga".to_string(),
                motivo: None,
            },
        )
        .await
        .unwrap();

    let snapshot = ruta_parada::Entity::find()
        .filter(ruta_parada::Column::EntregaId.eq(e1))
        .one(&*ctx.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(snapshot.estado_entrega, "preparacion_carga");
}

#[tokio::test]
async fn listing_filters_by_fecha_and_zona() {
    let ctx = common::setup().await;
    let e1 = seed_entrega(&ctx, "P-2007").await;
    let e2 = seed_entrega(&ctx, "P-2008").await;

    ctx.services
        .rutas
        .crear_ruta(CreateRutaRequest {
            zona: "Norte".to_string(),
            fecha: fecha(),
            entrega_ids: vec![e1],
            conductor_id: None,
            vehiculo_id: None,
        })
        .await
        .unwrap();
    ctx.services
        .rutas
        .crear_ruta(CreateRutaRequest {
            zona: "Sur".to_string(),
            fecha: fecha(),
            entrega_ids: vec![e2],
            conductor_id: None,
            vehiculo_id: None,
        })
        .await
        .unwrap();

    let (norte, total) = ctx
        .services
        .rutas
        .list_rutas(1, 20, Some(fecha()), Some("Norte"))
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(norte[0].zona, "Norte");

    let (todas, total) = ctx
        .services
        .rutas
        .list_rutas(1, 20, Some(fecha()), None)
        .await
        .unwrap();
    assert_eq!(total, 2);
    assert_eq!(todas.len(), 2);
}
