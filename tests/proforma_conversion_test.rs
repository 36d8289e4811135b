//! End-to-end coverage of the reservation ledger and the guarded
//! proforma-to-sale conversion, against a real (SQLite) database.

mod common;

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set};

use distribuidora_api::entities::{producto, proforma, reserva};
use distribuidora_api::errors::ServiceError;

async fn backdate_reservas(ctx: &common::TestContext, proforma_id: uuid::Uuid, days: i64) {
    let reservas = reserva::Entity::find()
        .filter(reserva::Column::ProformaId.eq(proforma_id))
        .all(&*ctx.db)
        .await
        .unwrap();

    for r in reservas {
        let mut active: reserva::ActiveModel = r.into();
        active.expires_at = Set(Utc::now() - Duration::days(days));
        active.update(&*ctx.db).await.unwrap();
    }
}

async fn fetch_producto(ctx: &common::TestContext, id: uuid::Uuid) -> producto::Model {
    producto::Entity::find_by_id(id)
        .one(&*ctx.db)
        .await
        .unwrap()
        .unwrap()
}

#[tokio::test]
async fn creating_a_proforma_holds_stock_per_line() {
    let ctx = common::setup().await;
    let producto_id = common::seed_producto(&ctx, "ACE-1L", 10).await;

    let detail = common::crear_proforma(&ctx, "P-0001", producto_id, 4, dec!(25.50)).await;

    assert_eq!(detail.proforma.estado, "pendiente");
    assert_eq!(detail.proforma.total, dec!(102.00));
    assert_eq!(detail.reservas.len(), 1);
    assert_eq!(detail.reservas[0].estado, "activa");
    assert_eq!(detail.reservas[0].cantidad, 4);

    let p = fetch_producto(&ctx, producto_id).await;
    assert_eq!(p.disponible, 10);
    assert_eq!(p.reservado, 4);
}

#[tokio::test]
async fn converting_consumes_holds_and_decrements_stock_once() {
    let ctx = common::setup().await;
    let producto_id = common::seed_producto(&ctx, "ARR-5K", 10).await;
    let detail = common::crear_proforma(&ctx, "P-0002", producto_id, 4, dec!(25.50)).await;

    let venta = ctx
        .services
        .proformas
        .convertir_a_venta(detail.proforma.id)
        .await
        .expect("conversion should succeed");

    assert_eq!(venta.numero, "V-P-0002");
    assert_eq!(venta.total, dec!(102.00));
    assert_eq!(venta.estado, "confirmada");

    let p = fetch_producto(&ctx, producto_id).await;
    assert_eq!(p.disponible, 6);
    assert_eq!(p.reservado, 0);

    let reservas = ctx
        .services
        .reservas
        .list_por_proforma(detail.proforma.id)
        .await
        .unwrap();
    assert!(reservas.iter().all(|r| r.estado == "consumida"));

    let proforma_row = proforma::Entity::find_by_id(detail.proforma.id)
        .one(&*ctx.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(proforma_row.estado, "convertida");

    // A converted proforma cannot convert again.
    let err = ctx
        .services
        .proformas
        .convertir_a_venta(detail.proforma.id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidOperation(_));
}

#[tokio::test]
async fn conversion_with_lapsed_hold_fails_and_mutates_nothing() {
    let ctx = common::setup().await;
    let producto_id = common::seed_producto(&ctx, "LEC-1L", 10).await;
    let detail = common::crear_proforma(&ctx, "P-0003", producto_id, 5, dec!(10.00)).await;

    // Four days later: past the 3-day window, sweep not yet run.
    backdate_reservas(&ctx, detail.proforma.id, 1).await;

    let err = ctx
        .services
        .proformas
        .convertir_a_venta(detail.proforma.id)
        .await
        .unwrap_err();

    assert_matches!(
        err,
        ServiceError::ReservasExpiradas {
            proforma_id,
            reservas_expiradas: 1,
        } if proforma_id == detail.proforma.id
    );

    // All-or-nothing: stock and holds untouched.
    let p = fetch_producto(&ctx, producto_id).await;
    assert_eq!(p.disponible, 10);
    assert_eq!(p.reservado, 5);

    let reservas = ctx
        .services
        .reservas
        .list_por_proforma(detail.proforma.id)
        .await
        .unwrap();
    assert!(reservas.iter().all(|r| r.estado == "activa"));
}

#[tokio::test]
async fn renewing_grants_a_fresh_window_and_unblocks_conversion() {
    let ctx = common::setup().await;
    let producto_id = common::seed_producto(&ctx, "AZU-1K", 10).await;
    let detail = common::crear_proforma(&ctx, "P-0004", producto_id, 5, dec!(8.00)).await;

    backdate_reservas(&ctx, detail.proforma.id, 1).await;

    let antes = Utc::now();
    let result = ctx
        .services
        .reservas
        .renovar_reservas(detail.proforma.id)
        .await
        .expect("renewal should succeed");

    assert_eq!(result.renovadas, 1);
    // Fresh 7-day window from the renewal instant, not from the old expiry.
    assert!(result.nuevo_vencimiento >= antes + Duration::days(7) - Duration::seconds(5));
    assert!(result.nuevo_vencimiento <= Utc::now() + Duration::days(7));

    let reservas = ctx
        .services
        .reservas
        .list_por_proforma(detail.proforma.id)
        .await
        .unwrap();
    assert_eq!(reservas[0].renovaciones, 1);
    assert!(reservas[0].expires_at > Utc::now() + Duration::days(6));

    let venta = ctx
        .services
        .proformas
        .convertir_a_venta(detail.proforma.id)
        .await
        .expect("conversion after renewal should succeed");
    assert_eq!(venta.total, dec!(40.00));

    let p = fetch_producto(&ctx, producto_id).await;
    assert_eq!(p.disponible, 5);
    assert_eq!(p.reservado, 0);
}

#[tokio::test]
async fn active_holds_block_overselling_across_proformas() {
    let ctx = common::setup().await;
    let producto_id = common::seed_producto(&ctx, "HAR-1K", 10).await;

    common::crear_proforma(&ctx, "P-0005", producto_id, 5, dec!(5.00)).await;
    common::crear_proforma(&ctx, "P-0006", producto_id, 5, dec!(5.00)).await;

    // All allocatable stock is held; one more unit must be refused.
    let err = ctx
        .services
        .proformas
        .create_proforma(
            distribuidora_api::services::proformas::CreateProformaRequest {
                numero: "P-0007".to_string(),
                cliente_id: uuid::Uuid::new_v4(),
                lineas: vec![
                    distribuidora_api::services::proformas::LineaProformaRequest {
                        producto_id,
                        cantidad: 1,
                        precio_unitario: dec!(5.00),
                    },
                ],
            },
        )
        .await
        .unwrap_err();

    assert_matches!(
        err,
        ServiceError::StockInsuficiente {
            disponible: 0,
            solicitado: 1,
            ..
        }
    );

    // The rejected proforma rolled back entirely.
    let total = proforma::Entity::find().count(&*ctx.db).await.unwrap();
    assert_eq!(total, 2);
}

#[tokio::test]
async fn sweep_lapses_expired_holds_and_returns_stock() {
    let ctx = common::setup().await;
    let producto_id = common::seed_producto(&ctx, "SAL-500", 10).await;
    let detail = common::crear_proforma(&ctx, "P-0008", producto_id, 3, dec!(2.50)).await;

    backdate_reservas(&ctx, detail.proforma.id, 2).await;

    let result = ctx
        .services
        .reservas
        .liberar_expiradas()
        .await
        .expect("sweep should succeed");
    assert_eq!(result.liberadas, 1);

    let reservas = ctx
        .services
        .reservas
        .list_por_proforma(detail.proforma.id)
        .await
        .unwrap();
    assert_eq!(reservas[0].estado, "liberada");

    let p = fetch_producto(&ctx, producto_id).await;
    assert_eq!(p.disponible, 10);
    assert_eq!(p.reservado, 0);

    // A second pass finds nothing left to lapse.
    let again = ctx.services.reservas.liberar_expiradas().await.unwrap();
    assert_eq!(again.liberadas, 0);
}

#[tokio::test]
async fn reviving_a_lapsed_hold_rechecks_stock_availability() {
    let ctx = common::setup().await;
    let producto_id = common::seed_producto(&ctx, "CAF-250", 10).await;
    let detail = common::crear_proforma(&ctx, "P-0009", producto_id, 3, dec!(12.00)).await;

    // Lapse the hold and give its stock back.
    backdate_reservas(&ctx, detail.proforma.id, 2).await;
    ctx.services.reservas.liberar_expiradas().await.unwrap();

    // Another quote takes most of the freed stock in the meantime.
    common::crear_proforma(&ctx, "P-0010", producto_id, 8, dec!(12.00)).await;

    // Reviving the 3-unit hold no longer fits (only 2 allocatable).
    let err = ctx
        .services
        .reservas
        .renovar_reservas(detail.proforma.id)
        .await
        .unwrap_err();
    assert_matches!(
        err,
        ServiceError::StockInsuficiente {
            disponible: 2,
            solicitado: 3,
            ..
        }
    );

    // The failed renewal left the hold lapsed and stock untouched.
    let reservas = ctx
        .services
        .reservas
        .list_por_proforma(detail.proforma.id)
        .await
        .unwrap();
    assert_eq!(reservas[0].estado, "liberada");

    let p = fetch_producto(&ctx, producto_id).await;
    assert_eq!(p.reservado, 8);
}

#[tokio::test]
async fn renewals_beyond_the_cap_are_refused() {
    let ctx = common::setup().await;
    let producto_id = common::seed_producto(&ctx, "TE-100", 10).await;
    let detail = common::crear_proforma(&ctx, "P-0011", producto_id, 2, dec!(3.00)).await;

    for _ in 0..3 {
        ctx.services
            .reservas
            .renovar_reservas(detail.proforma.id)
            .await
            .expect("renewal under the cap");
    }

    let err = ctx
        .services
        .reservas
        .renovar_reservas(detail.proforma.id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::RenovacionesAgotadas { renovaciones: 3, .. });
}

#[tokio::test]
async fn multi_line_conversion_consumes_every_hold() {
    let ctx = common::setup().await;
    let aceite = common::seed_producto(&ctx, "ACE-3L", 10).await;
    let arroz = common::seed_producto(&ctx, "ARR-1K", 20).await;

    let detail = ctx
        .services
        .proformas
        .create_proforma(
            distribuidora_api::services::proformas::CreateProformaRequest {
                numero: "P-0013".to_string(),
                cliente_id: uuid::Uuid::new_v4(),
                lineas: vec![
                    distribuidora_api::services::proformas::LineaProformaRequest {
                        producto_id: aceite,
                        cantidad: 3,
                        precio_unitario: dec!(4.00),
                    },
                    distribuidora_api::services::proformas::LineaProformaRequest {
                        producto_id: arroz,
                        cantidad: 7,
                        precio_unitario: dec!(2.00),
                    },
                ],
            },
        )
        .await
        .expect("crear proforma");

    assert_eq!(detail.proforma.total, dec!(26.00));
    assert_eq!(detail.reservas.len(), 2);

    ctx.services
        .proformas
        .convertir_a_venta(detail.proforma.id)
        .await
        .expect("conversion");

    let reservas = ctx
        .services
        .reservas
        .list_por_proforma(detail.proforma.id)
        .await
        .unwrap();
    assert_eq!(reservas.len(), 2);
    assert!(reservas.iter().all(|r| r.estado == "consumida"));

    let p_aceite = fetch_producto(&ctx, aceite).await;
    assert_eq!((p_aceite.disponible, p_aceite.reservado), (7, 0));
    let p_arroz = fetch_producto(&ctx, arroz).await;
    assert_eq!((p_arroz.disponible, p_arroz.reservado), (13, 0));
}

#[tokio::test]
async fn proforma_detail_reports_total_and_holds() {
    let ctx = common::setup().await;
    let producto_id = common::seed_producto(&ctx, "FID-500", 20).await;

    let created = common::crear_proforma(&ctx, "P-0012", producto_id, 6, dec!(1.50)).await;

    let detail = ctx
        .services
        .proformas
        .get_proforma(created.proforma.id)
        .await
        .unwrap()
        .expect("proforma exists");

    assert_eq!(detail.proforma.total, Decimal::from(9));
    assert_eq!(detail.lineas.len(), 1);
    assert_eq!(detail.reservas.len(), 1);
    assert!(!detail.reservas[0].vencida);
}
