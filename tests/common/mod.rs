use std::sync::Arc;

use distribuidora_api as api;
use rust_decimal::Decimal;
use tokio::sync::mpsc;
use uuid::Uuid;

use api::services::proformas::{CreateProformaRequest, LineaProformaRequest, ProformaDetail};
use api::services::reservas::ExpiryPolicy;
use api::services::stock::CreateProductoRequest;

pub struct TestContext {
    pub db: Arc<api::db::DbPool>,
    pub services: api::handlers::AppServices,
}

/// Builds an isolated SQLite-backed context with migrations applied.
///
/// A single pooled connection keeps the in-memory database alive for the
/// whole test.
pub async fn setup() -> TestContext {
    let db_cfg = api::db::DbConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        min_connections: 1,
        ..Default::default()
    };

    let pool = api::db::establish_connection_with_config(&db_cfg)
        .await
        .expect("db connect");
    api::db::run_migrations(&pool).await.expect("migrations");

    let db = Arc::new(pool);

    // Drain events so senders never block.
    let (tx, mut rx) = mpsc::channel(256);
    tokio::spawn(async move { while rx.recv().await.is_some() {} });
    let event_sender = Arc::new(api::events::EventSender::new(tx));

    let services =
        api::handlers::AppServices::new(db.clone(), event_sender, ExpiryPolicy::default());

    TestContext { db, services }
}

pub async fn seed_producto(ctx: &TestContext, sku: &str, disponible: i32) -> Uuid {
    ctx.services
        .stock
        .create_producto(CreateProductoRequest {
            sku: sku.to_string(),
            nombre: format!("Producto {}", sku),
            disponible,
        })
        .await
        .expect("seed producto")
        .id
}

pub async fn crear_proforma(
    ctx: &TestContext,
    numero: &str,
    producto_id: Uuid,
    cantidad: i32,
    precio: Decimal,
) -> ProformaDetail {
    ctx.services
        .proformas
        .create_proforma(CreateProformaRequest {
            numero: numero.to_string(),
            cliente_id: Uuid::new_v4(),
            lineas: vec![LineaProformaRequest {
                producto_id,
                cantidad,
                precio_unitario: precio,
            }],
        })
        .await
        .expect("crear proforma")
}
