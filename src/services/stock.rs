//! Stock subsystem: product records plus the reserve / release / consume
//! primitives every reservation flow goes through.
//!
//! The three mutating primitives run on a caller-supplied connection so they
//! compose into the caller's transaction, and they guard the
//! check-then-write with an optimistic `version` filter: an UPDATE that
//! matches zero rows means another writer got there first and the whole
//! transaction should be retried.

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::entities::producto::{self, Entity as ProductoEntity};
use crate::errors::ServiceError;

/// Whether a hold of `cantidad` units fits in the allocatable stock.
pub fn puede_reservar(disponible: i32, reservado: i32, cantidad: i32) -> bool {
    cantidad > 0 && disponible - reservado >= cantidad
}

/// Places a hold of `cantidad` units on the product's allocatable stock.
pub(crate) async fn reservar_stock<C: ConnectionTrait>(
    conn: &C,
    producto_id: Uuid,
    cantidad: i32,
) -> Result<(), ServiceError> {
    if cantidad <= 0 {
        return Err(ServiceError::ValidationError(
            "La cantidad a reservar debe ser positiva".to_string(),
        ));
    }

    let producto = ProductoEntity::find_by_id(producto_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Producto {} not found", producto_id)))?;

    if !puede_reservar(producto.disponible, producto.reservado, cantidad) {
        return Err(ServiceError::StockInsuficiente {
            producto_id,
            disponible: producto.asignable(),
            solicitado: cantidad,
        });
    }

    let result = ProductoEntity::update_many()
        .col_expr(
            producto::Column::Reservado,
            Expr::col(producto::Column::Reservado).add(cantidad),
        )
        .col_expr(
            producto::Column::Version,
            Expr::col(producto::Column::Version).add(1),
        )
        .col_expr(producto::Column::UpdatedAt, Expr::value(Some(Utc::now())))
        .filter(producto::Column::Id.eq(producto_id))
        .filter(producto::Column::Version.eq(producto.version))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        return Err(ServiceError::ConcurrentModification(producto_id));
    }

    Ok(())
}

/// Returns a lapsed or cancelled hold to the allocatable pool.
pub(crate) async fn liberar_stock<C: ConnectionTrait>(
    conn: &C,
    producto_id: Uuid,
    cantidad: i32,
) -> Result<(), ServiceError> {
    let producto = ProductoEntity::find_by_id(producto_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Producto {} not found", producto_id)))?;

    let a_liberar = cantidad.min(producto.reservado);

    let result = ProductoEntity::update_many()
        .col_expr(
            producto::Column::Reservado,
            Expr::col(producto::Column::Reservado).sub(a_liberar),
        )
        .col_expr(
            producto::Column::Version,
            Expr::col(producto::Column::Version).add(1),
        )
        .col_expr(producto::Column::UpdatedAt, Expr::value(Some(Utc::now())))
        .filter(producto::Column::Id.eq(producto_id))
        .filter(producto::Column::Version.eq(producto.version))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        return Err(ServiceError::ConcurrentModification(producto_id));
    }

    Ok(())
}

/// Converts a hold into an actual stock decrement. The hold must exist:
/// consuming more than is reserved is a programming error upstream, not a
/// recoverable condition.
pub(crate) async fn consumir_stock<C: ConnectionTrait>(
    conn: &C,
    producto_id: Uuid,
    cantidad: i32,
) -> Result<(), ServiceError> {
    let producto = ProductoEntity::find_by_id(producto_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Producto {} not found", producto_id)))?;

    if producto.reservado < cantidad || producto.disponible < cantidad {
        return Err(ServiceError::InvalidOperation(format!(
            "No hay reserva suficiente para consumir {} unidades del producto {}",
            cantidad, producto_id
        )));
    }

    let result = ProductoEntity::update_many()
        .col_expr(
            producto::Column::Disponible,
            Expr::col(producto::Column::Disponible).sub(cantidad),
        )
        .col_expr(
            producto::Column::Reservado,
            Expr::col(producto::Column::Reservado).sub(cantidad),
        )
        .col_expr(
            producto::Column::Version,
            Expr::col(producto::Column::Version).add(1),
        )
        .col_expr(producto::Column::UpdatedAt, Expr::value(Some(Utc::now())))
        .filter(producto::Column::Id.eq(producto_id))
        .filter(producto::Column::Version.eq(producto.version))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        return Err(ServiceError::ConcurrentModification(producto_id));
    }

    Ok(())
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateProductoRequest {
    #[validate(length(min = 1, max = 64, message = "SKU is required"))]
    pub sku: String,
    #[validate(length(min = 1, max = 255, message = "Nombre is required"))]
    pub nombre: String,
    #[validate(range(min = 0, message = "Stock inicial cannot be negative"))]
    pub disponible: i32,
}

/// Service for managing product stock records.
#[derive(Clone)]
pub struct StockService {
    db_pool: Arc<DatabaseConnection>,
}

impl StockService {
    pub fn new(db_pool: Arc<DatabaseConnection>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self, request), fields(sku = %request.sku))]
    pub async fn create_producto(
        &self,
        request: CreateProductoRequest,
    ) -> Result<producto::Model, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let db = &*self.db_pool;

        let active = producto::ActiveModel {
            sku: Set(request.sku.clone()),
            nombre: Set(request.nombre),
            disponible: Set(request.disponible),
            reservado: Set(0),
            version: Set(1),
            ..Default::default()
        };

        let created = active.insert(db).await?;

        info!(producto_id = %created.id, sku = %created.sku, "Producto created");

        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get_producto(&self, producto_id: Uuid) -> Result<Option<producto::Model>, ServiceError> {
        let db = &*self.db_pool;
        let producto = ProductoEntity::find_by_id(producto_id).one(db).await?;
        Ok(producto)
    }

    #[instrument(skip(self))]
    pub async fn list_productos(
        &self,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<producto::Model>, u64), ServiceError> {
        let db = &*self.db_pool;

        let paginator = ProductoEntity::find()
            .order_by_asc(producto::Column::Sku)
            .paginate(db, limit);

        let total = paginator.num_items().await?;
        let productos = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((productos, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn puede_reservar_respects_allocatable_stock() {
        assert!(puede_reservar(10, 0, 10));
        assert!(puede_reservar(10, 4, 6));
        assert!(!puede_reservar(10, 4, 7));
        assert!(!puede_reservar(10, 10, 1));
        assert!(!puede_reservar(10, 0, 0));
        assert!(!puede_reservar(10, 0, -3));
    }

    /// In-memory mirror of the guarded arithmetic the primitives apply.
    #[derive(Debug, Clone, Copy)]
    struct Ledger {
        disponible: i32,
        reservado: i32,
    }

    impl Ledger {
        fn reservar(&mut self, cantidad: i32) -> bool {
            if puede_reservar(self.disponible, self.reservado, cantidad) {
                self.reservado += cantidad;
                true
            } else {
                false
            }
        }

        fn liberar(&mut self, cantidad: i32) {
            self.reservado -= cantidad.min(self.reservado);
        }

        fn consumir(&mut self, cantidad: i32) -> bool {
            if cantidad > 0 && self.reservado >= cantidad && self.disponible >= cantidad {
                self.disponible -= cantidad;
                self.reservado -= cantidad;
                true
            } else {
                false
            }
        }
    }

    #[derive(Debug, Clone)]
    enum Op {
        Reservar(i32),
        Liberar(i32),
        Consumir(i32),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (1i32..50).prop_map(Op::Reservar),
            (1i32..50).prop_map(Op::Liberar),
            (1i32..50).prop_map(Op::Consumir),
        ]
    }

    proptest! {
        // Allocatable stock never goes negative, no matter the sequence of
        // reserve / release / consume operations applied through the guards.
        #[test]
        fn allocatable_stock_never_negative(
            inicial in 0i32..200,
            ops in proptest::collection::vec(op_strategy(), 1..60),
        ) {
            let mut ledger = Ledger { disponible: inicial, reservado: 0 };

            for op in ops {
                match op {
                    Op::Reservar(q) => { ledger.reservar(q); }
                    Op::Liberar(q) => { ledger.liberar(q); }
                    Op::Consumir(q) => { ledger.consumir(q); }
                }

                prop_assert!(ledger.reservado >= 0);
                prop_assert!(ledger.disponible >= 0);
                prop_assert!(ledger.disponible - ledger.reservado >= 0);
            }
        }
    }
}
