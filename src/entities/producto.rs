use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stock record for a sellable product.
///
/// `disponible` is physical on-hand stock; `reservado` is the sum of active
/// holds against it. Allocatable stock is the difference, and every reserve
/// or consume must keep it non-negative. `version` guards concurrent writers
/// with an optimistic check on every stock mutation.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "productos")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub sku: String,
    pub nombre: String,
    pub disponible: i32,
    pub reservado: i32,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::reserva::Entity")]
    Reservas,
}

impl Related<super::reserva::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reservas.def()
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        let now = Utc::now();

        if insert {
            if let ActiveValue::NotSet = active_model.id {
                active_model.id = Set(Uuid::new_v4());
            }
            active_model.created_at = Set(now);
        }

        active_model.updated_at = Set(Some(now));

        Ok(active_model)
    }
}

impl Model {
    /// Stock still allocatable to new reservations.
    pub fn asignable(&self) -> i32 {
        self.disponible - self.reservado
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asignable_subtracts_active_holds() {
        let now = Utc::now();
        let producto = Model {
            id: Uuid::new_v4(),
            sku: "SKU-001".into(),
            nombre: "Aceite 1L".into(),
            disponible: 10,
            reservado: 4,
            version: 1,
            created_at: now,
            updated_at: None,
        };
        assert_eq!(producto.asignable(), 6);
    }
}
