use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Direction of a stock movement. The quantity column always carries the
/// magnitude; the sign lives here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementType {
    In,
    Out,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::In => "in",
            MovementType::Out => "out",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "in" => Some(MovementType::In),
            "out" => Some(MovementType::Out),
            _ => None,
        }
    }
}

/// One row of the append-only movement ledger. `item_name` and `unit` are a
/// snapshot of the item at movement time, kept so history stays readable
/// after renames or deletion; they are never updated retroactively.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub owner_id: Uuid,
    /// Weak reference: no foreign key, survives item deletion.
    pub item_id: Uuid,
    pub item_name: String,
    pub unit: String,
    pub movement_type: String,
    pub quantity: i32,
    pub actor: String,
    pub date: DateTime<Utc>,
    pub notes: Option<String>,
}

impl Model {
    pub fn movement_type(&self) -> Option<MovementType> {
        MovementType::from_str(&self.movement_type)
    }

    /// Signed contribution of this row to the item's on-hand count.
    pub fn signed_quantity(&self) -> i32 {
        match self.movement_type() {
            Some(MovementType::In) => self.quantity,
            Some(MovementType::Out) => -self.quantity,
            None => 0,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    /// The ledger is append-only; corrections are compensating movements,
    /// never edits.
    async fn before_save<C: ConnectionTrait>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        if !insert {
            return Err(DbErr::Custom(
                "stock transactions are append-only and cannot be updated".to_string(),
            ));
        }
        let mut active_model = self;
        if let ActiveValue::NotSet = active_model.date {
            active_model.date = Set(Utc::now());
        }
        Ok(active_model)
    }

    async fn before_delete<C: ConnectionTrait>(self, _db: &C) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        Err(DbErr::Custom(
            "stock transactions are append-only and cannot be deleted".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movement_type_round_trips_through_storage_form() {
        assert_eq!(MovementType::from_str("in"), Some(MovementType::In));
        assert_eq!(MovementType::from_str("out"), Some(MovementType::Out));
        assert_eq!(MovementType::from_str("transfer"), None);
        assert_eq!(MovementType::In.as_str(), "in");
        assert_eq!(MovementType::Out.as_str(), "out");
    }

    #[test]
    fn signed_quantity_carries_direction() {
        let mut row = Model {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            item_id: Uuid::new_v4(),
            item_name: "Gold Bar".to_string(),
            unit: "Pcs".to_string(),
            movement_type: "in".to_string(),
            quantity: 50,
            actor: "Supplier A".to_string(),
            date: Utc::now(),
            notes: None,
        };
        assert_eq!(row.signed_quantity(), 50);
        row.movement_type = "out".to_string();
        assert_eq!(row.signed_quantity(), -50);
    }
}
