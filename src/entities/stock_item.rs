use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A catalog item. `quantity` is the current on-hand count and is written
/// only by the movement engine; catalog edits never touch it.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub sku: String,
    pub unit: String,
    pub quantity: i32,
    pub low_stock_threshold: i32,
    pub urgent_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    /// Low-stock classification is inclusive: an item sitting exactly at its
    /// threshold already needs reordering.
    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.low_stock_threshold
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(quantity: i32, threshold: i32) -> Model {
        Model {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            name: "Gold Bar".to_string(),
            sku: "SKU-TEST001".to_string(),
            unit: "Pcs".to_string(),
            quantity,
            low_stock_threshold: threshold,
            urgent_note: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn low_stock_boundary_is_inclusive() {
        assert!(item(10, 10).is_low_stock());
        assert!(!item(11, 10).is_low_stock());
    }

    #[test]
    fn zero_threshold_is_low_only_when_empty() {
        assert!(item(0, 0).is_low_stock());
        assert!(!item(1, 0).is_low_stock());
    }
}
