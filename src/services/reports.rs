//! Derived views over the catalog and the movement ledger.
//!
//! Everything here is computed from a snapshot on demand and never stored,
//! so there is no second source of truth to drift from the ledger.

use crate::{
    db::DbPool,
    entities::{
        stock_item::{self, Entity as StockItem},
        stock_transaction::{self, Entity as StockTransaction, MovementType},
    },
    errors::ServiceError,
    services::movements::day_bounds,
};
use chrono::NaiveDate;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;

/// Default cut-off for the most-used ranking.
pub const DEFAULT_TOP_N: usize = 5;

/// One row of the most-used ranking. `count` is the number of stock-out
/// events, not the volume moved: "picked most often" is the metric, a
/// handful-per-day item outranks a rare bulk shipment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ItemUsage {
    pub item_name: String,
    pub unit: String,
    pub count: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DayTotals {
    pub stock_in_today: i64,
    pub stock_out_today: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AccumulationRow {
    pub name: String,
    pub unit: String,
    pub total_in: i64,
    pub total_out: i64,
    pub net_change: i64,
}

/// Everything the dashboard shows, derived in one pass.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub total_items: u64,
    pub low_stock_count: u64,
    pub totals: DayTotals,
    pub low_stock: Vec<stock_item::Model>,
    pub most_used: Vec<ItemUsage>,
}

/// Items at or below their threshold. Equality counts: an item sitting
/// exactly at its threshold is already due for reordering.
pub fn low_stock_items(items: &[stock_item::Model]) -> Vec<stock_item::Model> {
    items.iter().filter(|i| i.is_low_stock()).cloned().collect()
}

/// Ranks items by stock-out event frequency, descending. Ties keep their
/// discovery order in the input; the result is truncated to `top_n`.
pub fn most_used_items(
    transactions: &[stock_transaction::Model],
    top_n: usize,
) -> Vec<ItemUsage> {
    let mut usage: Vec<ItemUsage> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for tx in transactions {
        if tx.movement_type() != Some(MovementType::Out) {
            continue;
        }
        match index.get(tx.item_name.as_str()) {
            Some(&i) => usage[i].count += 1,
            None => {
                index.insert(tx.item_name.as_str(), usage.len());
                usage.push(ItemUsage {
                    item_name: tx.item_name.clone(),
                    unit: tx.unit.clone(),
                    count: 1,
                });
            }
        }
    }

    // Stable sort keeps discovery order among equal counts.
    usage.sort_by(|a, b| b.count.cmp(&a.count));
    usage.truncate(top_n);
    usage
}

/// Sums quantities moved on the caller's calendar day, split by direction.
pub fn today_in_out_totals(
    transactions: &[stock_transaction::Model],
    today: NaiveDate,
) -> DayTotals {
    let mut totals = DayTotals::default();
    for tx in transactions {
        if tx.date.date_naive() != today {
            continue;
        }
        match tx.movement_type() {
            Some(MovementType::In) => totals.stock_in_today += tx.quantity as i64,
            Some(MovementType::Out) => totals.stock_out_today += tx.quantity as i64,
            None => {}
        }
    }
    totals
}

/// Per-item in/out/net totals over `[from, to]` (end-of-day inclusive).
/// Every catalog item appears, zero-filled when nothing moved; matching is
/// by item id so renames within the range do not fragment a row.
pub fn accumulate(
    items: &[stock_item::Model],
    transactions: &[stock_transaction::Model],
    from: NaiveDate,
    to: NaiveDate,
) -> Vec<AccumulationRow> {
    let (start, end) = day_bounds(from, to);

    let mut by_item: HashMap<Uuid, (i64, i64)> = HashMap::new();
    for tx in transactions {
        if tx.date < start || tx.date >= end {
            continue;
        }
        let entry = by_item.entry(tx.item_id).or_default();
        match tx.movement_type() {
            Some(MovementType::In) => entry.0 += tx.quantity as i64,
            Some(MovementType::Out) => entry.1 += tx.quantity as i64,
            None => {}
        }
    }

    let mut rows: Vec<AccumulationRow> = items
        .iter()
        .map(|item| {
            let (total_in, total_out) = by_item.get(&item.id).copied().unwrap_or((0, 0));
            AccumulationRow {
                name: item.name.clone(),
                unit: item.unit.clone(),
                total_in,
                total_out,
                net_change: total_in - total_out,
            }
        })
        .collect();

    rows.sort_by(|a, b| a.name.cmp(&b.name));
    rows
}

/// Service wrapper: loads owner-scoped snapshots and applies the pure
/// derivations above.
#[derive(Clone)]
pub struct ReportService {
    db_pool: Arc<DbPool>,
}

impl ReportService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    async fn item_snapshot(&self, owner_id: Uuid) -> Result<Vec<stock_item::Model>, ServiceError> {
        StockItem::find()
            .filter(stock_item::Column::OwnerId.eq(owner_id))
            .order_by_asc(stock_item::Column::Name)
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    async fn ledger_snapshot(
        &self,
        owner_id: Uuid,
    ) -> Result<Vec<stock_transaction::Model>, ServiceError> {
        StockTransaction::find()
            .filter(stock_transaction::Column::OwnerId.eq(owner_id))
            .order_by_desc(stock_transaction::Column::Date)
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    #[instrument(skip(self))]
    pub async fn low_stock(&self, owner_id: Uuid) -> Result<Vec<stock_item::Model>, ServiceError> {
        Ok(low_stock_items(&self.item_snapshot(owner_id).await?))
    }

    #[instrument(skip(self))]
    pub async fn most_used(
        &self,
        owner_id: Uuid,
        top_n: usize,
    ) -> Result<Vec<ItemUsage>, ServiceError> {
        Ok(most_used_items(&self.ledger_snapshot(owner_id).await?, top_n))
    }

    /// Accumulation report over an inclusive date range.
    #[instrument(skip(self))]
    pub async fn accumulation(
        &self,
        owner_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AccumulationRow>, ServiceError> {
        if from > to {
            return Err(ServiceError::ValidationError(
                "date range start must not be after its end".to_string(),
            ));
        }

        let items = self.item_snapshot(owner_id).await?;

        // Range query keeps the scan proportional to the window, not the
        // full ledger; accumulate() re-checks the bounds, which is harmless.
        let (start, end) = day_bounds(from, to);
        let transactions = StockTransaction::find()
            .filter(stock_transaction::Column::OwnerId.eq(owner_id))
            .filter(stock_transaction::Column::Date.gte(start))
            .filter(stock_transaction::Column::Date.lt(end))
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        Ok(accumulate(&items, &transactions, from, to))
    }

    /// The dashboard: counts, today's totals, the low-stock list and the
    /// most-used ranking, all derived from the same pair of snapshots.
    #[instrument(skip(self))]
    pub async fn dashboard_summary(
        &self,
        owner_id: Uuid,
        today: NaiveDate,
    ) -> Result<DashboardSummary, ServiceError> {
        let items = self.item_snapshot(owner_id).await?;
        let transactions = self.ledger_snapshot(owner_id).await?;

        let low_stock = low_stock_items(&items);

        Ok(DashboardSummary {
            total_items: items.len() as u64,
            low_stock_count: low_stock.len() as u64,
            totals: today_in_out_totals(&transactions, today),
            low_stock,
            most_used: most_used_items(&transactions, DEFAULT_TOP_N),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn item(name: &str, quantity: i32, threshold: i32) -> stock_item::Model {
        stock_item::Model {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            name: name.to_string(),
            sku: format!("SKU-{}", name.to_uppercase()),
            unit: "Pcs".to_string(),
            quantity,
            low_stock_threshold: threshold,
            urgent_note: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn movement(
        item: &stock_item::Model,
        movement_type: MovementType,
        quantity: i32,
        date: chrono::DateTime<Utc>,
    ) -> stock_transaction::Model {
        stock_transaction::Model {
            id: Uuid::new_v4(),
            owner_id: item.owner_id,
            item_id: item.id,
            item_name: item.name.clone(),
            unit: item.unit.clone(),
            movement_type: movement_type.as_str().to_string(),
            quantity,
            actor: "test".to_string(),
            date,
            notes: None,
        }
    }

    fn at(y: i32, m: u32, d: u32) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn low_stock_boundary_is_inclusive() {
        let items = vec![item("A", 10, 10), item("B", 11, 10), item("C", 0, 0)];
        let low: Vec<String> = low_stock_items(&items)
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(low, vec!["A", "C"]);
    }

    #[test]
    fn most_used_counts_events_not_volume() {
        let a = item("A", 100, 0);
        let b = item("B", 100, 0);
        // B moves more volume in one event; A is picked more often.
        let txs = vec![
            movement(&a, MovementType::Out, 1, at(2025, 3, 1)),
            movement(&a, MovementType::Out, 1, at(2025, 3, 2)),
            movement(&b, MovementType::Out, 500, at(2025, 3, 3)),
            movement(&a, MovementType::In, 50, at(2025, 3, 4)),
        ];
        let ranking = most_used_items(&txs, DEFAULT_TOP_N);
        assert_eq!(ranking.len(), 2);
        assert_eq!(ranking[0].item_name, "A");
        assert_eq!(ranking[0].count, 2);
        assert_eq!(ranking[1].item_name, "B");
        assert_eq!(ranking[1].count, 1);
    }

    #[test]
    fn most_used_truncates_and_keeps_tie_order() {
        let a = item("A", 0, 0);
        let b = item("B", 0, 0);
        let c = item("C", 0, 0);
        let txs = vec![
            movement(&b, MovementType::Out, 1, at(2025, 3, 1)),
            movement(&a, MovementType::Out, 1, at(2025, 3, 2)),
            movement(&c, MovementType::Out, 1, at(2025, 3, 3)),
        ];
        let ranking = most_used_items(&txs, 2);
        // All tied at 1; discovery order wins and the list is cut to two.
        assert_eq!(ranking.len(), 2);
        assert_eq!(ranking[0].item_name, "B");
        assert_eq!(ranking[1].item_name, "A");
    }

    #[test]
    fn empty_ledger_derives_empty_results() {
        assert!(most_used_items(&[], DEFAULT_TOP_N).is_empty());
        let today = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        assert_eq!(today_in_out_totals(&[], today), DayTotals::default());
        assert!(accumulate(&[], &[], today, today).is_empty());
    }

    #[test]
    fn today_totals_partition_by_direction_and_day() {
        let a = item("A", 100, 0);
        let today = NaiveDate::from_ymd_opt(2025, 3, 2).unwrap();
        let txs = vec![
            movement(&a, MovementType::In, 50, at(2025, 3, 2)),
            movement(&a, MovementType::Out, 20, at(2025, 3, 2)),
            // Yesterday's movement must not count.
            movement(&a, MovementType::In, 999, at(2025, 3, 1)),
        ];
        let totals = today_in_out_totals(&txs, today);
        assert_eq!(totals.stock_in_today, 50);
        assert_eq!(totals.stock_out_today, 20);
    }

    #[test]
    fn accumulation_round_trip_and_disjoint_range() {
        let a = item("A", 30, 0);
        let txs = vec![
            movement(&a, MovementType::In, 50, at(2025, 3, 1)),
            movement(&a, MovementType::Out, 20, at(2025, 3, 5)),
        ];
        let items = vec![a];

        let covering = accumulate(
            &items,
            &txs,
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(),
        );
        assert_eq!(covering.len(), 1);
        assert_eq!(covering[0].total_in, 50);
        assert_eq!(covering[0].total_out, 20);
        assert_eq!(covering[0].net_change, 30);

        let disjoint = accumulate(
            &items,
            &txs,
            NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 4, 30).unwrap(),
        );
        assert_eq!(disjoint.len(), 1);
        assert_eq!(disjoint[0].total_in, 0);
        assert_eq!(disjoint[0].total_out, 0);
        assert_eq!(disjoint[0].net_change, 0);
    }

    #[test]
    fn accumulation_upper_bound_is_end_of_day_inclusive() {
        let a = item("A", 10, 0);
        let late = Utc.with_ymd_and_hms(2025, 3, 2, 23, 59, 59).unwrap();
        let txs = vec![movement(&a, MovementType::In, 10, late)];
        let items = vec![a];

        let range_end = NaiveDate::from_ymd_opt(2025, 3, 2).unwrap();
        let rows = accumulate(&items, &txs, range_end, range_end);
        assert_eq!(rows[0].total_in, 10);
    }

    #[test]
    fn accumulation_is_sorted_by_name_and_zero_fills() {
        let b = item("Bolt", 5, 0);
        let a = item("Anvil", 5, 0);
        let txs = vec![movement(&b, MovementType::In, 5, at(2025, 3, 1))];
        let items = vec![b.clone(), a];

        let day = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let rows = accumulate(&items, &txs, day, day);
        assert_eq!(rows[0].name, "Anvil");
        assert_eq!(rows[0].total_in, 0);
        assert_eq!(rows[1].name, "Bolt");
        assert_eq!(rows[1].total_in, 5);
    }
}
