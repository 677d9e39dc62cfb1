use crate::{
    db::DbPool,
    entities::{
        stock_item::{self, Entity as StockItem},
        stock_transaction::{self, Entity as StockTransaction, MovementType},
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    Set, TransactionError, TransactionTrait,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{instrument, warn};
use uuid::Uuid;

/// Bounded optimistic retry on store contention before the conflict is
/// surfaced to the caller.
const MAX_TXN_ATTEMPTS: u32 = 3;
const RETRY_BACKOFF_MS: u64 = 25;

#[derive(Debug, Clone)]
pub struct RecordMovementInput {
    pub item_id: Uuid,
    pub movement_type: MovementType,
    pub quantity: i32,
    pub actor: String,
    pub notes: Option<String>,
}

/// The movement engine: applies one signed quantity change to exactly one
/// item and appends the matching ledger row, as a single atomic unit.
#[derive(Clone)]
pub struct MovementService {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
}

impl MovementService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Records a stock movement. On success both the item quantity and the
    /// ledger row are committed; on any failure neither is.
    #[instrument(skip(self, input), fields(item_id = %input.item_id, movement_type = input.movement_type.as_str(), quantity = input.quantity))]
    pub async fn record_movement(
        &self,
        owner_id: Uuid,
        input: RecordMovementInput,
    ) -> Result<stock_transaction::Model, ServiceError> {
        // Malformed input is rejected before the store is touched.
        if input.quantity <= 0 {
            return Err(ServiceError::ValidationError(
                "movement quantity must be a positive integer".to_string(),
            ));
        }
        if input.actor.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "actor must not be empty".to_string(),
            ));
        }

        let mut attempt = 1;
        let (row, previous_quantity, new_quantity) = loop {
            match self.apply_movement(owner_id, input.clone()).await {
                Err(ServiceError::ConcurrencyConflict(reason)) if attempt < MAX_TXN_ATTEMPTS => {
                    warn!(attempt, %reason, "movement hit store contention; retrying");
                    tokio::time::sleep(Duration::from_millis(RETRY_BACKOFF_MS * attempt as u64))
                        .await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
                Ok(applied) => break applied,
            }
        };

        self.emit(Event::MovementRecorded {
            owner_id,
            item_id: row.item_id,
            transaction_id: row.id,
            movement_type: row.movement_type.clone(),
            quantity: row.quantity,
            previous_quantity,
            new_quantity,
        })
        .await;

        Ok(row)
    }

    /// One attempt at the atomic read-check-write-append unit.
    async fn apply_movement(
        &self,
        owner_id: Uuid,
        input: RecordMovementInput,
    ) -> Result<(stock_transaction::Model, i32, i32), ServiceError> {
        self.db_pool
            .transaction::<_, (stock_transaction::Model, i32, i32), ServiceError>(move |txn| {
                Box::pin(async move {
                    // Re-read inside the transaction; a client-side copy of the
                    // quantity could be stale by now.
                    let item = StockItem::find_by_id(input.item_id)
                        .filter(stock_item::Column::OwnerId.eq(owner_id))
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("item {} not found", input.item_id))
                        })?;

                    let current = item.quantity;
                    let new_quantity = match input.movement_type {
                        MovementType::In => current.checked_add(input.quantity).ok_or_else(|| {
                            ServiceError::ValidationError(
                                "movement would overflow the item quantity".to_string(),
                            )
                        })?,
                        MovementType::Out => {
                            if current < input.quantity {
                                return Err(ServiceError::InsufficientStock {
                                    available: current,
                                    requested: input.quantity,
                                });
                            }
                            current - input.quantity
                        }
                    };
                    debug_assert!(new_quantity >= 0);

                    let mut active_item: stock_item::ActiveModel = item.clone().into();
                    active_item.quantity = Set(new_quantity);
                    active_item.updated_at = Set(Utc::now());
                    active_item
                        .update(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                    // Ledger row carries the item identity as read above, so
                    // history survives renames and deletion.
                    let row = stock_transaction::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        owner_id: Set(owner_id),
                        item_id: Set(item.id),
                        item_name: Set(item.name.clone()),
                        unit: Set(item.unit.clone()),
                        movement_type: Set(input.movement_type.as_str().to_string()),
                        quantity: Set(input.quantity),
                        actor: Set(input.actor.trim().to_string()),
                        date: Set(Utc::now()),
                        notes: Set(input.notes.clone().filter(|n| !n.trim().is_empty())),
                    }
                    .insert(txn)
                    .await
                    .map_err(ServiceError::db_error)?;

                    Ok((row, current, new_quantity))
                })
            })
            .await
            .map_err(unwrap_transaction_error)
    }

    /// Movement history, newest first, paginated.
    #[instrument(skip(self))]
    pub async fn list_movements(
        &self,
        owner_id: Uuid,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<stock_transaction::Model>, u64), ServiceError> {
        let paginator = StockTransaction::find()
            .filter(stock_transaction::Column::OwnerId.eq(owner_id))
            .order_by_desc(stock_transaction::Column::Date)
            .paginate(self.db_pool.as_ref(), limit.max(1));

        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let rows = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;

        Ok((rows, total))
    }

    /// Movements with `date` inside `[from, to]`, end-of-day inclusive on
    /// the upper bound, newest first.
    #[instrument(skip(self))]
    pub async fn movements_between(
        &self,
        owner_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<stock_transaction::Model>, ServiceError> {
        if from > to {
            return Err(ServiceError::ValidationError(
                "date range start must not be after its end".to_string(),
            ));
        }
        let (start, end) = day_bounds(from, to);

        StockTransaction::find()
            .filter(stock_transaction::Column::OwnerId.eq(owner_id))
            .filter(stock_transaction::Column::Date.gte(start))
            .filter(stock_transaction::Column::Date.lt(end))
            .order_by_desc(stock_transaction::Column::Date)
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    /// Full ledger snapshot for derivation, newest first.
    pub async fn snapshot(
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

    /// Events are post-commit notifications; a full channel must not fail
    /// an already-committed movement.
    async fn emit(&self, event: Event) {
        if let Err(e) = self.event_sender.send(event).await {
            warn!(error = %e, "failed to publish movement event");
        }
    }
}

/// Half-open UTC instant range covering `[from, to]` as calendar days.
pub fn day_bounds(from: NaiveDate, to: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = from.and_time(NaiveTime::MIN).and_utc();
    let end = to
        .checked_add_days(Days::new(1))
        .unwrap_or(to)
        .and_time(NaiveTime::MIN)
        .and_utc();
    (start, end)
}

fn unwrap_transaction_error(err: TransactionError<ServiceError>) -> ServiceError {
    match err {
        TransactionError::Connection(db_err) => {
            if is_contention(&db_err) {
                ServiceError::ConcurrencyConflict(db_err.to_string())
            } else {
                ServiceError::db_error(db_err)
            }
        }
        TransactionError::Transaction(service_err) => service_err,
    }
}

/// Store-level contention shows up as backend-specific errors: SQLite busy
/// locks, Postgres serialization failures and deadlocks.
fn is_contention(err: &DbErr) -> bool {
    let msg = err.to_string().to_ascii_lowercase();
    msg.contains("database is locked")
        || msg.contains("database table is locked")
        || msg.contains("could not serialize")
        || msg.contains("deadlock")
        || msg.contains("40001")
}
