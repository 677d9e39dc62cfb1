use crate::{
    db::DbPool,
    entities::stock_item::{self, Entity as StockItem},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rand::Rng;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use std::sync::Arc;
use tracing::{instrument, warn};
use uuid::Uuid;

const SKU_PREFIX: &str = "SKU-";
const SKU_SUFFIX_LEN: usize = 7;

#[derive(Debug, Clone)]
pub struct CreateItemInput {
    pub name: String,
    pub unit: String,
    pub low_stock_threshold: i32,
    pub sku: Option<String>,
    pub urgent_note: Option<String>,
}

/// Partial catalog update. `quantity` is deliberately absent: on-hand count
/// is write-exclusive to the movement engine.
#[derive(Debug, Clone, Default)]
pub struct UpdateItemInput {
    pub name: Option<String>,
    pub unit: Option<String>,
    pub low_stock_threshold: Option<i32>,
    pub urgent_note: Option<String>,
}

/// Service for managing the item catalog
#[derive(Clone)]
pub struct CatalogService {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
    allowed_units: Vec<String>,
}

impl CatalogService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender, allowed_units: Vec<String>) -> Self {
        Self {
            db_pool,
            event_sender,
            allowed_units,
        }
    }

    /// Creates a new item with `quantity = 0`. The SKU is auto-generated
    /// when not supplied.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_item(
        &self,
        owner_id: Uuid,
        input: CreateItemInput,
    ) -> Result<stock_item::Model, ServiceError> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(ServiceError::ValidationError(
                "item name must not be empty".to_string(),
            ));
        }
        self.check_unit(&input.unit)?;
        check_threshold(input.low_stock_threshold)?;
        self.check_name_available(owner_id, &name, None).await?;

        let sku = match input.sku {
            Some(sku) if !sku.trim().is_empty() => sku.trim().to_string(),
            _ => generate_sku(),
        };

        let now = Utc::now();
        let item = stock_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            owner_id: Set(owner_id),
            name: Set(name),
            sku: Set(sku),
            unit: Set(input.unit),
            quantity: Set(0),
            low_stock_threshold: Set(input.low_stock_threshold),
            urgent_note: Set(normalize_note(input.urgent_note)),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let created = item
            .insert(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        self.emit(Event::ItemCreated {
            owner_id,
            item_id: created.id,
        })
        .await;

        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get_item(
        &self,
        owner_id: Uuid,
        item_id: Uuid,
    ) -> Result<stock_item::Model, ServiceError> {
        StockItem::find_by_id(item_id)
            .filter(stock_item::Column::OwnerId.eq(owner_id))
            .one(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("item {} not found", item_id)))
    }

    /// Lists the catalog ordered by name ascending, paginated.
    #[instrument(skip(self))]
    pub async fn list_items(
        &self,
        owner_id: Uuid,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<stock_item::Model>, u64), ServiceError> {
        let paginator = StockItem::find()
            .filter(stock_item::Column::OwnerId.eq(owner_id))
            .order_by_asc(stock_item::Column::Name)
            .paginate(self.db_pool.as_ref(), limit.max(1));

        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let items = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;

        Ok((items, total))
    }

    /// Full catalog snapshot for derivation, ordered by name ascending.
    pub async fn snapshot(&self, owner_id: Uuid) -> Result<Vec<stock_item::Model>, ServiceError> {
        StockItem::find()
            .filter(stock_item::Column::OwnerId.eq(owner_id))
            .order_by_asc(stock_item::Column::Name)
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    /// Applies a partial update. Quantity cannot be updated here by
    /// construction; renames do not rewrite historical ledger rows.
    #[instrument(skip(self, input))]
    pub async fn update_item(
        &self,
        owner_id: Uuid,
        item_id: Uuid,
        input: UpdateItemInput,
    ) -> Result<stock_item::Model, ServiceError> {
        let existing = self.get_item(owner_id, item_id).await?;

        let mut active: stock_item::ActiveModel = existing.clone().into();

        if let Some(name) = input.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(ServiceError::ValidationError(
                    "item name must not be empty".to_string(),
                ));
            }
            if name != existing.name {
                self.check_name_available(owner_id, &name, Some(item_id))
                    .await?;
            }
            active.name = Set(name);
        }
        if let Some(unit) = input.unit {
            self.check_unit(&unit)?;
            active.unit = Set(unit);
        }
        if let Some(threshold) = input.low_stock_threshold {
            check_threshold(threshold)?;
            active.low_stock_threshold = Set(threshold);
        }
        if let Some(note) = input.urgent_note {
            active.urgent_note = Set(normalize_note(Some(note)));
        }
        active.updated_at = Set(Utc::now());

        let updated = active
            .update(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        self.emit(Event::ItemUpdated {
            owner_id,
            item_id: updated.id,
        })
        .await;

        Ok(updated)
    }

    /// Removes an item. Historical ledger rows keep their denormalized
    /// snapshot and are not touched.
    #[instrument(skip(self))]
    pub async fn delete_item(&self, owner_id: Uuid, item_id: Uuid) -> Result<(), ServiceError> {
        let existing = self.get_item(owner_id, item_id).await?;

        existing
            .delete(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        self.emit(Event::ItemDeleted { owner_id, item_id }).await;

        Ok(())
    }

    fn check_unit(&self, unit: &str) -> Result<(), ServiceError> {
        if self.allowed_units.iter().any(|u| u == unit) {
            Ok(())
        } else {
            Err(ServiceError::ValidationError(format!(
                "unit '{}' is not one of the configured units ({})",
                unit,
                self.allowed_units.join(", ")
            )))
        }
    }

    /// Item names are the business identity key the ledger denormalizes, so
    /// they must stay unique within an owner's catalog.
    async fn check_name_available(
        &self,
        owner_id: Uuid,
        name: &str,
        exclude: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        let mut query = StockItem::find()
            .filter(stock_item::Column::OwnerId.eq(owner_id))
            .filter(stock_item::Column::Name.eq(name));
        if let Some(id) = exclude {
            query = query.filter(stock_item::Column::Id.ne(id));
        }
        let taken = query
            .count(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?;
        if taken > 0 {
            return Err(ServiceError::ValidationError(format!(
                "an item named '{}' already exists",
                name
            )));
        }
        Ok(())
    }

    /// Events are post-commit notifications; a full channel must not fail
    /// an already-committed mutation.
    async fn emit(&self, event: Event) {
        if let Err(e) = self.event_sender.send(event).await {
            warn!(error = %e, "failed to publish catalog event");
        }
    }
}

fn check_threshold(threshold: i32) -> Result<(), ServiceError> {
    if threshold < 0 {
        return Err(ServiceError::ValidationError(
            "low stock threshold must not be negative".to_string(),
        ));
    }
    Ok(())
}

fn normalize_note(note: Option<String>) -> Option<String> {
    note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())
}

fn generate_sku() -> String {
    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..SKU_SUFFIX_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("{}{}", SKU_PREFIX, suffix)
}
