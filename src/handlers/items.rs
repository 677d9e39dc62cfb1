use crate::auth::AuthenticatedUser;
use crate::entities::stock_item;
use crate::errors::ServiceError;
use crate::services::catalog::{CreateItemInput, UpdateItemInput};
use crate::{ApiResponse, AppState, ListQuery};
use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, ToSchema)]
pub struct ItemResponse {
    pub id: Uuid,
    pub name: String,
    pub sku: String,
    pub unit: String,
    pub quantity: i32,
    pub low_stock_threshold: i32,
    pub urgent_note: Option<String>,
    pub low_stock: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<stock_item::Model> for ItemResponse {
    fn from(item: stock_item::Model) -> Self {
        let low_stock = item.is_low_stock();
        Self {
            id: item.id,
            name: item.name,
            sku: item.sku,
            unit: item.unit,
            quantity: item.quantity,
            low_stock_threshold: item.low_stock_threshold,
            urgent_note: item.urgent_note,
            low_stock,
            created_at: item.created_at,
            updated_at: item.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateItemRequest {
    pub name: String,
    pub unit: String,
    #[serde(default)]
    pub low_stock_threshold: i32,
    /// Auto-generated when omitted
    pub sku: Option<String>,
    pub urgent_note: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateItemRequest {
    pub name: Option<String>,
    pub unit: Option<String>,
    pub low_stock_threshold: Option<i32>,
    pub urgent_note: Option<String>,
}

/// Create the items router
pub fn items_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_items).post(create_item))
        .route(
            "/:id",
            get(get_item).put(update_item).delete(delete_item),
        )
}

/// List catalog items, name ascending
#[utoipa::path(
    get,
    path = "/api/v1/items",
    params(ListQuery),
    responses(
        (status = 200, description = "Catalog page returned"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "items"
)]
pub async fn list_items(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let (items, total) = state
        .services
        .catalog
        .list_items(user.id, query.page, query.limit)
        .await?;

    let items: Vec<ItemResponse> = items.into_iter().map(ItemResponse::from).collect();

    Ok(Json(json!({
        "success": true,
        "data": {
            "items": items,
            "total": total,
            "page": query.page,
            "limit": query.limit,
        }
    })))
}

/// Create a new catalog item (quantity starts at zero)
#[utoipa::path(
    post,
    path = "/api/v1/items",
    request_body = CreateItemRequest,
    responses(
        (status = 201, description = "Item created", body = ItemResponse),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "items"
)]
pub async fn create_item(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateItemRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let item = state
        .services
        .catalog
        .create_item(
            user.id,
            CreateItemInput {
                name: payload.name,
                unit: payload.unit,
                low_stock_threshold: payload.low_stock_threshold,
                sku: payload.sku,
                urgent_note: payload.urgent_note,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(ItemResponse::from(item))),
    ))
}

/// Get one catalog item
#[utoipa::path(
    get,
    path = "/api/v1/items/{id}",
    params(("id" = Uuid, Path, description = "Item id")),
    responses(
        (status = 200, description = "Item returned", body = ItemResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "items"
)]
pub async fn get_item(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let item = state.services.catalog.get_item(user.id, id).await?;
    Ok(Json(ApiResponse::success(ItemResponse::from(item))))
}

/// Update a catalog item. The on-hand quantity is not part of this surface;
/// it only moves through recorded movements.
#[utoipa::path(
    put,
    path = "/api/v1/items/{id}",
    params(("id" = Uuid, Path, description = "Item id")),
    request_body = UpdateItemRequest,
    responses(
        (status = 200, description = "Item updated", body = ItemResponse),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "items"
)]
pub async fn update_item(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateItemRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let item = state
        .services
        .catalog
        .update_item(
            user.id,
            id,
            UpdateItemInput {
                name: payload.name,
                unit: payload.unit,
                low_stock_threshold: payload.low_stock_threshold,
                urgent_note: payload.urgent_note,
            },
        )
        .await?;

    Ok(Json(ApiResponse::success(ItemResponse::from(item))))
}

/// Delete a catalog item; its movement history stays in the ledger
#[utoipa::path(
    delete,
    path = "/api/v1/items/{id}",
    params(("id" = Uuid, Path, description = "Item id")),
    responses(
        (status = 200, description = "Item deleted"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "items"
)]
pub async fn delete_item(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.catalog.delete_item(user.id, id).await?;

    Ok(Json(json!({
        "success": true,
        "deleted_id": id,
    })))
}
