use crate::auth::AuthenticatedUser;
use crate::entities::stock_transaction::{self, MovementType};
use crate::errors::ServiceError;
use crate::services::movements::RecordMovementInput;
use crate::{ApiResponse, AppState, ListQuery};
use axum::{
    extract::{Json, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Serialize, ToSchema)]
pub struct TransactionResponse {
    pub id: Uuid,
    pub item_id: Uuid,
    pub item_name: String,
    pub unit: String,
    pub movement_type: String,
    pub quantity: i32,
    pub actor: String,
    pub date: DateTime<Utc>,
    pub notes: Option<String>,
}

impl From<stock_transaction::Model> for TransactionResponse {
    fn from(tx: stock_transaction::Model) -> Self {
        Self {
            id: tx.id,
            item_id: tx.item_id,
            item_name: tx.item_name,
            unit: tx.unit,
            movement_type: tx.movement_type,
            quantity: tx.quantity,
            actor: tx.actor,
            date: tx.date,
            notes: tx.notes,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RecordMovementRequest {
    pub item_id: Uuid,
    /// "in" or "out"
    pub movement_type: String,
    pub quantity: i32,
    /// Supplier or destination
    pub actor: String,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct DateRangeQuery {
    /// Range start (inclusive), YYYY-MM-DD
    pub from: NaiveDate,
    /// Range end (inclusive, end of day), YYYY-MM-DD
    pub to: NaiveDate,
}

/// Create the movements router
pub fn movements_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_movements).post(record_movement))
        .route("/range", get(movements_in_range))
}

/// Record a stock movement
#[utoipa::path(
    post,
    path = "/api/v1/movements",
    request_body = RecordMovementRequest,
    responses(
        (status = 201, description = "Movement recorded", body = TransactionResponse),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Insufficient stock or store contention", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "movements"
)]
pub async fn record_movement(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<RecordMovementRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let movement_type = MovementType::from_str(&payload.movement_type).ok_or_else(|| {
        ServiceError::ValidationError(format!(
            "movement type must be 'in' or 'out', got '{}'",
            payload.movement_type
        ))
    })?;

    let row = state
        .services
        .movements
        .record_movement(
            user.id,
            RecordMovementInput {
                item_id: payload.item_id,
                movement_type,
                quantity: payload.quantity,
                actor: payload.actor,
                notes: payload.notes,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(TransactionResponse::from(row))),
    ))
}

/// Movement history, newest first
#[utoipa::path(
    get,
    path = "/api/v1/movements",
    params(ListQuery),
    responses(
        (status = 200, description = "History page returned"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "movements"
)]
pub async fn list_movements(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let (rows, total) = state
        .services
        .movements
        .list_movements(user.id, query.page, query.limit)
        .await?;

    let transactions: Vec<TransactionResponse> =
        rows.into_iter().map(TransactionResponse::from).collect();

    Ok(Json(json!({
        "success": true,
        "data": {
            "transactions": transactions,
            "total": total,
            "page": query.page,
            "limit": query.limit,
        }
    })))
}

/// Movements within an inclusive date range
#[utoipa::path(
    get,
    path = "/api/v1/movements/range",
    params(DateRangeQuery),
    responses(
        (status = 200, description = "Movements in range returned"),
        (status = 400, description = "Invalid range", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "movements"
)]
pub async fn movements_in_range(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(range): Query<DateRangeQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let rows = state
        .services
        .movements
        .movements_between(user.id, range.from, range.to)
        .await?;

    let transactions: Vec<TransactionResponse> =
        rows.into_iter().map(TransactionResponse::from).collect();

    Ok(Json(ApiResponse::success(transactions)))
}
