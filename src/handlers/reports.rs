use crate::auth::AuthenticatedUser;
use crate::errors::ServiceError;
use crate::handlers::items::ItemResponse;
use crate::handlers::movements::DateRangeQuery;
use crate::services::reports::DEFAULT_TOP_N;
use crate::{ApiResponse, AppState};
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use utoipa::IntoParams;

#[derive(Debug, Deserialize, IntoParams)]
pub struct MostUsedQuery {
    /// Ranking cut-off; defaults to 5
    pub top_n: Option<usize>,
}

/// Create the reports router
pub fn reports_router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/low-stock", get(low_stock))
        .route("/most-used", get(most_used))
        .route("/accumulation", get(accumulation))
}

/// Dashboard summary: counts, today's totals, low-stock list, most-used ranking
#[utoipa::path(
    get,
    path = "/api/v1/reports/dashboard",
    responses(
        (status = 200, description = "Dashboard summary returned"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "reports"
)]
pub async fn dashboard(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ServiceError> {
    let today = Utc::now().date_naive();
    let summary = state
        .services
        .reports
        .dashboard_summary(user.id, today)
        .await?;

    let low_stock: Vec<ItemResponse> = summary
        .low_stock
        .into_iter()
        .map(ItemResponse::from)
        .collect();

    Ok(Json(json!({
        "success": true,
        "data": {
            "total_items": summary.total_items,
            "low_stock_count": summary.low_stock_count,
            "stock_in_today": summary.totals.stock_in_today,
            "stock_out_today": summary.totals.stock_out_today,
            "low_stock": low_stock,
            "most_used": summary.most_used,
        }
    })))
}

/// Items at or below their low-stock threshold
#[utoipa::path(
    get,
    path = "/api/v1/reports/low-stock",
    responses(
        (status = 200, description = "Low-stock items returned"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "reports"
)]
pub async fn low_stock(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ServiceError> {
    let items = state.services.reports.low_stock(user.id).await?;
    let items: Vec<ItemResponse> = items.into_iter().map(ItemResponse::from).collect();
    Ok(Json(ApiResponse::success(items)))
}

/// Most frequently stocked-out items
#[utoipa::path(
    get,
    path = "/api/v1/reports/most-used",
    params(MostUsedQuery),
    responses(
        (status = 200, description = "Usage ranking returned"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "reports"
)]
pub async fn most_used(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<MostUsedQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let ranking = state
        .services
        .reports
        .most_used(user.id, query.top_n.unwrap_or(DEFAULT_TOP_N))
        .await?;
    Ok(Json(ApiResponse::success(ranking)))
}

/// Per-item in/out/net accumulation over an inclusive date range
#[utoipa::path(
    get,
    path = "/api/v1/reports/accumulation",
    params(DateRangeQuery),
    responses(
        (status = 200, description = "Accumulation report returned"),
        (status = 400, description = "Invalid range", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "reports"
)]
pub async fn accumulation(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(range): Query<DateRangeQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let rows = state
        .services
        .reports
        .accumulation(user.id, range.from, range.to)
        .await?;
    Ok(Json(ApiResponse::success(rows)))
}
