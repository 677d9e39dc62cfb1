use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "stockledger-api",
        description = "Inventory tracker backend: item catalog, append-only movement ledger, low-stock alerts and accumulation reports"
    ),
    paths(
        crate::handlers::items::list_items,
        crate::handlers::items::create_item,
        crate::handlers::items::get_item,
        crate::handlers::items::update_item,
        crate::handlers::items::delete_item,
        crate::handlers::movements::record_movement,
        crate::handlers::movements::list_movements,
        crate::handlers::movements::movements_in_range,
        crate::handlers::reports::dashboard,
        crate::handlers::reports::low_stock,
        crate::handlers::reports::most_used,
        crate::handlers::reports::accumulation,
        crate::handlers::health::health,
    ),
    components(schemas(
        crate::handlers::items::ItemResponse,
        crate::handlers::items::CreateItemRequest,
        crate::handlers::items::UpdateItemRequest,
        crate::handlers::movements::TransactionResponse,
        crate::handlers::movements::RecordMovementRequest,
        crate::services::reports::ItemUsage,
        crate::services::reports::DayTotals,
        crate::services::reports::AccumulationRow,
        crate::errors::ErrorResponse,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "items", description = "Item catalog management"),
        (name = "movements", description = "Stock movement ledger"),
        (name = "reports", description = "Derived reports and dashboard"),
        (name = "health", description = "Service health"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi())
}
