use crate::{
    config::AppConfig,
    db::DbPool,
    events::EventSender,
    services::{catalog::CatalogService, movements::MovementService, reports::ReportService},
};
use std::sync::Arc;

pub mod health;
pub mod items;
pub mod movements;
pub mod reports;

/// Aggregate of the services HTTP handlers call into.
#[derive(Clone)]
pub struct AppServices {
    pub catalog: Arc<CatalogService>,
    pub movements: Arc<MovementService>,
    pub reports: Arc<ReportService>,
}

impl AppServices {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender, config: &AppConfig) -> Self {
        Self {
            catalog: Arc::new(CatalogService::new(
                db.clone(),
                event_sender.clone(),
                config.allowed_units.clone(),
            )),
            movements: Arc::new(MovementService::new(db.clone(), event_sender)),
            reports: Arc::new(ReportService::new(db)),
        }
    }
}
