use std::sync::Arc;

use crate::inventory::{CatalogService, InventoryRepository, StockService};
use crate::orders::OrderService;

/// Gateway application state (shared)
pub struct AppState {
    /// Backing store, also used for health pings
    pub inventory: Arc<dyn InventoryRepository>,
    pub orders: OrderService,
    pub stock: StockService,
    pub catalog: CatalogService,
}

impl AppState {
    pub fn new(inventory: Arc<dyn InventoryRepository>) -> Self {
        Self {
            orders: OrderService::new(inventory.clone()),
            stock: StockService::new(inventory.clone()),
            catalog: CatalogService::new(inventory.clone()),
            inventory,
        }
    }
}
