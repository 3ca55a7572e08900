//! Repository trait for inventory data access
//!
//! Services depend on [`InventoryRepository`] only, so they run unchanged
//! against PostgreSQL ([`super::PgInventory`]) or the in-memory store
//! ([`super::MemoryInventory`]) used for tests and demo mode.

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::core_types::{OrderId, ProductId, StockId};

use super::error::InventoryError;
use super::models::{
    AdjustmentNote, NewOrder, NewStockItem, Order, OrderFilter, OrderPage, OrderStatus, Product,
    ProductDraft, ProductStockRow, ProductUpdate, StockAdjustment, StockItem, StockUpdate,
};

#[async_trait]
pub trait InventoryRepository: Send + Sync {
    /// Cheap liveness check
    async fn health_check(&self) -> Result<(), InventoryError>;

    // ------------------------------------------------------------------
    // Catalog
    // ------------------------------------------------------------------

    /// All catalog products
    async fn load_catalog(&self) -> Result<Vec<Product>, InventoryError>;

    /// `product_stock` rows for the given products
    async fn load_usage(
        &self,
        product_ids: &[ProductId],
    ) -> Result<Vec<ProductStockRow>, InventoryError>;

    /// Insert a product and its recipe in one transaction
    async fn create_product(&self, draft: &ProductDraft) -> Result<Product, InventoryError>;

    /// Update product fields and upsert recipe entries; a zero quantity
    /// removes that ingredient.
    async fn update_product(
        &self,
        product_id: &str,
        update: &ProductUpdate,
        recipe: &[(StockId, Decimal)],
    ) -> Result<Product, InventoryError>;

    // ------------------------------------------------------------------
    // Stock
    // ------------------------------------------------------------------

    /// Stock rows for the given ids; unknown ids are skipped
    async fn load_stock(&self, stock_ids: &[StockId]) -> Result<Vec<StockItem>, InventoryError>;

    /// Every stock row, ordered by item name
    async fn list_stock(&self) -> Result<Vec<StockItem>, InventoryError>;

    async fn get_stock(&self, stock_id: &str) -> Result<Option<StockItem>, InventoryError>;

    async fn create_stock(&self, new: &NewStockItem) -> Result<StockItem, InventoryError>;

    /// Apply `update` under a row lock. A quantity change is logged as a
    /// `user` adjustment in the same transaction.
    async fn update_stock(
        &self,
        stock_id: &str,
        update: &StockUpdate,
        note: &AdjustmentNote,
    ) -> Result<StockItem, InventoryError>;

    /// Remove a stock row and its adjustment log. Fails with `StockInUse`
    /// while a recipe still references it.
    async fn delete_stock(&self, stock_id: &str) -> Result<StockItem, InventoryError>;

    /// Audit log, newest first, optionally for one stock row
    async fn list_adjustments(
        &self,
        stock_id: Option<&str>,
    ) -> Result<Vec<StockAdjustment>, InventoryError>;

    // ------------------------------------------------------------------
    // Orders
    // ------------------------------------------------------------------

    /// Commit an order atomically: re-check and deduct ingredient stock,
    /// insert the order and its lines, log `order` adjustments.
    async fn create_order(&self, order: &NewOrder) -> Result<Order, InventoryError>;

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>, InventoryError>;

    async fn list_orders(&self, filter: &OrderFilter) -> Result<OrderPage, InventoryError>;

    /// Move a pending order to `next` under a row lock. Cancelling puts
    /// back the stock the order deducted and logs it as `order` adjustments.
    async fn transition_order(
        &self,
        order_id: OrderId,
        next: OrderStatus,
    ) -> Result<Order, InventoryError>;
}
