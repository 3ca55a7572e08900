//! Inventory persistence and services
//!
//! Tables: `products`, `product_stock`, `stock`, `stock_adjustments`,
//! `orders`, `order_products` (see `sql/schema.sql`).

pub mod catalog;
pub mod error;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod stock;

pub use catalog::{CatalogError, CatalogService, ProductUpdated};
pub use error::InventoryError;
pub use memory::{InventorySeed, MemoryInventory};
pub use models::{
    AdjustmentNote, Ingredient, MAX_QUANTITY, NewOrder, NewProduct, NewStockItem, Order,
    OrderFilter, OrderLine, OrderPage, OrderStatus, Product, ProductDetail, ProductDraft,
    ProductStockRow, ProductUpdate, RecipeLine, ReferenceType, StockAdjustment, StockItem,
    StockUpdate, stored_price, stored_quantity,
};
pub use postgres::PgInventory;
pub use repository::InventoryRepository;
pub use stock::{StockReport, StockService, percentage_left};
