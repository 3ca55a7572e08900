//! Coffee POS - coffee shop backend
//!
//! Product catalog, ingredient stock and orders, with stock-constrained
//! order validation at the core.
//!
//! # Modules
//!
//! - [`core_types`] - Core type definitions (ProductId, StockId, etc.)
//! - [`allocation`] - Greedy allocation of requested quantities against stock
//! - [`inventory`] - Catalog/stock/order persistence, catalog and stock services
//! - [`orders`] - Order validation, creation and lifecycle
//! - [`gateway`] - axum HTTP surface and OpenAPI docs
//! - [`config`], [`logging`], [`db`] - configuration, tracing setup, PostgreSQL pool

// Core types - must be first!
pub mod core_types;

pub mod allocation;
pub mod config;
pub mod db;
pub mod gateway;
pub mod inventory;
pub mod logging;
pub mod orders;

// Convenient re-exports at crate root
pub use allocation::{Adjustment, AllocationError, AllocationReport, ProductRequest, validate};
pub use core_types::{OrderId, ProductId, StockId, Units, UserId};
pub use inventory::{InventoryError, InventoryRepository, MemoryInventory, PgInventory};
pub use orders::{OrderError, OrderService};
