use thiserror::Error;

use super::models::OrderStatus;

#[derive(Error, Debug)]
pub enum InventoryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Stock item not found: {0}")]
    StockNotFound(String),

    #[error("Item already exists: {0}")]
    StockAlreadyExists(String),

    #[error("Stock item {0} is used by a product recipe")]
    StockInUse(String),

    #[error("Insufficient stock: {stock_id}")]
    InsufficientStock { stock_id: String },

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Cannot change order {order_id} from {from} to {to}")]
    InvalidStatusTransition {
        order_id: String,
        from: OrderStatus,
        to: OrderStatus,
    },

    #[error("No fields to update provided")]
    NoFieldsToUpdate,

    #[error("Reference reason is required when updating quantity")]
    ReferenceRequired,

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Corrupt row: {0}")]
    Corrupt(String),

    #[error("Inventory store unavailable: {0}")]
    Unavailable(String),
}

impl InventoryError {
    /// Unique-constraint violations surface as `StockAlreadyExists`.
    pub(crate) fn from_insert(err: sqlx::Error, item: &str) -> Self {
        match err.as_database_error() {
            Some(db) if db.is_unique_violation() => Self::StockAlreadyExists(item.to_string()),
            _ => Self::Database(err),
        }
    }

    /// Foreign-key violations on stock deletion surface as `StockInUse`.
    pub(crate) fn from_delete(err: sqlx::Error, stock_id: &str) -> Self {
        match err.as_database_error() {
            Some(db) if db.is_foreign_key_violation() => Self::StockInUse(stock_id.to_string()),
            _ => Self::Database(err),
        }
    }
}
