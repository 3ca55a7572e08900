use thiserror::Error;

use crate::allocation::{Adjustment, AllocationError};
use crate::inventory::InventoryError;

#[derive(Error, Debug)]
pub enum OrderError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error(transparent)]
    Allocation(#[from] AllocationError),

    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error("Order {0} belongs to another user")]
    NotOrderOwner(String),

    /// Pre-flight allocation could not satisfy every line
    #[error("Insufficient stock for the requested products")]
    InsufficientStock(Vec<Adjustment>),
}
