//! Stock request and response bodies

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::inventory::{AdjustmentNote, StockAdjustment, StockReport, StockUpdate};

/// PUT /stock/{id} body
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateStockRequest {
    #[validate(length(min = 1, message = "item cannot be empty"))]
    pub item: Option<String>,
    #[schema(value_type = Option<String>, example = "8")]
    pub quantity: Option<Decimal>,
    #[validate(length(min = 1, message = "unit_type cannot be empty"))]
    pub unit_type: Option<String>,
    #[schema(value_type = Option<String>)]
    pub max_capacity: Option<Decimal>,
    /// Reason for a quantity change; required when `quantity` changes
    #[schema(example = "Delivery 14 Oct")]
    pub reference: Option<String>,
}

impl UpdateStockRequest {
    /// Split into the field update and the audit note for `user_id`.
    pub fn into_parts(self, user_id: String) -> (StockUpdate, AdjustmentNote) {
        (
            StockUpdate {
                item: self.item,
                quantity: self.quantity,
                unit_type: self.unit_type,
                max_capacity: self.max_capacity,
            },
            AdjustmentNote {
                reference: self.reference,
                user_id,
            },
        )
    }
}

/// GET /stock/log query
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StockLogQuery {
    pub stock_id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StockListData {
    pub stock: Vec<StockReport>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StockData {
    pub stock: StockReport,
}

/// DELETE /stock/{id} response
#[derive(Debug, Serialize, ToSchema)]
pub struct StockDeletedData {
    pub stock: StockReport,
    #[schema(example = "Stock item deleted")]
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StockLogData {
    pub adjustments: Vec<StockAdjustment>,
}
