//! Stock management: listing, creation, manual adjustment, deletion, audit log

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use crate::core_types::StockId;

use super::error::InventoryError;
use super::models::{AdjustmentNote, NewStockItem, StockAdjustment, StockItem, StockUpdate};
use super::repository::InventoryRepository;

/// Stock row as reported to clients
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct StockReport {
    pub id: StockId,
    #[schema(example = "Full cream milk")]
    pub item: String,
    #[schema(value_type = String, example = "12.5")]
    pub quantity: Decimal,
    #[schema(example = "l")]
    pub unit_type: String,
    #[schema(value_type = Option<String>, example = "20")]
    pub max_capacity: Option<Decimal>,
    /// Fill level in percent, capped at 100
    #[schema(value_type = String, example = "62.5")]
    pub percentage_left: Decimal,
}

impl From<StockItem> for StockReport {
    fn from(row: StockItem) -> Self {
        let percentage_left = percentage_left(row.quantity, row.max_capacity);
        Self {
            id: row.id,
            item: row.item,
            quantity: row.quantity,
            unit_type: row.unit_type,
            max_capacity: row.max_capacity,
            percentage_left,
        }
    }
}

/// `quantity / max_capacity` in percent, rounded to 2 places and capped at 100.
/// Rows without a positive capacity, or too full to compute, report 100.
pub fn percentage_left(quantity: Decimal, max_capacity: Option<Decimal>) -> Decimal {
    match max_capacity {
        Some(max) if max > Decimal::ZERO => quantity
            .checked_div(max)
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
            .map_or(Decimal::ONE_HUNDRED, |pct| {
                pct.round_dp(2).min(Decimal::ONE_HUNDRED)
            }),
        _ => Decimal::ONE_HUNDRED,
    }
}

pub struct StockService {
    inventory: Arc<dyn InventoryRepository>,
}

impl StockService {
    pub fn new(inventory: Arc<dyn InventoryRepository>) -> Self {
        Self { inventory }
    }

    pub async fn list(&self) -> Result<Vec<StockReport>, InventoryError> {
        let rows = self.inventory.list_stock().await?;
        Ok(rows.into_iter().map(StockReport::from).collect())
    }

    pub async fn get(&self, stock_id: &str) -> Result<StockReport, InventoryError> {
        self.inventory
            .get_stock(stock_id)
            .await?
            .map(StockReport::from)
            .ok_or_else(|| InventoryError::StockNotFound(stock_id.to_string()))
    }

    pub async fn create(&self, new: &NewStockItem) -> Result<StockReport, InventoryError> {
        let row = self.inventory.create_stock(new).await?;
        tracing::info!(stock_id = %row.id, item = %row.item, "Stock item created");
        Ok(row.into())
    }

    pub async fn update(
        &self,
        stock_id: &str,
        update: &StockUpdate,
        note: &AdjustmentNote,
    ) -> Result<StockReport, InventoryError> {
        if update.is_empty() {
            return Err(InventoryError::NoFieldsToUpdate);
        }
        let row = self.inventory.update_stock(stock_id, update, note).await?;
        Ok(row.into())
    }

    pub async fn delete(&self, stock_id: &str) -> Result<StockReport, InventoryError> {
        let row = self.inventory.delete_stock(stock_id).await?;
        tracing::info!(stock_id = %row.id, item = %row.item, "Stock item removed");
        Ok(row.into())
    }

    pub async fn adjustments(
        &self,
        stock_id: Option<&str>,
    ) -> Result<Vec<StockAdjustment>, InventoryError> {
        self.inventory.list_adjustments(stock_id).await
    }
}
