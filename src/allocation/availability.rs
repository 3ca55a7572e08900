//! Maximum producible units per product from current stock

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use utoipa::ToSchema;

use crate::core_types::{ProductId, StockId, Units};
use crate::inventory::models::Product;

use super::snapshot::{IngredientUsage, StockLevel};

/// How many units of a product the current stock supports on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ProductAvailability {
    pub product_id: ProductId,
    #[schema(example = "Latte")]
    pub name: String,
    /// `None` when the product consumes no tracked ingredient
    pub available_units: Option<Units>,
    /// Ingredient that caps `available_units`
    pub limiting_stock_id: Option<StockId>,
}

/// Units of one product producible from `stock`, ignoring other products.
pub fn product_availability(
    product: &Product,
    usage: &IngredientUsage,
    stock: &StockLevel,
) -> ProductAvailability {
    let mut best: Option<(Units, &StockId)> = None;

    for (stock_id, per_unit) in usage.ingredients(&product.id) {
        if *per_unit <= Decimal::ZERO {
            continue;
        }
        let units = units_from(stock.available(stock_id), *per_unit);
        if best.is_none_or(|(current, _)| units < current) {
            best = Some((units, stock_id));
        }
    }

    ProductAvailability {
        product_id: product.id.clone(),
        name: product.name.clone(),
        available_units: best.map(|(units, _)| units),
        limiting_stock_id: best.map(|(_, sid)| sid.clone()),
    }
}

/// Availability for every product in `catalog`, in catalog order.
pub fn catalog_availability(
    catalog: &[Product],
    usage: &IngredientUsage,
    stock: &StockLevel,
) -> Vec<ProductAvailability> {
    catalog
        .iter()
        .map(|p| product_availability(p, usage, stock))
        .collect()
}

fn units_from(available: Decimal, per_unit: Decimal) -> Units {
    if available <= Decimal::ZERO {
        return 0;
    }
    available
        .checked_div(per_unit)
        .map(|q| q.floor().to_u32().unwrap_or(Units::MAX))
        .unwrap_or(Units::MAX)
}
