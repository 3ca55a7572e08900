//! Read-only snapshots consumed by the allocator
//!
//! - [`IngredientUsage`]: product -> (stock -> quantity per unit), from `product_stock`
//! - [`StockLevel`]: stock -> quantity available, from `stock`
//! - [`resolve`]: maps request identifiers (id or display name) onto catalog products
//!
//! Snapshots are built fresh for every request and dropped with the response.

use rust_decimal::Decimal;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::core_types::{ProductId, StockId, Units};
use crate::inventory::models::{Product, ProductStockRow, StockItem};

use super::error::AllocationError;

/// One requested product line, as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRequest {
    /// Product id or exact display name
    pub product: String,
    pub quantity: Units,
}

impl ProductRequest {
    pub fn new(product: impl Into<String>, quantity: Units) -> Self {
        Self {
            product: product.into(),
            quantity,
        }
    }
}

/// A request whose identifier has been matched against the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRequest {
    /// Identifier exactly as the caller sent it
    pub product: String,
    pub product_id: ProductId,
    pub quantity: Units,
}

// ============================================================================
// Ingredient Usage
// ============================================================================

/// Per-unit ingredient consumption for a set of products.
///
/// Row order is preserved per product; it decides the order in which stocks
/// are examined by the allocator.
#[derive(Debug, Clone, Default)]
pub struct IngredientUsage {
    by_product: FxHashMap<ProductId, Vec<(StockId, Decimal)>>,
}

impl IngredientUsage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `product_stock` rows. A repeated (product, stock) pair
    /// replaces the earlier value.
    pub fn from_rows(rows: &[ProductStockRow]) -> Self {
        let mut usage = Self::new();
        for row in rows {
            usage.insert(&row.product_id, &row.stock_id, row.quantity);
        }
        usage
    }

    pub fn insert(&mut self, product_id: &str, stock_id: &str, per_unit: Decimal) {
        let ingredients = self.by_product.entry(product_id.to_string()).or_default();
        match ingredients.iter_mut().find(|(sid, _)| sid == stock_id) {
            Some(existing) => existing.1 = per_unit,
            None => ingredients.push((stock_id.to_string(), per_unit)),
        }
    }

    /// Ingredients of one product, in row order. Empty when unknown.
    pub fn ingredients(&self, product_id: &str) -> &[(StockId, Decimal)] {
        self.by_product
            .get(product_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Quantity of `stock_id` consumed by one unit of `product_id` (zero if none).
    pub fn per_unit(&self, product_id: &str, stock_id: &str) -> Decimal {
        self.ingredients(product_id)
            .iter()
            .find(|(sid, _)| sid == stock_id)
            .map(|(_, qty)| *qty)
            .unwrap_or(Decimal::ZERO)
    }

    /// Distinct stock ids referenced by the given products, in first-reference order.
    pub fn referenced_stock<'a>(&self, product_ids: impl IntoIterator<Item = &'a str>) -> Vec<StockId> {
        let mut seen = FxHashSet::default();
        let mut ordered = Vec::new();
        for pid in product_ids {
            for (sid, _) in self.ingredients(pid) {
                if seen.insert(sid.as_str()) {
                    ordered.push(sid.clone());
                }
            }
        }
        ordered
    }
}

// ============================================================================
// Stock Level
// ============================================================================

/// Available quantity per stock id.
#[derive(Debug, Clone, Default)]
pub struct StockLevel {
    available: FxHashMap<StockId, Decimal>,
}

impl StockLevel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: &[StockItem]) -> Self {
        let mut level = Self::new();
        for row in rows {
            level.insert(&row.id, row.quantity);
        }
        level
    }

    pub fn insert(&mut self, stock_id: &str, quantity: Decimal) {
        self.available.insert(stock_id.to_string(), quantity);
    }

    /// Available quantity; a stock row missing from the snapshot counts as empty.
    pub fn available(&self, stock_id: &str) -> Decimal {
        self.available
            .get(stock_id)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }
}

// ============================================================================
// Product Resolution
// ============================================================================

/// Resolve a single identifier. An exact id match wins; otherwise the name
/// must match exactly one product.
pub fn resolve_identifier<'a>(
    identifier: &str,
    catalog: &'a [Product],
) -> Result<&'a Product, AllocationError> {
    if let Some(product) = catalog.iter().find(|p| p.id == identifier) {
        return Ok(product);
    }

    let mut by_name = catalog.iter().filter(|p| p.name == identifier);
    match (by_name.next(), by_name.next()) {
        (Some(product), None) => Ok(product),
        (Some(_), Some(_)) => Err(AllocationError::AmbiguousProduct(identifier.to_string())),
        (None, _) => Err(AllocationError::ProductNotFound(identifier.to_string())),
    }
}

/// Resolve every request against the catalog. The first failure aborts the batch.
pub fn resolve(
    requests: &[ProductRequest],
    catalog: &[Product],
) -> Result<Vec<ResolvedRequest>, AllocationError> {
    if requests.is_empty() {
        return Err(AllocationError::EmptyRequest);
    }

    requests
        .iter()
        .map(|req| {
            let product = resolve_identifier(&req.product, catalog)?;
            Ok(ResolvedRequest {
                product: req.product.clone(),
                product_id: product.id.clone(),
                quantity: req.quantity,
            })
        })
        .collect()
}

/// Distinct product ids of resolved requests, in first-appearance order.
pub fn distinct_products(resolved: &[ResolvedRequest]) -> Vec<ProductId> {
    let mut seen = FxHashSet::default();
    resolved
        .iter()
        .filter(|r| seen.insert(r.product_id.as_str()))
        .map(|r| r.product_id.clone())
        .collect()
}
