//! Data models for catalog, stock and orders

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::allocation::IngredientUsage;
use crate::core_types::{OrderId, ProductId, StockId, Units, UserId};

use super::error::InventoryError;

// ============================================================================
// Stored Amounts
// ============================================================================

/// Fractional digits stored for stock and recipe quantities (`NUMERIC(14, 4)`)
pub const QUANTITY_SCALE: u32 = 4;

/// Largest storable stock or recipe quantity: 9999999999.9999
pub const MAX_QUANTITY: Decimal = Decimal::from_parts(0x107A_3FFF, 0x5AF3, 0, false, QUANTITY_SCALE);

/// Fractional digits stored for prices (`NUMERIC(10, 2)`)
pub const PRICE_SCALE: u32 = 2;

/// Largest storable price: 99999999.99
pub const MAX_PRICE: Decimal = Decimal::from_parts(0x540B_E3FF, 0x2, 0, false, PRICE_SCALE);

fn stored_amount(field: &str, value: Decimal, scale: u32, max: Decimal) -> Result<Decimal, InventoryError> {
    if value < Decimal::ZERO {
        return Err(InventoryError::InvalidValue(format!("{} cannot be negative", field)));
    }
    let rounded = value.round_dp(scale);
    if rounded > max {
        return Err(InventoryError::InvalidValue(format!(
            "{} cannot exceed {}",
            field, max
        )));
    }
    Ok(rounded)
}

/// Round a quantity to [`QUANTITY_SCALE`] and check it fits the column.
///
/// Every quantity is normalised before it reaches a store, so the stock
/// level and the logged adjustment always agree to the last digit.
pub fn stored_quantity(field: &str, value: Decimal) -> Result<Decimal, InventoryError> {
    stored_amount(field, value, QUANTITY_SCALE, MAX_QUANTITY)
}

pub fn stored_price(value: Decimal) -> Result<Decimal, InventoryError> {
    stored_amount("price", value, PRICE_SCALE, MAX_PRICE)
}

// ============================================================================
// Catalog
// ============================================================================

/// Sellable catalog item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Product {
    pub id: ProductId,
    #[schema(example = "Latte")]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[schema(value_type = String, example = "35.00")]
    pub price: Decimal,
}

impl Product {
    pub fn new(id: impl Into<String>, name: impl Into<String>, price: Decimal) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            price,
        }
    }
}

/// One `product_stock` row: stock consumed by one unit of a product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ProductStockRow {
    pub product_id: ProductId,
    pub stock_id: StockId,
    pub quantity: Decimal,
}

impl ProductStockRow {
    pub fn new(product_id: impl Into<String>, stock_id: impl Into<String>, quantity: Decimal) -> Self {
        Self {
            product_id: product_id.into(),
            stock_id: stock_id.into(),
            quantity,
        }
    }
}

/// Recipe entry as sent by clients: stock named by id or item name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
pub struct RecipeLine {
    #[validate(length(min = 1, message = "stock_item is required"))]
    #[schema(example = "Full cream milk")]
    pub stock_item: String,
    /// Stock used per unit sold; 0 removes the ingredient on update
    #[schema(value_type = String, example = "0.25")]
    pub quantity: Decimal,
}

/// New catalog product (POST /product)
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewProduct {
    #[validate(length(min = 1, message = "name is required"))]
    #[schema(example = "Flat white")]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[schema(value_type = String, example = "33.00")]
    pub price: Decimal,
    #[serde(default)]
    #[validate(nested)]
    pub ingredients: Vec<RecipeLine>,
}

/// Product with its recipe resolved to stock ids, ready to insert
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDraft {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub recipe: Vec<(StockId, Decimal)>,
}

/// Partial update of a product row
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct ProductUpdate {
    #[validate(length(min = 1, message = "name cannot be empty"))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[schema(value_type = Option<String>)]
    pub price: Option<Decimal>,
}

impl ProductUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.price.is_none()
    }

    pub fn apply(&self, row: &mut Product) {
        if let Some(name) = &self.name {
            row.name = name.clone();
        }
        if let Some(description) = &self.description {
            row.description = Some(description.clone());
        }
        if let Some(price) = self.price {
            row.price = price;
        }
    }
}

/// One ingredient of a product, with the stock row's name and unit
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Ingredient {
    pub stock_id: StockId,
    #[schema(example = "Full cream milk")]
    pub item: String,
    #[schema(example = "l")]
    pub unit_type: String,
    #[schema(value_type = String, example = "0.25")]
    pub quantity: Decimal,
}

/// Catalog product with its recipe
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub ingredients: Vec<Ingredient>,
}

// ============================================================================
// Stock
// ============================================================================

/// Ingredient stock row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct StockItem {
    pub id: StockId,
    #[schema(example = "Full cream milk")]
    pub item: String,
    #[schema(value_type = String, example = "12.5")]
    pub quantity: Decimal,
    #[schema(example = "l")]
    pub unit_type: String,
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "20")]
    pub max_capacity: Option<Decimal>,
}

/// New stock item (POST /stock)
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewStockItem {
    #[validate(length(min = 1, message = "item is required"))]
    pub item: String,
    #[schema(value_type = String)]
    pub quantity: Decimal,
    #[validate(length(min = 1, message = "unit_type is required"))]
    pub unit_type: String,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub max_capacity: Option<Decimal>,
}

impl NewStockItem {
    /// Quantities rounded to the stored scale and range-checked
    pub fn normalized(&self) -> Result<Self, InventoryError> {
        Ok(Self {
            quantity: stored_quantity("quantity", self.quantity)?,
            max_capacity: self
                .max_capacity
                .map(|v| stored_quantity("max_capacity", v))
                .transpose()?,
            ..self.clone()
        })
    }
}

/// Partial update of a stock row. Absent fields are left as they are.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct StockUpdate {
    pub item: Option<String>,
    #[schema(value_type = Option<String>)]
    pub quantity: Option<Decimal>,
    pub unit_type: Option<String>,
    #[schema(value_type = Option<String>)]
    pub max_capacity: Option<Decimal>,
}

impl StockUpdate {
    pub fn is_empty(&self) -> bool {
        self.item.is_none()
            && self.quantity.is_none()
            && self.unit_type.is_none()
            && self.max_capacity.is_none()
    }

    pub fn normalized(&self) -> Result<Self, InventoryError> {
        Ok(Self {
            quantity: self
                .quantity
                .map(|v| stored_quantity("quantity", v))
                .transpose()?,
            max_capacity: self
                .max_capacity
                .map(|v| stored_quantity("max_capacity", v))
                .transpose()?,
            ..self.clone()
        })
    }

    /// Apply to an in-memory row
    pub fn apply(&self, row: &mut StockItem) {
        if let Some(item) = &self.item {
            row.item = item.clone();
        }
        if let Some(quantity) = self.quantity {
            row.quantity = quantity;
        }
        if let Some(unit_type) = &self.unit_type {
            row.unit_type = unit_type.clone();
        }
        if let Some(max_capacity) = self.max_capacity {
            row.max_capacity = Some(max_capacity);
        }
    }
}

/// Who asked for a manual stock change, and why
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdjustmentNote {
    pub reference: Option<String>,
    pub user_id: UserId,
}

/// Quantity delta a stock update produces, if any.
///
/// A quantity change must carry a non-empty reference.
pub fn quantity_delta(
    current: &StockItem,
    update: &StockUpdate,
    note: &AdjustmentNote,
) -> Result<Option<Decimal>, InventoryError> {
    let Some(new_qty) = update.quantity.filter(|q| *q != current.quantity) else {
        return Ok(None);
    };
    let has_reference = note
        .reference
        .as_deref()
        .is_some_and(|r| !r.trim().is_empty());
    if !has_reference {
        return Err(InventoryError::ReferenceRequired);
    }
    Ok(Some(new_qty - current.quantity))
}

/// Origin of a stock adjustment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceType {
    User,
    Order,
}

impl ReferenceType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Order => "order",
        }
    }
}

impl std::str::FromStr for ReferenceType {
    type Err = InventoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "order" => Ok(Self::Order),
            other => Err(InventoryError::Corrupt(format!(
                "unknown reference_type '{}'",
                other
            ))),
        }
    }
}

/// Stock audit log entry
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct StockAdjustment {
    pub stock_id: StockId,
    #[schema(value_type = String, example = "-0.5")]
    pub adjustment_qty: Decimal,
    pub reference: Option<String>,
    pub reference_type: ReferenceType,
    pub reference_id: String,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Orders
// ============================================================================

/// Order status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Paid,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Cancelled => "cancelled",
        }
    }

    /// Orders leave `pending` once, to `paid` or `cancelled`.
    pub fn can_become(self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Paid) | (Self::Pending, Self::Cancelled)
        )
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = InventoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(InventoryError::Corrupt(format!(
                "unknown order status '{}'",
                other
            ))),
        }
    }
}

/// One resolved order line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub quantity: Units,
}

/// Order ready to be committed. Lines hold distinct products.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub custom: Option<serde_json::Value>,
    pub lines: Vec<OrderLine>,
}

/// Committed order
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Order {
    #[schema(value_type = String)]
    pub id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatus,
    #[schema(value_type = Option<Object>)]
    pub custom: Option<serde_json::Value>,
    pub lines: Vec<OrderLine>,
    pub created_at: DateTime<Utc>,
    /// Last status change
    pub updated_at: Option<DateTime<Utc>>,
}

/// Order listing criteria. Date bounds apply to `created_at`.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub user_id: Option<UserId>,
    /// Inclusive lower bound
    pub created_from: Option<DateTime<Utc>>,
    /// Exclusive upper bound
    pub created_before: Option<DateTime<Utc>>,
    pub newest_first: bool,
    pub offset: u32,
    /// No limit when `None`
    pub limit: Option<u32>,
}

impl OrderFilter {
    pub fn matches(&self, order: &Order) -> bool {
        self.status.is_none_or(|s| order.status == s)
            && self.user_id.as_ref().is_none_or(|u| order.user_id == *u)
            && self.created_from.is_none_or(|t| order.created_at >= t)
            && self.created_before.is_none_or(|t| order.created_at < t)
    }
}

/// One page of orders plus the counts an admin view shows
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct OrderPage {
    pub orders: Vec<Order>,
    /// All orders in the store
    pub total: u64,
    /// Orders matching the filter, before paging
    pub filtered: u64,
}

/// Total stock an order consumes, per stock id, in first-reference order.
///
/// Reads the same [`IngredientUsage`] snapshot the allocator uses, so a
/// repeated (product, stock) row counts once in both places.
pub fn stock_demand(lines: &[OrderLine], usage: &IngredientUsage) -> Vec<(StockId, Decimal)> {
    let mut index: FxHashMap<&str, usize> = FxHashMap::default();
    let mut demand: Vec<(StockId, Decimal)> = Vec::new();

    for line in lines {
        for (stock_id, per_unit) in usage.ingredients(&line.product_id) {
            if *per_unit <= Decimal::ZERO {
                continue;
            }
            let need = *per_unit * Decimal::from(line.quantity);
            match index.get(stock_id.as_str()) {
                Some(&at) => demand[at].1 += need,
                None => {
                    index.insert(stock_id.as_str(), demand.len());
                    demand.push((stock_id.clone(), need));
                }
            }
        }
    }
    demand
}

#[cfg(test)]
mod tests {
    use super::*;

    fn milk(quantity: Decimal) -> StockItem {
        StockItem {
            id: "milk".to_string(),
            item: "Milk".to_string(),
            quantity,
            unit_type: "l".to_string(),
            max_capacity: Some(Decimal::from(20)),
        }
    }

    fn note(reference: Option<&str>) -> AdjustmentNote {
        AdjustmentNote {
            reference: reference.map(str::to_string),
            user_id: "user-1".to_string(),
        }
    }

    #[test]
    fn test_quantity_change_requires_reference() {
        let current = milk(Decimal::from(10));
        let update = StockUpdate {
            quantity: Some(Decimal::from(7)),
            ..Default::default()
        };

        assert!(matches!(
            quantity_delta(&current, &update, &note(None)),
            Err(InventoryError::ReferenceRequired)
        ));
        assert!(matches!(
            quantity_delta(&current, &update, &note(Some("  "))),
            Err(InventoryError::ReferenceRequired)
        ));
        assert_eq!(
            quantity_delta(&current, &update, &note(Some("spillage"))).unwrap(),
            Some(Decimal::from(-3))
        );
    }

    #[test]
    fn test_unchanged_quantity_needs_no_reference() {
        let current = milk(Decimal::from(10));
        let update = StockUpdate {
            quantity: Some(Decimal::from(10)),
            unit_type: Some("ml".to_string()),
            ..Default::default()
        };
        assert_eq!(quantity_delta(&current, &update, &note(None)).unwrap(), None);
    }

    #[test]
    fn test_stock_update_apply_and_empty() {
        assert!(StockUpdate::default().is_empty());

        let mut row = milk(Decimal::from(10));
        StockUpdate {
            item: Some("Oat milk".to_string()),
            max_capacity: Some(Decimal::from(30)),
            ..Default::default()
        }
        .apply(&mut row);
        assert_eq!(row.item, "Oat milk");
        assert_eq!(row.quantity, Decimal::from(10));
        assert_eq!(row.max_capacity, Some(Decimal::from(30)));
    }

    #[test]
    fn test_stock_demand_sums_shared_ingredients() {
        let usage = vec![
            ProductStockRow::new("latte", "milk", Decimal::new(25, 2)),
            ProductStockRow::new("latte", "beans", Decimal::new(18, 3)),
            ProductStockRow::new("mocha", "milk", Decimal::new(20, 2)),
            ProductStockRow::new("mocha", "garnish", Decimal::ZERO),
        ];
        let lines = vec![
            OrderLine {
                product_id: "latte".to_string(),
                quantity: 2,
            },
            OrderLine {
                product_id: "mocha".to_string(),
                quantity: 5,
            },
        ];

        let demand = stock_demand(&lines, &IngredientUsage::from_rows(&usage));
        assert_eq!(
            demand,
            vec![
                ("milk".to_string(), Decimal::new(150, 2)),
                ("beans".to_string(), Decimal::new(36, 3)),
            ]
        );
    }

    #[test]
    fn test_stock_demand_counts_repeated_row_once() {
        let usage = vec![
            ProductStockRow::new("latte", "milk", Decimal::ONE),
            ProductStockRow::new("latte", "milk", Decimal::ONE),
        ];
        let lines = vec![OrderLine {
            product_id: "latte".to_string(),
            quantity: 4,
        }];
        assert_eq!(
            stock_demand(&lines, &IngredientUsage::from_rows(&usage)),
            vec![("milk".to_string(), Decimal::from(4))]
        );
    }

    #[test]
    fn test_stored_quantity_rounds_and_bounds() {
        assert_eq!(
            stored_quantity("quantity", Decimal::new(123456, 5)).unwrap(),
            Decimal::new(12346, 4)
        );
        assert_eq!(stored_quantity("quantity", MAX_QUANTITY).unwrap(), MAX_QUANTITY);
        assert!(matches!(
            stored_quantity("quantity", Decimal::MAX),
            Err(InventoryError::InvalidValue(_))
        ));
        assert!(matches!(
            stored_quantity("quantity", Decimal::new(-1, 5)),
            Err(InventoryError::InvalidValue(_))
        ));
        assert_eq!(MAX_QUANTITY.to_string(), "9999999999.9999");
        assert_eq!(MAX_PRICE.to_string(), "99999999.99");
        assert_eq!(stored_price(Decimal::new(35004, 3)).unwrap(), Decimal::new(3500, 2));
    }

    #[test]
    fn test_stock_update_normalized() {
        let update = StockUpdate {
            quantity: Some(Decimal::new(10126, 5)),
            max_capacity: Some(Decimal::from(20)),
            ..Default::default()
        };
        let normalized = update.normalized().unwrap();
        assert_eq!(normalized.quantity, Some(Decimal::new(1013, 4)));
        assert_eq!(normalized.max_capacity, Some(Decimal::from(20)));

        let huge = StockUpdate {
            max_capacity: Some(Decimal::MAX),
            ..Default::default()
        };
        assert!(huge.normalized().is_err());
    }

    #[test]
    fn test_status_transitions() {
        assert!(OrderStatus::Pending.can_become(OrderStatus::Paid));
        assert!(OrderStatus::Pending.can_become(OrderStatus::Cancelled));
        assert!(!OrderStatus::Paid.can_become(OrderStatus::Cancelled));
        assert!(!OrderStatus::Cancelled.can_become(OrderStatus::Paid));
        assert!(!OrderStatus::Pending.can_become(OrderStatus::Pending));
    }

    #[test]
    fn test_order_filter_matches() {
        let created_at = Utc::now();
        let order = Order {
            id: OrderId::new_v4(),
            user_id: "user-1".to_string(),
            status: OrderStatus::Paid,
            custom: None,
            lines: vec![],
            created_at,
            updated_at: None,
        };
        assert!(OrderFilter::default().matches(&order));
        let paid_by_user = OrderFilter {
            status: Some(OrderStatus::Paid),
            user_id: Some("user-1".to_string()),
            created_from: Some(created_at),
            ..Default::default()
        };
        assert!(paid_by_user.matches(&order));
        let before = OrderFilter {
            created_before: Some(created_at),
            ..Default::default()
        };
        assert!(!before.matches(&order));
        let pending = OrderFilter {
            status: Some(OrderStatus::Pending),
            ..Default::default()
        };
        assert!(!pending.matches(&order));
    }

    #[test]
    fn test_status_round_trip_strings() {
        for status in [OrderStatus::Pending, OrderStatus::Paid, OrderStatus::Cancelled] {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
        assert!("shipped".parse::<OrderStatus>().is_err());
        assert_eq!("order".parse::<ReferenceType>().unwrap(), ReferenceType::Order);
    }
}
