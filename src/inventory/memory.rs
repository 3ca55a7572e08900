//! In-memory inventory store
//!
//! Backs the test suite and demo mode (no `postgres_url` configured).
//! One lock guards all tables, so `create_order` and `update_stock` are atomic
//! with respect to each other just like the PostgreSQL transactions.

use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use serde::Deserialize;

use crate::allocation::IngredientUsage;
use crate::core_types::{OrderId, ProductId, StockId};

use super::error::InventoryError;
use super::models::{
    AdjustmentNote, NewOrder, NewStockItem, Order, OrderFilter, OrderPage, OrderStatus, Product,
    ProductDraft, ProductStockRow, ProductUpdate, ReferenceType, StockAdjustment, StockItem,
    StockUpdate, quantity_delta, stock_demand,
};
use super::repository::InventoryRepository;

/// Initial table contents, loadable from YAML
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InventorySeed {
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub stock: Vec<StockItem>,
    #[serde(default)]
    pub product_stock: Vec<ProductStockRow>,
}

impl InventorySeed {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read seed file: {}", path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse seed file: {}", path.display()))
    }
}

#[derive(Debug, Default)]
struct Tables {
    products: Vec<Product>,
    stock: Vec<StockItem>,
    product_stock: Vec<ProductStockRow>,
    orders: Vec<Order>,
    adjustments: Vec<StockAdjustment>,
    next_stock_id: u64,
    next_product_id: u64,
}

impl Tables {
    fn stock_mut(&mut self, stock_id: &str) -> Option<&mut StockItem> {
        self.stock.iter_mut().find(|s| s.id == stock_id)
    }

    fn ensure_stock(&self, recipe: &[(StockId, Decimal)]) -> Result<(), InventoryError> {
        match recipe
            .iter()
            .find(|(sid, _)| !self.stock.iter().any(|s| s.id == *sid))
        {
            Some((sid, _)) => Err(InventoryError::StockNotFound(sid.clone())),
            None => Ok(()),
        }
    }

    /// Set one recipe entry in place; zero removes it. Repeated rows collapse
    /// into the first.
    fn set_usage(&mut self, product_id: &str, stock_id: &str, quantity: Decimal) {
        let mut kept = false;
        self.product_stock.retain_mut(|row| {
            if row.product_id != product_id || row.stock_id != stock_id {
                return true;
            }
            if kept || quantity.is_zero() {
                return false;
            }
            row.quantity = quantity;
            kept = true;
            true
        });
        if !kept && !quantity.is_zero() {
            self.product_stock
                .push(ProductStockRow::new(product_id, stock_id, quantity));
        }
    }

    /// Net stock an order took, per stock id, in log order
    fn order_deductions(&self, order_id: &str) -> Vec<(StockId, Decimal)> {
        let mut index: FxHashMap<&str, usize> = FxHashMap::default();
        let mut net: Vec<(StockId, Decimal)> = Vec::new();
        for adj in self
            .adjustments
            .iter()
            .filter(|a| a.reference_type == ReferenceType::Order && a.reference_id == order_id)
        {
            match index.get(adj.stock_id.as_str()) {
                Some(&at) => net[at].1 += adj.adjustment_qty,
                None => {
                    index.insert(adj.stock_id.as_str(), net.len());
                    net.push((adj.stock_id.clone(), adj.adjustment_qty));
                }
            }
        }
        net
    }
}

/// In-memory [`InventoryRepository`]
#[derive(Debug, Default)]
pub struct MemoryInventory {
    tables: RwLock<Tables>,
}

impl MemoryInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: InventorySeed) -> Self {
        Self {
            tables: RwLock::new(Tables {
                products: seed.products,
                stock: seed.stock,
                product_stock: seed.product_stock,
                ..Default::default()
            }),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, InventoryError> {
        self.tables
            .read()
            .map_err(|_| InventoryError::Unavailable("inventory lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, InventoryError> {
        self.tables
            .write()
            .map_err(|_| InventoryError::Unavailable("inventory lock poisoned".to_string()))
    }
}

#[async_trait]
impl InventoryRepository for MemoryInventory {
    async fn health_check(&self) -> Result<(), InventoryError> {
        self.read().map(|_| ())
    }

    async fn load_catalog(&self) -> Result<Vec<Product>, InventoryError> {
        Ok(self.read()?.products.clone())
    }

    async fn load_usage(
        &self,
        product_ids: &[ProductId],
    ) -> Result<Vec<ProductStockRow>, InventoryError> {
        Ok(self
            .read()?
            .product_stock
            .iter()
            .filter(|row| product_ids.contains(&row.product_id))
            .cloned()
            .collect())
    }

    async fn create_product(&self, draft: &ProductDraft) -> Result<Product, InventoryError> {
        let mut tables = self.write()?;
        tables.ensure_stock(&draft.recipe)?;

        tables.next_product_id += 1;
        let product = Product {
            id: format!("product-{}", tables.next_product_id),
            name: draft.name.clone(),
            description: draft.description.clone(),
            price: draft.price,
        };
        for (stock_id, quantity) in &draft.recipe {
            tables.set_usage(&product.id, stock_id, *quantity);
        }
        tables.products.push(product.clone());
        Ok(product)
    }

    async fn update_product(
        &self,
        product_id: &str,
        update: &ProductUpdate,
        recipe: &[(StockId, Decimal)],
    ) -> Result<Product, InventoryError> {
        let mut tables = self.write()?;
        tables.ensure_stock(recipe)?;

        let row = tables
            .products
            .iter_mut()
            .find(|p| p.id == product_id)
            .ok_or_else(|| InventoryError::ProductNotFound(product_id.to_string()))?;
        update.apply(row);
        let updated = row.clone();

        for (stock_id, quantity) in recipe {
            tables.set_usage(product_id, stock_id, *quantity);
        }
        Ok(updated)
    }

    async fn load_stock(&self, stock_ids: &[StockId]) -> Result<Vec<StockItem>, InventoryError> {
        Ok(self
            .read()?
            .stock
            .iter()
            .filter(|row| stock_ids.contains(&row.id))
            .cloned()
            .collect())
    }

    async fn list_stock(&self) -> Result<Vec<StockItem>, InventoryError> {
        let mut rows = self.read()?.stock.clone();
        rows.sort_by(|a, b| a.item.cmp(&b.item));
        Ok(rows)
    }

    async fn get_stock(&self, stock_id: &str) -> Result<Option<StockItem>, InventoryError> {
        Ok(self.read()?.stock.iter().find(|s| s.id == stock_id).cloned())
    }

    async fn create_stock(&self, new: &NewStockItem) -> Result<StockItem, InventoryError> {
        let new = new.normalized()?;
        let mut tables = self.write()?;
        if tables.stock.iter().any(|s| s.item == new.item) {
            return Err(InventoryError::StockAlreadyExists(new.item.clone()));
        }

        tables.next_stock_id += 1;
        let row = StockItem {
            id: format!("stock-{}", tables.next_stock_id),
            item: new.item.clone(),
            quantity: new.quantity,
            unit_type: new.unit_type.clone(),
            max_capacity: new.max_capacity,
        };
        tables.stock.push(row.clone());
        Ok(row)
    }

    async fn update_stock(
        &self,
        stock_id: &str,
        update: &StockUpdate,
        note: &AdjustmentNote,
    ) -> Result<StockItem, InventoryError> {
        let update = &update.normalized()?;
        let mut tables = self.write()?;

        let renamed_onto_existing = update
            .item
            .as_ref()
            .is_some_and(|name| tables.stock.iter().any(|s| s.item == *name && s.id != stock_id));
        if renamed_onto_existing {
            return Err(InventoryError::StockAlreadyExists(
                update.item.clone().unwrap_or_default(),
            ));
        }

        let row = tables
            .stock_mut(stock_id)
            .ok_or_else(|| InventoryError::StockNotFound(stock_id.to_string()))?;

        let delta = quantity_delta(row, update, note)?;
        update.apply(row);
        let updated = row.clone();

        if let Some(adjustment_qty) = delta {
            tables.adjustments.push(StockAdjustment {
                stock_id: updated.id.clone(),
                adjustment_qty,
                reference: note.reference.clone(),
                reference_type: ReferenceType::User,
                reference_id: note.user_id.clone(),
                created_at: Utc::now(),
            });
        }
        Ok(updated)
    }

    async fn delete_stock(&self, stock_id: &str) -> Result<StockItem, InventoryError> {
        let mut tables = self.write()?;
        let at = tables
            .stock
            .iter()
            .position(|s| s.id == stock_id)
            .ok_or_else(|| InventoryError::StockNotFound(stock_id.to_string()))?;
        if tables.product_stock.iter().any(|row| row.stock_id == stock_id) {
            return Err(InventoryError::StockInUse(stock_id.to_string()));
        }

        let removed = tables.stock.remove(at);
        tables.adjustments.retain(|a| a.stock_id != stock_id);
        Ok(removed)
    }

    async fn list_adjustments(
        &self,
        stock_id: Option<&str>,
    ) -> Result<Vec<StockAdjustment>, InventoryError> {
        Ok(self
            .read()?
            .adjustments
            .iter()
            .rev()
            .filter(|a| stock_id.is_none_or(|sid| a.stock_id == sid))
            .cloned()
            .collect())
    }

    async fn create_order(&self, order: &NewOrder) -> Result<Order, InventoryError> {
        let mut tables = self.write()?;
        let usage = IngredientUsage::from_rows(&tables.product_stock);
        let demand = stock_demand(&order.lines, &usage);

        // Check everything before touching anything
        for (stock_id, need) in &demand {
            let available = tables
                .stock
                .iter()
                .find(|s| s.id == *stock_id)
                .map(|s| s.quantity)
                .unwrap_or_default();
            if *need > available {
                return Err(InventoryError::InsufficientStock {
                    stock_id: stock_id.clone(),
                });
            }
        }

        let committed = Order {
            id: OrderId::new_v4(),
            user_id: order.user_id.clone(),
            status: OrderStatus::Pending,
            custom: order.custom.clone(),
            lines: order.lines.clone(),
            created_at: Utc::now(),
            updated_at: None,
        };

        for (stock_id, need) in demand {
            if let Some(row) = tables.stock_mut(&stock_id) {
                row.quantity -= need;
            }
            tables.adjustments.push(StockAdjustment {
                stock_id,
                adjustment_qty: -need,
                reference: None,
                reference_type: ReferenceType::Order,
                reference_id: committed.id.to_string(),
                created_at: committed.created_at,
            });
        }
        tables.orders.push(committed.clone());
        Ok(committed)
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>, InventoryError> {
        Ok(self.read()?.orders.iter().find(|o| o.id == order_id).cloned())
    }

    async fn list_orders(&self, filter: &OrderFilter) -> Result<OrderPage, InventoryError> {
        let tables = self.read()?;
        let mut matching: Vec<Order> = tables
            .orders
            .iter()
            .filter(|o| filter.matches(o))
            .cloned()
            .collect();
        matching.sort_by_key(|o| o.created_at);
        if filter.newest_first {
            matching.reverse();
        }

        let filtered = matching.len() as u64;
        let orders = matching
            .into_iter()
            .skip(filter.offset as usize)
            .take(filter.limit.map_or(usize::MAX, |l| l as usize))
            .collect();
        Ok(OrderPage {
            orders,
            total: tables.orders.len() as u64,
            filtered,
        })
    }

    async fn transition_order(
        &self,
        order_id: OrderId,
        next: OrderStatus,
    ) -> Result<Order, InventoryError> {
        let mut tables = self.write()?;
        let key = order_id.to_string();

        let current = tables
            .orders
            .iter()
            .find(|o| o.id == order_id)
            .map(|o| o.status)
            .ok_or_else(|| InventoryError::OrderNotFound(key.clone()))?;
        if !current.can_become(next) {
            return Err(InventoryError::InvalidStatusTransition {
                order_id: key,
                from: current,
                to: next,
            });
        }

        let now = Utc::now();
        if next == OrderStatus::Cancelled {
            for (stock_id, taken) in tables.order_deductions(&key) {
                if taken.is_zero() {
                    continue;
                }
                if let Some(row) = tables.stock_mut(&stock_id) {
                    row.quantity -= taken;
                }
                tables.adjustments.push(StockAdjustment {
                    stock_id,
                    adjustment_qty: -taken,
                    reference: Some("Order cancelled".to_string()),
                    reference_type: ReferenceType::Order,
                    reference_id: key.clone(),
                    created_at: now,
                });
            }
        }

        let order = tables
            .orders
            .iter_mut()
            .find(|o| o.id == order_id)
            .ok_or_else(|| InventoryError::OrderNotFound(key.clone()))?;
        order.status = next;
        order.updated_at = Some(now);
        Ok(order.clone())
    }
}
