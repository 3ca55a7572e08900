use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::allocation::{
    AllocationReport, IngredientUsage, ProductRequest, ResolvedRequest, StockLevel, allocate,
    distinct_products, resolve,
};
use crate::core_types::{OrderId, ProductId};
use crate::inventory::{
    InventoryError, InventoryRepository, NewOrder, Order, OrderFilter, OrderLine, OrderPage,
    OrderStatus,
};

use super::error::OrderError;

pub struct OrderService {
    inventory: Arc<dyn InventoryRepository>,
}

impl OrderService {
    pub fn new(inventory: Arc<dyn InventoryRepository>) -> Self {
        Self { inventory }
    }

    /// Check how much of each requested line current stock can cover. Read-only.
    pub async fn validate_order(
        &self,
        requests: &[ProductRequest],
    ) -> Result<AllocationReport, OrderError> {
        check_requests(requests)?;
        let (_, report) = self.preflight(requests).await?;
        Ok(report)
    }

    /// Validate, then commit the order and deduct stock atomically.
    pub async fn create_order(
        &self,
        user_id: &str,
        requests: &[ProductRequest],
        custom: Option<serde_json::Value>,
    ) -> Result<Order, OrderError> {
        check_requests(requests)?;
        let (resolved, report) = self.preflight(requests).await?;
        if !report.all_ok {
            tracing::info!(
                user_id = %user_id,
                lines = requests.len(),
                "Order rejected: insufficient stock"
            );
            return Err(OrderError::InsufficientStock(report.adjustments));
        }

        let new_order = NewOrder {
            user_id: user_id.to_string(),
            custom,
            lines: merge_lines(&resolved),
        };
        let order = self.inventory.create_order(&new_order).await?;
        tracing::info!(order_id = %order.id, user_id = %user_id, "Order created");
        Ok(order)
    }

    pub async fn get_order(&self, order_id: OrderId) -> Result<Order, OrderError> {
        self.inventory
            .get_order(order_id)
            .await?
            .ok_or_else(|| InventoryError::OrderNotFound(order_id.to_string()).into())
    }

    pub async fn list_orders(&self, filter: &OrderFilter) -> Result<OrderPage, OrderError> {
        Ok(self.inventory.list_orders(filter).await?)
    }

    /// Cancel a pending order placed by `user_id` and put its stock back.
    pub async fn cancel_order(&self, order_id: OrderId, user_id: &str) -> Result<Order, OrderError> {
        let order = self.get_order(order_id).await?;
        if order.user_id != user_id {
            return Err(OrderError::NotOrderOwner(order_id.to_string()));
        }
        let order = self
            .inventory
            .transition_order(order_id, OrderStatus::Cancelled)
            .await?;
        tracing::info!(order_id = %order.id, user_id = %user_id, "Order cancelled");
        Ok(order)
    }

    /// Mark a pending order paid. Stock is untouched.
    pub async fn pay_order(&self, order_id: OrderId, user_id: &str) -> Result<Order, OrderError> {
        let order = self
            .inventory
            .transition_order(order_id, OrderStatus::Paid)
            .await?;
        tracing::info!(order_id = %order.id, user_id = %user_id, "Order paid");
        Ok(order)
    }

    /// Resolve identifiers, snapshot usage and stock, run the allocator.
    async fn preflight(
        &self,
        requests: &[ProductRequest],
    ) -> Result<(Vec<ResolvedRequest>, AllocationReport), OrderError> {
        let catalog = self.inventory.load_catalog().await?;
        let resolved = resolve(requests, &catalog)?;

        let product_ids = distinct_products(&resolved);
        let usage = IngredientUsage::from_rows(&self.inventory.load_usage(&product_ids).await?);
        let stock_ids = usage.referenced_stock(product_ids.iter().map(String::as_str));
        let stock = StockLevel::from_rows(&self.inventory.load_stock(&stock_ids).await?);

        let report = allocate(&resolved, &usage, &stock);
        tracing::debug!(
            products = product_ids.len(),
            stocks = stock_ids.len(),
            all_ok = report.all_ok,
            "Allocation computed"
        );
        Ok((resolved, report))
    }
}

fn check_requests(requests: &[ProductRequest]) -> Result<(), OrderError> {
    if requests.is_empty() {
        return Err(OrderError::InvalidParameter(
            "Products list is required".to_string(),
        ));
    }
    for (i, req) in requests.iter().enumerate() {
        if req.product.trim().is_empty() {
            return Err(OrderError::InvalidParameter(format!(
                "products[{}].product is required",
                i
            )));
        }
        if req.quantity == 0 {
            return Err(OrderError::InvalidParameter(format!(
                "products[{}].quantity must be at least 1",
                i
            )));
        }
    }
    Ok(())
}

/// One line per distinct product, quantities summed, first-appearance order.
fn merge_lines(resolved: &[ResolvedRequest]) -> Vec<OrderLine> {
    let mut index: FxHashMap<&ProductId, usize> = FxHashMap::default();
    let mut lines: Vec<OrderLine> = Vec::new();
    for req in resolved {
        match index.get(&req.product_id) {
            Some(&at) => {
                let line = &mut lines[at];
                line.quantity = line.quantity.saturating_add(req.quantity);
            }
            None => {
                index.insert(&req.product_id, lines.len());
                lines.push(OrderLine {
                    product_id: req.product_id.clone(),
                    quantity: req.quantity,
                });
            }
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::AllocationError;
    use crate::inventory::{
        InventorySeed, MemoryInventory, Product, ProductStockRow, ReferenceType, StockItem,
    };
    use rust_decimal::Decimal;

    fn stock(id: &str, qty: i64) -> StockItem {
        StockItem {
            id: id.to_string(),
            item: id.to_string(),
            quantity: Decimal::from(qty),
            unit_type: "unit".to_string(),
            max_capacity: None,
        }
    }

    /// Scenario C: A uses 2 of X, B uses 1 of X, X = 5
    fn setup() -> (Arc<MemoryInventory>, OrderService) {
        let seed = InventorySeed {
            products: vec![
                Product::new("a", "Alpha", Decimal::from(10)),
                Product::new("b", "Bravo", Decimal::from(12)),
            ],
            stock: vec![stock("x", 5)],
            product_stock: vec![
                ProductStockRow::new("a", "x", Decimal::from(2)),
                ProductStockRow::new("b", "x", Decimal::ONE),
            ],
        };
        let store = Arc::new(MemoryInventory::from_seed(seed));
        let svc = OrderService::new(store.clone());
        (store, svc)
    }

    #[tokio::test]
    async fn test_validate_order_reduces_largest_consumer() {
        let (_, svc) = setup();
        let report = svc
            .validate_order(&[ProductRequest::new("a", 3), ProductRequest::new("Bravo", 3)])
            .await
            .unwrap();

        assert!(!report.all_ok);
        assert_eq!(report.adjustments[0].allowed, 1);
        assert_eq!(report.adjustments[1].allowed, 3);
        assert_eq!(report.adjustments[1].product, "Bravo");
        assert_eq!(report.adjustments[1].product_id, "b");
    }

    #[tokio::test]
    async fn test_input_checks() {
        let (_, svc) = setup();
        assert!(matches!(
            svc.validate_order(&[]).await,
            Err(OrderError::InvalidParameter(_))
        ));
        assert!(matches!(
            svc.validate_order(&[ProductRequest::new("a", 0)]).await,
            Err(OrderError::InvalidParameter(_))
        ));
        assert!(matches!(
            svc.validate_order(&[ProductRequest::new("  ", 1)]).await,
            Err(OrderError::InvalidParameter(_))
        ));
        assert!(matches!(
            svc.validate_order(&[ProductRequest::new("zulu", 1)]).await,
            Err(OrderError::Allocation(AllocationError::ProductNotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_create_order_rejects_infeasible() {
        let (store, svc) = setup();
        let err = svc
            .create_order("u1", &[ProductRequest::new("a", 3)], None)
            .await
            .unwrap_err();

        match err {
            OrderError::InsufficientStock(adjustments) => {
                assert_eq!(adjustments[0].requested, 3);
                assert_eq!(adjustments[0].allowed, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(
            store.get_stock("x").await.unwrap().unwrap().quantity,
            Decimal::from(5)
        );
    }

    #[tokio::test]
    async fn test_create_order_merges_duplicate_lines() {
        let (store, svc) = setup();
        let custom = serde_json::json!({ "table": 4 });
        let order = svc
            .create_order(
                "u1",
                &[
                    ProductRequest::new("b", 1),
                    ProductRequest::new("a", 1),
                    ProductRequest::new("Bravo", 2),
                ],
                Some(custom.clone()),
            )
            .await
            .unwrap();

        assert_eq!(
            order.lines,
            vec![
                OrderLine {
                    product_id: "b".to_string(),
                    quantity: 3
                },
                OrderLine {
                    product_id: "a".to_string(),
                    quantity: 1
                },
            ]
        );
        assert_eq!(order.custom, Some(custom));
        assert_eq!(
            store.get_stock("x").await.unwrap().unwrap().quantity,
            Decimal::ZERO
        );

        let log = store.list_adjustments(Some("x")).await.unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].adjustment_qty, Decimal::from(-5));
        assert_eq!(log[0].reference_type, ReferenceType::Order);
    }

    #[tokio::test]
    async fn test_cancel_is_owner_only_and_restores_stock() {
        let (store, svc) = setup();
        let order = svc
            .create_order("u1", &[ProductRequest::new("a", 2)], None)
            .await
            .unwrap();

        assert!(matches!(
            svc.cancel_order(order.id, "u2").await,
            Err(OrderError::NotOrderOwner(_))
        ));
        assert_eq!(
            store.get_stock("x").await.unwrap().unwrap().quantity,
            Decimal::ONE
        );

        let cancelled = svc.cancel_order(order.id, "u1").await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(
            store.get_stock("x").await.unwrap().unwrap().quantity,
            Decimal::from(5)
        );

        assert!(matches!(
            svc.pay_order(order.id, "u1").await,
            Err(OrderError::Inventory(InventoryError::InvalidStatusTransition { .. }))
        ));
    }

    #[tokio::test]
    async fn test_pay_and_list_orders() {
        let (_, svc) = setup();
        let first = svc
            .create_order("u1", &[ProductRequest::new("b", 1)], None)
            .await
            .unwrap();
        svc.create_order("u2", &[ProductRequest::new("b", 1)], None)
            .await
            .unwrap();

        let paid = svc.pay_order(first.id, "u2").await.unwrap();
        assert_eq!(paid.status, OrderStatus::Paid);
        assert!(paid.updated_at.is_some());

        let page = svc
            .list_orders(&OrderFilter {
                status: Some(OrderStatus::Pending),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.filtered, 1);
        assert_eq!(page.orders[0].user_id, "u2");

        assert!(matches!(
            svc.get_order(uuid::Uuid::new_v4()).await,
            Err(OrderError::Inventory(InventoryError::OrderNotFound(_)))
        ));
    }
}
