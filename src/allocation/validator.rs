//! Stock-constrained order validation
//!
//! Computes how many units of each requested product the current ingredient
//! stock can support. Products compete for shared ingredients; whenever a
//! stock is oversubscribed the allocator takes one unit away from the product
//! contributing most to that stock's demand, and repeats until the demand fits
//! or nothing is left to take.
//!
//! The policy is greedy and deterministic, not globally optimal. The result is
//! advisory: order creation re-checks stock under a row lock.

use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use serde::Serialize;
use utoipa::ToSchema;

use crate::core_types::{ProductId, Units};
use crate::inventory::models::Product;

use super::error::AllocationError;
use super::snapshot::{IngredientUsage, ProductRequest, ResolvedRequest, StockLevel, resolve};

/// Feasibility of one requested line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Adjustment {
    /// Identifier as supplied in the request
    #[schema(example = "Latte")]
    pub product: String,
    pub product_id: ProductId,
    #[schema(example = 10)]
    pub requested: Units,
    #[schema(example = 4)]
    pub allowed: Units,
}

/// Result of a validation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct AllocationReport {
    #[serde(rename = "allOk")]
    pub all_ok: bool,
    pub adjustments: Vec<Adjustment>,
}

/// Resolve `requests` against `catalog` and allocate them against `stock`.
pub fn validate(
    requests: &[ProductRequest],
    catalog: &[Product],
    usage: &IngredientUsage,
    stock: &StockLevel,
) -> Result<AllocationReport, AllocationError> {
    let resolved = resolve(requests, catalog)?;
    Ok(allocate(&resolved, usage, stock))
}

/// Allocate already-resolved requests. Cannot fail.
///
/// Repeated lines for the same product share one pool: the pool starts at the
/// summed quantity and is handed back out line by line in request order.
pub fn allocate(
    resolved: &[ResolvedRequest],
    usage: &IngredientUsage,
    stock: &StockLevel,
) -> AllocationReport {
    let mut products: Vec<&str> = Vec::new();
    let mut allowed: FxHashMap<&str, Units> = FxHashMap::default();
    for req in resolved {
        let pool = allowed.entry(req.product_id.as_str()).or_insert_with(|| {
            products.push(req.product_id.as_str());
            0
        });
        *pool = pool.saturating_add(req.quantity);
    }

    for stock_id in usage.referenced_stock(products.iter().copied()) {
        let consumers: Vec<(&str, Decimal)> = products
            .iter()
            .map(|pid| (*pid, usage.per_unit(pid, &stock_id)))
            .filter(|(_, need)| *need > Decimal::ZERO)
            .collect();

        reduce_to_fit(&stock_id, &consumers, stock.available(&stock_id), &mut allowed);
    }

    let adjustments: Vec<Adjustment> = resolved
        .iter()
        .map(|req| {
            let pool = allowed.entry(req.product_id.as_str()).or_default();
            let granted = req.quantity.min(*pool);
            *pool -= granted;
            Adjustment {
                product: req.product.clone(),
                product_id: req.product_id.clone(),
                requested: req.quantity,
                allowed: granted,
            }
        })
        .collect();

    let all_ok = adjustments.iter().all(|a| a.allowed >= a.requested);
    AllocationReport {
        all_ok,
        adjustments,
    }
}

fn total_need(consumers: &[(&str, Decimal)], allowed: &FxHashMap<&str, Units>) -> Decimal {
    consumers
        .iter()
        .map(|(pid, need)| *need * Decimal::from(allowed.get(pid).copied().unwrap_or(0)))
        .sum()
}

/// Decrement the largest contributor one unit at a time until demand on this
/// stock fits. Ties go to the first consumer in product order.
fn reduce_to_fit<'a>(
    stock_id: &str,
    consumers: &[(&'a str, Decimal)],
    available: Decimal,
    allowed: &mut FxHashMap<&'a str, Units>,
) {
    let mut need = total_need(consumers, allowed);

    while need > available {
        let mut worst: Option<(&'a str, Decimal)> = None;
        for &(pid, per_unit) in consumers {
            let contribution = per_unit * Decimal::from(allowed.get(pid).copied().unwrap_or(0));
            if worst.is_none_or(|(_, top)| contribution > top) {
                worst = Some((pid, contribution));
            }
        }

        let Some((pid, _)) = worst else { break };
        let Some(units) = allowed.get_mut(pid).filter(|units| **units > 0) else {
            tracing::debug!(
                stock_id = %stock_id,
                need = %need,
                available = %available,
                "Stock oversubscribed with every consumer at zero"
            );
            break;
        };
        *units -= 1;
        need = total_need(consumers, allowed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: &str, name: &str) -> Product {
        Product::new(id, name, Decimal::new(3000, 2))
    }

    fn find<'r>(report: &'r AllocationReport, product_id: &str) -> &'r Adjustment {
        report
            .adjustments
            .iter()
            .find(|a| a.product_id == product_id)
            .expect("adjustment present")
    }

    #[test]
    fn test_ample_stock_allows_everything() {
        let catalog = vec![product("latte", "Latte")];
        let mut usage = IngredientUsage::new();
        usage.insert("latte", "milk", Decimal::ONE);
        let mut stock = StockLevel::new();
        stock.insert("milk", Decimal::from(100));

        let report = validate(&[ProductRequest::new("Latte", 5)], &catalog, &usage, &stock).unwrap();

        assert!(report.all_ok);
        assert_eq!(
            report.adjustments,
            vec![Adjustment {
                product: "Latte".to_string(),
                product_id: "latte".to_string(),
                requested: 5,
                allowed: 5,
            }]
        );
    }

    #[test]
    fn test_single_product_insufficient_stock() {
        let catalog = vec![product("latte", "Latte")];
        let mut usage = IngredientUsage::new();
        usage.insert("latte", "milk", Decimal::ONE);
        let mut stock = StockLevel::new();
        stock.insert("milk", Decimal::from(4));

        let report = validate(&[ProductRequest::new("latte", 10)], &catalog, &usage, &stock).unwrap();

        assert!(!report.all_ok);
        assert_eq!(report.adjustments[0].allowed, 4);
        assert_eq!(report.adjustments[0].requested, 10);
    }

    #[test]
    fn test_fractional_usage_floors_to_whole_units() {
        let catalog = vec![product("flat-white", "Flat White")];
        let mut usage = IngredientUsage::new();
        usage.insert("flat-white", "milk", Decimal::new(25, 2)); // 0.25 l per cup
        let mut stock = StockLevel::new();
        stock.insert("milk", Decimal::new(110, 2)); // 1.10 l

        let report =
            validate(&[ProductRequest::new("Flat White", 6)], &catalog, &usage, &stock).unwrap();
        assert_eq!(report.adjustments[0].allowed, 4);
    }

    #[test]
    fn test_shared_ingredient_reduces_largest_contributor() {
        // A: 2 milk/unit x3 = 6, B: 1 milk/unit x3 = 3, milk = 5
        // 9 > 5 -> A=2 (7) -> A=1 (5) fits
        let catalog = vec![product("a", "A"), product("b", "B")];
        let mut usage = IngredientUsage::new();
        usage.insert("a", "milk", Decimal::from(2));
        usage.insert("b", "milk", Decimal::ONE);
        let mut stock = StockLevel::new();
        stock.insert("milk", Decimal::from(5));

        let report = validate(
            &[ProductRequest::new("A", 3), ProductRequest::new("B", 3)],
            &catalog,
            &usage,
            &stock,
        )
        .unwrap();

        assert!(!report.all_ok);
        assert_eq!(find(&report, "a").allowed, 1);
        assert_eq!(find(&report, "b").allowed, 3);
    }

    #[test]
    fn test_equal_contribution_reduces_first_product() {
        let catalog = vec![product("a", "A"), product("b", "B")];
        let mut usage = IngredientUsage::new();
        usage.insert("a", "beans", Decimal::ONE);
        usage.insert("b", "beans", Decimal::ONE);
        let mut stock = StockLevel::new();
        stock.insert("beans", Decimal::from(3));

        let report = validate(
            &[ProductRequest::new("B", 2), ProductRequest::new("A", 2)],
            &catalog,
            &usage,
            &stock,
        )
        .unwrap();

        // B appears first, so it loses the tie
        assert_eq!(find(&report, "b").allowed, 1);
        assert_eq!(find(&report, "a").allowed, 2);
    }

    #[test]
    fn test_unknown_product_returns_no_report() {
        let catalog = vec![product("latte", "Latte")];
        let err = validate(
            &[ProductRequest::new("Latte", 1), ProductRequest::new("Chai", 1)],
            &catalog,
            &IngredientUsage::new(),
            &StockLevel::new(),
        )
        .unwrap_err();

        assert_eq!(err.to_string(), "Product not found: Chai");
    }

    #[test]
    fn test_negative_stock_is_irreducible() {
        let catalog = vec![product("a", "A"), product("b", "B")];
        let mut usage = IngredientUsage::new();
        usage.insert("a", "milk", Decimal::ONE);
        usage.insert("b", "milk", Decimal::ONE);
        let mut stock = StockLevel::new();
        stock.insert("milk", Decimal::from(-2));

        let report = validate(
            &[ProductRequest::new("A", 2), ProductRequest::new("B", 1)],
            &catalog,
            &usage,
            &stock,
        )
        .unwrap();

        assert!(!report.all_ok);
        assert!(report.adjustments.iter().all(|a| a.allowed == 0));
    }

    #[test]
    fn test_missing_stock_row_allows_nothing() {
        let catalog = vec![product("latte", "Latte")];
        let mut usage = IngredientUsage::new();
        usage.insert("latte", "milk", Decimal::ONE);

        let report = validate(
            &[ProductRequest::new("Latte", 3)],
            &catalog,
            &usage,
            &StockLevel::new(),
        )
        .unwrap();
        assert_eq!(report.adjustments[0].allowed, 0);
    }

    #[test]
    fn test_products_without_ingredients_are_unconstrained() {
        let catalog = vec![product("water", "Water"), product("latte", "Latte")];
        let mut usage = IngredientUsage::new();
        usage.insert("latte", "milk", Decimal::ONE);
        let mut stock = StockLevel::new();
        stock.insert("milk", Decimal::ZERO);
        // Stock with no consumer in the request
        stock.insert("syrup", Decimal::ZERO);

        let report = validate(
            &[ProductRequest::new("Water", 7), ProductRequest::new("Latte", 1)],
            &catalog,
            &usage,
            &stock,
        )
        .unwrap();

        assert_eq!(find(&report, "water").allowed, 7);
        assert_eq!(find(&report, "latte").allowed, 0);
    }

    #[test]
    fn test_multiple_ingredients_each_constrain() {
        let catalog = vec![product("mocha", "Mocha"), product("latte", "Latte")];
        let mut usage = IngredientUsage::new();
        usage.insert("mocha", "milk", Decimal::ONE);
        usage.insert("mocha", "chocolate", Decimal::ONE);
        usage.insert("latte", "milk", Decimal::ONE);
        let mut stock = StockLevel::new();
        stock.insert("milk", Decimal::from(10));
        stock.insert("chocolate", Decimal::from(2));

        let report = validate(
            &[ProductRequest::new("Mocha", 5), ProductRequest::new("Latte", 5)],
            &catalog,
            &usage,
            &stock,
        )
        .unwrap();

        assert_eq!(find(&report, "mocha").allowed, 2);
        assert_eq!(find(&report, "latte").allowed, 5);
    }

    #[test]
    fn test_duplicate_lines_share_one_pool() {
        let catalog = vec![product("latte", "Latte")];
        let mut usage = IngredientUsage::new();
        usage.insert("latte", "milk", Decimal::ONE);
        let mut stock = StockLevel::new();
        stock.insert("milk", Decimal::from(5));

        let report = validate(
            &[ProductRequest::new("Latte", 3), ProductRequest::new("latte", 4)],
            &catalog,
            &usage,
            &stock,
        )
        .unwrap();

        assert_eq!(report.adjustments[0].allowed, 3);
        assert_eq!(report.adjustments[1].allowed, 2);
        assert!(!report.all_ok);
    }

    #[test]
    fn test_stock_invariant_and_bounds_hold() {
        let catalog = vec![
            product("a", "A"),
            product("b", "B"),
            product("c", "C"),
        ];
        let mut usage = IngredientUsage::new();
        usage.insert("a", "milk", Decimal::new(15, 1));
        usage.insert("a", "beans", Decimal::ONE);
        usage.insert("b", "milk", Decimal::new(5, 1));
        usage.insert("c", "beans", Decimal::from(3));
        let mut stock = StockLevel::new();
        stock.insert("milk", Decimal::from(7));
        stock.insert("beans", Decimal::from(8));

        let requests = [
            ProductRequest::new("A", 4),
            ProductRequest::new("B", 6),
            ProductRequest::new("C", 3),
        ];
        let report = validate(&requests, &catalog, &usage, &stock).unwrap();

        for adj in &report.adjustments {
            assert!(adj.allowed <= adj.requested);
        }
        for stock_id in ["milk", "beans"] {
            let used: Decimal = report
                .adjustments
                .iter()
                .map(|a| usage.per_unit(&a.product_id, stock_id) * Decimal::from(a.allowed))
                .sum();
            assert!(used <= stock.available(stock_id), "{stock_id} oversold");
        }

        // Same snapshot, same answer
        assert_eq!(validate(&requests, &catalog, &usage, &stock).unwrap(), report);
    }

    #[test]
    fn test_report_json_shape() {
        let report = AllocationReport {
            all_ok: false,
            adjustments: vec![Adjustment {
                product: "Latte".to_string(),
                product_id: "latte".to_string(),
                requested: 10,
                allowed: 4,
            }],
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["allOk"], false);
        assert_eq!(json["adjustments"][0]["product_id"], "latte");
        assert_eq!(json["adjustments"][0]["allowed"], 4);
    }
}
