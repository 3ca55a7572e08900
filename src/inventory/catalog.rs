//! Catalog queries: products with recipes, and availability

use std::sync::Arc;

use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use tracing::info;

use crate::allocation::{
    AllocationError, IngredientUsage, ProductAvailability, StockLevel, catalog_availability,
    resolve_identifier,
};
use crate::core_types::{ProductId, StockId};

use super::error::InventoryError;
use super::models::{
    Ingredient, NewProduct, Product, ProductDetail, ProductDraft, ProductUpdate, RecipeLine,
    StockItem, stored_price, stored_quantity,
};
use super::repository::InventoryRepository;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error(transparent)]
    Allocation(#[from] AllocationError),

    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error("Stock items not found: {}", .0.join(", "))]
    StockItemsNotFound(Vec<String>),
}

/// Result of a product update. Recipe lines naming unknown stock are
/// skipped and reported back instead of failing the update.
#[derive(Debug, Clone)]
pub struct ProductUpdated {
    pub product: ProductDetail,
    pub missing_stock_items: Vec<String>,
}

/// Stock rows keyed by id, exact item name and case-folded item name
struct StockIndex {
    rows: Vec<StockItem>,
    by_id: FxHashMap<String, usize>,
    by_item: FxHashMap<String, usize>,
    by_folded: FxHashMap<String, usize>,
}

impl StockIndex {
    fn new(rows: Vec<StockItem>) -> Self {
        let mut by_id = FxHashMap::default();
        let mut by_item = FxHashMap::default();
        let mut by_folded = FxHashMap::default();
        for (idx, row) in rows.iter().enumerate() {
            by_id.insert(row.id.clone(), idx);
            by_item.entry(row.item.clone()).or_insert(idx);
            by_folded.entry(fold(&row.item)).or_insert(idx);
        }
        Self {
            rows,
            by_id,
            by_item,
            by_folded,
        }
    }

    fn find(&self, stock_item: &str) -> Option<&StockItem> {
        self.by_id
            .get(stock_item)
            .or_else(|| self.by_item.get(stock_item))
            .or_else(|| self.by_folded.get(&fold(stock_item)))
            .map(|&idx| &self.rows[idx])
    }

    /// Split recipe lines into resolved `(stock id, quantity)` pairs and the
    /// names that matched no stock row. `positive` rejects zero quantities.
    fn resolve(
        &self,
        lines: &[RecipeLine],
        positive: bool,
    ) -> Result<(Vec<(StockId, Decimal)>, Vec<String>), InventoryError> {
        let mut recipe = Vec::with_capacity(lines.len());
        let mut missing = Vec::new();
        for line in lines {
            let quantity = stored_quantity("ingredient quantity", line.quantity)?;
            if positive && quantity.is_zero() {
                return Err(InventoryError::InvalidValue(format!(
                    "ingredient quantity for {} must be positive",
                    line.stock_item
                )));
            }
            match self.find(&line.stock_item) {
                Some(stock) => recipe.push((stock.id.clone(), quantity)),
                None => missing.push(line.stock_item.clone()),
            }
        }
        Ok((recipe, missing))
    }
}

fn fold(item: &str) -> String {
    item.trim().to_lowercase()
}

fn product_name(name: &str) -> Result<String, InventoryError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(InventoryError::InvalidValue("name cannot be empty".to_string()));
    }
    Ok(name.to_string())
}

pub struct CatalogService {
    inventory: Arc<dyn InventoryRepository>,
}

impl CatalogService {
    pub fn new(inventory: Arc<dyn InventoryRepository>) -> Self {
        Self { inventory }
    }

    /// Every product with its recipe, in catalog order
    pub async fn list_products(&self) -> Result<Vec<ProductDetail>, CatalogError> {
        let catalog = self.inventory.load_catalog().await?;
        self.details(catalog).await
    }

    /// One product by id or exact name
    pub async fn get_product(&self, identifier: &str) -> Result<ProductDetail, CatalogError> {
        let catalog = self.inventory.load_catalog().await?;
        let product = resolve_identifier(identifier, &catalog)?.clone();
        self.detail(product).await
    }

    /// Create a product. Every ingredient must name an existing stock item
    /// and use a positive quantity.
    pub async fn create_product(&self, new: &NewProduct) -> Result<ProductDetail, CatalogError> {
        let name = product_name(&new.name)?;
        let price = stored_price(new.price)?;

        let stock = StockIndex::new(self.inventory.list_stock().await?);
        let (recipe, missing) = stock.resolve(&new.ingredients, true)?;
        if !missing.is_empty() {
            return Err(CatalogError::StockItemsNotFound(missing));
        }

        let draft = ProductDraft {
            name,
            description: new.description.clone(),
            price,
            recipe,
        };
        let product = self.inventory.create_product(&draft).await?;
        info!(product_id = %product.id, name = %product.name, ingredients = draft.recipe.len(), "Product created");
        self.detail(product).await
    }

    /// Update fields and recipe of the product named by id or exact name
    pub async fn update_product(
        &self,
        identifier: &str,
        update: &ProductUpdate,
        ingredients: &[RecipeLine],
    ) -> Result<ProductUpdated, CatalogError> {
        if update.is_empty() && ingredients.is_empty() {
            return Err(InventoryError::NoFieldsToUpdate.into());
        }

        let catalog = self.inventory.load_catalog().await?;
        let product_id = resolve_identifier(identifier, &catalog)?.id.clone();

        let update = ProductUpdate {
            name: update.name.as_deref().map(product_name).transpose()?,
            description: update.description.clone(),
            price: update.price.map(stored_price).transpose()?,
        };

        let (recipe, missing_stock_items) = if ingredients.is_empty() {
            (Vec::new(), Vec::new())
        } else {
            let stock = StockIndex::new(self.inventory.list_stock().await?);
            stock.resolve(ingredients, false)?
        };

        let product = self
            .inventory
            .update_product(&product_id, &update, &recipe)
            .await?;
        info!(
            product_id = %product.id,
            recipe_changes = recipe.len(),
            missing = missing_stock_items.len(),
            "Product updated"
        );

        Ok(ProductUpdated {
            product: self.detail(product).await?,
            missing_stock_items,
        })
    }

    /// Producible units for one product (by id or exact name) or the whole catalog.
    pub async fn availability(
        &self,
        product: Option<&str>,
    ) -> Result<Vec<ProductAvailability>, CatalogError> {
        let catalog = self.inventory.load_catalog().await?;
        let products = match product {
            Some(identifier) => vec![resolve_identifier(identifier, &catalog)?.clone()],
            None => catalog,
        };

        let product_ids: Vec<ProductId> = products.iter().map(|p| p.id.clone()).collect();
        let usage = IngredientUsage::from_rows(&self.inventory.load_usage(&product_ids).await?);
        let stock_ids = usage.referenced_stock(product_ids.iter().map(String::as_str));
        let stock = StockLevel::from_rows(&self.inventory.load_stock(&stock_ids).await?);

        Ok(catalog_availability(&products, &usage, &stock))
    }

    async fn detail(&self, product: Product) -> Result<ProductDetail, CatalogError> {
        let mut details = self.details(vec![product]).await?;
        details
            .pop()
            .ok_or_else(|| InventoryError::Corrupt("product detail missing".to_string()).into())
    }

    async fn details(&self, products: Vec<Product>) -> Result<Vec<ProductDetail>, CatalogError> {
        let product_ids: Vec<ProductId> = products.iter().map(|p| p.id.clone()).collect();
        let usage = IngredientUsage::from_rows(&self.inventory.load_usage(&product_ids).await?);
        let stock_ids = usage.referenced_stock(product_ids.iter().map(String::as_str));
        let stock: FxHashMap<StockId, StockItem> = self
            .inventory
            .load_stock(&stock_ids)
            .await?
            .into_iter()
            .map(|row| (row.id.clone(), row))
            .collect();

        Ok(products
            .into_iter()
            .map(|product| {
                let ingredients = usage
                    .ingredients(&product.id)
                    .iter()
                    .filter_map(|(stock_id, quantity)| {
                        stock.get(stock_id).map(|row| Ingredient {
                            stock_id: stock_id.clone(),
                            item: row.item.clone(),
                            unit_type: row.unit_type.clone(),
                            quantity: *quantity,
                        })
                    })
                    .collect();
                ProductDetail {
                    product,
                    ingredients,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::models::{Product, ProductStockRow, StockItem};
    use crate::inventory::{InventorySeed, MemoryInventory};

    fn service() -> CatalogService {
        let stock = |id: &str, item: &str, qty: i64| StockItem {
            id: id.to_string(),
            item: item.to_string(),
            quantity: Decimal::from(qty),
            unit_type: "unit".to_string(),
            max_capacity: None,
        };
        let seed = InventorySeed {
            products: vec![
                Product::new("latte", "Latte", Decimal::from(35)),
                Product::new("water", "Water", Decimal::from(10)),
            ],
            stock: vec![stock("milk", "Full cream milk", 3), stock("beans", "Beans", 100)],
            product_stock: vec![
                ProductStockRow::new("latte", "milk", Decimal::new(5, 1)),
                ProductStockRow::new("latte", "beans", Decimal::ONE),
            ],
        };
        CatalogService::new(Arc::new(MemoryInventory::from_seed(seed)))
    }

    fn line(stock_item: &str, quantity: Decimal) -> RecipeLine {
        RecipeLine {
            stock_item: stock_item.to_string(),
            quantity,
        }
    }

    fn new_product(name: &str, ingredients: Vec<RecipeLine>) -> NewProduct {
        NewProduct {
            name: name.to_string(),
            description: None,
            price: Decimal::new(3300, 2),
            ingredients,
        }
    }

    #[tokio::test]
    async fn test_whole_catalog() {
        let all = service().availability(None).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].available_units, Some(6));
        assert_eq!(all[0].limiting_stock_id.as_deref(), Some("milk"));
        assert_eq!(all[1].available_units, None);
    }

    #[tokio::test]
    async fn test_single_product_by_name() {
        let one = service().availability(Some("Latte")).await.unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].product_id, "latte");
    }

    #[tokio::test]
    async fn test_unknown_product() {
        assert!(matches!(
            service().availability(Some("Flat white")).await,
            Err(CatalogError::Allocation(AllocationError::ProductNotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_list_products_with_recipes() {
        let products = service().list_products().await.unwrap();
        assert_eq!(products.len(), 2);
        let latte = &products[0];
        assert_eq!(latte.product.id, "latte");
        assert_eq!(latte.ingredients.len(), 2);
        assert_eq!(latte.ingredients[0].item, "Full cream milk");
        assert_eq!(latte.ingredients[0].quantity, Decimal::new(5, 1));
        assert!(products[1].ingredients.is_empty());
    }

    #[tokio::test]
    async fn test_create_product_resolves_stock_by_id_or_item() {
        let svc = service();
        let created = svc
            .create_product(&new_product(
                "Flat white",
                vec![
                    line("beans", Decimal::new(2, 0)),
                    line("  full CREAM milk ", Decimal::new(123456, 5)),
                ],
            ))
            .await
            .unwrap();

        assert_eq!(created.product.name, "Flat white");
        let stock: Vec<_> = created
            .ingredients
            .iter()
            .map(|i| (i.stock_id.as_str(), i.quantity))
            .collect();
        assert_eq!(stock, vec![("beans", Decimal::from(2)), ("milk", Decimal::new(12346, 4))]);

        let fetched = svc.get_product("Flat white").await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_create_product_reports_every_missing_item() {
        let svc = service();
        let err = svc
            .create_product(&new_product(
                "Mocha",
                vec![
                    line("Cocoa", Decimal::ONE),
                    line("milk", Decimal::ONE),
                    line("Syrup", Decimal::ONE),
                ],
            ))
            .await
            .unwrap_err();
        match err {
            CatalogError::StockItemsNotFound(items) => assert_eq!(items, vec!["Cocoa", "Syrup"]),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(svc.list_products().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_create_product_rejects_zero_quantity_and_blank_name() {
        let svc = service();
        assert!(matches!(
            svc.create_product(&new_product("Mocha", vec![line("milk", Decimal::ZERO)]))
                .await,
            Err(CatalogError::Inventory(InventoryError::InvalidValue(_)))
        ));
        assert!(matches!(
            svc.create_product(&new_product("   ", Vec::new())).await,
            Err(CatalogError::Inventory(InventoryError::InvalidValue(_)))
        ));
    }

    #[tokio::test]
    async fn test_update_product_fields_and_recipe() {
        let svc = service();
        let update = ProductUpdate {
            price: Some(Decimal::new(37004, 3)),
            ..Default::default()
        };
        let updated = svc
            .update_product(
                "Latte",
                &update,
                &[
                    line("milk", Decimal::ZERO),
                    line("Beans", Decimal::new(15, 1)),
                    line("Oat milk", Decimal::ONE),
                ],
            )
            .await
            .unwrap();

        assert_eq!(updated.missing_stock_items, vec!["Oat milk"]);
        assert_eq!(updated.product.product.price, Decimal::new(3700, 2));
        assert_eq!(updated.product.ingredients.len(), 1);
        assert_eq!(updated.product.ingredients[0].stock_id, "beans");
        assert_eq!(updated.product.ingredients[0].quantity, Decimal::new(15, 1));
    }

    #[tokio::test]
    async fn test_update_product_needs_a_change() {
        let svc = service();
        assert!(matches!(
            svc.update_product("latte", &ProductUpdate::default(), &[]).await,
            Err(CatalogError::Inventory(InventoryError::NoFieldsToUpdate))
        ));

        let rename = ProductUpdate {
            name: Some("Cortado".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            svc.update_product("Flat white", &rename, &[]).await,
            Err(CatalogError::Allocation(AllocationError::ProductNotFound(_)))
        ));
    }
}
