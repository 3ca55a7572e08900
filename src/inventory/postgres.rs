//! PostgreSQL inventory store
//!
//! Ids are UUID columns exposed as text. Schema: `sql/schema.sql`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool, Postgres, Row, Transaction};

use crate::allocation::IngredientUsage;
use crate::core_types::{OrderId, ProductId, StockId};

use super::error::InventoryError;
use super::models::{
    AdjustmentNote, NewOrder, NewStockItem, Order, OrderFilter, OrderLine, OrderPage, OrderStatus,
    Product, ProductDraft, ProductStockRow, ProductUpdate, ReferenceType, StockAdjustment,
    StockItem, StockUpdate, quantity_delta, stock_demand,
};
use super::repository::InventoryRepository;

const STOCK_COLUMNS: &str = "id::text AS id, item, quantity, unit_type, max_capacity";
const PRODUCT_COLUMNS: &str = "id::text AS id, name, description, price";
const ORDER_COLUMNS: &str = "id::text AS id, user_id, status, custom, created_at, updated_at";

/// Shared `WHERE` clause for order listing; binds $1..$4
const ORDER_FILTER: &str = r#"($1::text IS NULL OR status = $1)
      AND ($2::text IS NULL OR user_id = $2)
      AND ($3::timestamptz IS NULL OR created_at >= $3)
      AND ($4::timestamptz IS NULL OR created_at < $4)"#;

/// PostgreSQL-backed [`InventoryRepository`]
pub struct PgInventory {
    pool: PgPool,
}

impl PgInventory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_adjustment(
        tx: &mut Transaction<'_, Postgres>,
        stock_id: &str,
        adjustment_qty: Decimal,
        reference: Option<&str>,
        reference_type: ReferenceType,
        reference_id: &str,
    ) -> Result<(), InventoryError> {
        sqlx::query(
            r#"INSERT INTO stock_adjustments
                   (stock_id, adjustment_qty, reference, reference_type, reference_id)
               VALUES ($1::uuid, $2, $3, $4, $5)"#,
        )
        .bind(stock_id)
        .bind(adjustment_qty)
        .bind(reference)
        .bind(reference_type.as_str())
        .bind(reference_id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Insert or replace recipe entries; zero quantities delete the entry.
    async fn write_recipe(
        tx: &mut Transaction<'_, Postgres>,
        product_id: &str,
        recipe: &[(StockId, Decimal)],
    ) -> Result<(), InventoryError> {
        for (stock_id, quantity) in recipe {
            let result = if quantity.is_zero() {
                sqlx::query(
                    "DELETE FROM product_stock WHERE product_id::text = $1 AND stock_id::text = $2",
                )
                .bind(product_id)
                .bind(stock_id)
                .execute(&mut **tx)
                .await
            } else {
                sqlx::query(
                    r#"INSERT INTO product_stock (product_id, stock_id, quantity)
                       VALUES ($1::uuid, $2::uuid, $3)
                       ON CONFLICT (product_id, stock_id) DO UPDATE SET quantity = EXCLUDED.quantity"#,
                )
                .bind(product_id)
                .bind(stock_id)
                .bind(*quantity)
                .execute(&mut **tx)
                .await
            };
            result.map_err(|e| match e.as_database_error() {
                Some(db) if db.is_foreign_key_violation() => {
                    InventoryError::StockNotFound(stock_id.clone())
                }
                _ => InventoryError::Database(e),
            })?;
        }
        Ok(())
    }

    async fn fetch_lines(
        conn: &mut PgConnection,
        order_ids: &[String],
    ) -> Result<FxHashMap<String, Vec<OrderLine>>, InventoryError> {
        let rows = sqlx::query(
            r#"SELECT order_id::text AS order_id, product_id::text AS product_id, quantity
               FROM order_products WHERE order_id = ANY($1::text[]::uuid[])
               ORDER BY order_id, product_id"#,
        )
        .bind(order_ids)
        .fetch_all(&mut *conn)
        .await?;

        let mut lines: FxHashMap<String, Vec<OrderLine>> = FxHashMap::default();
        for r in &rows {
            let quantity: i32 = r.try_get("quantity")?;
            let line = OrderLine {
                product_id: r.try_get("product_id")?,
                quantity: u32::try_from(quantity).map_err(|_| {
                    InventoryError::Corrupt(format!("negative line quantity {}", quantity))
                })?,
            };
            lines
                .entry(r.try_get("order_id")?)
                .or_default()
                .push(line);
        }
        Ok(lines)
    }

    async fn fetch_order(
        conn: &mut PgConnection,
        order_id: OrderId,
    ) -> Result<Option<Order>, InventoryError> {
        let Some(row) = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1::uuid"
        ))
        .bind(order_id.to_string())
        .fetch_optional(&mut *conn)
        .await?
        else {
            return Ok(None);
        };

        let key = order_id.to_string();
        let mut lines = Self::fetch_lines(conn, std::slice::from_ref(&key)).await?;
        order_from_row(&row, lines.remove(&key).unwrap_or_default()).map(Some)
    }
}

fn order_from_row(row: &PgRow, lines: Vec<OrderLine>) -> Result<Order, InventoryError> {
    let id: String = row.try_get("id")?;
    Ok(Order {
        id: id
            .parse()
            .map_err(|_| InventoryError::Corrupt(format!("bad order id '{}'", id)))?,
        user_id: row.try_get("user_id")?,
        status: row.try_get::<String, _>("status")?.parse()?,
        custom: row.try_get("custom")?,
        lines,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl InventoryRepository for PgInventory {
    async fn health_check(&self) -> Result<(), InventoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn load_catalog(&self) -> Result<Vec<Product>, InventoryError> {
        let rows: Vec<Product> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY name, id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn load_usage(
        &self,
        product_ids: &[ProductId],
    ) -> Result<Vec<ProductStockRow>, InventoryError> {
        let rows: Vec<ProductStockRow> = sqlx::query_as(
            r#"SELECT product_id::text AS product_id, stock_id::text AS stock_id, quantity
               FROM product_stock
               WHERE product_id = ANY($1::text[]::uuid[])
               ORDER BY product_id, stock_id"#,
        )
        .bind(product_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn create_product(&self, draft: &ProductDraft) -> Result<Product, InventoryError> {
        let mut tx = self.pool.begin().await?;

        let product: Product = sqlx::query_as(&format!(
            r#"INSERT INTO products (name, description, price)
               VALUES ($1, $2, $3)
               RETURNING {PRODUCT_COLUMNS}"#
        ))
        .bind(&draft.name)
        .bind(draft.description.as_deref())
        .bind(draft.price)
        .fetch_one(&mut *tx)
        .await?;

        Self::write_recipe(&mut tx, &product.id, &draft.recipe).await?;

        tx.commit().await?;
        tracing::info!(
            product_id = %product.id,
            name = %product.name,
            ingredients = draft.recipe.len(),
            "Product created"
        );
        Ok(product)
    }

    async fn update_product(
        &self,
        product_id: &str,
        update: &ProductUpdate,
        recipe: &[(StockId, Decimal)],
    ) -> Result<Product, InventoryError> {
        let mut tx = self.pool.begin().await?;

        let updated: Product = sqlx::query_as(&format!(
            r#"UPDATE products SET
                   name = COALESCE($2, name),
                   description = COALESCE($3, description),
                   price = COALESCE($4, price)
               WHERE id::text = $1
               RETURNING {PRODUCT_COLUMNS}"#
        ))
        .bind(product_id)
        .bind(update.name.as_deref())
        .bind(update.description.as_deref())
        .bind(update.price)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| InventoryError::ProductNotFound(product_id.to_string()))?;

        Self::write_recipe(&mut tx, product_id, recipe).await?;

        tx.commit().await?;
        tracing::info!(product_id = %product_id, ingredients = recipe.len(), "Product updated");
        Ok(updated)
    }

    async fn load_stock(&self, stock_ids: &[StockId]) -> Result<Vec<StockItem>, InventoryError> {
        let rows: Vec<StockItem> = sqlx::query_as(&format!(
            "SELECT {STOCK_COLUMNS} FROM stock WHERE id = ANY($1::text[]::uuid[])"
        ))
        .bind(stock_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn list_stock(&self) -> Result<Vec<StockItem>, InventoryError> {
        let rows: Vec<StockItem> =
            sqlx::query_as(&format!("SELECT {STOCK_COLUMNS} FROM stock ORDER BY item ASC"))
                .fetch_all(&self.pool)
                .await?;
        Ok(rows)
    }

    async fn get_stock(&self, stock_id: &str) -> Result<Option<StockItem>, InventoryError> {
        let row: Option<StockItem> =
            sqlx::query_as(&format!("SELECT {STOCK_COLUMNS} FROM stock WHERE id::text = $1"))
                .bind(stock_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row)
    }

    async fn create_stock(&self, new: &NewStockItem) -> Result<StockItem, InventoryError> {
        let new = new.normalized()?;
        sqlx::query_as(&format!(
            r#"INSERT INTO stock (item, quantity, unit_type, max_capacity)
               VALUES ($1, $2, $3, $4)
               RETURNING {STOCK_COLUMNS}"#
        ))
        .bind(&new.item)
        .bind(new.quantity)
        .bind(&new.unit_type)
        .bind(new.max_capacity)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| InventoryError::from_insert(e, &new.item))
    }

    async fn update_stock(
        &self,
        stock_id: &str,
        update: &StockUpdate,
        note: &AdjustmentNote,
    ) -> Result<StockItem, InventoryError> {
        // Same scale as the column, so the logged delta matches the stored change
        let update = update.normalized()?;
        let mut tx = self.pool.begin().await?;

        let current: StockItem = sqlx::query_as(&format!(
            "SELECT {STOCK_COLUMNS} FROM stock WHERE id::text = $1 FOR UPDATE"
        ))
        .bind(stock_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| InventoryError::StockNotFound(stock_id.to_string()))?;

        let delta = quantity_delta(&current, &update, note)?;

        let updated: StockItem = sqlx::query_as(&format!(
            r#"UPDATE stock SET
                   item = COALESCE($2, item),
                   quantity = COALESCE($3, quantity),
                   unit_type = COALESCE($4, unit_type),
                   max_capacity = COALESCE($5, max_capacity)
               WHERE id::text = $1
               RETURNING {STOCK_COLUMNS}"#
        ))
        .bind(stock_id)
        .bind(update.item.as_deref())
        .bind(update.quantity)
        .bind(update.unit_type.as_deref())
        .bind(update.max_capacity)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| InventoryError::from_insert(e, update.item.as_deref().unwrap_or_default()))?;

        if let Some(adjustment_qty) = delta {
            Self::insert_adjustment(
                &mut tx,
                &current.id,
                adjustment_qty,
                note.reference.as_deref(),
                ReferenceType::User,
                &note.user_id,
            )
            .await?;
        }

        tx.commit().await?;
        tracing::info!(
            stock_id = %updated.id,
            delta = ?delta,
            user_id = %note.user_id,
            "Stock item updated"
        );
        Ok(updated)
    }

    async fn delete_stock(&self, stock_id: &str) -> Result<StockItem, InventoryError> {
        let removed: StockItem = sqlx::query_as(&format!(
            "DELETE FROM stock WHERE id::text = $1 RETURNING {STOCK_COLUMNS}"
        ))
        .bind(stock_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| InventoryError::from_delete(e, stock_id))?
        .ok_or_else(|| InventoryError::StockNotFound(stock_id.to_string()))?;

        tracing::info!(stock_id = %removed.id, item = %removed.item, "Stock item deleted");
        Ok(removed)
    }

    async fn list_adjustments(
        &self,
        stock_id: Option<&str>,
    ) -> Result<Vec<StockAdjustment>, InventoryError> {
        let rows = sqlx::query(
            r#"SELECT stock_id::text AS stock_id, adjustment_qty, reference,
                      reference_type, reference_id, created_at
               FROM stock_adjustments
               WHERE $1::text IS NULL OR stock_id::text = $1
               ORDER BY created_at DESC, id DESC"#,
        )
        .bind(stock_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|r| -> Result<StockAdjustment, InventoryError> {
                Ok(StockAdjustment {
                    stock_id: r.try_get("stock_id")?,
                    adjustment_qty: r.try_get("adjustment_qty")?,
                    reference: r.try_get("reference")?,
                    reference_type: r.try_get::<String, _>("reference_type")?.parse()?,
                    reference_id: r.try_get("reference_id")?,
                    created_at: r.try_get("created_at")?,
                })
            })
            .collect()
    }

    async fn create_order(&self, order: &NewOrder) -> Result<Order, InventoryError> {
        let order_id = OrderId::new_v4();
        let product_ids: Vec<ProductId> =
            order.lines.iter().map(|l| l.product_id.clone()).collect();

        let mut tx = self.pool.begin().await?;

        let usage: Vec<ProductStockRow> = sqlx::query_as(
            r#"SELECT product_id::text AS product_id, stock_id::text AS stock_id, quantity
               FROM product_stock
               WHERE product_id = ANY($1::text[]::uuid[])
               ORDER BY product_id, stock_id"#,
        )
        .bind(&product_ids)
        .fetch_all(&mut *tx)
        .await?;

        let demand = stock_demand(&order.lines, &IngredientUsage::from_rows(&usage));
        let stock_ids: Vec<StockId> = demand.iter().map(|(sid, _)| sid.clone()).collect();

        // Lock in id order so concurrent orders cannot deadlock
        let locked: Vec<StockItem> = sqlx::query_as(&format!(
            "SELECT {STOCK_COLUMNS} FROM stock WHERE id = ANY($1::text[]::uuid[]) ORDER BY id FOR UPDATE"
        ))
        .bind(&stock_ids)
        .fetch_all(&mut *tx)
        .await?;

        for (stock_id, need) in &demand {
            let available = locked
                .iter()
                .find(|s| s.id == *stock_id)
                .map(|s| s.quantity)
                .unwrap_or_default();
            if *need > available {
                // Dropping `tx` rolls back
                return Err(InventoryError::InsufficientStock {
                    stock_id: stock_id.clone(),
                });
            }
        }

        let created_at: DateTime<Utc> = sqlx::query_scalar(
            r#"INSERT INTO orders (id, user_id, status, custom)
               VALUES ($1::uuid, $2, $3, $4)
               RETURNING created_at"#,
        )
        .bind(order_id.to_string())
        .bind(&order.user_id)
        .bind(OrderStatus::Pending.as_str())
        .bind(&order.custom)
        .fetch_one(&mut *tx)
        .await?;

        for line in &order.lines {
            sqlx::query(
                r#"INSERT INTO order_products (order_id, product_id, quantity)
                   VALUES ($1::uuid, $2::uuid, $3)"#,
            )
            .bind(order_id.to_string())
            .bind(&line.product_id)
            .bind(i64::from(line.quantity))
            .execute(&mut *tx)
            .await?;
        }

        for (stock_id, need) in &demand {
            sqlx::query("UPDATE stock SET quantity = quantity - $1 WHERE id::text = $2")
                .bind(*need)
                .bind(stock_id)
                .execute(&mut *tx)
                .await?;
            Self::insert_adjustment(
                &mut tx,
                stock_id,
                -*need,
                None,
                ReferenceType::Order,
                &order_id.to_string(),
            )
            .await?;
        }

        tx.commit().await?;
        tracing::info!(
            order_id = %order_id,
            user_id = %order.user_id,
            lines = order.lines.len(),
            "Order committed"
        );

        Ok(Order {
            id: order_id,
            user_id: order.user_id.clone(),
            status: OrderStatus::Pending,
            custom: order.custom.clone(),
            lines: order.lines.clone(),
            created_at,
            updated_at: None,
        })
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>, InventoryError> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_order(&mut conn, order_id).await
    }

    async fn list_orders(&self, filter: &OrderFilter) -> Result<OrderPage, InventoryError> {
        let direction = if filter.newest_first { "DESC" } else { "ASC" };
        let mut conn = self.pool.acquire().await?;

        let rows = sqlx::query(&format!(
            r#"SELECT {ORDER_COLUMNS} FROM orders
               WHERE {ORDER_FILTER}
               ORDER BY created_at {direction}, id {direction}
               LIMIT $5 OFFSET $6"#
        ))
        .bind(filter.status.map(OrderStatus::as_str))
        .bind(filter.user_id.as_deref())
        .bind(filter.created_from)
        .bind(filter.created_before)
        .bind(filter.limit.map(i64::from))
        .bind(i64::from(filter.offset))
        .fetch_all(&mut *conn)
        .await?;

        let filtered: i64 = sqlx::query_scalar(&format!(
            "SELECT count(*) FROM orders WHERE {ORDER_FILTER}"
        ))
        .bind(filter.status.map(OrderStatus::as_str))
        .bind(filter.user_id.as_deref())
        .bind(filter.created_from)
        .bind(filter.created_before)
        .fetch_one(&mut *conn)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT count(*) FROM orders")
            .fetch_one(&mut *conn)
            .await?;

        let ids = rows
            .iter()
            .map(|r| r.try_get::<String, _>("id"))
            .collect::<Result<Vec<_>, _>>()?;
        let mut lines = Self::fetch_lines(&mut conn, &ids).await?;

        let orders = rows
            .iter()
            .zip(&ids)
            .map(|(row, id)| order_from_row(row, lines.remove(id).unwrap_or_default()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(OrderPage {
            orders,
            total: u64::try_from(total).unwrap_or_default(),
            filtered: u64::try_from(filtered).unwrap_or_default(),
        })
    }

    async fn transition_order(
        &self,
        order_id: OrderId,
        next: OrderStatus,
    ) -> Result<Order, InventoryError> {
        let key = order_id.to_string();
        let mut tx = self.pool.begin().await?;

        let current: OrderStatus =
            sqlx::query_scalar::<_, String>("SELECT status FROM orders WHERE id = $1::uuid FOR UPDATE")
                .bind(&key)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| InventoryError::OrderNotFound(key.clone()))?
                .parse()?;
        if !current.can_become(next) {
            return Err(InventoryError::InvalidStatusTransition {
                order_id: key,
                from: current,
                to: next,
            });
        }

        if next == OrderStatus::Cancelled {
            let taken = sqlx::query(
                r#"SELECT stock_id::text AS stock_id, SUM(adjustment_qty) AS taken
                   FROM stock_adjustments
                   WHERE reference_type = 'order' AND reference_id = $1
                   GROUP BY stock_id
                   ORDER BY stock_id"#,
            )
            .bind(&key)
            .fetch_all(&mut *tx)
            .await?;

            for row in &taken {
                let stock_id: String = row.try_get("stock_id")?;
                let taken: Decimal = row.try_get("taken")?;
                if taken.is_zero() {
                    continue;
                }
                // Rows come in id order, so this locks in the same order as create_order
                sqlx::query("UPDATE stock SET quantity = quantity - $1 WHERE id::text = $2")
                    .bind(taken)
                    .bind(&stock_id)
                    .execute(&mut *tx)
                    .await?;
                Self::insert_adjustment(
                    &mut tx,
                    &stock_id,
                    -taken,
                    Some("Order cancelled"),
                    ReferenceType::Order,
                    &key,
                )
                .await?;
            }
        }

        sqlx::query("UPDATE orders SET status = $2, updated_at = now() WHERE id = $1::uuid")
            .bind(&key)
            .bind(next.as_str())
            .execute(&mut *tx)
            .await?;

        let order = Self::fetch_order(&mut tx, order_id)
            .await?
            .ok_or_else(|| InventoryError::OrderNotFound(key.clone()))?;

        tx.commit().await?;
        tracing::info!(order_id = %key, from = %current, to = %next, "Order status changed");
        Ok(order)
    }
}
