//! Postgres-backed store.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (foreign key violation) | `23503` | `NotFound` (referenced row missing) |
//! | Database (check constraint violation) | `23514` | `Domain(Validation)` |
//! | Anything else | | `Backend` |
//!
//! ## Order commit
//!
//! `commit_order` runs in one transaction. Stock is decremented with a
//! conditional `UPDATE ... WHERE stock_available >= $n`, one product at a time
//! in id order so concurrent commits lock rows in the same sequence. The first
//! row that does not match rolls the whole transaction back. The same
//! statement requires the product to still be active.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, QueryBuilder, Row, Transaction};
use tracing::{debug, instrument};
use uuid::Uuid;

use storefront_catalog::{InsufficientStock, Inventory, Product, ProductDetails, ProductFilter, ProductId, Season};
use storefront_core::{AggregateRoot, DomainError, ExpectedVersion, Quantity, index_by_id};
use storefront_customers::{Customer, CustomerId};
use storefront_sales::{CartLine, CartLineId, Order, OrderId, OrderItem, OrderSnapshot, OrderStatus};

use super::schema::STATEMENTS;
use super::{
    CartStore, CatalogStore, CustomerStore, MaintenanceStore, OrderStore, PurgeReport, ResetReport,
    StoreError, StoreResult,
};

const PRODUCT_COLUMNS: &str = "p.id, p.name, p.local_name, p.category, p.price, p.discount, \
     p.season, p.is_active, p.created_at, p.updated_at";

const ORDER_COLUMNS: &str =
    "id, customer_id, status, payment_method, total_amount, version, created_at, updated_at";

/// Postgres-backed store.
///
/// Uses the SQLx connection pool, which is `Send + Sync` and shared across tasks.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: Arc<PgPool>,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Open a pool against `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create tables and indexes if they do not exist yet.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> StoreResult<()> {
        for statement in STATEMENTS {
            sqlx::query(statement)
                .execute(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("migrate", e))?;
        }
        debug!(statements = STATEMENTS.len(), "schema ready");
        Ok(())
    }

    async fn begin(&self, operation: &str) -> StoreResult<Transaction<'static, Postgres>> {
        self.pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error(operation, e))
    }

    async fn load_items(&self, order_ids: &[Uuid]) -> StoreResult<HashMap<Uuid, Vec<OrderItem>>> {
        let rows = sqlx::query(
            r#"
            SELECT order_id, line_no, product_id, product_name, quantity, unit_price
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY order_id, line_no
            "#,
        )
        .bind(order_ids.to_vec())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_items", e))?;

        let mut out: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
        for row in rows {
            let order_id: Uuid = get(&row, "order_id")?;
            out.entry(order_id).or_default().push(order_item_from_row(&row)?);
        }
        Ok(out)
    }
}

#[async_trait]
impl CatalogStore for PostgresStore {
    #[instrument(skip_all, fields(product_id = %product.id), err)]
    async fn insert_product(&self, product: &Product, inventory: &Inventory) -> StoreResult<()> {
        let mut tx = self.begin("insert_product").await?;
        let d = &product.details;
        sqlx::query(
            r#"
            INSERT INTO products
                (id, name, local_name, category, price, discount, season, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(*product.id.as_uuid())
        .bind(&d.name)
        .bind(d.local_name.as_deref())
        .bind(&d.category)
        .bind(d.price)
        .bind(d.discount)
        .bind(d.season.as_str())
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_product", e))?;

        sqlx::query("INSERT INTO inventory (product_id, stock_available, updated_at) VALUES ($1, $2, $3)")
            .bind(*product.id.as_uuid())
            .bind(inventory.stock_available())
            .bind(inventory.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_inventory", e))?;

        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))
    }

    #[instrument(skip_all, fields(product_id = %product.id), err)]
    async fn update_product(&self, product: &Product) -> StoreResult<()> {
        let d = &product.details;
        let result = sqlx::query(
            r#"
            UPDATE products
            SET name = $2, local_name = $3, category = $4, price = $5, discount = $6,
                season = $7, is_active = $8, updated_at = $9
            WHERE id = $1
            "#,
        )
        .bind(*product.id.as_uuid())
        .bind(&d.name)
        .bind(d.local_name.as_deref())
        .bind(&d.category)
        .bind(d.price)
        .bind(d.discount)
        .bind(d.season.as_str())
        .bind(product.is_active)
        .bind(product.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_product", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(format!("product {}", product.id)));
        }
        Ok(())
    }

    async fn get_product(&self, id: ProductId) -> StoreResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.id = $1");
        let row = sqlx::query(&sql)
            .bind(*id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_product", e))?;
        row.as_ref().map(product_from_row).transpose()
    }

    async fn get_products(&self, ids: &[ProductId]) -> StoreResult<HashMap<ProductId, Product>> {
        let uuids: Vec<Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.id = ANY($1)");
        let rows = sqlx::query(&sql)
            .bind(uuids)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_products", e))?;
        let products = rows.iter().map(product_from_row).collect::<StoreResult<Vec<_>>>()?;
        Ok(index_by_id(products))
    }

    #[instrument(skip(self), err)]
    async fn list_products(&self, filter: &ProductFilter) -> StoreResult<Vec<(Product, i64)>> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {PRODUCT_COLUMNS}, COALESCE(i.stock_available, 0) AS stock_available \
             FROM products p LEFT JOIN inventory i ON i.product_id = p.id WHERE p.is_active"
        ));
        if let Some(category) = filter.category_term() {
            qb.push(" AND lower(p.category) = lower(")
                .push_bind(category.to_string())
                .push(")");
        }
        if let Some(season) = filter.season {
            qb.push(" AND p.season = ").push_bind(season.as_str());
        }
        if let Some(term) = filter.search_term() {
            let pattern = format!("%{}%", escape_like(term));
            qb.push(" AND (p.name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR p.local_name ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if filter.in_stock {
            qb.push(" AND COALESCE(i.stock_available, 0) > 0");
        }
        qb.push(" ORDER BY p.category, p.name");

        let rows = qb
            .build()
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_products", e))?;
        rows.iter()
            .map(|row| Ok((product_from_row(row)?, get::<i64>(row, "stock_available")?)))
            .collect()
    }

    async fn categories(&self) -> StoreResult<Vec<String>> {
        sqlx::query_scalar("SELECT DISTINCT category FROM products WHERE is_active ORDER BY category")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("categories", e))
    }

    async fn get_inventory(&self, product_id: ProductId) -> StoreResult<Option<Inventory>> {
        let row = sqlx::query("SELECT product_id, stock_available, updated_at FROM inventory WHERE product_id = $1")
            .bind(*product_id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_inventory", e))?;
        row.as_ref().map(inventory_from_row).transpose()
    }

    async fn list_inventory(&self) -> StoreResult<Vec<(Product, Inventory)>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS}, i.product_id, i.stock_available, i.updated_at AS inventory_updated_at \
             FROM products p JOIN inventory i ON i.product_id = p.id \
             ORDER BY p.category, p.name"
        );
        let rows = sqlx::query(&sql)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_inventory", e))?;
        rows.iter()
            .map(|row| {
                let product = product_from_row(row)?;
                let inventory = Inventory::new(
                    product.id,
                    get(row, "stock_available")?,
                    get(row, "inventory_updated_at")?,
                )
                .map_err(corrupt_row)?;
                Ok((product, inventory))
            })
            .collect()
    }

    #[instrument(skip_all, fields(product_id = %product_id), err)]
    async fn set_stock(
        &self,
        product_id: ProductId,
        stock: i64,
        now: DateTime<Utc>,
    ) -> StoreResult<Inventory> {
        // Validate with the domain rule before touching the row.
        Inventory::new(product_id, stock, now)?;
        let row = sqlx::query(
            r#"
            UPDATE inventory SET stock_available = $2, updated_at = $3
            WHERE product_id = $1
            RETURNING product_id, stock_available, updated_at
            "#,
        )
        .bind(*product_id.as_uuid())
        .bind(stock)
        .bind(now)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("set_stock", e))?;

        match row {
            Some(row) => inventory_from_row(&row),
            None => Err(StoreError::not_found(format!("inventory for product {product_id}"))),
        }
    }

    #[instrument(skip_all, fields(product_id = %product_id), err)]
    async fn adjust_stock(
        &self,
        product_id: ProductId,
        delta: i64,
        now: DateTime<Utc>,
    ) -> StoreResult<Inventory> {
        if delta == 0 {
            return Err(DomainError::validation("delta cannot be zero").into());
        }
        let row = sqlx::query(
            r#"
            UPDATE inventory SET stock_available = stock_available + $2, updated_at = $3
            WHERE product_id = $1 AND stock_available + $2 >= 0
            RETURNING product_id, stock_available, updated_at
            "#,
        )
        .bind(*product_id.as_uuid())
        .bind(delta)
        .bind(now)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("adjust_stock", e))?;

        if let Some(row) = row {
            return inventory_from_row(&row);
        }
        match self.get_inventory(product_id).await? {
            Some(_) => Err(DomainError::invariant("stock cannot go negative").into()),
            None => Err(StoreError::not_found(format!("inventory for product {product_id}"))),
        }
    }
}

#[async_trait]
impl CartStore for PostgresStore {
    #[instrument(skip_all, fields(customer_id = %customer_id, product_id = %product_id), err)]
    async fn add_or_merge(
        &self,
        customer_id: CustomerId,
        product_id: ProductId,
        quantity: Quantity,
        now: DateTime<Utc>,
    ) -> StoreResult<(CartLine, bool)> {
        let row = sqlx::query(
            r#"
            INSERT INTO cart_lines (id, customer_id, product_id, quantity, added_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (customer_id, product_id)
            DO UPDATE SET quantity = cart_lines.quantity + EXCLUDED.quantity
            RETURNING id, customer_id, product_id, quantity, added_at, (xmax = 0) AS created
            "#,
        )
        .bind(*CartLineId::generate().as_uuid())
        .bind(*customer_id.as_uuid())
        .bind(*product_id.as_uuid())
        .bind(quantity.as_i64())
        .bind(now)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("add_or_merge", e))?;

        Ok((cart_line_from_row(&row)?, get(&row, "created")?))
    }

    async fn get_line(&self, line_id: CartLineId) -> StoreResult<Option<CartLine>> {
        let row = sqlx::query(
            "SELECT id, customer_id, product_id, quantity, added_at FROM cart_lines WHERE id = $1",
        )
        .bind(*line_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_line", e))?;
        row.as_ref().map(cart_line_from_row).transpose()
    }

    #[instrument(skip_all, fields(line_id = %line_id), err)]
    async fn update_quantity(&self, line_id: CartLineId, quantity: Quantity) -> StoreResult<CartLine> {
        let row = sqlx::query(
            r#"
            UPDATE cart_lines SET quantity = $2 WHERE id = $1
            RETURNING id, customer_id, product_id, quantity, added_at
            "#,
        )
        .bind(*line_id.as_uuid())
        .bind(quantity.as_i64())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_quantity", e))?;
        match row {
            Some(row) => cart_line_from_row(&row),
            None => Err(StoreError::not_found(format!("cart line {line_id}"))),
        }
    }

    #[instrument(skip_all, fields(line_id = %line_id), err)]
    async fn remove_line(&self, line_id: CartLineId) -> StoreResult<CartLine> {
        let row = sqlx::query(
            "DELETE FROM cart_lines WHERE id = $1 RETURNING id, customer_id, product_id, quantity, added_at",
        )
        .bind(*line_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("remove_line", e))?;
        match row {
            Some(row) => cart_line_from_row(&row),
            None => Err(StoreError::not_found(format!("cart line {line_id}"))),
        }
    }

    #[instrument(skip_all, fields(customer_id = %customer_id), err)]
    async fn clear_cart(&self, customer_id: CustomerId) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM cart_lines WHERE customer_id = $1")
            .bind(*customer_id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("clear_cart", e))?;
        Ok(result.rows_affected())
    }

    async fn list_lines(&self, customer_id: CustomerId) -> StoreResult<Vec<CartLine>> {
        let rows = sqlx::query(
            r#"
            SELECT id, customer_id, product_id, quantity, added_at
            FROM cart_lines
            WHERE customer_id = $1
            ORDER BY added_at, id
            "#,
        )
        .bind(*customer_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_lines", e))?;
        rows.iter().map(cart_line_from_row).collect()
    }
}

#[async_trait]
impl OrderStore for PostgresStore {
    #[instrument(
        skip_all,
        fields(order_id = %order.id(), items = order.items().len()),
        err
    )]
    async fn commit_order(&self, order: &Order, consumed_lines: &[CartLineId]) -> StoreResult<()> {
        let (Some(customer_id), Some(created_at), Some(updated_at)) =
            (order.customer_id(), order.created_at(), order.updated_at())
        else {
            return Err(DomainError::invariant("order has not been placed").into());
        };

        // Coalesce per product; BTreeMap iteration gives the id lock order.
        let mut demands: BTreeMap<ProductId, Quantity> = BTreeMap::new();
        for item in order.items() {
            let total = match demands.get(&item.product_id) {
                Some(q) => q.checked_add(item.quantity)?,
                None => item.quantity,
            };
            demands.insert(item.product_id, total);
        }

        let mut tx = self.begin("commit_order").await?;

        for (product_id, quantity) in &demands {
            let updated = sqlx::query(
                r#"
                UPDATE inventory
                SET stock_available = stock_available - $2, updated_at = $3
                WHERE product_id = $1 AND stock_available >= $2
                  AND EXISTS (SELECT 1 FROM products WHERE id = $1 AND is_active)
                "#,
            )
            .bind(*product_id.as_uuid())
            .bind(quantity.as_i64())
            .bind(created_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("decrement_stock", e))?
            .rows_affected();

            if updated == 0 {
                let row: Option<(bool, Option<i64>)> = sqlx::query_as(
                    r#"
                    SELECT p.is_active, i.stock_available
                    FROM products p LEFT JOIN inventory i ON i.product_id = p.id
                    WHERE p.id = $1
                    "#,
                )
                .bind(*product_id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("read_stock", e))?;
                tx.rollback().await.map_err(|e| map_sqlx_error("rollback", e))?;
                let Some((true, available)) = row else {
                    return Err(DomainError::validation(format!(
                        "product {product_id} is no longer available"
                    ))
                    .into());
                };
                return Err(InsufficientStock {
                    product_id: *product_id,
                    requested: quantity.get(),
                    available: available.unwrap_or(0),
                }
                .into());
            }
        }

        sqlx::query(
            r#"
            INSERT INTO orders
                (id, customer_id, status, payment_method, total_amount, version, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(*order.id().as_uuid())
        .bind(*customer_id.as_uuid())
        .bind(order.status().as_str())
        .bind(order.payment_method())
        .bind(order.total_amount())
        .bind(version_to_db(order.version())?)
        .bind(created_at)
        .bind(updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_order", e))?;

        for item in order.items() {
            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, line_no, product_id, product_name, quantity, unit_price)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(*order.id().as_uuid())
            .bind(i32::try_from(item.line_no).map_err(|_| StoreError::Backend("line_no overflow".into()))?)
            .bind(*item.product_id.as_uuid())
            .bind(&item.product_name)
            .bind(item.quantity.as_i64())
            .bind(item.unit_price)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_order_item", e))?;
        }

        let consumed: Vec<Uuid> = consumed_lines.iter().map(|l| *l.as_uuid()).collect();
        let removed = if consumed.is_empty() {
            0
        } else {
            sqlx::query("DELETE FROM cart_lines WHERE customer_id = $1 AND id = ANY($2)")
                .bind(*customer_id.as_uuid())
                .bind(consumed)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("consume_cart_lines", e))?
                .rows_affected()
        };

        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))?;
        debug!(removed_lines = removed, "order committed");
        Ok(())
    }

    async fn get_order(&self, id: OrderId) -> StoreResult<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        let Some(row) = sqlx::query(&sql)
            .bind(*id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_order", e))?
        else {
            return Ok(None);
        };
        let mut items = self.load_items(&[*id.as_uuid()]).await?;
        let items = items.remove(id.as_uuid()).unwrap_or_default();
        Ok(Some(order_from_row(&row, items)?))
    }

    async fn list_orders(&self, customer_id: Option<CustomerId>) -> StoreResult<Vec<Order>> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders \
             WHERE ($1::uuid IS NULL OR customer_id = $1) \
             ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(customer_id.map(|c| *c.as_uuid()))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_orders", e))?;

        let ids: Vec<Uuid> = rows
            .iter()
            .map(|row| get::<Uuid>(row, "id"))
            .collect::<StoreResult<_>>()?;
        let mut items = self.load_items(&ids).await?;
        rows.iter()
            .zip(ids.iter())
            .map(|(row, id)| order_from_row(row, items.remove(id).unwrap_or_default()))
            .collect()
    }

    #[instrument(skip_all, fields(order_id = %order.id(), status = %order.status()), err)]
    async fn save_status(&self, order: &Order, expected: ExpectedVersion) -> StoreResult<()> {
        let expected_version = match expected {
            ExpectedVersion::Any => None,
            ExpectedVersion::Exact(v) => Some(version_to_db(v)?),
        };
        let result = sqlx::query(
            r#"
            UPDATE orders SET status = $2, version = $3, updated_at = $4
            WHERE id = $1 AND ($5::bigint IS NULL OR version = $5)
            "#,
        )
        .bind(*order.id().as_uuid())
        .bind(order.status().as_str())
        .bind(version_to_db(order.version())?)
        .bind(order.updated_at())
        .bind(expected_version)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("save_status", e))?;

        if result.rows_affected() == 1 {
            return Ok(());
        }
        let exists: Option<i64> = sqlx::query_scalar("SELECT version FROM orders WHERE id = $1")
            .bind(*order.id().as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("save_status", e))?;
        match exists {
            Some(found) => Err(StoreError::Conflict(format!(
                "order {} was modified concurrently (expected {:?}, found version {})",
                order.id(),
                expected,
                found
            ))),
            None => Err(StoreError::not_found(format!("order {}", order.id()))),
        }
    }
}

#[async_trait]
impl CustomerStore for PostgresStore {
    #[instrument(skip_all, fields(customer_id = %customer.id), err)]
    async fn insert_customer(&self, customer: &Customer) -> StoreResult<()> {
        sqlx::query("INSERT INTO customers (id, name, email, phone, created_at) VALUES ($1, $2, $3, $4, $5)")
            .bind(*customer.id.as_uuid())
            .bind(&customer.name)
            .bind(&customer.email)
            .bind(customer.phone.as_deref())
            .bind(customer.created_at)
            .execute(&*self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::Conflict(format!("email '{}' is already registered", customer.email))
                } else {
                    map_sqlx_error("insert_customer", e)
                }
            })?;
        Ok(())
    }

    #[instrument(skip_all, fields(customer_id = %customer.id), err)]
    async fn update_customer(&self, customer: &Customer) -> StoreResult<()> {
        let updated = sqlx::query("UPDATE customers SET name = $2, email = $3, phone = $4 WHERE id = $1")
            .bind(*customer.id.as_uuid())
            .bind(&customer.name)
            .bind(&customer.email)
            .bind(customer.phone.as_deref())
            .execute(&*self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::Conflict(format!("email '{}' is already registered", customer.email))
                } else {
                    map_sqlx_error("update_customer", e)
                }
            })?
            .rows_affected();
        if updated == 0 {
            return Err(StoreError::not_found(format!("customer {}", customer.id)));
        }
        Ok(())
    }

    async fn get_customer(&self, id: CustomerId) -> StoreResult<Option<Customer>> {
        let row = sqlx::query("SELECT id, name, email, phone, created_at FROM customers WHERE id = $1")
            .bind(*id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_customer", e))?;
        row.as_ref().map(customer_from_row).transpose()
    }

    async fn list_customers(&self) -> StoreResult<Vec<Customer>> {
        let rows = sqlx::query("SELECT id, name, email, phone, created_at FROM customers ORDER BY created_at, id")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_customers", e))?;
        rows.iter().map(customer_from_row).collect()
    }
}

#[async_trait]
impl MaintenanceStore for PostgresStore {
    #[instrument(skip_all, fields(customer_id = %id), err)]
    async fn purge_customer(&self, id: CustomerId) -> StoreResult<PurgeReport> {
        let uuid = *id.as_uuid();
        let mut tx = self.begin("purge_customer").await?;

        let exists: Option<Uuid> = sqlx::query_scalar("SELECT id FROM customers WHERE id = $1 FOR UPDATE")
            .bind(uuid)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("purge_customer", e))?;
        if exists.is_none() {
            tx.rollback().await.map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(StoreError::not_found(format!("customer {id}")));
        }

        let report = PurgeReport {
            cart_lines: delete(&mut tx, "DELETE FROM cart_lines WHERE customer_id = $1", uuid).await?,
            order_items: delete(
                &mut tx,
                "DELETE FROM order_items WHERE order_id IN (SELECT id FROM orders WHERE customer_id = $1)",
                uuid,
            )
            .await?,
            orders: delete(&mut tx, "DELETE FROM orders WHERE customer_id = $1", uuid).await?,
            customers: delete(&mut tx, "DELETE FROM customers WHERE id = $1", uuid).await?,
        };

        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))?;
        Ok(report)
    }

    #[instrument(skip(self), err)]
    async fn reset_catalog(&self) -> StoreResult<ResetReport> {
        let mut tx = self.begin("reset_catalog").await?;
        let mut counts = [0u64; 5];
        for (slot, table) in counts
            .iter_mut()
            .zip(["cart_lines", "order_items", "orders", "inventory", "products"])
        {
            *slot = sqlx::query(&format!("DELETE FROM {table}"))
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("reset_catalog", e))?
                .rows_affected();
        }
        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))?;

        let [cart_lines, order_items, orders, inventory, products] = counts;
        Ok(ResetReport {
            cart_lines,
            order_items,
            orders,
            inventory,
            products,
        })
    }
}

async fn delete(tx: &mut Transaction<'static, Postgres>, sql: &str, id: Uuid) -> StoreResult<u64> {
    Ok(sqlx::query(sql)
        .bind(id)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("delete", e))?
        .rows_affected())
}

fn get<'r, T>(row: &'r PgRow, column: &str) -> StoreResult<T>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(column).map_err(|e| map_sqlx_error("decode", e))
}

fn corrupt_row(err: DomainError) -> StoreError {
    StoreError::Backend(format!("stored row violates a domain rule: {err}"))
}

fn version_to_db(version: u64) -> StoreResult<i64> {
    i64::try_from(version).map_err(|_| StoreError::Backend(format!("version {version} out of range")))
}

fn product_from_row(row: &PgRow) -> StoreResult<Product> {
    let season: String = get(row, "season")?;
    Ok(Product {
        id: ProductId::from_uuid(get(row, "id")?),
        details: ProductDetails {
            name: get(row, "name")?,
            local_name: get(row, "local_name")?,
            category: get(row, "category")?,
            price: get::<Decimal>(row, "price")?,
            discount: get::<Decimal>(row, "discount")?,
            season: season.parse::<Season>().map_err(corrupt_row)?,
        },
        is_active: get(row, "is_active")?,
        created_at: get(row, "created_at")?,
        updated_at: get(row, "updated_at")?,
    })
}

fn inventory_from_row(row: &PgRow) -> StoreResult<Inventory> {
    Inventory::new(
        ProductId::from_uuid(get(row, "product_id")?),
        get(row, "stock_available")?,
        get(row, "updated_at")?,
    )
    .map_err(corrupt_row)
}

fn cart_line_from_row(row: &PgRow) -> StoreResult<CartLine> {
    Ok(CartLine {
        id: CartLineId::from_uuid(get(row, "id")?),
        customer_id: CustomerId::from_uuid(get(row, "customer_id")?),
        product_id: ProductId::from_uuid(get(row, "product_id")?),
        quantity: Quantity::new(get(row, "quantity")?).map_err(corrupt_row)?,
        added_at: get(row, "added_at")?,
    })
}

fn order_item_from_row(row: &PgRow) -> StoreResult<OrderItem> {
    let line_no: i32 = get(row, "line_no")?;
    Ok(OrderItem {
        line_no: u32::try_from(line_no).map_err(|_| StoreError::Backend(format!("bad line_no {line_no}")))?,
        product_id: ProductId::from_uuid(get(row, "product_id")?),
        product_name: get(row, "product_name")?,
        quantity: Quantity::new(get(row, "quantity")?).map_err(corrupt_row)?,
        unit_price: get(row, "unit_price")?,
    })
}

fn order_from_row(row: &PgRow, items: Vec<OrderItem>) -> StoreResult<Order> {
    let status: String = get(row, "status")?;
    let version: i64 = get(row, "version")?;
    Ok(Order::from_snapshot(OrderSnapshot {
        id: OrderId::from_uuid(get(row, "id")?),
        customer_id: CustomerId::from_uuid(get(row, "customer_id")?),
        status: status.parse::<OrderStatus>().map_err(corrupt_row)?,
        payment_method: get(row, "payment_method")?,
        items,
        total_amount: get(row, "total_amount")?,
        created_at: get(row, "created_at")?,
        updated_at: get(row, "updated_at")?,
        version: u64::try_from(version).map_err(|_| StoreError::Backend(format!("bad version {version}")))?,
    }))
}

fn customer_from_row(row: &PgRow) -> StoreResult<Customer> {
    Ok(Customer {
        id: CustomerId::from_uuid(get(row, "id")?),
        name: get(row, "name")?,
        email: get(row, "email")?,
        phone: get(row, "phone")?,
        created_at: get(row, "created_at")?,
    })
}

/// Escape `%`, `_` and `\` for use inside an `ILIKE` pattern.
fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Map SQLx errors to `StoreError`.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(msg),
                Some("23503") => StoreError::NotFound(format!("referenced row ({msg})")),
                Some("23514") => StoreError::Domain(DomainError::validation(msg)),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => StoreError::Backend(format!("connection pool closed in {operation}")),
        _ => StoreError::Backend(format!("sqlx error in {operation}: {err}")),
    }
}

/// Check if an error is a unique constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        if let Some(code) = db_err.code() {
            return code.as_ref() == "23505";
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_metacharacters_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("tomato"), "tomato");
    }

    /// Runs only when `TEST_DATABASE_URL` points at a scratch database.
    async fn test_store() -> Option<PostgresStore> {
        let url = std::env::var("TEST_DATABASE_URL").ok()?;
        let store = PostgresStore::connect(&url, 5).await.ok()?;
        store.migrate().await.ok()?;
        Some(store)
    }

    async fn seed(store: &PostgresStore, stock: i64) -> (Customer, Product) {
        use storefront_customers::NewCustomer;

        let customer = Customer::register(
            CustomerId::generate(),
            NewCustomer {
                name: "Load".into(),
                email: format!("load-{}@example.com", Uuid::now_v7()),
                phone: None,
            },
            Utc::now(),
        )
        .unwrap();
        store.insert_customer(&customer).await.unwrap();

        let product = Product::create(
            ProductId::generate(),
            ProductDetails {
                name: "Pumpkin".into(),
                local_name: None,
                category: "Vegetables".into(),
                price: Decimal::from(10),
                discount: Decimal::ZERO,
                season: Season::All,
            },
            Utc::now(),
        )
        .unwrap();
        store
            .insert_product(&product, &Inventory::new(product.id, stock, Utc::now()).unwrap())
            .await
            .unwrap();
        (customer, product)
    }

    fn pumpkin_order(customer: &Customer, product: &Product, qty: i64) -> Order {
        use storefront_sales::PlaceOrder;

        Order::place(PlaceOrder {
            order_id: OrderId::generate(),
            customer_id: customer.id,
            payment_method: "Cash on Delivery".into(),
            items: vec![OrderItem {
                line_no: 1,
                product_id: product.id,
                product_name: product.name().to_string(),
                quantity: Quantity::new(qty).unwrap(),
                unit_price: product.price(),
            }],
            occurred_at: Utc::now(),
        })
        .unwrap()
        .0
    }

    #[tokio::test]
    async fn concurrent_commits_never_oversell() {
        let Some(store) = test_store().await else {
            return;
        };
        let (customer, product) = seed(&store, 5).await;

        let (a, b) = (pumpkin_order(&customer, &product, 3), pumpkin_order(&customer, &product, 3));
        let (ra, rb) = tokio::join!(store.commit_order(&a, &[]), store.commit_order(&b, &[]));

        let successes = [ra.is_ok(), rb.is_ok()].iter().filter(|ok| **ok).count();
        assert_eq!(successes, 1);
        let inv = store.get_inventory(product.id).await.unwrap().unwrap();
        assert_eq!(inv.stock_available(), 2);
    }

    #[tokio::test]
    async fn deactivated_product_fails_the_commit() {
        let Some(store) = test_store().await else {
            return;
        };
        let (customer, mut product) = seed(&store, 5).await;
        let order = pumpkin_order(&customer, &product, 1);

        product.set_active(false, Utc::now());
        store.update_product(&product).await.unwrap();

        assert!(matches!(
            store.commit_order(&order, &[]).await,
            Err(StoreError::Domain(DomainError::Validation(_)))
        ));
        let inv = store.get_inventory(product.id).await.unwrap().unwrap();
        assert_eq!(inv.stock_available(), 5);
    }

    #[tokio::test]
    async fn merge_past_quantity_range_is_a_validation_error() {
        let Some(store) = test_store().await else {
            return;
        };
        let (customer, product) = seed(&store, 5).await;
        let max = Quantity::new(i64::from(u32::MAX)).unwrap();

        store.add_or_merge(customer.id, product.id, max, Utc::now()).await.unwrap();
        assert!(matches!(
            store
                .add_or_merge(customer.id, product.id, Quantity::new(1).unwrap(), Utc::now())
                .await,
            Err(StoreError::Domain(DomainError::Validation(_)))
        ));
        let lines = store.list_lines(customer.id).await.unwrap();
        assert_eq!(lines[0].quantity, max);
    }
}
