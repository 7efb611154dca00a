//! In-memory store for tests/dev.
//!
//! All state sits behind one mutex, so the order commit (stock check, stock
//! decrement, order insert, cart cleanup) is trivially atomic. The lock is never
//! held across an `.await`.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use storefront_catalog::{Inventory, Product, ProductFilter, ProductId, categories, reserve_all};
use storefront_core::{AggregateRoot, DomainError, ExpectedVersion, Quantity, index_by_id};
use storefront_customers::{Customer, CustomerId};
use storefront_sales::{Cart, CartLine, CartLineId, Order, OrderId};

use super::{
    CartStore, CatalogStore, CustomerStore, MaintenanceStore, OrderStore, PurgeReport, ResetReport,
    StoreError, StoreResult,
};

#[derive(Debug, Default)]
struct State {
    products: HashMap<ProductId, Product>,
    inventory: HashMap<ProductId, Inventory>,
    customers: HashMap<CustomerId, Customer>,
    carts: HashMap<CustomerId, Cart>,
    orders: HashMap<OrderId, Order>,
}

impl State {
    fn cart_of_line(&mut self, line_id: CartLineId) -> Option<&mut Cart> {
        self.carts.values_mut().find(|c| c.line(line_id).is_some())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, State>> {
        self.state.lock().map_err(|_| StoreError::Poisoned)
    }
}

fn by_category_then_name(a: &Product, b: &Product) -> core::cmp::Ordering {
    a.category()
        .cmp(b.category())
        .then_with(|| a.name().cmp(b.name()))
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn insert_product(&self, product: &Product, inventory: &Inventory) -> StoreResult<()> {
        let mut st = self.lock()?;
        if st.products.contains_key(&product.id) {
            return Err(StoreError::Conflict(format!("product {} already exists", product.id)));
        }
        st.products.insert(product.id, product.clone());
        st.inventory.insert(product.id, inventory.clone());
        Ok(())
    }

    async fn update_product(&self, product: &Product) -> StoreResult<()> {
        let mut st = self.lock()?;
        let slot = st
            .products
            .get_mut(&product.id)
            .ok_or_else(|| StoreError::not_found(format!("product {}", product.id)))?;
        *slot = product.clone();
        Ok(())
    }

    async fn get_product(&self, id: ProductId) -> StoreResult<Option<Product>> {
        Ok(self.lock()?.products.get(&id).cloned())
    }

    async fn get_products(&self, ids: &[ProductId]) -> StoreResult<HashMap<ProductId, Product>> {
        let st = self.lock()?;
        Ok(index_by_id(ids.iter().filter_map(|id| st.products.get(id).cloned())))
    }

    async fn list_products(&self, filter: &ProductFilter) -> StoreResult<Vec<(Product, i64)>> {
        let st = self.lock()?;
        let rows = st.products.values().map(|p| {
            let stock = st.inventory.get(&p.id).map_or(0, Inventory::stock_available);
            (p.clone(), stock)
        });
        Ok(filter.apply(rows, |stock| *stock))
    }

    async fn categories(&self) -> StoreResult<Vec<String>> {
        Ok(categories(self.lock()?.products.values()))
    }

    async fn get_inventory(&self, product_id: ProductId) -> StoreResult<Option<Inventory>> {
        Ok(self.lock()?.inventory.get(&product_id).cloned())
    }

    async fn list_inventory(&self) -> StoreResult<Vec<(Product, Inventory)>> {
        let st = self.lock()?;
        let mut rows: Vec<(Product, Inventory)> = st
            .products
            .values()
            .filter_map(|p| st.inventory.get(&p.id).map(|inv| (p.clone(), inv.clone())))
            .collect();
        rows.sort_by(|(a, _), (b, _)| by_category_then_name(a, b));
        Ok(rows)
    }

    async fn set_stock(
        &self,
        product_id: ProductId,
        stock: i64,
        now: DateTime<Utc>,
    ) -> StoreResult<Inventory> {
        let mut st = self.lock()?;
        let inv = st
            .inventory
            .get_mut(&product_id)
            .ok_or_else(|| StoreError::not_found(format!("inventory for product {product_id}")))?;
        inv.set(stock, now)?;
        Ok(inv.clone())
    }

    async fn adjust_stock(
        &self,
        product_id: ProductId,
        delta: i64,
        now: DateTime<Utc>,
    ) -> StoreResult<Inventory> {
        let mut st = self.lock()?;
        let inv = st
            .inventory
            .get_mut(&product_id)
            .ok_or_else(|| StoreError::not_found(format!("inventory for product {product_id}")))?;
        inv.adjust(delta, now)?;
        Ok(inv.clone())
    }
}

#[async_trait]
impl CartStore for InMemoryStore {
    async fn add_or_merge(
        &self,
        customer_id: CustomerId,
        product_id: ProductId,
        quantity: Quantity,
        now: DateTime<Utc>,
    ) -> StoreResult<(CartLine, bool)> {
        let mut st = self.lock()?;
        if !st.customers.contains_key(&customer_id) {
            return Err(StoreError::not_found(format!("customer {customer_id}")));
        }
        if !st.products.contains_key(&product_id) {
            return Err(StoreError::not_found(format!("product {product_id}")));
        }
        let cart = st
            .carts
            .entry(customer_id)
            .or_insert_with(|| Cart::new(customer_id));
        Ok(cart.add_or_merge(product_id, quantity, now)?)
    }

    async fn get_line(&self, line_id: CartLineId) -> StoreResult<Option<CartLine>> {
        let st = self.lock()?;
        Ok(st.carts.values().find_map(|c| c.line(line_id).cloned()))
    }

    async fn update_quantity(&self, line_id: CartLineId, quantity: Quantity) -> StoreResult<CartLine> {
        let mut st = self.lock()?;
        let cart = st
            .cart_of_line(line_id)
            .ok_or_else(|| StoreError::not_found(format!("cart line {line_id}")))?;
        Ok(cart.update_quantity(line_id, quantity)?)
    }

    async fn remove_line(&self, line_id: CartLineId) -> StoreResult<CartLine> {
        let mut st = self.lock()?;
        let cart = st
            .cart_of_line(line_id)
            .ok_or_else(|| StoreError::not_found(format!("cart line {line_id}")))?;
        Ok(cart.remove(line_id)?)
    }

    async fn clear_cart(&self, customer_id: CustomerId) -> StoreResult<u64> {
        let mut st = self.lock()?;
        Ok(st.carts.get_mut(&customer_id).map_or(0, |c| c.clear() as u64))
    }

    async fn list_lines(&self, customer_id: CustomerId) -> StoreResult<Vec<CartLine>> {
        let st = self.lock()?;
        Ok(st
            .carts
            .get(&customer_id)
            .map(|c| c.lines().to_vec())
            .unwrap_or_default())
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn commit_order(&self, order: &Order, consumed_lines: &[CartLineId]) -> StoreResult<()> {
        let Some(customer_id) = order.customer_id() else {
            return Err(DomainError::invariant("order has not been placed").into());
        };
        let now = order.created_at().unwrap_or_else(Utc::now);
        let demands: Vec<(ProductId, Quantity)> = order
            .items()
            .iter()
            .map(|i| (i.product_id, i.quantity))
            .collect();

        let mut st = self.lock()?;
        if st.orders.contains_key(order.id()) {
            return Err(StoreError::Conflict(format!("order {} already exists", order.id())));
        }
        if let Some(item) = order
            .items()
            .iter()
            .find(|i| !st.products.get(&i.product_id).is_some_and(Product::can_be_sold))
        {
            return Err(DomainError::validation(format!(
                "product {} is no longer available",
                item.product_id
            ))
            .into());
        }
        reserve_all(&mut st.inventory, &demands, now)?;
        st.orders.insert(*order.id(), order.clone());
        let removed = st
            .carts
            .get_mut(&customer_id)
            .map_or(0, |c| c.remove_lines(consumed_lines));

        debug!(order_id = %order.id(), removed_lines = removed, "order committed");
        Ok(())
    }

    async fn get_order(&self, id: OrderId) -> StoreResult<Option<Order>> {
        Ok(self.lock()?.orders.get(&id).cloned())
    }

    async fn list_orders(&self, customer_id: Option<CustomerId>) -> StoreResult<Vec<Order>> {
        let st = self.lock()?;
        let mut orders: Vec<Order> = st
            .orders
            .values()
            .filter(|o| customer_id.is_none() || o.customer_id() == customer_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| b.id().cmp(a.id()))
        });
        Ok(orders)
    }

    async fn save_status(&self, order: &Order, expected: ExpectedVersion) -> StoreResult<()> {
        let mut st = self.lock()?;
        let stored = st
            .orders
            .get_mut(order.id())
            .ok_or_else(|| StoreError::not_found(format!("order {}", order.id())))?;
        if !expected.matches(stored.version()) {
            return Err(StoreError::Conflict(format!(
                "order {} was modified concurrently (expected {:?}, found version {})",
                order.id(),
                expected,
                stored.version()
            )));
        }
        *stored = order.clone();
        Ok(())
    }
}

#[async_trait]
impl CustomerStore for InMemoryStore {
    async fn insert_customer(&self, customer: &Customer) -> StoreResult<()> {
        let mut st = self.lock()?;
        if st.customers.values().any(|c| c.email == customer.email) {
            return Err(StoreError::Conflict(format!(
                "email '{}' is already registered",
                customer.email
            )));
        }
        if st.customers.contains_key(&customer.id) {
            return Err(StoreError::Conflict(format!("customer {} already exists", customer.id)));
        }
        st.customers.insert(customer.id, customer.clone());
        Ok(())
    }

    async fn update_customer(&self, customer: &Customer) -> StoreResult<()> {
        let mut st = self.lock()?;
        if st
            .customers
            .values()
            .any(|c| c.id != customer.id && c.email == customer.email)
        {
            return Err(StoreError::Conflict(format!(
                "email '{}' is already registered",
                customer.email
            )));
        }
        match st.customers.get_mut(&customer.id) {
            Some(slot) => {
                *slot = customer.clone();
                Ok(())
            }
            None => Err(StoreError::not_found(format!("customer {}", customer.id))),
        }
    }

    async fn get_customer(&self, id: CustomerId) -> StoreResult<Option<Customer>> {
        Ok(self.lock()?.customers.get(&id).cloned())
    }

    async fn list_customers(&self) -> StoreResult<Vec<Customer>> {
        let st = self.lock()?;
        let mut out: Vec<Customer> = st.customers.values().cloned().collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(out)
    }
}

#[async_trait]
impl MaintenanceStore for InMemoryStore {
    async fn purge_customer(&self, id: CustomerId) -> StoreResult<PurgeReport> {
        let mut st = self.lock()?;
        if !st.customers.contains_key(&id) {
            return Err(StoreError::not_found(format!("customer {id}")));
        }

        let mut report = PurgeReport {
            cart_lines: st.carts.remove(&id).map_or(0, |c| c.lines().len() as u64),
            ..PurgeReport::default()
        };

        let order_ids: Vec<OrderId> = st
            .orders
            .values()
            .filter(|o| o.customer_id() == Some(id))
            .map(|o| *o.id())
            .collect();
        for order_id in order_ids {
            if let Some(order) = st.orders.remove(&order_id) {
                report.order_items += order.items().len() as u64;
                report.orders += 1;
            }
        }

        st.customers.remove(&id);
        report.customers = 1;
        Ok(report)
    }

    async fn reset_catalog(&self) -> StoreResult<ResetReport> {
        let mut st = self.lock()?;
        let report = ResetReport {
            cart_lines: st.carts.values().map(|c| c.lines().len() as u64).sum(),
            order_items: st.orders.values().map(|o| o.items().len() as u64).sum(),
            orders: st.orders.len() as u64,
            inventory: st.inventory.len() as u64,
            products: st.products.len() as u64,
        };
        st.carts.clear();
        st.orders.clear();
        st.inventory.clear();
        st.products.clear();
        Ok(report)
    }
}
