use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use storefront_catalog::{Product, ProductId};
use storefront_core::{DomainError, DomainResult, Quantity, id_newtype};
use storefront_customers::CustomerId;

id_newtype!(
    /// Cart line identifier.
    CartLineId
);

/// One (customer, product) pair in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub id: CartLineId,
    pub customer_id: CustomerId,
    pub product_id: ProductId,
    pub quantity: Quantity,
    pub added_at: DateTime<Utc>,
}

/// Aggregate: one customer's cart.
///
/// Holds at most one line per product. Adding a product that is already in the
/// cart merges into the existing line. Stock is not checked here; checkout does that.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cart {
    customer_id: CustomerId,
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new(customer_id: CustomerId) -> Self {
        Self {
            customer_id,
            lines: Vec::new(),
        }
    }

    /// Rebuild from stored lines, keeping insertion order.
    pub fn from_lines(customer_id: CustomerId, mut lines: Vec<CartLine>) -> Self {
        lines.retain(|l| l.customer_id == customer_id);
        lines.sort_by_key(|l| (l.added_at, l.id));
        Self { customer_id, lines }
    }

    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<CartLine> {
        self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line(&self, line_id: CartLineId) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.id == line_id)
    }

    /// Add `quantity` of `product_id`, merging into an existing line.
    ///
    /// Returns the resulting line and whether it was newly created.
    pub fn add_or_merge(
        &mut self,
        product_id: ProductId,
        quantity: Quantity,
        now: DateTime<Utc>,
    ) -> DomainResult<(CartLine, bool)> {
        if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product_id) {
            line.quantity = line.quantity.checked_add(quantity)?;
            return Ok((line.clone(), false));
        }
        let line = CartLine {
            id: CartLineId::generate(),
            customer_id: self.customer_id,
            product_id,
            quantity,
            added_at: now,
        };
        self.lines.push(line.clone());
        Ok((line, true))
    }

    pub fn update_quantity(&mut self, line_id: CartLineId, quantity: Quantity) -> DomainResult<CartLine> {
        let line = self
            .lines
            .iter_mut()
            .find(|l| l.id == line_id)
            .ok_or_else(|| DomainError::not_found(format!("cart line {line_id}")))?;
        line.quantity = quantity;
        Ok(line.clone())
    }

    pub fn remove(&mut self, line_id: CartLineId) -> DomainResult<CartLine> {
        let pos = self
            .lines
            .iter()
            .position(|l| l.id == line_id)
            .ok_or_else(|| DomainError::not_found(format!("cart line {line_id}")))?;
        Ok(self.lines.remove(pos))
    }

    /// Remove every line. Returns how many were removed (0 on an empty cart).
    pub fn clear(&mut self) -> usize {
        let n = self.lines.len();
        self.lines.clear();
        n
    }

    /// Remove the given lines (lines consumed by an order). Unknown ids are ignored.
    pub fn remove_lines(&mut self, line_ids: &[CartLineId]) -> usize {
        let before = self.lines.len();
        self.lines.retain(|l| !line_ids.contains(&l.id));
        before - self.lines.len()
    }

    /// Summary at live catalog prices. Only an estimate: orders snapshot their own prices.
    pub fn summary(&self, products: &HashMap<ProductId, Product>) -> DomainResult<CartSummary> {
        let mut lines = Vec::with_capacity(self.lines.len());
        let mut estimated_total = Decimal::ZERO;
        for line in &self.lines {
            let product = products.get(&line.product_id);
            let unit_price = product.map(Product::price);
            let subtotal = unit_price
                .unwrap_or_default()
                .checked_mul(Decimal::from(line.quantity.get()))
                .ok_or_else(|| DomainError::validation("cart line subtotal is too large"))?;
            estimated_total = estimated_total
                .checked_add(subtotal)
                .ok_or_else(|| DomainError::validation("cart total is too large"))?;
            lines.push(CartSummaryLine {
                line_id: line.id,
                product_id: line.product_id,
                product_name: product.map(|p| p.name().to_string()),
                quantity: line.quantity,
                unit_price,
                subtotal,
            });
        }

        Ok(CartSummary {
            customer_id: self.customer_id,
            total_items: lines.len(),
            total_quantity: lines.iter().map(|l| u64::from(l.quantity.get())).sum(),
            estimated_total,
            lines,
        })
    }
}

/// One line of a [`CartSummary`]. `product_name`/`unit_price` are `None` if the
/// product vanished from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartSummaryLine {
    pub line_id: CartLineId,
    pub product_id: ProductId,
    pub product_name: Option<String>,
    pub quantity: Quantity,
    pub unit_price: Option<Decimal>,
    pub subtotal: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartSummary {
    pub customer_id: CustomerId,
    pub lines: Vec<CartSummaryLine>,
    /// Number of distinct lines.
    pub total_items: usize,
    pub total_quantity: u64,
    pub estimated_total: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_catalog::{ProductDetails, Season};

    fn qty(n: i64) -> Quantity {
        Quantity::new(n).unwrap()
    }

    fn product(price: i64) -> Product {
        Product::create(
            ProductId::generate(),
            ProductDetails {
                name: "Tomato".into(),
                local_name: None,
                category: "Vegetables".into(),
                price: Decimal::from(price),
                discount: Decimal::ZERO,
                season: Season::All,
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn adding_same_product_merges() {
        let mut cart = Cart::new(CustomerId::generate());
        let p = ProductId::generate();
        let (first, created) = cart.add_or_merge(p, qty(2), Utc::now()).unwrap();
        assert!(created);
        let (merged, created) = cart.add_or_merge(p, qty(3), Utc::now()).unwrap();
        assert!(!created);
        assert_eq!(merged.id, first.id);
        assert_eq!(merged.quantity, qty(5));
        assert_eq!(cart.lines().len(), 1);
    }

    #[test]
    fn update_and_remove_unknown_line_is_not_found() {
        let mut cart = Cart::new(CustomerId::generate());
        let missing = CartLineId::generate();
        assert!(matches!(cart.update_quantity(missing, qty(1)), Err(DomainError::NotFound(_))));
        assert!(matches!(cart.remove(missing), Err(DomainError::NotFound(_))));
    }

    #[test]
    fn update_replaces_quantity() {
        let mut cart = Cart::new(CustomerId::generate());
        let (line, _) = cart.add_or_merge(ProductId::generate(), qty(4), Utc::now()).unwrap();
        let updated = cart.update_quantity(line.id, qty(1)).unwrap();
        assert_eq!(updated.quantity, qty(1));
    }

    #[test]
    fn clear_is_idempotent() {
        let mut cart = Cart::new(CustomerId::generate());
        cart.add_or_merge(ProductId::generate(), qty(1), Utc::now()).unwrap();
        cart.add_or_merge(ProductId::generate(), qty(1), Utc::now()).unwrap();
        assert_eq!(cart.clear(), 2);
        assert_eq!(cart.clear(), 0);
        assert!(cart.is_empty());
    }

    #[test]
    fn remove_lines_only_touches_listed_lines() {
        let mut cart = Cart::new(CustomerId::generate());
        let (a, _) = cart.add_or_merge(ProductId::generate(), qty(1), Utc::now()).unwrap();
        let (b, _) = cart.add_or_merge(ProductId::generate(), qty(1), Utc::now()).unwrap();
        assert_eq!(cart.remove_lines(&[a.id, CartLineId::generate()]), 1);
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].id, b.id);
    }

    #[test]
    fn summary_uses_live_prices() {
        let tomato = product(120);
        let onion = product(80);
        let mut cart = Cart::new(CustomerId::generate());
        cart.add_or_merge(tomato.id, qty(2), Utc::now()).unwrap();
        cart.add_or_merge(onion.id, qty(1), Utc::now()).unwrap();
        let products = HashMap::from([(tomato.id, tomato), (onion.id, onion)]);

        let summary = cart.summary(&products).unwrap();
        assert_eq!(summary.total_items, 2);
        assert_eq!(summary.total_quantity, 3);
        assert_eq!(summary.estimated_total, Decimal::from(320));
    }

    #[test]
    fn summary_of_missing_product_contributes_nothing() {
        let mut cart = Cart::new(CustomerId::generate());
        cart.add_or_merge(ProductId::generate(), qty(2), Utc::now()).unwrap();
        let summary = cart.summary(&HashMap::new()).unwrap();
        assert_eq!(summary.lines[0].unit_price, None);
        assert_eq!(summary.estimated_total, Decimal::ZERO);
    }

    #[test]
    fn summary_overflow_is_a_validation_error() {
        let mut pricey = product(1);
        pricey.details.price = "50000000000000000000000000000".parse().unwrap();
        let mut cart = Cart::new(CustomerId::generate());
        cart.add_or_merge(pricey.id, qty(2), Utc::now()).unwrap();
        let products = HashMap::from([(pricey.id, pricey)]);
        assert!(matches!(cart.summary(&products), Err(DomainError::Validation(_))));
    }

    #[test]
    fn from_lines_drops_foreign_lines() {
        let me = CustomerId::generate();
        let mut other = Cart::new(CustomerId::generate());
        other.add_or_merge(ProductId::generate(), qty(1), Utc::now()).unwrap();
        let cart = Cart::from_lines(me, other.into_lines());
        assert!(cart.is_empty());
    }
}
