//! Pure steps of the cart-to-order transition.
//!
//! The infra layer owns the transaction; this module decides what goes into it.

use std::collections::HashMap;

use storefront_catalog::{Product, ProductId};
use storefront_core::{DomainError, DomainResult, Quantity};

use crate::order::OrderItem;

/// Merge repeated products (summing quantities) and keep first-seen order.
pub fn coalesce(lines: &[(ProductId, Quantity)]) -> DomainResult<Vec<(ProductId, Quantity)>> {
    if lines.is_empty() {
        return Err(DomainError::validation("an order needs at least one item"));
    }
    let mut out: Vec<(ProductId, Quantity)> = Vec::with_capacity(lines.len());
    for (product_id, quantity) in lines {
        match out.iter_mut().find(|(p, _)| p == product_id) {
            Some((_, existing)) => *existing = existing.checked_add(*quantity)?,
            None => out.push((*product_id, *quantity)),
        }
    }
    Ok(out)
}

/// Freeze product name and current price into order items.
///
/// Every product must exist and be active. `lines` should already be coalesced.
pub fn snapshot_items(
    lines: &[(ProductId, Quantity)],
    products: &HashMap<ProductId, Product>,
) -> DomainResult<Vec<OrderItem>> {
    lines
        .iter()
        .enumerate()
        .map(|(idx, (product_id, quantity))| {
            let product = products
                .get(product_id)
                .ok_or_else(|| DomainError::validation(format!("product {product_id} does not exist")))?;
            if !product.can_be_sold() {
                return Err(DomainError::validation(format!(
                    "product '{}' is not available",
                    product.name()
                )));
            }
            Ok(OrderItem {
                line_no: idx as u32 + 1,
                product_id: *product_id,
                product_name: product.name().to_string(),
                quantity: *quantity,
                unit_price: product.price(),
            })
        })
        .collect()
}

/// Use the requested payment label, or `default` when it is absent or blank.
pub fn resolve_payment_method(requested: Option<&str>, default: &str) -> String {
    requested
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(default)
        .to_string()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;
    use storefront_catalog::{ProductDetails, Season};

    use super::*;

    fn qty(n: i64) -> Quantity {
        Quantity::new(n).unwrap()
    }

    fn product(name: &str, price: i64) -> Product {
        Product::create(
            ProductId::generate(),
            ProductDetails {
                name: name.into(),
                local_name: None,
                category: "Vegetables".into(),
                price: Decimal::from(price),
                discount: Decimal::new(10, 2),
                season: Season::All,
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn coalesce_sums_duplicates_in_first_position() {
        let (a, b) = (ProductId::generate(), ProductId::generate());
        let out = coalesce(&[(a, qty(1)), (b, qty(2)), (a, qty(4))]).unwrap();
        assert_eq!(out, vec![(a, qty(5)), (b, qty(2))]);
    }

    #[test]
    fn coalesce_rejects_empty() {
        assert!(matches!(coalesce(&[]), Err(DomainError::Validation(_))));
    }

    #[test]
    fn snapshot_uses_list_price_not_sale_price() {
        let p = product("Tomato", 120);
        let id = p.id;
        let products = HashMap::from([(id, p)]);
        let items = snapshot_items(&[(id, qty(2))], &products).unwrap();
        assert_eq!(items[0].unit_price, Decimal::from(120));
        assert_eq!(items[0].product_name, "Tomato");
        assert_eq!(items[0].line_no, 1);
    }

    #[test]
    fn snapshot_rejects_missing_and_inactive_products() {
        let mut p = product("Tomato", 120);
        p.set_active(false, Utc::now());
        let id = p.id;
        let products = HashMap::from([(id, p)]);
        assert!(snapshot_items(&[(id, qty(1))], &products).is_err());
        assert!(snapshot_items(&[(ProductId::generate(), qty(1))], &products).is_err());
    }

    #[test]
    fn payment_method_defaults_when_blank() {
        assert_eq!(resolve_payment_method(None, "Cash on Delivery"), "Cash on Delivery");
        assert_eq!(resolve_payment_method(Some("  "), "Cash on Delivery"), "Cash on Delivery");
        assert_eq!(resolve_payment_method(Some(" Card "), "Cash on Delivery"), "Card");
    }
}
