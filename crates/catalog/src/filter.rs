//! Storefront listing filters.

use serde::{Deserialize, Serialize};

use crate::product::{Product, Season};

/// Query over the active catalog.
///
/// Empty strings are treated as "no filter" so query strings like
/// `?category=&search=` behave like an unfiltered listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub season: Option<Season>,
    pub search: Option<String>,
    #[serde(default)]
    pub in_stock: bool,
}

impl ProductFilter {
    /// Category to match, ignoring blank input.
    pub fn category_term(&self) -> Option<&str> {
        non_blank(&self.category)
    }

    /// Search term, ignoring blank input.
    pub fn search_term(&self) -> Option<&str> {
        non_blank(&self.search)
    }

    /// Whether `product` with `stock` units available passes the filter.
    /// Inactive products never match.
    pub fn matches(&self, product: &Product, stock: i64) -> bool {
        if !product.is_active {
            return false;
        }
        if let Some(category) = self.category_term() {
            if !product.category().eq_ignore_ascii_case(category) {
                return false;
            }
        }
        if let Some(season) = self.season {
            if product.season() != season {
                return false;
            }
        }
        if let Some(term) = self.search_term() {
            let term = term.to_lowercase();
            let in_name = product.name().to_lowercase().contains(&term);
            let in_local = product
                .details
                .local_name
                .as_deref()
                .is_some_and(|n| n.to_lowercase().contains(&term));
            if !in_name && !in_local {
                return false;
            }
        }
        if self.in_stock && stock <= 0 {
            return false;
        }
        true
    }

    /// Filter and order by category then name.
    pub fn apply<T>(
        &self,
        rows: impl IntoIterator<Item = (Product, T)>,
        stock_of: impl Fn(&T) -> i64,
    ) -> Vec<(Product, T)> {
        let mut out: Vec<(Product, T)> = rows
            .into_iter()
            .filter(|(p, extra)| self.matches(p, stock_of(extra)))
            .collect();
        out.sort_by(|(a, _), (b, _)| {
            a.category()
                .cmp(b.category())
                .then_with(|| a.name().cmp(b.name()))
        });
        out
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Distinct categories of active products, sorted.
pub fn categories<'a>(products: impl IntoIterator<Item = &'a Product>) -> Vec<String> {
    let mut out: Vec<String> = products
        .into_iter()
        .filter(|p| p.is_active)
        .map(|p| p.category().to_string())
        .collect();
    out.sort();
    out.dedup();
    out
}
