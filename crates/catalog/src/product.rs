use core::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use storefront_core::{DomainError, DomainResult, Entity, id_newtype};

id_newtype!(
    /// Product identifier.
    ProductId
);

/// Seasonal availability tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Season {
    #[default]
    All,
    Summer,
    Winter,
}

impl Season {
    pub fn as_str(self) -> &'static str {
        match self {
            Season::All => "ALL",
            Season::Summer => "SUMMER",
            Season::Winter => "WINTER",
        }
    }
}

impl FromStr for Season {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ALL" => Ok(Season::All),
            "SUMMER" => Ok(Season::Summer),
            "WINTER" => Ok(Season::Winter),
            other => Err(DomainError::validation(format!(
                "season must be one of ALL, SUMMER, WINTER (got '{other}')"
            ))),
        }
    }
}

/// Prices must stay below 10^10, the range of the `NUMERIC(12, 2)` price column.
pub const PRICE_LIMIT: Decimal = Decimal::from_parts(1_410_065_408, 2, 0, false, 0);

/// The administrator-editable part of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDetails {
    pub name: String,
    pub local_name: Option<String>,
    pub category: String,
    /// Unit price in the store currency.
    pub price: Decimal,
    /// Fraction in [0, 1].
    #[serde(default)]
    pub discount: Decimal,
    #[serde(default)]
    pub season: Season,
}

impl ProductDetails {
    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if self.category.trim().is_empty() {
            return Err(DomainError::validation("category cannot be empty"));
        }
        if self.price < Decimal::ZERO {
            return Err(DomainError::validation("price cannot be negative"));
        }
        if self.price >= PRICE_LIMIT {
            return Err(DomainError::validation(format!("price must be below {PRICE_LIMIT}")));
        }
        if self.price != self.price.round_dp(2) {
            return Err(DomainError::validation("price has more than 2 decimal places"));
        }
        if self.discount < Decimal::ZERO || self.discount > Decimal::ONE {
            return Err(DomainError::validation("discount must be between 0 and 1"));
        }
        if self.discount != self.discount.round_dp(4) {
            return Err(DomainError::validation("discount has more than 4 decimal places"));
        }
        Ok(())
    }

    /// Trim surrounding whitespace; a blank local name becomes `None`.
    fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.category = self.category.trim().to_string();
        self.local_name = self
            .local_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        self
    }
}

/// Catalog entity: Product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    #[serde(flatten)]
    pub details: ProductDetails,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Validate and build a new, active product.
    pub fn create(id: ProductId, details: ProductDetails, now: DateTime<Utc>) -> DomainResult<Self> {
        details.validate()?;
        Ok(Self {
            id,
            details: details.normalized(),
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }

    /// Replace the editable details. Existing order snapshots are unaffected.
    pub fn update(&mut self, details: ProductDetails, now: DateTime<Utc>) -> DomainResult<()> {
        details.validate()?;
        self.details = details.normalized();
        self.updated_at = now;
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.details.name
    }

    pub fn category(&self) -> &str {
        &self.details.category
    }

    pub fn price(&self) -> Decimal {
        self.details.price
    }

    pub fn season(&self) -> Season {
        self.details.season
    }

    /// Price after discount, for display. Order snapshots use [`Product::price`].
    pub fn sale_price(&self) -> Decimal {
        (self.details.price * (Decimal::ONE - self.details.discount)).round_dp(2)
    }

    /// Only active products can be ordered.
    pub fn can_be_sold(&self) -> bool {
        self.is_active
    }

    /// Returns `true` if the flag changed.
    pub fn set_active(&mut self, active: bool, now: DateTime<Utc>) -> bool {
        if self.is_active == active {
            return false;
        }
        self.is_active = active;
        self.updated_at = now;
        true
    }

    /// Returns `true` if the season changed.
    pub fn set_season(&mut self, season: Season, now: DateTime<Utc>) -> bool {
        if self.details.season == season {
            return false;
        }
        self.details.season = season;
        self.updated_at = now;
        true
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
