//! Configuration loading and representation.
//!
//! Everything is read once from the environment in `main` and handed to the
//! components that need it. Malformed values are errors, never silent defaults.

use std::net::SocketAddr;

use thiserror::Error;

use storefront_observability::LogFormat;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_PAYMENT_METHOD: &str = "Cash on Delivery";
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 50;
pub const DEFAULT_RESTOCK_AMOUNT: i64 = 50;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}' ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(key: &'static str, value: &str, reason: impl ToString) -> Self {
        ConfigError::Invalid {
            key,
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Catalog presentation knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogSettings {
    /// Stock at or below this (and above zero) is `LOW_STOCK`.
    pub low_stock_threshold: i64,
    /// Units added by the `restock_items` bulk action.
    pub restock_amount: i64,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
            restock_amount: DEFAULT_RESTOCK_AMOUNT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSettings {
    /// Label used when an order request carries no payment method.
    pub default_payment_method: String,
}

impl Default for CheckoutSettings {
    fn default() -> Self {
        Self {
            default_payment_method: DEFAULT_PAYMENT_METHOD.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationSettings {
    pub enabled: bool,
    /// Sender address shown in notification logs.
    pub from: String,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            from: "orders@storefront.local".to_string(),
        }
    }
}

/// Process configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// `None` selects the in-memory store.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub log_format: LogFormat,
    pub catalog: CatalogSettings,
    pub checkout: CheckoutSettings,
    pub notifications: NotificationSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            database_url: None,
            database_max_connections: 5,
            log_format: LogFormat::Json,
            catalog: CatalogSettings::default(),
            checkout: CheckoutSettings::default(),
            notifications: NotificationSettings::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = AppConfig::default();

        let bind_addr = match get("BIND_ADDR") {
            Some(v) => v
                .parse::<SocketAddr>()
                .map_err(|e| ConfigError::invalid("BIND_ADDR", &v, e))?,
            None => defaults.bind_addr,
        };

        let database_max_connections = match get("DATABASE_MAX_CONNECTIONS") {
            Some(v) => match v.parse::<u32>() {
                Ok(0) => {
                    return Err(ConfigError::invalid(
                        "DATABASE_MAX_CONNECTIONS",
                        &v,
                        "must be at least 1",
                    ));
                }
                Ok(n) => n,
                Err(e) => return Err(ConfigError::invalid("DATABASE_MAX_CONNECTIONS", &v, e)),
            },
            None => defaults.database_max_connections,
        };

        let log_format = match get("LOG_FORMAT") {
            Some(v) => v
                .parse::<LogFormat>()
                .map_err(|e| ConfigError::invalid("LOG_FORMAT", &v, e))?,
            None => defaults.log_format,
        };

        let low_stock_threshold = non_negative(
            get("LOW_STOCK_THRESHOLD"),
            "LOW_STOCK_THRESHOLD",
            DEFAULT_LOW_STOCK_THRESHOLD,
        )?;
        let restock_amount = match get("RESTOCK_AMOUNT") {
            Some(v) => match v.parse::<i64>() {
                Ok(n) if n > 0 => n,
                Ok(_) => return Err(ConfigError::invalid("RESTOCK_AMOUNT", &v, "must be positive")),
                Err(e) => return Err(ConfigError::invalid("RESTOCK_AMOUNT", &v, e)),
            },
            None => DEFAULT_RESTOCK_AMOUNT,
        };

        let enabled = match get("NOTIFICATIONS_ENABLED") {
            Some(v) => parse_bool(&v).ok_or_else(|| {
                ConfigError::invalid("NOTIFICATIONS_ENABLED", &v, "expected true or false")
            })?,
            None => defaults.notifications.enabled,
        };

        Ok(Self {
            bind_addr,
            database_url: get("DATABASE_URL"),
            database_max_connections,
            log_format,
            catalog: CatalogSettings {
                low_stock_threshold,
                restock_amount,
            },
            checkout: CheckoutSettings {
                default_payment_method: get("DEFAULT_PAYMENT_METHOD")
                    .unwrap_or(defaults.checkout.default_payment_method),
            },
            notifications: NotificationSettings {
                enabled,
                from: get("NOTIFICATION_FROM").unwrap_or(defaults.notifications.from),
            },
        })
    }
}

fn non_negative(value: Option<String>, key: &'static str, default: i64) -> Result<i64, ConfigError> {
    match value {
        Some(v) => match v.parse::<i64>() {
            Ok(n) if n >= 0 => Ok(n),
            Ok(_) => Err(ConfigError::invalid(key, &v, "cannot be negative")),
            Err(e) => Err(ConfigError::invalid(key, &v, e)),
        },
        None => Ok(default),
    }
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
