//! Domain error model shared by the catalog, customer and sales crates.

use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// Why the domain refused an input or a state change.
///
/// Each variant maps to one class of API response: bad input, an illegal
/// state change, a missing referent, or a clash with existing state.
/// Storage failures are not domain errors; they live in the infra crate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed or out-of-range input (blank name, zero quantity, negative price).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The input is well-formed but the current state forbids it
    /// (skipping an order status, stock going below zero).
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// The named thing does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// Duplicate unique key or stale version.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// True for errors caused by the caller's input rather than current state.
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::InvalidId(_))
    }
}
