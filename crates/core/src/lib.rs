//! Domain foundation: ids, errors, quantities and aggregate traits.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the domain error model, quantities and the aggregate traits the
//! catalog, customer and sales modules build on.

pub mod aggregate;
pub mod entity;
pub mod error;
pub mod id;
pub mod quantity;
pub mod value_object;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use entity::{Entity, index_by_id};
pub use error::{DomainError, DomainResult};
pub use id::AggregateId;
pub use quantity::Quantity;
pub use value_object::ValueObject;
