//! Value object trait: equality by value, not identity.
//!
//! Value objects are domain objects that have **no identity**: they are defined
//! entirely by their attribute values. A [`Quantity`](crate::Quantity) of 3 is the
//! same wherever it appears; a product with the same name as another is not.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. To "modify" one,
/// build a new one. Order item snapshots are made of value objects so that
/// a captured unit price can never drift after the order is placed.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
