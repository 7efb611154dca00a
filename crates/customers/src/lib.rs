//! Customers domain module: the account directory carts and orders refer to.

pub mod customer;

pub use customer::{Customer, CustomerEvent, CustomerId, CustomerRegistered, NewCustomer, normalize_email};
