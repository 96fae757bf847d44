//! Shared identifier types for the order management system.

pub mod types;

pub use types::{BuyerId, OrderId, ProductId};
