//! Domain validation errors.

use common::ProductId;
use thiserror::Error;

/// Errors raised while validating order input, before any transaction
/// is opened.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// Buyer identifier is not a valid positive key.
    #[error("Invalid buyer id: {buyer_id} (must be positive)")]
    InvalidBuyer { buyer_id: i64 },

    /// Product identifier is not a valid positive key.
    #[error("Invalid product id: {product_id} (must be positive)")]
    InvalidProduct { product_id: i64 },

    /// Requested quantity must be greater than zero.
    #[error("Invalid quantity for product {product_id}: {quantity} (must be greater than 0)")]
    InvalidQuantity { product_id: ProductId, quantity: u32 },

    /// An order needs at least one line.
    #[error("Order has no lines")]
    NoLines,

    /// The status string does not name a known order status.
    #[error("Unknown order status: {0}")]
    UnknownStatus(String),

    /// Page numbers start at 1.
    #[error("Invalid page number: {page} (must be greater than 0)")]
    InvalidPage { page: u32 },

    /// Page size must be positive.
    #[error("Invalid page limit: {limit} (must be greater than 0)")]
    InvalidLimit { limit: u32 },
}
