use common::{OrderId, ProductId};
use thiserror::Error;

/// Errors that can occur when interacting with the order store.
///
/// The first four variants are business outcomes of the placement
/// transaction; any of them rolls the whole transaction back.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The referenced product does not exist.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// The product exists but is soft-deleted.
    #[error("Product unavailable: {0} is no longer sold")]
    ProductUnavailable(ProductId),

    /// Available stock does not cover the requested quantity.
    #[error(
        "Insufficient stock for product {product_id}: available {available}, requested {requested}"
    )]
    InsufficientStock {
        product_id: ProductId,
        available: i64,
        requested: u32,
    },

    /// The conditional stock decrement affected zero rows despite a prior
    /// sufficient locked read. Unreachable under correct row locking;
    /// surfaced as its own kind so a detected race is retryable.
    #[error("Concurrent stock conflict for product {0}, retry the order")]
    StockConflict(ProductId),

    /// The referenced order does not exist.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    /// True for failures where retrying the whole order from scratch can
    /// succeed. Everything else is terminal for the given input.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::StockConflict(_) | StoreError::Database(_))
    }
}

/// Result type for order store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_conflicts_and_database_errors_are_retryable() {
        assert!(StoreError::StockConflict(ProductId::new(1)).is_retryable());
        assert!(StoreError::Database(sqlx::Error::PoolClosed).is_retryable());
        assert!(!StoreError::ProductNotFound(ProductId::new(1)).is_retryable());
        assert!(
            !StoreError::InsufficientStock {
                product_id: ProductId::new(1),
                available: 2,
                requested: 5
            }
            .is_retryable()
        );
    }
}
