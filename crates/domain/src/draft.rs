//! Validated order placement input.

use common::{BuyerId, ProductId};

use crate::error::OrderError;

/// One requested line: a product and a quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl LineRequest {
    pub fn new(product_id: impl Into<ProductId>, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// A fully validated placement request.
///
/// Construction rejects invalid input before any transaction is opened,
/// and sorts lines ascending by product id so every placement acquires
/// row locks in the same deterministic order. Two concurrent orders that
/// share products therefore cannot deadlock on each other.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    buyer_id: BuyerId,
    lines: Vec<LineRequest>,
}

impl OrderDraft {
    /// Validates and builds a draft from raw input.
    pub fn new(buyer_id: BuyerId, mut lines: Vec<LineRequest>) -> Result<Self, OrderError> {
        if !buyer_id.is_valid() {
            return Err(OrderError::InvalidBuyer {
                buyer_id: buyer_id.as_i64(),
            });
        }
        if lines.is_empty() {
            return Err(OrderError::NoLines);
        }
        for line in &lines {
            if !line.product_id.is_valid() {
                return Err(OrderError::InvalidProduct {
                    product_id: line.product_id.as_i64(),
                });
            }
            if line.quantity == 0 {
                return Err(OrderError::InvalidQuantity {
                    product_id: line.product_id,
                    quantity: line.quantity,
                });
            }
        }

        // Deterministic lock ordering across all callers.
        lines.sort_by_key(|line| line.product_id);

        Ok(Self { buyer_id, lines })
    }

    pub fn buyer_id(&self) -> BuyerId {
        self.buyer_id
    }

    /// Lines in lock-acquisition order (ascending product id).
    pub fn lines(&self) -> &[LineRequest] {
        &self.lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_draft_is_accepted() {
        let draft = OrderDraft::new(BuyerId::new(1), vec![LineRequest::new(5, 2)]).unwrap();
        assert_eq!(draft.buyer_id(), BuyerId::new(1));
        assert_eq!(draft.lines().len(), 1);
    }

    #[test]
    fn lines_are_sorted_by_product_id() {
        let draft = OrderDraft::new(
            BuyerId::new(1),
            vec![
                LineRequest::new(9, 1),
                LineRequest::new(2, 1),
                LineRequest::new(5, 1),
            ],
        )
        .unwrap();

        let ids: Vec<i64> = draft.lines().iter().map(|l| l.product_id.as_i64()).collect();
        assert_eq!(ids, vec![2, 5, 9]);
    }

    #[test]
    fn rejects_non_positive_buyer() {
        let err = OrderDraft::new(BuyerId::new(0), vec![LineRequest::new(1, 1)]).unwrap_err();
        assert_eq!(err, OrderError::InvalidBuyer { buyer_id: 0 });
    }

    #[test]
    fn rejects_empty_lines() {
        let err = OrderDraft::new(BuyerId::new(1), vec![]).unwrap_err();
        assert_eq!(err, OrderError::NoLines);
    }

    #[test]
    fn rejects_zero_quantity() {
        let err = OrderDraft::new(BuyerId::new(1), vec![LineRequest::new(3, 0)]).unwrap_err();
        assert_eq!(
            err,
            OrderError::InvalidQuantity {
                product_id: ProductId::new(3),
                quantity: 0
            }
        );
    }

    #[test]
    fn rejects_non_positive_product_id() {
        let err = OrderDraft::new(BuyerId::new(1), vec![LineRequest::new(-4, 1)]).unwrap_err();
        assert_eq!(err, OrderError::InvalidProduct { product_id: -4 });
    }
}
