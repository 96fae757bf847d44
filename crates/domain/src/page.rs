//! Pagination types shared by listing endpoints.

use serde::{Deserialize, Serialize};

use crate::error::OrderError;

/// A validated page request (1-based page number, positive limit).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    page: u32,
    limit: u32,
}

impl Page {
    /// Validates a page request.
    pub fn new(page: u32, limit: u32) -> Result<Self, OrderError> {
        if page == 0 {
            return Err(OrderError::InvalidPage { page });
        }
        if limit == 0 {
            return Err(OrderError::InvalidLimit { limit });
        }
        Ok(Self { page, limit })
    }

    pub fn number(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Row offset of the first item on this page.
    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.limit)
    }
}

/// One page of results plus paging metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paged<T> {
    pub data: Vec<T>,
    pub page: u32,
    pub total_pages: u64,
    pub total_items: u64,
}

impl<T> Paged<T> {
    /// Builds a page of results, deriving `total_pages` from the item count.
    pub fn new(data: Vec<T>, page: Page, total_items: u64) -> Self {
        let total_pages = if total_items == 0 {
            0
        } else {
            total_items.div_ceil(u64::from(page.limit()))
        };
        Self {
            data,
            page: page.number(),
            total_pages,
            total_items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_is_zero_based() {
        assert_eq!(Page::new(1, 20).unwrap().offset(), 0);
        assert_eq!(Page::new(3, 20).unwrap().offset(), 40);
    }

    #[test]
    fn rejects_zero_page_and_limit() {
        assert_eq!(
            Page::new(0, 20).unwrap_err(),
            OrderError::InvalidPage { page: 0 }
        );
        assert_eq!(
            Page::new(1, 0).unwrap_err(),
            OrderError::InvalidLimit { limit: 0 }
        );
    }

    #[test]
    fn total_pages_rounds_up() {
        let page = Page::new(1, 20).unwrap();
        assert_eq!(Paged::<i32>::new(vec![], page, 0).total_pages, 0);
        assert_eq!(Paged::<i32>::new(vec![], page, 20).total_pages, 1);
        assert_eq!(Paged::<i32>::new(vec![], page, 21).total_pages, 2);
    }
}
