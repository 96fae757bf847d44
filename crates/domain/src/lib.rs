//! Domain types and input validation for the order management system.
//!
//! Everything here is pure data: identifiers, money, order and product
//! records, and the validated [`OrderDraft`] that the storage layer turns
//! into a placement transaction. No I/O happens in this crate.

pub mod draft;
pub mod error;
pub mod money;
pub mod number;
pub mod order;
pub mod page;
pub mod product;

pub use common::{BuyerId, OrderId, ProductId};
pub use draft::{LineRequest, OrderDraft};
pub use error::OrderError;
pub use money::Money;
pub use number::OrderNumber;
pub use order::{Order, OrderLine, OrderStats, OrderStatus, PlacedOrder};
pub use page::{Page, Paged};
pub use product::Product;
