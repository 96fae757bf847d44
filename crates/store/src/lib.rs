//! Storage backends for the order management system.
//!
//! The [`OrderStore`] trait covers every persistent operation the service
//! needs; [`PostgresOrderStore`] is the real backend and owns the order
//! placement transaction (locked stock reads, conditional decrements,
//! all-or-nothing commit), while [`InMemoryOrderStore`] implements the
//! same contract for tests.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryOrderStore;
pub use postgres::PostgresOrderStore;
pub use store::OrderStore;
