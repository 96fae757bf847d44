//! The storage contract consumed by the HTTP layer.

use async_trait::async_trait;
use common::OrderId;
use domain::{Order, OrderDraft, OrderLine, OrderStats, OrderStatus, Page, Paged, PlacedOrder, Product};

use crate::Result;

/// Persistent operations over orders and products.
///
/// Implementations must make [`place_order`](OrderStore::place_order)
/// atomic: on success the order, its lines, and every stock decrement are
/// committed together; on any failure the store is left exactly as it was
/// before the call.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Places an order: reserves stock for every line under row locks and
    /// commits the order with its price-snapshot lines, or fails with the
    /// first offending line's error and no visible writes.
    async fn place_order(&self, draft: OrderDraft) -> Result<PlacedOrder>;

    /// Loads a single order by id.
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>>;

    /// Lists orders, oldest first.
    async fn list_orders(&self, page: Page) -> Result<Paged<Order>>;

    /// Lists the lines of an order, in insertion order.
    async fn list_lines(&self, order_id: OrderId) -> Result<Vec<OrderLine>>;

    /// Sets the lifecycle status of an order.
    async fn update_status(&self, id: OrderId, status: OrderStatus) -> Result<()>;

    /// Aggregate statistics over all orders plus today's (UTC) orders.
    async fn order_stats(&self) -> Result<OrderStats>;

    /// Lists active (non-soft-deleted) products.
    async fn list_products(&self, page: Page) -> Result<Paged<Product>>;
}
