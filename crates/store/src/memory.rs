use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{OrderId, ProductId};
use tokio::sync::RwLock;

use domain::{
    Money, Order, OrderDraft, OrderLine, OrderNumber, OrderStats, OrderStatus, Page, Paged,
    PlacedOrder, Product,
};

use crate::{Result, StoreError, store::OrderStore};

/// In-memory order store implementation for testing.
///
/// Provides the same contract as the PostgreSQL implementation. The whole
/// state sits behind one write lock, so a placement is trivially atomic:
/// every line is validated before anything is mutated, which gives failed
/// placements the same leave-no-trace guarantee a rollback does.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Default)]
struct Inner {
    products: BTreeMap<i64, ProductRecord>,
    orders: BTreeMap<i64, Order>,
    lines: Vec<OrderLine>,
    last_product_id: i64,
    last_order_id: i64,
    last_line_id: i64,
}

struct ProductRecord {
    product: Product,
    is_deleted: bool,
}

impl InMemoryOrderStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a product and returns its generated id.
    pub async fn add_product(&self, name: &str, price: Money, stock: i64) -> ProductId {
        let mut inner = self.inner.write().await;
        inner.last_product_id += 1;
        let id = ProductId::new(inner.last_product_id);
        let now = Utc::now();
        inner.products.insert(
            id.as_i64(),
            ProductRecord {
                product: Product {
                    id,
                    name: name.to_string(),
                    price,
                    stock,
                    created_at: now,
                    updated_at: now,
                },
                is_deleted: false,
            },
        );
        id
    }

    /// Marks a product soft-deleted.
    pub async fn soft_delete_product(&self, id: ProductId) {
        let mut inner = self.inner.write().await;
        if let Some(record) = inner.products.get_mut(&id.as_i64()) {
            record.is_deleted = true;
        }
    }

    /// Current stock of a product, if it exists.
    pub async fn product_stock(&self, id: ProductId) -> Option<i64> {
        let inner = self.inner.read().await;
        inner.products.get(&id.as_i64()).map(|r| r.product.stock)
    }

    /// Total number of persisted orders.
    pub async fn order_count(&self) -> usize {
        self.inner.read().await.orders.len()
    }

    /// Total number of persisted order lines.
    pub async fn line_count(&self) -> usize {
        self.inner.read().await.lines.len()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn place_order(&self, draft: OrderDraft) -> Result<PlacedOrder> {
        let mut inner = self.inner.write().await;

        // Validate every line before touching any state. `reserved` tracks
        // stock already claimed by earlier lines of this draft, so duplicate
        // product ids re-check the remaining quantity.
        let mut reserved: BTreeMap<i64, i64> = BTreeMap::new();
        for line in draft.lines() {
            let Some(record) = inner.products.get(&line.product_id.as_i64()) else {
                return Err(StoreError::ProductNotFound(line.product_id));
            };
            if record.is_deleted {
                return Err(StoreError::ProductUnavailable(line.product_id));
            }
            let available =
                record.product.stock - reserved.get(&line.product_id.as_i64()).copied().unwrap_or(0);
            if available < i64::from(line.quantity) {
                return Err(StoreError::InsufficientStock {
                    product_id: line.product_id,
                    available,
                    requested: line.quantity,
                });
            }
            *reserved.entry(line.product_id.as_i64()).or_default() += i64::from(line.quantity);
        }

        // All lines check out; apply the writes.
        let now = Utc::now();
        inner.last_order_id += 1;
        let order_id = OrderId::new(inner.last_order_id);
        let number = OrderNumber::generate();

        let mut total = Money::zero();
        for line in draft.lines() {
            let record = inner
                .products
                .get_mut(&line.product_id.as_i64())
                .ok_or(StoreError::ProductNotFound(line.product_id))?;
            record.product.stock -= i64::from(line.quantity);
            record.product.updated_at = now;

            let unit_price = record.product.price;
            let subtotal = unit_price.times(line.quantity);
            total = total.add(subtotal);

            inner.last_line_id += 1;
            let line_id = inner.last_line_id;
            inner.lines.push(OrderLine {
                id: line_id,
                order_id,
                product_id: line.product_id,
                quantity: line.quantity,
                unit_price,
                subtotal,
            });
        }

        inner.orders.insert(
            order_id.as_i64(),
            Order {
                id: order_id,
                buyer_id: draft.buyer_id(),
                number: number.clone(),
                status: OrderStatus::Pending,
                total_amount: total,
                created_at: now,
                updated_at: now,
            },
        );

        Ok(PlacedOrder {
            id: order_id,
            number,
        })
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let inner = self.inner.read().await;
        Ok(inner.orders.get(&id.as_i64()).cloned())
    }

    async fn list_orders(&self, page: Page) -> Result<Paged<Order>> {
        let inner = self.inner.read().await;
        let total_items = inner.orders.len() as u64;
        let orders: Vec<Order> = inner
            .orders
            .values()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .cloned()
            .collect();
        Ok(Paged::new(orders, page, total_items))
    }

    async fn list_lines(&self, order_id: OrderId) -> Result<Vec<OrderLine>> {
        let inner = self.inner.read().await;
        Ok(inner
            .lines
            .iter()
            .filter(|line| line.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn update_status(&self, id: OrderId, status: OrderStatus) -> Result<()> {
        let mut inner = self.inner.write().await;
        let order = inner
            .orders
            .get_mut(&id.as_i64())
            .ok_or(StoreError::OrderNotFound(id))?;
        order.status = status;
        order.updated_at = Utc::now();
        Ok(())
    }

    async fn order_stats(&self) -> Result<OrderStats> {
        let inner = self.inner.read().await;
        let today = Utc::now().date_naive();

        let mut stats = OrderStats::default();
        for order in inner.orders.values() {
            stats.total_orders += 1;
            stats.total_amount = stats.total_amount.add(order.total_amount);
            if order.created_at.date_naive() == today {
                stats.today_orders += 1;
                stats.today_amount = stats.today_amount.add(order.total_amount);
            }
        }
        Ok(stats)
    }

    async fn list_products(&self, page: Page) -> Result<Paged<Product>> {
        let inner = self.inner.read().await;
        let active: Vec<&ProductRecord> = inner
            .products
            .values()
            .filter(|record| !record.is_deleted)
            .collect();
        let total_items = active.len() as u64;
        let products: Vec<Product> = active
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .map(|record| record.product.clone())
            .collect();
        Ok(Paged::new(products, page, total_items))
    }
}
