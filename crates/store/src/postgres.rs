//! PostgreSQL-backed order store.
//!
//! Owns the placement transaction: a locked read plus conditional
//! decrement per line, committed only when every line succeeds.

use std::time::Instant;

use async_trait::async_trait;
use common::{BuyerId, OrderId, ProductId};
use sqlx::{PgPool, Row, postgres::PgRow};

use domain::{
    Money, Order, OrderDraft, OrderLine, OrderNumber, OrderStats, OrderStatus, Page, Paged,
    PlacedOrder, Product,
};

use crate::{Result, StoreError, store::OrderStore};

/// PostgreSQL-backed order store implementation.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

/// Product fields captured immediately after the locked read.
///
/// Built from the row before any check runs, so later statements never
/// touch positional row access.
#[derive(Debug)]
struct LockedProduct {
    stock: i64,
    price: Money,
    is_deleted: bool,
}

impl PostgresOrderStore {
    /// Creates a new PostgreSQL order store on an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        let status: String = row.try_get("status")?;
        let status: OrderStatus = status
            .parse()
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

        Ok(Order {
            id: OrderId::new(row.try_get("id")?),
            buyer_id: BuyerId::new(row.try_get("buyer_id")?),
            number: OrderNumber::new(row.try_get::<String, _>("number")?),
            status,
            total_amount: Money::from_cents(row.try_get("total_amount_cents")?),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_line(row: PgRow) -> Result<OrderLine> {
        Ok(OrderLine {
            id: row.try_get("id")?,
            order_id: OrderId::new(row.try_get("order_id")?),
            product_id: ProductId::new(row.try_get("product_id")?),
            quantity: decode_quantity(row.try_get("quantity")?)?,
            unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
            subtotal: Money::from_cents(row.try_get("subtotal_cents")?),
        })
    }

    fn row_to_product(row: PgRow) -> Result<Product> {
        Ok(Product {
            id: ProductId::new(row.try_get("id")?),
            name: row.try_get("name")?,
            price: Money::from_cents(row.try_get("price_cents")?),
            stock: row.try_get("stock")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    /// The reservation transaction.
    ///
    /// Every early `return Err(..)` drops the uncommitted transaction,
    /// which rolls back the order row, all lines, and all decrements.
    /// Dropping the future before commit (request cancellation) takes the
    /// same path.
    async fn place_order_tx(&self, draft: &OrderDraft) -> Result<PlacedOrder> {
        let number = OrderNumber::generate();
        let mut tx = self.pool.begin().await?;

        let order_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO orders (buyer_id, number, status, total_amount_cents)
            VALUES ($1, $2, 'pending', 0)
            RETURNING id
            "#,
        )
        .bind(draft.buyer_id().as_i64())
        .bind(number.as_str())
        .fetch_one(&mut *tx)
        .await?;

        let mut total = Money::zero();
        // Lines arrive sorted ascending by product id, so all placements
        // acquire row locks in the same order.
        for line in draft.lines() {
            let row = sqlx::query(
                "SELECT stock, price_cents, is_deleted FROM products WHERE id = $1 FOR UPDATE",
            )
            .bind(line.product_id.as_i64())
            .fetch_optional(&mut *tx)
            .await?;

            let Some(row) = row else {
                return Err(StoreError::ProductNotFound(line.product_id));
            };
            let product = LockedProduct {
                stock: row.try_get("stock")?,
                price: Money::from_cents(row.try_get("price_cents")?),
                is_deleted: row.try_get("is_deleted")?,
            };

            if product.is_deleted {
                return Err(StoreError::ProductUnavailable(line.product_id));
            }
            if product.stock < i64::from(line.quantity) {
                return Err(StoreError::InsufficientStock {
                    product_id: line.product_id,
                    available: product.stock,
                    requested: line.quantity,
                });
            }

            let affected = sqlx::query(
                r#"
                UPDATE products
                SET stock = stock - $1, updated_at = now()
                WHERE id = $2 AND stock >= $1
                "#,
            )
            .bind(i64::from(line.quantity))
            .bind(line.product_id.as_i64())
            .execute(&mut *tx)
            .await?
            .rows_affected();

            // The row lock from the SELECT above makes this unreachable;
            // kept as an invariant check on the locking itself.
            if affected == 0 {
                return Err(StoreError::StockConflict(line.product_id));
            }

            // Price snapshot: the value read under the lock, not a live
            // reference to the product price.
            let subtotal = product.price.times(line.quantity);
            sqlx::query(
                r#"
                INSERT INTO order_lines (order_id, product_id, quantity, unit_price_cents, subtotal_cents)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(order_id)
            .bind(line.product_id.as_i64())
            .bind(i64::from(line.quantity))
            .bind(product.price.cents())
            .bind(subtotal.cents())
            .execute(&mut *tx)
            .await?;

            total = total.add(subtotal);
        }

        sqlx::query("UPDATE orders SET total_amount_cents = $1, updated_at = now() WHERE id = $2")
            .bind(total.cents())
            .bind(order_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(PlacedOrder {
            id: OrderId::new(order_id),
            number,
        })
    }
}

fn decode_quantity(raw: i64) -> Result<u32> {
    u32::try_from(raw)
        .map_err(|e| StoreError::Database(sqlx::Error::Decode(Box::new(e))))
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    #[tracing::instrument(
        skip(self, draft),
        fields(buyer_id = draft.buyer_id().as_i64(), lines = draft.lines().len())
    )]
    async fn place_order(&self, draft: OrderDraft) -> Result<PlacedOrder> {
        let started = Instant::now();
        let result = self.place_order_tx(&draft).await;
        metrics::histogram!("order_placement_seconds").record(started.elapsed().as_secs_f64());

        match &result {
            Ok(placed) => {
                metrics::counter!("orders_placed_total").increment(1);
                tracing::info!(order_id = %placed.id, number = %placed.number, "order placed");
            }
            Err(err) => {
                metrics::counter!("orders_rejected_total").increment(1);
                tracing::warn!(error = %err, "order placement rolled back");
            }
        }

        result
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(
            r#"
            SELECT id, buyer_id, number, status, total_amount_cents, created_at, updated_at
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn list_orders(&self, page: Page) -> Result<Paged<Order>> {
        let total_items: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query(
            r#"
            SELECT id, buyer_id, number, status, total_amount_cents, created_at, updated_at
            FROM orders
            ORDER BY id
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(i64::from(page.limit()))
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let orders = rows
            .into_iter()
            .map(Self::row_to_order)
            .collect::<Result<Vec<_>>>()?;

        Ok(Paged::new(orders, page, total_items as u64))
    }

    async fn list_lines(&self, order_id: OrderId) -> Result<Vec<OrderLine>> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, product_id, quantity, unit_price_cents, subtotal_cents
            FROM order_lines
            WHERE order_id = $1
            ORDER BY id
            "#,
        )
        .bind(order_id.as_i64())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_line).collect()
    }

    #[tracing::instrument(skip(self))]
    async fn update_status(&self, id: OrderId, status: OrderStatus) -> Result<()> {
        let affected =
            sqlx::query("UPDATE orders SET status = $1, updated_at = now() WHERE id = $2")
                .bind(status.as_str())
                .bind(id.as_i64())
                .execute(&self.pool)
                .await?
                .rows_affected();

        if affected == 0 {
            return Err(StoreError::OrderNotFound(id));
        }
        Ok(())
    }

    async fn order_stats(&self) -> Result<OrderStats> {
        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM orders) AS total_orders,
                (SELECT COALESCE(SUM(total_amount_cents), 0)::BIGINT FROM orders) AS total_cents,
                (SELECT COUNT(*) FROM orders WHERE created_at::date = CURRENT_DATE) AS today_orders,
                (SELECT COALESCE(SUM(total_amount_cents), 0)::BIGINT FROM orders
                 WHERE created_at::date = CURRENT_DATE) AS today_cents
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(OrderStats {
            total_orders: row.try_get("total_orders")?,
            total_amount: Money::from_cents(row.try_get("total_cents")?),
            today_orders: row.try_get("today_orders")?,
            today_amount: Money::from_cents(row.try_get("today_cents")?),
        })
    }

    async fn list_products(&self, page: Page) -> Result<Paged<Product>> {
        let total_items: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE NOT is_deleted")
                .fetch_one(&self.pool)
                .await?;

        let rows = sqlx::query(
            r#"
            SELECT id, name, price_cents, stock, created_at, updated_at
            FROM products
            WHERE NOT is_deleted
            ORDER BY id
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(i64::from(page.limit()))
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let products = rows
            .into_iter()
            .map(Self::row_to_product)
            .collect::<Result<Vec<_>>>()?;

        Ok(Paged::new(products, page, total_items as u64))
    }
}
